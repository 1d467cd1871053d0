use crate::core::crowding::CrowdingContext;
use crate::core::orchestrator::ConversationOrchestrator;
use crate::core::{CommuterProfile, ConversationTurn, LanguageModel};
use crate::utils::error::{AdvisorError, Result};

pub const SELECT_PROFILE_HINT: &str =
    "Please select a commuter profile to get personalized recommendations.";

const RECOMMENDATION_KEYWORDS: [&str; 3] = ["recommend", "advice", "suggest"];

pub fn asks_for_recommendations(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RECOMMENDATION_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// State of one user's conversation. Sessions never share history.
///
/// `transcript` is what the user sees, including notices and locally
/// generated advice. `dialogue` holds only the exchanges the model took part
/// in and is what gets forwarded as history.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    profile: Option<CommuterProfile>,
    context: CrowdingContext,
    transcript: Vec<ConversationTurn>,
    dialogue: Vec<ConversationTurn>,
    local_recommendations: bool,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, local_recommendations: bool) -> Self {
        Self {
            id: id.into(),
            profile: None,
            context: CrowdingContext::baseline(),
            transcript: Vec::new(),
            dialogue: Vec::new(),
            local_recommendations,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> Option<&CommuterProfile> {
        self.profile.as_ref()
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    pub fn dialogue(&self) -> &[ConversationTurn] {
        &self.dialogue
    }

    /// Route and time used for crowding. A route set here wins over the
    /// profile's own route.
    pub fn set_context(&mut self, context: CrowdingContext) {
        self.context = context;
    }

    pub fn select_profile(&mut self, profile: CommuterProfile) {
        if self.profile.as_ref().map(|current| current.id.as_str()) == Some(profile.id.as_str()) {
            return;
        }
        tracing::info!("Session {}: selected commuter {}", self.id, profile.id);
        self.transcript.push(ConversationTurn::assistant(format!(
            "Profile for Commuter ID {} loaded. How can I help you with your commute today?",
            profile.id
        )));
        self.profile = Some(profile);
    }

    pub fn clear_profile(&mut self) {
        if self.profile.take().is_some() {
            tracing::info!("Session {}: profile cleared", self.id);
            self.transcript.push(ConversationTurn::assistant(
                "Commuter profile cleared. Please select a profile to get personalized recommendations.",
            ));
        }
    }

    fn context_for(&self, profile: &CommuterProfile) -> CrowdingContext {
        CrowdingContext {
            route: self.context.route.clone().or_else(|| profile.route.clone()),
            time_of_day: self.context.time_of_day,
        }
    }

    /// Handles one user message. On failure the transcript records the
    /// user-facing error, the dialogue is left unchanged, and the error is
    /// returned so the caller can decide whether to retry.
    pub async fn send<M: LanguageModel>(
        &mut self,
        orchestrator: &ConversationOrchestrator<M>,
        text: &str,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AdvisorError::validation("message is empty"));
        }
        self.transcript.push(ConversationTurn::user(text));

        let result = match self.profile.clone() {
            Some(profile) if self.local_recommendations && asks_for_recommendations(text) => {
                let context = self.context_for(&profile);
                orchestrator
                    .advise(&context, &profile)
                    .map(|briefing| briefing.to_markdown())
            }
            Some(profile) => {
                let context = self.context_for(&profile);
                let reply = orchestrator
                    .respond_with_context(&context, &profile, &self.dialogue, text)
                    .await;
                self.record_exchange(text, reply)
            }
            None if text.to_lowercase().contains("profile") => Ok(SELECT_PROFILE_HINT.to_string()),
            None => {
                let reply = orchestrator
                    .respond_without_profile(&self.dialogue, text)
                    .await;
                self.record_exchange(text, reply)
            }
        };

        match result {
            Ok(reply) => {
                self.transcript.push(ConversationTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                tracing::error!("Session {}: turn failed: {}", self.id, e);
                self.transcript
                    .push(ConversationTurn::assistant(e.user_friendly_message()));
                Err(e)
            }
        }
    }

    fn record_exchange(&mut self, text: &str, reply: Result<String>) -> Result<String> {
        let reply = reply?;
        self.dialogue.push(ConversationTurn::user(text));
        self.dialogue.push(ConversationTurn::assistant(reply.clone()));
        Ok(reply)
    }
}
