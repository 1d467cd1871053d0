use crate::core::crowding::{CrowdingContext, CrowdingEstimator};
use crate::core::recommendation::RecommendationEngine;
use crate::core::{
    Briefing, CommuterProfile, ConversationTurn, LanguageModel, Prompt, Recommendation,
    SimulationInsights,
};
use crate::utils::error::{AdvisorError, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful commuting assistant. Provide concise and relevant information.";

#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub system_prompt: String,
    /// Most recent turns forwarded to the model.
    pub history_limit: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: 20,
        }
    }
}

/// Stateless per call: everything a turn needs comes in through the
/// arguments, and the reply text is returned exactly as the model produced it.
pub struct ConversationOrchestrator<M: LanguageModel> {
    estimator: CrowdingEstimator,
    engine: RecommendationEngine,
    model: M,
    settings: PromptSettings,
}

impl<M: LanguageModel> ConversationOrchestrator<M> {
    pub fn new(
        estimator: CrowdingEstimator,
        engine: RecommendationEngine,
        model: M,
        settings: PromptSettings,
    ) -> Self {
        Self {
            estimator,
            engine,
            model,
            settings,
        }
    }

    pub fn estimator(&self) -> &CrowdingEstimator {
        &self.estimator
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub async fn respond(
        &self,
        profile: &CommuterProfile,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String> {
        let context = CrowdingContext::for_profile(profile);
        self.respond_with_context(&context, profile, history, user_text).await
    }

    pub async fn respond_with_context(
        &self,
        context: &CrowdingContext,
        profile: &CommuterProfile,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String> {
        let insights = self.estimator.simulate(context)?;
        let recommendation = self.engine.recommend(profile, insights.level)?;
        let prompt = self.compose_prompt(Some((&recommendation, &insights)), history, user_text);
        self.delegate(&prompt).await
    }

    /// General chat before a profile has been selected.
    pub async fn respond_without_profile(
        &self,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String> {
        let prompt = self.compose_prompt(None, history, user_text);
        self.delegate(&prompt).await
    }

    /// Local advice list; never touches the model.
    pub fn advise(&self, context: &CrowdingContext, profile: &CommuterProfile) -> Result<Briefing> {
        let insights = self.estimator.simulate(context)?;
        self.engine.briefing(profile, &insights)
    }

    pub fn compose_prompt(
        &self,
        grounding: Option<(&Recommendation, &SimulationInsights)>,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Prompt {
        let mut system = self.settings.system_prompt.clone();
        if let Some((recommendation, insights)) = grounding {
            system.push_str(&format!(
                "\n\nCommuter context:\n- Profile: {}\n- Simulated public transport crowding: {} (about {:.0}% of capacity, {} switches away from public transport)\n- Recommended advice: {}\n\nUse this context to personalize your answer.",
                recommendation.profile.summary(),
                recommendation.crowding,
                insights.average_load * 100.0,
                insights.mode_switches,
                recommendation.text
            ));
        }

        let skip = history.len().saturating_sub(self.settings.history_limit);
        Prompt {
            system,
            history: history[skip..].to_vec(),
            user: user_text.to_string(),
        }
    }

    async fn delegate(&self, prompt: &Prompt) -> Result<String> {
        tracing::debug!(
            "Sending prompt to {} ({} history turns)",
            self.model.model_name(),
            prompt.history.len()
        );
        match self.model.generate(prompt).await {
            Ok(text) => Ok(text),
            Err(AdvisorError::Upstream { message }) => {
                tracing::warn!("Language model call failed: {}", message);
                Err(AdvisorError::Upstream { message })
            }
            Err(other) => {
                tracing::warn!("Language model call failed: {}", other);
                Err(AdvisorError::upstream(other.to_string()))
            }
        }
    }
}
