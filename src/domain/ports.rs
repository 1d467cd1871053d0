use crate::domain::model::ConversationTurn;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// Everything the hosted model sees for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub history: Vec<ConversationTurn>,
    pub user: String,
}

/// Text generation collaborator. Implementations surface every failure as
/// `AdvisorError::Upstream` and never retry on their own.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}
