use crate::core::{LanguageModel, Prompt};
use crate::utils::error::{AdvisorError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Records every prompt and answers with a canned reply or failure.
#[derive(Clone)]
pub struct StubModel {
    reply: std::result::Result<String, String>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl StubModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().await.push(prompt.clone());
        self.reply.clone().map_err(AdvisorError::upstream)
    }
}
