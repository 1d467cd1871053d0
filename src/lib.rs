pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{GeminiClient, GeminiConfig};
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{
    crowding::{CrowdingContext, CrowdingEstimator, SimulationParams},
    orchestrator::{ConversationOrchestrator, PromptSettings},
    profile_store::ProfileStore,
    recommendation::RecommendationEngine,
    session::ChatSession,
};
pub use utils::error::{AdvisorError, Result};
