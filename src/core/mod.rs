pub mod crowding;
pub mod orchestrator;
pub mod profile_store;
pub mod recommendation;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{
    AdviceId, Briefing, CommuterProfile, ConversationTurn, CrowdingLevel, Recommendation, Role,
    ScoreScale, SimulationInsights, TpbScores, TravelMode,
};
pub use crate::domain::ports::{LanguageModel, Prompt, Storage};
pub use crate::utils::error::Result;
