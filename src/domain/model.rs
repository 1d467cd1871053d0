use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Theory of Planned Behavior scores toward public transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpbScores {
    pub attitude: f64,
    pub subjective_norm: f64,
    pub perceived_behavioral_control: f64,
}

/// Bounded range every behavioral score must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl ScoreScale {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

impl Default for ScoreScale {
    // 7-point Likert, as collected in the commuter survey.
    fn default() -> Self {
        Self { min: 1.0, max: 7.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelMode {
    PublicTransport,
    Car,
    WalkCycle,
    Other(String),
}

impl From<&str> for TravelMode {
    fn from(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "publictransport" | "pt" | "transit" | "bus" | "train" => TravelMode::PublicTransport,
            "car" | "drive" | "driving" => TravelMode::Car,
            "walkcycle" | "walk" | "cycle" | "bike" | "bicycle" => TravelMode::WalkCycle,
            _ => TravelMode::Other(value.trim().to_string()),
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelMode::PublicTransport => f.write_str("Public Transport"),
            TravelMode::Car => f.write_str("Car"),
            TravelMode::WalkCycle => f.write_str("Walk/Cycle"),
            TravelMode::Other(name) => f.write_str(name),
        }
    }
}

/// One row of the commuter dataset. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuterProfile {
    pub id: String,
    pub scores: TpbScores,
    pub usual_mode: Option<TravelMode>,
    pub route: Option<String>,
    pub commute_distance_km: Option<f64>,
}

impl CommuterProfile {
    /// Uses public transport on a normal day.
    pub fn is_transit_user(&self) -> bool {
        matches!(self.usual_mode, Some(TravelMode::PublicTransport))
    }

    /// One-line description used in prompts and the CLI.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Commuter {}: attitude {:.1}, subjective norm {:.1}, perceived behavioral control {:.1}",
            self.id,
            self.scores.attitude,
            self.scores.subjective_norm,
            self.scores.perceived_behavioral_control
        );
        if let Some(mode) = &self.usual_mode {
            summary.push_str(&format!("; usual mode {}", mode));
        }
        if let Some(route) = &self.route {
            summary.push_str(&format!("; route {}", route));
        }
        if let Some(distance) = self.commute_distance_km {
            summary.push_str(&format!("; {:.1} km commute", distance));
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrowdingLevel {
    Low,
    Medium,
    High,
}

impl CrowdingLevel {
    pub const ALL: [CrowdingLevel; 3] = [CrowdingLevel::Low, CrowdingLevel::Medium, CrowdingLevel::High];
}

impl fmt::Display for CrowdingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrowdingLevel::Low => f.write_str("Low"),
            CrowdingLevel::Medium => f.write_str("Medium"),
            CrowdingLevel::High => f.write_str("High"),
        }
    }
}

/// Identifier of one fixed advice template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceId {
    ProceedAsPlanned,
    StayAlertAtPeak,
    ShiftTimeOrRoute,
    TryOffPeakTrial,
    TalkToRegularRiders,
    PlanWithJourneyApps,
    AvoidCrowdedServices,
    ConsiderCarpoolOrActiveTravel,
}

impl AdviceId {
    pub const ALL: [AdviceId; 8] = [
        AdviceId::ProceedAsPlanned,
        AdviceId::StayAlertAtPeak,
        AdviceId::ShiftTimeOrRoute,
        AdviceId::TryOffPeakTrial,
        AdviceId::TalkToRegularRiders,
        AdviceId::PlanWithJourneyApps,
        AdviceId::AvoidCrowdedServices,
        AdviceId::ConsiderCarpoolOrActiveTravel,
    ];

    pub fn text(self) -> &'static str {
        match self {
            AdviceId::ProceedAsPlanned => {
                "Conditions look comfortable for your usual public transport trip. Proceed as planned."
            }
            AdviceId::StayAlertAtPeak => {
                "Expect moderate crowding around peak times. Leaving 10 to 15 minutes earlier or later can make the ride noticeably more comfortable."
            }
            AdviceId::ShiftTimeOrRoute => {
                "Public transport is heavily crowded right now. Consider an alternative route or shifting your departure to an off-peak time for this trip."
            }
            AdviceId::TryOffPeakTrial => {
                "Crowding is low, which makes this a good moment to give public transport a try. A short off-peak trip can show benefits like less driving stress and lower fuel and parking costs."
            }
            AdviceId::TalkToRegularRiders => {
                "Services are quiet at the moment. Colleagues or friends who ride public transport regularly can share tips that make your trips easier."
            }
            AdviceId::PlanWithJourneyApps => {
                "Research routes and schedules with a journey-planning app before you travel. A trial run on a non-work day can build confidence."
            }
            AdviceId::AvoidCrowdedServices => {
                "Services are heavily crowded, which makes an unfamiliar trip harder. Keep your usual mode today and plan a public transport trial for a quieter time."
            }
            AdviceId::ConsiderCarpoolOrActiveTravel => {
                "Public transport is heavily crowded. Carpooling, or walking or cycling part of the way, can be a more pleasant alternative today."
            }
        }
    }
}

/// Advice derived from exactly one profile and one crowding level.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub advice: AdviceId,
    pub text: &'static str,
    pub crowding: CrowdingLevel,
    pub profile: CommuterProfile,
}

/// Result of one multi-step population run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationInsights {
    pub level: CrowdingLevel,
    pub demand_load: f64,
    pub average_load: f64,
    pub final_load: f64,
    /// Riders who would have stayed on an uncrowded vehicle but left.
    pub mode_switches: u32,
    pub capacity: u32,
    pub steps: u32,
}

/// User-facing advice list for one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Briefing {
    pub recommendation: Recommendation,
    pub insights: SimulationInsights,
    pub lines: Vec<String>,
}

impl Briefing {
    pub fn to_markdown(&self) -> String {
        let bullets: Vec<String> = self.lines.iter().map(|line| format!("- {}", line)).collect();
        format!(
            "Here are some personalized recommendations based on your profile:\n\n{}",
            bullets.join("\n")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}
