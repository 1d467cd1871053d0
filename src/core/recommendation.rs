//! Rule table mapping behavioral score bands and crowding onto advice.
//!
//! Each of the three TPB scores is reduced to a [`Band`] relative to the
//! midpoint of the score scale. A score sitting exactly on the midpoint is
//! treated as [`Band::Low`]. The resulting triple, crossed with the crowding
//! level, selects exactly one row of [`DECISION_TABLE`].

use crate::core::profile_store::check_scores;
use crate::core::{
    AdviceId, Briefing, CommuterProfile, CrowdingLevel, Recommendation, ScoreScale,
    SimulationInsights, TpbScores,
};
use crate::utils::error::{AdvisorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    High,
}

impl Band {
    pub fn of(score: f64, scale: &ScoreScale) -> Self {
        if score > scale.midpoint() {
            Band::High
        } else {
            Band::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreBands {
    pub attitude: Band,
    pub subjective_norm: Band,
    pub control: Band,
}

impl ScoreBands {
    pub fn of(scores: &TpbScores, scale: &ScoreScale) -> Self {
        Self {
            attitude: Band::of(scores.attitude, scale),
            subjective_norm: Band::of(scores.subjective_norm, scale),
            control: Band::of(scores.perceived_behavioral_control, scale),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub bands: ScoreBands,
    pub crowding: CrowdingLevel,
    pub advice: AdviceId,
}

const fn rule(
    attitude: Band,
    subjective_norm: Band,
    control: Band,
    crowding: CrowdingLevel,
    advice: AdviceId,
) -> Rule {
    Rule {
        bands: ScoreBands {
            attitude,
            subjective_norm,
            control,
        },
        crowding,
        advice,
    }
}

use AdviceId::*;
use Band::{High as H, Low as L};
use CrowdingLevel::{High as Crowded, Low as Quiet, Medium as Busy};

/// Columns: attitude, subjective norm, perceived behavioral control, crowding.
pub const DECISION_TABLE: [Rule; 24] = [
    // Low control: build familiarity first, avoid packed services.
    rule(L, L, L, Quiet, PlanWithJourneyApps),
    rule(L, L, L, Busy, PlanWithJourneyApps),
    rule(L, L, L, Crowded, AvoidCrowdedServices),
    rule(L, H, L, Quiet, PlanWithJourneyApps),
    rule(L, H, L, Busy, PlanWithJourneyApps),
    rule(L, H, L, Crowded, AvoidCrowdedServices),
    rule(H, L, L, Quiet, PlanWithJourneyApps),
    rule(H, L, L, Busy, PlanWithJourneyApps),
    rule(H, L, L, Crowded, AvoidCrowdedServices),
    rule(H, H, L, Quiet, PlanWithJourneyApps),
    rule(H, H, L, Busy, PlanWithJourneyApps),
    rule(H, H, L, Crowded, AvoidCrowdedServices),
    // Capable but unconvinced.
    rule(L, L, H, Quiet, TryOffPeakTrial),
    rule(L, L, H, Busy, StayAlertAtPeak),
    rule(L, L, H, Crowded, ConsiderCarpoolOrActiveTravel),
    rule(L, H, H, Quiet, TryOffPeakTrial),
    rule(L, H, H, Busy, StayAlertAtPeak),
    rule(L, H, H, Crowded, ConsiderCarpoolOrActiveTravel),
    // Positive and capable, little social pull.
    rule(H, L, H, Quiet, TalkToRegularRiders),
    rule(H, L, H, Busy, StayAlertAtPeak),
    rule(H, L, H, Crowded, ShiftTimeOrRoute),
    // Committed riders.
    rule(H, H, H, Quiet, ProceedAsPlanned),
    rule(H, H, H, Busy, StayAlertAtPeak),
    rule(H, H, H, Crowded, ShiftTimeOrRoute),
];

pub fn lookup(bands: ScoreBands, crowding: CrowdingLevel) -> Option<AdviceId> {
    DECISION_TABLE
        .iter()
        .find(|rule| rule.bands == bands && rule.crowding == crowding)
        .map(|rule| rule.advice)
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    scale: ScoreScale,
}

impl RecommendationEngine {
    pub fn new(scale: ScoreScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> &ScoreScale {
        &self.scale
    }

    pub fn recommend(
        &self,
        profile: &CommuterProfile,
        crowding: CrowdingLevel,
    ) -> Result<Recommendation> {
        check_scores(&profile.id, &profile.scores, &self.scale)?;

        let bands = ScoreBands::of(&profile.scores, &self.scale);
        let advice = lookup(bands, crowding).ok_or_else(|| {
            AdvisorError::validation(format!("no advice rule for {:?} at {}", bands, crowding))
        })?;

        tracing::debug!(
            "Commuter {} bands {:?} at {} crowding -> {:?}",
            profile.id,
            bands,
            crowding,
            advice
        );

        Ok(Recommendation {
            advice,
            text: advice.text(),
            crowding,
            profile: profile.clone(),
        })
    }

    /// Bullet list shown when a commuter asks for recommendations directly.
    pub fn briefing(
        &self,
        profile: &CommuterProfile,
        insights: &SimulationInsights,
    ) -> Result<Briefing> {
        let recommendation = self.recommend(profile, insights.level)?;
        let percent = (insights.average_load * 100.0).round();

        let mut lines = vec![recommendation.text.to_string()];
        lines.push(match insights.level {
            CrowdingLevel::High => format!(
                "Crowding alert: the simulation shows public transport running at about {}% of capacity. If crowding bothers you, travel off-peak or try another route on busy days.",
                percent
            ),
            CrowdingLevel::Medium => format!(
                "The simulation shows moderate crowding, about {}% of capacity. Knowing the peak times helps you plan a more comfortable journey.",
                percent
            ),
            CrowdingLevel::Low => format!(
                "The simulation suggests public transport is not overly crowded, about {}% of capacity. This could be a good time to try it if crowding was a concern.",
                percent
            ),
        });

        if insights.mode_switches > 0 && profile.is_transit_user() {
            lines.push(format!(
                "The simulation also saw {} switches away from public transport because of crowding, so check real-time conditions before you leave.",
                insights.mode_switches
            ));
        }

        Ok(Briefing {
            recommendation,
            insights: insights.clone(),
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TravelMode;
    use std::collections::HashSet;

    fn profile(attitude: f64, subjective_norm: f64, control: f64) -> CommuterProfile {
        CommuterProfile {
            id: "T1".to_string(),
            scores: TpbScores {
                attitude,
                subjective_norm,
                perceived_behavioral_control: control,
            },
            usual_mode: Some(TravelMode::PublicTransport),
            route: None,
            commute_distance_km: None,
        }
    }

    fn insights(level: CrowdingLevel, average_load: f64, mode_switches: u32) -> SimulationInsights {
        SimulationInsights {
            level,
            demand_load: average_load,
            average_load,
            final_load: average_load,
            mode_switches,
            capacity: 10,
            steps: 5,
        }
    }

    #[test]
    fn test_table_covers_every_combination_once() {
        let mut seen = HashSet::new();
        for rule in DECISION_TABLE.iter() {
            assert!(seen.insert((rule.bands, rule.crowding)), "duplicate rule {:?}", rule);
        }
        assert_eq!(seen.len(), 2 * 2 * 2 * 3);
    }

    #[test]
    fn test_committed_rider_proceeds_when_quiet() {
        let engine = RecommendationEngine::default();
        let rec = engine.recommend(&profile(5.0, 5.0, 5.0), CrowdingLevel::Low).unwrap();
        assert_eq!(rec.advice, AdviceId::ProceedAsPlanned);
        assert!(rec.text.contains("Proceed as planned"));
        assert_eq!(rec.crowding, CrowdingLevel::Low);
        assert_eq!(rec.profile.id, "T1");
    }

    #[test]
    fn test_committed_rider_reroutes_when_crowded() {
        let engine = RecommendationEngine::default();
        let rec = engine.recommend(&profile(5.0, 5.0, 5.0), CrowdingLevel::High).unwrap();
        assert_eq!(rec.advice, AdviceId::ShiftTimeOrRoute);
        assert!(rec.text.contains("alternative route"));
    }

    #[test]
    fn test_midpoint_scores_fall_in_lower_band() {
        let scale = ScoreScale::default();
        assert_eq!(Band::of(4.0, &scale), Band::Low);
        assert_eq!(Band::of(4.01, &scale), Band::High);

        let engine = RecommendationEngine::default();
        let rec = engine.recommend(&profile(4.0, 4.0, 4.0), CrowdingLevel::Low).unwrap();
        assert_eq!(rec.advice, AdviceId::PlanWithJourneyApps);
    }

    #[test]
    fn test_every_profile_gets_known_nonempty_advice() {
        let engine = RecommendationEngine::default();
        let known: HashSet<&str> = AdviceId::ALL.iter().map(|advice| advice.text()).collect();
        for attitude in 1..=7 {
            for norm in 1..=7 {
                for control in 1..=7 {
                    let profile = profile(attitude as f64, norm as f64, control as f64);
                    for level in CrowdingLevel::ALL {
                        let rec = engine.recommend(&profile, level).unwrap();
                        assert!(!rec.text.is_empty());
                        assert!(known.contains(rec.text));
                    }
                }
            }
        }
    }

    #[test]
    fn test_advice_is_crowding_sensitive_for_every_band() {
        let engine = RecommendationEngine::default();
        for attitude in [2.0, 6.0] {
            for norm in [2.0, 6.0] {
                for control in [2.0, 6.0] {
                    let profile = profile(attitude, norm, control);
                    let quiet = engine.recommend(&profile, CrowdingLevel::Low).unwrap();
                    let crowded = engine.recommend(&profile, CrowdingLevel::High).unwrap();
                    assert_ne!(quiet.advice, crowded.advice, "bands {:?}", ScoreBands::of(&profile.scores, engine.scale()));
                }
            }
        }
    }

    #[test]
    fn test_recommend_is_idempotent() {
        let engine = RecommendationEngine::default();
        let profile = profile(3.0, 6.0, 5.0);
        let first = engine.recommend(&profile, CrowdingLevel::Medium).unwrap();
        let second = engine.recommend(&profile, CrowdingLevel::Medium).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_profile_is_validation_error() {
        let engine = RecommendationEngine::default();
        let err = engine
            .recommend(&profile(f64::NAN, 5.0, 5.0), CrowdingLevel::Low)
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Validation { .. }));

        let err = engine
            .recommend(&profile(5.0, 0.0, 5.0), CrowdingLevel::Low)
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Validation { .. }));
    }

    #[test]
    fn test_custom_scale_moves_midpoint() {
        let engine = RecommendationEngine::new(ScoreScale { min: 1.0, max: 5.0 });
        let rec = engine.recommend(&profile(5.0, 5.0, 5.0), CrowdingLevel::Low).unwrap();
        assert_eq!(rec.advice, AdviceId::ProceedAsPlanned);
        let rec = engine.recommend(&profile(3.0, 5.0, 5.0), CrowdingLevel::Low).unwrap();
        assert_eq!(rec.advice, AdviceId::TryOffPeakTrial);
    }

    #[test]
    fn test_briefing_mentions_load_and_switches_for_transit_users() {
        let engine = RecommendationEngine::default();
        let briefing = engine
            .briefing(&profile(5.0, 5.0, 5.0), &insights(CrowdingLevel::High, 0.92, 4))
            .unwrap();

        assert_eq!(briefing.recommendation.advice, AdviceId::ShiftTimeOrRoute);
        assert_eq!(briefing.lines.len(), 3);
        assert!(briefing.lines[1].contains("92%"));
        assert!(briefing.lines[2].contains("4 switches"));
        assert!(briefing.to_markdown().starts_with("Here are some personalized recommendations"));
    }

    #[test]
    fn test_briefing_skips_switch_note_for_drivers() {
        let engine = RecommendationEngine::default();
        let mut driver = profile(2.0, 2.0, 6.0);
        driver.usual_mode = Some(TravelMode::Car);
        let briefing = engine
            .briefing(&driver, &insights(CrowdingLevel::Low, 0.3, 2))
            .unwrap();

        assert_eq!(briefing.lines.len(), 2);
        assert_eq!(briefing.recommendation.advice, AdviceId::TryOffPeakTrial);
        assert!(briefing.lines[1].contains("30%"));
    }
}
