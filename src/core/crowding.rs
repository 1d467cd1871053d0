//! Crowding estimation for a shared-capacity public transport service.
//!
//! A population of synthetic commuters is assigned to one vehicle and the
//! ratio of riders to capacity is mapped onto a [`CrowdingLevel`] through
//! configurable thresholds. The multi-step [`CrowdingEstimator::simulate`]
//! run additionally lets agents react to the crowding they perceive and
//! counts how many give up on public transport.

use crate::core::{CommuterProfile, CrowdingLevel, ScoreScale, SimulationInsights, TpbScores};
use crate::utils::error::{AdvisorError, Result};
use chrono::{NaiveTime, Timelike};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on synthetic agents per run; each one is simulated individually.
pub const MAX_AGENTS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrowdingThresholds {
    /// Load ratio at which crowding becomes Medium (inclusive).
    pub medium: f64,
    /// Load ratio above which crowding becomes High.
    pub high: f64,
}

impl Default for CrowdingThresholds {
    fn default() -> Self {
        Self {
            medium: 0.5,
            high: 0.85,
        }
    }
}

impl CrowdingThresholds {
    pub fn classify(&self, load_ratio: f64) -> CrowdingLevel {
        if load_ratio > self.high {
            CrowdingLevel::High
        } else if load_ratio >= self.medium {
            CrowdingLevel::Medium
        } else {
            CrowdingLevel::Low
        }
    }

    fn validate(&self) -> Result<()> {
        let ordered = self.medium > 0.0 && self.medium < self.high && self.high <= 1.0;
        if !ordered {
            return Err(AdvisorError::configuration(format!(
                "crowding thresholds must satisfy 0 < medium < high <= 1 (got medium {}, high {})",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Coarse time-of-day bucket driving how many agents try to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBand {
    Early,
    MorningPeak,
    Midday,
    EveningPeak,
    Late,
}

impl TimeBand {
    pub fn from_time(time: NaiveTime) -> Self {
        match time.hour() {
            0..=6 => TimeBand::Early,
            7..=9 => TimeBand::MorningPeak,
            10..=15 => TimeBand::Midday,
            16..=18 => TimeBand::EveningPeak,
            _ => TimeBand::Late,
        }
    }

    /// Share of the population travelling in this band.
    pub fn demand_factor(self) -> f64 {
        match self {
            TimeBand::MorningPeak => 1.0,
            TimeBand::EveningPeak => 0.9,
            TimeBand::Midday => 0.5,
            TimeBand::Early | TimeBand::Late => 0.3,
        }
    }
}

/// Route and time of a trip. Both absent means the baseline scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrowdingContext {
    pub route: Option<String>,
    pub time_of_day: Option<NaiveTime>,
}

impl CrowdingContext {
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn for_profile(profile: &CommuterProfile) -> Self {
        Self {
            route: profile.route.clone(),
            time_of_day: None,
        }
    }

    pub fn at(mut self, time: NaiveTime) -> Self {
        self.time_of_day = Some(time);
        self
    }

    fn demand_factor(&self) -> f64 {
        self.time_of_day
            .map(|time| TimeBand::from_time(time).demand_factor())
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub capacity: u32,
    pub agents: u32,
    pub steps: u32,
    pub seed: u64,
    pub thresholds: CrowdingThresholds,
    pub route_capacities: HashMap<String, u32>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            capacity: 10,
            agents: 8,
            steps: 5,
            seed: 42,
            thresholds: CrowdingThresholds::default(),
            route_capacities: HashMap::new(),
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(AdvisorError::configuration(
                "simulation capacity must be greater than zero",
            ));
        }
        if let Some((route, _)) = self.route_capacities.iter().find(|(_, cap)| **cap == 0) {
            return Err(AdvisorError::configuration(format!(
                "capacity for route '{}' must be greater than zero",
                route
            )));
        }
        if self.agents == 0 || self.agents > MAX_AGENTS {
            return Err(AdvisorError::configuration(format!(
                "simulation agents must be between 1 and {}, got {}",
                MAX_AGENTS, self.agents
            )));
        }
        if self.steps == 0 {
            return Err(AdvisorError::configuration(
                "simulation needs at least one step",
            ));
        }
        self.thresholds.validate()
    }
}

/// Maps an assigned-agent count onto a crowding level. Pure and monotonic in
/// `assigned` for a fixed capacity.
pub fn level_for_load(
    assigned: u32,
    capacity: u32,
    thresholds: &CrowdingThresholds,
) -> Result<CrowdingLevel> {
    Ok(thresholds.classify(load_ratio(assigned, capacity)?))
}

fn load_ratio(riders: u32, capacity: u32) -> Result<f64> {
    if capacity == 0 {
        return Err(AdvisorError::configuration(
            "cannot compute crowding for a zero-capacity vehicle",
        ));
    }
    Ok((riders as f64 / capacity as f64).min(1.0))
}

#[derive(Debug, Clone)]
struct Agent {
    attitude: f64,
    control: f64,
    tolerance: f64,
    on_transit: bool,
}

impl Agent {
    /// Crowding beyond the agent's tolerance erodes control more than
    /// attitude; dropping below `switch_below` on either means leaving PT.
    fn stays_on_transit(&self, load: f64, floor: f64, switch_below: f64) -> bool {
        let impact = (load - self.tolerance).max(0.0) * 2.0;
        let control = (self.control - impact * 3.0).max(floor);
        let attitude = (self.attitude - impact * 2.0).max(floor);
        control >= switch_below && attitude >= switch_below
    }

    /// Would keep riding on an empty vehicle. Agents that are not committed
    /// leave at the first step whatever the load.
    fn committed(&self, switch_below: f64) -> bool {
        self.control >= switch_below && self.attitude >= switch_below
    }
}

#[derive(Debug, Clone)]
pub struct CrowdingEstimator {
    params: SimulationParams,
    scale: ScoreScale,
    population: Vec<TpbScores>,
}

impl CrowdingEstimator {
    pub fn new(params: SimulationParams, scale: ScoreScale) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            scale,
            population: Vec::new(),
        })
    }

    /// Seeds agent attitudes from the public transport users in the dataset.
    pub fn with_population<'a>(
        mut self,
        profiles: impl IntoIterator<Item = &'a CommuterProfile>,
    ) -> Self {
        self.population = profiles
            .into_iter()
            .filter(|profile| profile.is_transit_user())
            .map(|profile| profile.scores)
            .collect();
        self
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn capacity_for(&self, context: &CrowdingContext) -> u32 {
        context
            .route
            .as_ref()
            .and_then(|route| self.params.route_capacities.get(route))
            .copied()
            .unwrap_or(self.params.capacity)
    }

    pub fn demand_for(&self, context: &CrowdingContext) -> u32 {
        (self.params.agents as f64 * context.demand_factor()).round() as u32
    }

    pub fn estimate(&self, context: &CrowdingContext) -> Result<CrowdingLevel> {
        let capacity = self.capacity_for(context);
        let demand = self.demand_for(context);
        let level = level_for_load(demand, capacity, &self.params.thresholds)?;
        tracing::debug!(
            "Estimated crowding {} ({} agents, capacity {}, route {:?})",
            level,
            demand,
            capacity,
            context.route
        );
        Ok(level)
    }

    pub fn simulate(&self, context: &CrowdingContext) -> Result<SimulationInsights> {
        let capacity = self.capacity_for(context);
        let demand = self.demand_for(context);
        let demand_load = load_ratio(demand, capacity)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let neutral = self.scale.midpoint();
        let mut agents: Vec<Agent> = (0..demand as usize)
            .map(|i| {
                let slot = i % self.population.len().max(1);
                let (attitude, control) = match self.population.get(slot) {
                    Some(scores) => (scores.attitude, scores.perceived_behavioral_control),
                    None => (neutral, neutral),
                };
                Agent {
                    attitude,
                    control,
                    tolerance: rng.gen_range(0.5..0.9),
                    on_transit: true,
                }
            })
            .collect();

        let switch_below = (neutral - 1.0).max(self.scale.min);
        let mut loads = Vec::with_capacity(self.params.steps as usize);
        let mut mode_switches = 0u32;
        let mut final_load = demand_load;

        for step in 1..=self.params.steps {
            let boarding = agents.iter().filter(|agent| agent.on_transit).count() as u32;
            let load = load_ratio(boarding, capacity)?;
            loads.push(load);

            for agent in agents.iter_mut().filter(|agent| agent.on_transit) {
                if !agent.stays_on_transit(load, self.scale.min, switch_below) {
                    agent.on_transit = false;
                    if agent.committed(switch_below) {
                        mode_switches += 1;
                    }
                }
            }

            let remaining = agents.iter().filter(|agent| agent.on_transit).count() as u32;
            final_load = load_ratio(remaining, capacity)?;
            tracing::debug!(
                "Simulation step {}: {} boarding, load {:.2}, {} remain",
                step,
                boarding,
                load,
                remaining
            );
        }

        let average_load = loads.iter().sum::<f64>() / loads.len() as f64;
        let insights = SimulationInsights {
            level: self.params.thresholds.classify(demand_load),
            demand_load,
            average_load,
            final_load,
            mode_switches,
            capacity,
            steps: self.params.steps,
        };

        tracing::info!(
            "Crowding simulation: level {}, average load {:.0}%, {} switches from public transport",
            insights.level,
            insights.average_load * 100.0,
            insights.mode_switches
        );
        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TravelMode;

    fn params(capacity: u32, agents: u32) -> SimulationParams {
        SimulationParams {
            capacity,
            agents,
            ..SimulationParams::default()
        }
    }

    fn estimator(capacity: u32, agents: u32) -> CrowdingEstimator {
        CrowdingEstimator::new(params(capacity, agents), ScoreScale::default()).unwrap()
    }

    #[test]
    fn test_thresholds_follow_documented_bands() {
        let thresholds = CrowdingThresholds::default();
        assert_eq!(thresholds.classify(0.0), CrowdingLevel::Low);
        assert_eq!(thresholds.classify(0.49), CrowdingLevel::Low);
        assert_eq!(thresholds.classify(0.5), CrowdingLevel::Medium);
        assert_eq!(thresholds.classify(0.85), CrowdingLevel::Medium);
        assert_eq!(thresholds.classify(0.86), CrowdingLevel::High);
        assert_eq!(thresholds.classify(1.0), CrowdingLevel::High);
    }

    #[test]
    fn test_zero_capacity_is_configuration_error() {
        let err = CrowdingEstimator::new(params(0, 8), ScoreScale::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::Configuration { .. }));

        let err = level_for_load(5, 0, &CrowdingThresholds::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::Configuration { .. }));
    }

    #[test]
    fn test_zero_route_capacity_is_configuration_error() {
        let mut params = params(10, 8);
        params.route_capacities.insert("Line 5".to_string(), 0);
        assert!(CrowdingEstimator::new(params, ScoreScale::default()).is_err());
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let mut params = params(10, 8);
        params.thresholds = CrowdingThresholds {
            medium: 0.9,
            high: 0.6,
        };
        assert!(CrowdingEstimator::new(params, ScoreScale::default()).is_err());
    }

    #[test]
    fn test_level_is_monotonic_in_assigned_agents() {
        let thresholds = CrowdingThresholds::default();
        let mut previous = CrowdingLevel::Low;
        for assigned in 0..=40 {
            let level = level_for_load(assigned, 20, &thresholds).unwrap();
            assert!(level >= previous, "level dropped at {} agents", assigned);
            previous = level;
        }
        assert_eq!(previous, CrowdingLevel::High);
    }

    #[test]
    fn test_estimate_is_monotonic_in_population() {
        let context = CrowdingContext::baseline();
        let mut previous = CrowdingLevel::Low;
        for agents in 1..=25 {
            let level = estimator(10, agents).estimate(&context).unwrap();
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_baseline_defaults_are_medium() {
        let estimator = CrowdingEstimator::new(SimulationParams::default(), ScoreScale::default())
            .unwrap();
        let level = estimator.estimate(&CrowdingContext::baseline()).unwrap();
        assert_eq!(level, CrowdingLevel::Medium);
    }

    #[test]
    fn test_time_of_day_scales_demand() {
        let estimator = estimator(10, 10);
        let peak = CrowdingContext::baseline().at(NaiveTime::from_hms_opt(8, 15, 0).unwrap());
        let midday = CrowdingContext::baseline().at(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let night = CrowdingContext::baseline().at(NaiveTime::from_hms_opt(22, 30, 0).unwrap());

        assert_eq!(estimator.estimate(&peak).unwrap(), CrowdingLevel::High);
        assert_eq!(estimator.estimate(&midday).unwrap(), CrowdingLevel::Medium);
        assert_eq!(estimator.estimate(&night).unwrap(), CrowdingLevel::Low);
    }

    #[test]
    fn test_route_capacity_override() {
        let mut params = params(10, 8);
        params.route_capacities.insert("Express 9".to_string(), 40);
        let estimator = CrowdingEstimator::new(params, ScoreScale::default()).unwrap();

        let express = CrowdingContext {
            route: Some("Express 9".to_string()),
            time_of_day: None,
        };
        let unknown = CrowdingContext {
            route: Some("Line 1".to_string()),
            time_of_day: None,
        };
        assert_eq!(estimator.capacity_for(&express), 40);
        assert_eq!(estimator.estimate(&express).unwrap(), CrowdingLevel::Low);
        assert_eq!(estimator.capacity_for(&unknown), 10);
    }

    #[test]
    fn test_simulation_is_reproducible_for_a_seed() {
        let estimator = estimator(5, 9);
        let context = CrowdingContext::baseline();
        let first = estimator.simulate(&context).unwrap();
        let second = estimator.simulate(&context).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_simulation_level_matches_estimate() {
        let estimator = estimator(10, 7);
        let context = CrowdingContext::baseline();
        let insights = estimator.simulate(&context).unwrap();
        assert_eq!(insights.level, estimator.estimate(&context).unwrap());
        assert_eq!(insights.steps, 5);
        assert_eq!(insights.capacity, 10);
    }

    #[test]
    fn test_overcrowding_drives_switches() {
        let reluctant = CommuterProfile {
            id: "1".to_string(),
            scores: TpbScores {
                attitude: 3.5,
                subjective_norm: 4.0,
                perceived_behavioral_control: 3.5,
            },
            usual_mode: Some(TravelMode::PublicTransport),
            route: None,
            commute_distance_km: None,
        };
        let estimator = estimator(3, 12).with_population([&reluctant]);
        let insights = estimator.simulate(&CrowdingContext::baseline()).unwrap();

        assert_eq!(insights.demand_load, 1.0);
        assert!(insights.mode_switches > 0);
        assert!(insights.final_load <= insights.demand_load);
    }

    #[test]
    fn test_relaxed_service_has_no_switches() {
        let insights = estimator(100, 10)
            .simulate(&CrowdingContext::baseline())
            .unwrap();
        assert_eq!(insights.mode_switches, 0);
        assert!((insights.average_load - 0.1).abs() < 1e-9);
        assert_eq!(insights.level, CrowdingLevel::Low);
    }

    #[test]
    fn test_uncommitted_riders_leave_without_counting_as_switches() {
        let steady = CommuterProfile {
            id: "101".to_string(),
            scores: TpbScores {
                attitude: 5.0,
                subjective_norm: 5.0,
                perceived_behavioral_control: 5.0,
            },
            usual_mode: Some(TravelMode::PublicTransport),
            route: None,
            commute_distance_km: None,
        };
        let wavering = CommuterProfile {
            id: "103".to_string(),
            scores: TpbScores {
                attitude: 6.0,
                subjective_norm: 3.0,
                perceived_behavioral_control: 2.0,
            },
            ..steady.clone()
        };
        let insights = estimator(100, 10)
            .with_population([&steady, &wavering])
            .simulate(&CrowdingContext::baseline())
            .unwrap();

        // Half the riders leave after the first step at 10% load.
        assert_eq!(insights.mode_switches, 0);
        assert!((insights.average_load - 0.06).abs() < 1e-9);
        assert!((insights.final_load - 0.05).abs() < 1e-9);
        assert_eq!(insights.level, CrowdingLevel::Low);
    }

    #[test]
    fn test_agent_count_is_bounded() {
        let err = CrowdingEstimator::new(params(10, 0), ScoreScale::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::Configuration { .. }));

        let err = CrowdingEstimator::new(params(10, MAX_AGENTS + 1), ScoreScale::default())
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Configuration { .. }));
        assert!(CrowdingEstimator::new(params(10, MAX_AGENTS), ScoreScale::default()).is_ok());
    }

    #[test]
    fn test_population_only_takes_transit_users() {
        let driver = CommuterProfile {
            id: "2".to_string(),
            scores: TpbScores {
                attitude: 1.0,
                subjective_norm: 1.0,
                perceived_behavioral_control: 1.0,
            },
            usual_mode: Some(TravelMode::Car),
            route: None,
            commute_distance_km: None,
        };
        // A car driver would switch immediately; with no transit users the
        // agents fall back to neutral scores and stay on board.
        let insights = estimator(100, 10)
            .with_population([&driver])
            .simulate(&CrowdingContext::baseline())
            .unwrap();
        assert_eq!(insights.mode_switches, 0);
    }
}
