use crate::core::{CommuterProfile, ScoreScale, Storage, TpbScores, TravelMode};
use crate::utils::error::{AdvisorError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Raw dataset row. Scores stay optional here so a blank cell is reported as
/// a validation failure for that row instead of a generic CSV error.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(rename = "CommuterID")]
    id: String,
    #[serde(rename = "Attitude", alias = "Attitude_PT_Score", default)]
    attitude: Option<f64>,
    #[serde(rename = "SubjectiveNorm", alias = "SN_PT_Score", default)]
    subjective_norm: Option<f64>,
    #[serde(rename = "PerceivedBehavioralControl", alias = "PBC_PT_Score", default)]
    perceived_behavioral_control: Option<f64>,
    #[serde(rename = "UsualCommuteMode", default)]
    usual_mode: Option<String>,
    #[serde(rename = "Route", default)]
    route: Option<String>,
    #[serde(rename = "CommuteDistanceKM", default)]
    commute_distance_km: Option<f64>,
}

impl ProfileRow {
    fn into_profile(self, line: usize, scale: &ScoreScale) -> Result<CommuterProfile> {
        if self.id.is_empty() {
            return Err(AdvisorError::validation(format!(
                "line {}: CommuterID is empty",
                line
            )));
        }

        let require = |value: Option<f64>, column: &str| {
            value.ok_or_else(|| {
                AdvisorError::validation(format!(
                    "line {}: commuter '{}' is missing {}",
                    line, self.id, column
                ))
            })
        };

        let scores = TpbScores {
            attitude: require(self.attitude, "Attitude")?,
            subjective_norm: require(self.subjective_norm, "SubjectiveNorm")?,
            perceived_behavioral_control: require(
                self.perceived_behavioral_control,
                "PerceivedBehavioralControl",
            )?,
        };
        check_scores(&self.id, &scores, scale)?;

        Ok(CommuterProfile {
            id: self.id,
            scores,
            usual_mode: self
                .usual_mode
                .filter(|mode| !mode.is_empty())
                .map(|mode| TravelMode::from(mode.as_str())),
            route: self.route.filter(|route| !route.is_empty()),
            commute_distance_km: self.commute_distance_km,
        })
    }
}

/// Rejects scores outside `scale` (NaN included).
pub fn check_scores(id: &str, scores: &TpbScores, scale: &ScoreScale) -> Result<()> {
    let named = [
        ("attitude", scores.attitude),
        ("subjective norm", scores.subjective_norm),
        ("perceived behavioral control", scores.perceived_behavioral_control),
    ];
    for (name, value) in named {
        if !scale.contains(value) {
            return Err(AdvisorError::validation(format!(
                "commuter '{}' has {} score {} outside {}..={}",
                id, name, value, scale.min, scale.max
            )));
        }
    }
    Ok(())
}

/// Read-only table of commuter profiles, in dataset order.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: Vec<CommuterProfile>,
    index: HashMap<String, usize>,
}

impl ProfileStore {
    /// Reads and validates the dataset once; any failure should abort startup.
    pub async fn load<S: Storage>(storage: &S, path: &str, scale: ScoreScale) -> Result<Self> {
        tracing::debug!("Reading commuter dataset from {}", path);
        let data = storage.read_file(path).await?;
        let store = Self::from_reader(data.as_slice(), scale)?;
        tracing::info!("Loaded {} commuter profiles from {}", store.len(), path);
        Ok(store)
    }

    pub fn from_reader<R: std::io::Read>(reader: R, scale: ScoreScale) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut profiles = Vec::new();
        for (row_index, row) in csv_reader.deserialize::<ProfileRow>().enumerate() {
            // Line 1 is the header.
            let profile = row?.into_profile(row_index + 2, &scale)?;
            profiles.push(profile);
        }

        Self::from_profiles(profiles, scale)
    }

    pub fn from_profiles(profiles: Vec<CommuterProfile>, scale: ScoreScale) -> Result<Self> {
        if profiles.is_empty() {
            return Err(AdvisorError::validation(
                "dataset contains no commuter profiles",
            ));
        }

        let mut index = HashMap::with_capacity(profiles.len());
        for (position, profile) in profiles.iter().enumerate() {
            check_scores(&profile.id, &profile.scores, &scale)?;
            if index.insert(profile.id.clone(), position).is_some() {
                return Err(AdvisorError::validation(format!(
                    "duplicate CommuterID '{}'",
                    profile.id
                )));
            }
        }

        Ok(Self { profiles, index })
    }

    pub fn get(&self, id: &str) -> Result<&CommuterProfile> {
        self.index
            .get(id.trim())
            .map(|&position| &self.profiles[position])
            .ok_or_else(|| AdvisorError::not_found(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|profile| profile.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommuterProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
