//! Credit scorecard data model.
//!
//! The nested shape the generation backend is constrained to emit: pillars of
//! weighted metrics, each metric scored on a 1-5 integer scale. Aggregates
//! (`pillar_avg`, `weighted_score`, `total_score`) are always recomputed from
//! the leaf scores here; generated aggregate values are discarded rather than
//! trusted.

use serde::{Deserialize, Serialize};

use crate::error::{CredoError, Result};

/// Floating tolerance for comparing recomputed aggregates against upstream values.
pub const SCORE_TOLERANCE: f64 = 1e-6;

const SCORE_MIN: f64 = 1.0;
const SCORE_MAX: f64 = 5.0;

/// The value observed for a metric, as reported by the backend.
///
/// The schema allows either a free-form string ("Not Available", "1.54x")
/// or a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// A single scored metric inside a pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetric {
    /// Metric name (e.g., "DSCR", "Current Ratio").
    pub metric: String,
    /// Definition of the metric as applied to this applicant.
    pub definition: String,
    /// The applicant's observed value.
    pub applicant_value: MetricValue,
    /// Score on a 1-5 integer scale.
    pub score: f64,
}

impl ScoreMetric {
    /// Checks the score invariant: an integer in [1,5].
    ///
    /// Out-of-range or fractional scores are a validation failure, never
    /// silently clamped.
    pub fn validate(&self) -> Result<()> {
        if self.score.fract() != 0.0 {
            return Err(CredoError::validation(format!(
                "metric '{}' score {} is not an integer",
                self.metric, self.score
            )));
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(&self.score) {
            return Err(CredoError::validation(format!(
                "metric '{}' score {} is outside [1,5]",
                self.metric, self.score
            )));
        }
        Ok(())
    }
}

/// A weighted category of credit-assessment metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    /// Pillar name (e.g., "Profitability", "Leverage").
    pub pillar: String,
    /// Weight of this pillar in the total score.
    pub weight: f64,
    /// The scored metrics, in the order the backend produced them.
    pub metrics: Vec<ScoreMetric>,
    /// Mean of the metric scores. Recomputed, never trusted.
    pub pillar_avg: f64,
    /// `pillar_avg * weight`. Recomputed, never trusted.
    pub weighted_score: f64,
}

impl Pillar {
    /// Mean of the metric scores; 0 (not NaN) for an empty metric list so
    /// totals stay well-defined and comparable across requests.
    pub fn computed_avg(&self) -> f64 {
        if self.metrics.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.metrics.iter().map(|m| m.score).sum();
        sum / self.metrics.len() as f64
    }

    /// Validates every metric, then overwrites the aggregates from the leaf scores.
    pub fn normalize(&mut self) -> Result<()> {
        for metric in &self.metrics {
            metric.validate()?;
        }
        self.pillar_avg = self.computed_avg();
        self.weighted_score = self.pillar_avg * self.weight;
        Ok(())
    }
}

/// A complete credit assessment for one applicant.
///
/// Created fresh per extraction request and immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub company_name: String,
    pub industry: String,
    pub assessment_date: String,
    pub pillars: Vec<Pillar>,
    /// Sum of the pillar weighted scores. Recomputed, never trusted.
    pub total_score: f64,
    /// Policy bucket derived from `total_score` via the injected bands.
    pub decision_zone: String,
}

impl Assessment {
    /// Validates metric invariants, recomputes every aggregate from the leaf
    /// scores, and rederives the decision zone from the injected bands.
    pub fn normalize(&mut self, bands: &DecisionBands) -> Result<()> {
        for pillar in &mut self.pillars {
            pillar.normalize()?;
        }
        self.total_score = self.pillars.iter().map(|p| p.weighted_score).sum();
        self.decision_zone = bands.zone_for(self.total_score).to_string();
        Ok(())
    }
}

/// One threshold row of the decision policy: scores at or above `floor`
/// (down to the next band) fall in `zone`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBand {
    pub floor: f64,
    pub zone: String,
}

/// Policy-defined mapping from a total score to a decision zone.
///
/// The threshold table is external policy supplied through configuration;
/// nothing in this module hardcodes the bucket boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DecisionBand>", into = "Vec<DecisionBand>")]
pub struct DecisionBands {
    // Sorted by descending floor; the last band is the catch-all.
    bands: Vec<DecisionBand>,
}

impl DecisionBands {
    /// Builds a band table, sorting rows by descending floor.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for an empty table.
    pub fn new(mut bands: Vec<DecisionBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(CredoError::config("decision band table is empty"));
        }
        bands.sort_by(|a, b| b.floor.total_cmp(&a.floor));
        Ok(Self { bands })
    }

    /// Resolves the zone for a total score: the first band whose floor the
    /// score reaches, falling back to the lowest band.
    pub fn zone_for(&self, total_score: f64) -> &str {
        self.bands
            .iter()
            .find(|band| total_score >= band.floor)
            .unwrap_or_else(|| self.bands.last().expect("bands are non-empty"))
            .zone
            .as_str()
    }
}

impl Default for DecisionBands {
    /// Reference policy used when the deployment supplies none.
    fn default() -> Self {
        Self::new(vec![
            DecisionBand {
                floor: 3.5,
                zone: "approve".to_string(),
            },
            DecisionBand {
                floor: 2.5,
                zone: "review".to_string(),
            },
            DecisionBand {
                floor: 0.0,
                zone: "decline".to_string(),
            },
        ])
        .expect("default bands are non-empty")
    }
}

impl TryFrom<Vec<DecisionBand>> for DecisionBands {
    type Error = CredoError;

    fn try_from(bands: Vec<DecisionBand>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<DecisionBands> for Vec<DecisionBand> {
    fn from(bands: DecisionBands) -> Self {
        bands.bands
    }
}
