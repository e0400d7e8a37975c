//! Builds schema-validated credit assessments from a document corpus.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::conversation::{Turn, TurnRole};
use crate::error::{CredoError, Result};
use crate::gateway::ModelGateway;
use crate::prompts;
use crate::schema;
use crate::scorecard::{Assessment, DecisionBands};

/// Orchestrates one extraction request: context assembly, the constrained
/// gateway call, receipt-side validation, and aggregate normalization.
///
/// Each request produces an independent, immutable `Assessment`; a failure
/// is always a typed error, never a partially-populated scorecard.
pub struct AssessmentBuilder {
    gateway: Arc<dyn ModelGateway>,
    bands: DecisionBands,
}

impl AssessmentBuilder {
    /// Creates a builder over the given gateway and decision policy.
    pub fn new(gateway: Arc<dyn ModelGateway>, bands: DecisionBands) -> Self {
        Self { gateway, bands }
    }

    /// Produces a normalized assessment from the document corpus and any
    /// prior conversation turns.
    ///
    /// # Errors
    ///
    /// `Extraction` when the constrained call yields no parseable result;
    /// `Validation` when the parsed object is missing required fields or a
    /// metric score is outside the integer range [1,5].
    pub async fn build(
        &self,
        document_context: &str,
        prior_turns: Option<&[Turn]>,
    ) -> Result<Assessment> {
        let context = assemble_context(document_context, prior_turns);

        let value = self
            .gateway
            .complete_structured(&context, prompts::EXTRACTION_PROMPT, &schema::assessment_schema())
            .await
            .map_err(|err| {
                warn!(error = %err, "scorecard extraction failed");
                CredoError::extraction(err.to_string())
            })?;

        let mut assessment: Assessment = serde_json::from_value(value)
            .map_err(|err| CredoError::validation(format!("scorecard shape mismatch: {err}")))?;

        assessment.normalize(&self.bands)?;
        debug!(
            company = %assessment.company_name,
            total_score = assessment.total_score,
            zone = %assessment.decision_zone,
            "assessment normalized"
        );
        Ok(assessment)
    }
}

/// Concatenates the opaque corpus text with any prior exchange, rendered
/// role-prefixed so the backend sees the conversation that led here.
fn assemble_context(document_context: &str, prior_turns: Option<&[Turn]>) -> String {
    let turns = prior_turns.unwrap_or_default();
    if turns.is_empty() {
        return document_context.to_string();
    }

    let mut context = String::from(document_context);
    context.push_str("\n\nPrior conversation:\n");
    for turn in turns {
        let speaker = match turn.role {
            TurnRole::User => "Underwriter",
            TurnRole::Model => "Assistant",
        };
        context.push_str(speaker);
        context.push_str(": ");
        context.push_str(&turn.text);
        context.push('\n');
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ChunkStream;
    use crate::schema::SchemaNode;
    use crate::scorecard::SCORE_TOLERANCE;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    struct MockGateway {
        structured: Result<Value>,
        seen_context: Mutex<Option<String>>,
    }

    impl MockGateway {
        fn returning(structured: Result<Value>) -> Arc<Self> {
            Arc::new(Self {
                structured,
                seen_context: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl ModelGateway for MockGateway {
        async fn complete_once(&self, _context: &str, _turns: &[Turn]) -> Result<String> {
            unimplemented!("not used by builder tests")
        }

        async fn complete_structured(
            &self,
            context: &str,
            _instruction: &str,
            _schema: &SchemaNode,
        ) -> Result<Value> {
            *self.seen_context.lock().unwrap() = Some(context.to_string());
            self.structured.clone()
        }

        async fn complete_streaming(&self, _turns: &[Turn]) -> Result<ChunkStream> {
            unimplemented!("not used by builder tests")
        }
    }

    fn scorecard_json() -> Value {
        json!({
            "company_name": "Acme Traders",
            "industry": "Wholesale",
            "assessment_date": "2025-06-01",
            "pillars": [
                {
                    "pillar": "Profitability",
                    "weight": 0.6,
                    "metrics": [
                        {
                            "metric": "Net Margin",
                            "definition": "PAT / revenue",
                            "applicant_value": "7%",
                            "score": 4
                        },
                        {
                            "metric": "Revenue Growth",
                            "definition": "YoY turnover growth",
                            "applicant_value": 25,
                            "score": 4
                        }
                    ],
                    // Drifted aggregates the builder must discard.
                    "pillar_avg": 2.0,
                    "weighted_score": 0.5
                },
                {
                    "pillar": "Leverage",
                    "weight": 0.4,
                    "metrics": [
                        {
                            "metric": "Debt/Equity",
                            "definition": "Total debt over equity",
                            "applicant_value": 2.5,
                            "score": 3
                        }
                    ],
                    "pillar_avg": 0.0,
                    "weighted_score": 0.0
                }
            ],
            "total_score": 9.9,
            "decision_zone": "nonsense"
        })
    }

    fn builder(gateway: Arc<MockGateway>) -> AssessmentBuilder {
        AssessmentBuilder::new(gateway, DecisionBands::default())
    }

    #[tokio::test]
    async fn test_build_recomputes_aggregates_and_zone() {
        let gateway = MockGateway::returning(Ok(scorecard_json()));
        let assessment = builder(gateway).build("corpus text", None).await.unwrap();

        assert!((assessment.pillars[0].pillar_avg - 4.0).abs() < SCORE_TOLERANCE);
        assert!((assessment.pillars[0].weighted_score - 2.4).abs() < SCORE_TOLERANCE);
        assert!((assessment.pillars[1].weighted_score - 1.2).abs() < SCORE_TOLERANCE);
        assert!((assessment.total_score - 3.6).abs() < SCORE_TOLERANCE);
        assert_eq!(assessment.decision_zone, "approve");
    }

    #[tokio::test]
    async fn test_gateway_failure_is_an_extraction_error() {
        let gateway = MockGateway::returning(Err(CredoError::gateway("backend unreachable")));
        let err = builder(gateway).build("corpus", None).await.unwrap_err();

        assert!(err.is_extraction());
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_a_validation_error() {
        let mut value = scorecard_json();
        value["pillars"][0]["metrics"][0]["score"] = json!(6);
        let gateway = MockGateway::returning(Ok(value));

        let err = builder(gateway).build("corpus", None).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_missing_required_field_is_a_validation_error() {
        let mut value = scorecard_json();
        value.as_object_mut().unwrap().remove("company_name");
        let gateway = MockGateway::returning(Ok(value));

        let err = builder(gateway).build("corpus", None).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_empty_metrics_yield_zero_average() {
        let mut value = scorecard_json();
        value["pillars"][1]["metrics"] = json!([]);
        let gateway = MockGateway::returning(Ok(value));

        let assessment = builder(gateway).build("corpus", None).await.unwrap();
        assert_eq!(assessment.pillars[1].pillar_avg, 0.0);
        assert!((assessment.total_score - 2.4).abs() < SCORE_TOLERANCE);
        assert_eq!(assessment.decision_zone, "decline");
    }

    #[tokio::test]
    async fn test_prior_turns_are_rendered_into_the_context() {
        let gateway = MockGateway::returning(Ok(scorecard_json()));
        let turns = [Turn::user("What is the DSCR?"), Turn::model("1.54x.")];

        builder(gateway.clone())
            .build("corpus", Some(&turns))
            .await
            .unwrap();

        let context = gateway.seen_context.lock().unwrap().clone().unwrap();
        assert!(context.starts_with("corpus"));
        assert!(context.contains("Underwriter: What is the DSCR?"));
        assert!(context.contains("Assistant: 1.54x."));
    }
}
