//! Declarative description of a constrained-generation schema.
//!
//! Backend-agnostic: a gateway implementation maps this tree onto whatever
//! constrained-decoding facility its backend offers (e.g., a Gemini
//! `responseSchema`). Receipt-side validation never relies on the backend
//! honoring the constraint.

use serde::{Deserialize, Serialize};

/// One node of a generation schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaNode {
    /// An object with a required-field list and ordered properties.
    Object {
        required: Vec<String>,
        properties: Vec<(String, SchemaNode)>,
    },
    /// A homogeneous array.
    Array { items: Box<SchemaNode> },
    /// A string leaf.
    String,
    /// A numeric leaf.
    Number,
    /// A union of leaf alternatives (e.g., string-or-number).
    Union { variants: Vec<SchemaNode> },
}

impl SchemaNode {
    /// Builds an object node where every property is required.
    pub fn object<const N: usize>(properties: [(&str, SchemaNode); N]) -> Self {
        Self::Object {
            required: properties.iter().map(|(name, _)| name.to_string()).collect(),
            properties: properties
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
        }
    }

    /// Builds an array node.
    pub fn array(items: SchemaNode) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// Builds a union node.
    pub fn union<const N: usize>(variants: [SchemaNode; N]) -> Self {
        Self::Union {
            variants: variants.into_iter().collect(),
        }
    }
}

/// The credit-scorecard schema: pillars of weighted metrics with numeric
/// aggregates and a decision zone.
pub fn assessment_schema() -> SchemaNode {
    let metric = SchemaNode::object([
        ("metric", SchemaNode::String),
        ("definition", SchemaNode::String),
        (
            "applicant_value",
            SchemaNode::union([SchemaNode::String, SchemaNode::Number]),
        ),
        ("score", SchemaNode::Number),
    ]);

    let pillar = SchemaNode::object([
        ("pillar", SchemaNode::String),
        ("weight", SchemaNode::Number),
        ("metrics", SchemaNode::array(metric)),
        ("pillar_avg", SchemaNode::Number),
        ("weighted_score", SchemaNode::Number),
    ]);

    SchemaNode::object([
        ("company_name", SchemaNode::String),
        ("industry", SchemaNode::String),
        ("assessment_date", SchemaNode::String),
        ("pillars", SchemaNode::array(pillar)),
        ("total_score", SchemaNode::Number),
        ("decision_zone", SchemaNode::String),
    ])
}
