//! Validation report types

use crate::model::Tier;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The receiver is known but has no member with this name
    UnknownMember,
    /// The member exists, but not at the requested tier
    TierUnavailable,
    /// The receiver type could not be inferred; the rest of the chain is unchecked
    PartialAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    /// The identifier the diagnostic is about
    pub identifier: String,
    /// Inferred receiver entity, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Tiers at which the member is available, in fallback order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_at: Vec<Tier>,
}

/// A proposed correction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub line: usize,
    pub original: String,
    pub replacement: String,
    /// Tier to fall back to, for members missing at the requested tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub tier: Tier,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<Suggestion>,
    /// Statements the scan recognized
    pub statements: usize,
}

impl ValidationReport {
    pub(crate) fn new(tier: Tier) -> Self {
        Self {
            tier,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            statements: 0,
        }
    }

    /// No errors (warnings allowed)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
