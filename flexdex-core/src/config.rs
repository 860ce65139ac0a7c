//! Engine configuration
//!
//! Ranking weights, the validator suggestion threshold and the tier fallback
//! order are tunables rather than invariants. Every field has a default so a
//! partial JSON file only overrides what it names.

use crate::error::{LoadError, LoadResult};
use crate::model::Tier;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Weights for capability search scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchWeights {
    /// Bonus when the whole query equals a candidate name (default: 10.0)
    pub exact_name: f32,
    /// Per-term match against the name (default: 3.0)
    pub name: f32,
    /// Per-term match against the category (default: 2.0)
    pub category: f32,
    /// Per-term match against the operation type (default: 1.5)
    pub operation: f32,
    /// Per-term match against the description (default: 1.0)
    pub description: f32,
    /// Multiplier applied to synonym-only term matches (default: 0.5)
    pub synonym_factor: f32,
    /// Weight of the lexical score when the semantic stage runs (default: 0.7)
    pub lexical_weight: f32,
    /// Weight of the cosine similarity when the semantic stage runs (default: 0.3)
    pub semantic_weight: f32,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            exact_name: 10.0,
            name: 3.0,
            category: 2.0,
            operation: 1.5,
            description: 1.0,
            synonym_factor: 0.5,
            lexical_weight: 0.7,
            semantic_weight: 0.3,
        }
    }
}

/// Validator tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum normalized similarity for a "did you mean" suggestion (default: 0.7)
    pub suggestion_threshold: f64,
    /// Tiers consulted in order when a member is missing at the requested tier
    pub fallback_order: Vec<Tier>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            suggestion_threshold: 0.7,
            fallback_order: vec![Tier::Comprehensive, Tier::Stable, Tier::Native],
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchWeights,
    pub validator: ValidatorConfig,
    /// Result count when a request does not give one (default: 10)
    pub default_max_results: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search: SearchWeights::default(),
            validator: ValidatorConfig::default(),
            default_max_results: 10,
        }
    }
}

impl EngineConfig {
    /// Read a JSON configuration file.
    pub fn from_file(path: &Path) -> LoadResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| LoadError::malformed(path.display().to_string(), e.to_string()))?;
        config.validated(path)
    }

    fn validated(self, path: &Path) -> LoadResult<Self> {
        let threshold = self.validator.suggestion_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LoadError::malformed(
                path.display().to_string(),
                format!("suggestion_threshold {threshold} is outside 0.0..=1.0"),
            ));
        }
        if self.validator.fallback_order.is_empty() {
            return Err(LoadError::malformed(
                path.display().to_string(),
                "fallback_order must name at least one tier",
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_max_results, 10);
        assert_eq!(config.validator.suggestion_threshold, 0.7);
        assert_eq!(
            config.validator.fallback_order,
            vec![Tier::Comprehensive, Tier::Stable, Tier::Native]
        );
        assert!(config.search.name > config.search.category);
        assert!(config.search.category > config.search.operation);
        assert!(config.search.operation > config.search.description);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flexdex.json");
        std::fs::write(
            &path,
            r#"{"validator": {"suggestion_threshold": 0.8}, "search": {"name": 4.0}}"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.validator.suggestion_threshold, 0.8);
        assert_eq!(config.validator.fallback_order.len(), 3);
        assert_eq!(config.search.name, 4.0);
        assert_eq!(config.search.description, 1.0);
    }

    #[test]
    fn test_fallback_order_override() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"validator": {"fallback_order": ["native"]}}"#).unwrap();
        assert_eq!(config.validator.fallback_order, vec![Tier::Native]);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"validator": {"suggestion_threshold": 1.5}}"#).unwrap();
        assert!(EngineConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/flexdex.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
