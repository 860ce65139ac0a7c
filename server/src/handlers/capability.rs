//! Capability search and example lookup.

use super::{parse_tier, positive_limit};
use crate::backend::FlexdexBackend;
use crate::error::{ServerError, ServerResult};
use flexdex_core::{
    search, ExampleOperation, ExampleQuery, OperationType, SearchHit, Tier, TierSet,
};
use serde::{Deserialize, Serialize};

const DEFAULT_EXAMPLES: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SearchByCapabilityParams {
    /// Natural-language description of the wanted operation
    pub query: String,
    #[serde(default)]
    pub max_results: Option<i64>,
    #[serde(default)]
    pub tier: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Whether semantic re-ranking contributed to the scores
    pub semantic: bool,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct FindExamplesParams {
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub max_results: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExampleEntry {
    pub member: String,
    pub entity: String,
    pub signature: String,
    pub operation: OperationType,
    pub tiers: TierSet,
    pub examples: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub examples: Vec<ExampleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FlexdexBackend {
    pub fn handle_search_by_capability(
        &self,
        params: SearchByCapabilityParams,
    ) -> ServerResult<SearchResponse> {
        let tier = parse_tier(params.tier.as_deref())?;
        let max_results = positive_limit(params.max_results, self.config.default_max_results)?;
        let snapshot = self.snapshot();
        let options = self.search_options();

        let results = search(&snapshot, &params.query, max_results, tier, options)?;
        Ok(SearchResponse {
            query: params.query,
            tier,
            semantic: options.embedder.is_some() && snapshot.embeddings().is_some(),
            results,
        })
    }

    pub fn handle_find_examples(&self, params: FindExamplesParams) -> ServerResult<ExamplesResponse> {
        let operation = params
            .operation_type
            .as_deref()
            .map(str::parse::<ExampleOperation>)
            .transpose()
            .map_err(|e| ServerError::invalid("operation_type", e))?;
        let query = ExampleQuery {
            method: params.method_name,
            operation,
            object: params.object_type,
            tier: parse_tier(params.tier.as_deref())?,
            limit: positive_limit(params.max_results, DEFAULT_EXAMPLES)?,
        };

        let snapshot = self.snapshot();
        let examples: Vec<ExampleEntry> = snapshot
            .find_examples(&query)
            .into_iter()
            .map(|member| ExampleEntry {
                member: member.id.clone(),
                entity: member.entity.clone(),
                signature: member.display_signature(),
                operation: member.operation,
                tiers: member.tiers,
                examples: member.examples.clone(),
            })
            .collect();
        let message = examples
            .is_empty()
            .then(|| "No examples match these filters".to_string());
        Ok(ExamplesResponse { examples, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{loaded_backend, write_index};
    use flexdex_core::{EngineConfig, HashingEmbedder, SnapshotStore};
    use std::sync::Arc;

    fn search_params(query: &str) -> SearchByCapabilityParams {
        SearchByCapabilityParams {
            query: query.to_string(),
            max_results: None,
            tier: None,
        }
    }

    #[test]
    fn test_search_finds_gloss_setter() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend
            .handle_search_by_capability(search_params("set gloss"))
            .unwrap();
        assert!(!response.semantic);
        assert_eq!(response.results[0].id, "Sense.SetGloss");
    }

    #[test]
    fn test_search_empty_query() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend.handle_search_by_capability(search_params("  ")).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_search_rejects_zero_limit() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let mut params = search_params("gloss");
        params.max_results = Some(0);
        assert!(matches!(
            backend.handle_search_by_capability(params),
            Err(ServerError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_search_tier_filter() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let mut params = search_params("gloss");
        params.tier = Some("native".to_string());
        let response = backend.handle_search_by_capability(params).unwrap();
        assert!(response
            .results
            .iter()
            .all(|hit| hit.tiers.contains(Tier::Native)));
        assert!(response.results.iter().all(|hit| hit.id != "Sense.SetGloss"));
    }

    #[test]
    fn test_semantic_flag_with_embedder() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path());
        let backend = FlexdexBackend::new(Arc::new(SnapshotStore::empty()), EngineConfig::default())
            .with_index_dir(dir.path())
            .with_embedder(Arc::new(HashingEmbedder::default()));
        backend.reload().unwrap();

        let response = backend
            .handle_search_by_capability(search_params("gloss"))
            .unwrap();
        assert!(response.semantic);
        assert!(!response.results.is_empty());
    }

    #[test]
    fn test_find_examples_filters() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend
            .handle_find_examples(FindExamplesParams {
                method_name: None,
                operation_type: Some("update".to_string()),
                object_type: Some("sense".to_string()),
                tier: None,
                max_results: None,
            })
            .unwrap();
        assert_eq!(response.examples.len(), 1);
        assert_eq!(response.examples[0].member, "Sense.SetGloss");
        assert_eq!(response.examples[0].signature, "SetGloss(sense, text, ws)");
    }

    fn operation_params(operation: &str) -> FindExamplesParams {
        FindExamplesParams {
            method_name: None,
            operation_type: Some(operation.to_string()),
            object_type: None,
            tier: None,
            max_results: None,
        }
    }

    #[test]
    fn test_find_examples_iterate() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend
            .handle_find_examples(operation_params("iterate"))
            .unwrap();
        let members: Vec<_> = response.examples.iter().map(|e| e.member.as_str()).collect();
        assert_eq!(members, vec!["Entry.GetAll"]);
    }

    #[test]
    fn test_find_examples_search() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend
            .handle_find_examples(operation_params("search"))
            .unwrap();
        let members: Vec<_> = response.examples.iter().map(|e| e.member.as_str()).collect();
        assert_eq!(members, vec!["Book.FindByTitle"]);
        assert_eq!(response.examples[0].operation, OperationType::Read);
    }

    #[test]
    fn test_find_examples_bad_operation() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let result = backend.handle_find_examples(FindExamplesParams {
            method_name: None,
            operation_type: Some("teleport".to_string()),
            object_type: None,
            tier: None,
            max_results: None,
        });
        assert!(matches!(result, Err(ServerError::InvalidArgument { .. })));
    }

    #[test]
    fn test_find_examples_none_match() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend
            .handle_find_examples(FindExamplesParams {
                method_name: Some("Delete".to_string()),
                operation_type: None,
                object_type: None,
                tier: None,
                max_results: None,
            })
            .unwrap();
        assert!(response.examples.is_empty());
        assert!(response.message.is_some());
    }
}
