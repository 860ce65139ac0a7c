//! Object-centric lookups: one entity's API, categories, category listings.

use super::parse_tier;
use crate::backend::FlexdexBackend;
use crate::error::ServerResult;
use flexdex_core::{Cardinality, CategorySummary, CrossMapping, Entity, Member, QueryError};
use serde::{Deserialize, Serialize};

/// Partial matches returned when the object name does not resolve.
const MAX_PARTIAL_MATCHES: usize = 10;

// ==========================================
// get_object_api
// ==========================================

#[derive(Debug, Deserialize)]
pub struct GetObjectApiParams {
    /// Entity id, display name or alias (`ILexEntry`, `LexEntryOperations`, ...)
    pub object_type: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default = "default_true")]
    pub include_capabilities: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ObjectApiResponse {
    pub object_type: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<CrossMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<EntityMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// An incident relationship seen from the requested entity.
#[derive(Debug, Serialize)]
pub struct RelationshipView {
    pub direction: Direction,
    /// The entity at the other end
    pub entity: String,
    pub label: String,
    pub access: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Short entity listing used by partial matches and category listings.
#[derive(Debug, Serialize)]
pub struct EntityMatch {
    pub id: String,
    pub name: String,
    pub category: String,
    pub members: usize,
}

impl From<&Entity> for EntityMatch {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            category: entity.category.clone(),
            members: entity.members.len(),
        }
    }
}

impl FlexdexBackend {
    /// Full API of one entity, or partial-name matches when it does not resolve.
    pub fn handle_get_object_api(
        &self,
        params: GetObjectApiParams,
    ) -> ServerResult<ObjectApiResponse> {
        let tier = parse_tier(params.tier.as_deref())?;
        let snapshot = self.snapshot();

        let mut response = ObjectApiResponse {
            object_type: params.object_type.clone(),
            found: false,
            entity: None,
            members: Vec::new(),
            relationships: Vec::new(),
            capabilities: Vec::new(),
            matches: Vec::new(),
            message: None,
        };

        let entity = match snapshot.resolve(&params.object_type) {
            Ok(entity) => entity,
            Err(QueryError::NotFound(_)) => {
                response.matches = snapshot
                    .find_entities(&params.object_type)
                    .into_iter()
                    .take(MAX_PARTIAL_MATCHES)
                    .map(EntityMatch::from)
                    .collect();
                response.found = !response.matches.is_empty();
                if !response.found {
                    response.message = Some(format!(
                        "No API documentation found for '{}'. Try search_by_capability or list_categories to explore available APIs.",
                        params.object_type
                    ));
                }
                return Ok(response);
            }
            Err(e) => return Err(e.into()),
        };

        response.found = true;
        response.members = snapshot
            .members_of(&entity.id, tier)?
            .into_iter()
            .cloned()
            .collect();
        response.relationships = entity
            .edges
            .iter()
            .map(|&idx| {
                let edge = &snapshot.edges()[idx];
                let (direction, other) = if edge.from == entity.id {
                    (Direction::Outgoing, &edge.to)
                } else {
                    (Direction::Incoming, &edge.from)
                };
                RelationshipView {
                    direction,
                    entity: other.clone(),
                    label: edge.label.clone(),
                    access: edge.access.clone(),
                    cardinality: edge.cardinality,
                }
            })
            .collect();
        if params.include_capabilities {
            response.capabilities = snapshot
                .capabilities_of(&entity.id)?
                .into_iter()
                .cloned()
                .collect();
        }
        response.entity = Some(entity.clone());
        Ok(response)
    }
}

// ==========================================
// list_categories / list_entities_in_category
// ==========================================

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub generation: u64,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Deserialize)]
pub struct ListEntitiesParams {
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryEntitiesResponse {
    pub category: String,
    pub entities: Vec<EntityMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FlexdexBackend {
    pub fn handle_list_categories(&self) -> ServerResult<CategoriesResponse> {
        let snapshot = self.snapshot();
        Ok(CategoriesResponse {
            generation: snapshot.generation(),
            categories: snapshot.categories(),
        })
    }

    pub fn handle_list_entities_in_category(
        &self,
        params: ListEntitiesParams,
    ) -> ServerResult<CategoryEntitiesResponse> {
        let snapshot = self.snapshot();
        let entities: Vec<EntityMatch> = snapshot
            .entities_in_category(&params.category)
            .into_iter()
            .map(EntityMatch::from)
            .collect();
        let message = entities.is_empty().then(|| {
            let known: Vec<String> = snapshot.categories().into_iter().map(|c| c.name).collect();
            format!(
                "No entities in category '{}'. Known categories: {}",
                params.category,
                known.join(", ")
            )
        });
        Ok(CategoryEntitiesResponse {
            category: params.category,
            entities,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::loaded_backend;
    use flexdex_core::Tier;

    fn params(object_type: &str) -> GetObjectApiParams {
        GetObjectApiParams {
            object_type: object_type.to_string(),
            tier: None,
            include_capabilities: true,
        }
    }

    #[test]
    fn test_object_api_by_alias() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend.handle_get_object_api(params("ILexSense")).unwrap();
        assert!(response.found);
        assert_eq!(response.entity.as_ref().unwrap().id, "Sense");
        let names: Vec<_> = response.members.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"Gloss"));
        assert!(names.contains(&"SetGloss"));
        assert_eq!(response.capabilities.len(), 1);

        let directions: Vec<_> = response
            .relationships
            .iter()
            .map(|r| (r.direction, r.entity.as_str()))
            .collect();
        assert_eq!(
            directions,
            vec![(Direction::Incoming, "Entry"), (Direction::Outgoing, "Example")]
        );
    }

    #[test]
    fn test_object_api_tier_filter() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let mut request = params("Sense");
        request.tier = Some("comprehensive".to_string());
        let response = backend.handle_get_object_api(request).unwrap();
        assert!(response
            .members
            .iter()
            .all(|m| m.available_at(Tier::Comprehensive)));
        assert_eq!(response.members.len(), 1);
    }

    #[test]
    fn test_object_api_partial_match() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend.handle_get_object_api(params("lex")).unwrap();
        assert!(response.found);
        assert!(response.entity.is_none());
        let ids: Vec<_> = response.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["Entry", "Sense", "Example"]);
    }

    #[test]
    fn test_object_api_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend.handle_get_object_api(params("Nonexistent")).unwrap();
        assert!(!response.found);
        assert!(response.message.unwrap().contains("Nonexistent"));
    }

    #[test]
    fn test_categories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend.handle_list_categories().unwrap();
        let names: Vec<_> = response.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["lexicon", "scripture"]);
        assert_eq!(response.categories[0].entities, 3);
        assert_eq!(response.generation, 1);
    }

    #[test]
    fn test_entities_in_category() {
        let dir = tempfile::tempdir().unwrap();
        let backend = loaded_backend(dir.path());

        let response = backend
            .handle_list_entities_in_category(ListEntitiesParams {
                category: "Scripture".to_string(),
            })
            .unwrap();
        assert_eq!(response.entities.len(), 1);
        assert_eq!(response.entities[0].id, "Book");

        let response = backend
            .handle_list_entities_in_category(ListEntitiesParams {
                category: "texts".to_string(),
            })
            .unwrap();
        assert!(response.entities.is_empty());
        assert!(response.message.unwrap().contains("lexicon"));
    }
}
