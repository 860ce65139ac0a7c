//! MCP Tool Definitions
//!
//! Schemas for the seven index tools. Argument names are snake_case and match
//! the handler param structs field for field.

use super::protocol::{PropertySchema, Tool, ToolInputSchema};
use std::collections::HashMap;

pub const GET_OBJECT_API: &str = "get_object_api";
pub const SEARCH_BY_CAPABILITY: &str = "search_by_capability";
pub const GET_NAVIGATION_PATH: &str = "get_navigation_path";
pub const VALIDATE_SCRIPT: &str = "validate_script";
pub const FIND_EXAMPLES: &str = "find_examples";
pub const LIST_CATEGORIES: &str = "list_categories";
pub const LIST_ENTITIES_IN_CATEGORY: &str = "list_entities_in_category";

const TIERS: [&str; 3] = ["native", "stable", "comprehensive"];

/// Get all available tools
pub fn get_all_tools() -> Vec<Tool> {
    vec![
        get_object_api_tool(),
        search_by_capability_tool(),
        get_navigation_path_tool(),
        validate_script_tool(),
        find_examples_tool(),
        list_categories_tool(),
        list_entities_in_category_tool(),
    ]
}

fn prop(property_type: &str, description: &str) -> PropertySchema {
    PropertySchema {
        property_type: property_type.to_string(),
        description: Some(description.to_string()),
        default: None,
        enum_values: None,
        minimum: None,
        maximum: None,
    }
}

fn string_prop(description: &str) -> PropertySchema {
    prop("string", description)
}

fn integer_prop(description: &str, default: i64) -> PropertySchema {
    PropertySchema {
        default: Some(serde_json::json!(default)),
        minimum: Some(1.0),
        ..prop("integer", description)
    }
}

fn boolean_prop(description: &str, default: bool) -> PropertySchema {
    PropertySchema {
        default: Some(serde_json::json!(default)),
        ..prop("boolean", description)
    }
}

fn enum_prop(description: &str, values: &[&str], default: Option<&str>) -> PropertySchema {
    PropertySchema {
        default: default.map(|v| serde_json::json!(v)),
        enum_values: Some(values.iter().map(|s| s.to_string()).collect()),
        ..prop("string", description)
    }
}

fn tier_prop(description: &str) -> PropertySchema {
    enum_prop(description, &TIERS, None)
}

fn tool(
    name: &str,
    description: &str,
    properties: HashMap<String, PropertySchema>,
    required: &[&str],
) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: ToolInputSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: (!required.is_empty())
                .then(|| required.iter().map(|s| s.to_string()).collect()),
        },
    }
}

// === Object Tools ===

fn get_object_api_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "object_type".to_string(),
        string_prop("Object to look up: entity id, class name or interface (e.g. 'ILexEntry', 'LexEntryOperations', 'Sense')"),
    );
    properties.insert(
        "tier".to_string(),
        tier_prop("Only list members available at this tier (default: all tiers)"),
    );
    properties.insert(
        "include_capabilities".to_string(),
        boolean_prop("Include cross-tier capability mappings for the object", true),
    );

    tool(
        GET_OBJECT_API,
        "Get the methods, properties and relationships of one object type across all API tiers. USE WHEN: you know which object you are working with and need its exact member names. Partial names return a list of candidate objects.",
        properties,
        &["object_type"],
    )
}

fn list_categories_tool() -> Tool {
    tool(
        LIST_CATEGORIES,
        "List API categories (lexicon, grammar, texts, ...) with entity counts and per-tier member counts. USE WHEN: exploring the API surface for the first time.",
        HashMap::new(),
        &[],
    )
}

fn list_entities_in_category_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "category".to_string(),
        string_prop("Category name (e.g. 'lexicon', 'grammar', 'texts')"),
    );

    tool(
        LIST_ENTITIES_IN_CATEGORY,
        "List the object types in one category.",
        properties,
        &["category"],
    )
}

// === Search Tools ===

fn search_by_capability_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "query".to_string(),
        string_prop("What you want to do, in plain words (e.g. 'add gloss to sense', 'create new entry')"),
    );
    properties.insert(
        "max_results".to_string(),
        integer_prop("Maximum number of results to return", 10),
    );
    properties.insert(
        "tier".to_string(),
        tier_prop("Only return results available at this tier (default: all tiers)"),
    );

    tool(
        SEARCH_BY_CAPABILITY,
        "Search methods and objects by what they do. USE WHEN: you do not know the member name. THIS IS YOUR STARTING POINT for 'how do I ...' questions.",
        properties,
        &["query"],
    )
}

fn find_examples_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "method_name".to_string(),
        string_prop("Method name or fragment to find examples for"),
    );
    properties.insert(
        "operation_type".to_string(),
        enum_prop(
            "Operation type, or the iterate/search name patterns, to filter by",
            &["create", "read", "update", "delete", "other", "iterate", "search"],
            None,
        ),
    );
    properties.insert(
        "object_type".to_string(),
        string_prop("Object name or fragment to filter by (e.g. 'LexEntry', 'Sense')"),
    );
    properties.insert("tier".to_string(), tier_prop("Only members available at this tier"));
    properties.insert(
        "max_results".to_string(),
        integer_prop("Maximum number of members to return", 5),
    );

    tool(
        FIND_EXAMPLES,
        "Find usage examples attached to API members, filtered by method, operation type or object.",
        properties,
        &[],
    )
}

// === Navigation Tools ===

fn get_navigation_path_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "from_object".to_string(),
        string_prop("Starting object type (e.g. 'ILexEntry')"),
    );
    properties.insert(
        "to_object".to_string(),
        string_prop("Target object type (e.g. 'ILexExampleSentence')"),
    );

    tool(
        GET_NAVIGATION_PATH,
        "Find the shortest way to get from one object type to another, with the access pattern for every step and a traversal snippet.",
        properties,
        &["from_object", "to_object"],
    )
}

// === Validation Tools ===

fn validate_script_tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "script".to_string(),
        string_prop("Script source to check"),
    );
    properties.insert(
        "tier".to_string(),
        tier_prop("Tier the script targets (default: first tier of the configured fallback order)"),
    );

    tool(
        VALIDATE_SCRIPT,
        "Statically check a script for unknown members and members unavailable at the target tier, with 'did you mean' suggestions. USE WHEN: before running generated code.",
        properties,
        &["script"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_all_tools_count() {
        assert_eq!(get_all_tools().len(), 7);
    }

    #[test]
    fn test_tools_have_required_fields() {
        for tool in get_all_tools() {
            assert!(!tool.name.is_empty(), "Tool name should not be empty");
            assert!(
                tool.description.is_some(),
                "Tool {} should have description",
                tool.name
            );
        }
    }

    #[test]
    fn test_tool_names_are_unique() {
        let tools = get_all_tools();
        let names: Vec<_> = tools.iter().map(|t| &t.name).collect();
        let unique_names: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique_names.len(), "Tool names should be unique");
    }

    #[test]
    fn test_required_fields_are_declared_properties() {
        for tool in get_all_tools() {
            let properties = tool.input_schema.properties.unwrap_or_default();
            for required in tool.input_schema.required.unwrap_or_default() {
                assert!(
                    properties.contains_key(&required),
                    "{} requires undeclared property {}",
                    tool.name,
                    required
                );
            }
        }
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_value(get_navigation_path_tool()).unwrap();
        assert_eq!(json["inputSchema"]["type"], "object");
        assert_eq!(
            json["inputSchema"]["required"],
            serde_json::json!(["from_object", "to_object"])
        );

        let json = serde_json::to_value(list_categories_tool()).unwrap();
        assert!(json["inputSchema"].get("required").is_none());
    }
}
