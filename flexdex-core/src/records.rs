//! Source records and document ingestion
//!
//! The extraction step produces JSON documents keyed by tier and category.
//! Each document holds arrays of entity, member, relationship, mapping and
//! synonym records. Records are decoded one at a time so a record missing a
//! required field is rejected and reported without failing its document.

use crate::error::{LoadError, LoadResult};
use crate::model::{Cardinality, MemberKind, OperationType, Tier};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Entity record. Required: `id`, `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Member record. Required: `id`, `entity`, `name`, `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub entity: String,
    pub name: String,
    pub kind: MemberKind,
    #[serde(default)]
    pub signature: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    /// Explicit availability; defaults to the document tier
    #[serde(default)]
    pub tiers: Option<Vec<Tier>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub operation: Option<OperationType>,
}

/// Relationship record. Required: `from`, `to`, `label`, `access`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub from: String,
    pub to: String,
    pub label: String,
    pub access: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// Cross-tier mapping record. Required: `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub id: String,
    #[serde(default)]
    pub capability: String,
    #[serde(default)]
    pub native: Option<String>,
    #[serde(default)]
    pub stable: Option<String>,
    #[serde(default)]
    pub comprehensive: Option<String>,
}

/// Synonym record. Required: `term`, `synonyms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymRecord {
    pub term: String,
    pub synonyms: Vec<String>,
}

/// A record together with the document context it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub record: T,
    pub tier: Option<Tier>,
    pub category: Option<String>,
    /// `document#section[index]`, for diagnostics
    pub origin: String,
}

/// A record that failed ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub origin: String,
    pub reason: String,
}

/// Everything a load consumes, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub entities: Vec<Sourced<EntityRecord>>,
    pub members: Vec<Sourced<MemberRecord>>,
    pub relationships: Vec<Sourced<RelationshipRecord>>,
    pub mappings: Vec<Sourced<MappingRecord>>,
    pub synonyms: Vec<Sourced<SynonymRecord>>,
    pub rejected: Vec<RejectedRecord>,
    pub documents: usize,
}

impl RecordBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every `*.json` document under `dir`, recursively, in sorted path
    /// order. Hidden entries and cache files are skipped.
    pub fn from_dir(dir: &Path) -> LoadResult<Self> {
        let mut files = Vec::new();
        collect_documents(dir, &mut files)?;
        files.sort();

        let mut batch = RecordBatch::new();
        for path in files {
            let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let name = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            batch.add_document_str(&name, &text)?;
        }

        log::info!(
            "Read {} documents from {:?}: {} entities, {} members, {} relationships, {} rejected",
            batch.documents,
            dir,
            batch.entities.len(),
            batch.members.len(),
            batch.relationships.len(),
            batch.rejected.len()
        );
        Ok(batch)
    }

    /// Parse one document from its JSON text.
    pub fn add_document_str(&mut self, name: &str, text: &str) -> LoadResult<()> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| LoadError::malformed(name, e.to_string()))?;
        self.add_document(name, value)
    }

    /// Add one parsed document.
    pub fn add_document(&mut self, name: &str, value: Value) -> LoadResult<()> {
        let Value::Object(mut doc) = value else {
            return Err(LoadError::malformed(name, "document is not a JSON object"));
        };

        let tier = match doc.get("tier").and_then(Value::as_str) {
            Some(t) => Some(t.parse::<Tier>().map_err(|e| LoadError::malformed(name, e))?),
            None => None,
        };
        let category = doc
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string);

        let ctx = DocContext {
            name,
            tier,
            category: category.as_deref(),
        };

        ctx.decode_section(&mut doc, "entities", &mut self.entities, &mut self.rejected)?;
        ctx.decode_section(&mut doc, "members", &mut self.members, &mut self.rejected)?;
        ctx.decode_section(
            &mut doc,
            "relationships",
            &mut self.relationships,
            &mut self.rejected,
        )?;
        ctx.decode_section(&mut doc, "mappings", &mut self.mappings, &mut self.rejected)?;
        ctx.decode_section(&mut doc, "synonyms", &mut self.synonyms, &mut self.rejected)?;

        self.documents += 1;
        Ok(())
    }
}

struct DocContext<'a> {
    name: &'a str,
    tier: Option<Tier>,
    category: Option<&'a str>,
}

impl DocContext<'_> {
    fn decode_section<T: DeserializeOwned>(
        &self,
        doc: &mut serde_json::Map<String, Value>,
        section: &str,
        out: &mut Vec<Sourced<T>>,
        rejected: &mut Vec<RejectedRecord>,
    ) -> LoadResult<()> {
        let items = match doc.remove(section) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(LoadError::malformed(
                    self.name,
                    format!("'{section}' must be an array"),
                ))
            }
        };

        for (index, item) in items.into_iter().enumerate() {
            let origin = format!("{}#{}[{}]", self.name, section, index);
            match serde_json::from_value::<T>(item) {
                Ok(record) => out.push(Sourced {
                    record,
                    tier: self.tier,
                    category: self.category.map(str::to_string),
                    origin,
                }),
                Err(e) => {
                    log::warn!("Rejected record {}: {}", origin, e);
                    rejected.push(RejectedRecord {
                        origin,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn collect_documents(dir: &Path, out: &mut Vec<PathBuf>) -> LoadResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with('.'));
        if hidden {
            continue;
        }

        if path.is_dir() {
            collect_documents(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_context_applies_to_records() {
        let mut batch = RecordBatch::new();
        batch
            .add_document(
                "native/lexicon.json",
                json!({
                    "tier": "native",
                    "category": "lexicon",
                    "entities": [{"id": "Entry", "name": "LexEntry"}],
                    "members": [{"id": "Entry.SensesOS", "entity": "Entry", "name": "SensesOS", "kind": "property"}]
                }),
            )
            .unwrap();

        assert_eq!(batch.documents, 1);
        assert_eq!(batch.entities[0].tier, Some(Tier::Native));
        assert_eq!(batch.entities[0].category.as_deref(), Some("lexicon"));
        assert_eq!(batch.members[0].origin, "native/lexicon.json#members[0]");
    }

    #[test]
    fn test_missing_required_field_is_rejected_not_fatal() {
        let mut batch = RecordBatch::new();
        batch
            .add_document(
                "doc.json",
                json!({
                    "entities": [
                        {"id": "Entry", "name": "LexEntry"},
                        {"id": "Nameless"}
                    ]
                }),
            )
            .unwrap();

        assert_eq!(batch.entities.len(), 1);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].origin, "doc.json#entities[1]");
        assert!(batch.rejected[0].reason.contains("name"));
    }

    #[test]
    fn test_unknown_tier_fails_document() {
        let mut batch = RecordBatch::new();
        let err = batch
            .add_document("bad.json", json!({"tier": "cobol"}))
            .unwrap_err();
        assert!(matches!(err, LoadError::MalformedDocument { .. }));
    }

    #[test]
    fn test_non_array_section_fails_document() {
        let mut batch = RecordBatch::new();
        let err = batch
            .add_document("bad.json", json!({"entities": {"id": "x"}}))
            .unwrap_err();
        assert!(err.to_string().contains("'entities' must be an array"));
    }

    #[test]
    fn test_invalid_json_text() {
        let mut batch = RecordBatch::new();
        let err = batch.add_document_str("broken.json", "{ not json").unwrap_err();
        assert!(matches!(err, LoadError::MalformedDocument { .. }));
    }

    #[test]
    fn test_from_dir_reads_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("native")).unwrap();
        std::fs::create_dir_all(dir.path().join(".cache")).unwrap();
        std::fs::write(
            dir.path().join("native/b.json"),
            r#"{"entities": [{"id": "B", "name": "B"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"entities": [{"id": "A", "name": "A"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(".cache/x.json"), "garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let batch = RecordBatch::from_dir(dir.path()).unwrap();
        assert_eq!(batch.documents, 2);
        let ids: Vec<_> = batch.entities.iter().map(|e| e.record.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_from_dir_missing_directory() {
        let err = RecordBatch::from_dir(Path::new("/nonexistent/flexdex/index")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
