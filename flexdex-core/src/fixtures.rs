//! Sample lexicon index shared by unit tests.

use crate::records::RecordBatch;
use crate::snapshot::Snapshot;
use serde_json::json;

pub(crate) fn lexicon_batch() -> RecordBatch {
    let mut batch = RecordBatch::new();

    batch
        .add_document(
            "native/lexicon.json",
            json!({
                "tier": "native",
                "category": "lexicon",
                "entities": [
                    {"id": "Entry", "name": "LexEntry", "aliases": ["ILexEntry"],
                     "description": "A lexical entry (headword) in the lexicon"},
                    {"id": "Sense", "name": "LexSense", "aliases": ["ILexSense"],
                     "description": "One meaning of a lexical entry"},
                    {"id": "Example", "name": "LexExampleSentence", "aliases": ["ILexExampleSentence"],
                     "description": "Example sentence illustrating a sense"},
                    {"id": "Allomorph", "name": "MoForm", "aliases": ["IMoForm"], "category": "grammar",
                     "description": "Surface form of a morpheme"},
                    {"id": "Project", "name": "LcmCache", "aliases": ["project"], "category": "general",
                     "description": "Open project and its repositories"},
                    {"id": "Book", "name": "ScrBook", "category": "scripture",
                     "description": "A book of scripture"}
                ],
                "members": [
                    {"id": "Entry.SensesOS", "entity": "Entry", "name": "SensesOS", "kind": "property",
                     "return_type": "ILexSense[]", "description": "Senses owned by the entry"},
                    {"id": "Entry.LexemeFormOA", "entity": "Entry", "name": "LexemeFormOA", "kind": "property",
                     "return_type": "IMoForm", "description": "Lexeme form of the entry"},
                    {"id": "Entry.HomographNumber", "entity": "Entry", "name": "HomographNumber", "kind": "property",
                     "return_type": "int"},
                    {"id": "Sense.Gloss", "entity": "Sense", "name": "Gloss", "kind": "property",
                     "return_type": "ITsMultiString",
                     "description": "Gloss of the sense in each writing system",
                     "examples": ["text = sense.Gloss.get_String(ws).Text"]},
                    {"id": "Sense.ExamplesOS", "entity": "Sense", "name": "ExamplesOS", "kind": "property",
                     "return_type": "ILexExampleSentence[]",
                     "description": "Example sentences owned by the sense",
                     "examples": ["for example in sense.ExamplesOS:"]},
                    {"id": "Example.Example", "entity": "Example", "name": "Example", "kind": "property",
                     "return_type": "ITsMultiString", "description": "Text of the example sentence"},
                    {"id": "Allomorph.Form", "entity": "Allomorph", "name": "Form", "kind": "property",
                     "return_type": "ITsMultiString", "description": "Written form of the allomorph"}
                ],
                "relationships": [
                    {"from": "Project", "to": "Entry", "label": "entries", "access": "project.LexDb.Entries",
                     "cardinality": "many"},
                    {"from": "Entry", "to": "Sense", "label": "senses", "access": "entry.SensesOS",
                     "cardinality": "many"},
                    {"from": "Sense", "to": "Example", "label": "examples", "access": "sense.ExamplesOS",
                     "cardinality": "many"},
                    {"from": "Entry", "to": "Allomorph", "label": "lexeme form", "access": "entry.LexemeFormOA"}
                ]
            }),
        )
        .expect("native fixture");

    batch
        .add_document(
            "stable/lexicon.json",
            json!({
                "tier": "stable",
                "category": "lexicon",
                "members": [
                    {"id": "Entry.LexiconAddEntry", "entity": "Entry", "name": "LexiconAddEntry", "kind": "method",
                     "signature": ["lexeme_form"], "return_type": "ILexEntry",
                     "operation": "create",
                     "description": "Add a new entry to the lexicon",
                     "examples": ["entry = project.LexiconAddEntry('run')"]},
                    {"id": "Entry.LexiconGetHeadword", "entity": "Entry", "name": "LexiconGetHeadword", "kind": "method",
                     "signature": ["entry"], "return_type": "str", "operation": "read",
                     "description": "Headword of an entry"}
                ]
            }),
        )
        .expect("stable fixture");

    batch
        .add_document(
            "comprehensive/lexicon.json",
            json!({
                "tier": "comprehensive",
                "category": "lexicon",
                "members": [
                    {"id": "Entry.GetAll", "entity": "Entry", "name": "GetAll", "kind": "method",
                     "return_type": "ILexEntry[]", "description": "Iterate over all lexical entries",
                     "examples": ["for entry in project.LexEntry.GetAll():"]},
                    {"id": "Entry.Create", "entity": "Entry", "name": "Create", "kind": "method",
                     "signature": ["lexeme_form", "morph_type"], "return_type": "ILexEntry",
                     "description": "Create a new lexical entry",
                     "examples": ["entry = project.LexEntry.Create('run', 'stem')"]},
                    {"id": "Entry.AddSense", "entity": "Entry", "name": "AddSense", "kind": "method",
                     "signature": ["entry", "gloss"], "return_type": "ILexSense",
                     "description": "Add a new sense to an entry",
                     "examples": ["sense = project.LexEntry.AddSense(entry, 'to run')"]},
                    {"id": "Entry.Delete", "entity": "Entry", "name": "Delete", "kind": "method",
                     "signature": ["entry"], "description": "Delete an entry and everything it owns"},
                    {"id": "Sense.SetGloss", "entity": "Sense", "name": "SetGloss", "kind": "method",
                     "signature": ["sense", "text", "ws"], "description": "Set the gloss text of a sense",
                     "examples": ["project.Senses.SetGloss(sense, 'run', 'en')"]},
                    {"id": "Sense.GetGloss", "entity": "Sense", "name": "GetGloss", "kind": "method",
                     "signature": ["sense", "ws"], "return_type": "str",
                     "description": "Get the gloss text of a sense",
                     "examples": ["gloss = project.Senses.GetGloss(sense, 'en')"]},
                    {"id": "Sense.GetExamples", "entity": "Sense", "name": "GetExamples", "kind": "method",
                     "signature": ["sense"], "return_type": "ILexExampleSentence[]",
                     "description": "Example sentences of a sense"}
                ]
            }),
        )
        .expect("comprehensive fixture");

    batch
        .add_document(
            "mappings.json",
            json!({
                "members": [
                    {"id": "Entry.LexiconGetLexemeForm", "entity": "Entry", "name": "LexiconGetLexemeForm",
                     "kind": "method", "signature": ["entry"], "return_type": "str",
                     "description": "Lexeme form text of an entry"}
                ],
                "mappings": [
                    {"id": "sense-gloss", "capability": "gloss of a sense",
                     "native": "Sense.Gloss", "comprehensive": "Sense.SetGloss"},
                    {"id": "sense-examples", "capability": "example sentences of a sense",
                     "native": "Sense.ExamplesOS"},
                    {"id": "entry-create", "capability": "create an entry",
                     "stable": "Entry.LexiconAddEntry", "comprehensive": "Entry.Create"},
                    {"id": "entry-lexeme-form", "capability": "lexeme form of an entry",
                     "native": "Entry.LexemeFormOA", "stable": "Entry.LexiconGetLexemeForm"}
                ],
                "synonyms": [
                    {"term": "definition", "synonyms": ["gloss", "meaning"]}
                ]
            }),
        )
        .expect("mapping fixture");

    batch
}

pub(crate) fn lexicon_snapshot() -> Snapshot {
    Snapshot::load(&lexicon_batch()).expect("fixture loads")
}
