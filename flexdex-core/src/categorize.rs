//! Category inference for entities that arrive without a category tag.

/// Name prefixes that identify a domain category. Checked after an interface
/// `I` prefix has been stripped; longer prefixes come first.
const PREFIX_RULES: &[(&str, &str)] = &[
    ("Reversal", "reversal"),
    ("Text", "texts"),
    ("Wfi", "wordform"),
    ("Scr", "scripture"),
    ("Lex", "lexicon"),
    ("Mo", "grammar"),
    ("Ph", "grammar"),
    ("Fs", "grammar"),
    ("Ds", "discourse"),
    ("Rn", "notebook"),
    ("St", "texts"),
];

/// Substrings that identify a category when no prefix rule applies.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["sense", "entry", "lexeme", "headword"], "lexicon"),
    (&["paragraph", "footnote", "interlin", "baseline"], "texts"),
    (&["wordform", "concordance"], "wordform"),
];

/// Infer a category for an entity name, or `None` if nothing matches.
pub fn infer_category(name: &str) -> Option<&'static str> {
    let bare = strip_interface_prefix(name);

    for (prefix, category) in PREFIX_RULES {
        if bare.starts_with(prefix) {
            return Some(category);
        }
    }

    let lower = name.to_ascii_lowercase();
    for (keywords, category) in KEYWORD_RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some(category);
        }
    }

    if name.contains("Factory") {
        return Some("factory");
    }
    if name.contains("Repository") {
        return Some("repository");
    }
    None
}

/// `ILexEntry` -> `LexEntry`; names like `Index` are left alone.
pub fn strip_interface_prefix(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('I'), Some(second)) if second.is_ascii_uppercase() => &name[1..],
        _ => name,
    }
}
