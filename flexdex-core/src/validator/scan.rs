//! Lightweight structural scan of a script snippet
//!
//! Not a parser. Statements are split on newlines and `;` outside string
//! literals, comments and string contents are blanked, and every dotted access
//! chain is recorded together with simple assignments and `for` loop bindings.
//! Anything else is ignored.

use regex::Regex;
use std::sync::LazyLock;

/// `for <var> in <expr>:`
static LOOP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*for\s+([\p{L}_]\w*)\s+in\s+").expect("loop pattern")
});

/// `<var> =`; `==` is rejected by the caller
static ASSIGN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([\p{L}_]\w*)\s*=").expect("assignment pattern")
});

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "False", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "None",
    "nonlocal", "not", "or", "pass", "raise", "return", "True", "try", "while", "with", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Assign,
    Loop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Binding {
    pub var: String,
    pub kind: BindingKind,
    /// Byte offset of the bound expression in the statement text
    pub expr_start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub name: String,
    /// Followed by a call `(...)`
    pub call: bool,
    /// Followed by a subscript `[...]`
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chain {
    pub start: usize,
    pub segments: Vec<Segment>,
}

impl Chain {
    pub fn root(&self) -> &Segment {
        &self.segments[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    /// 1-based line the statement starts on
    pub line: usize,
    pub text: String,
    pub binding: Option<Binding>,
    pub chains: Vec<Chain>,
}

/// Scan a snippet into statements.
pub(crate) fn scan(source: &str) -> Vec<Statement> {
    split_statements(source)
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(line, text)| {
            let binding = binding_of(&text);
            let chains = chains_of(&text);
            Statement {
                line,
                text,
                binding,
                chains,
            }
        })
        .collect()
}

/// Split on newlines and `;` outside strings. Comments are dropped and
/// string contents removed (the quotes stay).
fn split_statements(source: &str) -> Vec<(usize, String)> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut line = 1;
    let mut start_line = 1;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut in_comment = false;

    for ch in source.chars() {
        if ch == '\n' {
            // Unterminated strings end at the line break
            quote = None;
            escaped = false;
            in_comment = false;
            statements.push((start_line, std::mem::take(&mut current)));
            line += 1;
            start_line = line;
            continue;
        }
        if in_comment {
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                current.push(ch);
                quote = None;
            }
            continue;
        }
        match ch {
            '#' => in_comment = true,
            '"' | '\'' => {
                current.push(ch);
                quote = Some(ch);
            }
            ';' => {
                statements.push((start_line, std::mem::take(&mut current)));
                start_line = line;
            }
            _ => current.push(ch),
        }
    }
    statements.push((start_line, current));
    statements
}

fn binding_of(text: &str) -> Option<Binding> {
    if let Some(caps) = LOOP_PATTERN.captures(text) {
        let whole = caps.get(0)?;
        return Some(Binding {
            var: caps[1].to_string(),
            kind: BindingKind::Loop,
            expr_start: whole.end(),
        });
    }
    let caps = ASSIGN_PATTERN.captures(text)?;
    let rest = &text[caps.get(0)?.end()..];
    if rest.starts_with('=') {
        return None;
    }
    let expr_start = text.len() - rest.trim_start().len();
    Some(Binding {
        var: caps[1].to_string(),
        kind: BindingKind::Assign,
        expr_start,
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Every access chain in the statement, including chains nested in call
/// arguments, in order of their start offset.
fn chains_of(text: &str) -> Vec<Chain> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut chains = Vec::new();

    for i in 0..chars.len() {
        let (offset, c) = chars[i];
        if !is_ident_start(c) {
            continue;
        }
        if i > 0 && is_ident_char(chars[i - 1].1) {
            continue;
        }
        // Later segments belong to the chain that started before them
        if prev_non_space(&chars, i) == Some('.') {
            continue;
        }
        if let Some(chain) = parse_chain(&chars, i, offset) {
            chains.push(chain);
        }
    }
    chains
}

fn prev_non_space(chars: &[(usize, char)], i: usize) -> Option<char> {
    chars[..i]
        .iter()
        .rev()
        .map(|(_, c)| *c)
        .find(|c| !c.is_whitespace())
}

fn parse_chain(chars: &[(usize, char)], mut i: usize, start: usize) -> Option<Chain> {
    let mut segments = Vec::new();

    loop {
        let name = read_ident(chars, &mut i);
        if name.is_empty() {
            break;
        }
        let mut segment = Segment {
            name,
            call: false,
            indexed: false,
        };

        loop {
            skip_spaces(chars, &mut i);
            match chars.get(i).map(|(_, c)| *c) {
                Some('(') => {
                    segment.call = true;
                    i = skip_balanced(chars, i, '(', ')');
                }
                Some('[') => {
                    segment.indexed = true;
                    i = skip_balanced(chars, i, '[', ']');
                }
                _ => break,
            }
        }
        segments.push(segment);

        skip_spaces(chars, &mut i);
        if chars.get(i).map(|(_, c)| *c) == Some('.') {
            i += 1;
            skip_spaces(chars, &mut i);
        } else {
            break;
        }
    }

    let root = segments.first()?;
    if KEYWORDS.contains(&root.name.as_str()) {
        return None;
    }
    Some(Chain { start, segments })
}

fn read_ident(chars: &[(usize, char)], i: &mut usize) -> String {
    let mut name = String::new();
    if chars.get(*i).map_or(false, |(_, c)| is_ident_start(*c)) {
        while let Some((_, c)) = chars.get(*i) {
            if !is_ident_char(*c) {
                break;
            }
            name.push(*c);
            *i += 1;
        }
    }
    name
}

fn skip_spaces(chars: &[(usize, char)], i: &mut usize) {
    while chars.get(*i).map_or(false, |(_, c)| *c == ' ' || *c == '\t') {
        *i += 1;
    }
}

/// Index just past the bracket matching the one at `i`
fn skip_balanced(chars: &[(usize, char)], mut i: usize, open: char, close: char) -> usize {
    let mut depth = 0usize;
    while let Some((_, c)) = chars.get(i) {
        if *c == open {
            depth += 1;
        } else if *c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i + 1;
            }
        }
        i += 1;
    }
    i
}
