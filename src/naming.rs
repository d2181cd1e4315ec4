//! Case conversion and identifier helpers shared by every layer.
//!
//! Both conversions are ASCII-only and locale independent. They are applied to
//! identifier-like input (table and column names), never to arbitrary text.

/// Converts `user_account`, `user-account` or `userAccount` into `UserAccount`.
///
/// A boundary is inserted before any uppercase letter that follows a lowercase
/// letter, the result is split on `_` and `-`, and the first character of every
/// remaining segment is uppercased. The rest of each segment is kept as-is.
pub fn to_pascal_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for segment in split_words(input) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Converts `UserAccount`, `HTTPServer` or `user-account` into snake case.
///
/// Boundaries go before an uppercase letter that follows a lowercase letter,
/// and before an uppercase letter that starts a new word after a run of
/// uppercase letters (`HTTPServer` -> `http_server`).
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    for (idx, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() && idx > 0 {
            let prev = chars[idx - 1];
            let next = chars.get(idx + 1).copied();
            let after_lower = prev.is_ascii_lowercase();
            let acronym_end =
                prev.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || acronym_end {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out.replace('-', "_")
}

fn split_words(input: &str) -> Vec<String> {
    let mut bounded = String::with_capacity(input.len() + 4);
    let mut prev: Option<char> = None;
    for ch in input.chars() {
        if ch.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase()) {
            bounded.push('_');
        }
        bounded.push(ch);
        prev = Some(ch);
    }
    bounded
        .split(['_', '-'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

const STRICT_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "abstract", "become", "box", "do", "final", "gen", "macro", "override",
    "priv", "try", "typeof", "unsized", "virtual", "yield",
];

// Keywords that cannot be raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

pub fn is_reserved_word(ident: &str) -> bool {
    STRICT_KEYWORDS.contains(&ident) || NON_RAW_KEYWORDS.contains(&ident)
}

/// Returns a field identifier that is safe to emit: `type` becomes `r#type`,
/// `self` becomes `self_`.
pub fn safe_ident(ident: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&ident) {
        format!("{ident}_")
    } else if STRICT_KEYWORDS.contains(&ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}

/// `true` when `input` is a plain ASCII identifier usable as a module name.
pub fn is_valid_ident(input: &str) -> bool {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
