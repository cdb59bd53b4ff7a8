//! Query normalization and translation into each backend's dialect.

pub(crate) mod ast;
pub mod exact;
pub mod keywords;
pub(crate) mod lexer;
pub mod plain;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use exact::ExactMatchStyle;

static OR_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)or").expect("operator pattern is valid"));
static AND_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)and").expect("operator pattern is valid"));

/// How `normalize` finds the `and`/`or` operators it upper-cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Replace every case variant anywhere in the text, so `color` becomes
    /// `colOR`. Backend queries stay byte-compatible with earlier reports.
    #[default]
    Substring,
    /// Replace only whole words delimited by whitespace, parentheses or quotes.
    Token,
}

impl NormalizeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "substring" => Some(Self::Substring),
            "token" => Some(Self::Token),
            _ => None,
        }
    }
}

/// Canonicalize the boolean operators of a raw query to `AND`/`OR`.
pub fn normalize(raw: &str, mode: NormalizeMode) -> String {
    match mode {
        NormalizeMode::Substring => {
            let q = OR_ANYWHERE.replace_all(raw, "OR");
            AND_ANYWHERE.replace_all(&q, "AND").into_owned()
        }
        NormalizeMode::Token => normalize_tokens(raw),
    }
}

fn normalize_tokens(raw: &str) -> String {
    fn flush(word: &mut String, out: &mut String) {
        if word.eq_ignore_ascii_case("and") {
            out.push_str("AND");
        } else if word.eq_ignore_ascii_case("or") {
            out.push_str("OR");
        } else {
            out.push_str(word);
        }
        word.clear();
    }

    let mut out = String::with_capacity(raw.len());
    let mut word = String::new();
    for c in raw.chars() {
        if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
            flush(&mut word, &mut out);
            out.push(c);
        } else {
            word.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub normalize: NormalizeMode,
    pub exact: ExactMatchStyle,
}

/// One user query rendered for every backend.
#[derive(Debug, Clone, Serialize)]
pub struct TranslatedQuery {
    /// Operator-normalized text; also what the news backend receives.
    pub normalized: String,
    /// Boolean exact-match form for the open-access aggregator.
    pub exact: String,
    /// Bag of words for the structured-research backend.
    pub plain: String,
    /// `primaryKeywords` for the patent backend.
    pub keywords: Vec<String>,
}

impl QueryOptions {
    pub fn translate(&self, raw: &str) -> TranslatedQuery {
        let normalized = normalize(raw, self.normalize);
        TranslatedQuery {
            exact: exact::translate(&normalized, &self.exact),
            plain: plain::translate(&normalized),
            keywords: keywords::translate(&normalized),
            normalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_mode_uppercases_all_case_variants() {
        assert_eq!(
            normalize("solar or wind And battery oR Grid", NormalizeMode::Substring),
            "solar OR wind AND battery OR Grid"
        );
    }

    #[test]
    fn substring_mode_rewrites_inside_words() {
        assert_eq!(
            normalize("color sensor and android", NormalizeMode::Substring),
            "colOR sensOR AND ANDroid"
        );
    }

    #[test]
    fn token_mode_leaves_words_alone() {
        assert_eq!(
            normalize(r#"(color or "sand and gravel")and android"#, NormalizeMode::Token),
            r#"(color OR "sand AND gravel")AND android"#
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "solar and (battery or storage)",
            "Color OR oRange AnD andes",
            r#""rock and roll" or jazz"#,
            "",
            "ORANGE",
        ];
        for mode in [NormalizeMode::Substring, NormalizeMode::Token] {
            for q in samples {
                let once = normalize(q, mode);
                assert_eq!(normalize(&once, mode), once, "mode {mode:?}, input {q:?}");
            }
        }
    }

    #[test]
    fn normalize_mode_parses_config_values() {
        assert_eq!(NormalizeMode::parse("Token"), Some(NormalizeMode::Token));
        assert_eq!(NormalizeMode::parse(" substring "), Some(NormalizeMode::Substring));
        assert_eq!(NormalizeMode::parse("regex"), None);
    }

    #[test]
    fn translate_fills_every_dialect() {
        let t = QueryOptions::default().translate("(solar and battery)");
        assert_eq!(t.normalized, "(solar AND battery)");
        assert_eq!(t.exact, r#"("solar" AND "battery")"#);
        assert_eq!(t.plain, "solar battery");
        assert_eq!(t.keywords, vec!["solar", "battery"]);
    }
}
