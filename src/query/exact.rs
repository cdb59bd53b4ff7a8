//! Boolean-preserving translation for the open-access aggregator.

use super::lexer::{self, Token};

/// Placeholder substituted with each literal in an exact-match template.
pub const KEYWORD_PLACEHOLDER: &str = "KEYWORD";
pub const DEFAULT_TEMPLATE: &str = "\"KEYWORD\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExactMatchStyle {
    /// Substitute every literal into a template containing `KEYWORD`.
    Template(String),
    /// Expand every literal `T` into `((title: T) OR (abstract: T))`.
    FieldExpansion,
}

impl Default for ExactMatchStyle {
    fn default() -> Self {
        Self::Template(DEFAULT_TEMPLATE.to_string())
    }
}

pub fn translate(normalized: &str, style: &ExactMatchStyle) -> String {
    let tokens = lexer::tokenize(normalized);
    let body = lexer::render(lexer::strip_outer_group(&tokens), |token| match token {
        Token::Term(t) | Token::Phrase(t) => wrap(t, style),
        _ => String::new(),
    });
    format!("({body})")
}

fn wrap(literal: &str, style: &ExactMatchStyle) -> String {
    match style {
        ExactMatchStyle::Template(template) => template.replace(KEYWORD_PLACEHOLDER, literal),
        ExactMatchStyle::FieldExpansion => {
            let value = if literal.contains(char::is_whitespace) {
                format!("\"{literal}\"")
            } else {
                literal.to_string()
            };
            format!("((title: {value}) OR (abstract: {value}))")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_style() -> ExactMatchStyle {
        ExactMatchStyle::default()
    }

    #[test]
    fn wraps_each_term_and_outer_parens_once() {
        assert_eq!(
            translate("solar AND (battery OR storage)", &default_style()),
            r#"("solar" AND ("battery" OR "storage"))"#
        );
    }

    #[test]
    fn redundant_outer_group_is_not_doubled() {
        assert_eq!(
            translate("(solar AND battery)", &default_style()),
            r#"("solar" AND "battery")"#
        );
    }

    #[test]
    fn phrases_are_wrapped_whole() {
        let style = ExactMatchStyle::Template("exact(KEYWORD)".into());
        assert_eq!(
            translate(r#""lithium ion" AND cells"#, &style),
            "(exact(lithium ion) AND exact(cells))"
        );
    }

    #[test]
    fn stray_quotes_are_removed() {
        let style = ExactMatchStyle::Template("[KEYWORD]".into());
        assert_eq!(translate(r#"solar" AND wind"#, &style), "([solar] AND [wind])");
    }

    #[test]
    fn field_expansion_quotes_multiword_literals() {
        assert_eq!(
            translate(r#"grid OR "heat pump""#, &ExactMatchStyle::FieldExpansion),
            r#"(((title: grid) OR (abstract: grid)) OR ((title: "heat pump") OR (abstract: "heat pump")))"#
        );
    }

    #[test]
    fn malformed_parens_pass_through_best_effort() {
        assert_eq!(
            translate("(solar AND battery", &default_style()),
            r#"("solar" AND "battery")"#
        );
    }
}
