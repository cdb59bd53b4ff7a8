//! Bag-of-words translation for backends without boolean support.

pub fn translate(normalized: &str) -> String {
    let text = normalized
        .replace('"', "")
        .to_lowercase()
        .replace(['(', ')'], " ");
    text.split_whitespace()
        .filter(|word| *word != "and" && *word != "or")
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_structure_and_operators() {
        assert_eq!(
            translate(r#"(Solar AND "Lithium Battery") OR   (grid)"#),
            "solar lithium battery grid"
        );
    }

    #[test]
    fn keeps_words_containing_operator_text() {
        assert_eq!(translate("colOR AND ANDroid"), "color android");
    }

    #[test]
    fn empty_query_stays_empty() {
        assert_eq!(translate("( )"), "");
    }
}
