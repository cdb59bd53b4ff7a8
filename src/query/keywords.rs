//! `primaryKeywords` translation for the patent backend.
//!
//! Each returned entry is ANDed with the others; an entry of the form
//! `(t1 t2 ...)` matches any one of its terms.

use tracing::debug;

use super::ast::{self, Clause};
use super::lexer;

/// Distribution limit before falling back to a literal AND/OR split.
const MAX_CLAUSES: usize = 64;

pub fn translate(normalized: &str) -> Vec<String> {
    let tokens = lexer::tokenize(normalized);
    let Some(expr) = ast::parse(&tokens) else {
        return Vec::new();
    };
    match ast::to_cnf(&expr, MAX_CLAUSES) {
        Some(clauses) => clauses.iter().map(|c| render_clause(c)).collect(),
        None => {
            debug!(clauses = MAX_CLAUSES, "query too wide for CNF, splitting literally");
            literal_split(normalized)
        }
    }
}

fn render_clause(clause: &Clause) -> String {
    match clause.as_slice() {
        [single] => single.to_lowercase(),
        terms => {
            let rendered: Vec<String> = terms.iter().map(|t| render_term(t)).collect();
            format!("({})", rendered.join(" "))
        }
    }
}

fn render_term(term: &str) -> String {
    let term = term.to_lowercase();
    if term.contains(char::is_whitespace) {
        format!("\"{term}\"")
    } else {
        term
    }
}

fn strip_parens(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(s)
}

fn literal_split(normalized: &str) -> Vec<String> {
    strip_parens(normalized)
        .split(" AND ")
        .map(strip_parens)
        .filter(|unit| !unit.is_empty())
        .map(|unit| {
            if unit.contains(" OR ") {
                let terms: Clause = unit
                    .split(" OR ")
                    .map(|t| strip_parens(t).replace('"', ""))
                    .collect();
                render_clause(&terms)
            } else {
                unit.replace('"', "").to_lowercase()
            }
        })
        .collect()
}
