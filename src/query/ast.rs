use super::lexer::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// One or more adjacent bare words, kept together as written.
    Term(String),
    Phrase(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

/// Parse a token stream into an expression tree.
///
/// `OR` binds looser than `AND`; adjacent groups or phrases with no operator
/// between them are an implicit `AND`. Returns `None` when nothing literal
/// remains (empty input, `()`, a lone operator).
pub fn parse(tokens: &[Token]) -> Option<Expr> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut alternatives = Vec::new();
    while parser.pos < tokens.len() {
        if let Some(expr) = parser.or_expr() {
            alternatives.push(expr);
        }
        // A `)` at the top level only survives when the caller skipped
        // balancing; step over it rather than stall.
        if parser.peek() == Some(&Token::Close) {
            parser.pos += 1;
        }
    }
    collapse(alternatives, Expr::Or)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn or_expr(&mut self) -> Option<Expr> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.extend(self.and_expr());
            if self.peek() == Some(&Token::Or) {
                self.pos += 1;
            } else {
                break;
            }
        }
        collapse(alternatives, Expr::Or)
    }

    fn and_expr(&mut self) -> Option<Expr> {
        let mut operands = Vec::new();
        loop {
            match self.peek() {
                Some(Token::And) => self.pos += 1,
                Some(Token::Or | Token::Close) | None => break,
                Some(_) => operands.extend(self.primary()),
            }
        }
        collapse(operands, Expr::And)
    }

    fn primary(&mut self) -> Option<Expr> {
        match self.peek()? {
            Token::Open => {
                self.pos += 1;
                let inner = self.or_expr();
                if self.peek() == Some(&Token::Close) {
                    self.pos += 1;
                }
                inner
            }
            Token::Phrase(p) => {
                let phrase = p.clone();
                self.pos += 1;
                Some(Expr::Phrase(phrase))
            }
            Token::Term(_) => {
                let mut words = Vec::new();
                while let Some(Token::Term(w)) = self.peek() {
                    words.push(w.as_str());
                    self.pos += 1;
                }
                Some(Expr::Term(words.join(" ")))
            }
            _ => {
                self.pos += 1;
                None
            }
        }
    }
}

fn collapse(mut items: Vec<Expr>, wrap: fn(Vec<Expr>) -> Expr) -> Option<Expr> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(wrap(items)),
    }
}

/// A literal inside a CNF clause: term or phrase text.
pub type Clause = Vec<String>;

/// Convert to conjunctive normal form: a list of OR-clauses that are ANDed.
///
/// Returns `None` if distributing `OR` over `AND` would produce more than
/// `max_clauses` clauses.
pub fn to_cnf(expr: &Expr, max_clauses: usize) -> Option<Vec<Clause>> {
    match expr {
        Expr::Term(t) | Expr::Phrase(t) => Some(vec![vec![t.clone()]]),
        Expr::And(operands) => {
            let mut clauses = Vec::new();
            for operand in operands {
                clauses.extend(to_cnf(operand, max_clauses)?);
                if clauses.len() > max_clauses {
                    return None;
                }
            }
            Some(clauses)
        }
        Expr::Or(alternatives) => {
            let mut product: Vec<Clause> = vec![Vec::new()];
            for alternative in alternatives {
                let rhs = to_cnf(alternative, max_clauses)?;
                if product.len() * rhs.len() > max_clauses {
                    return None;
                }
                product = product
                    .iter()
                    .flat_map(|left| {
                        rhs.iter().map(move |right| {
                            let mut clause = left.clone();
                            clause.extend(right.iter().cloned());
                            clause
                        })
                    })
                    .collect();
            }
            Some(product)
        }
    }
}
