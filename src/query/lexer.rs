use std::sync::LazyLock;

use regex::Regex;

/// Non-greedy so `"a" AND "b"` yields two phrases rather than one.
static PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(.*?)""#).expect("phrase pattern is valid"));

/// Groups nested deeper than this are flattened into their parent.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    And,
    Or,
    Term(String),
    Phrase(String),
}

/// Split a boolean query into tokens.
///
/// Never fails: unmatched `"` characters are dropped, a `)` with no open group
/// is dropped, groups still open at the end of input are closed, and
/// parentheses nested past [`MAX_DEPTH`] are dropped.
pub fn tokenize(query: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in PHRASE.captures_iter(query) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        lex_bare(&query[last..whole.start()], &mut tokens);
        let phrase = inner.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        if !phrase.is_empty() {
            tokens.push(Token::Phrase(phrase));
        }
        last = whole.end();
    }
    lex_bare(&query[last..], &mut tokens);

    balance(tokens)
}

fn lex_bare(segment: &str, tokens: &mut Vec<Token>) {
    let mut word = String::new();
    for c in segment.chars() {
        match c {
            '(' | ')' => {
                flush_word(&mut word, tokens);
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
            }
            '"' => {}
            c if c.is_whitespace() => flush_word(&mut word, tokens),
            c => word.push(c),
        }
    }
    flush_word(&mut word, tokens);
}

fn flush_word(word: &mut String, tokens: &mut Vec<Token>) {
    if word.is_empty() {
        return;
    }
    let token = if word.eq_ignore_ascii_case("and") {
        Token::And
    } else if word.eq_ignore_ascii_case("or") {
        Token::Or
    } else {
        Token::Term(word.clone())
    };
    tokens.push(token);
    word.clear();
}

fn balance(tokens: Vec<Token>) -> Vec<Token> {
    // One entry per open `(`: whether it was kept or flattened past MAX_DEPTH.
    let mut open: Vec<bool> = Vec::new();
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Open => {
                let keep = depth < MAX_DEPTH;
                open.push(keep);
                if !keep {
                    continue;
                }
                depth += 1;
            }
            Token::Close => match open.pop() {
                Some(true) => depth -= 1,
                Some(false) | None => continue,
            },
            _ => {}
        }
        out.push(token);
    }
    out.extend(std::iter::repeat_n(Token::Close, depth));
    out
}

/// Drop one redundant pair of parentheses wrapping the whole token stream.
///
/// `(a) OR (b)` is left alone: its first `(` closes before the end.
pub fn strip_outer_group(tokens: &[Token]) -> &[Token] {
    if tokens.len() < 2 || tokens.first() != Some(&Token::Open) {
        return tokens;
    }
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth == 0 {
                    return if i == tokens.len() - 1 {
                        &tokens[1..i]
                    } else {
                        tokens
                    };
                }
            }
            _ => {}
        }
    }
    tokens
}

/// Render tokens back into query text, mapping each literal through `literal`.
pub fn render(tokens: &[Token], mut literal: impl FnMut(&Token) -> String) -> String {
    let mut out = String::new();
    let mut after_open = true;
    for token in tokens {
        let text = match token {
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Term(_) | Token::Phrase(_) => literal(token),
        };
        if !after_open && *token != Token::Close {
            out.push(' ');
        }
        out.push_str(&text);
        after_open = *token == Token::Open;
    }
    out
}
