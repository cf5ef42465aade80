use log::trace;

use crate::error::TreeqError;

use super::ast::{Leaf, Literal};
use super::operator::{BinaryOp, NullaryOp, Operator, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Leaf(Leaf),
    Operator(Operator),
    OpenBracket,
    CloseBracket,
    OpenCollect,
    CloseCollect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The matched source text.
    pub raw: String,
    /// An implicit pipe goes after this token when a path segment follows it.
    pub check_for_post_traverse: bool,
}

impl Token {
    fn new(kind: TokenKind, raw: String, check_for_post_traverse: bool) -> Self {
        Token {
            kind,
            raw,
            check_for_post_traverse,
        }
    }

    fn is_bare_word(&self) -> bool {
        matches!(self.kind, TokenKind::Leaf(Leaf::Value(Literal::String(_)))) && !self.raw.starts_with('"')
    }

    /// Tokens after which a new path term may begin.
    fn opens_term(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::OpenBracket
                | TokenKind::OpenCollect
                | TokenKind::Operator(Operator::Binary(BinaryOp::Pipe | BinaryOp::Union))
        )
    }

    /// Tokens that may directly follow a complete path.
    fn closes_path(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::CloseBracket
                | TokenKind::CloseCollect
                | TokenKind::Operator(Operator::Binary(
                    BinaryOp::Pipe | BinaryOp::Union | BinaryOp::Equals | BinaryOp::Assign
                ))
        )
    }

    fn is_path_segment(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Leaf(Leaf::PathKey(_))
                | TokenKind::Leaf(Leaf::ArrayIndex(_))
                | TokenKind::Leaf(Leaf::Splat)
                | TokenKind::Leaf(Leaf::Append)
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    OpenParen,
    CloseParen,
    Splat,
    Append,
    Symbol(&'static str, Operator),
    Keyword(&'static str, Operator),
    StyleAssign,
    Index,
    Whitespace,
    Document,
    QuotedPath,
    BarePath,
    SelfReference,
    Float,
    Integer,
    Boolean,
    Null,
    QuotedString,
    OpenCollect,
    CloseCollect,
    BareWord,
}

/// Ordered rule list. The longest match wins; on equal length the earlier rule wins.
const RULES: &[Rule] = &[
    Rule::OpenParen,
    Rule::CloseParen,
    Rule::Splat,
    Rule::Append,
    Rule::Symbol("..", Operator::Nullary(NullaryOp::RecursiveDescent)),
    Rule::Symbol(",", Operator::Binary(BinaryOp::Union)),
    Rule::Symbol(":", Operator::Binary(BinaryOp::CreateMap)),
    Rule::Keyword("length", Operator::Nullary(NullaryOp::Length)),
    Rule::Keyword("select", Operator::Unary(UnaryOp::Select)),
    Rule::Keyword("or", Operator::Binary(BinaryOp::Or)),
    Rule::Keyword("and", Operator::Binary(BinaryOp::And)),
    Rule::Keyword("not", Operator::Nullary(NullaryOp::Not)),
    Rule::Keyword("collect", Operator::Unary(UnaryOp::Collect)),
    Rule::Keyword("count", Operator::Unary(UnaryOp::Count)),
    Rule::StyleAssign,
    Rule::Keyword("style", Operator::Nullary(NullaryOp::GetStyle)),
    Rule::Symbol("==", Operator::Binary(BinaryOp::Equals)),
    Rule::Symbol("|=", Operator::Binary(BinaryOp::Assign)),
    Rule::Symbol(".-", Operator::Binary(BinaryOp::DeleteChild)),
    Rule::Index,
    Rule::Whitespace,
    Rule::Document,
    Rule::QuotedPath,
    Rule::BarePath,
    Rule::SelfReference,
    Rule::Symbol("|", Operator::Binary(BinaryOp::Pipe)),
    Rule::Float,
    Rule::Integer,
    Rule::Boolean,
    Rule::Null,
    Rule::QuotedString,
    Rule::OpenCollect,
    Rule::CloseCollect,
    Rule::Symbol("*", Operator::Binary(BinaryOp::Multiply)),
    Rule::BareWord,
];

const PATH_DELIMITERS: &[char] = &['[', ']', ',', '|', '.', '(', ')', '=', ':'];

fn starts_with(input: &[char], literal: &str) -> Option<usize> {
    let mut len = 0;
    for expected in literal.chars() {
        if input.get(len) != Some(&expected) {
            return None;
        }
        len += 1;
    }
    Some(len)
}

fn starts_with_ignore_case(input: &[char], word: &str) -> Option<usize> {
    let mut len = 0;
    for expected in word.chars() {
        match input.get(len) {
            Some(c) if c.eq_ignore_ascii_case(&expected) => len += 1,
            _ => return None,
        }
    }
    Some(len)
}

fn count_digits(input: &[char], from: usize) -> usize {
    input[from.min(input.len())..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count()
}

/// `-?` followed by at least one digit; returns the length consumed.
fn signed_digits(input: &[char], from: usize) -> Option<usize> {
    let sign = usize::from(input.get(from) == Some(&'-'));
    let digits = count_digits(input, from + sign);
    if digits == 0 {
        None
    } else {
        Some(sign + digits)
    }
}

/// Optional leading dot followed by a bracketed literal such as `[]` or `[+]`.
fn dotted_bracket(input: &[char], inner: &str) -> Option<usize> {
    let dot = usize::from(input.first() == Some(&'.'));
    let body = starts_with(&input[dot..], inner)?;
    Some(dot + body)
}

impl Rule {
    /// Length of the match of this rule at the start of `input`, if any.
    fn match_len(&self, input: &[char]) -> Option<usize> {
        match self {
            Rule::OpenParen => starts_with(input, "("),
            Rule::CloseParen => starts_with(input, ")"),
            Rule::Splat => dotted_bracket(input, "[]").or_else(|| dotted_bracket(input, "[*]")),
            Rule::Append => dotted_bracket(input, "[+]"),
            Rule::Symbol(symbol, _) | Rule::Keyword(symbol, _) => starts_with(input, symbol),
            Rule::StyleAssign => {
                let word = starts_with(input, "style")?;
                let spaces = input[word..]
                    .iter()
                    .take_while(|c| c.is_ascii_whitespace())
                    .count();
                let eq = starts_with(&input[word + spaces..], "=")?;
                let end = word + spaces + eq;
                // `style == ...` is a comparison, not an assignment
                if input.get(end) == Some(&'=') {
                    return None;
                }
                Some(end)
            }
            Rule::Index => {
                let dot = usize::from(input.first() == Some(&'.'));
                starts_with(&input[dot..], "[")?;
                let number = signed_digits(input, dot + 1)?;
                let close = dot + 1 + number;
                if input.get(close) == Some(&']') {
                    Some(close + 1)
                } else {
                    None
                }
            }
            Rule::Whitespace => {
                let n = input.iter().take_while(|c| c.is_whitespace()).count();
                (n > 0).then_some(n)
            }
            Rule::Document => {
                starts_with(input, "d")?;
                let digits = count_digits(input, 1);
                (digits > 0).then_some(1 + digits)
            }
            Rule::QuotedPath => {
                starts_with(input, ".\"")?;
                let inner = input[2..].iter().take_while(|c| **c != '"').count();
                if input.get(2 + inner) == Some(&'"') {
                    Some(3 + inner)
                } else {
                    None
                }
            }
            Rule::BarePath => {
                starts_with(input, ".")?;
                let n = input[1..]
                    .iter()
                    .take_while(|c| !c.is_whitespace() && !PATH_DELIMITERS.contains(c))
                    .count();
                (n > 0).then_some(1 + n)
            }
            Rule::SelfReference => starts_with(input, "."),
            Rule::Float => {
                let int_part = signed_digits(input, 0)?;
                let mut len = int_part;
                let mut has_fraction = false;
                if input.get(len) == Some(&'.') {
                    let frac = count_digits(input, len + 1);
                    if frac > 0 {
                        len += 1 + frac;
                        has_fraction = true;
                    }
                }
                let mut has_exponent = false;
                if matches!(input.get(len), Some('e') | Some('E')) {
                    let mut exp = len + 1;
                    if matches!(input.get(exp), Some('+') | Some('-')) {
                        exp += 1;
                    }
                    let digits = count_digits(input, exp);
                    if digits > 0 {
                        len = exp + digits;
                        has_exponent = true;
                    }
                }
                (has_fraction || has_exponent).then_some(len)
            }
            Rule::Integer => signed_digits(input, 0),
            Rule::Boolean => {
                starts_with_ignore_case(input, "true").or_else(|| starts_with_ignore_case(input, "false"))
            }
            Rule::Null => starts_with_ignore_case(input, "null"),
            Rule::QuotedString => {
                starts_with(input, "\"")?;
                let mut i = 1;
                while i < input.len() {
                    match input[i] {
                        '\\' => i += 2,
                        '"' => return Some(i + 1),
                        _ => i += 1,
                    }
                }
                None
            }
            Rule::OpenCollect => starts_with(input, "["),
            Rule::CloseCollect => starts_with(input, "]"),
            Rule::BareWord => {
                let first = input.first()?;
                if !(first.is_ascii_alphabetic() || *first == '_') {
                    return None;
                }
                let n = input
                    .iter()
                    .take_while(|c| c.is_ascii_alphanumeric() || **c == '_' || **c == '-')
                    .count();
                Some(n)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    pub tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(&mut self) -> Result<&[Token], TreeqError> {
        let mut raw_tokens = Vec::new();
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            let mut best: Option<(Rule, usize)> = None;
            for rule in RULES {
                if let Some(len) = rule.match_len(rest) {
                    if best.map_or(true, |(_, best_len)| len > best_len) {
                        best = Some((*rule, len));
                    }
                }
            }

            let Some((rule, len)) = best else {
                let fragment: String = rest.iter().take_while(|c| !c.is_whitespace()).collect();
                return Err(TreeqError::Lex {
                    position: self.pos,
                    fragment,
                });
            };

            let text: String = rest[..len].iter().collect();
            if let Some(token) = self.build_token(rule, text)? {
                trace!("token {:?}", token);
                raw_tokens.push(token);
            }
            self.pos += len;
        }

        promote_bare_paths(&mut raw_tokens);
        self.tokens = insert_implicit_pipes(raw_tokens);
        Ok(&self.tokens)
    }

    fn build_token(&self, rule: Rule, text: String) -> Result<Option<Token>, TreeqError> {
        let token = match rule {
            Rule::Whitespace => return Ok(None),
            Rule::OpenParen => Token::new(TokenKind::OpenBracket, text, false),
            Rule::CloseParen => Token::new(TokenKind::CloseBracket, text, true),
            Rule::OpenCollect => Token::new(TokenKind::OpenCollect, text, false),
            Rule::CloseCollect => Token::new(TokenKind::CloseCollect, text, true),
            Rule::Splat => Token::new(TokenKind::Leaf(Leaf::Splat), text, true),
            Rule::Append => Token::new(TokenKind::Leaf(Leaf::Append), text, true),
            Rule::Symbol(_, op) | Rule::Keyword(_, op) => {
                Token::new(TokenKind::Operator(op), text, false)
            }
            Rule::StyleAssign => Token::new(
                TokenKind::Operator(Operator::Binary(BinaryOp::AssignStyle)),
                text,
                false,
            ),
            Rule::Index => {
                let digits = text.trim_start_matches('.').trim_start_matches('[').trim_end_matches(']');
                let index = self.parse_integer(digits)?;
                Token::new(TokenKind::Leaf(Leaf::ArrayIndex(index)), text, true)
            }
            Rule::Document => {
                let index = text[1..].parse::<usize>().map_err(|_| self.invalid_number(&text))?;
                Token::new(
                    TokenKind::Operator(Operator::Nullary(NullaryOp::DocumentFilter(index))),
                    text,
                    false,
                )
            }
            Rule::QuotedPath => {
                let key = text[2..text.len() - 1].to_string();
                Token::new(TokenKind::Leaf(Leaf::PathKey(key)), text, true)
            }
            Rule::BarePath => {
                let key = text[1..].to_string();
                Token::new(TokenKind::Leaf(Leaf::PathKey(key)), text, true)
            }
            Rule::SelfReference => Token::new(TokenKind::Leaf(Leaf::SelfReference), text, false),
            Rule::Float => {
                let value: f64 = text.parse().map_err(|_| self.invalid_number(&text))?;
                if !value.is_finite() {
                    return Err(self.invalid_number(&text));
                }
                let literal = Literal::Float(text.clone());
                Token::new(TokenKind::Leaf(Leaf::Value(literal)), text, false)
            }
            Rule::Integer => {
                let literal = Literal::Int(self.parse_integer(&text)?);
                Token::new(TokenKind::Leaf(Leaf::Value(literal)), text, false)
            }
            Rule::Boolean => {
                let literal = Literal::Bool(text.eq_ignore_ascii_case("true"));
                Token::new(TokenKind::Leaf(Leaf::Value(literal)), text, false)
            }
            Rule::Null => Token::new(TokenKind::Leaf(Leaf::Value(Literal::Null)), text, false),
            Rule::QuotedString => {
                let literal = Literal::String(unescape(&text[1..text.len() - 1]));
                Token::new(TokenKind::Leaf(Leaf::Value(literal)), text, false)
            }
            Rule::BareWord => {
                let literal = Literal::String(text.clone());
                Token::new(TokenKind::Leaf(Leaf::Value(literal)), text, false)
            }
        };
        Ok(Some(token))
    }

    fn parse_integer(&self, digits: &str) -> Result<i64, TreeqError> {
        digits.parse::<i64>().map_err(|_| self.invalid_number(digits))
    }

    fn invalid_number(&self, literal: &str) -> TreeqError {
        TreeqError::InvalidNumber {
            position: self.pos,
            literal: literal.to_string(),
        }
    }
}

/// The leading dot of a path is optional: a bare word that opens a term and is
/// followed by another segment or by the end of the path (`a.b[2]`, `x | name`)
/// is a key. Anywhere else, e.g. after `==` or before `:`, it stays a string.
fn promote_bare_paths(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if !tokens[i].is_bare_word() {
            continue;
        }
        let opens = i == 0 || tokens[i - 1].opens_term();
        let continues = tokens
            .get(i + 1)
            .map_or(true, |next| next.is_path_segment() || next.closes_path());
        if opens && continues {
            let token = &mut tokens[i];
            token.kind = TokenKind::Leaf(Leaf::PathKey(token.raw.clone()));
            token.check_for_post_traverse = true;
        }
    }
}

/// Path segments written back to back (`.a.b`, `.a[0]`, `(.a).b`) nest by
/// juxtaposition; make that explicit with a pipe so postfix conversion sees a
/// binary operator between them.
fn insert_implicit_pipes(tokens: Vec<Token>) -> Vec<Token> {
    let mut processed = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        let needs_pipe = token.check_for_post_traverse
            && iter.peek().is_some_and(|next| next.is_path_segment());
        processed.push(token);
        if needs_pipe {
            processed.push(Token::new(
                TokenKind::Operator(Operator::Binary(BinaryOp::Pipe)),
                String::new(),
                false,
            ));
        }
    }
    processed
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Tokenize an expression string.
pub fn tokenize(expression: &str) -> Result<Vec<Token>, TreeqError> {
    let mut lexer = Lexer::new(expression);
    lexer.tokenize()?;
    Ok(lexer.tokens)
}
