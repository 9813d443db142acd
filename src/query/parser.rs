//! Tokenizer and parser for the path-query language.
//!
//! Only the shape of the expression is checked here: a `g.V(...)` root
//! followed by a chain of `.Name(args)` calls. Whether a step exists or its
//! arguments make sense is decided when the traversal is compiled.

use std::fmt;

/// Three-way parse result. `Incomplete` means the text ended before the
/// expression did; any other syntax problem is a `ParseFail`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Traversal),
    ParseFail(String),
    Incomplete,
}

/// A parsed query: the root `V(...)` call followed by every chained call.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub root: Call,
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Num(f64),
    Null,
    List(Vec<String>),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "{s:?}"),
            Arg::Num(n) => write!(f, "{n}"),
            Arg::Null => write!(f, "null"),
            Arg::List(items) => write!(f, "{items:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Dot,
    Comma,
    Semi,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier `{name}`"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Num(n) => write!(f, "number {n}"),
            Token::Dot => write!(f, "`.`"),
            Token::Comma => write!(f, "`,`"),
            Token::Semi => write!(f, "`;`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
        }
    }
}

enum Syntax {
    Fail(String),
    Incomplete,
}

type Parsed<T> = Result<T, Syntax>;

/// Parse query text.
///
/// Tokens are pulled on demand, so the first problem in reading order wins:
/// a stray identifier is reported even if an unterminated string follows.
pub fn parse(text: &str) -> ParseOutcome {
    let mut parser = Parser {
        lexer: Lexer { text, pos: 0 },
        peeked: None,
    };
    match parser.traversal() {
        Ok(traversal) => ParseOutcome::Parsed(traversal),
        Err(Syntax::Incomplete) => ParseOutcome::Incomplete,
        Err(Syntax::Fail(message)) => ParseOutcome::ParseFail(message),
    }
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn bump(&mut self) -> Option<char> {
        let c = self.text[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !keep(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    /// Next token with its byte offset, or `None` at end of input.
    fn token(&mut self) -> Parsed<Option<(usize, Token)>> {
        self.take_while(char::is_whitespace);
        let offset = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let token = match c {
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semi,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '"' | '\'' => Token::Str(self.string(c)?),
            c if c.is_ascii_digit() || c == '-' => {
                self.take_while(|d| d.is_ascii_digit());
                if self.peek_char() == Some('.')
                    && self.text[self.pos + 1..].starts_with(|d: char| d.is_ascii_digit())
                {
                    self.pos += 1;
                    self.take_while(|d| d.is_ascii_digit());
                }
                let literal = &self.text[offset..self.pos];
                let value = literal.parse().map_err(|_| {
                    Syntax::Fail(format!("invalid number {literal:?} at offset {offset}"))
                })?;
                Token::Num(value)
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                self.take_while(|d| d.is_alphanumeric() || d == '_' || d == '$');
                Token::Ident(self.text[offset..self.pos].to_string())
            }
            other => {
                return Err(Syntax::Fail(format!(
                    "unexpected character {other:?} at offset {offset}"
                )))
            }
        };
        Ok(Some((offset, token)))
    }

    fn string(&mut self, quote: char) -> Parsed<String> {
        let mut value = String::new();
        loop {
            match self.bump().ok_or(Syntax::Incomplete)? {
                '\\' => match self.bump().ok_or(Syntax::Incomplete)? {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    escaped => value.push(escaped),
                },
                c if c == quote => return Ok(value),
                c => value.push(c),
            }
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Option<(usize, Token)>>,
}

impl Parser<'_> {
    fn peek(&mut self) -> Parsed<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.token()?);
        }
        Ok(self.peeked.as_ref().and_then(|t| t.as_ref()).map(|(_, t)| t))
    }

    /// Consume the next token; running out of input means the query is
    /// incomplete.
    fn next(&mut self) -> Parsed<(usize, Token)> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.token()?,
        };
        token.ok_or(Syntax::Incomplete)
    }

    fn unexpected<T>(offset: usize, token: &Token, expected: &str) -> Parsed<T> {
        Err(Syntax::Fail(format!(
            "unexpected {token} at offset {offset}, expected {expected}"
        )))
    }

    fn expect(&mut self, want: Token, expected: &str) -> Parsed<()> {
        let (offset, token) = self.next()?;
        if token == want {
            Ok(())
        } else {
            Self::unexpected(offset, &token, expected)
        }
    }

    fn ident(&mut self, expected: &str) -> Parsed<String> {
        match self.next()? {
            (_, Token::Ident(name)) => Ok(name),
            (offset, token) => Self::unexpected(offset, &token, expected),
        }
    }

    fn traversal(&mut self) -> Parsed<Traversal> {
        match self.next()? {
            (_, Token::Ident(name)) if name == "g" || name == "graph" => {}
            (offset, token) => return Self::unexpected(offset, &token, "`g`"),
        }
        self.expect(Token::Dot, "`.`")?;
        match self.next()? {
            (_, Token::Ident(name)) if name == "V" || name == "Vertex" => {}
            (offset, token) => return Self::unexpected(offset, &token, "`V`"),
        }
        let root = Call {
            name: "V".to_string(),
            args: self.arguments()?,
        };

        let mut calls = Vec::new();
        loop {
            match self.peek()? {
                None => break,
                Some(Token::Semi) => {
                    self.next()?;
                    if self.peek()?.is_some() {
                        let (offset, token) = self.next()?;
                        return Self::unexpected(offset, &token, "end of query");
                    }
                    break;
                }
                Some(_) => {}
            }
            self.expect(Token::Dot, "`.` or end of query")?;
            let name = self.ident("a step name")?;
            let args = self.arguments()?;
            calls.push(Call { name, args });
        }

        Ok(Traversal { root, calls })
    }

    fn arguments(&mut self) -> Parsed<Vec<Arg>> {
        self.expect(Token::LParen, "`(`")?;
        let mut args = Vec::new();
        if self.peek()? == Some(&Token::RParen) {
            self.next()?;
            return Ok(args);
        }
        loop {
            args.push(self.argument()?);
            match self.next()? {
                (_, Token::Comma) => continue,
                (_, Token::RParen) => return Ok(args),
                (offset, token) => return Self::unexpected(offset, &token, "`,` or `)`"),
            }
        }
    }

    fn argument(&mut self) -> Parsed<Arg> {
        match self.next()? {
            (_, Token::Str(s)) => Ok(Arg::Str(s)),
            (_, Token::Num(n)) => Ok(Arg::Num(n)),
            (_, Token::Ident(name)) if name == "null" || name == "undefined" => Ok(Arg::Null),
            (_, Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek()? == Some(&Token::RBracket) {
                    self.next()?;
                    return Ok(Arg::List(items));
                }
                loop {
                    match self.next()? {
                        (_, Token::Str(s)) => items.push(s),
                        (offset, token) => return Self::unexpected(offset, &token, "a string"),
                    }
                    match self.next()? {
                        (_, Token::Comma) => continue,
                        (_, Token::RBracket) => return Ok(Arg::List(items)),
                        (offset, token) => return Self::unexpected(offset, &token, "`,` or `]`"),
                    }
                }
            }
            (offset, token) => Self::unexpected(offset, &token, "an argument"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Traversal {
        match parse(text) {
            ParseOutcome::Parsed(t) => t,
            other => panic!("expected {text:?} to parse, got {other:?}"),
        }
    }

    #[test]
    fn parses_generated_lookup() {
        let t = parsed(r#"g.V("/properties/42").Tag("source").Out(null, "predicate").All()"#);
        assert_eq!(t.root.args, vec![Arg::Str("/properties/42".to_string())]);
        let names: Vec<_> = t.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Tag", "Out", "All"]);
        assert_eq!(
            t.calls[1].args,
            vec![Arg::Null, Arg::Str("predicate".to_string())]
        );
    }

    #[test]
    fn parses_lists_numbers_and_aliases() {
        let t = parsed("graph.Vertex().Out(['/a', \"/b\"]).GetLimit(3);");
        assert!(t.root.args.is_empty());
        assert_eq!(
            t.calls[0].args,
            vec![Arg::List(vec!["/a".to_string(), "/b".to_string()])]
        );
        assert_eq!(t.calls[1].args, vec![Arg::Num(3.0)]);
    }

    #[test]
    fn string_escapes() {
        let t = parsed(r#"g.V("say \"hi\"").All()"#);
        assert_eq!(t.root.args, vec![Arg::Str("say \"hi\"".to_string())]);
    }

    #[test]
    fn stray_quote_in_vertex_fails() {
        match parse(r#"g.V("/properties/a"b").Tag("source").All()"#) {
            ParseOutcome::ParseFail(message) => {
                assert!(message.contains("identifier `b`"), "{message}")
            }
            other => panic!("expected ParseFail, got {other:?}"),
        }
    }

    #[test]
    fn bad_roots_and_characters_fail() {
        assert!(matches!(parse("x.V()"), ParseOutcome::ParseFail(_)));
        assert!(matches!(parse("g.E()"), ParseOutcome::ParseFail(_)));
        assert!(matches!(parse("g.V() All()"), ParseOutcome::ParseFail(_)));
        assert!(matches!(parse("g.V(#)"), ParseOutcome::ParseFail(_)));
        assert!(matches!(parse("g.V(); g.V()"), ParseOutcome::ParseFail(_)));
    }

    #[test]
    fn truncated_input_is_incomplete() {
        for text in [
            "",
            "   ",
            "g",
            "g.",
            "g.V(",
            r#"g.V("a""#,
            r#"g.V("a"#,
            r#"g.V("a\"#,
            r#"g.V("a")."#,
            r#"g.V("a").Out(["p","#,
        ] {
            assert_eq!(parse(text), ParseOutcome::Incomplete, "{text:?}");
        }
    }
}
