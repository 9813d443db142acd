use serde::{Deserialize, Serialize};
use std::fmt;

/// One subject-predicate-object-label record of the graph store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default)]
    pub label: String,
}

/// Which end of a quad a vertex sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Subject,
    Object,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Subject => Direction::Object,
            Direction::Object => Direction::Subject,
        }
    }

    /// Column / field name used by the SQL and document backends.
    pub fn field(self) -> &'static str {
        match self {
            Direction::Subject => "subject",
            Direction::Object => "object",
        }
    }
}

impl Quad {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The vertex at the given end of this quad.
    pub fn get(&self, direction: Direction) -> &str {
        match direction {
            Direction::Subject => &self.subject,
            Direction::Object => &self.object,
        }
    }

    /// Parse one dataset line: `<s> <p> <o> [<label>] .`
    ///
    /// Terms are either `<iri>` or `"literal"`. Blank lines and `#` comments
    /// yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Quad>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut rest = line;
        let mut terms = Vec::with_capacity(4);
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                return Err("missing terminating '.'".to_string());
            }
            if rest == "." {
                break;
            }
            let (term, tail) = take_term(rest)?;
            terms.push(term);
            rest = tail;
        }

        let mut terms = terms.into_iter();
        match (terms.next(), terms.next(), terms.next(), terms.next(), terms.next()) {
            (Some(s), Some(p), Some(o), label, None) => Ok(Some(Quad {
                subject: s,
                predicate: p,
                object: o,
                label: label.unwrap_or_default(),
            })),
            _ => Err("expected three or four terms".to_string()),
        }
    }
}

fn take_term(input: &str) -> Result<(String, &str), String> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, '<')) => {
            let end = input
                .find('>')
                .ok_or_else(|| "unterminated <iri>".to_string())?;
            Ok((input[1..end].to_string(), &input[end + 1..]))
        }
        Some((_, '"')) => {
            let mut value = String::new();
            let mut escaped = false;
            for (i, c) in chars {
                match (escaped, c) {
                    (true, 'n') => {
                        value.push('\n');
                        escaped = false;
                    }
                    (true, c) => {
                        value.push(c);
                        escaped = false;
                    }
                    (false, '\\') => escaped = true,
                    (false, '"') => return Ok((value, &input[i + 1..])),
                    (false, c) => value.push(c),
                }
            }
            Err("unterminated \"literal\"".to_string())
        }
        _ => Err(format!("unexpected term at {:?}", truncate(input))),
    }
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(16) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Write `value` as an `<iri>` when it can be read back as one, otherwise as
/// a `"literal"` escaping only what `take_term` unescapes.
fn write_term(f: &mut fmt::Formatter<'_>, value: &str, prefer_iri: bool) -> fmt::Result {
    if prefer_iri && !value.contains(['>', '\n']) {
        return write!(f, "<{}>", value);
    }
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

/// One dataset line; `Quad::parse_line` reads it back unchanged.
impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, &self.subject, true)?;
        f.write_str(" ")?;
        write_term(f, &self.predicate, true)?;
        f.write_str(" ")?;
        write_term(f, &self.object, false)?;
        if !self.label.is_empty() {
            f.write_str(" ")?;
            write_term(f, &self.label, true)?;
        }
        f.write_str(" .")
    }
}
