// ── Search filters ──
//
// The subset of RFC 4515 this workspace needs: equality, presence, and
// the three boolean combinators. Filters render to the standard string
// syntax and can also be evaluated in memory against `Attributes`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attrs::Attributes;
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// `(attr=value)`, case-insensitive.
    Eq(String, String),
    /// `(attr=*)`
    Present(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(attr: &str, value: impl Into<String>) -> Self {
        Self::Eq(attr.into(), value.into())
    }

    pub fn present(attr: &str) -> Self {
        Self::Present(attr.into())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// `(|(attr=v1)(attr=v2)...)` over every value.
    pub fn any_of<I, S>(attr: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Or(values.into_iter().map(|v| Self::eq(attr, v)).collect())
    }

    /// Evaluate against an attribute map. An empty `Or` matches nothing and
    /// an empty `And` matches everything.
    pub fn matches(&self, attrs: &Attributes) -> bool {
        match self {
            Self::Eq(attr, value) => attrs
                .get_all(attr)
                .iter()
                .any(|v| v.to_lowercase() == value.to_lowercase()),
            Self::Present(attr) => attrs.contains(attr),
            Self::And(filters) => filters.iter().all(|f| f.matches(attrs)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(attrs)),
            Self::Not(inner) => !inner.matches(attrs),
        }
    }

    /// Parse the string syntax. `(attr=*)` becomes [`Filter::Present`].
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut parser = Parser {
            input,
            chars: input.trim().char_indices().collect(),
            pos: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(filter)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(attr, value) => write!(f, "({attr}={})", escape(value)),
            Self::Present(attr) => write!(f, "({attr}=*)"),
            Self::And(filters) => write_group(f, '&', filters),
            Self::Or(filters) => write_group(f, '|', filters),
            Self::Not(inner) => write!(f, "(!{inner})"),
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, op: char, filters: &[Filter]) -> fmt::Result {
    write!(f, "({op}")?;
    for filter in filters {
        write!(f, "{filter}")?;
    }
    f.write_str(")")
}

/// Escape an assertion value (`*`, `(`, `)`, `\`, NUL).
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

// ── Parser ──────────────────────────────────────────────────────────

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn expect(&mut self, want: char) -> Result<(), Error> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(&format!("expected '{want}'"))),
        }
    }

    fn filter(&mut self) -> Result<Filter, Error> {
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of input")),
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn list(&mut self) -> Result<Vec<Filter>, Error> {
        let mut filters = Vec::new();
        while self.peek() == Some('(') {
            filters.push(self.filter()?);
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter, Error> {
        let mut attr = String::new();
        while let Some(c) = self.peek() {
            if c == '=' {
                break;
            }
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ';') {
                return Err(self.error("malformed attribute description"));
            }
            attr.push(c);
            self.pos += 1;
        }
        if attr.is_empty() {
            return Err(self.error("missing attribute description"));
        }
        self.expect('=')?;

        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c == ')' {
                break;
            }
            if c == '(' {
                return Err(self.error("unescaped '(' in value"));
            }
            raw.push(c);
            self.pos += 1;
        }

        if raw == "*" {
            return Ok(Filter::Present(attr));
        }
        if raw.contains('*') {
            return Err(self.error("substring assertions are not supported"));
        }
        let value = unescape(&raw).ok_or_else(|| self.error("bad escape sequence"))?;
        Ok(Filter::Eq(attr, value))
    }

    fn error(&self, reason: &str) -> Error {
        let at = self
            .chars
            .get(self.pos)
            .map_or(self.input.len(), |(i, _)| *i);
        Error::InvalidFilter {
            input: self.input.into(),
            reason: format!("{reason} at offset {at}"),
        }
    }
}

fn unescape(raw: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let hi = chars.next()?.to_digit(16)?;
            let lo = chars.next()?.to_digit(16)?;
            bytes.push(u8::try_from(hi * 16 + lo).ok()?);
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_nested_filters() {
        let filter = Filter::and([
            Filter::eq("objectClass", "dirDistributionList"),
            Filter::any_of("mailForwardingAddress", ["a@x.com", "b(x)@y.com"]),
        ]);
        insta::assert_snapshot!(
            filter.to_string(),
            @r"(&(objectClass=dirDistributionList)(|(mailForwardingAddress=a@x.com)(mailForwardingAddress=b\28x\29@y.com)))"
        );
    }

    #[test]
    fn parse_round_trips_rendering() {
        let text = r"(&(objectClass=dirAccount)(!(accountStatus=closed))(|(mail=a\2ab@x.com)(uid=*)))";
        let filter = Filter::parse(text).unwrap();
        assert_eq!(filter.to_string(), text);
        assert_eq!(
            filter,
            Filter::and([
                Filter::eq("objectClass", "dirAccount"),
                Filter::not(Filter::eq("accountStatus", "closed")),
                Filter::or([Filter::eq("mail", "a*b@x.com"), Filter::present("uid")]),
            ])
        );
    }

    #[test]
    fn rejects_bad_syntax() {
        assert!(Filter::parse("uid=a").is_err());
        assert!(Filter::parse("(uid=a").is_err());
        assert!(Filter::parse("(uid=a*)").is_err());
        assert!(Filter::parse("(=a)").is_err());
        assert!(Filter::parse("(uid=a))").is_err());
    }

    #[test]
    fn evaluates_case_insensitively() {
        let attrs = Attributes::new()
            .with("objectClass", "dirAccount")
            .with_values("mail", ["Alice@A.com", "al@a.com"]);

        assert!(Filter::eq("MAIL", "alice@a.com").matches(&attrs));
        assert!(Filter::present("mail").matches(&attrs));
        assert!(!Filter::present("mailAlias").matches(&attrs));
        assert!(Filter::any_of("mail", ["x@y", "al@a.com"]).matches(&attrs));
        assert!(!Filter::or([]).matches(&attrs));
        assert!(Filter::and([]).matches(&attrs));
        assert!(Filter::not(Filter::eq("objectClass", "dirAlias")).matches(&attrs));
    }
}
