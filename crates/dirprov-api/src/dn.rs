// ── Distinguished names ──
//
// A `Dn` is the location of an entry in the directory hierarchy, stored
// leftmost component first. Comparison and hashing are case-insensitive,
// matching how directory servers compare the naming attributes we use.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Characters that must be backslash-escaped inside an RDN value.
const SPECIAL: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '='];

// ── Rdn ─────────────────────────────────────────────────────────────

/// A single `attr=value` component. The value is held unescaped.
#[derive(Debug, Clone)]
pub struct Rdn {
    attr: String,
    value: String,
}

impl Rdn {
    pub fn new(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attr: attr.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this component is named by `attr` (case-insensitive).
    pub fn is(&self, attr: &str) -> bool {
        self.attr.eq_ignore_ascii_case(attr)
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.attr == other.attr && self.value.to_lowercase() == other.value.to_lowercase()
    }
}

impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, escape_value(&self.value))
    }
}

// ── Dn ──────────────────────────────────────────────────────────────

/// An entry location. The empty DN is the directory root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The directory root (empty DN).
    pub fn root() -> Self {
        Self { rdns: Vec::new() }
    }

    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    /// A one-component DN directly under the root.
    pub fn rdn(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            rdns: vec![Rdn::new(attr, value)],
        }
    }

    /// Parse the string form, honouring backslash escapes in values.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut rdns = Vec::new();
        for component in split_unescaped(trimmed, ',') {
            let Some((attr, raw)) = split_once_unescaped(component, '=') else {
                return Err(invalid(input, "component is missing '='"));
            };
            let attr = attr.trim();
            if attr.is_empty()
                || !attr
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            {
                return Err(invalid(input, "malformed attribute type"));
            }

            let raw = raw.trim_start();
            let raw = if raw.ends_with("\\ ") {
                raw
            } else {
                raw.trim_end()
            };
            let value = unescape_value(raw).ok_or_else(|| invalid(input, "dangling escape"))?;
            if value.is_empty() {
                return Err(invalid(input, "empty attribute value"));
            }
            rdns.push(Rdn::new(attr, value));
        }

        Ok(Self { rdns })
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Leftmost component (the naming component), if any.
    pub fn first(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The enclosing entry's location; `None` for the root.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    /// A location one level below this one.
    pub fn child(&self, attr: impl Into<String>, value: impl Into<String>) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(Rdn::new(attr, value));
        rdns.extend(self.rdns.iter().cloned());
        Self { rdns }
    }

    /// Ancestor test: trivially true against the root, otherwise a
    /// case-insensitive component suffix match. An entry is under itself.
    pub fn is_under(&self, ancestor: &Dn) -> bool {
        if ancestor.is_root() {
            return true;
        }
        let Some(offset) = self.rdns.len().checked_sub(ancestor.rdns.len()) else {
            return false;
        };
        self.rdns[offset..] == ancestor.rdns[..]
    }

    /// Like [`is_under`](Self::is_under) but excludes the ancestor itself.
    pub fn is_strictly_under(&self, ancestor: &Dn) -> bool {
        self.rdns.len() > ancestor.rdns.len() && self.is_under(ancestor)
    }

    /// Swap `old_suffix` for `new_suffix`. Returns `None` when this DN is
    /// not under `old_suffix`.
    pub fn with_suffix_replaced(&self, old_suffix: &Dn, new_suffix: &Dn) -> Option<Dn> {
        if !self.is_under(old_suffix) {
            return None;
        }
        let keep = self.rdns.len() - old_suffix.rdns.len();
        let mut rdns = self.rdns[..keep].to_vec();
        rdns.extend(new_suffix.rdns.iter().cloned());
        Some(Self { rdns })
    }

    /// Lowercased string form, used as a map key by stores.
    pub fn normalized(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Dn {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Dn> for String {
    fn from(dn: Dn) -> Self {
        dn.to_string()
    }
}

// ── Escaping helpers ────────────────────────────────────────────────

/// Escape an RDN value for its string form.
pub fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let edge_space = c == ' ' && (i == 0 || i == last);
        if SPECIAL.contains(&c) || edge_space || (i == 0 && c == '#') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Undo [`escape_value`]; also accepts `\XX` hex pairs. `None` on a
/// trailing lone backslash or invalid UTF-8 from hex pairs.
fn unescape_value(raw: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let next = chars.next()?;
        let hex_pair = next
            .to_digit(16)
            .zip(chars.peek().and_then(|c| c.to_digit(16)));
        if let Some((hi, lo)) = hex_pair {
            chars.next();
            bytes.push(u8::try_from(hi * 16 + lo).ok()?);
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
        }
    }
    String::from_utf8(bytes).ok()
}

fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

fn split_once_unescaped(s: &str, sep: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            return Some((&s[..i], &s[i + c.len_utf8()..]));
        }
    }
    None
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::InvalidDn {
        input: input.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_and_display() {
        let dn = Dn::parse("uid=alice, ou=people ,dc=example,dc=com").unwrap();
        assert_eq!(dn.len(), 4);
        assert_eq!(dn.to_string(), "uid=alice,ou=people,dc=example,dc=com");
        assert_eq!(dn.first().unwrap().value(), "alice");
        assert!(dn.first().unwrap().is("UID"));
    }

    #[test]
    fn empty_string_is_root() {
        let dn = Dn::parse("   ").unwrap();
        assert!(dn.is_root());
        assert_eq!(dn.to_string(), "");
        assert!(dn.parent().is_none());
    }

    #[test]
    fn escaped_values_survive() {
        let dn = Dn::root().child("cn", "Smith, John + co");
        let rendered = dn.to_string();
        assert_eq!(rendered, r"cn=Smith\, John \+ co");
        let reparsed = Dn::parse(&rendered).unwrap();
        assert_eq!(reparsed.first().unwrap().value(), "Smith, John + co");
    }

    #[test]
    fn hex_escapes_decode() {
        let dn = Dn::parse(r"cn=a\2cb,dc=com").unwrap();
        assert_eq!(dn.first().unwrap().value(), "a,b");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Dn::parse("uid").is_err());
        assert!(Dn::parse("=x,dc=com").is_err());
        assert!(Dn::parse("uid=,dc=com").is_err());
        assert!(Dn::parse(r"uid=a\").is_err());
    }

    #[test]
    fn equality_ignores_case() {
        let a = Dn::parse("UID=Alice,DC=Example,DC=com").unwrap();
        let b = Dn::parse("uid=alice,dc=example,dc=COM").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn ancestry() {
        let domain = Dn::parse("dc=example,dc=com").unwrap();
        let account = Dn::parse("uid=a,ou=people,DC=Example,dc=com").unwrap();
        let other = Dn::parse("dc=ample,dc=com").unwrap();

        assert!(account.is_under(&domain));
        assert!(account.is_under(&Dn::root()));
        assert!(domain.is_under(&domain));
        assert!(!domain.is_strictly_under(&domain));
        assert!(!other.is_under(&domain));
        assert!(!domain.is_under(&account));
    }

    #[test]
    fn suffix_replacement() {
        let old = Dn::parse("dc=a,dc=com").unwrap();
        let new = Dn::parse("dc=b,dc=org").unwrap();
        let account = Dn::parse("uid=x,ou=people,dc=a,dc=com").unwrap();

        let moved = account.with_suffix_replaced(&old, &new).unwrap();
        assert_eq!(moved.to_string(), "uid=x,ou=people,dc=b,dc=org");
        assert!(new.with_suffix_replaced(&old, &new).is_none());
    }

    #[test]
    fn serde_uses_string_form() {
        let dn = Dn::parse("cn=cos,cn=dirprov").unwrap();
        let json = serde_json::to_string(&dn).unwrap();
        assert_eq!(json, "\"cn=cos,cn=dirprov\"");
        let back: Dn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dn);
    }
}
