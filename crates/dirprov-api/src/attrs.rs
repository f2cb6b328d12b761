// ── Entry attributes ──
//
// Attribute names are case-insensitive in the directory; we store them
// lowercased and keep insertion order so rendered entries stay stable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute map for one directory entry.
///
/// Every attribute holds an ordered list of string values. Single-valued
/// attributes are simply one-element lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, Vec<String>>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style single value setter.
    pub fn with(mut self, attr: &str, value: impl Into<String>) -> Self {
        self.set(attr, [value.into()]);
        self
    }

    /// Builder-style multi value setter.
    pub fn with_values<I, S>(mut self, attr: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(attr, values);
        self
    }

    /// Replace all values of `attr`. An empty list removes the attribute.
    pub fn set<I, S>(&mut self, attr: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.0.shift_remove(&key(attr));
        } else {
            self.0.insert(key(attr), values);
        }
    }

    /// First value of `attr`, if present.
    pub fn get_one(&self, attr: &str) -> Option<&str> {
        self.0
            .get(&key(attr))
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of `attr` (empty slice when absent).
    pub fn get_all(&self, attr: &str) -> &[String] {
        self.0.get(&key(attr)).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.0.contains_key(&key(attr))
    }

    /// Case-insensitive value membership test.
    pub fn has_value(&self, attr: &str, value: &str) -> bool {
        self.get_all(attr).iter().any(|v| v.eq_ignore_ascii_case(value))
    }

    /// Append values not already present (case-insensitive). Returns the
    /// number actually added.
    pub fn add_values<I, S>(&mut self, attr: &str, values: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slot = self.0.entry(key(attr)).or_default();
        let mut added = 0;
        for value in values {
            let value = value.into();
            if !slot.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
                slot.push(value);
                added += 1;
            }
        }
        if slot.is_empty() {
            self.0.shift_remove(&key(attr));
        }
        added
    }

    /// Remove matching values (case-insensitive). The attribute disappears
    /// once its last value is gone. Returns the number removed.
    pub fn remove_values<I, S>(&mut self, attr: &str, values: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let k = key(attr);
        let Some(slot) = self.0.get_mut(&k) else {
            return 0;
        };
        let before = slot.len();
        for value in values {
            slot.retain(|v| !v.eq_ignore_ascii_case(value.as_ref()));
        }
        let removed = before - slot.len();
        if slot.is_empty() {
            self.0.shift_remove(&k);
        }
        removed
    }

    pub fn remove(&mut self, attr: &str) -> Option<Vec<String>> {
        self.0.shift_remove(&key(attr))
    }

    pub fn object_classes(&self) -> &[String] {
        self.get_all("objectClass")
    }

    pub fn has_object_class(&self, class: &str) -> bool {
        self.has_value("objectClass", class)
    }

    /// Keep only the listed attributes. An empty list keeps everything.
    pub fn project(&self, attrs: &[String]) -> Self {
        if attrs.is_empty() {
            return self.clone();
        }
        let wanted: Vec<String> = attrs.iter().map(|a| key(a)).collect();
        Self(
            self.0
                .iter()
                .filter(|(k, _)| wanted.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Apply a batch of modifications in order.
    pub fn apply(&mut self, mods: &[Modification]) {
        for m in mods {
            match m {
                Modification::Replace { attr, values } => self.set(attr, values.iter().cloned()),
                Modification::Add { attr, values } => {
                    self.add_values(attr, values.iter().cloned());
                }
                Modification::Delete { attr, values } if values.is_empty() => {
                    self.remove(attr);
                }
                Modification::Delete { attr, values } => {
                    self.remove_values(attr, values);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn key(attr: &str) -> String {
    attr.to_ascii_lowercase()
}

// ── Modifications ───────────────────────────────────────────────────

/// One change in a modify request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Modification {
    /// Replace every value. An empty list removes the attribute.
    Replace { attr: String, values: Vec<String> },
    /// Add values, skipping ones already present.
    Add { attr: String, values: Vec<String> },
    /// Remove the listed values, or the whole attribute when empty.
    Delete { attr: String, values: Vec<String> },
}

impl Modification {
    pub fn replace<I, S>(attr: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Replace {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add<I, S>(attr: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Add {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn delete<I, S>(attr: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Delete {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Remove the attribute entirely.
    pub fn delete_attr(attr: &str) -> Self {
        Self::Delete {
            attr: attr.into(),
            values: Vec::new(),
        }
    }

    pub fn attr(&self) -> &str {
        match self {
            Self::Replace { attr, .. } | Self::Add { attr, .. } | Self::Delete { attr, .. } => attr,
        }
    }
}
