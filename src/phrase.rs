use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque locale identifier (a BCP-47 language tag by convention).
///
/// Locales are only ever compared for equality and used as map keys; no
/// business logic parses them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mapping from locale to an ordered list of candidate strings.
///
/// The first element of each list is the canonical display value. A map is
/// *empty* when no locale has a non-empty candidate list; emptiness is the
/// sole signal that a phrase should be deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationMap(BTreeMap<Locale, Vec<String>>);

impl TranslationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no locale has a non-empty candidate list. Note that this is
    /// stronger than "no keys": a map whose every list has been cleared is
    /// also empty.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|candidates| candidates.is_empty())
    }

    /// Replace the candidate list for a locale (inserting the key if new).
    pub fn insert(&mut self, locale: Locale, candidates: Vec<String>) {
        self.0.insert(locale, candidates);
    }

    pub fn get(&self, locale: &Locale) -> Option<&[String]> {
        self.0.get(locale).map(Vec::as_slice)
    }

    /// The canonical display value for a locale (first candidate).
    pub fn display_value(&self, locale: &Locale) -> Option<&str> {
        self.0
            .get(locale)
            .and_then(|candidates| candidates.first())
            .map(String::as_str)
    }

    /// True when the locale is present with at least one candidate.
    pub fn has_entries(&self, locale: &Locale) -> bool {
        self.0
            .get(locale)
            .is_some_and(|candidates| !candidates.is_empty())
    }

    /// Merge `updates` into the receiver: for each locale in `updates` the
    /// existing list is replaced wholesale (last-writer-wins per locale).
    pub fn merge(&mut self, updates: TranslationMap) {
        for (locale, candidates) in updates.0 {
            self.0.insert(locale, candidates);
        }
    }

    /// Set each named locale's list to empty. This is a destructive write,
    /// not a key removal; absent locales are untouched.
    pub fn clear(&mut self, locales: &[Locale]) {
        for locale in locales {
            if let Some(candidates) = self.0.get_mut(locale) {
                candidates.clear();
            }
        }
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.0.keys()
    }
}

impl FromIterator<(Locale, Vec<String>)> for TranslationMap {
    fn from_iter<I: IntoIterator<Item = (Locale, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The storage substrate a phrase is persisted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Remote => f.write_str("remote"),
        }
    }
}

/// An opaque reference into the remote store, used to avoid refetching
/// before a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle(String);

impl RecordHandle {
    pub fn new(record_name: impl Into<String>) -> Self {
        Self(record_name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A bilingual/multilingual text unit keyed by a stable id.
///
/// `source` and `handle` are runtime-only: the persisted form is exactly
/// `{id, creationDate, updatedDate, translations}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    pub id: Uuid,
    pub creation_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub translations: TranslationMap,
    #[serde(skip)]
    pub source: BackendKind,
    #[serde(skip)]
    pub handle: Option<RecordHandle>,
}

impl Phrase {
    /// Allocate a fresh phrase: new v4 id, both timestamps stamped to now.
    pub fn new(translations: TranslationMap, source: BackendKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            creation_date: now,
            updated_date: now,
            translations,
            source,
            handle: None,
        }
    }
}
