use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::phrase::{BackendKind, Locale, Phrase, TranslationMap};

/// Storage key holding the entire serialized phrase list.
const PHRASES_KEY: &str = "phrases";

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("translations must contain at least one non-empty locale")]
    InvalidPayload,

    #[error("no phrase with id {0}")]
    NotFound(Uuid),

    #[error("local fetch failed: {0}")]
    Fetch(String),

    #[error("local create failed: {0}")]
    Create(String),

    #[error("local update failed: {0}")]
    Update(String),

    #[error("local delete failed: {0}")]
    Delete(String),
}

/// A flat key-value store backed by one JSON file.
///
/// Reading a missing file or a missing key yields the type's default, never
/// an error. Every mutation is a read-entire-file, modify, write-entire-file
/// cycle; a single-writer lock serializes those cycles so concurrent callers
/// within one process cannot silently overwrite each other's effect.
#[derive(Debug)]
pub struct KvFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl KvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the value stored under `key`, defaulting when absent.
    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let _guard = self.write_lock.lock().unwrap();
        let entries = self.load()?;
        match entries.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .with_context(|| format!("corrupt value under key '{}'", key)),
            None => Ok(T::default()),
        }
    }

    /// Read-modify-write the value under `key` while holding the writer
    /// lock for the whole cycle. The closure's result is passed through.
    pub fn with_value<T, R>(&self, key: &str, mutate: impl FnOnce(&mut T) -> R) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let _guard = self.write_lock.lock().unwrap();
        let mut entries = self.load()?;
        let mut value: T = match entries.remove(key) {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("corrupt value under key '{}'", key))?,
            None => T::default(),
        };

        let out = mutate(&mut value);

        entries.insert(
            key.to_string(),
            serde_json::to_value(&value).context("failed to serialize store value")?,
        );
        self.store(&entries)?;
        Ok(out)
    }

    fn load(&self) -> Result<Map<String, Value>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt store file at {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e).context(format!("failed to read {}", self.path.display())),
        }
    }

    fn store(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let bytes = serde_json::to_vec(entries).context("failed to serialize store")?;
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// The on-device backend: the whole phrase collection lives under one key
/// and is rewritten in full on every mutation.
#[derive(Debug)]
pub struct LocalBackend {
    store: KvFile,
}

impl LocalBackend {
    pub fn new(store: KvFile) -> Self {
        Self { store }
    }
}

enum ClearOutcome {
    Missing,
    Removed(Uuid),
    Kept(Phrase),
}

impl StorageBackend for LocalBackend {
    type Error = LocalError;

    async fn create(&self, translations: TranslationMap) -> Result<Phrase, LocalError> {
        if translations.is_empty() {
            return Err(LocalError::InvalidPayload);
        }

        let phrase = Phrase::new(translations, BackendKind::Local);
        let appended = phrase.clone();
        self.store
            .with_value::<Vec<Phrase>, _>(PHRASES_KEY, |phrases| phrases.push(appended))
            .map_err(|e| LocalError::Create(format!("{e:#}")))?;

        debug!(id = %phrase.id, "created local phrase");
        Ok(phrase)
    }

    async fn list(&self) -> Result<Vec<Phrase>, LocalError> {
        let phrases: Vec<Phrase> = self
            .store
            .get(PHRASES_KEY)
            .map_err(|e| LocalError::Fetch(format!("{e:#}")))?;

        // Most-recently-appended first
        Ok(phrases.into_iter().rev().collect())
    }

    async fn update(
        &self,
        phrase: &Phrase,
        translations: TranslationMap,
    ) -> Result<Phrase, LocalError> {
        if translations.is_empty() {
            return Err(LocalError::InvalidPayload);
        }

        let id = phrase.id;
        let updated = self
            .store
            .with_value::<Vec<Phrase>, _>(PHRASES_KEY, |phrases| {
                phrases.iter_mut().find(|p| p.id == id).map(|existing| {
                    existing.translations = translations;
                    existing.updated_date = Utc::now();
                    existing.clone()
                })
            })
            .map_err(|e| LocalError::Update(format!("{e:#}")))?;

        match updated {
            Some(phrase) => Ok(phrase),
            None => {
                warn!(%id, "update targeted an unknown local phrase");
                Err(LocalError::NotFound(id))
            }
        }
    }

    async fn delete_translations(
        &self,
        phrase: &Phrase,
        locales: &[Locale],
    ) -> Result<Option<Phrase>, LocalError> {
        let id = phrase.id;
        let outcome = self
            .store
            .with_value::<Vec<Phrase>, _>(PHRASES_KEY, |phrases| {
                let Some(pos) = phrases.iter().position(|p| p.id == id) else {
                    return ClearOutcome::Missing;
                };
                let entry = &mut phrases[pos];
                entry.translations.clear(locales);
                if entry.translations.is_empty() {
                    phrases.remove(pos);
                    ClearOutcome::Removed(id)
                } else {
                    entry.updated_date = Utc::now();
                    ClearOutcome::Kept(entry.clone())
                }
            })
            .map_err(|e| LocalError::Delete(format!("{e:#}")))?;

        match outcome {
            // Not-found is an explicit no-op success (idempotence contract)
            ClearOutcome::Missing => Ok(None),
            ClearOutcome::Removed(id) => {
                debug!(%id, "local phrase fully cleared and removed");
                Ok(None)
            }
            ClearOutcome::Kept(phrase) => Ok(Some(phrase)),
        }
    }

    async fn list_for_locale_pair(
        &self,
        primary: &Locale,
        secondary: &Locale,
    ) -> Result<Vec<Phrase>, LocalError> {
        let mut phrases = self.list().await?;
        phrases.retain(|p| {
            p.translations.has_entries(primary) && p.translations.has_entries(secondary)
        });
        Ok(phrases)
    }
}
