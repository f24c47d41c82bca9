use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::config::Config;
use crate::phrase::{BackendKind, Locale, Phrase, RecordHandle, TranslationMap};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("translations must contain at least one non-empty locale")]
    InvalidPayload,

    /// The remote account is unavailable to the current user (HTTP 401/403).
    #[error("remote account is unavailable to the current user")]
    AccountUnavailable,

    #[error("remote fetch failed: {0}")]
    Fetch(String),

    #[error("remote create failed: {0}")]
    Create(String),

    #[error("remote update failed: {0}")]
    Update(String),

    #[error("remote delete failed: {0}")]
    Delete(String),
}

impl RemoteError {
    /// Re-tag a failure as part of a create, keeping the caller-actionable
    /// variants intact.
    fn into_create(self) -> RemoteError {
        match self {
            RemoteError::AccountUnavailable => RemoteError::AccountUnavailable,
            RemoteError::InvalidPayload => RemoteError::InvalidPayload,
            RemoteError::Fetch(c)
            | RemoteError::Create(c)
            | RemoteError::Update(c)
            | RemoteError::Delete(c) => RemoteError::Create(c),
        }
    }
}

// Record store wire types. The translation payload is an opaque JSON string
// blob to the store; only `id` and the timestamps are recognized fields.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFields {
    id: Uuid,
    translations: String,
    creation_date: DateTime<Utc>,
    updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhraseRecord {
    record_name: String,
    fields: RecordFields,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryFilter {
    field_name: &'static str,
    comparator: &'static str,
    field_value: String,
}

impl QueryFilter {
    fn id_equals(id: Uuid) -> Self {
        Self {
            field_name: "id",
            comparator: "EQUALS",
            field_value: id.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    record_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<QueryFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<PhraseRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    record_type: &'a str,
    fields: RecordFields,
}

#[derive(Debug, Serialize)]
struct UpdateRequest {
    fields: RecordFields,
}

/// HTTP client for the remote record store.
#[derive(Debug, Clone)]
pub struct RecordClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    record_type: String,
}

impl RecordClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        record_type: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
            record_type: record_type.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.remote_base_url,
            &config.remote_token,
            &config.record_type,
        )
    }

    async fn query(
        &self,
        filter: Option<QueryFilter>,
        limit: Option<u32>,
    ) -> Result<Vec<PhraseRecord>, RemoteError> {
        let request = QueryRequest {
            record_type: &self.record_type,
            filter,
            limit,
        };

        let response = self
            .http
            .post(format!("{}/records/query", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Fetch(format!("query request failed: {e}")))?;
        let response = Self::ensure_success(response, RemoteError::Fetch).await?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Fetch(format!("failed to parse query response: {e}")))?;
        Ok(body.records)
    }

    async fn insert(&self, fields: RecordFields) -> Result<PhraseRecord, RemoteError> {
        let request = CreateRequest {
            record_type: &self.record_type,
            fields,
        };

        let response = self
            .http
            .post(format!("{}/records", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Create(format!("insert request failed: {e}")))?;
        let response = Self::ensure_success(response, RemoteError::Create).await?;

        response
            .json()
            .await
            .map_err(|e| RemoteError::Create(format!("failed to parse stored record: {e}")))
    }

    /// Write back a record. Returns `None` when the store reports success
    /// but sends no updated record.
    async fn patch(
        &self,
        record_name: &str,
        fields: RecordFields,
    ) -> Result<Option<PhraseRecord>, RemoteError> {
        let response = self
            .http
            .patch(format!("{}/records/{}", self.base_url, record_name))
            .bearer_auth(&self.token)
            .json(&UpdateRequest { fields })
            .send()
            .await
            .map_err(|e| RemoteError::Update(format!("update request failed: {e}")))?;
        let response = Self::ensure_success(response, RemoteError::Update).await?;

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Update(format!("failed to read update response: {e}")))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let record = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Update(format!("failed to parse updated record: {e}")))?;
        Ok(Some(record))
    }

    async fn delete(&self, record_name: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(format!("{}/records/{}", self.base_url, record_name))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RemoteError::Delete(format!("delete request failed: {e}")))?;
        Self::ensure_success(response, RemoteError::Delete).await?;
        Ok(())
    }

    async fn ensure_success(
        response: reqwest::Response,
        wrap: fn(String) -> RemoteError,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::AccountUnavailable);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(format!("record store error ({status}): {body}")));
        }
        Ok(response)
    }
}

fn decode_record(record: PhraseRecord) -> Result<Phrase, serde_json::Error> {
    let translations: TranslationMap = serde_json::from_str(&record.fields.translations)?;
    Ok(Phrase {
        id: record.fields.id,
        creation_date: record.fields.creation_date,
        updated_date: record.fields.updated_date,
        translations,
        source: BackendKind::Remote,
        handle: Some(RecordHandle::new(record.record_name)),
    })
}

fn encode_fields(phrase: &Phrase) -> Result<RecordFields, serde_json::Error> {
    Ok(RecordFields {
        id: phrase.id,
        translations: serde_json::to_string(&phrase.translations)?,
        creation_date: phrase.creation_date,
        updated_date: phrase.updated_date,
    })
}

/// The remote backend: no local copy, every read is a live query, and
/// duplicate records produced by concurrent writers are repaired at read
/// time rather than prevented up front.
#[derive(Debug)]
pub struct RemoteBackend {
    client: RecordClient,
}

impl RemoteBackend {
    pub fn new(client: RecordClient) -> Self {
        Self { client }
    }

    /// Find a phrase by its logical id (one query, limit 1).
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Phrase>, RemoteError> {
        let records = self
            .client
            .query(Some(QueryFilter::id_equals(id)), Some(1))
            .await?;
        match records.into_iter().next() {
            Some(record) => decode_record(record)
                .map(Some)
                .map_err(|e| RemoteError::Fetch(format!("failed to decode record: {e}"))),
            None => Ok(None),
        }
    }

    /// List, then keep only phrases matching the predicate. The dedup pass
    /// runs on the full decoded set before filtering.
    pub async fn filter<F>(&self, predicate: F) -> Result<Vec<Phrase>, RemoteError>
    where
        F: Fn(&Phrase) -> bool,
    {
        let mut phrases = self.list().await?;
        phrases.retain(|p| predicate(p));
        Ok(phrases)
    }

    /// Delete the underlying record for a phrase entirely.
    pub async fn delete(&self, phrase: &Phrase) -> Result<(), RemoteError> {
        let resolved = self.resolve(phrase).await?;
        let handle = resolved
            .handle
            .ok_or_else(|| RemoteError::Delete("resolved phrase has no record handle".into()))?;
        self.client.delete(handle.as_str()).await?;
        info!(id = %phrase.id, "remote phrase deleted");
        Ok(())
    }

    /// Unresolved -> Resolved transition: a phrase without a record handle
    /// must be fetched by id before any mutating operation.
    async fn resolve(&self, phrase: &Phrase) -> Result<Phrase, RemoteError> {
        if phrase.handle.is_some() {
            return Ok(phrase.clone());
        }
        debug!(id = %phrase.id, "resolving remote phrase before mutation");
        match self.find_by_id(phrase.id).await? {
            Some(found) => Ok(found),
            None => Err(RemoteError::Fetch(format!(
                "no remote record with id {}",
                phrase.id
            ))),
        }
    }

    /// Decode every raw record and collapse duplicates sharing one logical
    /// id: the first record encountered wins, the rest are deleted from the
    /// store. Collisions are an expected artifact of concurrent writes, so
    /// they are logged and repaired, never surfaced to the caller.
    async fn reconcile(&self, records: Vec<PhraseRecord>) -> Result<Vec<Phrase>, RemoteError> {
        let mut decoded = Vec::with_capacity(records.len());
        for record in records {
            match decode_record(record) {
                Ok(phrase) => decoded.push(phrase),
                Err(e) => warn!(error = %e, "skipping undecodable phrase record"),
            }
        }

        let total = decoded.len();
        let mut seen: HashSet<Uuid> = HashSet::with_capacity(total);
        let mut kept = Vec::with_capacity(total);
        let mut duplicates: Vec<RecordHandle> = Vec::new();

        for phrase in decoded {
            if seen.insert(phrase.id) {
                kept.push(phrase);
            } else {
                warn!(id = %phrase.id, "duplicate remote record detected");
                if let Some(handle) = phrase.handle {
                    duplicates.push(handle);
                }
            }
        }

        if !duplicates.is_empty() {
            let results = join_all(
                duplicates
                    .iter()
                    .map(|handle| self.client.delete(handle.as_str())),
            )
            .await;
            for result in results {
                // A failed repair is retried on the next read
                if let Err(e) = result {
                    warn!(error = %e, "duplicate record delete failed");
                }
            }
            info!(removed = duplicates.len(), "reconciled duplicate remote records");
        }

        // Formerly a debug assertion; duplicates are an expected transient
        // condition, so a mismatch is only worth a warning.
        if kept.len() + duplicates.len() != total {
            warn!(
                kept = kept.len(),
                duplicates = duplicates.len(),
                total,
                "dedup count mismatch after reconciliation"
            );
        }

        Ok(kept)
    }
}

impl StorageBackend for RemoteBackend {
    type Error = RemoteError;

    async fn create(&self, translations: TranslationMap) -> Result<Phrase, RemoteError> {
        if translations.is_empty() {
            return Err(RemoteError::InvalidPayload);
        }

        let phrase = Phrase::new(translations, BackendKind::Remote);

        // Defensive cleanup before insert: a previous failed create may have
        // left an orphan record with this id.
        let orphans = self
            .client
            .query(Some(QueryFilter::id_equals(phrase.id)), None)
            .await
            .map_err(RemoteError::into_create)?;
        if !orphans.is_empty() {
            warn!(
                id = %phrase.id,
                count = orphans.len(),
                "deleting orphan records before create"
            );
            let results = join_all(
                orphans
                    .iter()
                    .map(|record| self.client.delete(&record.record_name)),
            )
            .await;
            for result in results {
                result.map_err(RemoteError::into_create)?;
            }
        }

        let fields = encode_fields(&phrase)
            .map_err(|e| RemoteError::Create(format!("failed to encode phrase: {e}")))?;
        let stored = self.client.insert(fields).await?;
        let phrase = decode_record(stored)
            .map_err(|e| RemoteError::Create(format!("failed to decode stored record: {e}")))?;

        debug!(id = %phrase.id, "created remote phrase");
        Ok(phrase)
    }

    async fn list(&self) -> Result<Vec<Phrase>, RemoteError> {
        let records = self.client.query(None, None).await?;
        self.reconcile(records).await
    }

    async fn update(
        &self,
        phrase: &Phrase,
        translations: TranslationMap,
    ) -> Result<Phrase, RemoteError> {
        if translations.is_empty() {
            return Err(RemoteError::InvalidPayload);
        }

        let mut resolved = self.resolve(phrase).await?;
        let handle = resolved
            .handle
            .take()
            .ok_or_else(|| RemoteError::Update("resolved phrase has no record handle".into()))?;

        resolved.translations = translations;
        resolved.updated_date = Utc::now();
        let fields = encode_fields(&resolved)
            .map_err(|e| RemoteError::Update(format!("failed to encode phrase: {e}")))?;

        match self.client.patch(handle.as_str(), fields).await? {
            Some(record) => decode_record(record)
                .map_err(|e| RemoteError::Update(format!("failed to decode updated record: {e}"))),
            None => Err(RemoteError::Update(
                "store reported success but returned no updated record".into(),
            )),
        }
    }

    async fn delete_translations(
        &self,
        phrase: &Phrase,
        locales: &[Locale],
    ) -> Result<Option<Phrase>, RemoteError> {
        let mut resolved = self.resolve(phrase).await?;
        let handle = resolved
            .handle
            .take()
            .ok_or_else(|| RemoteError::Delete("resolved phrase has no record handle".into()))?;

        resolved.translations.clear(locales);

        if resolved.translations.is_empty() {
            self.client.delete(handle.as_str()).await?;
            info!(id = %resolved.id, "remote phrase fully cleared, record deleted");
            return Ok(None);
        }

        resolved.updated_date = Utc::now();
        let fields = encode_fields(&resolved)
            .map_err(|e| RemoteError::Update(format!("failed to encode phrase: {e}")))?;
        match self.client.patch(handle.as_str(), fields).await? {
            Some(record) => decode_record(record)
                .map(Some)
                .map_err(|e| RemoteError::Update(format!("failed to decode updated record: {e}"))),
            None => Err(RemoteError::Update(
                "store reported success but returned no updated record".into(),
            )),
        }
    }

    async fn list_for_locale_pair(
        &self,
        primary: &Locale,
        secondary: &Locale,
    ) -> Result<Vec<Phrase>, RemoteError> {
        // The translation payload is an opaque blob to the store, so the
        // pair filter cannot be pushed down into the query.
        self.filter(|p| {
            p.translations.has_entries(primary) && p.translations.has_entries(secondary)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrase::Locale;

    fn map(entries: &[(&str, &[&str])]) -> TranslationMap {
        entries
            .iter()
            .map(|(locale, candidates)| {
                (
                    Locale::from(*locale),
                    candidates.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    // ==================== Wire Format Tests ====================

    #[test]
    fn test_record_decodes_into_resolved_phrase() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{
                "recordName": "rec-001",
                "fields": {{
                    "id": "{id}",
                    "translations": "{{\"en\":[\"Hello\"],\"it\":[\"Ciao\"]}}",
                    "creationDate": "2024-01-15T10:30:00Z",
                    "updatedDate": "2024-01-16T08:00:00Z"
                }}
            }}"#
        );

        let record: PhraseRecord = serde_json::from_str(&json).expect("parse record");
        let phrase = decode_record(record).expect("decode");

        assert_eq!(phrase.id, id);
        assert_eq!(phrase.source, BackendKind::Remote);
        assert_eq!(phrase.handle, Some(RecordHandle::new("rec-001")));
        assert_eq!(
            phrase.translations.display_value(&Locale::from("it")),
            Some("Ciao")
        );
        assert!(phrase.creation_date < phrase.updated_date);
    }

    #[test]
    fn test_record_with_corrupt_blob_fails_to_decode() {
        let record = PhraseRecord {
            record_name: "rec-002".to_string(),
            fields: RecordFields {
                id: Uuid::new_v4(),
                translations: "{not valid json".to_string(),
                creation_date: Utc::now(),
                updated_date: Utc::now(),
            },
        };
        assert!(decode_record(record).is_err());
    }

    #[test]
    fn test_encode_roundtrips_through_decode() {
        let phrase = Phrase::new(
            map(&[("en", &["Hello"]), ("it", &["Ciao"])]),
            BackendKind::Remote,
        );
        let fields = encode_fields(&phrase).expect("encode");
        let record = PhraseRecord {
            record_name: "rec-003".to_string(),
            fields,
        };

        let decoded = decode_record(record).expect("decode");
        assert_eq!(decoded.id, phrase.id);
        assert_eq!(decoded.translations, phrase.translations);
    }

    #[test]
    fn test_query_filter_serialization() {
        let id = Uuid::new_v4();
        let request = QueryRequest {
            record_type: "Phrase",
            filter: Some(QueryFilter::id_equals(id)),
            limit: Some(1),
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["recordType"], "Phrase");
        assert_eq!(json["filter"]["fieldName"], "id");
        assert_eq!(json["filter"]["comparator"], "EQUALS");
        assert_eq!(json["filter"]["fieldValue"], id.to_string());
        assert_eq!(json["limit"], 1);
    }

    #[test]
    fn test_query_request_omits_absent_filter_and_limit() {
        let request = QueryRequest {
            record_type: "Phrase",
            filter: None,
            limit: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert!(json.get("filter").is_none());
        assert!(json.get("limit").is_none());
    }

    // ==================== Error Re-tagging Tests ====================

    #[test]
    fn test_into_create_keeps_account_unavailable() {
        let err = RemoteError::AccountUnavailable.into_create();
        assert!(matches!(err, RemoteError::AccountUnavailable));
    }

    #[test]
    fn test_into_create_retags_fetch() {
        let err = RemoteError::Fetch("boom".to_string()).into_create();
        assert!(matches!(err, RemoteError::Create(c) if c == "boom"));
    }

    // ==================== Base URL Tests ====================

    #[test]
    fn test_client_trims_trailing_slashes() {
        let client = RecordClient::new("https://store.example.com/", "token", "Phrase");
        assert_eq!(client.base_url, "https://store.example.com");
    }
}
