use crate::backend::StorageBackend;
use crate::error::PhraseError;
use crate::local::{LocalBackend, LocalError};
use crate::phrase::{BackendKind, Locale, Phrase, TranslationMap};
use crate::remote::{RemoteBackend, RemoteError};

/// Routes each operation to the backend named by the call (or recorded on
/// the phrase) and normalizes backend-specific errors into the shared
/// taxonomy, so calling code never branches on backend identity.
#[derive(Debug)]
pub struct PhraseFacade {
    local: LocalBackend,
    remote: RemoteBackend,
}

impl PhraseFacade {
    pub fn new(local: LocalBackend, remote: RemoteBackend) -> Self {
        Self { local, remote }
    }

    pub async fn create(
        &self,
        kind: BackendKind,
        translations: TranslationMap,
    ) -> Result<Phrase, PhraseError> {
        match kind {
            BackendKind::Local => self.local.create(translations).await.map_err(map_local),
            BackendKind::Remote => self.remote.create(translations).await.map_err(map_remote),
        }
    }

    pub async fn list(&self, kind: BackendKind) -> Result<Vec<Phrase>, PhraseError> {
        match kind {
            BackendKind::Local => self.local.list().await.map_err(map_local),
            BackendKind::Remote => self.remote.list().await.map_err(map_remote),
        }
    }

    pub async fn list_for_locale_pair(
        &self,
        kind: BackendKind,
        primary: &Locale,
        secondary: &Locale,
    ) -> Result<Vec<Phrase>, PhraseError> {
        match kind {
            BackendKind::Local => self
                .local
                .list_for_locale_pair(primary, secondary)
                .await
                .map_err(map_local),
            BackendKind::Remote => self
                .remote
                .list_for_locale_pair(primary, secondary)
                .await
                .map_err(map_remote),
        }
    }

    /// Dispatches on the phrase's recorded source.
    pub async fn update(
        &self,
        phrase: &Phrase,
        translations: TranslationMap,
    ) -> Result<Phrase, PhraseError> {
        match phrase.source {
            BackendKind::Local => self
                .local
                .update(phrase, translations)
                .await
                .map_err(map_local),
            BackendKind::Remote => self
                .remote
                .update(phrase, translations)
                .await
                .map_err(map_remote),
        }
    }

    /// Dispatches on the phrase's recorded source. `Ok(None)` means no
    /// phrase remains.
    pub async fn delete_translations(
        &self,
        phrase: &Phrase,
        locales: &[Locale],
    ) -> Result<Option<Phrase>, PhraseError> {
        match phrase.source {
            BackendKind::Local => self
                .local
                .delete_translations(phrase, locales)
                .await
                .map_err(map_local),
            BackendKind::Remote => self
                .remote
                .delete_translations(phrase, locales)
                .await
                .map_err(map_remote),
        }
    }
}

// Both mappings are exhaustive matches: adding a backend error variant
// without a taxonomy case is a compile error, not a runtime surprise.

fn map_local(err: LocalError) -> PhraseError {
    match err {
        LocalError::InvalidPayload => PhraseError::InvalidPayload,
        LocalError::NotFound(id) => PhraseError::Update(format!("no phrase with id {id}")),
        LocalError::Fetch(c) => PhraseError::Fetch(c),
        LocalError::Create(c) => PhraseError::Create(c),
        LocalError::Update(c) => PhraseError::Update(c),
        LocalError::Delete(c) => PhraseError::Delete(c),
    }
}

fn map_remote(err: RemoteError) -> PhraseError {
    match err {
        RemoteError::InvalidPayload => PhraseError::InvalidPayload,
        RemoteError::AccountUnavailable => PhraseError::AccountUnavailable,
        RemoteError::Fetch(c) => PhraseError::Fetch(c),
        RemoteError::Create(c) => PhraseError::Create(c),
        RemoteError::Update(c) => PhraseError::Update(c),
        RemoteError::Delete(c) => PhraseError::Delete(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // ==================== Error Mapping Tests ====================

    #[test]
    fn test_local_invalid_payload_maps_to_invalid_payload() {
        assert!(matches!(
            map_local(LocalError::InvalidPayload),
            PhraseError::InvalidPayload
        ));
    }

    #[test]
    fn test_local_not_found_maps_to_update_failure() {
        let id = Uuid::new_v4();
        let mapped = map_local(LocalError::NotFound(id));
        assert!(matches!(mapped, PhraseError::Update(c) if c.contains(&id.to_string())));
    }

    #[test]
    fn test_local_operation_errors_keep_their_kind() {
        assert!(matches!(
            map_local(LocalError::Fetch("f".into())),
            PhraseError::Fetch(c) if c == "f"
        ));
        assert!(matches!(
            map_local(LocalError::Create("c".into())),
            PhraseError::Create(c) if c == "c"
        ));
        assert!(matches!(
            map_local(LocalError::Update("u".into())),
            PhraseError::Update(c) if c == "u"
        ));
        assert!(matches!(
            map_local(LocalError::Delete("d".into())),
            PhraseError::Delete(c) if c == "d"
        ));
    }

    #[test]
    fn test_remote_account_unavailable_stays_distinct() {
        assert!(matches!(
            map_remote(RemoteError::AccountUnavailable),
            PhraseError::AccountUnavailable
        ));
    }

    #[test]
    fn test_remote_operation_errors_keep_their_kind() {
        assert!(matches!(
            map_remote(RemoteError::InvalidPayload),
            PhraseError::InvalidPayload
        ));
        assert!(matches!(
            map_remote(RemoteError::Fetch("f".into())),
            PhraseError::Fetch(c) if c == "f"
        ));
        assert!(matches!(
            map_remote(RemoteError::Create("c".into())),
            PhraseError::Create(c) if c == "c"
        ));
        assert!(matches!(
            map_remote(RemoteError::Update("u".into())),
            PhraseError::Update(c) if c == "u"
        ));
        assert!(matches!(
            map_remote(RemoteError::Delete("d".into())),
            PhraseError::Delete(c) if c == "d"
        ));
    }
}
