use crate::phrase::{Locale, Phrase, TranslationMap};

/// The uniform CRUD contract shared by the local and remote substrates.
///
/// Both implementations use `TranslationMap::is_empty` as the single
/// validation signal: an empty map is rejected on create/update, and a
/// phrase whose translations become empty after `delete_translations` is
/// removed entirely (signalled by `Ok(None)`).
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    type Error;

    /// Persist a new phrase with a fresh id and both timestamps set to now.
    async fn create(&self, translations: TranslationMap) -> Result<Phrase, Self::Error>;

    /// All phrases, most recently created first.
    async fn list(&self) -> Result<Vec<Phrase>, Self::Error>;

    /// Replace a phrase's translations and bump its updated timestamp.
    async fn update(
        &self,
        phrase: &Phrase,
        translations: TranslationMap,
    ) -> Result<Phrase, Self::Error>;

    /// Clear the named locales. Returns `Ok(None)` when no phrase remains
    /// (either it was never there, or clearing emptied it and it was
    /// deleted); `Ok(Some(..))` carries the surviving partial update.
    async fn delete_translations(
        &self,
        phrase: &Phrase,
        locales: &[Locale],
    ) -> Result<Option<Phrase>, Self::Error>;

    /// Phrases holding a non-empty candidate list for *both* locales.
    async fn list_for_locale_pair(
        &self,
        primary: &Locale,
        secondary: &Locale,
    ) -> Result<Vec<Phrase>, Self::Error>;
}
