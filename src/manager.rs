use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::PhraseError;
use crate::facade::PhraseFacade;
use crate::phrase::{BackendKind, Locale, Phrase, TranslationMap};

/// A transient per-phrase edit buffer entry. Never persisted directly; it is
/// folded into an `update` when edit mode ends or the selection changes.
#[derive(Debug, Clone, PartialEq)]
struct EditedPhrase {
    id: Uuid,
    translations: TranslationMap,
}

/// Holds the phrase list for the selected locale pair and batches per-phrase
/// edits while edit mode is active.
///
/// The manager is single-owner state: `phrases` and the edit buffers are
/// only ever mutated through `&mut self` on one execution context.
#[derive(Debug)]
pub struct PhraseManager {
    facade: PhraseFacade,
    backend: BackendKind,
    locale_pair: Option<(Locale, Locale)>,
    phrases: Vec<Phrase>,
    current_edit: Option<EditedPhrase>,
    pending_edits: Vec<EditedPhrase>,
}

impl PhraseManager {
    pub fn new(facade: PhraseFacade, backend: BackendKind) -> Self {
        Self {
            facade,
            backend,
            locale_pair: None,
            phrases: Vec::new(),
            current_edit: None,
            pending_edits: Vec::new(),
        }
    }

    /// The currently displayed phrases.
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    pub fn locale_pair(&self) -> Option<(&Locale, &Locale)> {
        self.locale_pair.as_ref().map(|(a, b)| (a, b))
    }

    /// Replace the held list with the phrases for a locale pair.
    pub async fn fetch_for_locale_pair(
        &mut self,
        primary: Locale,
        secondary: Locale,
    ) -> Result<(), PhraseError> {
        let phrases = self
            .facade
            .list_for_locale_pair(self.backend, &primary, &secondary)
            .await?;
        debug!(
            count = phrases.len(),
            %primary,
            %secondary,
            "fetched phrases for locale pair"
        );
        self.phrases = phrases;
        self.locale_pair = Some((primary, secondary));
        Ok(())
    }

    /// Select a phrase for editing. Any unsaved edit on the previous
    /// selection is buffered first (only if it actually differs from the
    /// original), then the new phrase's current translations become the
    /// live edit buffer.
    pub fn select_for_edit(&mut self, id: Uuid) -> Result<(), PhraseError> {
        self.buffer_current_edit();

        let phrase = self
            .phrases
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PhraseError::Update(format!("no displayed phrase with id {id}")))?;

        self.current_edit = Some(EditedPhrase {
            id,
            translations: phrase.translations.clone(),
        });
        Ok(())
    }

    /// Write into the live edit buffer. A no-op when nothing is selected.
    pub fn edit_translation(&mut self, locale: Locale, candidates: Vec<String>) {
        match &mut self.current_edit {
            Some(edit) => edit.translations.insert(locale, candidates),
            None => debug!("edit_translation called with no phrase selected"),
        }
    }

    /// End edit mode: replay every buffered edit as an update through the
    /// facade. Every entry is attempted; the first failure is returned after
    /// the sweep. Phrases without a buffered edit are left untouched.
    pub async fn commit_edits(&mut self) -> Result<(), PhraseError> {
        self.buffer_current_edit();

        let pending = std::mem::take(&mut self.pending_edits);
        let mut first_error: Option<PhraseError> = None;

        for edit in pending {
            let Some(original) = self.phrases.iter().find(|p| p.id == edit.id).cloned() else {
                warn!(id = %edit.id, "buffered edit for a phrase no longer displayed, dropping");
                continue;
            };

            match self.facade.update(&original, edit.translations).await {
                Ok(updated) => {
                    if let Some(slot) = self.phrases.iter_mut().find(|p| p.id == updated.id) {
                        *slot = updated;
                    }
                }
                Err(e) => {
                    warn!(id = %edit.id, error = %e, "failed to commit buffered edit");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Build a two-entry translation map and create the phrase. On success
    /// the new phrase is prepended to the displayed list without a refetch;
    /// on failure the list is untouched.
    pub async fn create(
        &mut self,
        primary_text: &str,
        primary_locale: Locale,
        secondary_text: &str,
        secondary_locale: Locale,
    ) -> Result<Phrase, PhraseError> {
        let translations: TranslationMap = [
            (primary_locale, vec![primary_text.to_string()]),
            (secondary_locale, vec![secondary_text.to_string()]),
        ]
        .into_iter()
        .collect();

        let phrase = self.facade.create(self.backend, translations).await?;
        self.phrases.insert(0, phrase.clone());
        Ok(phrase)
    }

    /// Clear the named locales on a displayed phrase, routing through the
    /// backend the phrase was loaded from. An id that is not displayed is a
    /// no-op success.
    pub async fn delete_translations(
        &mut self,
        id: Uuid,
        locales: &[Locale],
    ) -> Result<(), PhraseError> {
        let Some(phrase) = self.phrases.iter().find(|p| p.id == id).cloned() else {
            return Ok(());
        };

        match self.facade.delete_translations(&phrase, locales).await? {
            Some(updated) => {
                if let Some(slot) = self.phrases.iter_mut().find(|p| p.id == id) {
                    *slot = updated;
                }
            }
            None => self.phrases.retain(|p| p.id != id),
        }
        Ok(())
    }

    /// Move the live edit into the pending buffer, skipping it when it does
    /// not differ from the original phrase (compare-and-skip). A pending
    /// entry for the same id is replaced, not duplicated.
    fn buffer_current_edit(&mut self) {
        let Some(edit) = self.current_edit.take() else {
            return;
        };

        let Some(original) = self.phrases.iter().find(|p| p.id == edit.id) else {
            debug!(id = %edit.id, "edited phrase no longer displayed, dropping edit");
            return;
        };

        if original.translations == edit.translations {
            return;
        }

        self.pending_edits.retain(|e| e.id != edit.id);
        self.pending_edits.push(edit);
    }
}
