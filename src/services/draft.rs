//! Draft authoring state
//!
//! A playlist is composed over several requests: the author fills the
//! form, detours to the book-search screen, picks a book, returns, and
//! repeats. The pending form snapshot and pending book list live here
//! between requests, keyed by `(session, mode, playlist)` so editing
//! two different playlists from one browser session keeps two
//! independent drafts. Two tabs on the same key still race
//! (last-write-wins), which matches the rest of the system.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub session_id: String,
    pub mode: DraftMode,
    pub playlist_id: Option<String>,
}

/// One book picked on the search screen, with the metadata it resolved
/// to at pick time. Duplicate prevention compares the whole record, not
/// just the ISBN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBook {
    pub isbn: String,
    pub provider_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEntry {
    pub isbn: String,
    pub description: Option<String>,
    #[serde(default)]
    pub delete: bool,
}

/// Snapshot of the playlist form as last posted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftForm {
    pub title: Option<String>,
    pub theme_id: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub entries: Vec<DraftEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Draft,
    Searching,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDraft {
    pub state: DraftState,
    pub form: Option<DraftForm>,
    pub books: Vec<PendingBook>,
}

#[derive(Debug, PartialEq)]
pub enum AddBookOutcome {
    Added,
    Duplicate,
}

#[derive(Clone, Default)]
pub struct DraftStore {
    inner: Arc<DashMap<DraftKey, PlaylistDraft>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the draft to its initial state: empty for create, the
    /// target playlist's current values for update.
    pub fn start(
        &self,
        key: DraftKey,
        form: Option<DraftForm>,
        books: Vec<PendingBook>,
    ) -> PlaylistDraft {
        let draft = PlaylistDraft {
            state: DraftState::Draft,
            form,
            books,
        };
        self.inner.insert(key, draft.clone());
        draft
    }

    pub fn get(&self, key: &DraftKey) -> Option<PlaylistDraft> {
        self.inner.get(key).map(|d| d.value().clone())
    }

    /// Resume an in-flight draft (the "continue" marker was present).
    pub fn resume(&self, key: &DraftKey) -> Result<PlaylistDraft, DomainError> {
        self.get(key).ok_or(DomainError::SessionExpired)
    }

    /// Stash the posted form values into the draft. Only valid on a
    /// live draft.
    pub fn stash_form(&self, key: &DraftKey, form: DraftForm) -> Result<PlaylistDraft, DomainError> {
        let mut entry = self
            .inner
            .get_mut(key)
            .ok_or(DomainError::SessionExpired)?;
        entry.form = Some(form);
        Ok(entry.value().clone())
    }

    /// The author detoured to the book-search screen.
    pub fn mark_searching(&self, key: &DraftKey) {
        if let Some(mut entry) = self.inner.get_mut(key) {
            entry.state = DraftState::Searching;
        }
    }

    /// Append a picked book to the pending list. A book equal to one
    /// already present (whole metadata record) is skipped, so repeated
    /// picks are idempotent. Requires a stashed form: reaching the
    /// search screen goes through the form post, so a missing form
    /// means the session was lost.
    pub fn add_book(
        &self,
        key: &DraftKey,
        book: PendingBook,
    ) -> Result<AddBookOutcome, DomainError> {
        let mut entry = self
            .inner
            .get_mut(key)
            .ok_or(DomainError::SessionExpired)?;
        if entry.form.is_none() {
            return Err(DomainError::SessionExpired);
        }
        if entry.books.contains(&book) {
            return Ok(AddBookOutcome::Duplicate);
        }
        if let Some(form) = entry.form.as_mut() {
            form.entries.push(DraftEntry {
                isbn: book.isbn.clone(),
                description: None,
                delete: false,
            });
        }
        entry.books.push(book);
        entry.state = DraftState::Draft;
        Ok(AddBookOutcome::Added)
    }

    /// Drop the draft after a successful commit.
    pub fn clear(&self, key: &DraftKey) {
        self.inner.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> DraftKey {
        DraftKey {
            session_id: "sess".to_string(),
            mode: DraftMode::Create,
            playlist_id: None,
        }
    }

    fn book(isbn: &str, title: &str) -> PendingBook {
        PendingBook {
            isbn: isbn.to_string(),
            provider_id: Some("p1".to_string()),
            title: Some(title.to_string()),
            author: None,
            publisher: None,
            cover: None,
        }
    }

    #[test]
    fn add_book_is_idempotent_by_full_metadata() {
        let store = DraftStore::new();
        store.start(key(), None, Vec::new());
        store.stash_form(&key(), DraftForm::default()).unwrap();

        assert_eq!(
            store.add_book(&key(), book("111", "a")).unwrap(),
            AddBookOutcome::Added
        );
        assert_eq!(
            store.add_book(&key(), book("222", "b")).unwrap(),
            AddBookOutcome::Added
        );
        assert_eq!(
            store.add_book(&key(), book("111", "a")).unwrap(),
            AddBookOutcome::Duplicate
        );
        assert_eq!(store.get(&key()).unwrap().books.len(), 2);

        // Same ISBN with different metadata is treated as a new pick.
        assert_eq!(
            store.add_book(&key(), book("111", "retitled")).unwrap(),
            AddBookOutcome::Added
        );
        assert_eq!(store.get(&key()).unwrap().books.len(), 3);
    }

    #[test]
    fn add_book_without_a_stashed_form_is_session_expired() {
        let store = DraftStore::new();
        store.start(key(), None, Vec::new());
        assert!(matches!(
            store.add_book(&key(), book("111", "a")),
            Err(DomainError::SessionExpired)
        ));
    }

    #[test]
    fn drafts_for_different_playlists_do_not_share_state() {
        let store = DraftStore::new();
        let a = DraftKey {
            session_id: "sess".to_string(),
            mode: DraftMode::Update,
            playlist_id: Some("p-a".to_string()),
        };
        let b = DraftKey {
            playlist_id: Some("p-b".to_string()),
            ..a.clone()
        };
        store.start(a.clone(), Some(DraftForm::default()), Vec::new());
        store.start(b.clone(), Some(DraftForm::default()), Vec::new());
        store.add_book(&a, book("111", "a")).unwrap();
        assert_eq!(store.get(&a).unwrap().books.len(), 1);
        assert!(store.get(&b).unwrap().books.is_empty());
    }
}
