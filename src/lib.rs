//! Bilingual phrase persistence over two storage substrates: a local flat
//! key-value file and a remote eventually-consistent record store. Both sit
//! behind one CRUD contract; the remote side repairs duplicate records at
//! read time instead of preventing them up front.

pub mod backend;
pub mod config;
pub mod error;
pub mod facade;
pub mod local;
pub mod manager;
pub mod phrase;
pub mod remote;

pub use backend::StorageBackend;
pub use config::Config;
pub use error::PhraseError;
pub use facade::PhraseFacade;
pub use local::{KvFile, LocalBackend, LocalError};
pub use manager::PhraseManager;
pub use phrase::{BackendKind, Locale, Phrase, RecordHandle, TranslationMap};
pub use remote::{RecordClient, RemoteBackend, RemoteError};
