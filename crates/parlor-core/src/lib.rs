// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parlor.
//!
//! This crate holds the domain types shared by every other Parlor crate
//! (conversations, messages, download bookkeeping), the capability traits
//! the core consumes from the outside world (engine, key-value store,
//! download manager, content picker), and the single error type.

pub mod engine_slot;
pub mod error;
pub mod traits;
pub mod types;

pub use engine_slot::{EngineHandle, EngineSlot};
pub use error::ParlorError;
pub use types::{
    Conversation, ConversationId, DownloadCompletion, DownloadOutcome, DownloadProgress,
    DownloadRequest, DownloadRequestId, Lookup, Message,
};

pub use traits::{ContentSource, DownloadService, EngineLoader, FileSource, InferenceEngine, KeyValueStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parlor_error_has_all_variants() {
        let _config = ParlorError::Config("test".into());
        let _storage = ParlorError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _serde = ParlorError::Serialization(
            serde_json::from_str::<u32>("nope").unwrap_err(),
        );
        let _engine = ParlorError::engine("test");
        let _download = ParlorError::download("test");
        let _busy = ParlorError::DownloadInProgress;
        let _input = ParlorError::InvalidInput("blank".into());
        let _present = ParlorError::DefaultModelPresent;
        let _io = ParlorError::Io(std::io::Error::other("test"));
        let _internal = ParlorError::Internal("test".into());
    }

    #[test]
    fn all_capability_traits_are_exported() {
        fn _assert_engine<T: InferenceEngine>() {}
        fn _assert_loader<T: EngineLoader>() {}
        fn _assert_kv<T: KeyValueStore>() {}
        fn _assert_download<T: DownloadService>() {}
        fn _assert_content<T: ContentSource>() {}
        _assert_content::<FileSource>();
    }
}
