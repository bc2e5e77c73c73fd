// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversations and the generation pipeline.
//!
//! [`ConversationStore`] owns the conversation list and active selection and
//! writes a full snapshot through [`parlor_storage::Preferences`] after every
//! mutation. [`GenerationPipeline`] turns a user message into an appended
//! reply without blocking the caller.

pub mod pipeline;
pub mod store;

pub use pipeline::{
    GenerationHandle, GenerationPipeline, GenerationReport, NO_MODEL_REPLY, ReplyKind,
    SendOutcome,
};
pub use store::{ConversationStore, StoreSnapshot};
