// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parlor integration tests.
//!
//! Provides mock capabilities and test harness infrastructure for fast,
//! deterministic tests without a real model or network.
//!
//! # Components
//!
//! - [`MockEngine`] / [`MockEngineLoader`] - scripted inference engine
//! - [`MockDownloader`] - download capability that records requests
//! - [`MemoryKeyValueStore`] - in-memory key-value store with failure injection
//! - [`TestHarness`] - the full chat and model stack over a temp database

pub mod harness;
pub mod memory_kv;
pub mod mock_downloader;
pub mod mock_engine;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_kv::MemoryKeyValueStore;
pub use mock_downloader::MockDownloader;
pub use mock_engine::{EngineGate, MockEngine, MockEngineLoader};
