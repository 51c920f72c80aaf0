//! Persistence for Kroma Studio.
//!
//! This crate provides:
//! - The [`ProjectRepository`] trait with file and in-memory backends
//! - [`ClipStore`] for rendered scene clips
//! - The [`CreditsService`] trait and its [`CreditsLedger`] implementation
//! - Retry helpers for persistence writes

pub mod clips;
pub mod config;
pub mod credits;
pub mod error;
pub mod file_repo;
pub mod fs_utils;
pub mod memory_repo;
pub mod repository;
pub mod retry;

pub use clips::{clip_reference, parse_clip_reference, ClipStore};
pub use config::{StoreBackend, StoreConfig, Stores};
pub use credits::{CreditsLedger, CreditsService, LedgerKind};
pub use error::{StoreError, StoreResult};
pub use file_repo::FileProjectRepository;
pub use memory_repo::InMemoryProjectRepository;
pub use repository::ProjectRepository;
pub use retry::{retry_async, RetryConfig, RetryResult};
