//! Document store access: service-account auth and Google Drive v3 transport.
//!
//! This crate provides:
//! - [`DocumentSource`]: the seam the knowledge pipeline fetches through
//! - [`DriveClient`]: the Drive v3 implementation (listing, export, download)
//! - [`ServiceAccountAuth`]: OAuth2 JWT-bearer token exchange with reuse

mod auth;
mod client;

use async_trait::async_trait;

use docchat_shared::{Result, SourceItem};

pub use auth::{DRIVE_READONLY_SCOPE, ServiceAccountAuth};
pub use client::{DriveClient, listing_query};

/// A folder-based document store.
///
/// Implementations list accepted documents and hand back whole-file bytes.
/// The knowledge pipeline never talks to a transport directly.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Identity of the credential in use (one half of the cache key).
    fn identity(&self) -> String;

    /// List the accepted documents in `folder_id`. Other content types are dropped.
    async fn list(&self, folder_id: &str) -> Result<Vec<SourceItem>>;

    /// Download the full content of one listed item.
    ///
    /// Native documents come back as their plain-text export; paged documents
    /// as their original bytes.
    async fn download(&self, item: &SourceItem) -> Result<Vec<u8>>;
}
