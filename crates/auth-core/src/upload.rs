//! Blob upload collaborator
//!
//! Avatar images are pushed to an external blob host during registration or
//! profile update. The core only needs this one capability; storage layout,
//! CDN and resizing are the collaborator's business.

use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait BlobUpload: Send + Sync {
    /// Upload raw image bytes, returning a public URL.
    /// Failures surface as [`crate::Error::Upload`].
    async fn upload(&self, bytes: &[u8]) -> Result<String>;
}
