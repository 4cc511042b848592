//! Driving port for submitting a new parcel.
//!
//! The submission is a single request/response call. It never raises: every
//! outcome is either [`ParcelSubmitted`] or a [`MarketplaceError`].

use async_trait::async_trait;

use crate::domain::{MarketplaceError, ParcelDraft, ParcelId, SessionHandle};

/// Image file as received, before validation.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Form fields plus an optional image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitParcelRequest {
    pub draft: ParcelDraft,
    pub image: Option<ImageFile>,
}

/// Successful submission.
///
/// `link_warning` is set when the parcel was created but its image could not
/// be linked as the featured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelSubmitted {
    pub parcel_id: ParcelId,
    pub image_url: Option<String>,
    pub link_warning: Option<String>,
}

#[async_trait]
pub trait ParcelSubmission: Send + Sync {
    /// Validate, upload, insert and link a new parcel for the caller.
    async fn submit(
        &self,
        session: Option<&SessionHandle>,
        request: SubmitParcelRequest,
    ) -> Result<ParcelSubmitted, MarketplaceError>;
}
