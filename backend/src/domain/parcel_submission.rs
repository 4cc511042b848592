//! Parcel submission workflow.
//!
//! Steps run in order and every step before the parcel insert is a hard stop:
//!
//! 1. an active session must be present (local check);
//! 2. the form and the optional image are validated (pure);
//! 3. the caller's identity is resolved (one provider call);
//! 4. the application user record is ensured;
//! 5. the image, if any, is uploaded and its public URL resolved;
//! 6. the parcel is inserted with no featured image;
//! 7. the image row is inserted and the parcel pointed at it.
//!
//! Step 7 is best effort. The store offers no multi-table transaction, so a
//! failure there leaves the parcel without a featured image (or an orphaned
//! image row) and is reported as a warning on an otherwise successful result.
//! An uploaded object is not removed when step 6 fails.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, info, warn};

use crate::domain::identity_gate::IdentityGate;
use crate::domain::marketplace_error::{MarketplaceError, PersistedEntity};
use crate::domain::parcel::{ParcelField, ValidationError, ValidationReason};
use crate::domain::ports::{
    ImageFile, ImageRepository, ObjectStorage, ParcelRepository, ParcelSubmission,
    ParcelSubmitted, SubmitParcelRequest, UserProvisioning,
};
use crate::domain::{
    DEFAULT_MAX_IMAGE_BYTES, ImageUpload, NewImage, Parcel, SessionHandle, StorageKey,
};

/// Outbound collaborators of the submission workflow.
#[derive(Clone)]
pub struct SubmissionPorts {
    pub parcels: Arc<dyn ParcelRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub storage: Arc<dyn ObjectStorage>,
}

/// Submission service implementing [`ParcelSubmission`].
#[derive(Clone)]
pub struct ParcelSubmissionService {
    gate: IdentityGate,
    provisioning: Arc<dyn UserProvisioning>,
    ports: SubmissionPorts,
    clock: Arc<dyn Clock>,
    max_image_bytes: usize,
}

impl ParcelSubmissionService {
    pub fn new(
        gate: IdentityGate,
        provisioning: Arc<dyn UserProvisioning>,
        ports: SubmissionPorts,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate,
            provisioning,
            ports,
            clock,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Override the upload size limit.
    #[must_use]
    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    fn validate_image(
        &self,
        image: Option<ImageFile>,
    ) -> Result<Option<ImageUpload>, MarketplaceError> {
        image
            .map(|file| {
                ImageUpload::try_new(
                    file.file_name,
                    file.content_type,
                    file.bytes,
                    self.max_image_bytes,
                )
                .map_err(|err| {
                    MarketplaceError::from(ValidationError::new(
                        ParcelField::Image,
                        ValidationReason::InvalidImage(err),
                    ))
                })
            })
            .transpose()
    }

    /// Upload the image and resolve its public URL.
    async fn upload(&self, image: &ImageUpload) -> Result<String, MarketplaceError> {
        let key = StorageKey::for_upload(self.clock.utc(), image.file_name());
        let path = self
            .ports
            .storage
            .upload(&key, image.content_type(), image.bytes())
            .await
            .map_err(|err| {
                error!(error = %err, key = %key, "image upload failed");
                MarketplaceError::image_upload_failed(err.to_string())
            })?;
        debug!(path = %path, "image uploaded");
        Ok(self.ports.storage.public_url(&path))
    }

    /// Insert the image row and point the parcel at it. Failures are
    /// returned as a warning message, never as an error.
    async fn link_image(&self, parcel: &Parcel, url: &str) -> Option<String> {
        let new_image = NewImage {
            parcel_id: parcel.id,
            url: url.to_owned(),
            caption: Some(parcel.fields.title.as_ref().to_owned()),
            display_order: Some(0),
        };
        let image = match self.ports.images.insert(&new_image).await {
            Ok(image) => image,
            Err(err) => {
                warn!(parcel_id = %parcel.id, error = %err, "image row not created; parcel has no featured image");
                return Some(format!("image saved but not linked: {err}"));
            }
        };
        if let Err(err) = self
            .ports
            .parcels
            .set_featured_image(&parcel.id, &image.id)
            .await
        {
            warn!(parcel_id = %parcel.id, image_id = %image.id, error = %err, "featured image not set");
            return Some(format!("image saved but not set as featured: {err}"));
        }
        None
    }
}

#[async_trait]
impl ParcelSubmission for ParcelSubmissionService {
    async fn submit(
        &self,
        session: Option<&SessionHandle>,
        request: SubmitParcelRequest,
    ) -> Result<ParcelSubmitted, MarketplaceError> {
        let SubmitParcelRequest { draft, image } = request;

        let session = self.gate.require_session(session)?;
        let fields = draft.validate()?;
        let image = self.validate_image(image)?;

        let identity = self.gate.resolve_identity(session).await?;
        let owner = self.provisioning.ensure_user_record(&identity).await?;

        let image_url = match &image {
            Some(image) => Some(self.upload(image).await?),
            None => None,
        };

        let parcel = self
            .ports
            .parcels
            .insert(&fields.owned_by(owner.id().clone()))
            .await
            .map_err(|err| {
                error!(error = %err, "parcel insert failed");
                MarketplaceError::persistence(PersistedEntity::Parcel, err.to_string())
            })?;
        info!(parcel_id = %parcel.id, owner_id = %parcel.owner_id, "parcel created");

        let link_warning = match &image_url {
            Some(url) => self.link_image(&parcel, url).await,
            None => None,
        };

        Ok(ParcelSubmitted {
            parcel_id: parcel.id,
            image_url,
            link_warning,
        })
    }
}

#[cfg(test)]
#[path = "parcel_submission_tests.rs"]
mod tests;
