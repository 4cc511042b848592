//! DTOs for the hosted backend's JSON payloads.
//!
//! Adapters decode into these transport DTOs first, then map into domain
//! records in one pass. Column names follow the hosted schema.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::amenities::{Accessibility, Equipment, GeneralInfo};
use crate::domain::{
    AccessToken, AuthSession, AvailabilityWindow, Capacity, Email, FeaturedImage, Image, ImageId,
    Latitude, Longitude, NewImage, NewParcel, Parcel, ParcelAmenities, ParcelId, ParcelListing,
    ParcelSummary, ParcelTitle, PricePerDay, RefreshToken, UserId, UserIdentity, UserMetadata,
    UserRecord, ValidatedParcel,
};

/// Error body shared by the auth, REST and storage services.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub(super) code: Option<serde_json::Value>,
    #[serde(default)]
    pub(super) error_code: Option<String>,
    #[serde(default)]
    pub(super) error: Option<String>,
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) msg: Option<String>,
    #[serde(default)]
    pub(super) error_description: Option<String>,
}

impl ErrorBodyDto {
    /// Machine-readable code; numeric `code` fields are HTTP statuses and skipped.
    pub(super) fn code(&self) -> Option<String> {
        self.code
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .or_else(|| self.error_code.clone())
            .or_else(|| self.error.clone())
    }

    pub(super) fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error_description.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PasswordGrantDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) data: &'a UserMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) code_challenge: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) code_challenge_method: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshGrantDto<'a> {
    pub(super) refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct PkceGrantDto<'a> {
    pub(super) auth_code: &'a str,
    pub(super) code_verifier: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthUserDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) email: Option<String>,
    #[serde(default)]
    pub(super) user_metadata: serde_json::Value,
}

impl AuthUserDto {
    pub(super) fn into_domain(self) -> Result<UserIdentity, String> {
        let id = UserId::new(&self.id).map_err(|err| format!("user id {}: {err}", self.id))?;
        let email = self
            .email
            .filter(|email| !email.trim().is_empty())
            .and_then(|email| Email::new(email).ok());
        // Metadata is written by clients; a malformed blob degrades to defaults.
        let metadata = serde_json::from_value(self.user_metadata).unwrap_or_default();
        Ok(UserIdentity::new(id, email, metadata))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionDto {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
    #[serde(default)]
    pub(super) expires_in: Option<i64>,
    #[serde(default)]
    pub(super) expires_at: Option<i64>,
    pub(super) user: AuthUserDto,
}

impl SessionDto {
    pub(super) fn into_domain(self, now: DateTime<Utc>) -> Result<AuthSession, String> {
        let access = AccessToken::new(self.access_token).map_err(|err| err.to_string())?;
        let refresh = self.refresh_token.and_then(RefreshToken::new);
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => DateTime::from_timestamp(at, 0)
                .ok_or_else(|| format!("expires_at {at} out of range"))?,
            (None, Some(secs)) => now + Duration::seconds(secs),
            (None, None) => return Err("session has no expiry".to_owned()),
        };
        let user = self.user.into_domain()?;
        Ok(AuthSession::new(access, refresh, expires_at, user))
    }
}

/// Sign-up answers with a session when confirmation is disabled, a bare
/// user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum SignUpReplyDto {
    Session(SessionDto),
    User(AuthUserDto),
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct UserRowDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) email: Option<String>,
}

impl UserRowDto {
    pub(super) fn from_domain(record: &UserRecord) -> Self {
        Self {
            id: record.id().to_string(),
            email: record.email().map(ToString::to_string),
        }
    }

    pub(super) fn into_domain(self) -> Result<UserRecord, String> {
        let id = UserId::new(&self.id).map_err(|err| format!("user id {}: {err}", self.id))?;
        let email = self.email.and_then(|email| Email::new(email).ok());
        Ok(UserRecord::new(id, email))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ParcelInsertDto<'a> {
    pub(super) proprietaire_id: String,
    pub(super) titre: &'a str,
    pub(super) description: Option<&'a str>,
    pub(super) emplacement: Option<&'a str>,
    pub(super) latitude: Option<f64>,
    pub(super) longitude: Option<f64>,
    pub(super) prix_par_jour: f64,
    pub(super) date_disponibilite_debut: Option<NaiveDate>,
    pub(super) date_disponibilite_fin: Option<NaiveDate>,
    pub(super) capacite_max: Option<u32>,
    #[serde(flatten)]
    pub(super) amenities: &'a ParcelAmenities,
}

impl<'a> ParcelInsertDto<'a> {
    pub(super) fn from_domain(parcel: &'a NewParcel) -> Self {
        let fields = &parcel.fields;
        Self {
            proprietaire_id: parcel.owner_id.to_string(),
            titre: fields.title.as_ref(),
            description: fields.description.as_deref(),
            emplacement: fields.location.as_deref(),
            latitude: fields.latitude.map(Latitude::value),
            longitude: fields.longitude.map(Longitude::value),
            prix_par_jour: fields.price_per_day.value(),
            date_disponibilite_debut: fields.availability.start(),
            date_disponibilite_fin: fields.availability.end(),
            capacite_max: fields.max_capacity.map(Capacity::value),
            amenities: &fields.amenities,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FeaturedImageLinkDto {
    pub(super) image_mise_en_avant_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeaturedImageDto {
    pub(super) id: Uuid,
    pub(super) url: String,
    #[serde(default)]
    pub(super) legende: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ParcelRowDto {
    pub(super) id: Uuid,
    pub(super) proprietaire_id: String,
    pub(super) titre: String,
    #[serde(default)]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) emplacement: Option<String>,
    #[serde(default)]
    pub(super) latitude: Option<Latitude>,
    #[serde(default)]
    pub(super) longitude: Option<Longitude>,
    pub(super) prix_par_jour: PricePerDay,
    #[serde(default)]
    pub(super) date_disponibilite_debut: Option<NaiveDate>,
    #[serde(default)]
    pub(super) date_disponibilite_fin: Option<NaiveDate>,
    #[serde(default)]
    pub(super) capacite_max: Option<u32>,
    #[serde(default)]
    pub(super) infos_generales: Option<GeneralInfo>,
    #[serde(default)]
    pub(super) accessibilite: Option<Accessibility>,
    #[serde(default)]
    pub(super) equipements: Option<Equipment>,
    #[serde(default)]
    pub(super) image_mise_en_avant_id: Option<Uuid>,
    pub(super) date_creation: DateTime<Utc>,
    #[serde(default)]
    pub(super) image_mise_en_avant: Option<FeaturedImageDto>,
}

impl ParcelRowDto {
    pub(super) fn into_parcel(self) -> Result<Parcel, String> {
        self.into_listing().map(|listing| listing.parcel)
    }

    pub(super) fn into_listing(self) -> Result<ParcelListing, String> {
        let id = self.id;
        let invalid = |err: &dyn std::fmt::Display| format!("parcel {id}: {err}");
        let owner_id = UserId::new(&self.proprietaire_id).map_err(|err| invalid(&err))?;
        let title = ParcelTitle::new(&self.titre).map_err(|err| invalid(&err))?;
        let availability =
            AvailabilityWindow::new(self.date_disponibilite_debut, self.date_disponibilite_fin)
                .map_err(|err| invalid(&err))?;
        let max_capacity = self
            .capacite_max
            .map(Capacity::new)
            .transpose()
            .map_err(|err| invalid(&err))?;
        let fields = ValidatedParcel {
            title,
            description: self.description,
            location: self.emplacement,
            latitude: self.latitude,
            longitude: self.longitude,
            price_per_day: self.prix_par_jour,
            availability,
            max_capacity,
            amenities: ParcelAmenities {
                general_info: self.infos_generales.unwrap_or_default(),
                accessibility: self.accessibilite.unwrap_or_default(),
                equipment: self.equipements.unwrap_or_default(),
            },
        };
        let featured_image = self.image_mise_en_avant.map(|image| FeaturedImage {
            id: ImageId::from_uuid(image.id),
            url: image.url,
            caption: image.legende,
        });
        Ok(ParcelListing {
            parcel: Parcel {
                id: ParcelId::from_uuid(id),
                owner_id,
                fields,
                featured_image_id: self.image_mise_en_avant_id.map(ImageId::from_uuid),
                created_at: self.date_creation,
            },
            featured_image,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ParcelSummaryDto {
    pub(super) id: Uuid,
    pub(super) titre: String,
}

impl From<ParcelSummaryDto> for ParcelSummary {
    fn from(row: ParcelSummaryDto) -> Self {
        Self {
            id: ParcelId::from_uuid(row.id),
            title: row.titre,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ImageInsertDto<'a> {
    pub(super) terrain_id: Uuid,
    pub(super) url: &'a str,
    pub(super) legende: Option<&'a str>,
    pub(super) ordre_affichage: Option<i32>,
}

impl<'a> ImageInsertDto<'a> {
    pub(super) fn from_domain(image: &'a NewImage) -> Self {
        Self {
            terrain_id: *image.parcel_id.as_uuid(),
            url: &image.url,
            legende: image.caption.as_deref(),
            ordre_affichage: image.display_order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageRowDto {
    pub(super) id: Uuid,
    #[serde(default)]
    pub(super) terrain_id: Option<Uuid>,
    pub(super) url: String,
    #[serde(default)]
    pub(super) legende: Option<String>,
    #[serde(default)]
    pub(super) ordre_affichage: Option<i32>,
    pub(super) date_creation: DateTime<Utc>,
}

impl From<ImageRowDto> for Image {
    fn from(row: ImageRowDto) -> Self {
        Self {
            id: ImageId::from_uuid(row.id),
            parcel_id: row.terrain_id.map(ParcelId::from_uuid),
            url: row.url,
            caption: row.legende,
            display_order: row.ordre_affichage,
            created_at: row.date_creation,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadReplyDto {
    #[serde(rename = "Key")]
    pub(super) key: String,
}
