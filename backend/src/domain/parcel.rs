//! Parcel (terrain) values and submission validation.
//!
//! A submission arrives as a [`ParcelDraft`] holding the raw form strings.
//! [`ParcelDraft::validate`] is pure: it parses every field in a fixed order
//! and stops at the first failure, so invalid input is rejected before any
//! collaborator is contacted.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::amenities::ParcelAmenities;
use crate::domain::image::{FeaturedImage, ImageId, ImageUploadError};
use crate::domain::user::UserId;

/// Identifier of a parcel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(Uuid);

impl ParcelId {
    /// Generate a fresh identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Submission field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParcelField {
    Title,
    Latitude,
    Longitude,
    PricePerDay,
    AvailabilityStart,
    AvailabilityEnd,
    MaxCapacity,
    Image,
}

impl ParcelField {
    /// Field name as it appears in request payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::PricePerDay => "pricePerDay",
            Self::AvailabilityStart => "availabilityStart",
            Self::AvailabilityEnd => "availabilityEnd",
            Self::MaxCapacity => "maxCapacity",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ParcelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReason {
    Required,
    NotANumber,
    OutOfRange { min: f64, max: f64 },
    Negative,
    InvalidDate,
    EndBeforeStart,
    NotAPositiveInteger,
    NotBase64,
    InvalidImage(ImageUploadError),
}

impl ValidationReason {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::NotANumber => "not_a_number",
            Self::OutOfRange { .. } => "out_of_range",
            Self::Negative => "negative",
            Self::InvalidDate => "invalid_date",
            Self::EndBeforeStart => "end_before_start",
            Self::NotAPositiveInteger => "not_a_positive_integer",
            Self::NotBase64 => "invalid_base64",
            Self::InvalidImage(_) => "invalid_image",
        }
    }
}

/// First field that failed validation, with the offending raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: ParcelField,
    pub reason: ValidationReason,
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: ParcelField, reason: ValidationReason) -> Self {
        Self {
            field,
            reason,
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field;
        match &self.reason {
            ValidationReason::Required => write!(f, "{field} is required")?,
            ValidationReason::NotANumber => write!(f, "{field} must be a number")?,
            ValidationReason::OutOfRange { min, max } => {
                write!(f, "{field} must be a number between {min} and {max}")?;
            }
            ValidationReason::Negative => write!(f, "{field} must not be negative")?,
            ValidationReason::InvalidDate => write!(f, "{field} must be a YYYY-MM-DD date")?,
            ValidationReason::EndBeforeStart => {
                write!(f, "{field} must not be before availabilityStart")?;
            }
            ValidationReason::NotAPositiveInteger => {
                write!(f, "{field} must be a positive whole number")?;
            }
            ValidationReason::NotBase64 => write!(f, "{field} data must be base64-encoded")?,
            ValidationReason::InvalidImage(inner) => write!(f, "{inner}")?,
        }
        if let Some(value) = &self.value {
            write!(f, " (got: {value})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Parcel title, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParcelTitle(String);

impl ParcelTitle {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(ParcelField::Title, ValidationReason::Required));
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for ParcelTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ParcelTitle> for String {
    fn from(value: ParcelTitle) -> Self {
        value.0
    }
}

impl TryFrom<String> for ParcelTitle {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

fn parse_bounded(
    raw: &str,
    field: ParcelField,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .ok()
        .filter(|value: &f64| value.is_finite())
        .ok_or_else(|| ValidationError::new(field, ValidationReason::NotANumber).with_value(raw))?;
    if value < min || value > max {
        return Err(
            ValidationError::new(field, ValidationReason::OutOfRange { min, max }).with_value(raw),
        );
    }
    Ok(value)
}

/// Latitude in decimal degrees, within `[-90, 90]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Latitude(f64);

impl Latitude {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        parse_bounded(raw, ParcelField::Latitude, -90.0, 90.0).map(Self)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Longitude in decimal degrees, within `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Longitude(f64);

impl Longitude {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        parse_bounded(raw, ParcelField::Longitude, -180.0, 180.0).map(Self)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Daily rental price; finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricePerDay(f64);

impl PricePerDay {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let field = ParcelField::PricePerDay;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(field, ValidationReason::Required));
        }
        let value: f64 = trimmed
            .parse()
            .ok()
            .filter(|value: &f64| value.is_finite())
            .ok_or_else(|| ValidationError::new(field, ValidationReason::NotANumber).with_value(raw))?;
        Self::new(value).map_err(|err| err.with_value(raw))
    }

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        let field = ParcelField::PricePerDay;
        if !value.is_finite() {
            return Err(ValidationError::new(field, ValidationReason::NotANumber));
        }
        if value < 0.0 {
            return Err(ValidationError::new(field, ValidationReason::Negative));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Maximum number of guests; at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(u32);

impl Capacity {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        raw.trim()
            .parse::<u32>()
            .ok()
            .and_then(|value| Self::new(value).ok())
            .ok_or_else(|| {
                ValidationError::new(ParcelField::MaxCapacity, ValidationReason::NotAPositiveInteger)
                    .with_value(raw)
            })
    }

    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::new(
                ParcelField::MaxCapacity,
                ValidationReason::NotAPositiveInteger,
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Availability dates; when both ends are present `end >= start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl AvailabilityWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, ValidationError> {
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            return Err(
                ValidationError::new(ParcelField::AvailabilityEnd, ValidationReason::EndBeforeStart)
                    .with_value(end.to_string()),
            );
        }
        Ok(Self { start, end })
    }

    fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_optional_date(start, ParcelField::AvailabilityStart)?;
        let end = parse_optional_date(end, ParcelField::AvailabilityEnd)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }
}

fn parse_optional_date(raw: &str, field: ParcelField) -> Result<Option<NaiveDate>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::new(field, ValidationReason::InvalidDate).with_value(raw))
}

fn optional<T>(
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse(raw).map(Some)
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Parcel form as submitted, before validation.
///
/// Optional fields left blank are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParcelDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub price_per_day: String,
    pub availability_start: String,
    pub availability_end: String,
    pub max_capacity: String,
    pub amenities: ParcelAmenities,
}

impl ParcelDraft {
    /// Parse every field, returning the first failure in form order.
    ///
    /// # Examples
    /// ```
    /// use parcel_market::domain::{ParcelDraft, ParcelField};
    ///
    /// let draft = ParcelDraft {
    ///     title: "Champ Nord".into(),
    ///     latitude: "91".into(),
    ///     price_per_day: "25".into(),
    ///     ..ParcelDraft::default()
    /// };
    /// let err = draft.validate().unwrap_err();
    /// assert_eq!(err.field, ParcelField::Latitude);
    /// assert_eq!(err.value.as_deref(), Some("91"));
    /// ```
    pub fn validate(&self) -> Result<ValidatedParcel, ValidationError> {
        let title = ParcelTitle::new(&self.title)?;
        let latitude = optional(&self.latitude, Latitude::parse)?;
        let longitude = optional(&self.longitude, Longitude::parse)?;
        let price_per_day = PricePerDay::parse(&self.price_per_day)?;
        let availability =
            AvailabilityWindow::parse(&self.availability_start, &self.availability_end)?;
        let max_capacity = optional(&self.max_capacity, Capacity::parse)?;

        Ok(ValidatedParcel {
            title,
            description: non_blank(&self.description),
            location: non_blank(&self.location),
            latitude,
            longitude,
            price_per_day,
            availability,
            max_capacity,
            amenities: self.amenities.clone(),
        })
    }
}

/// Parcel fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParcel {
    pub title: ParcelTitle,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<Latitude>,
    pub longitude: Option<Longitude>,
    pub price_per_day: PricePerDay,
    pub availability: AvailabilityWindow,
    pub max_capacity: Option<Capacity>,
    pub amenities: ParcelAmenities,
}

impl ValidatedParcel {
    /// Attach the owning user, producing an insertable row.
    pub fn owned_by(self, owner_id: UserId) -> NewParcel {
        NewParcel {
            owner_id,
            fields: self,
        }
    }
}

/// Parcel row to insert; `featured_image_id` starts out null.
#[derive(Debug, Clone, PartialEq)]
pub struct NewParcel {
    pub owner_id: UserId,
    pub fields: ValidatedParcel,
}

/// Persisted parcel row.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: ParcelId,
    pub owner_id: UserId,
    pub fields: ValidatedParcel,
    pub featured_image_id: Option<ImageId>,
    pub created_at: DateTime<Utc>,
}

/// Listing row: a parcel joined with its featured image, if linked.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelListing {
    pub parcel: Parcel,
    pub featured_image: Option<FeaturedImage>,
}

/// Compact parcel reference shown on the owner's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelSummary {
    pub id: ParcelId,
    pub title: String,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for submission parsing.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn draft() -> ParcelDraft {
        ParcelDraft {
            title: "Champ Nord".into(),
            description: "...".into(),
            location: "Loire".into(),
            latitude: "48.5".into(),
            longitude: "2.1".into(),
            price_per_day: "25".into(),
            ..ParcelDraft::default()
        }
    }

    #[rstest]
    fn valid_draft_parses_every_field(draft: ParcelDraft) {
        let parcel = draft.validate().expect("valid draft");
        assert_eq!(parcel.title.as_ref(), "Champ Nord");
        assert_eq!(parcel.latitude.map(Latitude::value), Some(48.5));
        assert_eq!(parcel.longitude.map(Longitude::value), Some(2.1));
        assert_eq!(parcel.price_per_day.value(), 25.0);
        assert_eq!(parcel.location.as_deref(), Some("Loire"));
        assert_eq!(parcel.max_capacity, None);
        assert_eq!(parcel.availability, AvailabilityWindow::default());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_titles_are_required(mut draft: ParcelDraft, #[case] title: &str) {
        draft.title = title.into();
        let err = draft.validate().expect_err("blank title");
        assert_eq!(err.field, ParcelField::Title);
        assert_eq!(err.reason, ValidationReason::Required);
    }

    #[rstest]
    fn title_is_trimmed(mut draft: ParcelDraft) {
        draft.title = "  Champ Nord  ".into();
        let parcel = draft.validate().expect("valid draft");
        assert_eq!(parcel.title.as_ref(), "Champ Nord");
    }

    const LATITUDE_RANGE: ValidationReason = ValidationReason::OutOfRange {
        min: -90.0,
        max: 90.0,
    };
    const LONGITUDE_RANGE: ValidationReason = ValidationReason::OutOfRange {
        min: -180.0,
        max: 180.0,
    };

    #[rstest]
    #[case("90.0001", LATITUDE_RANGE)]
    #[case("-90.5", LATITUDE_RANGE)]
    #[case("1000", LATITUDE_RANGE)]
    #[case("north", ValidationReason::NotANumber)]
    #[case("NaN", ValidationReason::NotANumber)]
    #[case("inf", ValidationReason::NotANumber)]
    fn bad_latitude_reports_reason_and_raw_value(
        mut draft: ParcelDraft,
        #[case] raw: &str,
        #[case] reason: ValidationReason,
    ) {
        draft.latitude = raw.into();
        let err = draft.validate().expect_err("bad latitude");
        assert_eq!(err.field, ParcelField::Latitude);
        assert_eq!(err.reason, reason);
        assert_eq!(err.value.as_deref(), Some(raw));
        assert!(err.to_string().contains(raw));
    }

    #[rstest]
    #[case("180.01", LONGITUDE_RANGE)]
    #[case("-181", LONGITUDE_RANGE)]
    #[case("east", ValidationReason::NotANumber)]
    fn bad_longitude_reports_reason(
        mut draft: ParcelDraft,
        #[case] raw: &str,
        #[case] reason: ValidationReason,
    ) {
        draft.longitude = raw.into();
        let err = draft.validate().expect_err("bad longitude");
        assert_eq!(err.field, ParcelField::Longitude);
        assert_eq!(err.reason, reason);
    }

    #[rstest]
    #[case("-90", "-180")]
    #[case("90", "180")]
    #[case("", "")]
    fn boundary_and_blank_coordinates_are_accepted(
        mut draft: ParcelDraft,
        #[case] lat: &str,
        #[case] lng: &str,
    ) {
        draft.latitude = lat.into();
        draft.longitude = lng.into();
        assert!(draft.validate().is_ok());
    }

    #[rstest]
    #[case("", ValidationReason::Required)]
    #[case("cheap", ValidationReason::NotANumber)]
    #[case("-1", ValidationReason::Negative)]
    fn price_must_be_a_non_negative_number(
        mut draft: ParcelDraft,
        #[case] raw: &str,
        #[case] expected: ValidationReason,
    ) {
        draft.price_per_day = raw.into();
        let err = draft.validate().expect_err("bad price");
        assert_eq!(err.field, ParcelField::PricePerDay);
        assert_eq!(err.reason, expected);
    }

    #[rstest]
    fn availability_end_must_not_precede_start(mut draft: ParcelDraft) {
        draft.availability_start = "2024-06-10".into();
        draft.availability_end = "2024-06-01".into();
        let err = draft.validate().expect_err("inverted window");
        assert_eq!(err.field, ParcelField::AvailabilityEnd);
        assert_eq!(err.reason, ValidationReason::EndBeforeStart);
    }

    #[rstest]
    fn availability_dates_must_be_iso(mut draft: ParcelDraft) {
        draft.availability_start = "10/06/2024".into();
        let err = draft.validate().expect_err("bad date");
        assert_eq!(err.field, ParcelField::AvailabilityStart);
        assert_eq!(err.reason, ValidationReason::InvalidDate);
    }

    #[rstest]
    #[case("0")]
    #[case("-2")]
    #[case("2.5")]
    fn capacity_must_be_positive_integer(mut draft: ParcelDraft, #[case] raw: &str) {
        draft.max_capacity = raw.into();
        let err = draft.validate().expect_err("bad capacity");
        assert_eq!(err.field, ParcelField::MaxCapacity);
    }

    #[rstest]
    fn first_failure_wins(mut draft: ParcelDraft) {
        draft.title = " ".into();
        draft.latitude = "999".into();
        let err = draft.validate().expect_err("invalid");
        assert_eq!(err.field, ParcelField::Title);
    }
}
