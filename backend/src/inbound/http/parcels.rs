//! Parcel HTTP handlers.
//!
//! ```text
//! POST /api/v1/parcels
//! GET  /api/v1/parcels?page=&pageSize=&maxPrice=&minCapacity=&sortBy=&sortDirection=
//! ```
//!
//! Submissions answer with a `{success, message, ...}` body on success and on
//! every workflow failure, undecodable images included, so form clients can
//! show the message inline. Only malformed JSON uses the shared error
//! envelope.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use pagination::PageLinks;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{ImageFile, ParcelSubmitted, SubmitParcelRequest};
use crate::domain::{
    Error, FeaturedImage, ListingParams, ListingQueryError, MarketplaceError, ParcelAmenities,
    ParcelDraft, ParcelField, ParcelListQuery, ParcelListing, SessionHandle, ValidationError,
    ValidationReason,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::status_for;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Form value sent either as a JSON string or a JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RawField {
    Text(String),
    Number(f64),
}

impl RawField {
    fn into_text(field: Option<Self>) -> String {
        match field {
            Some(Self::Text(text)) => text,
            Some(Self::Number(number)) => number.to_string(),
            None => String::new(),
        }
    }
}

/// Image attached to a submission, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: String,
    /// Base64 bytes; a `data:<type>;base64,` prefix is accepted.
    pub data: String,
}

impl ImagePayload {
    fn decode(self) -> Result<ImageFile, ValidationError> {
        let encoded = match self.data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ValidationError::new(ParcelField::Image, ValidationReason::NotBase64))?;
        Ok(ImageFile {
            file_name: self.file_name,
            content_type: self.content_type,
            bytes,
        })
    }
}

/// Parcel submission form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ParcelPayload {
    pub title: Option<RawField>,
    pub description: Option<RawField>,
    pub location: Option<RawField>,
    pub latitude: Option<RawField>,
    pub longitude: Option<RawField>,
    pub price_per_day: Option<RawField>,
    /// ISO date, `YYYY-MM-DD`.
    pub availability_start: Option<RawField>,
    /// ISO date, `YYYY-MM-DD`.
    pub availability_end: Option<RawField>,
    pub max_capacity: Option<RawField>,
    pub amenities: ParcelAmenities,
    pub image: Option<ImagePayload>,
}

impl ParcelPayload {
    fn into_request(self) -> Result<SubmitParcelRequest, ValidationError> {
        let image = self.image.map(ImagePayload::decode).transpose()?;
        Ok(SubmitParcelRequest {
            draft: ParcelDraft {
                title: RawField::into_text(self.title),
                description: RawField::into_text(self.description),
                location: RawField::into_text(self.location),
                latitude: RawField::into_text(self.latitude),
                longitude: RawField::into_text(self.longitude),
                price_per_day: RawField::into_text(self.price_per_day),
                availability_start: RawField::into_text(self.availability_start),
                availability_end: RawField::into_text(self.availability_end),
                max_capacity: RawField::into_text(self.max_capacity),
                amenities: self.amenities,
            },
            image,
        })
    }
}

/// Outcome of a submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Set when the parcel was saved but its image could not be linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Failure kind such as `validation_error` or `image_upload_failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<ParcelSubmitted> for SubmissionResponse {
    fn from(submitted: ParcelSubmitted) -> Self {
        Self {
            success: true,
            message: "created".to_owned(),
            parcel_id: Some(submitted.parcel_id.to_string()),
            image_url: submitted.image_url,
            warning: submitted.link_warning,
            code: None,
            details: None,
        }
    }
}

fn failure_response(err: MarketplaceError) -> HttpResponse {
    let message = err.to_string();
    let code = err.kind().to_owned();
    let envelope = Error::from(err);
    HttpResponse::build(status_for(envelope.code())).json(SubmissionResponse {
        success: false,
        message,
        parcel_id: None,
        image_url: None,
        warning: None,
        code: Some(code),
        details: envelope.details().cloned(),
    })
}

/// Publish a parcel owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/parcels",
    request_body = ParcelPayload,
    responses(
        (status = 201, description = "Parcel created", body = SubmissionResponse),
        (status = 400, description = "Invalid field or image", body = SubmissionResponse),
        (status = 401, description = "No active session", body = SubmissionResponse),
        (status = 503, description = "Upload or persistence failed", body = SubmissionResponse)
    ),
    tags = ["parcels"],
    operation_id = "submitParcel"
)]
#[post("/parcels")]
pub async fn submit_parcel(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ParcelPayload>,
) -> HttpResponse {
    let Some(handle) = submission_session(&session) else {
        return failure_response(MarketplaceError::Unauthenticated);
    };
    let request = match payload.into_inner().into_request() {
        Ok(request) => request,
        Err(err) => return failure_response(err.into()),
    };
    match state.submission.submit(Some(&handle), request).await {
        Ok(submitted) => HttpResponse::Created().json(SubmissionResponse::from(submitted)),
        Err(err) => failure_response(err),
    }
}

/// Session credentials for a submission; an unreadable cookie counts as none.
fn submission_session(session: &SessionContext) -> Option<SessionHandle> {
    session.handle().unwrap_or_else(|err| {
        warn!(error = %err, "unreadable session cookie on submission");
        None
    })
}

/// Listing query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParcelsQuery {
    /// One-based page number; defaults to 1.
    pub page: Option<u32>,
    /// Items per page, 1 to 100; defaults to 6.
    pub page_size: Option<u32>,
    /// Inclusive upper bound on the daily price.
    pub max_price: Option<f64>,
    /// Inclusive lower bound on the capacity.
    pub min_capacity: Option<u32>,
    /// `price_per_day`, `max_capacity` or `created_at`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`; defaults to `desc`.
    pub sort_direction: Option<String>,
}

impl From<ListParcelsQuery> for ListingParams {
    fn from(query: ListParcelsQuery) -> Self {
        Self {
            page: query.page,
            page_size: query.page_size,
            max_price: query.max_price,
            min_capacity: query.min_capacity,
            sort_by: query.sort_by,
            sort_direction: query.sort_direction,
        }
    }
}

fn map_listing_query_error(err: ListingQueryError) -> Error {
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": err.field(), "code": "invalid_parameter" }))
}

/// Featured image shown on a listing card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeaturedImageResponse {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl From<FeaturedImage> for FeaturedImageResponse {
    fn from(image: FeaturedImage) -> Self {
        Self {
            id: image.id.to_string(),
            url: image.url,
            caption: image.caption,
        }
    }
}

/// Listing card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParcelResponse {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price_per_day: f64,
    pub availability_start: Option<NaiveDate>,
    pub availability_end: Option<NaiveDate>,
    pub max_capacity: Option<u32>,
    pub amenities: ParcelAmenities,
    pub created_at: DateTime<Utc>,
    pub featured_image: Option<FeaturedImageResponse>,
}

impl From<ParcelListing> for ParcelResponse {
    fn from(listing: ParcelListing) -> Self {
        let ParcelListing {
            parcel,
            featured_image,
        } = listing;
        let fields = parcel.fields;
        Self {
            id: parcel.id.to_string(),
            owner_id: parcel.owner_id.to_string(),
            title: fields.title.into(),
            description: fields.description,
            location: fields.location,
            latitude: fields.latitude.map(|lat| lat.value()),
            longitude: fields.longitude.map(|lng| lng.value()),
            price_per_day: fields.price_per_day.value(),
            availability_start: fields.availability.start(),
            availability_end: fields.availability.end(),
            max_capacity: fields.max_capacity.map(|capacity| capacity.value()),
            amenities: fields.amenities,
            created_at: parcel.created_at,
            featured_image: featured_image.map(FeaturedImageResponse::from),
        }
    }
}

/// One page of listing cards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParcelListResponse {
    pub items: Vec<ParcelResponse>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    /// `self`, `next` and `prev` URLs.
    #[schema(value_type = Object)]
    pub links: PageLinks,
}

/// Browse published parcels.
#[utoipa::path(
    get,
    path = "/api/v1/parcels",
    params(ListParcelsQuery),
    responses(
        (status = 200, description = "Parcels", body = ParcelListResponse),
        (status = 400, description = "Invalid query parameter", body = ErrorSchema),
        (status = 503, description = "Listing unavailable", body = ErrorSchema)
    ),
    tags = ["parcels"],
    operation_id = "listParcels",
    security([])
)]
#[get("/parcels")]
pub async fn list_parcels(
    req: HttpRequest,
    state: web::Data<HttpState>,
    query: web::Query<ListParcelsQuery>,
) -> ApiResult<web::Json<ParcelListResponse>> {
    let query = ParcelListQuery::try_from_params(query.into_inner().into())
        .map_err(map_listing_query_error)?;
    let page = state.parcels.list_parcels(&query).await?;
    let links = PageLinks::for_page(&req.full_url(), &page);
    let envelope = page.map(ParcelResponse::from).into_envelope();
    Ok(web::Json(ParcelListResponse {
        items: envelope.items,
        total_count: envelope.total_count,
        page: envelope.page,
        page_size: envelope.page_size,
        total_pages: envelope.total_pages,
        links,
    }))
}
