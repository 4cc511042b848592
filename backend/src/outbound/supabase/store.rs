//! Reqwest-backed repositories over the hosted REST tables.
//!
//! `utilisateurs` mirrors auth identities, `terrains` holds parcels and
//! `images` holds uploaded pictures. Listing uses exact counts and `Range`
//! headers so one request yields both the window and the total.

use std::time::Duration;

use async_trait::async_trait;
use pagination::Page;
use reqwest::header::{ACCEPT, CONTENT_RANGE, HeaderMap, RANGE};
use reqwest::{Method, StatusCode, Url};
use tracing::debug;

use super::dto::{
    FeaturedImageLinkDto, ImageInsertDto, ImageRowDto, ParcelInsertDto, ParcelRowDto,
    ParcelSummaryDto, UserRowDto,
};
use super::http::{CallError, SupabaseHttp};
use crate::domain::ports::{
    ImageRepository, ImageRepositoryError, ParcelRepository, ParcelRepositoryError,
    UserRepository, UserRepositoryError,
};
use crate::domain::{
    Image, ImageId, NewImage, NewParcel, Parcel, ParcelId, ParcelListQuery, ParcelListing,
    ParcelSummary, SortDirection, SortField, UserId, UserRecord,
};

const USERS: &str = "rest/v1/utilisateurs";
const PARCELS: &str = "rest/v1/terrains";
const IMAGES: &str = "rest/v1/images";
const LISTING_SELECT: &str = "*,image_mise_en_avant:images!terrains_image_mise_en_avant_id_fkey(id,url,legende)";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const NO_ROWS: &str = "PGRST116";
const UNIQUE_VIOLATION: &str = "23505";

/// Table repositories authenticated with the service key.
pub struct SupabaseStore {
    http: SupabaseHttp,
}

impl SupabaseStore {
    /// Build a store for the project at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: SupabaseHttp::new(base, service_key, timeout)?,
        })
    }

    fn table(&self, path: &str, query: &[(&str, String)]) -> Result<Url, CallError> {
        let mut url = self.http.endpoint(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }

    async fn insert_returning<B, T>(&self, path: &str, body: &B) -> Result<T, CallError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = self.table(path, &[])?;
        let request = self
            .http
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        self.http.send(request).await?.json()
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn order_clause(field: SortField, direction: SortDirection) -> String {
    let column = match field {
        SortField::PricePerDay => "prix_par_jour",
        SortField::MaxCapacity => "capacite_max",
        SortField::CreatedAt => "date_creation",
    };
    format!("{column}.{}.nullslast", direction.as_str())
}

fn listing_params(query: &ParcelListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", LISTING_SELECT.to_owned())];
    if let Some(max_price) = query.filters.max_price() {
        params.push(("prix_par_jour", format!("lte.{max_price}")));
    }
    if let Some(min_capacity) = query.filters.min_capacity() {
        params.push(("capacite_max", format!("gte.{min_capacity}")));
    }
    params.push(("order", order_clause(query.sort.field, query.sort.direction)));
    params
}

/// Total row count from a `Content-Range` header such as `0-5/13` or `*/13`.
fn total_from_content_range(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit_once('/')?
        .1
        .parse()
        .ok()
}

fn user_error(err: CallError) -> UserRepositoryError {
    match err {
        CallError::Timeout(_) | CallError::Transport(_) => {
            UserRepositoryError::connection(err.to_string())
        }
        CallError::Status(failure) if failure.has_code(&[NO_ROWS]) => {
            UserRepositoryError::not_found()
        }
        CallError::Status(failure) if failure.has_code(&[UNIQUE_VIOLATION]) => {
            UserRepositoryError::conflict()
        }
        other => UserRepositoryError::query(other.to_string()),
    }
}

fn parcel_error(err: CallError) -> ParcelRepositoryError {
    match err {
        CallError::Timeout(_) | CallError::Transport(_) => {
            ParcelRepositoryError::connection(err.to_string())
        }
        other => ParcelRepositoryError::query(other.to_string()),
    }
}

fn image_error(err: CallError) -> ImageRepositoryError {
    match err {
        CallError::Timeout(_) | CallError::Transport(_) => {
            ImageRepositoryError::connection(err.to_string())
        }
        other => ImageRepositoryError::query(other.to_string()),
    }
}

#[async_trait]
impl UserRepository for SupabaseStore {
    async fn find_by_id(&self, id: &UserId) -> Result<UserRecord, UserRepositoryError> {
        let url = self
            .table(USERS, &[("select", "id,email".to_owned()), ("id", eq(id))])
            .map_err(user_error)?;
        let request = self.http.request(Method::GET, url).header(ACCEPT, SINGLE_OBJECT);
        let row: UserRowDto = self
            .http
            .send(request)
            .await
            .and_then(|reply| reply.json())
            .map_err(user_error)?;
        row.into_domain().map_err(UserRepositoryError::query)
    }

    async fn insert(&self, record: &UserRecord) -> Result<UserRecord, UserRepositoryError> {
        let row: UserRowDto = self
            .insert_returning(USERS, &UserRowDto::from_domain(record))
            .await
            .map_err(user_error)?;
        row.into_domain().map_err(UserRepositoryError::query)
    }
}

#[async_trait]
impl ParcelRepository for SupabaseStore {
    async fn insert(&self, parcel: &NewParcel) -> Result<Parcel, ParcelRepositoryError> {
        let row: ParcelRowDto = self
            .insert_returning(PARCELS, &ParcelInsertDto::from_domain(parcel))
            .await
            .map_err(parcel_error)?;
        row.into_parcel().map_err(ParcelRepositoryError::query)
    }

    async fn set_featured_image(
        &self,
        parcel_id: &ParcelId,
        image_id: &ImageId,
    ) -> Result<(), ParcelRepositoryError> {
        let url = self
            .table(PARCELS, &[("id", eq(parcel_id))])
            .map_err(parcel_error)?;
        let body = FeaturedImageLinkDto {
            image_mise_en_avant_id: *image_id.as_uuid(),
        };
        let request = self
            .http
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&body);
        let rows: Vec<serde_json::Value> = self
            .http
            .send(request)
            .await
            .and_then(|reply| reply.json())
            .map_err(parcel_error)?;
        if rows.is_empty() {
            return Err(ParcelRepositoryError::not_found(parcel_id.to_string()));
        }
        Ok(())
    }

    async fn list(
        &self,
        query: &ParcelListQuery,
    ) -> Result<Page<ParcelListing>, ParcelRepositoryError> {
        let url = self
            .table(PARCELS, &listing_params(query))
            .map_err(parcel_error)?;
        let window = query.page.window();
        let request = self
            .http
            .request(Method::GET, url)
            .header("Prefer", "count=exact")
            .header("Range-Unit", "items")
            .header(RANGE, format!("{}-{}", window.offset(), window.last_index()));
        let reply = self
            .http
            .send_allowing(request, &[StatusCode::RANGE_NOT_SATISFIABLE])
            .await
            .map_err(parcel_error)?;
        let total = total_from_content_range(&reply.headers);
        // A window past the last row answers 416 but still reports the total.
        let rows: Vec<ParcelRowDto> = if reply.status == StatusCode::RANGE_NOT_SATISFIABLE {
            debug!(page = query.page.page(), "listing window past the end");
            Vec::new()
        } else {
            reply.json().map_err(parcel_error)?
        };
        let items = rows
            .into_iter()
            .map(ParcelRowDto::into_listing)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ParcelRepositoryError::query)?;
        let total = total.unwrap_or(items.len() as u64);
        Ok(Page::new(items, total, query.page))
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ParcelSummary>, ParcelRepositoryError> {
        let url = self
            .table(
                PARCELS,
                &[
                    ("select", "id,titre".to_owned()),
                    ("proprietaire_id", eq(owner)),
                    ("order", "date_creation.desc".to_owned()),
                ],
            )
            .map_err(parcel_error)?;
        let rows: Vec<ParcelSummaryDto> = self
            .http
            .send(self.http.request(Method::GET, url))
            .await
            .and_then(|reply| reply.json())
            .map_err(parcel_error)?;
        Ok(rows.into_iter().map(ParcelSummary::from).collect())
    }
}

#[async_trait]
impl ImageRepository for SupabaseStore {
    async fn insert(&self, image: &NewImage) -> Result<Image, ImageRepositoryError> {
        let row: ImageRowDto = self
            .insert_returning(IMAGES, &ImageInsertDto::from_domain(image))
            .await
            .map_err(image_error)?;
        Ok(Image::from(row))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for query building and error mapping.

    use super::*;
    use crate::domain::{ListingParams, ParcelListQuery};
    use crate::outbound::supabase::http::map_status_error;
    use reqwest::header::HeaderValue;
    use rstest::rstest;

    fn query(params: ListingParams) -> ParcelListQuery {
        ParcelListQuery::try_from_params(params).expect("valid params")
    }

    #[rstest]
    fn listing_params_carry_filters_and_order() {
        let params = listing_params(&query(ListingParams {
            max_price: Some(40.0),
            min_capacity: Some(4),
            sort_by: Some("price_per_day".into()),
            sort_direction: Some("asc".into()),
            ..ListingParams::default()
        }));
        assert!(params.contains(&("prix_par_jour", "lte.40".to_owned())));
        assert!(params.contains(&("capacite_max", "gte.4".to_owned())));
        assert!(params.contains(&("order", "prix_par_jour.asc.nullslast".to_owned())));
        assert_eq!(params.first().map(|(key, _)| *key), Some("select"));
    }

    #[rstest]
    fn default_listing_is_newest_first_without_filters() {
        let params = listing_params(&query(ListingParams::default()));
        assert_eq!(params.len(), 2);
        assert!(params.contains(&("order", "date_creation.desc.nullslast".to_owned())));
    }

    #[rstest]
    #[case("0-5/13", Some(13))]
    #[case("*/0", Some(0))]
    #[case("12-12/*", None)]
    fn content_range_totals(#[case] raw: &str, #[case] expected: Option<u64>) {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_RANGE, HeaderValue::from_str(raw).expect("header"));
        assert_eq!(total_from_content_range(&headers), expected);
    }

    #[rstest]
    fn unique_violation_on_insert_is_a_conflict() {
        let failure = map_status_error(
            StatusCode::CONFLICT,
            br#"{"code":"23505","message":"duplicate key value violates unique constraint \"utilisateurs_pkey\""}"#,
        );
        assert_eq!(
            user_error(CallError::Status(failure)),
            UserRepositoryError::Conflict
        );
    }

    #[rstest]
    fn missing_single_row_is_not_found() {
        let failure = map_status_error(
            StatusCode::NOT_ACCEPTABLE,
            br#"{"code":"PGRST116","message":"The result contains 0 rows"}"#,
        );
        assert!(matches!(
            user_error(CallError::Status(failure)),
            UserRepositoryError::NotFound
        ));
    }

    #[rstest]
    #[case(CallError::Timeout("slow".into()), true)]
    #[case(CallError::Decode("bad json".into()), false)]
    fn parcel_errors_distinguish_connectivity(#[case] err: CallError, #[case] connection: bool) {
        let mapped = parcel_error(err);
        assert_eq!(
            matches!(mapped, ParcelRepositoryError::Connection { .. }),
            connection
        );
    }
}
