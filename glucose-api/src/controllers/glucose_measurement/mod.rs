use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::cursors;
use crate::database::PgPool;
use crate::extract::{Json, Path, Query};
use crate::helpers;
use crate::models::{self, GlucoseMeasurementId};
use crate::problem::Problem;
use crate::response::{Response, ResponseBuilder};
use crate::views;
use axum::Extension;

/// Timestamps are the subject's wall-clock time in an unknown zone, so "the future" starts at the
/// current UTC time plus the largest civil UTC offset.
const MAX_UTC_OFFSET_HOURS: i64 = 14;

/// The writable fields of a measurement, as sent by clients.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct GlucoseMeasurementParams {
    #[serde(default, alias = "user_id")]
    #[validate(length(min = 1, max = 255))]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub value: Option<i32>,
    #[serde(default, deserialize_with = "crate::utils::datetime::deserialize_optional")]
    #[validate(custom = "not_in_future")]
    pub tested_at: Option<NaiveDateTime>,
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub tz_offset: Option<String>,
}

impl GlucoseMeasurementParams {
    /// A new measurement; every field is required.
    pub fn into_new(self) -> Result<models::NewGlucoseMeasurement, ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let required = [
            ("subject_id", self.subject_id.is_none()),
            ("value", self.value.is_none()),
            ("tested_at", self.tested_at.is_none()),
            ("tz_offset", self.tz_offset.is_none()),
        ];
        for (field, missing) in required.iter() {
            if *missing {
                errors.add(*field, ValidationError::new("required"));
            }
        }

        match (self.subject_id, self.value, self.tested_at, self.tz_offset) {
            (Some(subject_id), Some(value), Some(tested_at), Some(tz_offset))
                if errors.errors().is_empty() =>
            {
                Ok(models::NewGlucoseMeasurement {
                    subject_id,
                    value,
                    tested_at,
                    tz_offset,
                })
            }
            _ => Err(errors),
        }
    }

    /// A partial update; absent fields are left unchanged.
    pub fn into_update(
        self,
        id: GlucoseMeasurementId,
    ) -> Result<models::UpdateGlucoseMeasurement, ValidationErrors> {
        self.validate()?;

        let mut update = models::UpdateGlucoseMeasurement::unchanged_for_id(id);
        update.subject_id = self.subject_id;
        update.value = self.value;
        update.tested_at = self.tested_at;
        update.tz_offset = self.tz_offset;
        Ok(update)
    }
}

fn not_in_future(tested_at: &NaiveDateTime) -> Result<(), ValidationError> {
    let latest = Utc::now().naive_utc() + Duration::hours(MAX_UTC_OFFSET_HOURS);
    if *tested_at > latest {
        Err(ValidationError::new("not_in_future"))
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListQuery {
    subject_id: Option<String>,
    cursor: Option<String>,
}

/// The URI of the page after `page`, if `page` is full.
fn next_page_uri(query: &ListQuery, page: &[models::GlucoseMeasurement]) -> Option<String> {
    let next_cursor = cursors::GlucoseMeasurements::next_from_page(page)?;
    let out_query = ListQuery {
        subject_id: query.subject_id.clone(),
        cursor: Some(next_cursor.into()),
    };

    match serde_urlencoded::to_string(&out_query) {
        Ok(query_string) => Some(format!("/glucose-measurements?{}", query_string)),
        Err(err) => {
            tracing::warn!("Could not encode next page query: {}", err);
            None
        }
    }
}

/// Handles the `GET /glucose-measurements/?subject_id=subjectId&cursor=cursor` route.
pub async fn glucose_measurements(
    Extension(pg): Extension<PgPool>,
    Query(query): Query<ListQuery>,
) -> Result<Response, Problem> {
    let cursor: Option<cursors::GlucoseMeasurements> =
        query.cursor.as_ref().map(|s| s.parse()).transpose()?;
    let subject_id = query.subject_id.clone();

    let conn = pg.get().await?;
    let glucose_measurements = conn
        .interact_flatten_err(move |conn| {
            models::GlucoseMeasurement::page(conn, subject_id.as_deref(), cursor)
        })
        .await?;

    let mut response = ResponseBuilder::ok();
    if let Some(next_page_uri) = next_page_uri(&query, &glucose_measurements) {
        response = response.link(&next_page_uri, "next");
    }

    let body = glucose_measurements
        .into_iter()
        .map(views::GlucoseMeasurement::from)
        .collect::<Vec<_>>();
    Ok(response.body(body))
}

/// Handles the `GET /glucose-measurements/{id}` route.
pub async fn glucose_measurement_by_id(
    Extension(pg): Extension<PgPool>,
    Path(id): Path<i32>,
) -> Result<Response, Problem> {
    let conn = pg.get().await?;
    let glucose_measurement = conn
        .interact_flatten_err(move |conn| {
            models::GlucoseMeasurement::by_id(conn, GlucoseMeasurementId(id))
        })
        .await?;
    let glucose_measurement = helpers::some_or_not_found(glucose_measurement)?;

    Ok(ResponseBuilder::ok().body(views::GlucoseMeasurement::from(glucose_measurement)))
}

/// Handles the `POST /glucose-measurements` route.
pub async fn create_glucose_measurement(
    Extension(pg): Extension<PgPool>,
    Json(params): Json<GlucoseMeasurementParams>,
) -> Result<Response, Problem> {
    let new_glucose_measurement = params.into_new()?;

    let conn = pg.get().await?;
    let created = conn
        .interact_flatten_err(move |conn| new_glucose_measurement.create(conn))
        .await?;
    tracing::debug!(
        "Created glucose measurement {} of subject \"{}\"",
        created.id,
        created.subject_id
    );

    Ok(ResponseBuilder::created()
        .content_uri(format!("/glucose-measurements/{}", created.id))
        .body(views::GlucoseMeasurement::from(created)))
}

/// Handles the `PUT /glucose-measurements/{id}` and `PATCH /glucose-measurements/{id}` routes.
pub async fn update_glucose_measurement(
    Extension(pg): Extension<PgPool>,
    Path(id): Path<i32>,
    Json(params): Json<GlucoseMeasurementParams>,
) -> Result<Response, Problem> {
    let update_glucose_measurement = params.into_update(GlucoseMeasurementId(id))?;

    let conn = pg.get().await?;
    let updated = conn
        .interact_flatten_err(move |conn| update_glucose_measurement.update(conn))
        .await?;
    tracing::debug!("Updated glucose measurement {}", updated.id);

    Ok(ResponseBuilder::ok().body(views::GlucoseMeasurement::from(updated)))
}

/// Handles the `DELETE /glucose-measurements/{id}` route.
pub async fn delete_glucose_measurement(
    Extension(pg): Extension<PgPool>,
    Path(id): Path<i32>,
) -> Result<Response, Problem> {
    let conn = pg.get().await?;
    let deleted = conn
        .interact_flatten_err(move |conn| {
            models::GlucoseMeasurement::delete(conn, GlucoseMeasurementId(id))
        })
        .await?;

    if !deleted {
        return Err(crate::problem::NOT_FOUND);
    }
    tracing::debug!("Deleted glucose measurement {}", id);

    Ok(ResponseBuilder::no_content().empty())
}

#[cfg(test)]
mod test {
    use super::{next_page_uri, GlucoseMeasurementId, GlucoseMeasurementParams, ListQuery};
    use crate::cursors::GlucoseMeasurements;
    use crate::models;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use validator::ValidationErrors;

    fn complete() -> GlucoseMeasurementParams {
        GlucoseMeasurementParams {
            subject_id: Some("user-1".to_owned()),
            value: Some(112),
            tested_at: NaiveDate::from_ymd_opt(2024, 4, 24)
                .unwrap()
                .and_hms_opt(8, 30, 0),
            tz_offset: Some("America/Los_Angeles".to_owned()),
        }
    }

    #[test]
    fn accept_complete_measurement() {
        let new = complete().into_new().unwrap();
        assert_eq!(new.subject_id, "user-1");
        assert_eq!(new.value, 112);
        assert_eq!(new.tz_offset, "America/Los_Angeles");
    }

    #[test]
    fn no_domain_bounds_on_value() {
        let mut params = complete();
        params.value = Some(-5);
        assert!(params.into_new().is_ok());
    }

    #[test]
    fn reject_missing_fields() {
        let result = GlucoseMeasurementParams::default().into_new().map(|_| ());
        for field in &["subject_id", "value", "tested_at", "tz_offset"] {
            assert!(ValidationErrors::has_error(&result, *field), "{}", field);
        }
    }

    #[test]
    fn reject_empty_subject_and_time_zone() {
        let mut params = complete();
        params.subject_id = Some("".to_owned());
        params.tz_offset = Some("".to_owned());
        let result = params.into_new().map(|_| ());
        assert!(ValidationErrors::has_error(&result, "subject_id"));
        assert!(ValidationErrors::has_error(&result, "tz_offset"));
        assert!(!ValidationErrors::has_error(&result, "value"));
    }

    #[test]
    fn reject_long_time_zone() {
        let mut params = complete();
        params.tz_offset = Some("a".repeat(65));
        let result = params.into_new().map(|_| ());
        assert!(ValidationErrors::has_error(&result, "tz_offset"));
    }

    #[test]
    fn reject_future_tested_at() {
        let mut params = complete();
        params.tested_at = Some(Utc::now().naive_utc() + Duration::days(2));
        let result = params.into_new().map(|_| ());
        assert!(ValidationErrors::has_error(&result, "tested_at"));

        // Local time ahead of UTC is not the future.
        let mut params = complete();
        params.tested_at = Some(Utc::now().naive_utc() + Duration::hours(10));
        assert!(params.into_new().is_ok());
    }

    #[test]
    fn updates_are_partial() {
        let params = GlucoseMeasurementParams {
            value: Some(140),
            ..Default::default()
        };
        let update = params.into_update(GlucoseMeasurementId(7)).unwrap();
        assert_eq!(update.id, 7);
        assert_eq!(update.value, Some(140));
        assert_eq!(update.subject_id, None);
        assert_eq!(update.tested_at, None);
        assert_eq!(update.tz_offset, None);
    }

    #[test]
    fn updates_are_validated() {
        let params = GlucoseMeasurementParams {
            subject_id: Some("".to_owned()),
            ..Default::default()
        };
        let result = params.into_update(GlucoseMeasurementId(7)).map(|_| ());
        assert!(ValidationErrors::has_error(&result, "subject_id"));
        assert!(!ValidationErrors::has_error(&result, "value"));
    }

    #[test]
    fn accepts_the_legacy_user_id_field() {
        let params: GlucoseMeasurementParams = serde_json::from_str(
            r#"{"user_id": "user-1", "value": 95, "tested_at": "2024-04-24T08:30", "tz_offset": "-07:00", "id": 3}"#,
        )
        .unwrap();
        let new = params.into_new().unwrap();
        assert_eq!(new.subject_id, "user-1");
        assert_eq!(new.value, 95);
    }

    fn measurements(count: usize) -> Vec<models::GlucoseMeasurement> {
        let tested_at = NaiveDate::from_ymd_opt(2024, 4, 24)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let updated_at = Utc.from_utc_datetime(&tested_at);

        (0..count)
            .map(|i| models::GlucoseMeasurement {
                id: 500 - i as i32,
                subject_id: "user-1".to_owned(),
                value: 100,
                tested_at,
                tz_offset: "Z".to_owned(),
                created_at: updated_at,
                updated_at,
            })
            .collect()
    }

    #[test]
    fn full_page_links_to_the_next_page() {
        let query = ListQuery {
            subject_id: Some("user-1".to_owned()),
            cursor: None,
        };
        let page = measurements(GlucoseMeasurements::PER_PAGE);
        let last = page.last().unwrap();

        let uri = next_page_uri(&query, &page).unwrap();
        let (path, query_string) = uri.split_once('?').unwrap();
        assert_eq!(path, "/glucose-measurements");

        let next: ListQuery = serde_urlencoded::from_str(query_string).unwrap();
        assert_eq!(next.subject_id.as_deref(), Some("user-1"));
        let cursor: GlucoseMeasurements = next.cursor.unwrap().parse().unwrap();
        assert_eq!(cursor, GlucoseMeasurements(last.updated_at, last.id));
    }

    #[test]
    fn partial_page_has_no_next_page() {
        let query = ListQuery {
            subject_id: None,
            cursor: None,
        };
        let page = measurements(GlucoseMeasurements::PER_PAGE - 1);
        assert_eq!(next_page_uri(&query, &page), None);
    }
}
