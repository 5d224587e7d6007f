use axum::Extension;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::analytics;
use crate::config::AnalyticsSettings;
use crate::database::PgPool;
use crate::extract::Query;
use crate::problem::{InvalidParameterReason, InvalidParameters, Problem};
use crate::response::{Response, ResponseBuilder};
use crate::utils::datetime::parse_date_or_datetime;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AveragesQuery {
    subject_id: Option<String>,
    reference: Option<String>,
}

impl AveragesQuery {
    /// The instant to compute the windows from. The query parameter wins over the configured
    /// reference.
    fn reference(&self, settings: &AnalyticsSettings) -> Result<NaiveDateTime, Problem> {
        match &self.reference {
            Some(reference) => parse_date_or_datetime(reference).ok_or_else(|| {
                let mut invalid_parameters = InvalidParameters::new();
                invalid_parameters.add("reference", InvalidParameterReason::MustBeDateOrDateTime);
                invalid_parameters.into()
            }),
            None => Ok(settings.reference()),
        }
    }
}

/// Handles the `GET /analytics/glucose-averages?subject_id=subjectId&reference=reference` route.
pub async fn glucose_averages(
    Extension(pg): Extension<PgPool>,
    Extension(settings): Extension<AnalyticsSettings>,
    Query(query): Query<AveragesQuery>,
) -> Result<Response, Problem> {
    let reference = query.reference(&settings)?;
    tracing::trace!(
        "Computing glucose averages for reference {} and subject {:?}",
        reference,
        query.subject_id
    );

    let conn = pg.get().await?;
    let averages = conn
        .interact_flatten_err(move |conn| {
            analytics::glucose_averages(conn, reference, query.subject_id.as_deref())
        })
        .await?;

    Ok(ResponseBuilder::ok().body(averages))
}
