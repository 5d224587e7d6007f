use crate::analytics::{Reading, ReadingSource, Window};
use crate::cursors;
use crate::schema::glucose_measurements;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::{Identifiable, QueryResult, Queryable, Selectable};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlucoseMeasurementId(pub i32);

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = glucose_measurements)]
pub struct GlucoseMeasurement {
    pub id: i32,
    pub subject_id: String,
    pub value: i32,
    pub tested_at: NaiveDateTime,
    pub tz_offset: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GlucoseMeasurement {
    pub fn by_id(conn: &mut PgConnection, id: GlucoseMeasurementId) -> QueryResult<Option<Self>> {
        glucose_measurements::table
            .find(id.0)
            .select(GlucoseMeasurement::as_select())
            .first(conn)
            .optional()
    }

    /// A page of measurements, most recently updated first.
    pub fn page(
        conn: &mut PgConnection,
        subject_id: Option<&str>,
        cursor: Option<cursors::GlucoseMeasurements>,
    ) -> QueryResult<Vec<Self>> {
        let mut query = glucose_measurements::table
            .select(GlucoseMeasurement::as_select())
            .into_boxed();

        if let Some(subject_id) = subject_id {
            query = query.filter(glucose_measurements::columns::subject_id.eq(subject_id));
        }

        if let Some(cursors::GlucoseMeasurements(updated_at, id)) = cursor {
            query = query.filter(
                glucose_measurements::columns::updated_at
                    .lt(updated_at)
                    .or(glucose_measurements::columns::updated_at
                        .eq(updated_at)
                        .and(glucose_measurements::columns::id.lt(id))),
            );
        }

        query
            .order((
                glucose_measurements::dsl::updated_at.desc(),
                glucose_measurements::dsl::id.desc(),
            ))
            .limit(cursors::GlucoseMeasurements::PER_PAGE as i64)
            .load(conn)
    }

    /// The value and time of every measurement in the window, optionally of a single subject.
    pub fn readings_in(
        conn: &mut PgConnection,
        window: &Window,
        subject_id: Option<&str>,
    ) -> QueryResult<Vec<Reading>> {
        let mut query = glucose_measurements::table
            .select((
                glucose_measurements::columns::value,
                glucose_measurements::columns::tested_at,
            ))
            .filter(glucose_measurements::columns::tested_at.ge(window.start))
            .filter(glucose_measurements::columns::tested_at.lt(window.end_exclusive()))
            .into_boxed();

        if let Some(subject_id) = subject_id {
            query = query.filter(glucose_measurements::columns::subject_id.eq(subject_id));
        }

        let rows: Vec<(i32, NaiveDateTime)> = query.load(conn)?;
        Ok(rows
            .into_iter()
            .map(|(value, tested_at)| Reading { value, tested_at })
            .collect())
    }

    /// Deletes the measurement. Returns `false` if it did not exist.
    pub fn delete(conn: &mut PgConnection, id: GlucoseMeasurementId) -> QueryResult<bool> {
        let deleted = diesel::delete(glucose_measurements::table.find(id.0)).execute(conn)?;
        Ok(deleted > 0)
    }

    pub fn get_id(&self) -> GlucoseMeasurementId {
        GlucoseMeasurementId(self.id)
    }
}

impl ReadingSource for PgConnection {
    type Error = diesel::result::Error;

    fn readings(
        &mut self,
        window: &Window,
        subject_id: Option<&str>,
    ) -> Result<Vec<Reading>, Self::Error> {
        GlucoseMeasurement::readings_in(self, window, subject_id)
    }
}

#[derive(Clone, Debug, PartialEq, AsChangeset)]
#[diesel(table_name = glucose_measurements)]
pub struct UpdateGlucoseMeasurement {
    pub id: i32,
    // None means don't update.
    pub subject_id: Option<String>,
    pub value: Option<i32>,
    pub tested_at: Option<NaiveDateTime>,
    pub tz_offset: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateGlucoseMeasurement {
    pub fn unchanged_for_id(id: GlucoseMeasurementId) -> Self {
        UpdateGlucoseMeasurement {
            id: id.0,
            subject_id: None,
            value: None,
            tested_at: None,
            tz_offset: None,
            updated_at: Utc::now(),
        }
    }

    /// Fails with `NotFound` if the measurement does not exist.
    pub fn update(&self, conn: &mut PgConnection) -> QueryResult<GlucoseMeasurement> {
        diesel::update(glucose_measurements::table.find(self.id))
            .set(self)
            .returning(GlucoseMeasurement::as_returning())
            .get_result(conn)
    }
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = glucose_measurements)]
pub struct NewGlucoseMeasurement {
    pub subject_id: String,
    pub value: i32,
    pub tested_at: NaiveDateTime,
    pub tz_offset: String,
}

impl NewGlucoseMeasurement {
    pub fn create(&self, conn: &mut PgConnection) -> QueryResult<GlucoseMeasurement> {
        use crate::schema::glucose_measurements::dsl::*;

        diesel::insert_into(glucose_measurements)
            .values(self)
            .returning(GlucoseMeasurement::as_returning())
            .get_result(conn)
    }
}
