//! SQLite repository for activity records.
//!
//! Holds the synced activity rows in a single `activities` table. Derived
//! fields (`track`, `pois`, `streak`) are not columns: the track is rebuilt
//! from the stored polyline on load, and matches are recomputed per sync
//! pass.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};

use crate::activity::{ActivityRecord, Athlete};
use crate::error::{AnnotateError, Result};
use crate::polyline;

const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Repository over a SQLite database: load-by-id and upsert.
pub struct ActivityStore {
    db: Connection,
}

impl ActivityStore {
    /// Open (or create) a store at the given database path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS athletes (
                id INTEGER PRIMARY KEY,
                firstname TEXT,
                lastname TEXT
            );

            CREATE TABLE IF NOT EXISTS activities (
                strava_id INTEGER PRIMARY KEY,
                athlete_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                distance REAL NOT NULL,
                moving_time_s INTEGER NOT NULL,
                elapsed_time_s INTEGER NOT NULL,
                total_elevation_gain REAL NOT NULL,
                activity_type TEXT NOT NULL,
                start_date TEXT NOT NULL,
                start_date_local TEXT NOT NULL,
                location_country TEXT,
                summary_polyline TEXT,
                average_heartrate REAL,
                average_speed REAL NOT NULL,
                FOREIGN KEY (athlete_id) REFERENCES athletes(id)
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert or update an athlete; returns `true` when a new row was
    /// created.
    pub fn upsert_athlete(&self, athlete: &Athlete) -> Result<bool> {
        let exists: Option<i64> = self
            .db
            .query_row(
                "SELECT id FROM athletes WHERE id = ?1",
                params![athlete.id],
                |row| row.get(0),
            )
            .optional()?;

        if exists.is_some() {
            self.db.execute(
                "UPDATE athletes SET firstname = ?2, lastname = ?3 WHERE id = ?1",
                params![athlete.id, athlete.firstname, athlete.lastname],
            )?;
            return Ok(false);
        }

        self.db.execute(
            "INSERT INTO athletes (id, firstname, lastname) VALUES (?1, ?2, ?3)",
            params![athlete.id, athlete.firstname, athlete.lastname],
        )?;
        Ok(true)
    }

    /// Load an athlete by id.
    pub fn load_athlete(&self, id: i64) -> Result<Option<Athlete>> {
        let athlete = self
            .db
            .query_row(
                "SELECT id, firstname, lastname FROM athletes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Athlete {
                        id: row.get(0)?,
                        firstname: row.get(1)?,
                        lastname: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(athlete)
    }

    /// Insert or update a record; returns `true` when a new row was created.
    ///
    /// An existing row only gets its mutable metrics refreshed.
    /// `location_country` is written at creation and never overwritten; the
    /// geocoded name from the first sync pass is the one that sticks.
    pub fn upsert(&self, record: &ActivityRecord) -> Result<bool> {
        let exists: Option<i64> = self
            .db
            .query_row(
                "SELECT strava_id FROM activities WHERE strava_id = ?1",
                params![record.strava_id],
                |row| row.get(0),
            )
            .optional()?;

        if exists.is_some() {
            self.db.execute(
                r#"
                UPDATE activities SET
                    name = ?2,
                    distance = ?3,
                    moving_time_s = ?4,
                    elapsed_time_s = ?5,
                    total_elevation_gain = ?6,
                    activity_type = ?7,
                    summary_polyline = ?8,
                    average_heartrate = ?9,
                    average_speed = ?10
                WHERE strava_id = ?1
                "#,
                params![
                    record.strava_id,
                    record.name,
                    record.distance,
                    record.moving_time.num_seconds(),
                    record.elapsed_time.num_seconds(),
                    record.total_elevation_gain,
                    record.activity_type,
                    record.summary_polyline,
                    record.average_heartrate,
                    record.average_speed,
                ],
            )?;
            debug!("Updated activity {}", record.strava_id);
            return Ok(false);
        }

        self.db.execute(
            r#"
            INSERT INTO activities (
                strava_id, athlete_id, name, distance,
                moving_time_s, elapsed_time_s, total_elevation_gain,
                activity_type, start_date, start_date_local,
                location_country, summary_polyline,
                average_heartrate, average_speed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                record.strava_id,
                record.athlete_id,
                record.name,
                record.distance,
                record.moving_time.num_seconds(),
                record.elapsed_time.num_seconds(),
                record.total_elevation_gain,
                record.activity_type,
                record.start_date.to_rfc3339(),
                record.start_date_local.format(NAIVE_FORMAT).to_string(),
                record.location_country,
                record.summary_polyline,
                record.average_heartrate,
                record.average_speed,
            ],
        )?;
        debug!("Created activity {}", record.strava_id);
        Ok(true)
    }

    /// Load a record by id, rebuilding the track from the stored polyline.
    ///
    /// A garbled stored polyline degrades to a record without a track.
    pub fn load(&self, strava_id: i64) -> Result<Option<ActivityRecord>> {
        let row = self
            .db
            .query_row(
                r#"
                SELECT strava_id, athlete_id, name, distance,
                       moving_time_s, elapsed_time_s, total_elevation_gain,
                       activity_type, start_date, start_date_local,
                       location_country, summary_polyline,
                       average_heartrate, average_speed
                FROM activities WHERE strava_id = ?1
                "#,
                params![strava_id],
                |row| {
                    Ok(StoredRow {
                        strava_id: row.get(0)?,
                        athlete_id: row.get(1)?,
                        name: row.get(2)?,
                        distance: row.get(3)?,
                        moving_time_s: row.get(4)?,
                        elapsed_time_s: row.get(5)?,
                        total_elevation_gain: row.get(6)?,
                        activity_type: row.get(7)?,
                        start_date: row.get(8)?,
                        start_date_local: row.get(9)?,
                        location_country: row.get(10)?,
                        summary_polyline: row.get(11)?,
                        average_heartrate: row.get(12)?,
                        average_speed: row.get(13)?,
                    })
                },
            )
            .optional()?;

        row.map(StoredRow::into_record).transpose()
    }
}

/// Raw row shape, converted to [`ActivityRecord`] after the rusqlite borrow
/// ends.
struct StoredRow {
    strava_id: i64,
    athlete_id: i64,
    name: String,
    distance: f64,
    moving_time_s: i64,
    elapsed_time_s: i64,
    total_elevation_gain: f64,
    activity_type: String,
    start_date: String,
    start_date_local: String,
    location_country: Option<String>,
    summary_polyline: Option<String>,
    average_heartrate: Option<f64>,
    average_speed: f64,
}

impl StoredRow {
    fn into_record(self) -> Result<ActivityRecord> {
        let start_date = DateTime::parse_from_rfc3339(&self.start_date)
            .map_err(|err| AnnotateError::Persistence {
                message: format!("bad start_date for {}: {}", self.strava_id, err),
            })?
            .with_timezone(&Utc);

        let start_date_local = NaiveDateTime::parse_from_str(&self.start_date_local, NAIVE_FORMAT)
            .map_err(|err| AnnotateError::Persistence {
                message: format!("bad start_date_local for {}: {}", self.strava_id, err),
            })?;

        let track = self.summary_polyline.as_deref().and_then(|encoded| {
            match polyline::decode(encoded) {
                Ok(points) if !points.is_empty() => Some(points),
                Ok(_) => None,
                Err(err) => {
                    warn!("Activity {}: stored polyline is unusable ({})", self.strava_id, err);
                    None
                }
            }
        });

        Ok(ActivityRecord {
            strava_id: self.strava_id,
            athlete_id: self.athlete_id,
            name: self.name,
            distance: self.distance,
            moving_time: chrono::Duration::seconds(self.moving_time_s),
            elapsed_time: chrono::Duration::seconds(self.elapsed_time_s),
            total_elevation_gain: self.total_elevation_gain,
            activity_type: self.activity_type,
            start_date,
            start_date_local,
            location_country: self.location_country,
            summary_polyline: self.summary_polyline,
            average_heartrate: self.average_heartrate,
            average_speed: self.average_speed,
            track,
            pois: None,
            streak: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackPoint;
    use chrono::{Duration, TimeZone};

    fn sample_record() -> ActivityRecord {
        let summary_polyline = "_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string();
        let track = polyline::decode(&summary_polyline).unwrap();

        ActivityRecord {
            strava_id: 4_217_001,
            athlete_id: 9_001,
            name: "Morning Run".to_string(),
            distance: 10_012.5,
            moving_time: Duration::seconds(3272),
            elapsed_time: Duration::seconds(3391),
            total_elevation_gain: 84.0,
            activity_type: "Run".to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 5, 12, 6, 30, 0).unwrap(),
            start_date_local: Utc
                .with_ymd_and_hms(2024, 5, 12, 14, 30, 0)
                .unwrap()
                .naive_utc(),
            location_country: Some("China".to_string()),
            summary_polyline: Some(summary_polyline),
            average_heartrate: Some(152.3),
            average_speed: 3.06,
            track: Some(track),
            pois: None,
            streak: None,
        }
    }

    #[test]
    fn test_athlete_upsert_and_load() {
        let store = ActivityStore::in_memory().unwrap();
        let mut athlete = Athlete {
            id: 9_001,
            firstname: Some("Yi".to_string()),
            lastname: None,
        };

        assert!(store.upsert_athlete(&athlete).unwrap());

        athlete.lastname = Some("Hong".to_string());
        assert!(!store.upsert_athlete(&athlete).unwrap());

        let loaded = store.load_athlete(athlete.id).unwrap().unwrap();
        assert_eq!(loaded, athlete);
        assert!(store.load_athlete(42).unwrap().is_none());
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let store = ActivityStore::in_memory().unwrap();
        let mut record = sample_record();

        assert!(store.upsert(&record).unwrap());

        record.name = "Evening Run".to_string();
        record.distance = 12_000.0;
        assert!(!store.upsert(&record).unwrap());

        let loaded = store.load(record.strava_id).unwrap().unwrap();
        assert_eq!(loaded.name, "Evening Run");
        assert_eq!(loaded.distance, 12_000.0);
    }

    #[test]
    fn test_load_roundtrip() {
        let store = ActivityStore::in_memory().unwrap();
        let record = sample_record();
        store.upsert(&record).unwrap();

        let loaded = store.load(record.strava_id).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = ActivityStore::in_memory().unwrap();
        assert!(store.load(1).unwrap().is_none());
    }

    #[test]
    fn test_update_keeps_location_country() {
        let store = ActivityStore::in_memory().unwrap();
        let mut record = sample_record();
        store.upsert(&record).unwrap();

        record.location_country = Some("Elsewhere".to_string());
        store.upsert(&record).unwrap();

        let loaded = store.load(record.strava_id).unwrap().unwrap();
        assert_eq!(loaded.location_country.as_deref(), Some("China"));
    }

    #[test]
    fn test_load_tolerates_garbled_polyline() {
        let store = ActivityStore::in_memory().unwrap();
        let record = sample_record();
        store.upsert(&record).unwrap();

        store
            .db
            .execute(
                "UPDATE activities SET summary_polyline = ?1 WHERE strava_id = ?2",
                params!["not!a!polyline", record.strava_id],
            )
            .unwrap();

        let loaded = store.load(record.strava_id).unwrap().unwrap();
        assert!(loaded.track.is_none());
    }

    #[test]
    fn test_track_rebuilt_on_load() {
        let store = ActivityStore::in_memory().unwrap();
        let record = sample_record();
        store.upsert(&record).unwrap();

        let loaded = store.load(record.strava_id).unwrap().unwrap();
        let track = loaded.track.unwrap();
        assert_eq!(track[0], TrackPoint::new(38.5, -120.2));
    }
}
