// PostgreSQL store
// Row locks (`SELECT ... FOR UPDATE`) serialize admissions per event and
// check-ins/cancellations per registration. Unique constraints back both up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use tracing::{debug, info};

use checkin_domain::{
    already_checked_in, cancellation_decision, check_in_decision, AdmissionPolicy,
    AdmissionSnapshot, Attendee, AttendeeId, CheckIn, CheckInId, CheckInMethod,
    CheckInRepository, Decision, Event, EventId, EventRepository, EventStatus, NewCheckIn,
    NewRegistration, OperatorId, Registration, RegistrationCode, RegistrationId,
    RegistrationRepository, RegistrationStatus, Rejection, StoreError,
};

const ACTIVE_ATTENDEE_INDEX: &str = "registrations_active_attendee_idx";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id BIGINT PRIMARY KEY,
        title TEXT NOT NULL,
        venue TEXT NOT NULL,
        start_date TIMESTAMPTZ NOT NULL,
        end_date TIMESTAMPTZ NOT NULL,
        max_capacity INTEGER,
        registration_deadline TIMESTAMPTZ,
        status TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendees (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS registrations (
        id BIGSERIAL PRIMARY KEY,
        event_id BIGINT NOT NULL REFERENCES events (id),
        attendee_id BIGINT NOT NULL REFERENCES attendees (id),
        registration_code TEXT NOT NULL UNIQUE,
        credential_payload TEXT,
        security_hash TEXT,
        status TEXT NOT NULL,
        registration_date TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS registrations_active_attendee_idx
        ON registrations (event_id, attendee_id)
        WHERE status <> 'cancelled'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS check_ins (
        id BIGSERIAL PRIMARY KEY,
        registration_id BIGINT NOT NULL UNIQUE REFERENCES registrations (id),
        checked_in_at TIMESTAMPTZ NOT NULL,
        method TEXT NOT NULL,
        operator_id BIGINT,
        note TEXT
    )
    "#,
];

const REGISTRATION_COLUMNS: &str = "id, event_id, attendee_id, registration_code, \
     credential_payload, security_hash, status, registration_date";

const CHECK_IN_COLUMNS: &str = "id, registration_id, checked_in_at, method, operator_id, note";

#[derive(FromRow)]
struct EventRow {
    id: i64,
    title: String,
    venue: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    max_capacity: Option<i32>,
    registration_deadline: Option<DateTime<Utc>>,
    status: String,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = EventStatus::parse(&row.status).ok_or_else(|| {
            StoreError::unavailable(format!("event {} has unknown status '{}'", row.id, row.status))
        })?;
        Ok(Event {
            id: EventId(row.id),
            title: row.title,
            venue: row.venue,
            start_date: row.start_date,
            end_date: row.end_date,
            max_capacity: row.max_capacity.and_then(|value| u32::try_from(value).ok()),
            registration_deadline: row.registration_deadline,
            status,
        })
    }
}

#[derive(FromRow)]
struct AttendeeRow {
    id: i64,
    name: String,
    email: Option<String>,
}

#[derive(FromRow)]
struct RegistrationRow {
    id: i64,
    event_id: i64,
    attendee_id: i64,
    registration_code: String,
    credential_payload: Option<String>,
    security_hash: Option<String>,
    status: String,
    registration_date: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let registration_code = RegistrationCode::parse(&row.registration_code).ok_or_else(|| {
            StoreError::unavailable(format!("registration {} has a malformed code", row.id))
        })?;
        let status = RegistrationStatus::parse(&row.status).ok_or_else(|| {
            StoreError::unavailable(format!(
                "registration {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Registration {
            id: RegistrationId(row.id),
            event_id: EventId(row.event_id),
            attendee_id: AttendeeId(row.attendee_id),
            registration_code,
            credential_payload: row.credential_payload,
            security_hash: row.security_hash,
            status,
            registration_date: row.registration_date,
        })
    }
}

#[derive(FromRow)]
struct CheckInRow {
    id: i64,
    registration_id: i64,
    checked_in_at: DateTime<Utc>,
    method: String,
    operator_id: Option<i64>,
    note: Option<String>,
}

impl TryFrom<CheckInRow> for CheckIn {
    type Error = StoreError;

    fn try_from(row: CheckInRow) -> Result<Self, Self::Error> {
        let method = CheckInMethod::parse(&row.method).ok_or_else(|| {
            StoreError::unavailable(format!("check-in {} has unknown method '{}'", row.id, row.method))
        })?;
        Ok(CheckIn {
            id: CheckInId(row.id),
            registration_id: RegistrationId(row.registration_id),
            checked_in_at: row.checked_in_at,
            method,
            operator_id: row.operator_id.map(OperatorId),
            note: row.note,
        })
    }
}

fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to connect: {e}")))?;
        info!("connected to postgres (max_connections={})", max_connections);
        Ok(Self::new(pool))
    }

    /// Creates tables and indexes when missing. Safe to call on every start.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::unavailable(format!("schema setup failed: {e}")))?;
        }
        debug!("postgres schema ready");
        Ok(())
    }

    pub async fn upsert_event(&self, event: &Event) -> Result<(), StoreError> {
        let capacity = event
            .max_capacity
            .map(|value| i32::try_from(value).unwrap_or(i32::MAX));
        sqlx::query(
            r#"
            INSERT INTO events
                (id, title, venue, start_date, end_date, max_capacity, registration_deadline, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                venue = EXCLUDED.venue,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                max_capacity = EXCLUDED.max_capacity,
                registration_deadline = EXCLUDED.registration_deadline,
                status = EXCLUDED.status
            "#,
        )
        .bind(event.id.value())
        .bind(&event.title)
        .bind(&event.venue)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(capacity)
        .bind(event.registration_deadline)
        .bind(event.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to upsert event: {e}")))?;
        Ok(())
    }

    pub async fn upsert_attendee(&self, attendee: &Attendee) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendees (id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email
            "#,
        )
        .bind(attendee.id.value())
        .bind(&attendee.name)
        .bind(&attendee.email)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to upsert attendee: {e}")))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to start transaction: {e}")))
    }

    async fn lock_registration(
        tx: &mut Transaction<'static, Postgres>,
        id: RegistrationId,
    ) -> Result<Option<Registration>, StoreError> {
        let query = format!(
            "SELECT {} FROM registrations WHERE id = $1 FOR UPDATE",
            REGISTRATION_COLUMNS
        );
        sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id.value())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to lock registration: {e}")))?
            .map(Registration::try_from)
            .transpose()
    }

    async fn check_in_in_tx(
        tx: &mut Transaction<'static, Postgres>,
        registration_id: RegistrationId,
    ) -> Result<Option<CheckIn>, StoreError> {
        let query = format!(
            "SELECT {} FROM check_ins WHERE registration_id = $1",
            CHECK_IN_COLUMNS
        );
        sqlx::query_as::<_, CheckInRow>(&query)
            .bind(registration_id.value())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to read check-in: {e}")))?
            .map(CheckIn::try_from)
            .transpose()
    }
}

#[async_trait]
impl EventRepository for PostgresStore {
    async fn find_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, venue, start_date, end_date, max_capacity, registration_deadline, status
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to get event: {e}")))?
        .map(Event::try_from)
        .transpose()
    }

    async fn find_attendee(&self, id: AttendeeId) -> Result<Option<Attendee>, StoreError> {
        let row = sqlx::query_as::<_, AttendeeRow>("SELECT id, name, email FROM attendees WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to get attendee: {e}")))?;
        Ok(row.map(|row| Attendee {
            id: AttendeeId(row.id),
            name: row.name,
            email: row.email,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let (_,): (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl RegistrationRepository for PostgresStore {
    async fn code_exists(&self, code: &RegistrationCode) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM registrations WHERE registration_code = $1)",
        )
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to check code: {e}")))?;
        Ok(exists)
    }

    async fn admit(
        &self,
        registration: NewRegistration,
        policy: &dyn AdmissionPolicy,
    ) -> Result<Decision<Registration>, StoreError> {
        let mut tx = self.begin().await?;

        // The event row lock is the per-event admission mutex.
        let event = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, venue, start_date, end_date, max_capacity, registration_deadline, status
            FROM events
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(registration.event_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to lock event: {e}")))?;
        let Some(event) = event.map(Event::try_from).transpose()? else {
            let _ = tx.rollback().await;
            return Ok(Err(Rejection::EventNotOpen));
        };

        let existing_query = format!(
            "SELECT {} FROM registrations \
             WHERE event_id = $1 AND attendee_id = $2 AND status <> 'cancelled' LIMIT 1",
            REGISTRATION_COLUMNS
        );
        let existing = sqlx::query_as::<_, RegistrationRow>(&existing_query)
            .bind(registration.event_id.value())
            .bind(registration.attendee_id.value())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to read registration: {e}")))?
            .map(Registration::try_from)
            .transpose()?;

        let (confirmed,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(registration.event_id.value())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to count registrations: {e}")))?;

        let snapshot = AdmissionSnapshot {
            event,
            existing,
            confirmed_count: u64::try_from(confirmed).unwrap_or_default(),
        };
        if let Err(rejection) = policy.evaluate(&snapshot) {
            let _ = tx.rollback().await;
            return Ok(Err(rejection));
        }

        let insert = format!(
            "INSERT INTO registrations \
             (event_id, attendee_id, registration_code, status, registration_date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            REGISTRATION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, RegistrationRow>(&insert)
            .bind(registration.event_id.value())
            .bind(registration.attendee_id.value())
            .bind(registration.registration_code.as_str())
            .bind(registration.status.as_str())
            .bind(registration.registration_date)
            .fetch_one(&mut *tx)
            .await;
        let row = match inserted {
            Ok(row) => row,
            Err(err) => {
                let _ = tx.rollback().await;
                return match unique_violation(&err) {
                    Some(constraint) if constraint == ACTIVE_ATTENDEE_INDEX => {
                        Ok(Err(Rejection::AlreadyRegistered))
                    }
                    Some(constraint) => Err(StoreError::Conflict(format!(
                        "unique constraint '{}' violated",
                        constraint
                    ))),
                    None => Err(StoreError::unavailable(format!(
                        "failed to insert registration: {err}"
                    ))),
                };
            }
        };

        tx.commit()
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to commit admission: {e}")))?;
        Ok(Ok(Registration::try_from(row)?))
    }

    async fn find_registration(&self, id: RegistrationId) -> Result<Option<Registration>, StoreError> {
        let query = format!("SELECT {} FROM registrations WHERE id = $1", REGISTRATION_COLUMNS);
        sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to get registration: {e}")))?
            .map(Registration::try_from)
            .transpose()
    }

    async fn find_by_code(&self, code: &RegistrationCode) -> Result<Option<Registration>, StoreError> {
        let query = format!(
            "SELECT {} FROM registrations WHERE registration_code = $1",
            REGISTRATION_COLUMNS
        );
        sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to get registration: {e}")))?
            .map(Registration::try_from)
            .transpose()
    }

    async fn confirmed_count(&self, event_id: EventId) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(event_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to count registrations: {e}")))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn store_credential(
        &self,
        id: RegistrationId,
        payload: &str,
        security_hash: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE registrations SET credential_payload = $2, security_hash = $3 WHERE id = $1",
        )
        .bind(id.value())
        .bind(payload)
        .bind(security_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(format!("failed to store credential: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::unavailable(format!("registration {} vanished", id)));
        }
        Ok(())
    }

    async fn cancel(&self, id: RegistrationId) -> Result<Decision<Registration>, StoreError> {
        let mut tx = self.begin().await?;
        let Some(mut registration) = Self::lock_registration(&mut tx, id).await? else {
            let _ = tx.rollback().await;
            return Ok(Err(Rejection::UnknownRegistration));
        };
        let existing = Self::check_in_in_tx(&mut tx, id).await?;
        if let Err(rejection) = cancellation_decision(&registration, existing.as_ref()) {
            let _ = tx.rollback().await;
            return Ok(Err(rejection));
        }

        sqlx::query("UPDATE registrations SET status = 'cancelled' WHERE id = $1")
            .bind(id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to cancel registration: {e}")))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to commit cancellation: {e}")))?;

        registration.status = RegistrationStatus::Cancelled;
        Ok(Ok(registration))
    }
}

#[async_trait]
impl CheckInRepository for PostgresStore {
    async fn find_check_in(&self, registration_id: RegistrationId) -> Result<Option<CheckIn>, StoreError> {
        let query = format!(
            "SELECT {} FROM check_ins WHERE registration_id = $1",
            CHECK_IN_COLUMNS
        );
        sqlx::query_as::<_, CheckInRow>(&query)
            .bind(registration_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to get check-in: {e}")))?
            .map(CheckIn::try_from)
            .transpose()
    }

    async fn record(&self, check_in: NewCheckIn) -> Result<Decision<CheckIn>, StoreError> {
        let mut tx = self.begin().await?;
        let Some(registration) = Self::lock_registration(&mut tx, check_in.registration_id).await?
        else {
            let _ = tx.rollback().await;
            return Ok(Err(Rejection::UnknownRegistration));
        };
        let existing = Self::check_in_in_tx(&mut tx, check_in.registration_id).await?;
        if let Err(rejection) = check_in_decision(&registration, existing.as_ref()) {
            let _ = tx.rollback().await;
            return Ok(Err(rejection));
        }

        let insert = format!(
            "INSERT INTO check_ins (registration_id, checked_in_at, method, operator_id, note) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            CHECK_IN_COLUMNS
        );
        let inserted = sqlx::query_as::<_, CheckInRow>(&insert)
            .bind(check_in.registration_id.value())
            .bind(check_in.checked_in_at)
            .bind(check_in.method.as_str())
            .bind(check_in.operator_id.map(OperatorId::value))
            .bind(&check_in.note)
            .fetch_one(&mut *tx)
            .await;
        let row = match inserted {
            Ok(row) => row,
            Err(err) => {
                let _ = tx.rollback().await;
                if unique_violation(&err).is_some() {
                    // Lost the race despite the row lock; report the winner.
                    return match self.find_check_in(check_in.registration_id).await? {
                        Some(winner) => Ok(Err(already_checked_in(&winner))),
                        None => Err(StoreError::Conflict(
                            "check-in uniqueness violated".to_string(),
                        )),
                    };
                }
                return Err(StoreError::unavailable(format!("failed to insert check-in: {err}")));
            }
        };

        tx.commit()
            .await
            .map_err(|e| StoreError::unavailable(format!("failed to commit check-in: {e}")))?;
        Ok(Ok(CheckIn::try_from(row)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_reported() {
        let row = RegistrationRow {
            id: 7,
            event_id: 1,
            attendee_id: 2,
            registration_code: "ABCD1234".to_string(),
            credential_payload: None,
            security_hash: None,
            status: "archived".to_string(),
            registration_date: Utc::now(),
        };
        assert!(Registration::try_from(row).is_err());
    }

    #[test]
    fn check_in_row_converts() {
        let row = CheckInRow {
            id: 3,
            registration_id: 9,
            checked_in_at: Utc::now(),
            method: "manual-id".to_string(),
            operator_id: Some(5),
            note: Some("late bus".to_string()),
        };
        let check_in = CheckIn::try_from(row).expect("convert");
        assert_eq!(check_in.method, CheckInMethod::ManualId);
        assert_eq!(check_in.operator_id, Some(OperatorId(5)));
    }

    #[test]
    fn schema_declares_partial_unique_index() {
        assert!(SCHEMA
            .iter()
            .any(|statement| statement.contains(ACTIVE_ATTENDEE_INDEX)));
    }
}
