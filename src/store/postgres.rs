// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{db_error, CoreError};
use crate::models::{
    Appointment, AppointmentRow, AppointmentStatus, NewAppointment, PetRow, ProductRow,
    ServiceRow, UserProfile,
};
use crate::policy::Scope;
use crate::store::{AppointmentStore, RangeQuery, Registry, SessionIdentity, SessionStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_appointments(rows: Vec<AppointmentRow>) -> Result<Vec<Appointment>, CoreError> {
    rows.into_iter().map(Appointment::try_from).collect()
}

/* ============================================================
   Appointments
   ============================================================ */

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, CoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
            FROM appointment
            WHERE appointment_id = $1
            "#,
        )
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Appointment::try_from).transpose()
    }

    async fn find_by_scope(&self, scope: Scope) -> Result<Vec<Appointment>, CoreError> {
        let rows = match scope {
            Scope::All => {
                sqlx::query_as::<_, AppointmentRow>(
                    r#"
                    SELECT appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
                    FROM appointment
                    ORDER BY date ASC, appointment_id ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
            Scope::OwnedBy(user_id) => {
                sqlx::query_as::<_, AppointmentRow>(
                    r#"
                    SELECT appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
                    FROM appointment
                    WHERE user_id = $1
                    ORDER BY date ASC, appointment_id ASC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_error)?;

        into_appointments(rows)
    }

    async fn find_conflicting(
        &self,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>, CoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
            FROM appointment
            WHERE date = $1
              AND status IN (0, 1)
            LIMIT 1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Appointment::try_from).transpose()
    }

    async fn create(&self, new: NewAppointment) -> Result<Appointment, CoreError> {
        // appointment_active_slot_uq makes this a conditional insert:
        // no row comes back when an active appointment already holds `date`.
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            INSERT INTO appointment (pet_id, service_id, user_id, date, status)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT DO NOTHING
            RETURNING appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
            "#,
        )
        .bind(new.pet_id)
        .bind(new.service_id)
        .bind(new.user_id)
        .bind(new.date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => Appointment::try_from(row),
            None => Err(CoreError::SlotTaken(new.date)),
        }
    }

    async fn update_status(
        &self,
        current: &Appointment,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, CoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            UPDATE appointment
            SET status = $3,
                updated_at = now()
            WHERE appointment_id = $1
              AND status = $2
            RETURNING appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
            "#,
        )
        .bind(current.appointment_id)
        .bind(current.status.code())
        .bind(status.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CoreError::SlotTaken(current.date)
            }
            other => db_error(other),
        })?;

        row.map(Appointment::try_from).transpose()
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query(r#"DELETE FROM appointment WHERE appointment_id = $1"#)
            .bind(appointment_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_in_range(&self, query: RangeQuery) -> Result<Vec<Appointment>, CoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, pet_id, service_id, user_id, date, status, created_at, updated_at
            FROM appointment
            WHERE date >= $1
              AND date <= $2
              AND ($3::uuid IS NULL OR service_id = $3)
              AND ($4::smallint IS NULL OR status = $4)
            ORDER BY date ASC, appointment_id ASC
            "#,
        )
        .bind(query.range.start_date)
        .bind(query.range.end_date)
        .bind(query.service_id)
        .bind(query.status.map(AppointmentStatus::code))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        into_appointments(rows)
    }
}

/* ============================================================
   Registries (read-only)
   ============================================================ */

#[async_trait]
impl Registry for PgStore {
    async fn find_owned_pet(
        &self,
        pet_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<PetRow>, CoreError> {
        sqlx::query_as::<_, PetRow>(
            r#"
            SELECT pet_id, owner_id, name, species
            FROM pet
            WHERE pet_id = $1
              AND owner_id = $2
            "#,
        )
        .bind(pet_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_service(&self, service_id: Uuid) -> Result<Option<ServiceRow>, CoreError> {
        sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT service_id, name, price_cents, duration_min
            FROM service
            WHERE service_id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn pets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PetRow>, CoreError> {
        sqlx::query_as::<_, PetRow>(
            r#"
            SELECT pet_id, owner_id, name, species
            FROM pet
            WHERE pet_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn services_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ServiceRow>, CoreError> {
        sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT service_id, name, price_cents, duration_min
            FROM service
            WHERE service_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, CoreError> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, name, email
            FROM app_user
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn list_products(&self, max_stock: Option<i32>) -> Result<Vec<ProductRow>, CoreError> {
        sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT product_id, name, price_cents, stock
            FROM product
            WHERE ($1::int IS NULL OR stock <= $1)
            ORDER BY stock ASC, name ASC
            "#,
        )
        .bind(max_stock)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }
}

/* ============================================================
   Sessions
   ============================================================ */

#[derive(Debug, sqlx::FromRow)]
struct SessionLookupRow {
    session_token_id: Uuid,
    user_id: Uuid,
    role: i16,
}

#[async_trait]
impl SessionStore for PgStore {
    async fn resolve_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionIdentity>, CoreError> {
        let row: Option<SessionLookupRow> = sqlx::query_as::<_, SessionLookupRow>(
            r#"
            SELECT st.session_token_id, st.user_id, u.role
            FROM session_token st
            JOIN app_user u ON u.user_id = st.user_id
            WHERE st.session_token_hash = $1
              AND st.revoked_at IS NULL
              AND st.expires_at > now()
              AND u.is_active = true
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Touch last_seen_at (best-effort)
        if let Err(e) = sqlx::query(
            r#"
            UPDATE session_token
            SET last_seen_at = now()
            WHERE session_token_id = $1
            "#,
        )
        .bind(row.session_token_id)
        .execute(&self.pool)
        .await
        {
            tracing::debug!(error = %e, "failed to touch session last_seen_at");
        }

        Ok(Some(SessionIdentity {
            session_token_id: row.session_token_id,
            user_id: row.user_id,
            role_code: row.role,
        }))
    }
}
