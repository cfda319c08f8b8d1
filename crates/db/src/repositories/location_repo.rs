//! Repository for the `locations` table.
//!
//! Activation is exclusive: setting a location active deactivates every
//! other active row first, so at most one location is live at a time.

use sqlx::PgPool;
use trove_core::geo::{self, GeoPoint};
use trove_core::types::DbId;

use crate::models::location::{CreateLocation, Location, UpdateLocation};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, latitude, longitude, active, winning_amount_cents, \
                       minimum_team_size, created_at, updated_at";

/// Provides CRUD and game-read operations for locations.
pub struct LocationRepo;

impl LocationRepo {
    /// Insert a new, inactive location.
    pub async fn create(pool: &PgPool, input: &CreateLocation) -> Result<Location, sqlx::Error> {
        let query = format!(
            "INSERT INTO locations (name, latitude, longitude, winning_amount_cents, minimum_team_size)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Location>(&query)
            .bind(&input.name)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.winning_amount_cents)
            .bind(input.minimum_team_size.unwrap_or(1))
            .fetch_one(pool)
            .await
    }

    /// Find a location by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations WHERE id = $1");
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The most recently created active location, if any.
    pub async fn find_active(pool: &PgPool) -> Result<Option<Location>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locations
             WHERE active = true
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Location>(&query)
            .fetch_optional(pool)
            .await
    }

    /// List all locations, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations ORDER BY created_at DESC");
        sqlx::query_as::<_, Location>(&query).fetch_all(pool).await
    }

    /// The nearest active location to `point`, excluding the given ids.
    ///
    /// Linear scan with the Haversine distance computed in Rust; location
    /// counts are small (an operator-curated set, not a geo index).
    pub async fn find_nearest(
        pool: &PgPool,
        point: GeoPoint,
        exclude: &[DbId],
    ) -> Result<Option<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations WHERE active = true");
        let locations = sqlx::query_as::<_, Location>(&query).fetch_all(pool).await?;

        Ok(locations
            .into_iter()
            .filter(|l| !exclude.contains(&l.id))
            .min_by(|a, b| {
                let da = geo::distance_m(point, a.point());
                let db = geo::distance_m(point, b.point());
                da.total_cmp(&db)
            }))
    }

    /// Update a location. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateLocation,
    ) -> Result<Option<Location>, sqlx::Error> {
        let query = format!(
            "UPDATE locations SET
                name = COALESCE($2, name),
                latitude = COALESCE($3, latitude),
                longitude = COALESCE($4, longitude),
                active = COALESCE($5, active),
                winning_amount_cents = COALESCE($6, winning_amount_cents),
                minimum_team_size = COALESCE($7, minimum_team_size),
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.active)
            .bind(input.winning_amount_cents)
            .bind(input.minimum_team_size)
            .fetch_optional(pool)
            .await
    }

    /// Activate one location, deactivating all others in one transaction.
    pub async fn set_active(pool: &PgPool, id: DbId) -> Result<Option<Location>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE locations SET active = false, updated_at = now() WHERE active = true")
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "UPDATE locations SET active = true, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let location = sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(location)
    }

    /// Deactivate a single location.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<Option<Location>, sqlx::Error> {
        let query = format!(
            "UPDATE locations SET active = false, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a location. Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
