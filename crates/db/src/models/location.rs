//! Location models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trove_core::geo::GeoPoint;
use trove_core::types::{Cents, DbId, Timestamp};

/// A row from the `locations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: DbId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub active: bool,
    pub winning_amount_cents: Cents,
    pub minimum_team_size: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// DTO for creating a new location. Created inactive; activation is a
/// separate, exclusive operation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub winning_amount_cents: Cents,
    pub minimum_team_size: Option<i32>,
}

/// DTO for updating an existing location. All fields are optional.
///
/// `active` here toggles this row alone; the exclusive "make this the only
/// live location" switch is the separate activate operation.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLocation {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub active: Option<bool>,
    pub winning_amount_cents: Option<Cents>,
    pub minimum_team_size: Option<i32>,
}
