//! Handlers for the location resources: the operator console under
//! `/admin/locations`, plus the public read endpoints under `/locations`
//! that clients use before a game session exists.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use trove_core::error::CoreError;
use trove_core::geo::GeoPoint;
use trove_core::types::DbId;
use trove_db::models::code::Code;
use trove_db::models::location::{CreateLocation, Location, UpdateLocation};
use trove_db::repositories::{CodeRepo, LocationRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::state::AppState;

/// Validate latitude/longitude bounds on incoming coordinates.
fn validate_point(latitude: f64, longitude: f64) -> Result<(), AppError> {
    let point = GeoPoint {
        lat: latitude,
        lon: longitude,
    };
    if !point.is_valid() {
        return Err(AppError::Core(CoreError::Validation(
            "Latitude must be in [-90, 90] and longitude in [-180, 180]".into(),
        )));
    }
    Ok(())
}

/// POST /api/v1/admin/locations
///
/// Create a new location. Locations start inactive; activate explicitly.
pub async fn create(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Json(input): Json<CreateLocation>,
) -> AppResult<(StatusCode, Json<DataResponse<Location>>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Location name must not be empty".into(),
        )));
    }
    validate_point(input.latitude, input.longitude)?;
    if input.winning_amount_cents < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "Winning amount must not be negative".into(),
        )));
    }
    if input.minimum_team_size.is_some_and(|n| n < 1) {
        return Err(AppError::Core(CoreError::Validation(
            "Minimum team size must be at least 1".into(),
        )));
    }

    let location = LocationRepo::create(&state.pool, &input).await?;
    tracing::info!(location_id = location.id, "Location created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: location })))
}

/// GET /api/v1/admin/locations
pub async fn list(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Location>>>> {
    let locations = LocationRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: locations }))
}

/// GET /api/v1/admin/locations/{id}
pub async fn get(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Location>>> {
    let location = LocationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "location",
            id,
        }))?;
    Ok(Json(DataResponse { data: location }))
}

/// PUT /api/v1/admin/locations/{id}
///
/// Partial update; present fields go through the same validation as
/// creation so a bad patch is a 400, not a constraint violation.
pub async fn update(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateLocation>,
) -> AppResult<Json<DataResponse<Location>>> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "Location name must not be empty".into(),
        )));
    }
    if let Some(lat) = input.latitude {
        if !(lat.is_finite() && (-90.0..=90.0).contains(&lat)) {
            return Err(AppError::Core(CoreError::Validation(
                "Latitude must be in [-90, 90]".into(),
            )));
        }
    }
    if let Some(lon) = input.longitude {
        if !(lon.is_finite() && (-180.0..=180.0).contains(&lon)) {
            return Err(AppError::Core(CoreError::Validation(
                "Longitude must be in [-180, 180]".into(),
            )));
        }
    }
    if input.winning_amount_cents.is_some_and(|c| c < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "Winning amount must not be negative".into(),
        )));
    }
    if input.minimum_team_size.is_some_and(|n| n < 1) {
        return Err(AppError::Core(CoreError::Validation(
            "Minimum team size must be at least 1".into(),
        )));
    }

    let location = LocationRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "location",
            id,
        }))?;
    Ok(Json(DataResponse { data: location }))
}

/// POST /api/v1/admin/locations/{id}/activate
///
/// Make this the single live location, deactivating every other one.
pub async fn activate(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Location>>> {
    let location = LocationRepo::set_active(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "location",
            id,
        }))?;
    tracing::info!(location_id = id, "Location activated");
    Ok(Json(DataResponse { data: location }))
}

/// POST /api/v1/admin/locations/{id}/deactivate
pub async fn deactivate(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Location>>> {
    let location = LocationRepo::deactivate(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "location",
            id,
        }))?;
    tracing::info!(location_id = id, "Location deactivated");
    Ok(Json(DataResponse { data: location }))
}

/// DELETE /api/v1/admin/locations/{id}
pub async fn delete(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = LocationRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "location",
            id,
        }));
    }
    tracing::info!(location_id = id, "Location deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/locations/{id}/codes
///
/// Codes issued for a location, newest first (debug/audit view).
pub async fn codes(
    RequireOperator(_user): RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Code>>>> {
    // 404 for unknown locations rather than an empty list.
    LocationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "location",
            id,
        }))?;

    let codes = CodeRepo::list_for_location(&state.pool, id).await?;
    Ok(Json(DataResponse { data: codes }))
}

// ---------------------------------------------------------------------------
// Public read endpoints
// ---------------------------------------------------------------------------

/// Query parameters for `GET /locations/nearest`.
#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// GET /api/v1/locations/active
///
/// The currently live location, for clients that want a target before
/// starting a session (and to cache as a fallback target).
pub async fn active(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Location>>> {
    let location = LocationRepo::find_active(&state.pool)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "active location",
            id: 0,
        }))?;
    Ok(Json(DataResponse { data: location }))
}

/// GET /api/v1/locations/nearest?latitude=..&longitude=..
///
/// The active location closest to the given point.
pub async fn nearest(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> AppResult<Json<DataResponse<Location>>> {
    validate_point(query.latitude, query.longitude)?;

    let point = GeoPoint::new(query.latitude, query.longitude);
    let location = LocationRepo::find_nearest(&state.pool, point, &[])
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "active location",
            id: 0,
        }))?;
    Ok(Json(DataResponse { data: location }))
}
