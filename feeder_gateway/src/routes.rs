//! API routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::GatewayState;
use feeder_common::consts::{MAX_ANGLE_DEG, MIN_ANGLE_DEG};
use feeder_core::store::{Slot, SlotValue};

/// Create the API router.
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/control", post(set_control))
        .route("/api/status", get(get_status))
        .with_state(state)
}

/// Desired control values, as written by REST clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub start: bool,
    pub speed_percent: i64,
    pub min_angle: i64,
    pub max_angle: i64,
    /// Absent means sweep mode; present (including 0) means fixed mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_angle: Option<i64>,
}

impl ControlRequest {
    /// Validate ranges before anything reaches the store. The control core
    /// does not re-validate.
    fn validate(&self) -> Result<(), String> {
        if !(0..=100).contains(&self.speed_percent) {
            return Err(format!(
                "speedPercent must be in [0,100], got {}",
                self.speed_percent
            ));
        }
        if self.min_angle > self.max_angle {
            return Err(format!(
                "minAngle {} exceeds maxAngle {}",
                self.min_angle, self.max_angle
            ));
        }
        let mech = MIN_ANGLE_DEG as i64..=MAX_ANGLE_DEG as i64;
        for (name, value) in [("minAngle", self.min_angle), ("maxAngle", self.max_angle)] {
            if !mech.contains(&value) {
                return Err(format!(
                    "{name} {value} outside mechanical range [{MIN_ANGLE_DEG},{MAX_ANGLE_DEG}]"
                ));
            }
        }
        if let Some(fixed) = self.fixed_angle {
            if !mech.contains(&fixed) {
                return Err(format!(
                    "fixedAngle {fixed} outside mechanical range [{MIN_ANGLE_DEG},{MAX_ANGLE_DEG}]"
                ));
            }
        }
        Ok(())
    }
}

/// Current slot values read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub start: bool,
    pub speed_percent: i64,
    pub min_angle: i64,
    pub max_angle: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_angle: Option<i64>,
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Write desired control values into the variable store.
async fn set_control(
    State(state): State<GatewayState>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if let Err(reason) = req.validate() {
        tracing::warn!(reason = %reason, "rejected control request");
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": reason })),
        ));
    }

    let fixed = match req.fixed_angle {
        Some(angle) => SlotValue::Int(angle),
        None => SlotValue::Unset,
    };
    let writes = [
        (Slot::SpeedPercent, SlotValue::Int(req.speed_percent)),
        (Slot::MinAngle, SlotValue::Int(req.min_angle)),
        (Slot::MaxAngle, SlotValue::Int(req.max_angle)),
        (Slot::FixedAngle, fixed),
        // Start last, so a rising edge is observed with fresh parameters
        // already in place whenever the writes land within one poll tick.
        (Slot::Start, SlotValue::Bool(req.start)),
    ];

    for (slot, value) in writes {
        if let Err(e) = state.store.write_slot(slot, value) {
            tracing::error!(slot = slot.name(), error = %e, "store write failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ));
        }
    }

    tracing::info!(
        start = req.start,
        speed_percent = req.speed_percent,
        fixed = ?req.fixed_angle,
        "control request accepted"
    );
    Ok(Json(json!({ "status": "accepted" })))
}

/// Read the current slot values back from the store.
async fn get_status(
    State(state): State<GatewayState>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<serde_json::Value>)> {
    let read = || -> Result<StatusResponse, feeder_core::error::StoreError> {
        Ok(StatusResponse {
            start: state.store.read_bool(Slot::Start)?,
            speed_percent: state.store.read_int(Slot::SpeedPercent)?,
            min_angle: state.store.read_int(Slot::MinAngle)?,
            max_angle: state.store.read_int(Slot::MaxAngle)?,
            fixed_angle: state.store.read_opt_int(Slot::FixedAngle)?,
        })
    };

    read().map(Json).map_err(|e| {
        tracing::error!(error = %e, "status read failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })
}
