//! Gateway - REST API endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes over the variable store
//! - Request validation (the control core assumes validated input)
//! - Response formatting
//!
//! The gateway never touches the control state or the actuator: it only
//! writes desired values into the variable store and reads them back. The
//! monitor picks up changes on its next polling tick.

mod routes;

pub use routes::{create_router, ControlRequest, StatusResponse};

use feeder_core::store::VariableStore;
use std::sync::Arc;

/// State shared across gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The variable store the daemon and monitor share.
    pub store: Arc<dyn VariableStore>,
}
