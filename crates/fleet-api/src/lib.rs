//! fleet-api — the fleet controller facade and its REST surface.
//!
//! [`FleetController`] wires the registry, health monitor, load balancer,
//! lifecycle controller and storage gateway together and exposes the
//! operations upstream callers use. [`build_router`] mounts them over HTTP.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/nodes` | Fleet status |
//! | GET | `/api/v1/nodes/select` | Pick the next running node |
//! | POST | `/api/v1/nodes/{id}/start` | Start a node |
//! | POST | `/api/v1/nodes/{id}/stop` | Stop a node |
//! | GET | `/api/v1/stats` | Fleet statistics |
//! | POST | `/api/v1/files/{name}` | Store a new file (raw body) |
//! | PUT | `/api/v1/files/{name}` | Replace an existing file (raw body) |
//! | GET | `/api/v1/files/{name}` | Fetch a file (raw body) |
//! | DELETE | `/api/v1/files/{name}` | Delete a file |

pub mod controller;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};

pub use controller::{FleetController, FleetStats};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: FleetController,
}

/// Build the REST router over a controller.
pub fn build_router(controller: FleetController) -> Router {
    let api_state = ApiState { controller };

    let api_routes = Router::new()
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes/select", get(handlers::select_node))
        .route("/nodes/{id}/start", post(handlers::start_node))
        .route("/nodes/{id}/stop", post(handlers::stop_node))
        .route("/stats", get(handlers::fleet_stats))
        .route(
            "/files/{name}",
            post(handlers::create_file)
                .put(handlers::update_file)
                .get(handlers::read_file)
                .delete(handlers::delete_file),
        )
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
