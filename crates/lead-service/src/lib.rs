//! Lead Service
//!
//! Authoritative store of sales leads with role-based access control.
//! Every call carries a caller identity verified by an upstream identity
//! layer; this service only uses it as a lookup key and audit field.
//!
//! ## Endpoints
//!
//! - `POST /api/leads` - Create a lead
//! - `GET /api/leads[?status=]` - List leads, optionally in one stage
//! - `GET /api/leads/count` - Count leads
//! - `GET /api/leads/summary` - Count leads per stage
//! - `GET /api/leads/{id}` - Get a lead
//! - `GET /api/leads/{id}/creator` - Identity that created a lead
//! - `GET /api/leads/{id}/timeline` - Creation and last update time
//! - `POST /api/leads/{id}/notes` - Append a note
//! - `PUT /api/leads/{id}/status` - Change stage
//! - `GET|PUT /api/profile` - Caller's own profile
//! - `GET /api/profiles/{identity}` - Another caller's profile (admin)
//! - `GET /api/role` - Caller's role
//! - `GET /api/role/admin` - Whether the caller is an admin
//! - `PUT /api/roles/{identity}` - Assign a role (admin)
//! - `GET /health` - Health check

pub mod access;
pub mod clock;
pub mod config;
pub mod handlers;
pub mod identity_store;
pub mod query;
pub mod repository;
pub mod service;
pub mod storage;
pub mod validation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use service::LeadService;
pub use storage::{Backend, MemoryBackend, RedisStorage};

/// Create the application router
pub fn create_router(state: impl Into<Arc<AppState>>) -> Router {
    let shared_state: Arc<AppState> = state.into();

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/leads",
            post(handlers::create_lead_handler).get(handlers::list_leads_handler),
        )
        .route("/api/leads/count", get(handlers::count_leads_handler))
        .route("/api/leads/summary", get(handlers::summary_handler))
        .route("/api/leads/{id}", get(handlers::get_lead_handler))
        .route("/api/leads/{id}/creator", get(handlers::get_creator_handler))
        .route("/api/leads/{id}/timeline", get(handlers::get_timeline_handler))
        .route("/api/leads/{id}/notes", post(handlers::add_note_handler))
        .route("/api/leads/{id}/status", put(handlers::update_status_handler))
        .route(
            "/api/profile",
            get(handlers::get_own_profile_handler).put(handlers::save_own_profile_handler),
        )
        .route("/api/profiles/{identity}", get(handlers::get_profile_handler))
        .route("/api/role", get(handlers::get_own_role_handler))
        .route("/api/role/admin", get(handlers::is_admin_handler))
        .route("/api/roles/{identity}", put(handlers::assign_role_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
