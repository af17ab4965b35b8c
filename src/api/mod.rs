// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Read-only query API: a thin projection over the store. Nothing in here
//! mutates pipeline state.

pub mod error;
pub mod response;
pub mod routes;

use crate::data::db::Database;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub db: Database,
}

pub fn create_router(db: Database) -> Router {
    let state = Arc::new(ApiState { db });
    Router::new()
        .route("/api/transfer-records", get(routes::transfer_records))
        .route("/api/notifications", get(routes::notifications))
        .route("/api/tokens", get(routes::tokens))
        .route("/api/deployments", get(routes::deployments))
        .with_state(state)
}
