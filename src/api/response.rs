// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub fn wrap<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse { data }
}

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Parse an optional `limit` query value, clamped to `1..=MAX_LIMIT`.
pub fn parse_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse::<i64>().ok())
        .map(|l| l.clamp(1, MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(parse_limit(None), 20);
        assert_eq!(parse_limit(Some("50")), 50);
        assert_eq!(parse_limit(Some("0")), 1);
        assert_eq!(parse_limit(Some("1000")), 100);
        assert_eq!(parse_limit(Some("junk")), 20);
    }
}
