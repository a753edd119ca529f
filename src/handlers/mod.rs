pub mod health;
pub mod metrics;

use axum::http::Uri;
use serde::Deserialize;

use crate::error::AppError;

// ─── Shared query parameters ─────────────────────────────────────

/// `?route=GET:/courses&window=60000`
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub route: Option<String>,
    pub window: Option<String>,
}

impl StatsQuery {
    /// Window override in milliseconds; absent means the store default.
    pub fn window_ms(&self) -> Result<Option<u64>, AppError> {
        let Some(raw) = self.window.as_deref() else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(0) => Err(AppError::BadRequest("window must be greater than 0".into())),
            Ok(ms) => Ok(Some(ms)),
            Err(_) => Err(AppError::BadRequest(format!(
                "window must be a number of milliseconds, got '{raw}'"
            ))),
        }
    }
}

/// Unmatched paths still pass through the timing middleware.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
