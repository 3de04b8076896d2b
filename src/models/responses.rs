//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Search-result cache snapshot
    pub search: CacheStats,
    /// File-chunk cache snapshot
    pub chunks: CacheStats,
    /// Number of files with at least one change subscriber
    pub watched_paths: usize,
}

impl StatsResponse {
    pub fn new(search: CacheStats, chunks: CacheStats, watched_paths: usize) -> Self {
        Self {
            search,
            chunks,
            watched_paths,
        }
    }
}

/// Response body for POST /invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub path: String,
    /// Search results removed
    pub search_removed: usize,
    /// File chunks removed
    pub chunks_removed: usize,
}

impl InvalidateResponse {
    pub fn new(path: impl Into<String>, search_removed: usize, chunks_removed: usize) -> Self {
        Self {
            path: path.into(),
            search_removed,
            chunks_removed,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "All caches cleared".to_string(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether the change watcher is dispatching events
    pub watcher_running: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(watcher_running: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            watcher_running,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_serialize() {
        let resp = StatsResponse::new(CacheStats::default(), CacheStats::default(), 2);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["watched_paths"], 2);
        assert_eq!(json["search"]["hits"], 0);
        assert!(json["chunks"]["hit_ratio"].is_number());
    }

    #[test]
    fn test_invalidate_response_serialize() {
        let resp = InvalidateResponse::new("/var/log/app.log", 3, 1);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("/var/log/app.log"));
        assert!(json.contains("\"search_removed\":3"));
        assert!(json.contains("\"chunks_removed\":1"));
    }

    #[test]
    fn test_clear_response_serialize() {
        let json = serde_json::to_string(&ClearResponse::cleared()).unwrap();
        assert!(json.contains("cleared"));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("\"watcher_running\":true"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
