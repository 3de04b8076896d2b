//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::path::PathBuf;

use serde::Deserialize;

/// Request body for POST /invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Log file whose cached results and chunks are dropped
    pub path: String,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.path.trim().is_empty() {
            return Some("Path cannot be empty".to_string());
        }
        if self.path.contains('\0') {
            return Some("Path cannot contain NUL bytes".to_string());
        }
        None
    }

    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(self.path.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_request_deserialize() {
        let json = r#"{"path": "/var/log/app.log"}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.path_buf(), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn test_validate_empty_path() {
        let req = InvalidateRequest {
            path: "   ".to_string(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_nul_path() {
        let req = InvalidateRequest {
            path: "/var/log/a\0b".to_string(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = InvalidateRequest {
            path: "/var/log/app.log".to_string(),
        };
        assert!(req.validate().is_none());
    }
}
