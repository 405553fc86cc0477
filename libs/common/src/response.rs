//! JSON response envelope
//!
//! Every endpoint in the system answers with the same envelope:
//! `{"success": bool, "data": ..., "error": {"code", "message"}}`. Successful
//! responses may carry an optional human message and a count for list
//! payloads. HTTP status codes encode the error category; the envelope
//! carries the machine-readable code.

use serde::Serialize;
use serde_json::{Value, json};

/// Structured error carried in failure envelopes
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Build a success envelope wrapping `data`
pub fn success<T: Serialize>(data: T) -> Value {
    json!({
        "success": true,
        "data": data,
    })
}

/// Build a success envelope with an additional human-readable message
pub fn success_with_message<T: Serialize>(data: T, message: &str) -> Value {
    json!({
        "success": true,
        "data": data,
        "message": message,
    })
}

/// Build a success envelope for list payloads, including the item count
pub fn success_with_count<T: Serialize>(items: &[T]) -> Value {
    json!({
        "success": true,
        "data": items,
        "count": items.len(),
    })
}

/// Build a failure envelope with an error code and message
pub fn failure(code: &str, message: &str) -> Value {
    json!({
        "success": false,
        "error": ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let body = success(json!({"user_id": 1}));
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user_id"], 1);
    }

    #[test]
    fn test_failure_envelope() {
        let body = failure("INVALID_TOKEN", "Token is invalid or expired.");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
        assert_eq!(body["error"]["message"], "Token is invalid or expired.");
    }

    #[test]
    fn test_count_envelope() {
        let body = success_with_count(&[json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(body["count"], 2);
    }
}
