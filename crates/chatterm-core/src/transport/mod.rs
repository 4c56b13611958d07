pub mod http;
#[cfg(test)]
pub mod testing;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// Assistant text used when a reply carries none of the known fields
pub const NO_RESPONSE_FALLBACK: &str = "No response received";

/// Reply fields in precedence order
const REPLY_FIELDS: [&str; 3] = ["reply", "message", "response"];

/// Remote assistant endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a server-side session and return its identifier
    async fn create_session(&self) -> Result<String, TransportError>;

    /// Deliver a user message, returning the raw JSON reply body
    async fn send_message(&self, session_id: &str, message: &str) -> Result<Value, TransportError>;
}

/// Pick the assistant text out of a message reply.
///
/// The first of `reply`, `message`, `response` holding a non-empty string wins.
pub fn extract_reply(body: &Value) -> String {
    REPLY_FIELDS
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .unwrap_or(NO_RESPONSE_FALLBACK)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_beats_message() {
        assert_eq!(extract_reply(&json!({"reply": "A", "message": "B"})), "A");
    }

    #[test]
    fn test_message_beats_response() {
        assert_eq!(extract_reply(&json!({"message": "B", "response": "C"})), "B");
    }

    #[test]
    fn test_response_alone() {
        assert_eq!(extract_reply(&json!({"response": "C"})), "C");
    }

    #[test]
    fn test_empty_object_falls_back() {
        assert_eq!(extract_reply(&json!({})), NO_RESPONSE_FALLBACK);
    }

    #[test]
    fn test_empty_and_non_string_fields_are_skipped() {
        let body = json!({"reply": "", "message": 42, "response": "C"});
        assert_eq!(extract_reply(&body), "C");
        assert_eq!(extract_reply(&json!("bare string")), NO_RESPONSE_FALLBACK);
    }
}
