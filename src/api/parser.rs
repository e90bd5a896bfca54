// src/api/parser.rs
//! Turning raw HTTP responses into JSON payloads and records.

use super::connection_pool::RawResponse;
use super::types::ApiResponse;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::FetchError;
use crate::model::Record;
use serde_json::Value;

/// Classifies the status, then decodes the body as JSON.
pub fn parse_response(raw: RawResponse, label: &str) -> Result<ApiResponse, FetchError> {
    if !(200..300).contains(&raw.status) {
        log::debug!(
            "HTTP {} from {}: {}",
            raw.status,
            label,
            body_preview(&raw.body)
        );
        return Err(FetchError::from_status(label, raw.status));
    }

    let payload = serde_json::from_slice::<Value>(&raw.body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", label, e);
        FetchError::Decode {
            url: label.to_string(),
            reason: format!("{} (body: {})", e, body_preview(&raw.body)),
        }
    })?;

    Ok(ApiResponse {
        payload,
        total_results: raw.total_results,
        from_cache: false,
    })
}

/// A listing page must be a JSON array of objects.
pub fn parse_listing(payload: Value, label: &str) -> Result<Vec<Record>, FetchError> {
    let Value::Array(entries) = payload else {
        return Err(FetchError::Decode {
            url: label.to_string(),
            reason: format!("expected a JSON array, got {}", json_kind(&payload)),
        });
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let kind = json_kind(&entry);
            Record::from_value(entry).ok_or_else(|| FetchError::Decode {
                url: label.to_string(),
                reason: format!("entry {} is {}, expected an object", index, kind),
            })
        })
        .collect()
}

/// A single-resource response must be a JSON object.
pub fn parse_resource(payload: Value, label: &str) -> Result<Record, FetchError> {
    let kind = json_kind(&payload);
    Record::from_value(payload).ok_or_else(|| FetchError::Decode {
        url: label.to_string(),
        reason: format!("expected a JSON object, got {}", kind),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let cut: String = text.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", cut)
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            total_results: Some(250),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_success_keeps_total_hint() {
        let response = parse_response(raw(200, r#"[{"o:id":1}]"#), "items?page=1").unwrap();
        assert_eq!(response.payload, json!([{"o:id": 1}]));
        assert_eq!(response.total_results, Some(250));
        assert!(!response.from_cache);
    }

    #[test]
    fn test_error_statuses_are_classified() {
        assert!(parse_response(raw(503, "busy"), "items")
            .unwrap_err()
            .is_transient());
        assert_eq!(
            parse_response(raw(404, "{}"), "items/9").unwrap_err(),
            FetchError::Rejected {
                url: "items/9".to_string(),
                status: 404
            }
        );
    }

    #[test]
    fn test_invalid_json_is_a_decode_error() {
        let long_garbage = "<html>".repeat(100);
        let err = parse_response(raw(200, &long_garbage), "items").unwrap_err();
        match err {
            FetchError::Decode { reason, .. } => {
                assert!(reason.ends_with("...)"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_listing_shape_is_checked() {
        assert_eq!(parse_listing(json!([]), "items").unwrap().len(), 0);
        assert!(parse_listing(json!({"errors": {}}), "items").is_err());
        assert!(parse_listing(json!([{"o:id": 1}, 2]), "items").is_err());
        assert!(parse_resource(json!({"o:id": 3}), "items/3").is_ok());
        assert!(parse_resource(json!([]), "items/3").is_err());
    }
}
