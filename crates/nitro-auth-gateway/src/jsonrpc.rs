//! Minimal JSON-RPC 2.0 request inspection.
//!
//! The gateway never rewrites a request body; it only needs the method names
//! so the allow-list and the credit charge can be applied before forwarding.

use serde_json::Value;

use crate::error::ApiError;

/// Largest batch accepted in a single request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Extract the method name of every call in `body`, in order.
///
/// A single request object yields one name; a batch array yields one per
/// element. Each call costs one credit.
pub fn parse_calls(body: &[u8]) -> Result<Vec<String>, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("body is not valid JSON: {e}")))?;

    match value {
        Value::Object(_) => Ok(vec![method_of(&value)?]),
        Value::Array(calls) => {
            if calls.is_empty() {
                return Err(ApiError::BadRequest("empty batch".into()));
            }
            if calls.len() > MAX_BATCH_SIZE {
                return Err(ApiError::BadRequest(format!(
                    "batch of {} calls exceeds the limit of {}",
                    calls.len(),
                    MAX_BATCH_SIZE
                )));
            }
            calls.iter().map(method_of).collect()
        }
        _ => Err(ApiError::BadRequest(
            "expected a JSON-RPC request object or batch array".into(),
        )),
    }
}

fn method_of(call: &Value) -> Result<String, ApiError> {
    match call.get("method") {
        Some(Value::String(method)) if !method.is_empty() => Ok(method.clone()),
        Some(_) => Err(ApiError::BadRequest("method must be a non-empty string".into())),
        None => Err(ApiError::BadRequest("call is missing a method".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_call() {
        let body = br#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber","params":[]}"#;
        assert_eq!(parse_calls(body).unwrap(), vec!["eth_blockNumber"]);
    }

    #[test]
    fn batch_keeps_order() {
        let body = br#"[
            {"jsonrpc":"2.0","id":1,"method":"eth_chainId"},
            {"jsonrpc":"2.0","id":2,"method":"eth_getBalance","params":["0x0","latest"]}
        ]"#;
        assert_eq!(
            parse_calls(body).unwrap(),
            vec!["eth_chainId", "eth_getBalance"]
        );
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(matches!(parse_calls(b"not json"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_calls(b"[]"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_calls(b"42"), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            parse_calls(br#"{"jsonrpc":"2.0","id":1}"#),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_calls(br#"{"method":7}"#),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_calls(br#"[{"method":"eth_chainId"}, "oops"]"#),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_oversized_batch() {
        let calls: Vec<Value> = (0..=MAX_BATCH_SIZE)
            .map(|i| serde_json::json!({"jsonrpc": "2.0", "id": i, "method": "eth_chainId"}))
            .collect();
        let body = serde_json::to_vec(&calls).unwrap();
        assert!(matches!(parse_calls(&body), Err(ApiError::BadRequest(_))));

        let body = serde_json::to_vec(&calls[..MAX_BATCH_SIZE]).unwrap();
        assert_eq!(parse_calls(&body).unwrap().len(), MAX_BATCH_SIZE);
    }
}
