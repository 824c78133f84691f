use serde_json::Value;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExtractionError {
    #[error("malformed upstream response: {0}")]
    Malformed(String),
    #[error("upstream reported error {code}: {message}")]
    Reported { code: String, message: String },
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Recover the JSON payload from catalog response text.
///
/// The catalog's `output=js` mode is not reliably bare JSON: it may end in a
/// semicolon, be wrapped in a callback call, or carry stray bytes around the
/// object. The text is parsed as-is first; failing that, the span from the
/// first `{` to the last `}` is parsed. A payload carrying `errorCode` is
/// turned into [`ExtractionError::Reported`].
pub fn extract_json(text: &str) -> Result<Value, ExtractionError> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(direct_err) => {
            let span = object_span(text).ok_or_else(|| {
                ExtractionError::Malformed(format!("no JSON object found ({direct_err})"))
            })?;
            serde_json::from_str::<Value>(span)
                .map_err(|e| ExtractionError::Malformed(e.to_string()))?
        }
    };
    check_error_payload(&value)?;
    Ok(value)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn check_error_payload(value: &Value) -> Result<(), ExtractionError> {
    let Some(code) = value.get("errorCode").filter(|c| !c.is_null()) else {
        return Ok(());
    };
    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let message = value
        .get("errorMessage")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Err(ExtractionError::Reported { code, message })
}
