use crate::repo::RepoError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Handler-internal failure carrying the wire error code. Workers return
/// `Result<_, HandlerErr>`; the thin `handle_*` wrappers turn it into an
/// envelope with the request id.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::new("bad_params", message)
    }

    /// Field-level validation failure, mirroring the front-end's per-field
    /// error display.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        HandlerErr {
            code: "validation_failed",
            message: message.into(),
            details: Some(json!({ "field": field })),
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<RepoError> for HandlerErr {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail { .. } => HandlerErr::new("duplicate_email", e.to_string()),
            RepoError::NotEmpty => HandlerErr::new("workspace_not_empty", e.to_string()),
            RepoError::Storage(inner) => HandlerErr::new("persist_failed", format!("{:?}", inner)),
        }
    }
}
