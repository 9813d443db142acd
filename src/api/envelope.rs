use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Response body shared by every outcome of a query request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Path variables of the request, echoed back.
    pub request: BTreeMap<String, String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(request: BTreeMap<String, String>, output: Value) -> Self {
        Self {
            request,
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(request: BTreeMap<String, String>, error: impl Into<String>) -> Self {
        Self {
            request,
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Two-space indented JSON followed by a newline.
    pub fn to_body(&self) -> serde_json::Result<String> {
        let mut body = serde_json::to_string_pretty(self)?;
        body.push('\n');
        Ok(body)
    }

    /// Build the full response: status first, then the serialized body.
    pub fn respond(self, status: StatusCode) -> Response {
        match self.to_body() {
            Ok(body) => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(err) => {
                log::error!("Cannot serialize response envelope: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> BTreeMap<String, String> {
        BTreeMap::from([("id".to_string(), "42".to_string())])
    }

    #[test]
    fn success_body_has_output_and_no_error() {
        let body = Envelope::success(request(), json!([{"id": "x"}]))
            .to_body()
            .unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            value,
            json!({"request": {"id": "42"}, "success": true, "output": [{"id": "x"}]})
        );
        assert!(body.starts_with("{\n  \"request\""));
        assert!(body.ends_with("}\n"));
    }

    #[test]
    fn failure_body_has_error_and_no_output() {
        let body = Envelope::failure(request(), "boom").to_body().unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            value,
            json!({"request": {"id": "42"}, "success": false, "error": "boom"})
        );
    }

    #[test]
    fn respond_sets_status_and_content_type() {
        let response = Envelope::failure(request(), "nope").respond(StatusCode::BAD_REQUEST);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }
}
