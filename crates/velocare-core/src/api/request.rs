//! Replayable description of an outbound call.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use super::ClientError;

/// Which send this is for a single logical call.
///
/// There are exactly two: the original send and at most one resend after a
/// refresh. A 401 on `Resend` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Resend,
}

impl Attempt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attempt::Initial => "initial",
            Attempt::Resend => "resend",
        }
    }
}

/// Method, path, body and headers of a call, kept so the exact same call can
/// be sent again after a refresh.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidRequest(format!("Unserializable body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Add a header. Caller headers take precedence over the ones the client
    /// would set, including `Authorization`.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::InvalidRequest(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidRequest(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Join the path onto a base URL without doubling or dropping the slash
    pub fn url(&self, base_url: &str) -> String {
        join_url(base_url, &self.path)
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_url_joining() {
        let req = PendingRequest::get("/vehicles/");
        assert_eq!(req.url("http://host/api/"), "http://host/api/vehicles/");
        assert_eq!(req.url("http://host/api"), "http://host/api/vehicles/");

        let req = PendingRequest::get("services/revenue_dashboard");
        assert_eq!(
            req.url("http://host/api"),
            "http://host/api/services/revenue_dashboard"
        );
    }

    #[test]
    fn test_builder_keeps_body_and_headers() {
        let req = PendingRequest::post("components/")
            .json(&serde_json::json!({"name": "Brake pad", "price": 12.5}))
            .unwrap()
            .header("Authorization", "Bearer caller")
            .unwrap();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body.as_ref().unwrap()["name"], "Brake pad");
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer caller");

        let replay = req.clone();
        assert_eq!(replay.body, req.body);
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = PendingRequest::get("x").header("bad header", "v");
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }
}
