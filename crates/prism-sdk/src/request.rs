//! Request descriptors and raw responses.
//!
//! An [`ApiRequest`] is an owned, cloneable description of one HTTP call
//! so that it can be queued behind a token refresh and replayed later.

use bytes::Bytes;
use prism_models::{extract_message, ApiResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GatewayError;

/// One HTTP call relative to the configured base address.
///
/// # Examples
///
/// ```
/// use prism_sdk::ApiRequest;
///
/// let req = ApiRequest::get("/notices")
///     .query("search", "maintenance")
///     .query("page", 0);
/// assert_eq!(req.path(), "/notices");
/// assert_eq!(req.query_pairs().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    authenticated: bool,
}

impl ApiRequest {
    /// Start a request with an arbitrary method.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            authenticated: true,
        }
    }

    /// `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append several query parameters.
    pub fn query_all(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Send without credentials and pass a 401 straight back to the caller.
    ///
    /// Used for the login exchange, where a 401 means bad credentials rather
    /// than an expired session.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base address.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Extra headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Whether the bearer credential is attached and 401s are recovered.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    /// Wrap a status and body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Raw body.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Server-provided top-level `message`, if any.
    pub fn message(&self) -> Option<String> {
        extract_message(&self.body)
    }

    /// Decode the body as an enveloped or bare payload.
    pub fn envelope<T: DeserializeOwned>(&self) -> Result<ApiResult<T>, GatewayError> {
        Ok(ApiResult::from_slice(&self.body)?)
    }

    /// Decode the payload, turning `success: false` into
    /// [`GatewayError::Rejected`].
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        self.envelope()?
            .into_result()
            .map_err(GatewayError::Rejected)
    }

    /// Turn a non-success status into the matching error.
    pub fn error_for_status(self) -> Result<Self, GatewayError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(GatewayError::from_status(self.status, self.message()))
        }
    }
}
