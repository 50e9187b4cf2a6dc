//! Outgoing HTTP response type.
//!
//! Handlers never build these by hand: a success value is serialized by the
//! [`Invoker`](crate::Invoker), a failure is written by the
//! [`ErrorResponder`](crate::ErrorResponder). Both end up here.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

use crate::classify::Classified;

/// An outgoing HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `application/json` response with the given status.
    ///
    /// The bytes are sent as-is; pass what `serde_json::to_vec` produced.
    pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self { status, headers, body: body.into() }
    }

    /// The JSON error envelope for a classified fault.
    pub fn from_classified(classified: &Classified) -> Self {
        // `Value`'s `Display` is compact JSON and cannot fail.
        Self::json(classified.status(), classified.body().to_string())
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_carries_classified_status_and_body() {
        let classified = Classified::new(
            json!({ "code": "CH001", "message": "bad request header" }),
            StatusCode::BAD_REQUEST,
            "CH001",
        );
        let response = Response::from_classified(&classified);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(&body, classified.body());
    }

    #[test]
    fn into_inner_keeps_everything() {
        let inner = Response::json(StatusCode::CREATED, r#"{"id":1}"#).into_inner();
        assert_eq!(inner.status(), StatusCode::CREATED);
        assert_eq!(inner.headers()[CONTENT_TYPE], "application/json");
    }
}
