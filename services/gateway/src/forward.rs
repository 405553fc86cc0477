//! HTTP client for forwarding requests to the backend services
//!
//! Downstream responses pass through unchanged, whatever their status. Only
//! transport failures (connection refused, timeout, DNS) are synthesized
//! into a 503 envelope so that clients never see a raw error.

use anyhow::Result;
use axum::{
    Json,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use common::response;

/// Fixed timeout for downstream calls
const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Base URLs of the backend services
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub auth: String,
    pub users: String,
    pub orders: String,
}

impl ServiceEndpoints {
    /// Read backend URLs from the environment, with local defaults
    ///
    /// # Environment Variables
    /// - `AUTH_SERVICE_URL` (default: "http://localhost:8001")
    /// - `USER_SERVICE_URL` (default: "http://localhost:8002")
    /// - `ORDERS_SERVICE_URL` (default: "http://localhost:8003")
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        ServiceEndpoints {
            auth: var("AUTH_SERVICE_URL", "http://localhost:8001"),
            users: var("USER_SERVICE_URL", "http://localhost:8002"),
            orders: var("ORDERS_SERVICE_URL", "http://localhost:8003"),
        }
    }
}

/// Relayed downstream response
#[derive(Debug)]
pub struct Forwarded {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Client for relaying requests to the backend services
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
}

impl ServiceClient {
    /// Create a new service client with the fixed forwarding timeout
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()?;
        Ok(ServiceClient { http })
    }

    /// Relay a request to a backend service
    ///
    /// Bodies and statuses pass through unchanged; any transport failure
    /// yields a synthesized 503 envelope.
    pub async fn forward(
        &self,
        base_url: &str,
        path: &str,
        method: Method,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> Forwarded {
        let url = format!("{}{}", base_url, path);
        info!("Forwarding {} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json");

        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Downstream call to {} failed: {}", url, e);
                return service_unavailable();
            }
        };

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

        match response.json::<Value>().await {
            Ok(body) => Forwarded { status, body },
            Err(e) => {
                warn!("Downstream response from {} was not JSON: {}", url, e);
                service_unavailable()
            }
        }
    }
}

fn service_unavailable() -> Forwarded {
    Forwarded {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: response::failure(
            "SERVICE_UNAVAILABLE",
            "Error communicating with the backend service.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_yields_503_envelope() {
        let client = ServiceClient::new().unwrap();

        // Nothing listens on port 1; the connection is refused immediately.
        let forwarded = client
            .forward("http://127.0.0.1:1", "/users", Method::GET, None, &[])
            .await;

        assert_eq!(forwarded.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(forwarded.body["success"], false);
        assert_eq!(forwarded.body["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_invalid_host_yields_503_envelope() {
        let client = ServiceClient::new().unwrap();

        let forwarded = client
            .forward(
                "http://service.invalid",
                "/orders",
                Method::POST,
                Some(serde_json::json!({"items": []})),
                &[("X-User-Id", "alice")],
            )
            .await;

        assert_eq!(forwarded.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(forwarded.body["error"]["code"], "SERVICE_UNAVAILABLE");
    }
}
