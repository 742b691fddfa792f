//! Request executor: the sole channel for outbound backend calls.
//!
//! Transport invariants enforced here, unconditionally: the target origin
//! must be HTTPS unless it is a loopback address (checked at construction,
//! not per call), redirects are never followed, and every outcome --
//! transport failure, timeout, redirect, non-2xx status, malformed body --
//! normalizes to the uniform error shape with a bounded message.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde_json::Value;
use timecard_core::{Error, Result};
use url::Url;

#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::InvalidArgument(format!("invalid base_url: {e}")))?;
        let host = parsed.host_str().unwrap_or("").to_lowercase();
        if parsed.scheme() != "https" && !is_loopback(&host) {
            return Err(Error::InvalidArgument(format!(
                "non-HTTPS base_url is only permitted for loopback targets, got {base_url}"
            )));
        }

        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::InvalidArgument(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST without an auth header. Only the token-exchange endpoint uses
    /// this; everything else goes through [`ApiClient::execute`].
    pub(crate) async fn post_unauthenticated(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.url_for(path))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&Method::POST, path, &e))?;
        normalize(&Method::POST, path, response).await
    }

    /// Execute an authenticated request against the backend.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        token: &str,
        params: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut request = self
            .http
            .request(method.clone(), self.url_for(path))
            .header("Accept", "application/json")
            .header("Authorization", format!("Token {token}"));
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&method, path, &e))?;
        normalize(&method, path, response).await
    }
}

fn transport_error(method: &Method, path: &str, err: &reqwest::Error) -> Error {
    tracing::warn!(%method, path, error = %err, "backend transport error");
    if err.is_timeout() {
        Error::Timeout("ERP request timed out. Please try again.".into())
    } else {
        Error::backend("ERP service temporarily unavailable.", None)
    }
}

async fn normalize(method: &Method, path: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if status.is_redirection() {
        tracing::warn!(%method, path, status = status.as_u16(), "backend attempted a redirect");
        return Err(Error::backend(
            format!("API error: unexpected redirect ({})", status.as_u16()),
            Some(status.as_u16()),
        ));
    }

    let body: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        tracing::warn!(%method, path, status = status.as_u16(), "backend returned error status");
        let message = body
            .as_ref()
            .and_then(|b| {
                b.get("error")
                    .and_then(Value::as_str)
                    .or_else(|| b.get("detail").and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("API error: {}", status.as_u16()));
        return Err(Error::backend(message, Some(status.as_u16())));
    }

    match body {
        Some(value) => Ok(value),
        // Some write endpoints respond with an empty body on success.
        None if text.trim().is_empty() => Ok(Value::Null),
        None => {
            tracing::warn!(%method, path, "backend returned a non-JSON body");
            Err(Error::backend(
                "ERP backend returned a malformed response.",
                Some(status.as_u16()),
            ))
        }
    }
}

fn is_loopback(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    host.trim_matches(|c| c == '[' || c == ']')
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUTS: (Duration, Duration) = (Duration::from_secs(5), Duration::from_secs(30));

    #[test]
    fn rejects_plain_http_for_remote_hosts() {
        let err = ApiClient::new("http://erp.example.com/api", TIMEOUTS.0, TIMEOUTS.1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn permits_loopback_and_https() {
        assert!(ApiClient::new("http://localhost:8000/api", TIMEOUTS.0, TIMEOUTS.1).is_ok());
        assert!(ApiClient::new("http://127.0.0.1:8000/api", TIMEOUTS.0, TIMEOUTS.1).is_ok());
        assert!(ApiClient::new("http://[::1]:8000/api", TIMEOUTS.0, TIMEOUTS.1).is_ok());
        assert!(ApiClient::new("https://erp.example.com/api", TIMEOUTS.0, TIMEOUTS.1).is_ok());
    }

    #[test]
    fn rejects_garbage_urls() {
        assert!(ApiClient::new("not a url", TIMEOUTS.0, TIMEOUTS.1).is_err());
    }
}
