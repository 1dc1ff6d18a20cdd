//! HTTP utilities for signed AWS API calls
//!
//! Two wire protocols are used: the Query protocol (form-encoded POST,
//! XML response) for EC2 and STS, and the JSON protocol for Resource
//! Explorer.

use super::sigv4::{self, SigningParams};
use super::xml;
use crate::error::{QueryError, Result};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Sanitize response body for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Form-encode Query protocol parameters
pub fn encode_form(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// HTTP client wrapper for AWS API calls
#[derive(Clone)]
pub struct AwsHttpClient {
    client: Client,
}

impl AwsHttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("awsql/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Call a Query protocol action and return the raw XML body
    pub async fn post_query(
        &self,
        url: &Url,
        signing: &SigningParams<'_>,
        params: &[(String, String)],
    ) -> Result<String> {
        let body = encode_form(params);
        let (status, headers, text) = self
            .send(url, signing, FORM_CONTENT_TYPE, body.into_bytes())
            .await?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            let (code, message) = xml::parse_error(&text)
                .or_else(|| error_from_headers(&headers))
                .unwrap_or_else(|| (status.to_string(), "request failed".to_string()));
            return Err(QueryError::Api {
                service: signing.service.to_string(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(text)
    }

    /// Call a JSON protocol operation
    pub async fn post_json(
        &self,
        url: &Url,
        signing: &SigningParams<'_>,
        body: &Value,
    ) -> Result<Value> {
        let payload = serde_json::to_vec(body).map_err(|e| QueryError::decode("request", e))?;
        let (status, headers, text) = self
            .send(url, signing, JSON_CONTENT_TYPE, payload)
            .await?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            let (code, message) = parse_json_error(&headers, &text)
                .unwrap_or_else(|| (status.to_string(), "request failed".to_string()));
            return Err(QueryError::Api {
                service: signing.service.to_string(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        // Handle empty response
        if text.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| QueryError::decode("response JSON", e))
    }

    async fn send(
        &self,
        url: &Url,
        signing: &SigningParams<'_>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(reqwest::StatusCode, HeaderMap, String)> {
        tracing::debug!("POST {} ({})", url, signing.service);

        let to_sign = [("content-type", content_type.to_string())];
        let headers = sigv4::sign(signing, "POST", url, &to_sign, &body)?;

        let mut request = self.client.post(url.clone());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        Ok((status, headers, text))
    }
}

/// `x-amzn-ErrorType: Code:http://internal.amazon.com/...`
fn error_from_headers(headers: &HeaderMap) -> Option<(String, String)> {
    let raw = headers.get("x-amzn-errortype")?.to_str().ok()?;
    let code = raw.split(':').next().unwrap_or(raw).to_string();
    Some((code, String::new()))
}

fn parse_json_error(headers: &HeaderMap, body: &str) -> Option<(String, String)> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if let Some((code, _)) = error_from_headers(headers) {
        return Some((code, message));
    }

    // "__type" may carry a namespace prefix: "com.amazonaws...#ValidationException"
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(|v| v.as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())?;
    Some((code, message))
}

/// Format an AWS error for display
pub fn format_aws_error(error: &QueryError) -> String {
    match error.status() {
        Some(401) | Some(403) => {
            return "Permission denied. Check your AWS credentials and IAM permissions.".to_string()
        }
        Some(404) => return "Resource not found.".to_string(),
        Some(429) => return "Rate limit exceeded. Please try again later.".to_string(),
        Some(s) if s >= 500 => {
            return "AWS service temporarily unavailable. Please try again.".to_string()
        }
        _ => {}
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
