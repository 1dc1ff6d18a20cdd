//! AWS Signature Version 4
//!
//! Thin wrapper over `aws-sigv4`: signs a single request (method, URL,
//! headers, body) and returns the headers that must be attached to it.

use crate::error::{QueryError, Result};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{self, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use std::time::SystemTime;
use url::Url;

/// Inputs describing the request being signed
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: SystemTime,
}

fn signing_error(e: impl std::fmt::Display) -> QueryError {
    QueryError::Credentials(format!("request signing failed: {}", e))
}

/// Sign a request.
///
/// `headers` holds every header that should be signed besides `host`.
/// Returns the full list of headers to send: the given ones plus
/// `x-amz-date`, `authorization` and, for temporary credentials,
/// `x-amz-security-token`.
pub fn sign(
    params: &SigningParams<'_>,
    method: &str,
    url: &Url,
    headers: &[(&str, String)],
    body: &[u8],
) -> Result<Vec<(String, String)>> {
    let identity: Identity = params.credentials.clone().into();
    let signing_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(params.region)
        .name(params.service)
        .time(params.time)
        .settings(SigningSettings::default())
        .build()
        .map_err(signing_error)?
        .into();

    let request = SignableRequest::new(
        method,
        url.as_str(),
        headers.iter().map(|(k, v)| (*k, v.as_str())),
        SignableBody::Bytes(body),
    )
    .map_err(signing_error)?;

    let (instructions, _signature) = http_request::sign(request, &signing_params)
        .map_err(signing_error)?
        .into_parts();

    let mut out: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    out.extend(
        instructions
            .headers()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
    Ok(out)
}
