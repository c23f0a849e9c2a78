//! Build the outgoing [`HttpRequest`] for one verb call.

use super::{AuthHeader, KeyPlacement, Params};
use crate::error::{ApiError, ErrorKind, DETAIL_ERROR, DETAIL_URL};
use crate::transport::{HttpRequest, Method};

/// `base` joined with `endpoint`, which is normalized to exactly one leading slash.
pub fn join_endpoint(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

pub(crate) fn build_request(
    base: &str,
    method: Method,
    endpoint: &str,
    params: &Params,
    auth: Option<&AuthHeader>,
) -> Result<HttpRequest, ApiError> {
    let joined = join_endpoint(base, endpoint);
    let mut url = url::Url::parse(&joined).map_err(|e| {
        ApiError::new(ErrorKind::UnknownError, "Unexpected error occurred")
            .with_detail(DETAIL_URL, joined.clone())
            .with_detail(DETAIL_ERROR, e.to_string())
    })?;

    let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
    let mut query: Vec<(&str, &str)> = Vec::new();

    let body = if method.sends_body() {
        let bytes = serde_json::to_vec(params).map_err(|e| {
            ApiError::new(ErrorKind::UnknownError, "Unexpected error occurred")
                .with_detail(DETAIL_URL, joined.clone())
                .with_detail(DETAIL_ERROR, e.to_string())
        })?;
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        Some(bytes)
    } else {
        query.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        None
    };

    if let Some(auth) = auth {
        match auth.placement {
            KeyPlacement::Header => headers.push((auth.name.clone(), auth.value.clone())),
            KeyPlacement::Query => query.push((auth.name.as_str(), auth.value.as_str())),
        }
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(HttpRequest {
        method,
        url: url.into(),
        headers,
        body,
    })
}
