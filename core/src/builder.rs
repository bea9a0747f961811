//! Turns an `OperationDescriptor` into an `HttpRequest`.
//!
//! # Design
//! Pure function of configuration and descriptor. Malformed descriptors fail
//! with `ApiError::InvalidDescriptor` before anything reaches the network.
//! The target is always `base URL + path`; templates carrying a scheme or
//! host are rejected.

use crate::config::EndpointConfig;
use crate::descriptor::{Body, OperationDescriptor};
use crate::error::ApiError;
use crate::http::HttpRequest;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Build the outbound request for `descriptor` against `config`.
pub fn build(config: &EndpointConfig, descriptor: &OperationDescriptor) -> Result<HttpRequest, ApiError> {
    let path = expand_path(&descriptor.path_template, &descriptor.path_params)?;
    let query = encode_query(&descriptor.query);

    let mut headers = vec![
        (CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()),
        (ACCEPT.to_string(), APPLICATION_JSON.to_string()),
    ];
    for (name, value) in &descriptor.headers {
        check_header(name, value)?;
        set_header(&mut headers, name, value);
    }

    let body = match &descriptor.body {
        Body::Json(value) => Some(value.to_string()),
        Body::Form(fields) => {
            set_header(&mut headers, CONTENT_TYPE, FORM_URLENCODED);
            let encoded = serde_urlencoded::to_string(fields)
                .map_err(|e| ApiError::InvalidDescriptor(format!("form encoding failed: {e}")))?;
            Some(encoded)
        }
        Body::None => None,
    };

    Ok(HttpRequest {
        method: descriptor.method,
        path: format!("{}{path}{query}", config.base_url()),
        headers,
        body,
    })
}

/// Substitute every `{name}` placeholder with its percent-encoded binding.
///
/// Every placeholder must be bound and every binding must be used.
pub fn expand_path(template: &str, params: &[(String, String)]) -> Result<String, ApiError> {
    if !template.starts_with('/') || template.contains("://") {
        return Err(ApiError::InvalidDescriptor(format!(
            "path template '{template}' must be a relative path starting with '/'"
        )));
    }

    let mut used = vec![false; params.len()];
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            ApiError::InvalidDescriptor(format!("unterminated placeholder in '{template}'"))
        })?;
        let name = &after[..close];
        if name.is_empty() || name.contains('{') {
            return Err(ApiError::InvalidDescriptor(format!(
                "malformed placeholder in '{template}'"
            )));
        }
        let idx = params
            .iter()
            .position(|(k, _)| k == name)
            .ok_or_else(|| ApiError::InvalidDescriptor(format!("unbound placeholder {{{name}}}")))?;
        used[idx] = true;
        out.push_str(&urlencoding::encode(&params[idx].1));
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(ApiError::InvalidDescriptor(format!(
            "stray '}}' in '{template}'"
        )));
    }
    out.push_str(rest);

    if let Some(pos) = used.iter().position(|u| !u) {
        return Err(ApiError::InvalidDescriptor(format!(
            "binding '{}' has no placeholder in '{template}'",
            params[pos].0
        )));
    }
    Ok(out)
}

/// Encode bound query parameters in order, dropping absent values. Returns an
/// empty string when nothing is bound.
fn encode_query(query: &[(String, Option<String>)]) -> String {
    let pairs: Vec<String> = query
        .iter()
        .filter_map(|(k, v)| {
            v.as_ref()
                .map(|v| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

/// Reject header names and values that could not go on the wire.
fn check_header(name: &str, value: &str) -> Result<(), ApiError> {
    ::http::HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::InvalidDescriptor(format!("invalid header name '{name}': {e}")))?;
    ::http::HeaderValue::from_str(value)
        .map_err(|e| ApiError::InvalidDescriptor(format!("invalid value for header '{name}': {e}")))?;
    Ok(())
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}
