//! Caller-built description of one outbound call.

use serde::Serialize;

use crate::error::ApiError;
use crate::http::HttpMethod;

/// How the request body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    FormUrlEncoded,
    None,
}

/// Request body together with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    None,
}

impl Body {
    pub fn encoding(&self) -> BodyEncoding {
        match self {
            Body::Json(_) => BodyEncoding::Json,
            Body::Form(_) => BodyEncoding::FormUrlEncoded,
            Body::None => BodyEncoding::None,
        }
    }
}

/// Method, path template, bindings and body of a single call.
///
/// Path bindings keep insertion order. Query and header keys are unique:
/// binding an existing key replaces the value in place. Header keys compare
/// case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub method: HttpMethod,
    pub path_template: String,
    pub path_params: Vec<(String, String)>,
    pub query: Vec<(String, Option<String>)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl OperationDescriptor {
    pub fn new(method: HttpMethod, path_template: impl Into<String>) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            path_params: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::None,
        }
    }

    pub fn get(path_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path_template)
    }

    pub fn post(path_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path_template)
    }

    pub fn put(path_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path_template)
    }

    pub fn patch(path_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path_template)
    }

    pub fn delete(path_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path_template)
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.push((name.into(), value.to_string()));
        self
    }

    /// Bind a query parameter. `None` values are dropped when the request is
    /// built.
    pub fn query<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        let key = key.into();
        let value = value.map(|v| v.to_string());
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |desc, (k, v)| desc.header(k, v))
    }

    /// Attach a JSON body. Serialization failure is a caller error.
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| ApiError::InvalidDescriptor(format!("body serialization failed: {e}")))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }

    pub fn encoding(&self) -> BodyEncoding {
        self.body.encoding()
    }
}
