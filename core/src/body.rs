//! Request bodies and their serialization.
//!
//! # Design
//! `Body` is what a transport actually transmits. Callers hand the client
//! anything implementing `IntoBody`; opaque payloads (form fields, raw
//! bytes), strings and "no body" pass through untouched, everything else
//! goes through `serde_json`. A serialization failure is the only way to get
//! `FetchError::InvalidData`.

use bytes::Bytes;
use serde::Serialize;

use crate::error::FetchError;

/// A request body ready for transmission.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Null,
    Text(String),
    Form(FormData),
    Blob(Bytes),
}

impl Body {
    pub fn is_null(&self) -> bool {
        matches!(self, Body::Null)
    }

    /// Size in bytes of what goes on the wire, used for upload progress.
    pub fn len(&self) -> usize {
        match self {
            Body::Null => 0,
            Body::Text(text) => text.len(),
            Body::Form(form) => form.iter().map(|(k, v)| k.len() + v.len() + 1).sum(),
            Body::Blob(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered text fields submitted as a form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Repeated names are kept, as in an HTML form.
    pub fn append(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Wrapper marking a value to be sent as JSON.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// Conversion from caller data into a transmittable `Body`.
pub trait IntoBody {
    fn into_body(self) -> Result<Body, FetchError>;
}

impl IntoBody for Body {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(self)
    }
}

impl IntoBody for () {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(Body::Null)
    }
}

impl<T: IntoBody> IntoBody for Option<T> {
    fn into_body(self) -> Result<Body, FetchError> {
        self.map_or(Ok(Body::Null), IntoBody::into_body)
    }
}

impl IntoBody for String {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(Body::Text(self))
    }
}

impl IntoBody for &str {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(Body::Text(self.to_string()))
    }
}

impl IntoBody for FormData {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(Body::Form(self))
    }
}

impl IntoBody for Bytes {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(Body::Blob(self))
    }
}

impl IntoBody for Vec<u8> {
    fn into_body(self) -> Result<Body, FetchError> {
        Ok(Body::Blob(Bytes::from(self)))
    }
}

impl IntoBody for serde_json::Value {
    fn into_body(self) -> Result<Body, FetchError> {
        match self {
            serde_json::Value::Null => Ok(Body::Null),
            serde_json::Value::String(text) => Ok(Body::Text(text)),
            other => Json(other).into_body(),
        }
    }
}

impl<T: Serialize> IntoBody for Json<T> {
    fn into_body(self) -> Result<Body, FetchError> {
        serde_json::to_string(&self.0)
            .map(Body::Text)
            .map_err(|e| FetchError::InvalidData(e.to_string()))
    }
}
