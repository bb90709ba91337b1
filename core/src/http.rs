//! Plain HTTP values shared by the client and transports.
//!
//! # Design
//! Header and query values arrive loosely typed (strings, numbers, booleans,
//! null, undefined) and are only stringified at the wire boundary. `Scalar`
//! keeps that looseness explicit so the two filters applied later stay
//! honest: headers drop null/undefined/false, query params drop anything
//! falsy. `Fields` keeps insertion order because headers are set on the
//! transport one at a time in mapping order.

use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

/// HTTP method accepted by `FetchPlease::request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = FetchError;

    /// Case-sensitive: `get` is rejected just like `FETCH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(FetchError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loosely typed header or query-parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Undefined,
}

impl Scalar {
    /// Whether a header with this value is transmitted at all.
    pub fn is_sendable(&self) -> bool {
        !matches!(self, Scalar::Null | Scalar::Undefined | Scalar::Bool(false))
    }

    /// Truthiness used by the query builder: `0`, `NaN`, `""`, `false`,
    /// null and undefined are all excluded.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Str(s) => !s.is_empty(),
            Scalar::Num(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Bool(b) => *b,
            Scalar::Null | Scalar::Undefined => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Num(n) => fmt_number(*n, f),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Null => f.write_str("null"),
            Scalar::Undefined => f.write_str("undefined"),
        }
    }
}

/// Number formatting that matches what a browser puts on the wire:
/// `1` rather than `1.0`, `Infinity` rather than `inf`, and exponent form
/// (`1e+21`, `1e-7`) outside `1e-6 <= |n| < 1e21`.
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        return f.write_str("0");
    }
    let abs = n.abs();
    if !(1e-6..1e21).contains(&abs) {
        let exp = format!("{n:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                write!(f, "{mantissa}e+{power}")
            }
            _ => f.write_str(&exp),
        };
    }
    write!(f, "{n}")
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Num(value)
    }
}

// Integers become `f64` like any JavaScript number; magnitudes above 2^53
// round to the nearest representable value.
macro_rules! scalar_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Scalar {
            fn from(value: $t) -> Self {
                Scalar::Num(value as f64)
            }
        })*
    };
}

scalar_from_int!(i32, i64, u16, u32, u64, usize);

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

/// Insertion-ordered, string-keyed mapping of `Scalar` values.
///
/// Re-inserting an existing key replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Scalar)>,
}

/// Request headers.
pub type Headers = Fields;

/// Query-string parameters.
pub type Params = Fields;

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chained insert, handy for literals.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries that survive header filtering, stringified, in order.
    pub fn sendable(&self) -> Vec<(String, String)> {
        self.iter()
            .filter(|(_, v)| v.is_sendable())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
