//! Query-string composition for GET and DELETE requests.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::http::Params;

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Append the truthy entries of `params` to `url` as an encoded query string.
///
/// Falsy values (`0`, `""`, `false`, null, undefined) are dropped. Trailing
/// `?` characters are stripped before joining with `?` or `&`. If nothing
/// survives the filter, `url` comes back unchanged.
pub fn build(url: &str, params: &Params) -> String {
    let query = params
        .iter()
        .filter(|(_, value)| value.is_truthy())
        .map(|(key, value)| format!("{}={}", encode(key), encode(&value.to_string())))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        return url.to_string();
    }

    let base = url.trim_end_matches('?');
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}
