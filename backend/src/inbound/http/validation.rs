//! Shared request parsing helpers for inbound HTTP adapters.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::Error;

/// Partial update body split into the keys the client sent and their typed
/// form.
///
/// Optimistic concurrency compares the sent keys against recent history, so
/// the raw key set has to survive deserialisation.
#[derive(Debug)]
pub(crate) struct Patch<T> {
    pub fields: BTreeSet<String>,
    pub version: Option<Value>,
    pub body: T,
}

impl<T: DeserializeOwned> Patch<T> {
    /// Split a JSON object into its key set and typed body.
    ///
    /// # Errors
    /// Returns an invalid-request error when the object does not match `T`.
    pub(crate) fn parse(object: Map<String, Value>) -> Result<Self, Error> {
        let fields = object.keys().cloned().collect();
        let version = object.get("version").cloned();
        let body = serde_json::from_value(Value::Object(object))
            .map_err(|err| Error::invalid_request(format!("Invalid JSON body: {err}")))?;
        Ok(Self {
            fields,
            version,
            body,
        })
    }
}

/// Parse a `0|1|true|false` query flag.
///
/// # Errors
/// Returns an invalid-request error naming `field` for any other value.
pub(crate) fn parse_flag(field: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::invalid_field(
            field,
            "invalid_flag",
            format!("{field} must be one of 0, 1, true or false"),
        )),
    }
}

/// Require an optional payload field.
///
/// # Errors
/// Returns an invalid-request error naming `field` when it is absent.
pub(crate) fn required<T>(field: &str, value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| {
        Error::invalid_field(field, "required", format!("{field}: This field is required."))
    })
}
