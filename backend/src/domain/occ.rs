//! Optimistic concurrency for versioned entities.
//!
//! Clients echo the `version` they last read. A stale version is still
//! accepted when none of the fields it modifies changed since that version.

use std::collections::BTreeSet;

use serde_json::json;

use crate::domain::Error;

/// Outcome of validating the client-supplied version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// The client saw the latest version.
    Current,
    /// The client is `behind` versions behind.
    Stale { requested: i32, behind: usize },
}

fn invalid_version() -> Error {
    Error::invalid_field("version", "invalid_version", "The version is not valid")
}

/// Validate `requested` against `current`.
///
/// # Errors
/// Returns an invalid-request error when the version is missing, not an
/// integer, below 1, or above `current`.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use tracker_backend::domain::occ::{VersionCheck, check_version};
///
/// assert_eq!(check_version(Some(&json!(3)), 3).expect("valid"), VersionCheck::Current);
/// assert!(check_version(None, 3).is_err());
/// assert!(check_version(Some(&json!(4)), 3).is_err());
/// ```
pub fn check_version(
    requested: Option<&serde_json::Value>,
    current: i32,
) -> Result<VersionCheck, Error> {
    let requested = requested
        .and_then(serde_json::Value::as_i64)
        .and_then(|value| i32::try_from(value).ok())
        .ok_or_else(invalid_version)?;
    if requested < 1 || requested > current {
        return Err(invalid_version());
    }
    if requested == current {
        return Ok(VersionCheck::Current);
    }
    let behind = usize::try_from(current - requested).map_err(|_| invalid_version())?;
    Ok(VersionCheck::Stale { requested, behind })
}

/// Reject a stale write whose fields overlap recent changes.
///
/// `modified_since` holds the fields changed after the client's version;
/// `modifying` the fields in the request. `version` itself is ignored.
///
/// # Errors
/// Returns a conflict carrying the overlapping fields.
pub fn reject_conflicting_fields(
    requested: i32,
    current: i32,
    modified_since: &BTreeSet<String>,
    modifying: &BTreeSet<String>,
) -> Result<(), Error> {
    let overlap: Vec<&String> = modifying
        .intersection(modified_since)
        .filter(|field| field.as_str() != "version")
        .collect();
    if overlap.is_empty() {
        return Ok(());
    }
    Err(
        Error::conflict("The version doesn't match with the current one").with_details(json!({
            "code": "version_mismatch",
            "expected": requested,
            "actual": current,
            "fields": overlap,
        })),
    )
}
