//! Input validation utilities
//!
//! Free-text read group values must be printable ASCII (`^[ -~]+$`): every byte in
//! `0x20..=0x7E`, at least one byte long. Field validation collects every failure so that
//! a caller can report all bad fields in one pass.
//!
//! File checks run after field validation and before anything is opened or created.

use crate::errors::{Result, RgError};
use std::fmt::Display;
use std::fs::File;
use std::io;
use std::path::Path;

/// The pattern free-text values must match, as shown in error messages.
pub const TAG_VALUE_PATTERN: &str = "^[ -~]+$";

/// Returns true if `value` is non-empty and every byte is printable ASCII (space through `~`).
///
/// # Example
/// ```
/// use fgrg_lib::validation::is_valid_tag_value;
///
/// assert!(is_valid_tag_value("lib one"));
/// assert!(!is_valid_tag_value("lib\none"));
/// assert!(!is_valid_tag_value(""));
/// ```
#[must_use]
pub fn is_valid_tag_value(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Checks a single field, returning the failure message if it is invalid.
#[must_use]
pub fn check_tag_value(field: &str, value: &str) -> Option<String> {
    if is_valid_tag_value(value) {
        None
    } else {
        Some(format!("{field} must match {TAG_VALUE_PATTERN}, got: {value:?}"))
    }
}

/// Validate a set of optional free-text fields.
///
/// Absent fields (`None`) are skipped; an empty string is present and therefore invalid.
///
/// # Errors
/// Returns `InvalidTagValues` carrying a message for every failing field
///
/// # Example
/// ```
/// use fgrg_lib::validation::validate_tag_values;
///
/// let fields = [("ID", Some("rg1")), ("DS", None), ("LB", Some("bad\tlib")), ("SM", Some(""))];
/// let err = validate_tag_values(fields).unwrap_err().to_string();
/// assert!(err.contains("LB"));
/// assert!(err.contains("SM"));
/// ```
pub fn validate_tag_values<'a, I>(fields: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let messages: Vec<String> = fields
        .into_iter()
        .filter_map(|(field, value)| value.and_then(|v| check_tag_value(field, v)))
        .collect();
    if messages.is_empty() { Ok(()) } else { Err(RgError::InvalidTagValues { messages }) }
}

/// Validate that a value is positive
///
/// # Errors
/// Returns `InvalidParameter` if `value` is zero or negative
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(RgError::invalid_parameter(name, format!("Must be positive (> 0), got: {value}")));
    }
    Ok(())
}

/// Validate that the input exists, is a regular file and can be opened for reading
///
/// # Errors
/// Returns a `Source` error otherwise
pub fn validate_input_readable<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let source_error =
        |source: io::Error| RgError::Source { path: path.to_path_buf(), source };

    if !path.exists() {
        return Err(source_error(io::Error::new(io::ErrorKind::NotFound, "File does not exist")));
    }
    if path.is_dir() {
        return Err(source_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Path is a directory",
        )));
    }
    File::open(path).map(drop).map_err(source_error)
}

/// Validate that the output can be created: its parent directory exists and the path itself
/// is not a directory
///
/// # Errors
/// Returns `InvalidParameter` naming the output otherwise
pub fn validate_output_writable<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Err(RgError::invalid_parameter(
            "output",
            format!("{} is a directory", path.display()),
        ));
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(RgError::invalid_parameter(
            "output",
            format!("Parent directory does not exist: {}", parent.display()),
        ));
    }
    Ok(())
}
