use serde::de::DeserializeOwned;
use std::fs;

use crate::error::Result;

/// Reads a JSON file and deserializes it into `T`.
///
/// Startup uses this for the static provisioning snapshot (topology plus host
/// bindings); it works for any type the `api` DTOs describe.
///
/// # Returns
/// Returns the parsed value, `IoError` if the file cannot be read, or
/// `DeserializationError` if the content is not valid JSON for `T`.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&data)?)
}
