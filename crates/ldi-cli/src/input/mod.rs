pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a request from `--input <file>` or, failing that, from piped stdin.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(file::read_json(p)?)),
        None => stdin::read_stdin(),
    }
}
