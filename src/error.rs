use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;

use crate::vra::ErrorEnvelope;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to find configfile {0:?}")]
    ConfigNotFound(PathBuf),
    #[error("Unable to read configfile {path:?}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to parse configfile {path:?}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Unable to create {0:?}, file or directory already exists")]
    ConfigExists(PathBuf),
    #[error("Unable to write {path:?}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("zero-length string `{0}`")]
    EmptyValue(&'static str),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Unexpected HTTP response status code {}, {message}", .status.as_u16())]
    UnexpectedStatus { status: StatusCode, message: String },
    #[error("Unable to parse {what} response")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("Unable to find Catalog Resource id for virtual machine {0:?}")]
    ResourceNotFound(String),
    #[error("Found {count} Catalog Resources for virtual machine {name:?}, expected one")]
    AmbiguousResource { name: String, count: usize },
    #[error("Unable to find Create Snapshot Action id")]
    ActionNotFound,
    #[error("Snapshot request failed, check the vRA portal for more info")]
    RequestFailed,
    #[error("Snapshot request still {state:?} after {waited:?}, giving up")]
    PollTimeout { state: String, waited: Duration },
}

impl Error {
    /// Message followed by every underlying cause, one per line.
    pub fn detailed_message(&self) -> String {
        use std::error::Error as _;

        let mut details = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

static H1_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<h1>(.*?)</h1>").unwrap());

/// Pulls a readable message out of an error response body.
///
/// vRA answers API errors with a JSON envelope and gateway errors with an HTML page,
/// so both are tried before falling back to the reason phrase.
pub fn platform_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.first_message() {
            return message;
        }
    }

    if let Some(captures) = H1_TITLE.captures(body) {
        let title = captures[1].trim();
        if !title.is_empty() {
            return title.to_string();
        }
    }

    status
        .canonical_reason()
        .unwrap_or("no error message in response")
        .to_string()
}

/// Rejects blank values the same way for config fields and response fields.
pub fn require_non_blank(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::EmptyValue(name));
    }
    Ok(())
}
