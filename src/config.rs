//! Connection settings of one session.

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    client::{SessionError, SessionResult},
    protocol::DEFAULT_PORT,
};

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Endpoint, credentials, timeout and text encoding of a session.
///
/// Deserialized from JSON such as
/// `{"addr": "ftp.example.org", "username": "me", "password": "...", "timeout": 10}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Seconds, fractions allowed
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Encoding label such as `latin1` or `gbk`. Empty or absent means UTF-8
    #[serde(default)]
    pub encoding: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> f64 {
    10.0
}

impl SessionConfig {
    pub fn new<T: Into<String>>(addr: T) -> Self {
        Self {
            addr: addr.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            timeout: default_timeout(),
            encoding: None,
        }
    }

    /// Loads the settings from a JSON file. A leading `~` is expanded to the
    /// home directory.
    pub fn from_json<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let path = expand_home(path.as_ref());
        let text = fs::read_to_string(&path).map_err(|source| SessionError::LocalIo {
            path: path.clone(),
            source,
        })?;

        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> SessionResult<Self> {
        serde_json::from_str(text).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Reply and data timeout, which must be positive
    pub fn timeout(&self) -> SessionResult<Duration> {
        match Duration::try_from_secs_f64(self.timeout) {
            Ok(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(SessionError::Config(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout
            ))),
        }
    }

    /// Resolves the configured encoding label
    pub fn encoding(&self) -> SessionResult<&'static Encoding> {
        match self.encoding.as_deref().map(str::trim) {
            None | Some("") => Ok(encoding_rs::UTF_8),
            Some(label) => Encoding::for_label(label.as_bytes())
                .ok_or_else(|| SessionError::Config(format!("unknown encoding {label:?}"))),
        }
    }

    /// User and password sent at login, anonymous when no user is set
    pub fn credentials(&self) -> (&str, &str) {
        if self.username.is_empty() {
            (ANONYMOUS_USER, ANONYMOUS_PASSWORD)
        } else {
            (&self.username, &self.password)
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
