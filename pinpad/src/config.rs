//! Connection parameters and engine tuning.

use std::path::Path;
use std::time::Duration;
use std::{fs, io};

use pinpad_proto::DEFAULT_STALE_AFTER;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default terminal host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default terminal port.
pub const DEFAULT_PORT: u16 = 2011;

/// Default bound on [`Engine::do_hide_dialogs`](crate::Engine::do_hide_dialogs).
pub const DEFAULT_HIDE_DIALOGS_TIMEOUT: Duration = Duration::from_millis(2000);

/// Where and how to reach the terminal.
///
/// Read once per connect attempt; changes apply to the next connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ConnectionParams {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Wrap the connection in TLS.
    pub tls: bool,
    /// Enable TCP keep-alive.
    pub keep_alive: bool,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            tls: false,
            keep_alive: false,
        }
    }
}

impl ConnectionParams {
    /// Parameters for `host:port` with TLS and keep-alive off.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Enables or disables TLS.
    #[must_use]
    pub const fn tls(mut self, enable: bool) -> Self {
        self.tls = enable;
        self
    }

    /// Enables or disables TCP keep-alive.
    #[must_use]
    pub const fn keep_alive(mut self, enable: bool) -> Self {
        self.keep_alive = enable;
        self
    }

    /// Loads parameters from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io) if the file cannot be read or is not
    /// valid JSON; the latter carries [`io::ErrorKind::InvalidData`].
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let params = serde_json::from_str(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(params)
    }
}

/// Timing and delivery behaviour of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Idle gap after which a partially received frame is dropped.
    pub stale_after: Duration,
    /// How long [`do_hide_dialogs`](crate::Engine::do_hide_dialogs) waits
    /// for the terminal's acknowledgement.
    pub hide_dialogs_timeout: Duration,
    /// Deliver responses through the scheduler captured at request time.
    pub use_scheduler_for_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            hide_dialogs_timeout: DEFAULT_HIDE_DIALOGS_TIMEOUT,
            use_scheduler_for_events: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn load_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terminal.json");
        fs::write(&path, r#"{"host":"10.0.0.7","keep_alive":true}"#).unwrap();

        let params = ConnectionParams::load(&path).unwrap();
        assert_eq!(params.host, "10.0.0.7");
        assert_eq!(params.port, DEFAULT_PORT);
        assert!(params.keep_alive);
        assert!(!params.tls);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terminal.json");
        fs::write(&path, "port = 2011").unwrap();

        let err = ConnectionParams::load(&path).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = ConnectionParams::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }
}
