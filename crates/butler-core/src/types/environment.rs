//! Environment types

use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Connection parameters for one named Redis deployment.
///
/// Descriptors are built once at startup and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: i64,
    /// `None` means no AUTH is sent. Empty strings are normalised to `None`.
    pub password: Option<String>,
    /// Bound on connect and on every command issued against this environment
    pub timeout: Duration,
}

impl EnvironmentDescriptor {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            database: 0,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.password.is_some()
    }

    /// `host:port/db`, safe to log
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for EnvironmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentDescriptor")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
