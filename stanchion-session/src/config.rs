//! Session store configuration.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One database server endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAddress {
    /// Host name or address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Username, if the endpoint requires authentication.
    pub username: Option<String>,
    /// Password, if the endpoint requires authentication.
    pub password: Option<String>,
}

impl ServerAddress {
    /// Create an unauthenticated endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Attach credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Session store configuration.
///
/// `database` and `collection` are mandatory; everything else has a
/// serviceable default. Cookie attributes are carried for the host's cookie
/// layer; this crate never issues cookies itself.
///
/// # Examples
///
/// ```
/// use stanchion_session::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new("app", "sessions")
///     .unwrap()
///     .with_lifetime(Duration::from_secs(1800))
///     .with_cookie_domain("example.com");
/// assert_eq!(config.collection, "sessions");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Database name. Required.
    pub database: String,
    /// Collection name. Required.
    pub collection: String,
    /// Server endpoints.
    pub servers: Vec<ServerAddress>,
    /// Replica set name, when connecting to one.
    pub replica_set: Option<String>,
    /// Session cookie name.
    pub session_name: String,
    /// Cookie path attribute.
    pub cookie_path: String,
    /// Cookie domain attribute.
    pub cookie_domain: Option<String>,
    /// Session lifetime; refreshed on every write.
    pub lifetime: Duration,
    /// Total wait budget for one lock acquisition.
    pub lock_wait: Duration,
    /// First backoff delay after a contended attempt.
    pub lock_initial_delay: Duration,
    /// Backoff delay ceiling.
    pub lock_max_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            collection: String::new(),
            servers: vec![ServerAddress::new("localhost", 27017)],
            replica_set: None,
            session_name: "session".to_string(),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            lifetime: Duration::from_secs(3600),
            lock_wait: Duration::from_secs(30),
            lock_initial_delay: Duration::from_millis(5),
            lock_max_delay: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Create a configuration for the given database and collection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] when either name is empty; no
    /// session handling is possible without them.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> SessionResult<Self> {
        let config = Self {
            database: database.into(),
            collection: collection.into(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a usable configuration must hold.
    pub fn validate(&self) -> SessionResult<()> {
        if self.database.is_empty() {
            return Err(SessionError::Config("database name is required".to_string()));
        }
        if self.collection.is_empty() {
            return Err(SessionError::Config(
                "collection name is required".to_string(),
            ));
        }
        if self.servers.is_empty() {
            return Err(SessionError::Config(
                "at least one server endpoint is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the server endpoint list.
    pub fn with_servers(mut self, servers: Vec<ServerAddress>) -> Self {
        self.servers = servers;
        self
    }

    /// Set the replica set name.
    pub fn with_replica_set(mut self, name: impl Into<String>) -> Self {
        self.replica_set = Some(name.into());
        self
    }

    /// Set the session cookie name.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Set the cookie path attribute.
    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set the cookie domain attribute.
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the session lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the total lock wait budget.
    pub fn with_lock_wait(mut self, budget: Duration) -> Self {
        self.lock_wait = budget;
        self
    }

    /// Set the initial and maximum backoff delays.
    pub fn with_lock_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.lock_initial_delay = initial;
        self.lock_max_delay = max;
        self
    }
}
