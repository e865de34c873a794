//! Client command lines.

use crate::config::ServerConfig;
use crate::encoding::shell_quote;
use std::fmt;

/// Invocation of the database client binary for one server and database.
///
/// The same arguments are used for direct invocations (no shell) and for
/// shell command lines, where every argument is quoted.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCommand {
    binary: String,
    host: String,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

impl ClientCommand {
    pub fn new(binary: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            host: host.into(),
            port: None,
            user: None,
            password: None,
            database: None,
        }
    }

    /// Client for the configured server, without a database.
    pub fn from_server(server: &ServerConfig) -> Self {
        Self {
            binary: server.client_binary.clone(),
            host: server.host.clone(),
            port: server.port,
            user: server.user.clone(),
            password: server.password.clone(),
            database: None,
        }
    }

    /// Same server, statements run in `database`.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Connection arguments, without the query.
    pub fn connection_args(&self) -> Vec<String> {
        let mut args = vec![format!("--host={}", self.host)];
        if let Some(port) = self.port {
            args.push(format!("--port={}", port));
        }
        if let Some(user) = &self.user {
            args.push(format!("--user={}", user));
        }
        if let Some(password) = &self.password {
            args.push(format!("--password={}", password));
        }
        if let Some(database) = &self.database {
            args.push(format!("--database={}", database));
        }
        args
    }

    /// Full argument list running `query`.
    pub fn args(&self, query: &str) -> Vec<String> {
        let mut args = self.connection_args();
        args.push(format!("--query={}", query));
        args
    }

    /// Shell command line running `query`, every word quoted.
    pub fn shell_command(&self, query: &str) -> String {
        std::iter::once(self.binary.as_str())
            .chain(self.args(query).iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCommand")
            .field("binary", &self.binary)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .finish()
    }
}
