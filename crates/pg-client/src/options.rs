//! Connection configuration

use tokio_postgres::Config;

/// The conventional PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Everything needed to open a session and generate identities.
///
/// All fields are required; the only default is the conventional port.
/// The machine id must be distinct per writer deployment or generated
/// identities can collide across processes.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub machine_id: u16,
}

impl ClientOptions {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        machine_id: u16,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            machine_id,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Driver-level connection config. Built structurally, never by
    /// string concatenation.
    pub(crate) fn pg_config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.username)
            .password(&self.password)
            .application_name("fjord");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_to_conventional() {
        let options = ClientOptions::new("db.local", "app", "svc", "secret", 3);
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.with_port(5433).port, 5433);
    }

    #[test]
    fn config_carries_all_fields() {
        let config = ClientOptions::new("db.local", "app", "svc", "secret", 3)
            .with_port(5433)
            .pg_config();

        assert_eq!(config.get_dbname(), Some("app"));
        assert_eq!(config.get_user(), Some("svc"));
        assert_eq!(config.get_ports(), &[5433]);
    }
}
