//! Session connection lifecycle
//!
//! One logical session owns at most one driver connection, opened
//! lazily and closed idempotently. `&mut self` on every operation is
//! what keeps two statements from interleaving on the same connection.

use crate::error::{Error, Result};
use tokio::task::JoinHandle;
use tokio_postgres::{Config, NoTls};

struct Live {
    client: tokio_postgres::Client,
    driver: JoinHandle<()>,
}

pub(crate) struct Session {
    config: Config,
    live: Option<Live>,
}

impl Session {
    pub(crate) fn new(config: Config) -> Self {
        Self { config, live: None }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.live.is_some()
    }

    /// Open the connection if it is not already open.
    ///
    /// Idempotent: a live session is returned as-is. The driver task is
    /// spawned alongside the client and runs until the client drops.
    pub(crate) async fn connect(&mut self) -> Result<&mut tokio_postgres::Client> {
        let live = match self.live.take() {
            Some(live) => live,
            None => {
                let (client, connection) = self
                    .config
                    .connect(NoTls)
                    .await
                    .map_err(|e| Error::connection("opening session", e))?;

                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("connection driver exited with error: {e}");
                    }
                });

                tracing::debug!("session connected");
                Live { client, driver }
            }
        };
        Ok(&mut self.live.insert(live).client)
    }

    /// Close the connection.
    ///
    /// Idempotent and safe to call on a session that never opened.
    pub(crate) async fn close(&mut self) {
        if let Some(live) = self.live.take() {
            drop(live.client);
            // The driver finishes once the client is gone; surfacing its
            // exit here keeps close deterministic for tests.
            let _ = live.driver.await;
            tracing::debug!("session closed");
        }
    }
}
