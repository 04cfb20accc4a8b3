// src/client.rs
// Process-level entry point: owns the databases

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::ClientConfig;
use crate::database::Database;
use crate::error::{DocLiteError, Result};

#[derive(Debug, Default)]
struct ClientInner {
    config: ClientConfig,
    databases: DashMap<String, Database>,
    closed: AtomicBool,
}

/// Entry point of the store. Cheap to clone; clones share every database.
#[derive(Debug, Clone, Default)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Client {
            inner: Arc::new(ClientInner {
                config,
                ..Default::default()
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a database, creating it on first reference
    pub fn database(&self, name: &str) -> Result<Database> {
        if self.is_closed() {
            return Err(DocLiteError::ClientClosed);
        }
        if name.is_empty() {
            return Err(DocLiteError::invalid("database name cannot be empty"));
        }

        let id_generation = self.inner.config.id_generation;
        let db = self
            .inner
            .databases
            .entry(name.to_string())
            .or_insert_with(|| {
                log::debug!("creating database {}", name);
                Database::new(name, id_generation)
            })
            .clone();
        Ok(db)
    }

    /// Database names in sorted order
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.databases.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Crate version
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Stop handing out databases. Handles already obtained keep working.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            log::info!("client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}
