//! Connections and the named-connection registry
//!
//! A [`Client`] pairs a store handle with the database it is scoped to and
//! builds models bound to it. Applications that juggle several databases keep
//! their clients in a [`Registry`] they own and pass around explicitly.

use crate::clock::{Clock, SystemClock};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::model::{Model, ModelOptions, TypedModel};
use crate::model_inspect::Record;
use crate::schema::Schema;
use crate::store::DocumentStore;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Name under which the default connection is registered
pub const DEFAULT_CONNECTION: &str = "default";

/// A connected store handle scoped to one database
#[derive(Clone)]
pub struct Client {
    database: String,
    store: Arc<dyn DocumentStore>,
    index_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl Client {
    /// Verify the store answers a ping and wrap it
    pub async fn connect(store: Arc<dyn DocumentStore>, database: impl Into<String>) -> Result<Self> {
        let database = database.into();
        store.ping().await.map_err(|e| {
            log::error!("Failed to ping database '{}': {}", database, e);
            Error::Connection(format!("failed to ping store: {}", e))
        })?;
        log::info!("Connected to database '{}'", database);

        Ok(Self {
            database,
            store,
            index_timeout: crate::model::DEFAULT_INDEX_TIMEOUT,
            clock: Arc::new(SystemClock),
        })
    }

    /// Connect using the `[database]` section of the configuration
    pub async fn from_config(store: Arc<dyn DocumentStore>, config: &DatabaseConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.index_timeout_ms);
        let client = if config.ping_on_connect {
            Self::connect(store, config.name.clone()).await?
        } else {
            log::info!("Using database '{}' without ping", config.name);
            Self {
                database: config.name.clone(),
                store,
                index_timeout: crate::model::DEFAULT_INDEX_TIMEOUT,
                clock: Arc::new(SystemClock),
            }
        };
        Ok(client.with_index_timeout(timeout))
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    fn model_options(&self) -> ModelOptions {
        ModelOptions::default()
            .with_clock(Arc::clone(&self.clock))
            .with_index_timeout(self.index_timeout)
    }

    /// Untyped model bound to this connection
    pub async fn model(&self, name: impl Into<String>, schema: Schema) -> Result<Model> {
        Model::with_options(name, schema, Some(self.store()), self.model_options()).await
    }

    /// Typed model bound to this connection, with update revalidation enabled
    pub async fn typed_model<T: Record>(
        &self,
        name: impl Into<String>,
        schema: Schema,
    ) -> Result<TypedModel<T>> {
        TypedModel::with_options(name, schema, Some(self.store()), self.model_options()).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.store.close().await.map_err(|e| {
            log::error!("Failed to disconnect from database '{}': {}", self.database, e);
            Error::Connection(format!("failed to disconnect: {}", e))
        })?;
        log::info!("Disconnected from database '{}'", self.database);
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("database", &self.database)
            .field("index_timeout", &self.index_timeout)
            .finish()
    }
}

/// Named clients
///
/// # Example
///
/// ```rust,ignore
/// let registry = Registry::new();
/// registry.register(DEFAULT_CONNECTION, Client::connect(store, "app").await?)?;
/// let users = registry.default_client().unwrap().typed_model::<User>("User", schema).await?;
/// ```
#[derive(Default)]
pub struct Registry {
    clients: RwLock<HashMap<String, Client>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` under `name`, returning the client it replaced
    pub fn register(&self, name: &str, client: Client) -> Result<Option<Client>> {
        if name.is_empty() {
            return Err(Error::validation("connection name cannot be empty"));
        }
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        Ok(clients.insert(name.to_string(), client))
    }

    /// Connect with `config` and register the client under `config.connection_name`
    pub async fn connect_from_config(
        &self,
        store: Arc<dyn DocumentStore>,
        config: &DatabaseConfig,
    ) -> Result<Client> {
        let client = Client::from_config(store, config).await?;
        if self.register(&config.connection_name, client.clone())?.is_some() {
            log::warn!("Replaced existing connection '{}'", config.connection_name);
        }
        Ok(client)
    }

    pub fn get(&self, name: &str) -> Option<Client> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.get(name).cloned()
    }

    pub fn default_client(&self) -> Option<Client> {
        self.get(DEFAULT_CONNECTION)
    }

    pub fn remove(&self, name: &str) -> Option<Client> {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove and disconnect one client
    pub async fn disconnect(&self, name: &str) -> Result<()> {
        let client = self
            .remove(name)
            .ok_or_else(|| Error::Connection(format!("no connection named '{}'", name)))?;
        client.disconnect().await
    }

    /// Disconnect every client; the first failure is returned after all were tried
    pub async fn disconnect_all(&self) -> Result<()> {
        let drained: Vec<(String, Client)> = {
            let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
            clients.drain().collect()
        };

        let mut first_error = None;
        for (name, client) in drained {
            if let Err(e) = client.disconnect().await {
                log::warn!("Failed to disconnect '{}': {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = Registry::new();
        let client = Client::connect(Arc::new(MemoryStore::new()), "app").await.unwrap();

        assert!(registry.register("", client.clone()).unwrap_err().is_validation());
        assert!(registry.register(DEFAULT_CONNECTION, client.clone()).unwrap().is_none());
        registry.register("analytics", client).unwrap();

        assert_eq!(registry.names(), vec!["analytics".to_string(), "default".to_string()]);
        assert_eq!(registry.default_client().map(|c| c.database().to_string()), Some("app".into()));

        registry.disconnect("analytics").await.unwrap();
        assert!(registry.disconnect("analytics").await.unwrap_err().is_connection());

        registry.disconnect_all().await.unwrap();
        assert!(registry.names().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_uses_index_timeout() {
        let config = DatabaseConfig { index_timeout_ms: 250, ..DatabaseConfig::default() };
        let client = Client::from_config(Arc::new(MemoryStore::new()), &config).await.unwrap();
        assert_eq!(client.index_timeout, Duration::from_millis(250));
        assert_eq!(client.database(), config.name);
    }

    #[tokio::test]
    async fn test_connect_from_config_registers_under_connection_name() {
        let registry = Registry::new();
        let config = DatabaseConfig {
            name: "reporting".to_string(),
            connection_name: "analytics".to_string(),
            ..DatabaseConfig::default()
        };
        registry.connect_from_config(Arc::new(MemoryStore::new()), &config).await.unwrap();

        assert_eq!(registry.names(), vec!["analytics".to_string()]);
        assert!(registry.default_client().is_none());
        assert_eq!(registry.get("analytics").map(|c| c.database().to_string()), Some("reporting".into()));

        registry
            .connect_from_config(Arc::new(MemoryStore::new()), &DatabaseConfig::default())
            .await
            .unwrap();
        assert_eq!(registry.default_client().map(|c| c.database().to_string()), Some("ferrodoc".into()));
    }
}
