use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use thiserror::Error;

use crate::addr::NodeAddr;
use crate::peer::PeerConstructor;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("protocol `{0}` already registered")]
    AlreadyRegistered(String),

    #[error("protocol `{0}` not implemented")]
    UnknownProtocol(String),
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed host lookup failed")]
    Lookup(#[source] std::io::Error),

    #[error("seed lookup produced no addresses")]
    Empty,
}

/// Source of bootstrap addresses for one protocol.
#[async_trait]
pub trait SeedProvider: Send + Sync {
    /// Every known seed address for the network.
    async fn seeds(&self) -> Result<Vec<NodeAddr>, SeedError>;

    /// One randomly chosen seed address.
    async fn random_address(&self) -> Result<NodeAddr, SeedError>;
}

/// Explicit protocol registry handed to the sniffer at construction.
///
/// Populated once during startup and read-only afterwards; registering the
/// same protocol name twice is an error rather than a silent overwrite.
#[derive(Default)]
pub struct Registry {
    constructors: HashMap<String, PeerConstructor>,
    seed_providers: HashMap<String, Arc<dyn SeedProvider>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_peer_constructor(
        &mut self,
        name: &str,
        constructor: PeerConstructor,
    ) -> Result<(), RegistryError> {
        if self.constructors.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        self.constructors.insert(name.to_string(), constructor);
        Ok(())
    }

    pub fn register_seed_provider(
        &mut self,
        name: &str,
        provider: Arc<dyn SeedProvider>,
    ) -> Result<(), RegistryError> {
        if self.seed_providers.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        self.seed_providers.insert(name.to_string(), provider);
        Ok(())
    }

    pub fn peer_constructor(&self, name: &str) -> Result<&PeerConstructor, RegistryError> {
        self.constructors
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProtocol(name.to_string()))
    }

    pub fn seed_provider(&self, name: &str) -> Result<Arc<dyn SeedProvider>, RegistryError> {
        self.seed_providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProtocol(name.to_string()))
    }

    /// Names of every protocol with a registered peer constructor.
    pub fn supported_protocols(&self) -> Vec<String> {
        self.constructors.keys().cloned().sorted().collect()
    }
}
