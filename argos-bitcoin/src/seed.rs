use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::net::lookup_host;
use tracing::debug;

use argos_sniffer::{NodeAddr, SeedError, SeedProvider};

/// Port used when a seed entry carries none.
pub const DEFAULT_PORT: u16 = 8333;

// DNS hosts hardcoded in the Bitcoin Core repository. On a first start no
// addresses of active full nodes are known; these names resolve to nodes
// that may accept new incoming connections.
const SEED_HOSTS: &[&str] = &[
    "seed.bitcoin.sipa.be",
    "dnsseed.bluematt.me",
    "dnsseed.bitcoin.dashjr.org",
    "seed.bitcoinstats.com",
    "seed.bitcoin.jonasschnelli.ch",
    "seed.btc.petertodd.org",
    "seed.bitcoin.sprovoost.nl",
    "dnsseed.emzy.de",
    "seed.bitcoin.wiz.biz",
];

/// Seed provider backed by the Bitcoin Core DNS seed hosts.
#[derive(Debug, Default)]
pub struct DnsSeeds;

impl DnsSeeds {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SeedProvider for DnsSeeds {
    async fn seeds(&self) -> Result<Vec<NodeAddr>, SeedError> {
        let mut nodes: Vec<NodeAddr> = Vec::new();
        for host in SEED_HOSTS {
            let resolved = lookup_host((*host, DEFAULT_PORT))
                .await
                .map_err(SeedError::Lookup)?;
            let before = nodes.len();
            nodes.extend(resolved.map(NodeAddr::from));
            debug!(host, count = nodes.len() - before, "dns seed resolved");
        }
        if nodes.is_empty() {
            return Err(SeedError::Empty);
        }
        Ok(nodes)
    }

    async fn random_address(&self) -> Result<NodeAddr, SeedError> {
        let host = SEED_HOSTS
            .choose(&mut rand::thread_rng())
            .ok_or(SeedError::Empty)?;
        let resolved: Vec<NodeAddr> = lookup_host((*host, DEFAULT_PORT))
            .await
            .map_err(SeedError::Lookup)?
            .map(NodeAddr::from)
            .collect();
        resolved
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or(SeedError::Empty)
    }
}
