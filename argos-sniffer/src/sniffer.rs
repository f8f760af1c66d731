use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::SystemTime;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use argos_graph::Graph;

use crate::addr::NodeAddr;
use crate::estimate::{self, Method, Report, OBSERVATION_THRESHOLD};
use crate::peer::{Courier, Halter, TransactionNotify, TxId};
use crate::registry::{Registry, RegistryError, SeedError};

#[derive(Debug, Error)]
pub enum SnifferError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("fetching seed nodes failed")]
    Seed(#[from] SeedError),
}

/// Per-transaction sightings: earliest announcement time per announcer.
/// A `None` slot means the reports-center estimation already ran and the
/// transaction is sealed against further bookkeeping.
type Observations = HashMap<TxId, Option<HashMap<NodeAddr, SystemTime>>>;

struct State {
    network: Graph<NodeAddr, ()>,
    observations: Observations,
    peers: HashMap<NodeAddr, Halter>,
    protocol: String,
}

struct Inner {
    state: Mutex<State>,
    registry: Registry,
    learned: UnboundedSender<NodeAddr>,
    learned_rx: Mutex<Option<UnboundedReceiver<NodeAddr>>>,
    reports: UnboundedSender<Report>,
    running: AtomicBool,
}

/// Coordinator of many concurrent peer connections.
///
/// Holds the peer graph, the per-transaction observation tables and the
/// registry of live peers behind a single mutex; peers call back in through
/// the [`Courier`] surface and never hold the lock across I/O.
#[derive(Clone)]
pub struct Sniffer {
    inner: Arc<Inner>,
}

impl Sniffer {
    /// Creates a sniffer over the given protocol registry, returning it
    /// together with the stream of source reports it will emit.
    pub fn new(registry: Registry) -> (Self, UnboundedReceiver<Report>) {
        let (learned, learned_rx) = mpsc::unbounded_channel();
        let (reports, report_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                network: Graph::new(),
                observations: HashMap::new(),
                peers: HashMap::new(),
                protocol: String::new(),
            }),
            registry,
            learned,
            learned_rx: Mutex::new(Some(learned_rx)),
            reports,
            running: AtomicBool::new(false),
        });

        (Self { inner }, report_rx)
    }

    /// Fetches the seed nodes of `protocol` and starts draining the
    /// learned-address queue into outgoing connections.
    pub async fn spin(&self, protocol: &str) -> Result<(), SnifferError> {
        self.inner.running.store(true, Ordering::SeqCst);
        self.inner.lock().protocol = protocol.to_string();

        let provider = self.inner.registry.seed_provider(protocol)?;
        let seeds = provider.seeds().await?;
        info!(protocol, count = seeds.len(), "seed nodes fetched");

        for seed in seeds {
            let _ = self.inner.learned.send(seed);
        }

        let Some(mut queue) = self.inner.learned_rx.lock().ok().and_then(|mut rx| rx.take())
        else {
            warn!("sniffer already spinning");
            return Ok(());
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(addr) = queue.recv().await {
                if !inner.running.load(Ordering::SeqCst) {
                    break;
                }
                Inner::connect(&inner, addr);
            }
        });

        Ok(())
    }

    /// Opens a connection to `addr` using the active protocol. Duplicate
    /// connections are rejected under the coordinator lock.
    pub fn connect(&self, addr: NodeAddr) {
        Inner::connect(&self.inner, addr);
    }

    /// Stops accepting queued connections. Running peers are left to their
    /// own lifecycle and in-flight reports are not cancelled.
    pub fn halt(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Count of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.inner.lock().peers.len()
    }

    /// Stops the peer connected to `addr`, if any.
    pub fn halt_peer(&self, addr: &NodeAddr) -> Result<(), crate::peer::PeerError> {
        let halter = {
            let state = self.inner.lock();
            state.peers.get(addr).cloned()
        };
        match halter {
            Some(halter) => halter.halt(),
            None => Err(crate::peer::PeerError::NotRunning),
        }
    }

    /// The courier surface of this sniffer, as handed to peers.
    pub fn courier(&self) -> Weak<dyn Courier> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        weak
    }

    pub fn notify_transaction(&self, notify: TransactionNotify) {
        self.inner.notify_transaction(notify);
    }

    pub fn node_conn(&self, src: NodeAddr, learned: Vec<NodeAddr>) {
        self.inner.node_conn(src, learned);
    }

    pub fn node_exit(&self, addr: NodeAddr) {
        self.inner.node_exit(addr);
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // a poisoned coordinator state is still internally consistent, every
        // mutation below is panic-free once the guard is held
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connect(inner: &Arc<Inner>, addr: NodeAddr) {
        let mut state = inner.lock();

        if state.peers.contains_key(&addr) {
            warn!(%addr, "sniffer already connected to peer");
            return;
        }

        let constructor = match inner.registry.peer_constructor(&state.protocol) {
            Ok(constructor) => constructor,
            Err(err) => {
                error!(%addr, %err, "peer construction failed");
                return;
            }
        };

        let courier_weak: Weak<Inner> = Arc::downgrade(inner);
        let courier: Weak<dyn Courier> = courier_weak;
        let mut peer = constructor(courier, addr);
        let halter = peer.halter();

        let cleanup = Arc::downgrade(inner);
        tokio::spawn(async move {
            match peer.spin().await {
                Ok(()) => debug!(%addr, "peer exited"),
                Err(err) => warn!(%addr, %err, "peer exited with error"),
            }
            if let Some(inner) = cleanup.upgrade() {
                let mut state = inner.lock();
                state.peers.remove(&addr);
                state.network.remove_vertex(&addr);
            }
        });

        state.network.add_vertex(addr, ());
        state.peers.insert(addr, halter);
        info!(%addr, "connecting to peer");
    }

    fn emit(&self, report: Report) {
        info!(
            txid = %hex::encode(report.txid),
            source = %report.source,
            method = %report.method,
            "transaction source estimated"
        );
        if self.reports.send(report).is_err() {
            warn!("report receiver dropped, conclusion lost");
        }
    }
}

impl Courier for Inner {
    fn notify_transaction(&self, notify: TransactionNotify) {
        let mut guard = self.lock();
        let state = &mut *guard;

        let slot = state
            .observations
            .entry(notify.txid)
            .or_insert_with(|| Some(HashMap::new()));
        let Some(sightings) = slot.as_mut() else {
            // sealed: the reports-center pass already ran for this txid
            return;
        };

        let before = sightings.len();
        let earliest = sightings.entry(notify.source).or_insert(notify.timestamp);
        if notify.timestamp < *earliest {
            *earliest = notify.timestamp;
        }

        if before == 0 {
            self.emit(Report {
                txid: notify.txid,
                source: notify.source,
                timestamp: notify.timestamp,
                method: Method::FirstTimestamp,
            });
        }

        if sightings.len() < OBSERVATION_THRESHOLD || before >= OBSERVATION_THRESHOLD {
            return;
        }

        // induced subgraph over announcers that are still connected peers
        let mut h: Graph<NodeAddr, ()> = Graph::new();
        for announcer in sightings.keys() {
            if state.peers.contains_key(announcer) {
                h.add_vertex(*announcer, ());
            }
        }
        let mut edges = Vec::new();
        for member in h.keys() {
            if let Some(neighbors) = state.network.neighbors(member) {
                for neighbor in neighbors {
                    if h.contains(neighbor) {
                        edges.push((*member, *neighbor));
                    }
                }
            }
        }
        for (a, b) in &edges {
            h.add_edge(a, b);
        }

        match estimate::reports_center(&h, sightings) {
            Some((source, timestamp)) => self.emit(Report {
                txid: notify.txid,
                source,
                timestamp,
                method: Method::ReportsCenter,
            }),
            None => debug!(
                txid = %hex::encode(notify.txid),
                announcers = h.len(),
                "no rumor-center candidate"
            ),
        }

        // sealed whether or not a candidate existed
        *slot = None;
    }

    fn node_conn(&self, src: NodeAddr, learned: Vec<NodeAddr>) {
        let mut guard = self.lock();
        let state = &mut *guard;

        state.network.add_vertex(src, ());
        for addr in learned {
            if addr == src {
                continue;
            }
            state.network.add_vertex(addr, ());
            state.network.add_edge(&src, &addr);
            let _ = self.learned.send(addr);
        }
    }

    fn node_exit(&self, addr: NodeAddr) {
        self.lock().network.remove_vertex(&addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{Peer, PeerConstructor, PeerError};
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn addr(last: u8, port: u16) -> NodeAddr {
        format!("10.0.0.{last}:{port}")
            .parse::<SocketAddr>()
            .unwrap()
            .into()
    }

    fn at(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_000 + millis)
    }

    struct IdlePeer {
        halter: Halter,
    }

    #[async_trait]
    impl Peer for IdlePeer {
        async fn spin(&mut self) -> Result<(), PeerError> {
            self.halter.activate();
            self.halter.halted().await;
            self.halter.deactivate();
            Err(PeerError::Halted)
        }

        fn halter(&self) -> Halter {
            self.halter.clone()
        }
    }

    fn idle_constructor() -> PeerConstructor {
        Arc::new(|_, _| {
            Box::new(IdlePeer {
                halter: Halter::new(),
            }) as Box<dyn Peer>
        })
    }

    fn test_sniffer() -> (Sniffer, UnboundedReceiver<Report>) {
        crate::init_test_tracing();

        let mut registry = Registry::new();
        registry
            .register_peer_constructor("test", idle_constructor())
            .unwrap();
        let (sniffer, reports) = Sniffer::new(registry);
        sniffer.inner.lock().protocol = "test".to_string();
        (sniffer, reports)
    }

    /// Marks `addrs` as connected peers without any real I/O.
    fn register_fake_peers(sniffer: &Sniffer, addrs: &[NodeAddr]) {
        let mut state = sniffer.inner.lock();
        for a in addrs {
            state.network.add_vertex(*a, ());
            state.peers.insert(*a, Halter::new());
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn first_sighting_emits_exactly_one_fte() {
        let (sniffer, mut reports) = test_sniffer();
        let source = addr(1, 8333);
        let txid = [7u8; 32];

        sniffer.notify_transaction(TransactionNotify {
            source,
            timestamp: at(0),
            txid,
        });
        let report = reports.recv().await.unwrap();
        assert_eq!(report.method, Method::FirstTimestamp);
        assert_eq!(report.source, source);
        assert_eq!(report.timestamp, at(0));

        // same announcer again, later and earlier: no further reports
        sniffer.notify_transaction(TransactionNotify {
            source,
            timestamp: at(50),
            txid,
        });
        sniffer.notify_transaction(TransactionNotify {
            source,
            timestamp: at(25),
            txid,
        });
        assert!(reports.try_recv().is_err());
    }

    #[tokio::test]
    async fn earliest_timestamp_per_announcer_is_retained() {
        let (sniffer, _reports) = test_sniffer();
        let source = addr(1, 8333);
        let txid = [9u8; 32];

        for millis in [30, 10, 20] {
            sniffer.notify_transaction(TransactionNotify {
                source,
                timestamp: at(millis),
                txid,
            });
        }

        let state = sniffer.inner.lock();
        let sightings = state.observations[&txid].as_ref().unwrap();
        assert_eq!(sightings.len(), 1);
        assert_eq!(sightings[&source], at(10));
    }

    #[tokio::test]
    async fn threshold_star_topology_selects_the_hub() {
        let (sniffer, mut reports) = test_sniffer();
        let hub = addr(1, 8333);
        let leaves: Vec<NodeAddr> =
            (0..OBSERVATION_THRESHOLD as u8 - 1).map(|i| addr(i + 2, 8333)).collect();

        let mut all = vec![hub];
        all.extend(&leaves);
        register_fake_peers(&sniffer, &all);
        sniffer.node_conn(hub, leaves.clone());

        let txid = [3u8; 32];
        sniffer.notify_transaction(TransactionNotify {
            source: hub,
            timestamp: at(0),
            txid,
        });
        assert_eq!(reports.recv().await.unwrap().method, Method::FirstTimestamp);

        for (i, leaf) in leaves.iter().enumerate() {
            sniffer.notify_transaction(TransactionNotify {
                source: *leaf,
                timestamp: at(1 + i as u64),
                txid,
            });
        }

        let report = reports.recv().await.unwrap();
        assert_eq!(report.method, Method::ReportsCenter);
        assert_eq!(report.source, hub);
        assert_eq!(report.timestamp, at(0));

        // sealed: further announcers change nothing
        sniffer.notify_transaction(TransactionNotify {
            source: addr(200, 8333),
            timestamp: at(999),
            txid,
        });
        assert!(reports.try_recv().is_err());
        assert!(sniffer.inner.lock().observations[&txid].is_none());
    }

    #[tokio::test]
    async fn threshold_without_candidate_still_seals() {
        let (sniffer, mut reports) = test_sniffer();
        // even-length line: no vertex keeps both branches under half
        let line: Vec<NodeAddr> =
            (0..OBSERVATION_THRESHOLD as u8).map(|i| addr(i + 1, 8333)).collect();
        register_fake_peers(&sniffer, &line);
        for pair in line.windows(2) {
            sniffer.node_conn(pair[0], vec![pair[1]]);
        }

        let txid = [4u8; 32];
        for (i, a) in line.iter().enumerate() {
            sniffer.notify_transaction(TransactionNotify {
                source: *a,
                timestamp: at(i as u64),
                txid,
            });
        }

        let report = reports.recv().await.unwrap();
        assert_eq!(report.method, Method::FirstTimestamp);
        assert!(reports.try_recv().is_err());
        assert!(sniffer.inner.lock().observations[&txid].is_none());
    }

    #[tokio::test]
    async fn node_conn_builds_topology_and_enqueues() {
        let (sniffer, _reports) = test_sniffer();
        let src = addr(1, 8333);
        let learned = vec![addr(2, 8333), addr(3, 8333), src];

        sniffer.node_conn(src, learned);

        {
            let state = sniffer.inner.lock();
            assert_eq!(state.network.len(), 3);
            assert!(state.network.vertex(&src).unwrap().degree() == 2);
            // the self entry was skipped
            assert!(state.network.neighbors(&src).unwrap().all(|n| *n != src));
        }

        // both learned addresses were queued for connection, src was not
        let mut queue = sniffer.inner.learned_rx.lock().unwrap().take().unwrap();
        assert_eq!(queue.recv().await, Some(addr(2, 8333)));
        assert_eq!(queue.recv().await, Some(addr(3, 8333)));
        assert!(queue.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_connect_is_rejected() {
        let (sniffer, _reports) = test_sniffer();
        let target = addr(5, 8333);

        sniffer.connect(target);
        sniffer.connect(target);

        assert_eq!(sniffer.peer_count(), 1);
        assert!(sniffer.inner.lock().network.contains(&target));
    }

    #[tokio::test]
    async fn halted_peer_is_cleaned_up() {
        let (sniffer, _reports) = test_sniffer();
        let target = addr(6, 8333);

        sniffer.connect(target);
        wait_until(|| {
            sniffer
                .inner
                .lock()
                .peers
                .get(&target)
                .map(|halter| halter.is_active())
                .unwrap_or(false)
        })
        .await;

        sniffer.halt_peer(&target).unwrap();
        wait_until(|| sniffer.peer_count() == 0).await;
        assert!(!sniffer.inner.lock().network.contains(&target));
        assert!(matches!(
            sniffer.halt_peer(&target),
            Err(PeerError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn node_exit_removes_the_vertex_and_its_edges() {
        let (sniffer, _reports) = test_sniffer();
        let src = addr(1, 8333);
        let other = addr(2, 8333);
        sniffer.node_conn(src, vec![other]);

        sniffer.node_exit(src);

        let state = sniffer.inner.lock();
        assert!(!state.network.contains(&src));
        assert_eq!(state.network.vertex(&other).unwrap().degree(), 0);
    }
}
