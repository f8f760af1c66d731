use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Weak;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tracing::{debug, info, trace, warn};

use argos_codec::{ByteReader, Decode, Encode, Order};
use argos_sniffer::{Courier, Halter, NodeAddr, PeerError, TransactionNotify};

use crate::bearer::Bearer;
use crate::hashing::checksum;
use crate::magic::MagicSeeker;
use crate::messages::{
    command, command_bytes, Addr, FilterAdd, FilterLoad, GetHeaders, Headers, Inventory,
    InventoryList, MessageHeader, Ping, Pong, Reject, SendCmpct, Transaction, Version,
    VersionAddress,
};
use crate::types::{FeeFilter, InventoryType, NetworkMagic, ServiceType, VarString, REJECT_INVALID};
use crate::{MAX_MESSAGE_LENGTH, PROTOCOL_VERSION, USER_AGENT};

struct Connection {
    reader: BufReader<ReadHalf<Bearer>>,
    writer: WriteHalf<Bearer>,
}

/// One outgoing connection to a remote Bitcoin node.
///
/// `spin` dials, sends our `version` and then answers the remote side for
/// as long as the socket lives. Inventory announcements are forwarded to the
/// coordinator through the courier handle; every data request is answered
/// with `notfound` since this node stores nothing.
pub struct Peer {
    courier: Weak<dyn Courier>,
    addr: NodeAddr,
    conn: Option<Connection>,
    local: Option<SocketAddr>,
    nonce: u64,
    txs: HashMap<[u8; 32], Transaction>,
    announce: bool,
    send_headers: bool,
    filter_load: Option<FilterLoad>,
    fee_filter: i64,
    mock: Option<Bearer>,
    halter: Halter,
}

impl Peer {
    pub fn new(courier: Weak<dyn Courier>, addr: NodeAddr) -> Self {
        Self {
            courier,
            addr,
            conn: None,
            local: None,
            nonce: 0,
            txs: HashMap::new(),
            announce: false,
            send_headers: false,
            filter_load: None,
            fee_filter: 0,
            mock: None,
            halter: Halter::new(),
        }
    }

    /// Installs an in-memory transport used in place of dialing the remote
    /// node.
    pub fn with_mock(courier: Weak<dyn Courier>, addr: NodeAddr, bearer: Bearer) -> Self {
        let mut peer = Self::new(courier, addr);
        peer.mock = Some(bearer);
        peer
    }

    /// The address we present in our version handshake.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    /// Transactions collected from this peer, keyed by payload hash.
    pub fn transactions(&self) -> &HashMap<[u8; 32], Transaction> {
        &self.txs
    }

    /// Whether the peer asked for compact-block announcements.
    pub fn announces_cmpct(&self) -> bool {
        self.announce
    }

    /// Whether the peer asked for `headers` announcements instead of `inv`.
    pub fn prefers_headers(&self) -> bool {
        self.send_headers
    }

    /// Latest fee filter the peer announced, in satoshis per kilobyte.
    pub fn fee_filter(&self) -> i64 {
        self.fee_filter
    }

    /// Bloom filter currently loaded by the peer, if any.
    pub fn bloom_filter(&self) -> Option<&FilterLoad> {
        self.filter_load.as_ref()
    }

    async fn run(&mut self) -> Result<(), PeerError> {
        self.nonce = rand::thread_rng().gen();

        let bearer = match self.mock.take() {
            Some(bearer) => bearer,
            None => Bearer::connect_tcp(self.addr.socket_addr())
                .await
                .map_err(PeerError::ConnectFailed)?,
        };
        self.local = bearer.local_addr();

        let (read, write) = tokio::io::split(bearer);
        self.conn = Some(Connection {
            reader: BufReader::new(read),
            writer: write,
        });
        self.halter.activate();
        info!(addr = %self.addr, nonce = self.nonce, "bitcoin peer spinning");

        self.send_version().await?;

        loop {
            self.handle().await?;
        }
    }

    /// Locates the next frame through the magic state machine, then reads
    /// the remaining fixed-size header fields.
    async fn read_header(&mut self) -> Result<MessageHeader, PeerError> {
        let conn = self.conn.as_mut().ok_or(PeerError::NotRunning)?;

        let mut seeker = MagicSeeker::new();
        let magic = loop {
            let byte = conn
                .reader
                .read_u8()
                .await
                .map_err(PeerError::Disconnected)?;
            if let Some(magic) = seeker.feed(byte) {
                break magic;
            }
        };

        let mut rest = [0u8; MessageHeader::LENGTH - 4];
        conn.reader
            .read_exact(&mut rest)
            .await
            .map_err(PeerError::Disconnected)?;

        let mut r = ByteReader::new(&rest);
        let command = <[u8; 12]>::decode(&mut r, Order::Little)?;
        let length = u32::decode(&mut r, Order::Little)?;
        let checksum = u32::decode(&mut r, Order::Little)?;

        Ok(MessageHeader {
            magic,
            command,
            length,
            checksum,
        })
    }

    async fn handle(&mut self) -> Result<(), PeerError> {
        let header = self.read_header().await?;
        let command = header.command_str().into_owned();
        trace!(
            addr = %self.addr,
            command = %command,
            magic = %header.magic,
            length = header.length,
            "frame header parsed"
        );

        // oversized frames indicate a broken transmission state; complain
        // and let the magic scanner find the next frame
        if header.length > MAX_MESSAGE_LENGTH {
            return self
                .send_reject(&command, REJECT_INVALID, "message too long")
                .await;
        }

        let mut payload = vec![0u8; header.length as usize];
        {
            let conn = self.conn.as_mut().ok_or(PeerError::NotRunning)?;
            conn.reader
                .read_exact(&mut payload)
                .await
                .map_err(PeerError::Disconnected)?;
        }

        let (payload_hash, sum) = checksum(&payload);
        if sum != header.checksum {
            return self
                .send_reject(&command, REJECT_INVALID, "message checksum invalid")
                .await;
        }

        self.dispatch(&command, payload_hash, &payload).await
    }

    async fn dispatch(
        &mut self,
        command: &str,
        payload_hash: [u8; 32],
        payload: &[u8],
    ) -> Result<(), PeerError> {
        match command {
            command::VERSION => {
                let (version, _) = argos_codec::decode::<Version>(payload)?;
                debug!(
                    addr = %self.addr,
                    version = version.version,
                    agent = %version.user_agent,
                    height = version.start_height,
                    "peer version received"
                );
                self.send(command::VERACK, None::<&Ping>).await
            }
            command::VERACK | command::PONG | command::REJECT => Ok(()),
            command::SENDHEADERS => {
                self.send_headers = true;
                Ok(())
            }
            command::SENDCMPCT => {
                let (cmpct, _) = argos_codec::decode::<SendCmpct>(payload)?;
                self.announce = cmpct.announce;
                Ok(())
            }
            command::PING => {
                let (ping, _) = argos_codec::decode::<Ping>(payload)?;
                self.send(command::PONG, Some(&Pong { nonce: ping.nonce }))
                    .await
            }
            command::INV => {
                let (inv, _) = argos_codec::decode::<InventoryList>(payload)?;
                self.handle_inv(inv).await
            }
            command::NOTFOUND => {
                let (missing, _) = argos_codec::decode::<InventoryList>(payload)?;
                for entry in missing.entries.iter().filter(|e| e.kind.is_tx()) {
                    warn!(
                        addr = %self.addr,
                        txid = %hex::encode(entry.hash),
                        "transaction not found on peer"
                    );
                }
                Ok(())
            }
            command::TX => {
                let (tx, _) = argos_codec::decode::<Transaction>(payload)?;
                self.txs.insert(payload_hash, tx);
                Ok(())
            }
            command::ADDR => {
                let (addr, _) = argos_codec::decode::<Addr>(payload)?;
                let learned: Vec<NodeAddr> =
                    addr.entries.iter().map(|entry| entry.node_addr()).collect();
                debug!(addr = %self.addr, count = learned.len(), "peer shared addresses");
                if let Some(courier) = self.courier.upgrade() {
                    courier.node_conn(self.addr, learned);
                }
                Ok(())
            }
            command::GETHEADERS => {
                let (request, _) = argos_codec::decode::<GetHeaders>(payload)?;
                let entries: Vec<Inventory> = request
                    .locator_hashes
                    .into_iter()
                    .map(|hash| Inventory {
                        kind: InventoryType::BLOCK,
                        hash,
                    })
                    .collect();
                self.send(command::NOTFOUND, Some(&InventoryList::from(entries)))
                    .await
            }
            command::GETDATA => {
                let (request, _) = argos_codec::decode::<InventoryList>(payload)?;
                self.send(command::NOTFOUND, Some(&request)).await
            }
            command::HEADERS => {
                let (headers, _) = argos_codec::decode::<Headers>(payload)?;
                trace!(addr = %self.addr, count = headers.entries.len(), "headers received");
                Ok(())
            }
            command::FEEFILTER => {
                let (fee, _) = argos_codec::decode::<FeeFilter>(payload)?;
                self.fee_filter = fee.0;
                Ok(())
            }
            command::FILTERLOAD => {
                let (load, _) = argos_codec::decode::<FilterLoad>(payload)?;
                self.filter_load = Some(load);
                Ok(())
            }
            command::FILTERADD => {
                let (add, _) = argos_codec::decode::<FilterAdd>(payload)?;
                if let Some(load) = self.filter_load.as_mut() {
                    load.filter.extend_from_slice(&add.data);
                }
                Ok(())
            }
            command::FILTERCLEAR => {
                self.filter_load = None;
                Ok(())
            }
            _ => self.send_reject(command, REJECT_INVALID, "unsupported").await,
        }
    }

    async fn handle_inv(&mut self, inv: InventoryList) -> Result<(), PeerError> {
        let timestamp = SystemTime::now();
        let mut wanted = Vec::new();

        for entry in inv.entries {
            if !entry.kind.is_tx() {
                continue;
            }
            if let Some(courier) = self.courier.upgrade() {
                courier.notify_transaction(TransactionNotify {
                    source: self.addr,
                    timestamp,
                    txid: entry.hash,
                });
            }
            wanted.push(entry);
        }

        if wanted.is_empty() {
            return Ok(());
        }

        debug!(addr = %self.addr, count = wanted.len(), "requesting announced transactions");
        self.send(command::GETDATA, Some(&InventoryList::from(wanted)))
            .await
    }

    async fn send<M: Encode>(&mut self, name: &str, payload: Option<&M>) -> Result<(), PeerError> {
        let body = match payload {
            Some(message) => argos_codec::encode(message)?,
            None => Vec::new(),
        };
        let (_, sum) = checksum(&body);
        let header = MessageHeader {
            magic: NetworkMagic::MAIN,
            command: command_bytes(name),
            length: body.len() as u32,
            checksum: sum,
        };
        let frame = argos_codec::encode(&header)?;

        let conn = self.conn.as_mut().ok_or(PeerError::NotRunning)?;
        conn.writer
            .write_all(&frame)
            .await
            .map_err(PeerError::Disconnected)?;
        conn.writer
            .write_all(&body)
            .await
            .map_err(PeerError::Disconnected)?;
        conn.writer
            .flush()
            .await
            .map_err(PeerError::Disconnected)?;

        trace!(addr = %self.addr, command = name, length = body.len(), "message sent");
        Ok(())
    }

    async fn send_reject(
        &mut self,
        message: &str,
        ccode: u8,
        reason: &str,
    ) -> Result<(), PeerError> {
        warn!(addr = %self.addr, command = message, reason, "rejecting message");
        let reject = Reject {
            message: VarString::from(message),
            ccode,
            reason: VarString::from(reason),
            data: None,
        };
        self.send(command::REJECT, Some(&reject)).await
    }

    async fn send_version(&mut self) -> Result<(), PeerError> {
        let services = ServiceType::default();
        let remote = VersionAddress::new(services, self.addr);
        let version = Version {
            version: PROTOCOL_VERSION,
            services,
            timestamp: unix_time_secs(),
            addr_recv: remote,
            addr_from: remote,
            nonce: self.nonce,
            user_agent: VarString::from(USER_AGENT),
            start_height: 0,
            relay: true,
        };
        self.send(command::VERSION, Some(&version)).await
    }
}

#[async_trait]
impl argos_sniffer::Peer for Peer {
    async fn spin(&mut self) -> Result<(), PeerError> {
        let halter = self.halter.clone();
        let result = tokio::select! {
            result = self.run() => result,
            _ = halter.halted() => Err(PeerError::Halted),
        };

        self.halter.deactivate();
        self.conn = None;
        debug!(addr = %self.addr, "bitcoin peer spin exited");
        result
    }

    fn halter(&self) -> Halter {
        self.halter.clone()
    }
}

fn unix_time_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
