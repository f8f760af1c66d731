//! Declarative contract with the Argos master service
//!
//! The sniffer consumes two remote operations: a periodic ping that doubles
//! as clock synchronization and protocol selection, and the report call that
//! delivers source conclusions. Transports live outside this crate; tests
//! and binaries provide a [`Master`] implementation.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::estimate::Report;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error("master transport failure: {0}")]
    Transport(String),

    #[error("master rejected the request with status {0}")]
    Status(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingRequest {
    pub identifier: String,
    pub timestamp_ns: i64,
}

/// Clock-synchronization triple carried in every ping response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSync {
    /// Our send timestamp, echoed back.
    pub send: i64,
    /// Master receive timestamp.
    pub recv: i64,
    /// Master response timestamp.
    pub resp: i64,
}

impl TimeSync {
    /// Clock offset added to local report timestamps: half of the observed
    /// send-to-receive skew.
    pub fn delta_ns(&self) -> i64 {
        (self.recv - self.send) / 2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    pub status: i32,
    /// Network the master wants this sniffer to observe.
    pub protocol: String,
    pub time_sync: TimeSync,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportAddress {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportTransaction {
    /// Hex rendering of the transaction fingerprint.
    pub txid: String,
    /// Sighting time in nanoseconds, already clock-adjusted.
    pub timestamp_ns: i64,
    pub from: ReportAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportRequest {
    pub identifier: String,
    pub protocol: String,
    /// `"FTE"` or `"RCE"`.
    pub method: String,
    pub transaction: ReportTransaction,
}

impl ReportRequest {
    pub fn from_report(identifier: &str, protocol: &str, report: &Report, delta_ns: i64) -> Self {
        let source = report.source.socket_addr();
        Self {
            identifier: identifier.to_string(),
            protocol: protocol.to_string(),
            method: report.method.as_str().to_string(),
            transaction: ReportTransaction {
                txid: hex::encode(report.txid),
                timestamp_ns: unix_nanos(report.timestamp) + delta_ns,
                from: ReportAddress {
                    ip: source.ip().to_string(),
                    port: source.port(),
                },
            },
        }
    }
}

/// Nanoseconds since the unix epoch; clamps to zero for pre-epoch clocks.
pub fn unix_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Client surface of the Argos master.
#[async_trait]
pub trait Master: Send + Sync {
    async fn ping(&self, request: PingRequest) -> Result<PingResponse, MasterError>;

    async fn report(&self, request: ReportRequest) -> Result<(), MasterError>;
}
