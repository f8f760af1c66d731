use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::estimate::Report;
use crate::master::{unix_nanos, Master, MasterError, PingRequest, ReportRequest};
use crate::sniffer::{Sniffer, SnifferError};

/// Cadence of the master keep-alive ping.
const PING_INTERVAL: Duration = Duration::from_secs(10);

/// Consecutive ping failures tolerated before the daemon gives up.
const MAX_PING_FAILURES: u32 = 10;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("argos master is not available")]
    MasterUnavailable(#[source] MasterError),

    #[error(transparent)]
    Sniffer(#[from] SnifferError),
}

/// Long-running wrapper around a [`Sniffer`]: registers with the master,
/// starts sniffing the protocol the master selects, keeps the clock delta
/// fresh through a ping loop and forwards source reports.
pub struct Daemon {
    config: Config,
    master: Arc<dyn Master>,
    sniffer: Sniffer,
    reports: UnboundedReceiver<Report>,
}

impl Daemon {
    pub fn new(
        config: Config,
        master: Arc<dyn Master>,
        sniffer: Sniffer,
        reports: UnboundedReceiver<Report>,
    ) -> Self {
        Self {
            config,
            master,
            sniffer,
            reports,
        }
    }

    /// Runs until the master becomes unreachable. The initial ping selects
    /// the protocol to sniff; afterwards one task forwards reports while
    /// this task keeps pinging every ten seconds.
    pub async fn spin(self) -> Result<(), DaemonError> {
        let Daemon {
            config,
            master,
            sniffer,
            mut reports,
        } = self;

        let first = master
            .ping(ping_request(&config.identifier))
            .await
            .map_err(DaemonError::MasterUnavailable)?;
        if first.status != 0 {
            return Err(DaemonError::MasterUnavailable(MasterError::Status(
                first.status,
            )));
        }

        let delta_ns = Arc::new(AtomicI64::new(first.time_sync.delta_ns()));
        let protocol = first.protocol.clone();
        info!(%protocol, identifier = %config.identifier, "registered with argos master");

        sniffer.spin(&protocol).await?;

        {
            let master = Arc::clone(&master);
            let delta_ns = Arc::clone(&delta_ns);
            let identifier = config.identifier.clone();
            let protocol = protocol.clone();
            tokio::spawn(async move {
                while let Some(report) = reports.recv().await {
                    let request = ReportRequest::from_report(
                        &identifier,
                        &protocol,
                        &report,
                        delta_ns.load(Ordering::SeqCst),
                    );
                    if let Err(err) = master.report(request).await {
                        warn!(%err, "forwarding report to master failed");
                    }
                }
            });
        }

        let mut failures: u32 = 0;
        loop {
            tokio::time::sleep(PING_INTERVAL).await;

            match master.ping(ping_request(&config.identifier)).await {
                Ok(response) if response.status == 0 => {
                    failures = 0;
                    delta_ns.store(response.time_sync.delta_ns(), Ordering::SeqCst);
                }
                Ok(response) => {
                    failures += 1;
                    error!(status = response.status, failures, "argos sniffer ping failed");
                    if failures >= MAX_PING_FAILURES {
                        sniffer.halt();
                        return Err(DaemonError::MasterUnavailable(MasterError::Status(
                            response.status,
                        )));
                    }
                }
                Err(err) => {
                    failures += 1;
                    error!(%err, failures, "argos sniffer ping failed");
                    if failures >= MAX_PING_FAILURES {
                        sniffer.halt();
                        return Err(DaemonError::MasterUnavailable(err));
                    }
                }
            }
        }
    }
}

fn ping_request(identifier: &str) -> PingRequest {
    PingRequest {
        identifier: identifier.to_string(),
        timestamp_ns: unix_nanos(SystemTime::now()),
    }
}
