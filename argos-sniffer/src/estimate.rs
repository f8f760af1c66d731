//! Rumor-source estimation over the observed peer topology
//!
//! Two estimators run per transaction: the first-timestamp estimator (FTE)
//! fires on the very first sighting and simply blames the announcing peer;
//! the reports-center estimator (RCE) waits until [`OBSERVATION_THRESHOLD`]
//! distinct peers have announced the transaction, then looks for a vertex of
//! the induced announcer subgraph whose largest remaining branch holds fewer
//! than half of the announcers. That is the classical rumor-center condition
//! on a regular tree; on the loosely tree-like regions of a peer graph it
//! remains a usable centrality test.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::time::SystemTime;

use argos_graph::Graph;

use crate::addr::NodeAddr;
use crate::peer::TxId;

/// Count of distinct announcers at which the reports-center estimation runs
/// for a transaction.
pub const OBSERVATION_THRESHOLD: usize = 24;

/// Estimation strategy that produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    FirstTimestamp,
    ReportsCenter,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::FirstTimestamp => "FTE",
            Method::ReportsCenter => "RCE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source conclusion for one transaction, ready to forward to the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub txid: TxId,
    pub source: NodeAddr,
    pub timestamp: SystemTime,
    pub method: Method,
}

/// Count of distinct vertices reachable from `start` while `center` is
/// treated as already visited: the size of `start`'s side of the graph once
/// `center` is removed. Cycles are walked once, `start` is counted once and
/// `center` never.
pub fn reach_without<K, V>(graph: &Graph<K, V>, center: &K, start: &K) -> usize
where
    K: Eq + Hash + Clone,
{
    let mut visited: HashSet<K> = HashSet::new();
    visited.insert(center.clone());

    let mut stack = vec![start.clone()];
    let mut count = 0;

    while let Some(key) = stack.pop() {
        if !visited.insert(key.clone()) {
            continue;
        }
        count += 1;
        if let Some(neighbors) = graph.neighbors(&key) {
            for neighbor in neighbors {
                if !visited.contains(neighbor) {
                    stack.push(neighbor.clone());
                }
            }
        }
    }

    count
}

/// Selects the rumor center of the announcer subgraph `h`.
///
/// A vertex qualifies when it has no neighbors in `h`, or when its largest
/// branch with the vertex itself removed covers strictly fewer than half of
/// the announcers. Among the qualifying vertices the one with the earliest
/// first-sighting timestamp wins. Returns `None` when no vertex qualifies.
pub fn reports_center<K>(
    h: &Graph<K, ()>,
    sightings: &HashMap<K, SystemTime>,
) -> Option<(K, SystemTime)>
where
    K: Eq + Hash + Clone,
{
    let total = h.len();
    let mut best: Option<(K, SystemTime)> = None;

    for vertex in h.vertices() {
        let key = vertex.key();

        let qualifies = if vertex.degree() == 0 {
            true
        } else {
            let max_branch = vertex
                .neighbors()
                .map(|neighbor| reach_without(h, key, neighbor))
                .max()
                .unwrap_or(0);
            2 * max_branch < total
        };
        if !qualifies {
            continue;
        }

        let Some(seen) = sightings.get(key) else {
            continue;
        };
        match &best {
            Some((_, earliest)) if seen >= earliest => {}
            _ => best = Some((key.clone(), *seen)),
        }
    }

    best
}
