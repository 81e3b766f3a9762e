use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use std::fmt::Write as _;

use crate::chord::actor::{spawn_peer, PeerReport};
use crate::chord::coordinator::RingPlan;
use crate::chord::types::{ElectionState, PeerAddress, ProcessId};
use crate::chord::COORDINATOR;
use crate::error::RingError;
use crate::network::channel::ChannelNetwork;
use crate::network::{SimulationConfig, Transport};

/// Outcome of one full run: every peer's final state, in ring order.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub ring_size: usize,
    pub initiator: PeerAddress,
    pub peers: Vec<PeerReport>,
}

impl SimulationReport {
    pub fn peer(&self, process: ProcessId) -> Option<&PeerReport> {
        self.peers.iter().find(|peer| peer.address.process == process)
    }

    /// The unique leader, if the election produced exactly one.
    pub fn leader(&self) -> Option<PeerAddress> {
        let mut leaders = self
            .peers
            .iter()
            .filter(|peer| peer.election == ElectionState::Leader);
        match (leaders.next(), leaders.next()) {
            (Some(leader), None) => Some(leader.address),
            _ => None,
        }
    }

    pub fn messages(&self) -> u64 {
        self.peers.iter().map(|peer| peer.messages_sent).sum()
    }

    pub fn all_done(&self) -> bool {
        self.peers.iter().all(|peer| peer.done)
    }

    /// Console dump, one line per peer in the `P<pid>> finger table:` format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for peer in &self.peers {
            let fingers = peer
                .fingers
                .iter()
                .map(|finger| finger.logical.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                out,
                "P{}> finger table: {} ({}, id {})",
                peer.address.process, fingers, peer.election, peer.address.logical
            );
        }
        out
    }
}

pub struct RingSimulation;

impl RingSimulation {
    /// Validate `config`, lay out a random ring and run it to completion.
    pub async fn run(config: &SimulationConfig) -> Result<SimulationReport, RingError> {
        config.validate()?;
        let plan = RingPlan::seeded(config.ring_size, config.seed);
        Self::run_plan(&plan, config.effective_capacity()).await
    }

    /// Run the protocol on an explicit layout.
    pub async fn run_plan(plan: &RingPlan, capacity: usize) -> Result<SimulationReport, RingError> {
        let ring = plan.params();
        let capacity = capacity.max(plan.ring_size() + 2);
        let mut transports = ChannelNetwork::build(plan.ring_size() + 1, capacity).into_iter();
        let coordinator = transports
            .next()
            .ok_or_else(|| RingError::PeerTask("no coordinator transport".into()))?;
        debug_assert_eq!(coordinator.local_id(), COORDINATOR);

        // Every SETUP frame is queued before any peer starts running.
        plan.dispatch(&coordinator).await?;

        let handles: Vec<_> = transports
            .map(|transport| spawn_peer(transport, ring))
            .collect();
        info!("Spawned {} peers", handles.len());

        let mut peers = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(report)) => peers.push(report),
                Ok(Err(e)) => return Err(e),
                Err(e) => {
                    warn!("Peer task did not finish: {}", e);
                    return Err(RingError::PeerTask(e.to_string()));
                }
            }
        }

        let report = SimulationReport {
            ring_size: plan.ring_size(),
            initiator: plan.initiator(),
            peers,
        };
        info!(
            "Simulation finished: leader {:?}, {} messages",
            report.leader(),
            report.messages()
        );
        Ok(report)
    }
}
