use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::chord::routing;
use crate::chord::types::{LogicalId, PeerAddress, ProcessId, RingParams};
use crate::chord::FIRST_PEER;
use crate::error::{ConfigError, TransportError};
use crate::network::messages::Message;
use crate::network::Transport;

/// The ring the coordinator sets up: peers in successor order, plus the
/// index of the peer that starts the election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RingPlan {
    peers: Vec<PeerAddress>,
    initiator: usize,
}

impl RingPlan {
    /// Shuffle logical ids `0..ring_size` over processes `1..=ring_size` and
    /// pick an initiator uniformly at random.
    pub fn random<R: Rng>(ring_size: usize, rng: &mut R) -> Self {
        let mut ids: Vec<LogicalId> = (0..ring_size as LogicalId).collect();
        ids.shuffle(rng);
        let peers = ids
            .into_iter()
            .enumerate()
            .map(|(i, logical)| PeerAddress::new(FIRST_PEER + i as ProcessId, logical))
            .collect();
        let initiator = rng.random_range(0..ring_size);
        Self { peers, initiator }
    }

    pub fn seeded(ring_size: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::random(ring_size, &mut rng)
    }

    /// An explicit layout: `logical_ids[i]` goes to process `FIRST_PEER + i`.
    pub fn from_ids(logical_ids: &[LogicalId], initiator: usize) -> Result<Self, ConfigError> {
        if logical_ids.len() < crate::chord::MIN_RING_SIZE
            || logical_ids.len() > crate::chord::MAX_RING_SIZE
        {
            return Err(ConfigError::RingSize(logical_ids.len()));
        }
        if initiator >= logical_ids.len() {
            return Err(ConfigError::InvalidLayout(format!(
                "initiator index {} outside ring of {}",
                initiator,
                logical_ids.len()
            )));
        }
        let ring = RingParams::new(logical_ids.len());
        for (i, id) in logical_ids.iter().enumerate() {
            if !ring.contains(*id) {
                return Err(ConfigError::InvalidLayout(format!(
                    "logical id {} outside space of {}",
                    id,
                    ring.space()
                )));
            }
            if logical_ids[..i].contains(id) {
                return Err(ConfigError::InvalidLayout(format!(
                    "logical id {} assigned twice",
                    id
                )));
            }
        }

        let peers = logical_ids
            .iter()
            .enumerate()
            .map(|(i, logical)| PeerAddress::new(FIRST_PEER + i as ProcessId, *logical))
            .collect();
        Ok(Self { peers, initiator })
    }

    pub fn ring_size(&self) -> usize {
        self.peers.len()
    }

    pub fn params(&self) -> RingParams {
        RingParams::new(self.peers.len())
    }

    pub fn peers(&self) -> &[PeerAddress] {
        &self.peers
    }

    pub fn initiator(&self) -> PeerAddress {
        self.peers[self.initiator]
    }

    pub fn successor(&self, index: usize) -> PeerAddress {
        self.peers[(index + 1) % self.peers.len()]
    }

    /// The peer that must win the election.
    pub fn expected_leader(&self) -> Option<PeerAddress> {
        self.peers.iter().copied().max_by_key(|peer| peer.logical)
    }

    /// Finger rows the construction protocol must produce, in ring order.
    pub fn expected_fingers(&self) -> Vec<Vec<PeerAddress>> {
        let ring = self.params();
        (0..self.peers.len())
            .map(|index| routing::expected_row(&self.peers, index, &ring))
            .collect()
    }

    /// Send every peer its SETUP frame. This is the coordinator's only job.
    pub async fn dispatch<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), TransportError> {
        let layout = self
            .peers
            .iter()
            .map(|peer| peer.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!("Coordinator> shuffle => {}", layout);
        info!("Coordinator> initiator is P{}", self.initiator().process);

        for (index, peer) in self.peers.iter().enumerate() {
            let setup = Message::Setup {
                logical_id: peer.logical,
                successor: self.successor(index),
                initiator: index == self.initiator,
            };
            debug!("Coordinator> setup for P{}: {:?}", peer.process, setup);
            transport.send(peer.process, setup).await?;
        }
        Ok(())
    }
}
