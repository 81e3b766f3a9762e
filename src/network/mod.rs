pub mod channel;
pub mod messages;
pub mod node;

use async_trait::async_trait;

use crate::chord::types::ProcessId;
use crate::chord::{DEFAULT_RING_SIZE, MAX_RING_SIZE, MIN_RING_SIZE};
use crate::error::{ConfigError, TransportError};
use messages::{Envelope, Message};

pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Point-to-point delivery between named processes.
///
/// Implementations must deliver every frame exactly once and preserve the
/// order of frames sent by the same process.
#[async_trait]
pub trait Transport: Send + Sync {
    fn local_id(&self) -> ProcessId;

    async fn send(&self, to: ProcessId, message: Message) -> Result<(), TransportError>;

    /// Wait for the next frame from any sender. A frame that cannot be
    /// decoded is returned as `TransportError::Protocol` and the transport
    /// stays usable.
    async fn recv(&mut self) -> Result<Envelope, TransportError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    pub ring_size: usize,
    /// Total process count: one coordinator plus `ring_size` peers
    pub processes: usize,
    pub seed: Option<u64>,
    pub mailbox_capacity: usize,
}

impl SimulationConfig {
    pub fn new(ring_size: usize) -> Self {
        Self {
            ring_size,
            processes: ring_size + 1,
            seed: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&self.ring_size) {
            return Err(ConfigError::RingSize(self.ring_size));
        }
        if self.processes != self.ring_size + 1 {
            return Err(ConfigError::ParticipantCount {
                expected: self.ring_size + 1,
                actual: self.processes,
            });
        }
        Ok(())
    }

    /// Mailbox size that can never fill up: at most one walk per peer, one
    /// announce and the setup frame are queued at any time.
    pub fn effective_capacity(&self) -> usize {
        self.mailbox_capacity.max(self.ring_size + 2)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RING_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_six_peer_ring() {
        let config = SimulationConfig::default();
        assert_eq!(config.ring_size, 6);
        assert_eq!(config.processes, 7);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_wrong_participant_count() {
        let mut config = SimulationConfig::new(6);
        config.processes = 4;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ParticipantCount {
                expected: 7,
                actual: 4
            })
        );
    }

    #[test]
    fn rejects_ring_size_out_of_range() {
        assert_eq!(
            SimulationConfig::new(1).validate(),
            Err(ConfigError::RingSize(1))
        );
        assert_eq!(
            SimulationConfig::new(MAX_RING_SIZE + 1).validate(),
            Err(ConfigError::RingSize(MAX_RING_SIZE + 1))
        );
    }

    #[test]
    fn capacity_grows_with_the_ring() {
        let mut config = SimulationConfig::new(20);
        config.mailbox_capacity = 4;
        assert_eq!(config.effective_capacity(), 22);
    }
}
