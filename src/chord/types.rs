use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProtocolError;

/// Transport-level identity of a process (coordinator is 0).
pub type ProcessId = u32;

/// Position of a peer in the logical ring space `[0, 2^M)`.
pub type LogicalId = u64;

/// Where a peer lives: its transport id and its position in the ring
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub process: ProcessId,
    pub logical: LogicalId,
}

impl PeerAddress {
    pub fn new(process: ProcessId, logical: LogicalId) -> Self {
        Self { process, logical }
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress(P{}, {})", self.process, self.logical)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.process, self.logical)
    }
}

/// Dimensions of the logical space: `M` bits, `K = 2^M` positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingParams {
    bits: u32,
}

impl RingParams {
    pub fn new(ring_size: usize) -> Self {
        Self {
            bits: ring_size as u32,
        }
    }

    /// Number of finger slots per peer (M).
    pub fn slots(&self) -> usize {
        self.bits as usize
    }

    /// Size of the logical space (K).
    pub fn space(&self) -> u64 {
        1u64 << self.bits
    }

    /// Clockwise distance from `from` to `to` in the logical space.
    /// Zero only when both ids are the same position.
    pub fn distance(&self, from: LogicalId, to: LogicalId) -> u64 {
        to.wrapping_sub(from) & (self.space() - 1)
    }

    /// Offset covered by finger `slot`, i.e. `2^slot`.
    pub fn finger_offset(&self, slot: usize) -> u64 {
        1u64 << slot
    }

    /// Logical position finger `slot` of `id` points at: `(id + 2^slot) mod K`.
    pub fn finger_target(&self, id: LogicalId, slot: usize) -> LogicalId {
        id.wrapping_add(self.finger_offset(slot)) & (self.space() - 1)
    }

    pub fn contains(&self, id: LogicalId) -> bool {
        id < self.space()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionState {
    Candidate,
    Defeated,
    Leader,
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElectionState::Candidate => "candidate",
            ElectionState::Defeated => "defeated",
            ElectionState::Leader => "leader",
        };
        f.write_str(name)
    }
}

/// A peer's routing table. Every slot is written at most once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerTable {
    slots: Vec<Option<PeerAddress>>,
}

impl FingerTable {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<PeerAddress> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn fill(&mut self, slot: usize, peer: PeerAddress) -> Result<(), ProtocolError> {
        let len = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(ProtocolError::SlotOutOfRange { slot, len })?;
        if entry.is_some() {
            return Err(ProtocolError::SlotFilled(slot));
        }
        *entry = Some(peer);
        Ok(())
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The resolved entries, or `None` while any slot is still empty.
    pub fn entries(&self) -> Option<Vec<PeerAddress>> {
        self.slots.iter().copied().collect()
    }
}

impl fmt::Display for FingerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match slot {
                Some(peer) => write!(f, "{}", peer.logical)?,
                None => f.write_str("-")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_wraps_around_the_space() {
        let ring = RingParams::new(3);
        assert_eq!(ring.space(), 8);
        assert_eq!(ring.distance(0, 2), 2);
        assert_eq!(ring.distance(2, 0), 6);
        assert_eq!(ring.distance(5, 5), 0);
        assert_eq!(ring.finger_target(6, 2), 2);
    }

    #[test]
    fn finger_slots_are_write_once() {
        let mut table = FingerTable::new(2);
        let a = PeerAddress::new(1, 0);
        let b = PeerAddress::new(2, 3);

        table.fill(0, a).unwrap();
        assert_eq!(table.fill(0, b), Err(ProtocolError::SlotFilled(0)));
        assert_eq!(table.get(0), Some(a));
        assert!(!table.is_complete());
        assert_eq!(table.entries(), None);
        assert_eq!(table.to_string(), "0 -");

        assert_eq!(
            table.fill(2, b),
            Err(ProtocolError::SlotOutOfRange { slot: 2, len: 2 })
        );
        table.fill(1, b).unwrap();
        assert_eq!(table.entries(), Some(vec![a, b]));
        assert_eq!(table.to_string(), "0 3");
    }
}
