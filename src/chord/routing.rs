use crate::chord::types::{FingerTable, PeerAddress, RingParams};
use crate::error::ProtocolError;

/// Running state of one finger lookup as it is relayed around the ring.
///
/// Slot `i` of `origin` resolves to the first peer on the successor walk
/// whose clockwise distance from `origin` reaches `2^i`. Because the
/// threshold grows with `i`, slots resolve in order and a single walk fills
/// the whole row. Slots still open when the walk returns to `origin`
/// resolve to `origin` itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerWalk {
    pub origin: PeerAddress,
    pub found: Vec<PeerAddress>,
}

impl FingerWalk {
    pub fn new(origin: PeerAddress) -> Self {
        Self {
            origin,
            found: Vec::new(),
        }
    }

    /// Resolve every pending slot that `peer` satisfies. Returns how many
    /// slots it took.
    pub fn visit(&mut self, peer: PeerAddress, ring: &RingParams) -> usize {
        let distance = ring.distance(self.origin.logical, peer.logical);
        let before = self.found.len();
        while self.found.len() < ring.slots()
            && distance >= ring.finger_offset(self.found.len())
        {
            self.found.push(peer);
        }
        self.found.len() - before
    }

    pub fn pending(&self, ring: &RingParams) -> usize {
        ring.slots().saturating_sub(self.found.len())
    }

    /// Finish the walk at its origin and write the row into `table`.
    pub fn close(self, table: &mut FingerTable) -> Result<(), ProtocolError> {
        let origin = self.origin;
        let len = table.len();
        if self.found.len() > len {
            return Err(ProtocolError::SlotOutOfRange {
                slot: self.found.len() - 1,
                len,
            });
        }
        let resolved = self.found.len();
        for (slot, peer) in self.found.into_iter().enumerate() {
            table.fill(slot, peer)?;
        }
        for slot in resolved..len {
            table.fill(slot, origin)?;
        }
        Ok(())
    }
}

/// The row the protocol must produce for the peer at `index` of `ring_order`,
/// computed centrally by walking the successor order.
pub fn expected_row(ring_order: &[PeerAddress], index: usize, ring: &RingParams) -> Vec<PeerAddress> {
    let origin = ring_order[index];
    let mut walk = FingerWalk::new(origin);
    let n = ring_order.len();
    for step in 1..n {
        if walk.pending(ring) == 0 {
            break;
        }
        walk.visit(ring_order[(index + step) % n], ring);
    }
    let mut row = walk.found;
    row.resize(ring.slots(), origin);
    row
}

/// Classic Chord successor: the peer whose id is the first at or after
/// `target` going clockwise through the logical space.
pub fn successor_of(peers: &[PeerAddress], target: u64, ring: &RingParams) -> Option<PeerAddress> {
    peers
        .iter()
        .copied()
        .min_by_key(|peer| ring.distance(target, peer.logical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(process: u32, logical: u64) -> PeerAddress {
        PeerAddress::new(process, logical)
    }

    #[test]
    fn walk_resolves_slots_in_order() {
        let ring = RingParams::new(3);
        let a = addr(1, 0);
        let b = addr(2, 2);
        let c = addr(3, 1);

        let mut walk = FingerWalk::new(a);
        // distance 2 covers slots 0 (>= 1) and 1 (>= 2), not slot 2 (>= 4)
        assert_eq!(walk.visit(b, &ring), 2);
        assert_eq!(walk.visit(c, &ring), 0);
        assert_eq!(walk.pending(&ring), 1);

        let mut table = FingerTable::new(3);
        walk.close(&mut table).unwrap();
        assert_eq!(table.entries(), Some(vec![b, b, a]));
    }

    #[test]
    fn closing_twice_is_rejected() {
        let ring = RingParams::new(2);
        let a = addr(1, 0);
        let mut walk = FingerWalk::new(a);
        walk.visit(addr(2, 3), &ring);

        let mut table = FingerTable::new(2);
        walk.clone().close(&mut table).unwrap();
        assert_eq!(walk.close(&mut table), Err(ProtocolError::SlotFilled(0)));
    }

    #[test]
    fn slot_zero_is_the_immediate_successor() {
        let ring = RingParams::new(4);
        let order = [addr(1, 3), addr(2, 0), addr(3, 2), addr(4, 1)];
        for index in 0..order.len() {
            let row = expected_row(&order, index, &ring);
            assert_eq!(row.len(), 4);
            assert_eq!(row[0], order[(index + 1) % order.len()]);
        }
    }

    #[test]
    fn sorted_ring_matches_chord_successor() {
        let ring = RingParams::new(5);
        let order: Vec<_> = (0..5).map(|i| addr(i as u32 + 1, i)).collect();
        for index in 0..order.len() {
            let row = expected_row(&order, index, &ring);
            for (slot, entry) in row.iter().enumerate() {
                let target = ring.finger_target(order[index].logical, slot);
                assert_eq!(Some(*entry), successor_of(&order, target, &ring));
            }
        }
    }
}
