//! Ring extrema election: the greatest logical id wins.
//!
//! A single `Elect` message travels from the initiator around the ring,
//! always carrying the best candidate seen so far. It stops once it reaches
//! the peer whose id it carries, which is then the only leader.

use crate::chord::types::{ElectionState, LogicalId};

/// What a peer does with an incoming `Elect(carried)` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The carried candidate beats us: step down and relay it unchanged.
    Defeated { forward: LogicalId },
    /// Our own id came back around the ring.
    Leader,
    /// We beat the carried candidate: relay our own candidacy instead.
    Supersede { forward: LogicalId },
}

impl Verdict {
    /// The candidate to relay to the successor, if the message travels on.
    pub fn forward(&self) -> Option<LogicalId> {
        match self {
            Verdict::Defeated { forward } | Verdict::Supersede { forward } => Some(*forward),
            Verdict::Leader => None,
        }
    }
}

pub fn evaluate(own: LogicalId, carried: LogicalId) -> Verdict {
    match carried.cmp(&own) {
        std::cmp::Ordering::Greater => Verdict::Defeated { forward: carried },
        std::cmp::Ordering::Equal => Verdict::Leader,
        std::cmp::Ordering::Less => Verdict::Supersede { forward: own },
    }
}

/// State after applying `verdict` to a peer currently in `state`.
///
/// A peer that has been defeated never becomes a candidate again, even if a
/// weaker id reaches it later.
pub fn next_state(state: ElectionState, verdict: Verdict) -> ElectionState {
    match (state, verdict) {
        (_, Verdict::Leader) => ElectionState::Leader,
        (_, Verdict::Defeated { .. }) => ElectionState::Defeated,
        (current, Verdict::Supersede { .. }) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_carried_id_with_own() {
        assert_eq!(evaluate(3, 5), Verdict::Defeated { forward: 5 });
        assert_eq!(evaluate(5, 5), Verdict::Leader);
        assert_eq!(evaluate(5, 3), Verdict::Supersede { forward: 5 });
        assert_eq!(evaluate(5, 5).forward(), None);
    }

    #[test]
    fn defeat_is_sticky() {
        let state = next_state(ElectionState::Candidate, evaluate(1, 4));
        assert_eq!(state, ElectionState::Defeated);
        assert_eq!(
            next_state(state, evaluate(1, 0)),
            ElectionState::Defeated
        );
        assert_eq!(
            next_state(ElectionState::Candidate, evaluate(4, 2)),
            ElectionState::Candidate
        );
    }

    // Replays the relay over a whole ring without any transport.
    fn simulate(ids: &[LogicalId], initiator: usize) -> (Vec<ElectionState>, usize) {
        let mut states = vec![ElectionState::Candidate; ids.len()];
        let mut carried = ids[initiator];
        let mut at = (initiator + 1) % ids.len();
        let mut hops = 1;
        loop {
            let verdict = evaluate(ids[at], carried);
            states[at] = next_state(states[at], verdict);
            match verdict.forward() {
                Some(next) => carried = next,
                None => return (states, hops),
            }
            at = (at + 1) % ids.len();
            hops += 1;
        }
    }

    #[test]
    fn greatest_id_wins_from_every_initiator() {
        let ids = [0, 2, 1, 5, 3, 4];
        for initiator in 0..ids.len() {
            let (states, hops) = simulate(&ids, initiator);
            assert!(hops <= 2 * ids.len());
            for (i, state) in states.iter().enumerate() {
                let expected = if ids[i] == 5 {
                    ElectionState::Leader
                } else {
                    ElectionState::Defeated
                };
                assert_eq!(*state, expected, "initiator {initiator}, peer {i}");
            }
        }
    }

    #[test]
    fn initiator_with_best_id_wins_on_first_circuit() {
        let (states, hops) = simulate(&[7, 1, 4], 0);
        assert_eq!(hops, 3);
        assert_eq!(states[0], ElectionState::Leader);
    }
}
