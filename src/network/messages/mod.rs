pub mod codec;

use serde::{Deserialize, Serialize};

use crate::chord::routing::FingerWalk;
use crate::chord::types::{LogicalId, PeerAddress, ProcessId};

/// Which circulation of the completion announcement this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnounceRound {
    /// Gathers "my row is complete" from every peer before returning to the leader.
    Collect,
    /// Tells every peer that construction is over.
    Close,
}

/// Protocol messages exchanged between the coordinator and the peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// One-time initialization from the coordinator
    Setup {
        logical_id: LogicalId,
        successor: PeerAddress,
        initiator: bool,
    },
    /// Election relay carrying the best candidate seen so far
    Elect { candidate: LogicalId },
    /// Finger lookup relay for `origin`'s row; `found` holds the slots
    /// resolved so far
    TableEntry {
        origin: PeerAddress,
        found: Vec<PeerAddress>,
        leader_origin: bool,
    },
    /// Completion announcement started by the leader
    TableAnnounce {
        origin: PeerAddress,
        round: AnnounceRound,
    },
}

impl Message {
    pub const TAGS: [&'static str; 4] = ["SETUP", "ELECT", "TABLE_ENTRY", "TABLE_ANNOUNCE"];

    pub fn table_entry(walk: FingerWalk, leader_origin: bool) -> Self {
        Message::TableEntry {
            origin: walk.origin,
            found: walk.found,
            leader_origin,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Message::Setup { .. } => "SETUP",
            Message::Elect { .. } => "ELECT",
            Message::TableEntry { .. } => "TABLE_ENTRY",
            Message::TableAnnounce { .. } => "TABLE_ANNOUNCE",
        }
    }
}

/// A message together with the process that sent it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: ProcessId,
    pub message: Message,
}
