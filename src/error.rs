use thiserror::Error;

use crate::chord::types::ProcessId;

#[derive(Error, Debug)]
pub enum RingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Peer task failed: {0}")]
    PeerTask(String),

    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Incorrect number of processes: expected {expected}, got {actual}")]
    ParticipantCount { expected: usize, actual: usize },

    #[error("Ring size {0} out of range ({min}..={max})", min = crate::chord::MIN_RING_SIZE, max = crate::chord::MAX_RING_SIZE)]
    RingSize(usize),

    #[error("Invalid ring layout: {0}")]
    InvalidLayout(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("No mailbox for process {0}")]
    UnknownPeer(ProcessId),

    #[error("Mailbox of process {0} is closed")]
    MailboxClosed(ProcessId),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Undefined message tag: {0}")]
    UnknownTag(String),

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Finger slot {0} is already filled")]
    SlotFilled(usize),

    #[error("Finger slot {slot} out of range (table has {len} slots)")]
    SlotOutOfRange { slot: usize, len: usize },

    #[error("Unexpected {tag} message from process {from}: {reason}")]
    Unexpected {
        tag: &'static str,
        from: ProcessId,
        reason: String,
    },
}
