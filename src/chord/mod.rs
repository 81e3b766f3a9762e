pub mod actor;
pub mod coordinator;
pub mod election;
pub mod routing;
pub mod types;

// Ring configuration
pub const DEFAULT_RING_SIZE: usize = 6;
pub const MIN_RING_SIZE: usize = 2;
pub const MAX_RING_SIZE: usize = 20;

/// Process id of the ring coordinator; peers are numbered from `FIRST_PEER`.
pub const COORDINATOR: types::ProcessId = 0;
pub const FIRST_PEER: types::ProcessId = 1;
