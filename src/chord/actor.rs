use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::task::JoinHandle;

use crate::chord::election::{self, Verdict};
use crate::chord::routing::FingerWalk;
use crate::chord::types::{ElectionState, FingerTable, PeerAddress, ProcessId, RingParams};
use crate::chord::COORDINATOR;
use crate::error::{ProtocolError, RingError, TransportError};
use crate::network::messages::{AnnounceRound, Envelope, Message};
use crate::network::Transport;

/// Whether the dispatch loop keeps receiving after a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

/// Final state of a peer once its dispatch loop has stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeerReport {
    pub address: PeerAddress,
    pub successor: PeerAddress,
    pub initiator: bool,
    pub election: ElectionState,
    pub fingers: Vec<PeerAddress>,
    pub done: bool,
    pub messages_sent: u64,
}

/// One ring member. Owns its election state and finger table and only
/// talks to the rest of the ring through its transport.
pub struct PeerActor<T: Transport> {
    transport: T,
    me: PeerAddress,
    successor: PeerAddress,
    initiator: bool,
    ring: RingParams,
    election: ElectionState,
    fingers: FingerTable,
    round_started: bool,
    // origin of a Collect announce waiting for our row to complete
    held_announce: Option<PeerAddress>,
    done: bool,
    sent: u64,
    // frames that arrived before our setup
    deferred: VecDeque<Envelope>,
}

impl<T: Transport> PeerActor<T> {
    /// Block until the coordinator's SETUP arrives. Anything received
    /// earlier is kept and replayed once the peer is running.
    pub async fn bootstrap(mut transport: T, ring: RingParams) -> Result<Self, RingError> {
        let pid = transport.local_id();
        info!("P{}> Starting node", pid);

        let mut deferred = VecDeque::new();
        loop {
            let envelope = match transport.recv().await {
                Ok(envelope) => envelope,
                Err(TransportError::Protocol(e)) => {
                    warn!("P{}> Discarding frame: {}", pid, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match envelope.message {
                Message::Setup {
                    logical_id,
                    successor,
                    initiator,
                } if envelope.from == COORDINATOR => {
                    let me = PeerAddress::new(pid, logical_id);
                    info!(
                        "P{}> Chord rank = {}, next = {}",
                        pid, logical_id, successor
                    );
                    return Ok(Self {
                        transport,
                        me,
                        successor,
                        initiator,
                        ring,
                        election: ElectionState::Candidate,
                        fingers: FingerTable::new(ring.slots()),
                        round_started: false,
                        held_announce: None,
                        done: false,
                        sent: 0,
                        deferred,
                    });
                }
                Message::Setup { .. } => {
                    warn!(
                        "P{}> Ignoring SETUP from process {}, only the coordinator may send it",
                        pid, envelope.from
                    );
                }
                _ => {
                    debug!(
                        "P{}> Deferring {} from {} until setup",
                        pid,
                        envelope.message.tag(),
                        envelope.from
                    );
                    deferred.push_back(envelope);
                }
            }
        }
    }

    pub fn address(&self) -> PeerAddress {
        self.me
    }

    /// Run the protocol until construction is closed.
    pub async fn run(mut self) -> Result<PeerReport, RingError> {
        let pid = self.me.process;

        if self.initiator {
            info!("P{}> Is initiator, starting election", pid);
            self.send_successor(Message::Elect {
                candidate: self.me.logical,
            })
            .await?;
        }

        let mut step = Step::Continue;
        while step == Step::Continue {
            let envelope = match self.deferred.pop_front() {
                Some(envelope) => envelope,
                None => match self.transport.recv().await {
                    Ok(envelope) => envelope,
                    Err(TransportError::Protocol(e)) => {
                        warn!("P{}> Discarding frame: {}", pid, e);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                },
            };
            step = self.handle_message(envelope).await?;
        }

        info!("P{}> finger table: {}", pid, self.fingers);
        Ok(self.report())
    }

    async fn handle_message(&mut self, envelope: Envelope) -> Result<Step, RingError> {
        let Envelope { from, message } = envelope;
        debug!(
            "P{}> Received message from {}, tag = {}",
            self.me.process,
            from,
            message.tag()
        );

        let result: Result<Step, RingError> = match message {
            Message::Setup { .. } => Err(ProtocolError::Unexpected {
                tag: "SETUP",
                from,
                reason: "peer is already initialized".into(),
            }
            .into()),
            Message::Elect { candidate } => self.on_elect(from, candidate).await,
            Message::TableEntry {
                origin,
                found,
                leader_origin,
            } => {
                self.on_table_entry(from, FingerWalk { origin, found }, leader_origin)
                    .await
            }
            Message::TableAnnounce { origin, round } => {
                self.on_announce(from, origin, round).await
            }
        };

        match result {
            Err(RingError::Protocol(e)) => {
                warn!("P{}> {}", self.me.process, e);
                Ok(Step::Continue)
            }
            other => other,
        }
    }

    async fn on_elect(&mut self, from: ProcessId, candidate: u64) -> Result<Step, RingError> {
        if self.election == ElectionState::Leader {
            return Err(ProtocolError::Unexpected {
                tag: "ELECT",
                from,
                reason: "election is already decided".into(),
            }
            .into());
        }

        let verdict = election::evaluate(self.me.logical, candidate);
        self.election = election::next_state(self.election, verdict);
        match verdict {
            Verdict::Leader => {
                info!(
                    "P{}> Elected leader with logical id {}",
                    self.me.process, self.me.logical
                );
                self.start_round(true).await?;
            }
            Verdict::Defeated { forward } | Verdict::Supersede { forward } => {
                debug!(
                    "P{}> Election: carried {}, own {}, now {}",
                    self.me.process, candidate, self.me.logical, self.election
                );
                self.send_successor(Message::Elect { candidate: forward })
                    .await?;
            }
        }
        Ok(Step::Continue)
    }

    /// Send our own lookup walk around the ring.
    async fn start_round(&mut self, leader_origin: bool) -> Result<(), RingError> {
        self.round_started = true;
        let walk = FingerWalk::new(self.me);
        self.send_successor(Message::table_entry(walk, leader_origin))
            .await
    }

    async fn on_table_entry(
        &mut self,
        from: ProcessId,
        mut walk: FingerWalk,
        leader_origin: bool,
    ) -> Result<Step, RingError> {
        if walk.origin == self.me {
            if self.fingers.is_complete() {
                return Err(ProtocolError::Unexpected {
                    tag: "TABLE_ENTRY",
                    from,
                    reason: "finger table is already complete".into(),
                }
                .into());
            }
            walk.close(&mut self.fingers)?;
            info!("P{}> Row complete: {}", self.me.process, self.fingers);
            return self.on_row_complete().await.map(|_| Step::Continue);
        }

        // The leader's first pass starts everyone else's round.
        if leader_origin && !self.round_started {
            self.start_round(false).await?;
        }

        let resolved = walk.visit(self.me, &self.ring);
        if resolved > 0 {
            debug!(
                "P{}> Resolved {} slot(s) for P{}",
                self.me.process, resolved, walk.origin.process
            );
        }
        self.send_successor(Message::table_entry(walk, leader_origin))
            .await?;
        Ok(Step::Continue)
    }

    async fn on_row_complete(&mut self) -> Result<(), RingError> {
        if self.election == ElectionState::Leader {
            return self
                .send_successor(Message::TableAnnounce {
                    origin: self.me,
                    round: AnnounceRound::Collect,
                })
                .await;
        }
        if let Some(origin) = self.held_announce.take() {
            debug!("P{}> Releasing held announce", self.me.process);
            self.send_successor(Message::TableAnnounce {
                origin,
                round: AnnounceRound::Collect,
            })
            .await?;
        }
        Ok(())
    }

    async fn on_announce(
        &mut self,
        from: ProcessId,
        origin: PeerAddress,
        round: AnnounceRound,
    ) -> Result<Step, RingError> {
        match round {
            AnnounceRound::Collect if origin == self.me => {
                info!(
                    "P{}> Every row is complete, closing construction",
                    self.me.process
                );
                self.send_successor(Message::TableAnnounce {
                    origin,
                    round: AnnounceRound::Close,
                })
                .await?;
                Ok(Step::Continue)
            }
            AnnounceRound::Collect => {
                if self.fingers.is_complete() {
                    self.send_successor(Message::TableAnnounce { origin, round })
                        .await?;
                } else {
                    debug!(
                        "P{}> Holding announce until our row is complete",
                        self.me.process
                    );
                    self.held_announce = Some(origin);
                }
                Ok(Step::Continue)
            }
            AnnounceRound::Close => {
                if !self.fingers.is_complete() {
                    return Err(ProtocolError::Unexpected {
                        tag: "TABLE_ANNOUNCE",
                        from,
                        reason: format!(
                            "close received with {} of {} slots filled",
                            self.fingers.filled(),
                            self.fingers.len()
                        ),
                    }
                    .into());
                }
                if origin != self.me {
                    self.send_successor(Message::TableAnnounce { origin, round })
                        .await?;
                }
                self.done = true;
                info!("P{}> Done", self.me.process);
                Ok(Step::Done)
            }
        }
    }

    async fn send_successor(&mut self, message: Message) -> Result<(), RingError> {
        self.transport
            .send(self.successor.process, message)
            .await?;
        self.sent += 1;
        Ok(())
    }

    fn report(&self) -> PeerReport {
        PeerReport {
            address: self.me,
            successor: self.successor,
            initiator: self.initiator,
            election: self.election,
            fingers: self.fingers.entries().unwrap_or_default(),
            done: self.done,
            messages_sent: self.sent,
        }
    }
}

/// Spawn a peer task that waits for setup, runs the protocol and returns
/// its report.
pub fn spawn_peer<T>(transport: T, ring: RingParams) -> JoinHandle<Result<PeerReport, RingError>>
where
    T: Transport + 'static,
{
    tokio::spawn(async move {
        let actor = PeerActor::bootstrap(transport, ring).await?;
        actor.run().await
    })
}
