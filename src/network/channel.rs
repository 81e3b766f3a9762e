//! In-process transport: one bounded tokio mailbox per process.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::chord::types::ProcessId;
use crate::error::TransportError;
use crate::network::messages::{codec, Envelope, Message};
use crate::network::Transport;

type Mailboxes = Arc<HashMap<ProcessId, mpsc::Sender<Bytes>>>;

pub struct ChannelNetwork;

impl ChannelNetwork {
    /// Create mailboxes for processes `0..processes` and return one
    /// transport per process, indexed by process id.
    pub fn build(processes: usize, capacity: usize) -> Vec<ChannelTransport> {
        let mut senders = HashMap::with_capacity(processes);
        let mut receivers = Vec::with_capacity(processes);
        for id in 0..processes as ProcessId {
            let (tx, rx) = mpsc::channel(capacity);
            senders.insert(id, tx);
            receivers.push((id, rx));
        }

        let mailboxes: Mailboxes = Arc::new(senders);
        receivers
            .into_iter()
            .map(|(id, inbox)| ChannelTransport {
                id,
                inbox,
                mailboxes: mailboxes.clone(),
            })
            .collect()
    }
}

pub struct ChannelTransport {
    id: ProcessId,
    inbox: mpsc::Receiver<Bytes>,
    mailboxes: Mailboxes,
}

impl ChannelTransport {
    /// Put an already-encoded frame into `to`'s mailbox.
    pub async fn send_raw(&self, to: ProcessId, frame: Bytes) -> Result<(), TransportError> {
        let mailbox = self
            .mailboxes
            .get(&to)
            .ok_or(TransportError::UnknownPeer(to))?;
        mailbox
            .send(frame)
            .await
            .map_err(|_| TransportError::MailboxClosed(to))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn local_id(&self) -> ProcessId {
        self.id
    }

    async fn send(&self, to: ProcessId, message: Message) -> Result<(), TransportError> {
        let frame = codec::encode(&Envelope {
            from: self.id,
            message,
        })?;
        self.send_raw(to, frame).await
    }

    async fn recv(&mut self) -> Result<Envelope, TransportError> {
        let frame = self
            .inbox
            .recv()
            .await
            .ok_or(TransportError::MailboxClosed(self.id))?;
        Ok(codec::decode(&frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_send_order() {
        let mut transports = ChannelNetwork::build(2, 4);
        let mut receiver = transports.pop().unwrap();
        let sender = transports.pop().unwrap();

        for candidate in [4, 1, 9] {
            sender.send(1, Message::Elect { candidate }).await.unwrap();
        }
        for candidate in [4, 1, 9] {
            let envelope = receiver.recv().await.unwrap();
            assert_eq!(envelope.from, 0);
            assert_eq!(envelope.message, Message::Elect { candidate });
        }
    }

    #[tokio::test]
    async fn unknown_destination_is_an_error() {
        let transports = ChannelNetwork::build(1, 4);
        let err = transports[0]
            .send(7, Message::Elect { candidate: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownPeer(7)));
    }

    #[tokio::test]
    async fn undecodable_frame_leaves_the_mailbox_usable() {
        let mut transports = ChannelNetwork::build(2, 4);
        let mut receiver = transports.pop().unwrap();
        let sender = transports.pop().unwrap();

        sender
            .send_raw(1, Bytes::from_static(b"{\"from\":0,\"message\":{\"tag\":\"PING\"}}"))
            .await
            .unwrap();
        sender.send(1, Message::Elect { candidate: 2 }).await.unwrap();

        assert!(matches!(
            receiver.recv().await,
            Err(TransportError::Protocol(_))
        ));
        assert_eq!(
            receiver.recv().await.unwrap().message,
            Message::Elect { candidate: 2 }
        );
    }
}
