//! JSON framing for envelopes: `{"from": pid, "message": {"tag": .., "payload": ..}}`.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{ProtocolError, TransportError};
use crate::network::messages::{Envelope, Message};

pub fn encode(envelope: &Envelope) -> Result<Bytes, TransportError> {
    let frame = serde_json::to_vec(envelope)?;
    Ok(Bytes::from(frame))
}

/// Decode a frame, telling unknown tags apart from otherwise broken frames.
pub fn decode(frame: &[u8]) -> Result<Envelope, ProtocolError> {
    let value: Value =
        serde_json::from_slice(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let tag = value
        .get("message")
        .and_then(|message| message.get("tag"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Malformed("missing message tag".into()))?;
    if !Message::TAGS.contains(&tag) {
        return Err(ProtocolError::UnknownTag(tag.to_string()));
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::types::PeerAddress;
    use crate::network::messages::AnnounceRound;

    #[test]
    fn frames_carry_the_wire_tag() {
        let envelope = Envelope {
            from: 3,
            message: Message::TableAnnounce {
                origin: PeerAddress::new(3, 5),
                round: AnnounceRound::Collect,
            },
        };
        let frame = encode(&envelope).unwrap();
        let json: Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(json["message"]["tag"], "TABLE_ANNOUNCE");
        assert_eq!(json["message"]["payload"]["round"], "COLLECT");
        assert_eq!(decode(&frame).unwrap(), envelope);
    }

    #[test]
    fn table_entry_keeps_resolved_slots() {
        let origin = PeerAddress::new(1, 0);
        let envelope = Envelope {
            from: 2,
            message: Message::TableEntry {
                origin,
                found: vec![PeerAddress::new(2, 2), PeerAddress::new(2, 2)],
                leader_origin: true,
            },
        };
        let decoded = decode(&encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn unknown_tag_is_reported_by_name() {
        let frame = br#"{"from":1,"message":{"tag":"GOSSIP","payload":{}}}"#;
        assert_eq!(
            decode(frame),
            Err(ProtocolError::UnknownTag("GOSSIP".into()))
        );
    }

    #[test]
    fn broken_frames_are_malformed() {
        assert!(matches!(decode(b"not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            decode(br#"{"from":1,"message":{"tag":"ELECT","payload":{}}}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode(br#"{"from":1}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
