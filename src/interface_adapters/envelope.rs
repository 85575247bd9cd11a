// Outer framing of binary frames exchanged with the relay node.
//
//   outbound: 1 = dest (string), 2 = payload (bytes)
//   inbound:  1 = src (string),  2 = payload (bytes)
// Unknown fields are skipped so relays may add metadata.

use prost::Message as ProstMessage;

use crate::domain::errors::EnvelopeError;

#[derive(Clone, PartialEq, prost::Message)]
pub struct OutboundMessage {
    #[prost(string, tag = "1")]
    pub dest: String,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InboundMessage {
    #[prost(string, tag = "1")]
    pub src: String,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub src: String,
    pub payload: Vec<u8>,
}

pub fn encode_outbound(dest: &str, payload: &[u8]) -> Vec<u8> {
    OutboundMessage {
        dest: dest.to_string(),
        payload: payload.to_vec(),
    }
    .encode_to_vec()
}

/// Relay-side framing of a delivered message. Used by relays and tests.
pub fn encode_inbound(src: &str, payload: &[u8]) -> Vec<u8> {
    InboundMessage {
        src: src.to_string(),
        payload: payload.to_vec(),
    }
    .encode_to_vec()
}

/// A frame without a source cannot be attributed to a peer, so it is rejected.
pub fn decode_inbound(bytes: &[u8]) -> Result<Inbound, EnvelopeError> {
    let msg = InboundMessage::decode(bytes)?;
    if msg.src.is_empty() {
        return Err(EnvelopeError::MissingSource);
    }
    Ok(Inbound {
        src: msg.src,
        payload: msg.payload,
    })
}

/// Relay-side parsing of an outbound frame.
pub fn decode_outbound(bytes: &[u8]) -> Result<(String, Vec<u8>), EnvelopeError> {
    let msg = OutboundMessage::decode(bytes)?;
    Ok((msg.dest, msg.payload))
}
