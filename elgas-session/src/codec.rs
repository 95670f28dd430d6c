//! Frame codec capability
//!
//! Callers that turn raw wire bytes into envelopes (and back) depend on the
//! [`FrameCodec`] trait so the escaping and check-byte rules can be replaced,
//! for example by a test double.

use crate::escape::{escape_characters, return_characters};
use crate::frame::Envelope;
use elgas_core::ElgasResult;

/// Converts between escaped wire frames and envelopes
pub trait FrameCodec: Send + Sync {
    /// De-escape raw wire bytes and decode them into an envelope
    fn decode(&self, raw: &[u8]) -> ElgasResult<Envelope>;

    /// Encode an envelope and escape it for the wire
    fn encode(&self, envelope: &Envelope) -> ElgasResult<Vec<u8>>;
}

/// Default ELGAS2 codec
#[derive(Debug, Clone, Copy, Default)]
pub struct ElgasFrameCodec;

impl FrameCodec for ElgasFrameCodec {
    fn decode(&self, raw: &[u8]) -> ElgasResult<Envelope> {
        let canonical = return_characters(raw)?;
        log::trace!("De-escaped frame: {:02X?}", canonical);
        Envelope::decode(&canonical)
    }

    fn encode(&self, envelope: &Envelope) -> ElgasResult<Vec<u8>> {
        escape_characters(&envelope.encode()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallRequest;
    use crate::frame::{ETX, STX};
    use elgas_core::ServiceNumber;
    use std::net::Ipv4Addr;

    /// Call to dispatching as sent by a field device
    const CAPTURED_CALL: &str = concat!(
        "02fe84879c000000000100001b0f000240a494dd96ce1b1bb7194164d56a6f80a4",
        "3030303030303030303030303030303100238208701063437800000359077320",
        "670651000100001f060000009e2b622d00000000000000000100000091caaf2c",
        "98000000000000002c408c8c0a474a4b1d2a622d017afecd0130312e30303000",
        "00000000000000000000000000000000000000000000000000007d432b0d",
    );

    #[test]
    fn test_wire_frame_has_no_inner_delimiters() {
        let envelope = Envelope {
            service: ServiceNumber::Call,
            group: 0x9B,
            source_address_1: 0x0D02,
            source_address_2: 0x8D,
            destination_address_1: 0x1B1B,
            destination_address_2: 0x82,
            data: vec![0x02, 0x0D, 0x9B, 0x00],
        };
        let wire = ElgasFrameCodec.encode(&envelope).unwrap();
        let inner = &wire[1..wire.len() - 1];
        assert!(!inner.contains(&STX));
        assert!(!inner.contains(&ETX));
        assert_eq!(ElgasFrameCodec.decode(&wire).unwrap(), envelope);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(ElgasFrameCodec.decode(b"hello world").is_err());
    }

    #[test]
    fn test_decode_captured_call() {
        let wire = hex::decode(CAPTURED_CALL).unwrap();
        assert_eq!(wire.len(), 159);

        let envelope = ElgasFrameCodec.decode(&wire).unwrap();
        assert_eq!(envelope.service, ServiceNumber::Call);
        assert_eq!(envelope.group, 0x87);
        assert_eq!(envelope.source_address_1, 1);
        assert_eq!(envelope.source_address_2, 0);
        assert_eq!(envelope.destination_address_1, 0);
        assert_eq!(envelope.destination_address_2, 0);
        assert_eq!(envelope.data.len(), 141);

        let call = CallRequest::decode(&envelope.data).unwrap();
        assert_eq!(call.structure_version, 2);
        assert_eq!(call.serial_number, 2358001708);
        assert_eq!(call.station_id, "0000000000000001");
        assert_eq!(call.ip_address, Ipv4Addr::new(10, 71, 74, 75));
        assert_eq!(call.firmware.as_deref(), Some("01.000"));

        assert_eq!(ElgasFrameCodec.encode(&envelope).unwrap(), wire);
    }
}
