//! Byte escaping for ELGAS2 frames
//!
//! Inside a frame, bytes that collide with the frame delimiters (and their
//! high-bit variants) are replaced by [`ESCAPE`] followed by a code byte.
//! The STX and ETX delimiters themselves are never escaped.

use crate::frame::{ETX, STX};
use elgas_core::{ElgasError, ElgasResult};

/// Escape marker
pub const ESCAPE: u8 = 0x1B;

/// Reserved byte and the code byte that follows [`ESCAPE`] in its place
const ESCAPE_TABLE: [(u8, u8); 6] = [
    (0x02, 0x0A),
    (0x0D, 0x0B),
    (0x1B, 0x1B),
    (0x82, 0x0E),
    (0x8D, 0x0F),
    (0x9B, 0x10),
];

fn escape_code(byte: u8) -> Option<u8> {
    ESCAPE_TABLE
        .iter()
        .find(|(reserved, _)| *reserved == byte)
        .map(|(_, code)| *code)
}

fn reserved_byte(code: u8) -> Option<u8> {
    ESCAPE_TABLE
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(reserved, _)| *reserved)
}

fn frame_body(frame: &[u8]) -> ElgasResult<&[u8]> {
    match frame {
        [STX, body @ .., ETX] => Ok(body),
        _ => Err(ElgasError::FrameInvalid(
            "Frame must start with STX and end with ETX".to_string(),
        )),
    }
}

/// Escape the body of a complete frame (STX ... ETX)
pub fn escape_characters(frame: &[u8]) -> ElgasResult<Vec<u8>> {
    let body = frame_body(frame)?;
    let mut result = Vec::with_capacity(frame.len() + 8);
    result.push(STX);
    for &byte in body {
        match escape_code(byte) {
            Some(code) => {
                result.push(ESCAPE);
                result.push(code);
            }
            None => result.push(byte),
        }
    }
    result.push(ETX);
    Ok(result)
}

/// Reverse [`escape_characters`], recovering the canonical frame bytes
///
/// # Errors
/// Returns `FrameInvalid` if the delimiters are missing, an escape marker is
/// the last byte of the body, or it is followed by an unknown code.
pub fn return_characters(frame: &[u8]) -> ElgasResult<Vec<u8>> {
    let body = frame_body(frame)?;
    let mut result = Vec::with_capacity(frame.len());
    result.push(STX);
    let mut iter = body.iter();
    while let Some(&byte) = iter.next() {
        if byte != ESCAPE {
            result.push(byte);
            continue;
        }
        let code = iter.next().ok_or_else(|| {
            ElgasError::FrameInvalid("Dangling escape marker at end of frame".to_string())
        })?;
        let reserved = reserved_byte(*code).ok_or_else(|| {
            ElgasError::FrameInvalid(format!("Unknown escape code 0x{:02X}", code))
        })?;
        result.push(reserved);
    }
    result.push(ETX);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved_bytes() {
        let frame = [STX, 0x01, 0x8D, 0x1B, 0x0D, 0x02, ETX];
        let escaped = escape_characters(&frame).unwrap();
        assert_eq!(
            escaped,
            vec![STX, 0x01, 0x1B, 0x0F, 0x1B, 0x1B, 0x1B, 0x0B, 0x1B, 0x0A, ETX]
        );
        // no delimiter may appear inside an escaped body
        assert!(!escaped[1..escaped.len() - 1].contains(&ETX));
        assert_eq!(return_characters(&escaped).unwrap(), frame.to_vec());
    }

    #[test]
    fn test_return_characters_from_captured_length_field() {
        // A call frame announces a structure length of 141 (0x8D) as 1B 0F.
        let raw = [STX, 0x1B, 0x0F, 0x00, ETX];
        assert_eq!(return_characters(&raw).unwrap(), vec![STX, 0x8D, 0x00, ETX]);
    }

    #[test]
    fn test_return_characters_rejects_dangling_escape() {
        let raw = [STX, 0x01, ESCAPE, ETX];
        assert!(matches!(return_characters(&raw), Err(ElgasError::FrameInvalid(_))));
    }

    #[test]
    fn test_return_characters_rejects_unknown_code() {
        let raw = [STX, ESCAPE, 0x55, ETX];
        assert!(return_characters(&raw).is_err());
    }

    #[test]
    fn test_missing_delimiters() {
        assert!(return_characters(&[0x01, 0x02, 0x03]).is_err());
        assert!(escape_characters(&[STX]).is_err());
        assert!(return_characters(&[]).is_err());
    }
}
