use crate::{NetError, Result, MAX_PAYLOAD};

/// The parser/UI contract's nine datagram prefixes. The framing layer
/// only needs to read and write the byte; it never interprets payload
/// content for any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    OriginalText,
    ColoredEcho,
    Error,
    Fact,
    Prior,
    Reply,
    Info,
    End,
    Quit,
}

impl Prefix {
    pub fn to_byte(self) -> u8 {
        match self {
            Prefix::OriginalText => b'o',
            Prefix::ColoredEcho => b'c',
            Prefix::Error => b'e',
            Prefix::Fact => b'f',
            Prefix::Prior => b'p',
            Prefix::Reply => b'r',
            Prefix::Info => b'i',
            Prefix::End => b'.',
            Prefix::Quit => b'#',
        }
    }

    pub fn from_byte(byte: u8) -> Result<Prefix> {
        Ok(match byte {
            b'o' => Prefix::OriginalText,
            b'c' => Prefix::ColoredEcho,
            b'e' => Prefix::Error,
            b'f' => Prefix::Fact,
            b'p' => Prefix::Prior,
            b'r' => Prefix::Reply,
            b'i' => Prefix::Info,
            b'.' => Prefix::End,
            b'#' => Prefix::Quit,
            other => return Err(NetError::Frame(format!("unknown prefix byte {other:#04x}"))),
        })
    }
}

/// A single datagram: `ID[4] PREFIX[1] PAYLOAD[<=1531]`. `id` is an
/// opaque 4-byte correlation token; a reply's id is its originating
/// request's id padded on the left with spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: [u8; 4],
    pub prefix: Prefix,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(id: [u8; 4], prefix: Prefix, payload: impl Into<Vec<u8>>) -> Result<Frame> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(NetError::Frame(format!(
                "payload too large: {} bytes; limit {MAX_PAYLOAD}",
                payload.len()
            )));
        }
        Ok(Frame { id, prefix, payload })
    }

    /// Pads `id` on the left with spaces to the fixed 4-byte width.
    pub fn id_from_str(id: &str) -> [u8; 4] {
        let mut bytes = [b' '; 4];
        let src = id.as_bytes();
        let start = bytes.len().saturating_sub(src.len());
        let copy_len = src.len().min(bytes.len());
        bytes[start..].copy_from_slice(&src[src.len() - copy_len..]);
        bytes
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 1 + self.payload.len());
        out.extend_from_slice(&self.id);
        out.push(self.prefix.to_byte());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        if bytes.len() < 5 {
            return Err(NetError::Frame(format!(
                "datagram too short: {} bytes; need at least 5",
                bytes.len()
            )));
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);
        let prefix = Prefix::from_byte(bytes[4])?;
        let payload = bytes[5..].to_vec();
        Frame::new(id, prefix, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_encode_decode() {
        let frame = Frame::new(*b"0001", Prefix::OriginalText, b"hello".to_vec()).unwrap();
        let encoded = frame.encode();
        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = vec![b'x'; MAX_PAYLOAD + 1];
        assert!(Frame::new(*b"0001", Prefix::Info, payload).is_err());
    }

    #[test]
    fn rejects_unknown_prefix_byte() {
        let mut bytes = vec![b'0', b'0', b'0', b'1', b'z'];
        bytes.extend_from_slice(b"body");
        assert!(Frame::decode(&bytes).is_err());
    }

    #[test]
    fn pads_short_ids_with_leading_spaces() {
        assert_eq!(Frame::id_from_str("7"), *b"   7");
        assert_eq!(Frame::id_from_str("42"), *b"  42");
        assert_eq!(Frame::id_from_str("1234"), *b"1234");
    }
}
