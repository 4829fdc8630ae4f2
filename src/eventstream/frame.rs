//! The binary event-stream codec.
//!
//! Wire layout of one event:
//!
//! ```text
//! total_len:u32 | headers_len:u32 | prelude_crc:u32 | headers | payload | message_crc:u32
//! ```
//!
//! Both CRC32 words use the IEEE polynomial and are written big-endian.
//! The prelude CRC covers the first 8 bytes; the message CRC covers
//! everything before itself. Headers are a packed sequence of
//! `name_len:u8 | name | type:u8 | value`.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::hash::crc32;

/// Prelude (12) plus trailing message CRC (4).
const FRAME_OVERHEAD: usize = 16;

/// Header names are length-prefixed with a single byte.
pub const MAX_HEADER_NAME_LEN: usize = 255;
/// String and binary values are length-prefixed with two bytes.
pub const MAX_HEADER_VALUE_LEN: usize = 65535;

/// A typed event header value. The wire type byte is the discriminant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Boolean, wire types 0 (true) and 1 (false). No value bytes.
    Bool(bool),
    /// Signed 8-bit integer, wire type 2.
    Int8(i8),
    /// Signed 16-bit integer, wire type 3, big-endian.
    Int16(i16),
    /// Signed 32-bit integer, wire type 4, big-endian.
    Int32(i32),
    /// Signed 64-bit integer, wire type 5, big-endian.
    Int64(i64),
    /// Opaque bytes, wire type 6, u16 length prefix.
    Bytes(Bytes),
    /// UTF-8 string, wire type 7, u16 length prefix.
    String(String),
    /// Milliseconds since the Unix epoch, wire type 8, big-endian i64.
    Timestamp(i64),
    /// UUID, wire type 9, exactly 16 bytes.
    Uuid([u8; 16]),
}

/// A named event header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: HeaderValue,
}

impl Header {
    /// Create a header.
    pub fn new(name: impl Into<String>, value: HeaderValue) -> Self {
        Header {
            name: name.into(),
            value,
        }
    }

    /// The header name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The header value.
    pub fn value(&self) -> &HeaderValue {
        &self.value
    }
}

/// One framed event: headers plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    headers: Vec<Header>,
    payload: Bytes,
}

impl Message {
    /// Create a message with the given payload and no headers.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Message {
            headers: Vec::new(),
            payload: payload.into(),
        }
    }

    /// Add a header, builder style.
    pub fn add_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Headers in wire order.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Keyed lookup of a header value. Names are case-sensitive.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|h| h.name() == name)
            .map(Header::value)
    }

    /// The event payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Encode into a wire frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let headers = encode_headers(&self.headers)?;
        let total_len = FRAME_OVERHEAD + headers.len() + self.payload.len();

        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&(total_len as u32).to_be_bytes());
        out.extend_from_slice(&(headers.len() as u32).to_be_bytes());
        let prelude_crc = crc32(&out);
        out.extend_from_slice(&prelude_crc.to_be_bytes());
        out.extend_from_slice(&headers);
        out.extend_from_slice(&self.payload);
        let message_crc = crc32(&out);
        out.extend_from_slice(&message_crc.to_be_bytes());

        Ok(out)
    }

    /// Decode a wire frame, verifying both checksums and every length.
    pub fn decode(frame: &[u8]) -> Result<Message> {
        if frame.len() < FRAME_OVERHEAD {
            return Err(Error::invalid_format(format!(
                "event frame of {} bytes is shorter than the {FRAME_OVERHEAD}-byte minimum",
                frame.len()
            )));
        }

        let total_len = u32::from_be_bytes(frame[0..4].try_into().unwrap()) as usize;
        let headers_len = u32::from_be_bytes(frame[4..8].try_into().unwrap()) as usize;
        if total_len != frame.len() {
            return Err(Error::invalid_format(format!(
                "event frame length {} does not match encoded total of {total_len}",
                frame.len()
            )));
        }

        let prelude_crc = u32::from_be_bytes(frame[8..12].try_into().unwrap());
        if crc32(&frame[0..8]) != prelude_crc {
            return Err(Error::invalid_format("event prelude checksum mismatch"));
        }
        let message_crc = u32::from_be_bytes(frame[total_len - 4..].try_into().unwrap());
        if crc32(&frame[..total_len - 4]) != message_crc {
            return Err(Error::invalid_format("event message checksum mismatch"));
        }

        if headers_len > total_len - FRAME_OVERHEAD {
            return Err(Error::invalid_format(format!(
                "event headers length {headers_len} leaves no room for the payload"
            )));
        }

        let headers = decode_headers(&frame[12..12 + headers_len])?;
        let payload = Bytes::copy_from_slice(&frame[12 + headers_len..total_len - 4]);

        Ok(Message { headers, payload })
    }
}

/// Encode a header block without framing it.
pub fn encode_headers(headers: &[Header]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for header in headers {
        let name = header.name().as_bytes();
        if name.len() > MAX_HEADER_NAME_LEN {
            return Err(Error::invalid_format(format!(
                "event header name of {} bytes exceeds the {MAX_HEADER_NAME_LEN}-byte maximum",
                name.len()
            )));
        }
        out.push(name.len() as u8);
        out.extend_from_slice(name);

        match header.value() {
            HeaderValue::Bool(true) => out.push(0),
            HeaderValue::Bool(false) => out.push(1),
            HeaderValue::Int8(v) => {
                out.push(2);
                out.push(*v as u8);
            }
            HeaderValue::Int16(v) => {
                out.push(3);
                out.extend_from_slice(&v.to_be_bytes());
            }
            HeaderValue::Int32(v) => {
                out.push(4);
                out.extend_from_slice(&v.to_be_bytes());
            }
            HeaderValue::Int64(v) => {
                out.push(5);
                out.extend_from_slice(&v.to_be_bytes());
            }
            HeaderValue::Bytes(v) => {
                out.push(6);
                encode_len_prefixed(&mut out, header.name(), v)?;
            }
            HeaderValue::String(v) => {
                out.push(7);
                encode_len_prefixed(&mut out, header.name(), v.as_bytes())?;
            }
            HeaderValue::Timestamp(v) => {
                out.push(8);
                out.extend_from_slice(&v.to_be_bytes());
            }
            HeaderValue::Uuid(v) => {
                out.push(9);
                out.extend_from_slice(v);
            }
        }
    }
    Ok(out)
}

fn encode_len_prefixed(out: &mut Vec<u8>, name: &str, value: &[u8]) -> Result<()> {
    if value.len() > MAX_HEADER_VALUE_LEN {
        return Err(Error::invalid_format(format!(
            "event header {name:?} value of {} bytes exceeds the {MAX_HEADER_VALUE_LEN}-byte maximum",
            value.len()
        )));
    }
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    Ok(())
}

fn decode_headers(mut buf: &[u8]) -> Result<Vec<Header>> {
    let mut headers: Vec<Header> = Vec::new();
    while !buf.is_empty() {
        let name_len = buf[0] as usize;
        buf = &buf[1..];
        let name = take(&mut buf, name_len, "header name")?;
        let name = std::str::from_utf8(name)
            .map_err(|e| Error::invalid_format("event header name is not UTF-8").with_source(e))?
            .to_string();
        if headers.iter().any(|h| h.name() == name) {
            return Err(Error::invalid_format(format!(
                "duplicate event header {name:?}"
            )));
        }

        let type_code = take(&mut buf, 1, "header type")?[0];
        let value = match type_code {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Int8(take(&mut buf, 1, "int8 value")?[0] as i8),
            3 => HeaderValue::Int16(i16::from_be_bytes(
                take(&mut buf, 2, "int16 value")?.try_into().unwrap(),
            )),
            4 => HeaderValue::Int32(i32::from_be_bytes(
                take(&mut buf, 4, "int32 value")?.try_into().unwrap(),
            )),
            5 => HeaderValue::Int64(i64::from_be_bytes(
                take(&mut buf, 8, "int64 value")?.try_into().unwrap(),
            )),
            6 => {
                let len = u16::from_be_bytes(
                    take(&mut buf, 2, "binary length")?.try_into().unwrap(),
                ) as usize;
                HeaderValue::Bytes(Bytes::copy_from_slice(take(&mut buf, len, "binary value")?))
            }
            7 => {
                let len = u16::from_be_bytes(
                    take(&mut buf, 2, "string length")?.try_into().unwrap(),
                ) as usize;
                let bytes = take(&mut buf, len, "string value")?;
                HeaderValue::String(
                    std::str::from_utf8(bytes)
                        .map_err(|e| {
                            Error::invalid_format(format!(
                                "event header {name:?} string value is not UTF-8"
                            ))
                            .with_source(e)
                        })?
                        .to_string(),
                )
            }
            8 => HeaderValue::Timestamp(i64::from_be_bytes(
                take(&mut buf, 8, "timestamp value")?.try_into().unwrap(),
            )),
            9 => {
                let bytes: [u8; 16] = take(&mut buf, 16, "uuid value")?.try_into().unwrap();
                HeaderValue::Uuid(bytes)
            }
            other => {
                return Err(Error::invalid_format(format!(
                    "unknown event header type {other} for {name:?}"
                )))
            }
        };
        headers.push(Header::new(name, value));
    }
    Ok(headers)
}

fn take<'a>(buf: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8]> {
    if buf.len() < len {
        return Err(Error::invalid_format(format!(
            "event {what} is truncated: wanted {len} bytes, {} left",
            buf.len()
        )));
    }
    let (head, rest) = buf.split_at(len);
    *buf = rest;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_encode_empty_message() {
        let encoded = Message::new(Bytes::new()).encode().unwrap();
        assert_eq!(hex::encode(&encoded), "000000100000000005c248eb7d98c8ff");
    }

    #[test]
    fn test_round_trip() {
        let message = Message::new(&b"hello"[..])
            .add_header(Header::new(":message-type", HeaderValue::String("event".into())))
            .add_header(Header::new("flag", HeaderValue::Bool(true)))
            .add_header(Header::new("off", HeaderValue::Bool(false)))
            .add_header(Header::new("i8", HeaderValue::Int8(-5)))
            .add_header(Header::new("i16", HeaderValue::Int16(-256)))
            .add_header(Header::new("i32", HeaderValue::Int32(1 << 20)))
            .add_header(Header::new("i64", HeaderValue::Int64(-(1 << 40))))
            .add_header(Header::new("bin", HeaderValue::Bytes(Bytes::from_static(b"\x00\x01\x02"))))
            .add_header(Header::new(":date", HeaderValue::Timestamp(1369353600000)))
            .add_header(Header::new("id", HeaderValue::Uuid([7; 16])));

        let decoded = Message::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.header(":date"), Some(&HeaderValue::Timestamp(1369353600000)));
        assert_eq!(decoded.header(":DATE"), None);
    }

    #[test]
    fn test_any_single_byte_corruption_fails() {
        let message = Message::new(&b"payload"[..])
            .add_header(Header::new(":event-type", HeaderValue::String("AudioEvent".into())));
        let encoded = message.encode().unwrap();

        for i in 0..encoded.len() {
            let mut corrupted = encoded.clone();
            corrupted[i] ^= 0x01;
            assert!(Message::decode(&corrupted).is_err(), "byte {i} flip went unnoticed");
        }
    }

    #[test]
    fn test_decode_rejects_wrong_total_len() {
        let encoded = Message::new(&b"x"[..]).encode().unwrap();
        assert!(Message::decode(&encoded[..encoded.len() - 1]).is_err());

        let mut extended = encoded.clone();
        extended.push(0);
        assert!(Message::decode(&extended).is_err());
    }

    #[test]
    fn test_decode_rejects_duplicate_header() {
        let message = Message::new(Bytes::new())
            .add_header(Header::new("dup", HeaderValue::Int8(1)))
            .add_header(Header::new("dup", HeaderValue::Int8(2)));
        // encoding permits it; strict decoding refuses
        let encoded = message.encode().unwrap();
        let err = Message::decode(&encoded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let message =
            Message::new(Bytes::new()).add_header(Header::new("h", HeaderValue::Int8(0)));
        let mut encoded = message.encode().unwrap();
        // header block starts at 12: name_len(1) + "h"(1), type byte follows
        let type_at = 12 + 2;
        encoded[type_at] = 10;
        // refresh the message CRC so only the type byte is at fault
        let crc_at = encoded.len() - 4;
        let crc = crc32(&encoded[..crc_at]);
        encoded[crc_at..].copy_from_slice(&crc.to_be_bytes());

        let err = Message::decode(&encoded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(err.to_string().contains("unknown event header type"));
    }

    #[test]
    fn test_header_size_limits() {
        let ok = Header::new("n".repeat(255), HeaderValue::Bool(true));
        assert!(encode_headers(&[ok]).is_ok());
        let too_long = Header::new("n".repeat(256), HeaderValue::Bool(true));
        assert!(encode_headers(&[too_long]).is_err());

        let ok = Header::new("s", HeaderValue::String("v".repeat(65535)));
        assert!(encode_headers(&[ok]).is_ok());
        let too_long = Header::new("s", HeaderValue::String("v".repeat(65536)));
        assert!(encode_headers(&[too_long]).is_err());

        let ok = Header::new("b", HeaderValue::Bytes(Bytes::from(vec![0; 65535])));
        assert!(encode_headers(&[ok]).is_ok());
        let too_long = Header::new("b", HeaderValue::Bytes(Bytes::from(vec![0; 65536])));
        assert!(encode_headers(&[too_long]).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_value() {
        // name "t", type int32, but only two value bytes
        let mut headers = vec![1, b't', 4, 0, 0];
        let total = (FRAME_OVERHEAD + headers.len()) as u32;
        let mut frame = Vec::new();
        frame.extend_from_slice(&total.to_be_bytes());
        frame.extend_from_slice(&(headers.len() as u32).to_be_bytes());
        let prelude_crc = crc32(&frame);
        frame.extend_from_slice(&prelude_crc.to_be_bytes());
        frame.append(&mut headers);
        let message_crc = crc32(&frame);
        frame.extend_from_slice(&message_crc.to_be_bytes());

        let err = Message::decode(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
