//! Builders for record values (RDATA)
//!
//! A `ResourceRecord` carries its value as opaque wire bytes. The functions
//! here produce those bytes for the record types that have internal
//! structure, and decode the SOA layout back.

use crate::dns::buffer::{PacketBuffer, VectorPacketBuffer};
use crate::dns::errors::{DecodeError, EncodeError};

/// Longest character-string (TXT, HINFO) segment
pub const MAX_CHARACTER_STRING: usize = 255;

/// Start of authority values
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SoaData {
    /// Primary name server for the zone
    pub m_name: String,
    /// Mailbox of the person responsible, with the `@` written as a dot
    pub r_name: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl SoaData {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_soa(
            &self.m_name,
            &self.r_name,
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum,
        )
    }

    pub fn read<T: PacketBuffer>(buffer: &mut T) -> Result<SoaData, DecodeError> {
        let mut m_name = String::new();
        buffer.read_qname(&mut m_name)?;

        let mut r_name = String::new();
        buffer.read_qname(&mut r_name)?;

        Ok(SoaData {
            m_name,
            r_name,
            serial: buffer.read_u32()?,
            refresh: buffer.read_u32()?,
            retry: buffer.read_u32()?,
            expire: buffer.read_u32()?,
            minimum: buffer.read_u32()?,
        })
    }
}

/// SOA value: two names followed by serial, refresh, retry, expire and
/// minimum as big-endian 32-bit integers, in that order.
pub fn encode_soa(
    m_name: &str,
    r_name: &str,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = VectorPacketBuffer::new();

    buffer.write_qname(m_name)?;
    buffer.write_qname(r_name)?;
    buffer.write_u32(serial)?;
    buffer.write_u32(refresh)?;
    buffer.write_u32(retry)?;
    buffer.write_u32(expire)?;
    buffer.write_u32(minimum)?;

    Ok(buffer.into_bytes())
}

/// Value made of one domain name (NS, CNAME, PTR, MD, MF)
pub fn encode_name(host: &str) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = VectorPacketBuffer::new();
    buffer.write_qname(host)?;

    Ok(buffer.into_bytes())
}

/// MINFO value: responsible mailbox, then error mailbox
pub fn encode_minfo(r_mailbox: &str, e_mailbox: &str) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = VectorPacketBuffer::new();
    buffer.write_qname(r_mailbox)?;
    buffer.write_qname(e_mailbox)?;

    Ok(buffer.into_bytes())
}

pub fn encode_mx(preference: u16, exchange: &str) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = VectorPacketBuffer::new();
    buffer.write_u16(preference)?;
    buffer.write_qname(exchange)?;

    Ok(buffer.into_bytes())
}

/// Length-prefixed character-strings, each at most 255 octets
pub fn encode_character_strings(strings: &[&str]) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = VectorPacketBuffer::new();
    for s in strings {
        let len = s.len();
        if len > MAX_CHARACTER_STRING {
            return Err(EncodeError::StringTooLong(len));
        }
        buffer.write_u8(len as u8)?;
        buffer.write_bytes(s.as_bytes())?;
    }

    Ok(buffer.into_bytes())
}

/// TXT value; long text is split over as many character-strings as needed
pub fn encode_txt(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return vec![0];
    }

    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / MAX_CHARACTER_STRING + 1);
    for chunk in bytes.chunks(MAX_CHARACTER_STRING) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }

    out
}
