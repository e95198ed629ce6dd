//! Buffers for reading and writing DNS messages
//!
//! `PacketBuffer` is a cursor over a byte store with bounds-checked big-endian
//! accessors. The domain name codec lives here as well, since every name field
//! in a message goes through `read_qname` / `write_qname`.
//!
//! Names are carried as text in master file presentation form: label octets
//! that are not printable ASCII are written as `\DDD` (decimal), and a literal
//! `.` or `\` inside a label is written as `\.` or `\\`. Decoding and
//! re-encoding a name therefore gives back the exact wire octets.

use crate::dns::errors::{DecodeError, EncodeError};

/// Conventional maximum size of a DNS message carried over UDP
pub const MAX_PACKET_SIZE: usize = 512;

/// Maximum encoded length of a domain name, length octets and root label included
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a single label
pub const MAX_LABEL_LEN: usize = 63;

pub trait PacketBuffer {
    fn read(&mut self) -> Result<u8, DecodeError>;
    fn get(&self, pos: usize) -> Result<u8, DecodeError>;
    fn get_range(&self, start: usize, len: usize) -> Result<&[u8], DecodeError>;
    fn write(&mut self, val: u8) -> Result<(), EncodeError>;
    fn pos(&self) -> usize;
    fn seek(&mut self, pos: usize) -> Result<(), DecodeError>;
    fn step(&mut self, steps: usize) -> Result<(), DecodeError>;

    /// Number of octets that can still be written at the current position
    fn remaining(&self) -> usize;

    fn ensure_capacity(&self, needed: usize) -> Result<(), EncodeError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(EncodeError::BufferTooSmall { needed, remaining });
        }

        Ok(())
    }

    fn write_u8(&mut self, val: u8) -> Result<(), EncodeError> {
        self.write(val)
    }

    fn write_u16(&mut self, val: u16) -> Result<(), EncodeError> {
        self.write_bytes(&val.to_be_bytes())
    }

    fn write_u32(&mut self, val: u32) -> Result<(), EncodeError> {
        self.write_bytes(&val.to_be_bytes())
    }

    /// Writes all of `data` or nothing at all
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.ensure_capacity(data.len())?;
        for b in data {
            self.write(*b)?;
        }

        Ok(())
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let hi = self.read()?;
        let lo = self.read()?;

        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let pos = self.pos();
        let raw = self.get_range(pos, 4)?;
        let val = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        self.step(4)?;

        Ok(val)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        let pos = self.pos();
        let data = self.get_range(pos, len)?.to_vec();
        self.step(len)?;

        Ok(data)
    }

    /// Write a domain name as a sequence of length-prefixed labels
    ///
    /// The name is parsed and checked as a whole, and the remaining capacity
    /// verified, before anything is written; on error the buffer is left
    /// untouched. Returns the number of octets written.
    fn write_qname(&mut self, qname: &str) -> Result<usize, EncodeError> {
        let labels = parse_name(qname)?;

        if let Some(label) = labels.iter().find(|l| l.len() > MAX_LABEL_LEN) {
            return Err(EncodeError::LabelTooLong(label.len()));
        }

        let encoded_len = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        if encoded_len > MAX_NAME_LEN {
            return Err(EncodeError::NameTooLong(encoded_len));
        }
        self.ensure_capacity(encoded_len)?;

        for label in &labels {
            self.write_u8(label.len() as u8)?;
            self.write_bytes(label)?;
        }
        self.write_u8(0)?;

        Ok(encoded_len)
    }

    /// Read a domain name, appending it to `outstr` with labels joined by `.`
    ///
    /// Compression pointers are rejected. Returns the number of octets consumed.
    fn read_qname(&mut self, outstr: &mut String) -> Result<usize, DecodeError> {
        let start = self.pos();
        let mut delim = "";

        loop {
            let len = self.read()?;

            match len & 0xC0 {
                0x00 => {}
                0xC0 => return Err(DecodeError::CompressionPointer(self.pos() - 1)),
                _ => return Err(DecodeError::ReservedLabelType(len)),
            }

            if len == 0 {
                break;
            }

            // label plus the terminator that must still follow
            let projected = self.pos() - start + len as usize + 1;
            if projected > MAX_NAME_LEN {
                return Err(DecodeError::NameTooLong(projected));
            }

            let pos = self.pos();
            let label = self.get_range(pos, len as usize)?;

            outstr.push_str(delim);
            push_label_text(outstr, label);
            delim = ".";

            self.step(len as usize)?;
        }

        Ok(self.pos() - start)
    }
}

/// Split a name in presentation form into raw labels
///
/// `""` and `"."` are the root and give no labels; a single trailing dot is
/// allowed. Label lengths are not checked here.
pub fn parse_name(name: &str) -> Result<Vec<Vec<u8>>, EncodeError> {
    if name.is_empty() || name == "." {
        return Ok(Vec::new());
    }

    let bytes = name.as_bytes();
    let mut labels = Vec::new();
    let mut label = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                if label.is_empty() {
                    return Err(EncodeError::EmptyLabel);
                }
                labels.push(std::mem::take(&mut label));
                i += 1;
            }
            b'\\' => {
                let digits = bytes
                    .get(i + 1..i + 4)
                    .filter(|d| d.iter().all(u8::is_ascii_digit));

                if let Some(d) = digits {
                    let val = d
                        .iter()
                        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
                    if val > 255 {
                        return Err(EncodeError::InvalidEscape(i));
                    }
                    label.push(val as u8);
                    i += 4;
                } else if let Some(&c) = bytes.get(i + 1) {
                    label.push(c);
                    i += 2;
                } else {
                    return Err(EncodeError::InvalidEscape(i));
                }
            }
            c => {
                label.push(c);
                i += 1;
            }
        }
    }

    if !label.is_empty() {
        labels.push(label);
    }

    Ok(labels)
}

fn push_label_text(out: &mut String, label: &[u8]) {
    for &b in label {
        match b {
            b'.' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x21..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\{:03}", b)),
        }
    }
}

/// Fixed size buffer matching the UDP message budget
pub struct BytePacketBuffer {
    pub buf: [u8; MAX_PACKET_SIZE],
    pub pos: usize,
    /// End of valid data; reads past it fail
    pub len: usize,
}

impl BytePacketBuffer {
    /// This gives us a fresh buffer for holding the packet contents, and a field for
    /// keeping track of where we are.
    pub fn new() -> BytePacketBuffer {
        BytePacketBuffer {
            buf: [0; MAX_PACKET_SIZE],
            pos: 0,
            len: 0,
        }
    }

    /// Buffer holding a received datagram, positioned at its start
    ///
    /// Anything beyond `MAX_PACKET_SIZE` is cut off.
    pub fn from_bytes(data: &[u8]) -> BytePacketBuffer {
        let mut buffer = BytePacketBuffer::new();
        let len = data.len().min(MAX_PACKET_SIZE);
        buffer.buf[..len].copy_from_slice(&data[..len]);
        buffer.len = len;
        buffer
    }

    /// The octets written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Default for BytePacketBuffer {
    fn default() -> Self {
        BytePacketBuffer::new()
    }
}

impl PacketBuffer for BytePacketBuffer {
    fn read(&mut self) -> Result<u8, DecodeError> {
        if self.pos >= self.len {
            return Err(DecodeError::EndOfBuffer);
        }
        let res = self.buf[self.pos];
        self.pos += 1;

        Ok(res)
    }

    fn get(&self, pos: usize) -> Result<u8, DecodeError> {
        if pos >= self.len {
            return Err(DecodeError::EndOfBuffer);
        }
        Ok(self.buf[pos])
    }

    fn get_range(&self, start: usize, len: usize) -> Result<&[u8], DecodeError> {
        match start.checked_add(len) {
            Some(end) if end <= self.len => Ok(&self.buf[start..end]),
            _ => Err(DecodeError::EndOfBuffer),
        }
    }

    fn write(&mut self, val: u8) -> Result<(), EncodeError> {
        if self.pos >= MAX_PACKET_SIZE {
            return Err(EncodeError::BufferTooSmall {
                needed: 1,
                remaining: 0,
            });
        }
        self.buf[self.pos] = val;
        self.pos += 1;
        self.len = self.len.max(self.pos);

        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<(), DecodeError> {
        if pos > MAX_PACKET_SIZE {
            return Err(DecodeError::EndOfBuffer);
        }
        self.pos = pos;

        Ok(())
    }

    fn step(&mut self, steps: usize) -> Result<(), DecodeError> {
        if self.pos + steps > self.len {
            return Err(DecodeError::EndOfBuffer);
        }
        self.pos += steps;

        Ok(())
    }

    fn remaining(&self) -> usize {
        MAX_PACKET_SIZE - self.pos
    }
}

/// Growable buffer, used for record values and anywhere the 512 octet
/// budget does not apply
#[derive(Default, Clone, Debug)]
pub struct VectorPacketBuffer {
    pub buffer: Vec<u8>,
    pub pos: usize,
}

impl VectorPacketBuffer {
    pub fn new() -> VectorPacketBuffer {
        VectorPacketBuffer {
            buffer: Vec::new(),
            pos: 0,
        }
    }

    pub fn from_bytes(data: &[u8]) -> VectorPacketBuffer {
        VectorPacketBuffer {
            buffer: data.to_vec(),
            pos: 0,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl PacketBuffer for VectorPacketBuffer {
    fn read(&mut self) -> Result<u8, DecodeError> {
        let res = self.get(self.pos)?;
        self.pos += 1;

        Ok(res)
    }

    fn get(&self, pos: usize) -> Result<u8, DecodeError> {
        self.buffer.get(pos).copied().ok_or(DecodeError::EndOfBuffer)
    }

    fn get_range(&self, start: usize, len: usize) -> Result<&[u8], DecodeError> {
        start
            .checked_add(len)
            .and_then(|end| self.buffer.get(start..end))
            .ok_or(DecodeError::EndOfBuffer)
    }

    fn write(&mut self, val: u8) -> Result<(), EncodeError> {
        if self.pos < self.buffer.len() {
            self.buffer[self.pos] = val;
        } else {
            self.buffer.resize(self.pos, 0);
            self.buffer.push(val);
        }
        self.pos += 1;

        Ok(())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> Result<(), DecodeError> {
        self.pos = pos;

        Ok(())
    }

    fn step(&mut self, steps: usize) -> Result<(), DecodeError> {
        if self.pos + steps > self.buffer.len() {
            return Err(DecodeError::EndOfBuffer);
        }
        self.pos += steps;

        Ok(())
    }

    fn remaining(&self) -> usize {
        usize::MAX - self.pos
    }
}
