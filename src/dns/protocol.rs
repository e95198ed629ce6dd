//! implements the DNS protocol in a transport agnostic fashion

use std::convert::TryFrom;
use std::fmt;
use std::net::Ipv4Addr;

use crate::dns::buffer::{BytePacketBuffer, PacketBuffer};
use crate::dns::errors::{DecodeError, EncodeError};
use crate::dns::query_type::{RecordClass, RecordType};
use crate::dns::rdata::SoaData;

pub use crate::dns::result_code::ResultCode;

/// Size of the fixed message header
pub const HEADER_SIZE: usize = 12;

/// Whether a message is a query or a response (the QR bit)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum MessageType {
    #[default]
    Query,
    Response,
}

/// Kind of query, from the 4-bit OPCODE field
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum OpCode {
    #[default]
    Query = 0,
    InverseQuery = 1,
    Status = 2,
}

impl OpCode {
    pub fn from_num(num: u8) -> Option<OpCode> {
        match num {
            0 => Some(OpCode::Query),
            1 => Some(OpCode::InverseQuery),
            2 => Some(OpCode::Status),
            _ => None,
        }
    }

    pub fn to_num(self) -> u8 {
        self as u8
    }
}

/// Representation of a DNS header
///
/// The section counts are filled in by `build_response` from the sections it
/// actually writes; on a decoded header they are whatever the peer sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16, // 16 bits

    pub message_type: MessageType,  // 1 bit
    pub opcode: OpCode,             // 4 bits
    pub authoritative_answer: bool, // 1 bit
    pub truncated_message: bool,    // 1 bit
    pub recursion_desired: bool,    // 1 bit

    pub recursion_available: bool, // 1 bit
    pub rescode: ResultCode,       // 4 bits

    pub questions: u16,             // 16 bits
    pub answers: u16,               // 16 bits
    pub authoritative_entries: u16, // 16 bits
    pub resource_entries: u16,      // 16 bits
}

impl DnsHeader {
    pub fn new() -> DnsHeader {
        DnsHeader::default()
    }

    /// Write the 12 header octets; the three reserved bits are always zero
    pub fn write<T: PacketBuffer>(&self, buffer: &mut T) -> Result<(), EncodeError> {
        buffer.ensure_capacity(HEADER_SIZE)?;

        buffer.write_u16(self.id)?;

        buffer.write_u8(
            (self.recursion_desired as u8)
                | ((self.truncated_message as u8) << 1)
                | ((self.authoritative_answer as u8) << 2)
                | (self.opcode.to_num() << 3)
                | (((self.message_type == MessageType::Response) as u8) << 7),
        )?;

        buffer.write_u8(self.rescode.to_num() | ((self.recursion_available as u8) << 7))?;

        buffer.write_u16(self.questions)?;
        buffer.write_u16(self.answers)?;
        buffer.write_u16(self.authoritative_entries)?;
        buffer.write_u16(self.resource_entries)?;

        Ok(())
    }

    pub fn read<T: PacketBuffer>(buffer: &mut T) -> Result<DnsHeader, DecodeError> {
        let id = buffer.read_u16()?;

        let flags = buffer.read_u16()?;
        let a = (flags >> 8) as u8;
        let b = (flags & 0xFF) as u8;

        let opcode_num = (a >> 3) & 0x0F;
        let opcode = OpCode::from_num(opcode_num).ok_or(DecodeError::InvalidOpCode(opcode_num))?;

        let rescode_num = b & 0x0F;
        let rescode = ResultCode::from_num(rescode_num)
            .ok_or(DecodeError::InvalidResponseCode(rescode_num))?;

        Ok(DnsHeader {
            id,
            message_type: if (a & (1 << 7)) > 0 {
                MessageType::Response
            } else {
                MessageType::Query
            },
            opcode,
            authoritative_answer: (a & (1 << 2)) > 0,
            truncated_message: (a & (1 << 1)) > 0,
            recursion_desired: (a & (1 << 0)) > 0,
            recursion_available: (b & (1 << 7)) > 0,
            rescode,
            questions: buffer.read_u16()?,
            answers: buffer.read_u16()?,
            authoritative_entries: buffer.read_u16()?,
            resource_entries: buffer.read_u16()?,
        })
    }
}

impl fmt::Display for DnsHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DnsHeader:")?;
        writeln!(f, "\tid: {0}", self.id)?;

        writeln!(f, "\tmessage_type: {:?}", self.message_type)?;
        writeln!(f, "\topcode: {:?}", self.opcode)?;
        writeln!(f, "\tauthoritative_answer: {0}", self.authoritative_answer)?;
        writeln!(f, "\ttruncated_message: {0}", self.truncated_message)?;
        writeln!(f, "\trecursion_desired: {0}", self.recursion_desired)?;

        writeln!(f, "\trecursion_available: {0}", self.recursion_available)?;
        writeln!(f, "\trescode: {:?}", self.rescode)?;

        writeln!(f, "\tquestions: {0}", self.questions)?;
        writeln!(f, "\tanswers: {0}", self.answers)?;
        writeln!(f, "\tauthoritative_entries: {0}", self.authoritative_entries)?;
        writeln!(f, "\tresource_entries: {0}", self.resource_entries)?;

        Ok(())
    }
}

/// Representation of a DNS question
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl DnsQuestion {
    pub fn new(name: String, qtype: RecordType) -> DnsQuestion {
        DnsQuestion {
            name,
            qtype,
            qclass: RecordClass::In,
        }
    }

    pub fn write<T: PacketBuffer>(&self, buffer: &mut T) -> Result<usize, EncodeError> {
        let start_pos = buffer.pos();

        buffer.write_qname(&self.name)?;
        buffer.ensure_capacity(4)?;
        buffer.write_u16(self.qtype.to_num())?;
        buffer.write_u16(self.qclass.to_num())?;

        Ok(buffer.pos() - start_pos)
    }

    /// Type and class must both be in the identifier tables; anything else
    /// is a decode failure rather than something to skip over.
    pub fn read<T: PacketBuffer>(buffer: &mut T) -> Result<DnsQuestion, DecodeError> {
        let mut name = String::new();
        buffer.read_qname(&mut name)?;

        let type_num = buffer.read_u16()?;
        let qtype = RecordType::from_num(type_num).ok_or(DecodeError::UnrecognizedType(type_num))?;

        let class_num = buffer.read_u16()?;
        let qclass =
            RecordClass::from_num(class_num).ok_or(DecodeError::UnrecognizedClass(class_num))?;

        Ok(DnsQuestion {
            name,
            qtype,
            qclass,
        })
    }
}

impl fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Question name: \"{}\", type: \"{}\", class: \"{}\">",
            self.name, self.qtype, self.qclass
        )
    }
}

/// `ResourceRecord` is a named, typed, timed record with an opaque value
///
/// The value is kept in wire form. Helpers in `rdata` build values for the
/// types that have structure, such as SOA.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRecord {
    pub domain: String,
    pub rtype: RecordType,
    pub class: RecordClass,
    pub ttl: u32,
    pub data: Vec<u8>,
}

impl ResourceRecord {
    pub fn new(domain: String, rtype: RecordType, ttl: u32, data: Vec<u8>) -> ResourceRecord {
        ResourceRecord {
            domain,
            rtype,
            class: RecordClass::In,
            ttl,
            data,
        }
    }

    pub fn a(domain: String, addr: Ipv4Addr, ttl: u32) -> ResourceRecord {
        ResourceRecord::new(domain, RecordType::A, ttl, addr.octets().to_vec())
    }

    pub fn soa(domain: String, soa: &SoaData, ttl: u32) -> Result<ResourceRecord, EncodeError> {
        Ok(ResourceRecord::new(
            domain,
            RecordType::Soa,
            ttl,
            soa.to_bytes()?,
        ))
    }

    pub fn write<T: PacketBuffer>(&self, buffer: &mut T) -> Result<usize, EncodeError> {
        let data_len = u16::try_from(self.data.len())
            .map_err(|_| EncodeError::ValueTooLong(self.data.len()))?;

        let start_pos = buffer.pos();

        buffer.write_qname(&self.domain)?;
        buffer.ensure_capacity(10 + self.data.len())?;
        buffer.write_u16(self.rtype.to_num())?;
        buffer.write_u16(self.class.to_num())?;
        buffer.write_u32(self.ttl)?;
        buffer.write_u16(data_len)?;
        buffer.write_bytes(&self.data)?;

        Ok(buffer.pos() - start_pos)
    }

    pub fn read<T: PacketBuffer>(buffer: &mut T) -> Result<ResourceRecord, DecodeError> {
        let mut domain = String::new();
        buffer.read_qname(&mut domain)?;

        let type_num = buffer.read_u16()?;
        let rtype = RecordType::from_num(type_num).ok_or(DecodeError::UnrecognizedType(type_num))?;

        let class_num = buffer.read_u16()?;
        let class =
            RecordClass::from_num(class_num).ok_or(DecodeError::UnrecognizedClass(class_num))?;

        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;
        let data = buffer.read_bytes(data_len as usize)?;

        Ok(ResourceRecord {
            domain,
            rtype,
            class,
            ttl,
            data,
        })
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ({} octets)",
            self.domain,
            self.ttl,
            self.class,
            self.rtype,
            self.data.len()
        )
    }
}

fn section_count(len: usize) -> Result<u16, EncodeError> {
    u16::try_from(len).map_err(|_| EncodeError::TooManyRecords(len))
}

/// Assemble a complete message into `buffer`
///
/// The four section counts of `header` are overwritten with the lengths of
/// the sections passed in, then the header, the questions and the three record
/// sections are written in order. The first section that does not fit aborts
/// the whole message. Returns the number of octets used, which is all the
/// transport should send.
pub fn build_response<T: PacketBuffer>(
    buffer: &mut T,
    header: &mut DnsHeader,
    questions: &[DnsQuestion],
    answers: &[ResourceRecord],
    authorities: &[ResourceRecord],
    resources: &[ResourceRecord],
) -> Result<usize, EncodeError> {
    header.questions = section_count(questions.len())?;
    header.answers = section_count(answers.len())?;
    header.authoritative_entries = section_count(authorities.len())?;
    header.resource_entries = section_count(resources.len())?;

    let start_pos = buffer.pos();

    header.write(buffer)?;

    for question in questions {
        question.write(buffer)?;
    }

    for rec in answers.iter().chain(authorities).chain(resources) {
        rec.write(buffer)?;
    }

    Ok(buffer.pos() - start_pos)
}

/// Representation of a complete DNS packet
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DnsPacket {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub resources: Vec<ResourceRecord>,
}

impl DnsPacket {
    pub fn new() -> DnsPacket {
        DnsPacket::default()
    }

    /// Decode a whole message, records included
    ///
    /// The responder itself only needs the header and questions of a query;
    /// this is the general purpose counterpart of `write`.
    pub fn from_buffer<T: PacketBuffer>(buffer: &mut T) -> Result<DnsPacket, DecodeError> {
        let mut result = DnsPacket::new();
        result.header = DnsHeader::read(buffer)?;

        for _ in 0..result.header.questions {
            result.questions.push(DnsQuestion::read(buffer)?);
        }

        for _ in 0..result.header.answers {
            result.answers.push(ResourceRecord::read(buffer)?);
        }
        for _ in 0..result.header.authoritative_entries {
            result.authorities.push(ResourceRecord::read(buffer)?);
        }
        for _ in 0..result.header.resource_entries {
            result.resources.push(ResourceRecord::read(buffer)?);
        }

        Ok(result)
    }

    pub fn write<T: PacketBuffer>(&mut self, buffer: &mut T) -> Result<usize, EncodeError> {
        build_response(
            buffer,
            &mut self.header,
            &self.questions,
            &self.answers,
            &self.authorities,
            &self.resources,
        )
    }

    /// Serialize into a fresh 512 octet buffer and return exactly the used bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, EncodeError> {
        let mut buffer = BytePacketBuffer::new();
        let len = self.write(&mut buffer)?;

        Ok(buffer.buf[..len].to_vec())
    }
}
