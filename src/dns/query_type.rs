//! Record type and record class identifiers
//!
//! Both are plain `Copy` enumerations keyed by their 2-octet wire code. The
//! code to identifier mapping is a static table; anything outside it is
//! rejected rather than carried along as an unknown value.

use std::fmt;
use std::str::FromStr;

/// `RecordType` is the type of a resource record, or the type asked for in a
/// question.
///
/// A code can be converted to a `RecordType` using the `from_num` function, and
/// back to a code using the `to_num` method.
#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy, PartialOrd, Ord)]
pub enum RecordType {
    A,     // 1
    Ns,    // 2
    Md,    // 3
    Mf,    // 4
    Cname, // 5
    Soa,   // 6
    Wks,   // 11
    Ptr,   // 12
    Hinfo, // 13
    Minfo, // 14
    Mx,    // 15
    Txt,   // 16
    All,   // 255
}

impl RecordType {
    /// Every recognized type, in code order
    pub const KNOWN: [RecordType; 13] = [
        RecordType::A,
        RecordType::Ns,
        RecordType::Md,
        RecordType::Mf,
        RecordType::Cname,
        RecordType::Soa,
        RecordType::Wks,
        RecordType::Ptr,
        RecordType::Hinfo,
        RecordType::Minfo,
        RecordType::Mx,
        RecordType::Txt,
        RecordType::All,
    ];

    pub fn to_num(&self) -> u16 {
        match *self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Md => 3,
            RecordType::Mf => 4,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Wks => 11,
            RecordType::Ptr => 12,
            RecordType::Hinfo => 13,
            RecordType::Minfo => 14,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::All => 255,
        }
    }

    pub fn from_num(num: u16) -> Option<RecordType> {
        match num {
            1 => Some(RecordType::A),
            2 => Some(RecordType::Ns),
            3 => Some(RecordType::Md),
            4 => Some(RecordType::Mf),
            5 => Some(RecordType::Cname),
            6 => Some(RecordType::Soa),
            11 => Some(RecordType::Wks),
            12 => Some(RecordType::Ptr),
            13 => Some(RecordType::Hinfo),
            14 => Some(RecordType::Minfo),
            15 => Some(RecordType::Mx),
            16 => Some(RecordType::Txt),
            255 => Some(RecordType::All),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match *self {
            RecordType::A => "A",
            RecordType::Ns => "NS",
            RecordType::Md => "MD",
            RecordType::Mf => "MF",
            RecordType::Cname => "CNAME",
            RecordType::Soa => "SOA",
            RecordType::Wks => "WKS",
            RecordType::Ptr => "PTR",
            RecordType::Hinfo => "HINFO",
            RecordType::Minfo => "MINFO",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::All => "*",
        }
    }

    pub fn meaning(&self) -> &'static str {
        match *self {
            RecordType::A => "a host address",
            RecordType::Ns => "an authoritative name server",
            RecordType::Md => "a mail destination (Obsolete - use MX)",
            RecordType::Mf => "a mail forwarder (Obsolete - use MX)",
            RecordType::Cname => "the canonical name for an alias",
            RecordType::Soa => "marks the start of a zone of authority",
            RecordType::Wks => "a well known service description",
            RecordType::Ptr => "a domain name pointer",
            RecordType::Hinfo => "host information",
            RecordType::Minfo => "mailbox or mail list information",
            RecordType::Mx => "mail exchange",
            RecordType::Txt => "text strings",
            RecordType::All => "a request for all records",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for RecordType {
    type Err = String;

    /// Case-insensitive mnemonic lookup; `ALL` is accepted as well as `*`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ALL") {
            return Ok(RecordType::All);
        }

        RecordType::KNOWN
            .iter()
            .find(|t| t.mnemonic().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown record type: {}", s))
    }
}

/// `RecordClass` is the class of a record or question. Only the Internet
/// class is supported.
#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy, PartialOrd, Ord, Default)]
pub enum RecordClass {
    #[default]
    In, // 1
}

impl RecordClass {
    pub fn to_num(&self) -> u16 {
        match *self {
            RecordClass::In => 1,
        }
    }

    pub fn from_num(num: u16) -> Option<RecordClass> {
        match num {
            1 => Some(RecordClass::In),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match *self {
            RecordClass::In => "IN",
        }
    }

    pub fn meaning(&self) -> &'static str {
        match *self {
            RecordClass::In => "the Internet",
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for RecordClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("IN") {
            Ok(RecordClass::In)
        } else {
            Err(format!("unsupported record class: {}", s))
        }
    }
}
