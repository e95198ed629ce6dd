//! Server configuration and the record table loader
//!
//! Configuration is a TOML file with a `[server]` section and a list of
//! `[[records]]`. Record values are given in their usual text form and turned
//! into wire bytes here, once, at startup:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:53"
//! zone = "kausm.in"
//! threads = 4
//!
//! [[records]]
//! name = "test.kausm.in"
//! type = "A"
//! ttl = 600
//! value = "134.209.148.50"
//!
//! [[records]]
//! name = "kausm.in"
//! type = "SOA"
//! value = "kausm.in kaustubh.kausm.in 1 600 600 600 600"
//! ```
//!
//! Any record may use `data_hex` instead of `value` to give the raw value.

use std::fmt;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde_derive::Deserialize;

use crate::dns::errors::EncodeError;
use crate::dns::protocol::ResourceRecord;
use crate::dns::query_type::{RecordClass, RecordType};
use crate::dns::rdata::{self, SoaData};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:53";
pub const DEFAULT_ZONE: &str = "kausm.in";
pub const DEFAULT_THREADS: usize = 4;
pub const DEFAULT_TTL: u32 = 3600;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Syntax(toml::de::Error),
    InvalidListen(String),
    InvalidThreads(usize),
    InvalidRecord { name: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Syntax(e) => write!(f, "Invalid configuration: {}", e),
            ConfigError::InvalidListen(addr) => write!(f, "Invalid listen address: {}", addr),
            ConfigError::InvalidThreads(n) => {
                write!(f, "Invalid thread count {}: at least one worker is needed", n)
            }
            ConfigError::InvalidRecord { name, message } => {
                write!(f, "Invalid record {}: {}", name, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Syntax(err)
    }
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ServerSection {
    listen: String,
    zone: String,
    threads: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            listen: DEFAULT_LISTEN.to_string(),
            zone: DEFAULT_ZONE.to_string(),
            threads: DEFAULT_THREADS,
        }
    }
}

/// One `[[records]]` entry as written in the file
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub data_hex: Option<String>,
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    records: Option<Vec<RecordEntry>>,
}

/// Everything the server needs at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub zone: String,
    pub threads: usize,
    pub records: Vec<ResourceRecord>,
}

impl Default for ServerConfig {
    /// The built-in zone, used when no configuration file is given
    fn default() -> Self {
        ServerConfig {
            listen: SocketAddr::from(([0, 0, 0, 0], 53)),
            zone: DEFAULT_ZONE.to_string(),
            threads: DEFAULT_THREADS,
            records: default_records(),
        }
    }
}

/// SOA for the apex and a single host address
pub fn default_records() -> Vec<ResourceRecord> {
    let soa = SoaData {
        m_name: "kausm.in".to_string(),
        r_name: "kaustubh.kausm.in".to_string(),
        serial: 1,
        refresh: 600,
        retry: 600,
        expire: 600,
        minimum: 600,
    };

    let mut records = vec![ResourceRecord::a(
        "test.kausm.in".to_string(),
        Ipv4Addr::new(134, 209, 148, 50),
        600,
    )];

    match ResourceRecord::soa("kausm.in".to_string(), &soa, 600) {
        Ok(rec) => records.push(rec),
        Err(e) => log::error!("Failed to build default SOA record: {}", e),
    }

    records
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<ServerConfig> {
        let content = fs::read_to_string(path)?;
        let config = ServerConfig::from_toml_str(&content)?;

        log::info!(
            "Loaded {} records for zone {} from {}",
            config.records.len(),
            config.zone,
            path.display()
        );

        Ok(config)
    }

    /// Without a `records` list the built-in records are used; an explicit
    /// empty list gives an empty table.
    pub fn from_toml_str(content: &str) -> Result<ServerConfig> {
        let file: ConfigFile = toml::from_str(content)?;

        let listen = parse_listen(&file.server.listen)?;
        let threads = check_threads(file.server.threads)?;

        let records = match file.records {
            Some(entries) => entries
                .iter()
                .map(RecordEntry::to_record)
                .collect::<Result<Vec<_>>>()?,
            None => default_records(),
        };

        Ok(ServerConfig {
            listen,
            zone: file.server.zone,
            threads,
            records,
        })
    }
}

pub fn parse_listen(addr: &str) -> Result<SocketAddr> {
    addr.parse::<SocketAddr>()
        .map_err(|_| ConfigError::InvalidListen(addr.to_string()))
}

pub fn check_threads(threads: usize) -> Result<usize> {
    if threads == 0 {
        return Err(ConfigError::InvalidThreads(threads));
    }
    Ok(threads)
}

impl RecordEntry {
    pub fn to_record(&self) -> Result<ResourceRecord> {
        let invalid = |message: String| ConfigError::InvalidRecord {
            name: self.name.clone(),
            message,
        };

        let rtype = self.rtype.parse::<RecordType>().map_err(invalid)?;
        let class = match self.class {
            Some(ref class) => class.parse::<RecordClass>().map_err(invalid)?,
            None => RecordClass::In,
        };

        let data = match (&self.value, &self.data_hex) {
            (_, Some(hex_data)) => hex::decode(hex_data.trim())
                .map_err(|e| invalid(format!("bad data_hex: {}", e)))?,
            (Some(value), None) => parse_value(rtype, value).map_err(invalid)?,
            (None, None) => return Err(invalid("either value or data_hex is required".into())),
        };

        // must be encodable on the wire
        rdata::encode_name(&self.name).map_err(|e| invalid(encode_err(e)))?;
        if data.len() > usize::from(u16::MAX) {
            return Err(invalid(encode_err(EncodeError::ValueTooLong(data.len()))));
        }

        Ok(ResourceRecord {
            domain: self.name.clone(),
            rtype,
            class,
            ttl: self.ttl,
            data,
        })
    }
}

fn encode_err(e: EncodeError) -> String {
    e.to_string()
}

fn fields<'a>(
    rtype: RecordType,
    value: &'a str,
    count: usize,
) -> std::result::Result<Vec<&'a str>, String> {
    let parts = value.split_whitespace().collect::<Vec<_>>();
    if parts.len() != count {
        return Err(format!(
            "{} value needs {} fields, got {}",
            rtype,
            count,
            parts.len()
        ));
    }
    Ok(parts)
}

fn parse_u32(field: &str) -> std::result::Result<u32, String> {
    field
        .parse::<u32>()
        .map_err(|_| format!("invalid number: {}", field))
}

/// Turn the text form of a value into wire bytes
pub fn parse_value(rtype: RecordType, value: &str) -> std::result::Result<Vec<u8>, String> {
    match rtype {
        RecordType::A => {
            let addr = value
                .trim()
                .parse::<Ipv4Addr>()
                .map_err(|_| format!("invalid IPv4 address: {}", value))?;
            Ok(addr.octets().to_vec())
        }
        RecordType::Ns | RecordType::Md | RecordType::Mf | RecordType::Cname | RecordType::Ptr => {
            rdata::encode_name(value.trim()).map_err(encode_err)
        }
        RecordType::Soa => {
            let parts = fields(rtype, value, 7)?;
            rdata::encode_soa(
                parts[0],
                parts[1],
                parse_u32(parts[2])?,
                parse_u32(parts[3])?,
                parse_u32(parts[4])?,
                parse_u32(parts[5])?,
                parse_u32(parts[6])?,
            )
            .map_err(encode_err)
        }
        RecordType::Mx => {
            let parts = fields(rtype, value, 2)?;
            let preference = parts[0]
                .parse::<u16>()
                .map_err(|_| format!("invalid preference: {}", parts[0]))?;
            rdata::encode_mx(preference, parts[1]).map_err(encode_err)
        }
        RecordType::Txt => Ok(rdata::encode_txt(value)),
        RecordType::Hinfo => {
            let parts = fields(rtype, value, 2)?;
            rdata::encode_character_strings(&parts).map_err(encode_err)
        }
        RecordType::Minfo => {
            let parts = fields(rtype, value, 2)?;
            rdata::encode_minfo(parts[0], parts[1]).map_err(encode_err)
        }
        RecordType::Wks | RecordType::All => Err(format!(
            "{} has no text form here, use data_hex",
            rtype
        )),
    }
}
