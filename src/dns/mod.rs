//! DNS Protocol Implementation
//!
//! # Module Structure
//!
//! * `buffer` - Low-level packet buffer operations and the name codec
//! * `protocol` - Header, question and resource record codecs
//! * `rdata` - Record value builders
//! * `authority` - The record table and query resolution
//! * `server` - Request pipeline and UDP server
//! * `context` - Shared server state
//! * `config` - Configuration file loading

/// Authoritative zone and record lookup
pub mod authority;

/// Low-level buffer operations for DNS packet handling
pub mod buffer;

pub mod config;

/// Server state shared between threads
pub mod context;

pub mod errors;

/// DNS protocol definitions and packet handling
pub mod protocol;

pub mod query_type;

pub mod rdata;

pub mod result_code;

/// UDP server implementation
pub mod server;
