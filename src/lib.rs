//! ApexDNS
//!
//! A minimal authoritative DNS responder for a single zone.
//!
//! # Features
//!
//! * RFC 1035 message codec (header, question, resource record)
//! * Exact-match answers from a static record table
//! * Multi-threaded UDP transport with 512 octet datagrams
//! * TOML configuration of the zone and its records
//!
//! Everything lives in the `dns` module; the `apexdns` binary wires it to the
//! command line.

/// DNS server implementation and protocol handling
pub mod dns;
