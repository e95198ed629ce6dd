//! The `ServerContext` holds the common state shared by all server threads

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use derive_more::{Display, Error, From};

use crate::dns::authority::Authority;
use crate::dns::config::{ConfigError, ServerConfig};

#[derive(Debug, Display, From, Error)]
pub enum ContextError {
    Config(ConfigError),
    Io(std::io::Error),
}

type Result<T> = std::result::Result<T, ContextError>;

#[derive(Debug, Default)]
pub struct ServerStatistics {
    pub udp_query_count: AtomicUsize,
    pub response_count: AtomicUsize,
    pub dropped_count: AtomicUsize,
}

impl ServerStatistics {
    pub fn get_udp_query_count(&self) -> usize {
        self.udp_query_count.load(Ordering::Acquire)
    }

    pub fn get_response_count(&self) -> usize {
        self.response_count.load(Ordering::Acquire)
    }

    pub fn get_dropped_count(&self) -> usize {
        self.dropped_count.load(Ordering::Acquire)
    }
}

/// Read-only after startup; shared between threads through an `Arc`.
#[derive(Debug)]
pub struct ServerContext {
    pub authority: Authority,
    pub listen: SocketAddr,
    pub thread_count: usize,
    pub statistics: ServerStatistics,
}

impl Default for ServerContext {
    fn default() -> Self {
        ServerContext::from_config(ServerConfig::default())
    }
}

impl ServerContext {
    pub fn new(authority: Authority, listen: SocketAddr, thread_count: usize) -> ServerContext {
        ServerContext {
            authority,
            listen,
            thread_count,
            statistics: ServerStatistics::default(),
        }
    }

    pub fn from_config(config: ServerConfig) -> ServerContext {
        let authority = Authority::new(&config.zone, config.records);
        ServerContext::new(authority, config.listen, config.threads)
    }

    pub fn load(path: &Path) -> Result<ServerContext> {
        let config = ServerConfig::load(path)?;
        Ok(ServerContext::from_config(config))
    }
}
