//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default listen address, `127.0.0.1:3000`.
pub const DEFAULT_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);

/// Origin allowed by CORS when none is configured (the Vite dev server).
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Which storage backend the server opens.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Backend {
    /// JSON files in `data_dir`.
    #[cfg(feature = "storage-file")]
    File {
        /// Directory holding the live collection files.
        data_dir: PathBuf,
        /// Directory holding seed files; the data directory if `None`.
        seed_dir: Option<PathBuf>,
    },
    /// A SQLite database.
    #[cfg(feature = "storage-sqlx")]
    Sqlite {
        /// Database URL, e.g. `sqlite:splitbook.db`.
        url: String,
        /// Directory holding seed files.
        seed_dir: PathBuf,
    },
}

/// Everything [`super::serve`] needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Storage backend.
    pub backend: Backend,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Creates a configuration with the default address and CORS origin.
    #[inline]
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            addr: DEFAULT_ADDR,
            backend,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_owned()],
        }
    }

    /// Sets the listen address.
    #[inline]
    #[must_use]
    pub const fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Replaces the allowed CORS origins.
    #[inline]
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "storage-file")]
    #[test]
    fn defaults() {
        let config = ServerConfig::new(Backend::File {
            data_dir: PathBuf::from("/tmp/splitbook"),
            seed_dir: None,
        });
        assert_eq!(config.addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.allowed_origins, vec![DEFAULT_ALLOWED_ORIGIN.to_owned()]);
    }

    #[cfg(feature = "storage-sqlx")]
    #[test]
    fn overrides() {
        let config = ServerConfig::new(Backend::Sqlite {
            url: "sqlite:test.db".to_owned(),
            seed_dir: PathBuf::from("seed"),
        })
        .with_addr("0.0.0.0:8080".parse().unwrap())
        .with_allowed_origins(vec!["https://example.com".to_owned()]);
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.allowed_origins.len(), 1);
    }
}
