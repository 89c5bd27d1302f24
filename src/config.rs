use std::sync::OnceLock;

use config::Config;
use serde::{Deserialize, Serialize};

use crate::error::{PgpError, Result};

const MIN_S2K_COUNT: u8 = 0x60;

/// Process-wide tuning knobs, none of them changes what ends up on the wire.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PgpConfig {
    // byte size of the copy buffer between the plaintext source and the pipeline
    pub io_buf_size: usize,

    // partial body chunks are `1 << partial_chunk_bits` bytes
    pub partial_chunk_bits: u8,

    // coded S2K iteration count (RFC 4880 §3.7.1.3), never below 0x60 (65536 octets)
    pub s2k_count: u8,

    pub armor_comment: Option<String>,
}

impl Default for PgpConfig {
    fn default() -> Self {
        Self {
            io_buf_size: 64 * 1024,
            partial_chunk_bits: 13,
            s2k_count: MIN_S2K_COUNT,
            armor_comment: None,
        }
    }
}

impl PgpConfig {
    pub fn config() -> &'static Self {
        Self::config_with_file(None)
    }

    /// The first call decides the configuration, later calls ignore `f`.
    pub fn config_with_file(f: Option<&str>) -> &'static Self {
        static CONFIG: OnceLock<PgpConfig> = OnceLock::new();

        CONFIG.get_or_init(|| {
            Self::load(f).unwrap_or_else(|e| {
                log::warn!("{e}, fall back to the default configuration");
                PgpConfig::default()
            })
        })
    }

    /// defaults, then the optional file, then `PGPFLOW__*` environment variables
    pub fn load(f: Option<&str>) -> Result<Self> {
        let default_config = Config::try_from(&PgpConfig::default()).map_err(config_err)?;

        let mut config = Config::builder().add_source(default_config);
        if let Some(f) = f {
            config = config.add_source(config::File::with_name(f).required(false));
        }
        config = config.add_source(
            config::Environment::with_prefix("PGPFLOW")
                .try_parsing(true)
                .separator("__"),
        );

        let config = config.build().map_err(config_err)?;
        let mut pgpconfig: PgpConfig = config.try_deserialize().map_err(config_err)?;
        pgpconfig.normalize();

        log::trace!("{:?}", pgpconfig);

        Ok(pgpconfig)
    }

    fn normalize(&mut self) {
        self.io_buf_size = self.io_buf_size.max(512);
        self.partial_chunk_bits = self.partial_chunk_bits.clamp(9, 30);
        self.s2k_count = self.s2k_count.max(MIN_S2K_COUNT);
    }

    pub fn io_buf(&self) -> Vec<u8> {
        vec![0u8; self.io_buf_size]
    }
}

fn config_err(e: config::ConfigError) -> PgpError {
    PgpError::Configuration(e.to_string())
}
