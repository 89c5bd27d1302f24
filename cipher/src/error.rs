use std::{error::Error, fmt::Display};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CipherError {
    /// message does not fit into the modulus after padding
    MessageTooLong { max: usize, real: usize },

    InvalidPublicKey(String),

    InvalidPrivateKey(String),

    /// padding or checksum mismatch after the private key operation
    Decryption(String),

    /// the algorithm cannot perform the requested operation
    NotSupport(String),

    Other(String),
}

impl Display for CipherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MessageTooLong { max, real } => f.write_fmt(format_args!(
                "message too long: `{real}` bytes, at most `{max}` bytes"
            )),
            Self::InvalidPublicKey(s) => f.write_fmt(format_args!("invalid public key: {s}")),
            Self::InvalidPrivateKey(s) => f.write_fmt(format_args!("invalid private key: {s}")),
            Self::Decryption(s) => f.write_fmt(format_args!("decryption error: {s}")),
            Self::NotSupport(s) => f.write_fmt(format_args!("not support: {s}")),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl Error for CipherError {}

impl From<String> for CipherError {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}
