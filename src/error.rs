use cipher::CipherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgpError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("encryption failed: {0}")]
    Encryption(#[source] CipherError),

    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] CipherError),

    /// the secret key checksum did not match after decrypting with the given passphrase
    #[error("bad passphrase for key {0:016X}")]
    BadPassphrase(u64),

    #[error(transparent)]
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, PgpError>;

impl PgpError {
    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn argument<S: Into<String>>(msg: S) -> Self {
        Self::Argument(msg.into())
    }
}

// stage writers report through `std::io::Write`, unwrap our own errors on the way back out
impl From<std::io::Error> for PgpError {
    fn from(value: std::io::Error) -> Self {
        if !value.get_ref().map_or(false, |e| e.is::<PgpError>()) {
            return Self::Io(value);
        }

        let kind = value.kind();
        match value.into_inner().map(|e| e.downcast::<PgpError>()) {
            Some(Ok(e)) => *e,
            Some(Err(e)) => Self::Io(std::io::Error::new(kind, e)),
            None => Self::Io(kind.into()),
        }
    }
}

impl From<PgpError> for std::io::Error {
    fn from(value: PgpError) -> Self {
        match value {
            PgpError::Io(e) => e,
            e => std::io::Error::new(std::io::ErrorKind::Other, e),
        }
    }
}
