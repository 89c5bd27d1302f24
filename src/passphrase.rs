use std::fmt::{Debug, Formatter};
#[cfg(feature = "sec-zeroize")]
use zeroize::Zeroize;

/// Secret protecting the private key material, wiped when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Debug for Passphrase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

impl Drop for Passphrase {
    fn drop(&mut self) {
        #[cfg(feature = "sec-zeroize")]
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::Passphrase;

    #[test]
    fn debug_hides_the_secret() {
        let p = Passphrase::from("correct-horse");
        assert_eq!(format!("{p:?}"), "Passphrase(***)");
        assert_eq!(p.as_bytes(), b"correct-horse");
        assert!(Passphrase::new(String::new()).is_empty());
    }
}
