//! ## The Cipher Feedback Mode(CFB), OpenPGP variant
//!
//! Full-block feedback ($s = b$): $O_j = Encrypt(C_{j-1})$, $C_j = P_j \oplus O_j$, $C_0 = IV$.
//! Data may arrive in arbitrary pieces, the keystream position is carried between calls.
//!
//! OpenPGP's Symmetrically Encrypted Data packet additionally resynchronises the feedback register
//! after the `BS+2` prefix octets (RFC 4880 §13.9), see [`Cfb::resync`].

use crate::block_cipher::AES128;
use crate::{BlockEncrypt, CipherError};
#[cfg(feature = "sec-zeroize")]
use zeroize::Zeroize;

pub struct Cfb<E, const N: usize> {
    cipher: E,
    // feedback register, holds the last ciphertext block while it is being built
    fr: [u8; N],
    keystream: [u8; N],
    pos: usize,
}

pub type Aes128Cfb = Cfb<AES128, 16>;

impl<E: BlockEncrypt<N>, const N: usize> Cfb<E, N> {
    pub fn new(cipher: E, iv: [u8; N]) -> Self {
        Self {
            cipher,
            fr: iv,
            keystream: [0u8; N],
            pos: N,
        }
    }

    /// OpenPGP starts every data packet from an all-zero IV
    pub fn with_zero_iv(cipher: E) -> Self {
        Self::new(cipher, [0u8; N])
    }

    #[inline]
    fn next_keystream(&mut self) -> u8 {
        if self.pos == N {
            self.keystream = self.cipher.encrypt_block(&self.fr);
            self.pos = 0;
        }
        self.keystream[self.pos]
    }

    /// encrypt `data` in place
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for x in data.iter_mut() {
            *x ^= self.next_keystream();
            self.fr[self.pos] = *x;
            self.pos += 1;
        }
    }

    /// decrypt `data` in place
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for x in data.iter_mut() {
            let c = *x;
            *x ^= self.next_keystream();
            self.fr[self.pos] = c;
            self.pos += 1;
        }
    }

    /// Reset the feedback register to the last `N` ciphertext octets.
    /// Only valid right after the `N+2` prefix octets went through the cipher.
    pub fn resync(&mut self) -> Result<(), CipherError> {
        if self.pos != 2 {
            return Err(CipherError::Other(format!(
                "cfb: resync expects the position right after the {}+2 prefix, current offset is `{}`",
                N, self.pos
            )));
        }

        self.fr.rotate_left(2);
        self.pos = N;
        Ok(())
    }
}

impl<E, const N: usize> Drop for Cfb<E, N> {
    fn drop(&mut self) {
        #[cfg(feature = "sec-zeroize")]
        {
            self.keystream.zeroize();
            self.fr.zeroize();
        }
    }
}
