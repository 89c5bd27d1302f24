//! Secure random source shared by key generation and the encryption pipeline.

pub trait Rand: Default {
    fn rand(&mut self, random: &mut [u8]);

    /// Fill `random` with bytes that are never zero, as PKCS#1 v1.5 padding strings need.
    fn rand_nonzero(&mut self, random: &mut [u8]) {
        self.rand(random);
        let mut b = [0u8; 1];
        for x in random.iter_mut() {
            while *x == 0 {
                self.rand(&mut b);
                *x = b[0];
            }
        }
    }
}

mod default_rand;
pub use default_rand::DefaultRand;

impl<T: xrand::RngCore + Default> Rand for T {
    fn rand(&mut self, random: &mut [u8]) {
        self.fill_bytes(random);
    }
}

#[cfg(test)]
mod tests {
    use crate::{DefaultRand, Rand};

    #[test]
    fn nonzero_fill() {
        let mut rng = DefaultRand::default();
        let mut buf = vec![0u8; 4096];
        rng.rand_nonzero(&mut buf);
        assert!(buf.iter().all(|&x| x != 0));
    }

    #[test]
    fn fills_differ() {
        let (mut rng, mut a, mut b) = (DefaultRand::default(), [0u8; 32], [0u8; 32]);
        rng.rand(&mut a);
        rng.rand(&mut b);
        assert_ne!(a, b);
    }
}
