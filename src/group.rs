//! Precomputed discrete-log groups for ElGamal subkeys.
//!
//! Every modulus is a safe prime $p = 2q + 1$ with generator 2, taken from the IKE MODP groups.
//! The table is parsed once on first use and never changes afterwards.

use cipher::Rand;
use num_bigint::BigUint;
use std::sync::OnceLock;
use utils::BigUintExt;

// RFC 2409 §6.2, second Oakley group
const OAKLEY_GROUP_2: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74",
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437",
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381FFFFFFFFFFFFFFFF",
);

// RFC 3526 §3, group 14
const MODP_GROUP_14: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74",
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437",
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05",
    "98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB",
    "9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

// RFC 3526 §4, group 15
const MODP_GROUP_15: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74",
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437",
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05",
    "98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB",
    "9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33",
    "A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7",
    "ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864",
    "D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2",
    "08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF",
);

// RFC 3526 §5, group 16
const MODP_GROUP_16: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74",
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437",
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05",
    "98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB",
    "9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33",
    "A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7",
    "ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864",
    "D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2",
    "08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A92108011A723C12A787E6D7",
    "88719A10BDBA5B2699C327186AF4E23C1A946834B6150BDA2583E9CA2AD44CE8",
    "DBBBC2DB04DE8EF92E8EFC141FBECAA6287C59474E6BC05D99B2964FA090C3A2",
    "233BA186515BE7ED1F612970CEE2D7AFB81BDD762170481CD0069127D5B05AA9",
    "93B4EA988D8FDDC186FFB7DC90A6C08F4DF435C934063199FFFFFFFFFFFFFFFF",
);

const GENERATOR: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupParameters {
    bits: usize,
    p: BigUint,
    g: BigUint,
}

impl GroupParameters {
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// modulus
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// generator
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// both $p$ and $(p-1)/2$ pass `rounds` Miller-Rabin rounds
    pub fn is_safe_prime<R: Rand>(&self, rounds: usize, rng: &mut R) -> bool {
        let q: BigUint = (&self.p - 1u32) >> 1;
        BigUintExt(&self.p).probably_prime_test(rounds, rng)
            && BigUintExt(&q).probably_prime_test(rounds, rng)
    }
}

/// Read-only table of [`GroupParameters`] keyed by modulus size.
pub struct GroupParameterStore {
    groups: Vec<GroupParameters>,
}

impl GroupParameterStore {
    fn global() -> &'static Self {
        static STORE: OnceLock<GroupParameterStore> = OnceLock::new();
        STORE.get_or_init(|| {
            let groups = [
                (1024, OAKLEY_GROUP_2),
                (2048, MODP_GROUP_14),
                (3072, MODP_GROUP_15),
                (4096, MODP_GROUP_16),
            ]
            .into_iter()
            .filter_map(|(bits, hex)| {
                let p = BigUint::parse_bytes(hex.as_bytes(), 16)?;
                (p.bits() as usize == bits).then(|| GroupParameters {
                    bits,
                    p,
                    g: BigUint::from(GENERATOR),
                })
            })
            .collect::<Vec<_>>();

            log::debug!(
                "group table ready: {:?}",
                groups.iter().map(|x| x.bits).collect::<Vec<_>>()
            );
            GroupParameterStore { groups }
        })
    }

    /// the group whose modulus has exactly `bits` bits
    pub fn lookup(bits: usize) -> Option<&'static GroupParameters> {
        Self::global().groups.iter().find(|x| x.bits == bits)
    }

    pub fn supported_tiers() -> Vec<usize> {
        Self::global().groups.iter().map(|x| x.bits).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::GroupParameterStore;
    use cipher::DefaultRand;
    use num_bigint::BigUint;

    #[test]
    fn tiers() {
        assert_eq!(
            GroupParameterStore::supported_tiers(),
            vec![1024, 2048, 3072, 4096]
        );
        assert!(GroupParameterStore::lookup(1536).is_none());
        assert!(GroupParameterStore::lookup(0).is_none());

        let g = GroupParameterStore::lookup(2048).unwrap();
        assert_eq!(g.p().bits(), 2048);
        assert_eq!(g.g(), &BigUint::from(2u8));
        // same instance on every lookup
        assert!(std::ptr::eq(g, GroupParameterStore::lookup(2048).unwrap()));
    }

    #[test]
    fn safe_primes() {
        let mut rng = DefaultRand::default();
        for bits in GroupParameterStore::supported_tiers() {
            let g = GroupParameterStore::lookup(bits).unwrap();
            let rounds = if bits <= 1024 { 8 } else { 2 };
            assert!(g.is_safe_prime(rounds, &mut rng), "{bits} bits group");
        }
    }
}
