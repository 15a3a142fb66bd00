//! Random number generation utilities.

use rand_core::le::read_u32_into;
pub use rand_core::{CryptoRng, RngCore};

/// A succinct trait alias for a cryptographically secure PRNG.
pub trait Crng: RngCore + CryptoRng {}
impl<R: RngCore + CryptoRng> Crng for R {}

/// A compatibility wrapper so we can use `ring`'s PRG with `rand` traits.
#[derive(Clone, Debug, Default)]
pub struct SysRng(ring::rand::SystemRandom);

impl SysRng {
    pub fn new() -> Self {
        Self(ring::rand::SystemRandom::new())
    }
}

impl CryptoRng for SysRng {}

impl RngCore for SysRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        let mut out = [0u32; 1];
        read_u32_into(&buf, &mut out);
        out[0]
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.try_fill_bytes(dest).expect("ring SystemRandom failed")
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        use ring::rand::SecureRandom;
        self.0
            .fill(dest)
            .map_err(|_| rand_core::Error::new("ring SystemRandom failed"))
    }
}

const BASE36_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draw `n` random uppercase base36 characters. Used to make payment
/// reference codes unique even when two payouts are generated within the
/// same millisecond for the same rider (see `payout::reference_code`).
pub fn random_base36(rng: &mut impl Crng, n: usize) -> String {
    (0..n)
        .map(|_| {
            let idx = (rng.next_u32() as usize) % BASE36_ALPHABET.len();
            BASE36_ALPHABET[idx] as char
        })
        .collect()
}

/// Draw `n` random bytes and hex-encode them. Used to mint opaque entity ids
/// (`UserId`, `OrderId`, ...) without taking on a UUID/ULID dependency the
/// rest of the stack doesn't otherwise need.
pub fn random_hex_id(rng: &mut impl Crng, n_bytes: usize) -> String {
    let mut buf = vec![0u8; n_bytes];
    rng.fill_bytes(&mut buf);
    hex::encode(&buf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn random_base36_is_right_length_and_alphabet() {
        let mut rng = SysRng::new();
        let s = random_base36(&mut rng, 8);
        assert_eq!(s.len(), 8);
        assert!(s.bytes().all(|b| BASE36_ALPHABET.contains(&b)));
    }

    #[test]
    fn random_hex_id_is_right_length() {
        let mut rng = SysRng::new();
        let id = random_hex_id(&mut rng, 16);
        assert_eq!(id.len(), 32);
    }
}
