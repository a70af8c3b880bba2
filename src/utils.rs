//! Hashing helpers for the unique and computed tables.

/// [Szudzik pairing function][szudzik-pairing] with wrapping arithmetic.
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// It is a perfect pairing for arguments below 2^32. Nested pairings
/// overflow, so the result wraps and only serves as a hash.
///
/// [szudzik-pairing]: https://en.wikipedia.org/wiki/Pairing_function#Other_pairing_functions
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for two `u64` values.
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Spreads the bits of a pairing result so that the low bits, which are
/// used for bucket selection, depend on all input bits.
#[inline]
pub fn mix(h: u64) -> u64 {
    // splitmix64 finalizer
    let mut z = h;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub trait MyHash {
    fn hash(&self) -> u64;
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        mix(pairing2(self.0, self.1))
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        mix(pairing3(self.0, self.1, self.2))
    }
}
