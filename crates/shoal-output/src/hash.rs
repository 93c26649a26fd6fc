//! FNV-1a hashing of field data and record metadata for checkpoint
//! integrity.
//!
//! Not cryptographically secure; it detects corruption and truncation,
//! not tampering.

use shoal_field::Field;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Incremental FNV-1a hasher.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Fnv1a {
    /// Fold raw bytes in.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 ^ b as u64).wrapping_mul(FNV_PRIME);
        }
    }

    /// Fold in a little-endian `u64`.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Fold in the bit pattern of an `f64`.
    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    /// Fold in a length-prefixed string, so `("ab", "c")` and
    /// `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    /// Fold in named fields in the given order.
    pub fn write_fields<'a>(&mut self, fields: impl IntoIterator<Item = (&'a str, &'a Field)>) {
        for (name, field) in fields {
            self.write(name.as_bytes());
            self.write_u64(field.data().len() as u64);
            for v in field.data() {
                self.write_f64(*v);
            }
        }
    }

    /// The hash so far.
    pub fn finish(&self) -> u64 {
        self.0
    }
}

/// Hash named fields in the given order.
///
/// Each field's name and length are folded in before its values (as
/// `f64::to_bits`), so renaming or reordering fields changes the hash.
pub fn fields_hash<'a>(fields: impl IntoIterator<Item = (&'a str, &'a Field)>) -> u64 {
    let mut hasher = Fnv1a::default();
    hasher.write_fields(fields);
    hasher.finish()
}
