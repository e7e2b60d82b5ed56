//! Path hashing used to address assets
//!
//! Every asset and every cross-asset reference is keyed by a 64-bit GUID
//! derived from the asset's logical path. The function below reproduces the
//! runtime loader's hash bit for bit: the path is consumed in little-endian
//! 32-bit words, `\` folds to `/` and ASCII letters fold to upper case, so
//! `Material\Foo` and `material/foo` address the same asset.
//!
//! Collisions are not detected here; the asset directory rejects duplicate
//! GUIDs when entries are appended.

use std::fmt;

const WORD_MUL: u64 = 0x0000_0FB8_C4D9_6501;
const ACC_MUL: u64 = 0x0633_D5F1;
const LEN_MUL: u64 = 0x00AE_5028_12AA_7333;

/// 64-bit asset identifier derived from a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(pub u64);

impl Guid {
    /// GUID of a logical asset path
    pub fn from_path(path: &str) -> Self {
        Self(hash_path(path))
    }

    /// Raw 64-bit value
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Whether this is the null GUID used for empty reference slots
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Guid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

/// Hash a logical asset path to its GUID value
///
/// Hashing stops at the first NUL byte, like the loader's C string walk.
pub fn hash_path(path: &str) -> u64 {
    let bytes = path.as_bytes();
    let mut words = bytes.chunks(4).map(|chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        u32::from_le_bytes(word)
    });
    // A path whose length is a multiple of four ends on an all-zero word.
    let mut next_word = move || words.next().unwrap_or(0);

    let mut acc = 0u64;
    let mut consumed = 0u32;

    let mut word = next_word();
    let mut folded = fold_word(word);
    let mut zeros = zero_bytes(word);

    while zeros == 0 {
        let mixed = (WORD_MUL.wrapping_mul(u64::from(folded)) >> 24)
            .wrapping_add(ACC_MUL.wrapping_mul(acc));
        acc = (mixed >> 61) ^ mixed;
        consumed += 4;

        word = next_word();
        zeros = zero_bytes(word);
        folded = fold_word(word);
    }

    let tail_mask = (zeros & zeros.wrapping_neg()).wrapping_sub(1);
    let tail_len = (31 - tail_mask.leading_zeros()) / 8;

    ACC_MUL
        .wrapping_mul(acc)
        .wrapping_add(WORD_MUL.wrapping_mul(u64::from(folded & tail_mask)) >> 24)
        .wrapping_sub(LEN_MUL.wrapping_mul(u64::from(consumed + tail_len)))
}

/// Marks the high bit of every zero byte (plus borrow artefacts above the first)
const fn zero_bytes(word: u32) -> u32 {
    !word & word.wrapping_sub(0x0101_0101) & 0x8080_8080
}

/// Turns `\` into `/` and clears bit 5 of every byte
const fn fold_word(word: u32) -> u32 {
    let x = word ^ 0x5C5C_5C5C;
    let backslashes = (!x >> 7) & (x.wrapping_sub(0x0101_0101) >> 7) & 0x0101_0101;
    word.wrapping_sub(backslashes.wrapping_mul(45)) & 0xDFDF_DFDF
}
