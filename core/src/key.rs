//! The secret bit vector and its derivation into encoder weights.
//!
//! A [`KeyVector`] is the secret: an ordered sequence of booleans that is
//! delivered to the runtime through named shader parameters and never stored
//! in the protected asset. A [`KeySchedule`] holds two random constants per
//! bit; the weight the encoder uses for bit `i` is `on[i]` when the bit is set
//! and `off[i]` otherwise. The constants are embedded in the generated decode
//! fragment, which evaluates `lerp(off, on, bit)` on the GPU.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of bits in a key.
pub const DEFAULT_KEY_LENGTH: usize = 32;

/// Prefix of the default per-bit parameter names (`BitKey0`, `BitKey1`, ...).
pub const BIT_NAME_PREFIX: &str = "BitKey";

/// Smallest magnitude of a schedule constant. Keeps every bit's on/off
/// weights well apart.
const MIN_SCHEDULE_MAGNITUDE: f32 = 0.25;

/// Errors from combining keys with schedules.
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("key has {key} bits but the schedule covers {schedule}")]
    LengthMismatch { key: usize, schedule: usize },
    #[error("schedule constants for bit {0} are equal")]
    DegenerateBit(usize),
}

/// Default parameter name of bit `index`, or its configured alias.
pub fn bit_name(index: usize, renames: &BTreeMap<String, String>) -> String {
    let name = format!("{BIT_NAME_PREFIX}{index}");
    match renames.get(&name) {
        Some(alias) => alias.clone(),
        None => name,
    }
}

/// A fixed-length ordered sequence of secret bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyVector {
    bits: Vec<bool>,
}

impl KeyVector {
    /// Draw a fresh key of `len` bits.
    ///
    /// Each bit is set when a uniform sample from `[-1, 1)` is positive.
    pub fn generate<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let bits = (0..len).map(|_| rng.gen_range(-1.0f32..1.0) > 0.0).collect();
        Self { bits }
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// A copy of this key with bit `index` inverted.
    pub fn flipped(&self, index: usize) -> Self {
        let mut bits = self.bits.clone();
        if let Some(bit) = bits.get_mut(index) {
            *bit = !*bit;
        }
        Self { bits }
    }

    /// Parameter names for every bit, in order.
    pub fn bit_names(&self, renames: &BTreeMap<String, String>) -> Vec<String> {
        (0..self.len()).map(|i| bit_name(i, renames)).collect()
    }
}

/// Turns a key into the float weights the encoder consumes.
///
/// Implementations must be order-preserving and produce exactly one weight
/// per bit.
pub trait KeyDerivation {
    fn derive(&self, key: &KeyVector) -> Result<Vec<f32>, KeyError>;
}

/// Per-bit on/off constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySchedule {
    on: Vec<f32>,
    off: Vec<f32>,
}

impl KeySchedule {
    /// Draw a schedule for `len` bits.
    ///
    /// Each bit gets one constant in `[0.25, 1)` and one in `(-1, -0.25]`,
    /// with a coin flip deciding which of the two is the `on` value.
    pub fn generate<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut on = Vec::with_capacity(len);
        let mut off = Vec::with_capacity(len);
        for _ in 0..len {
            let positive = rng.gen_range(MIN_SCHEDULE_MAGNITUDE..1.0f32);
            let negative = -rng.gen_range(MIN_SCHEDULE_MAGNITUDE..1.0f32);
            if rng.gen::<bool>() {
                on.push(positive);
                off.push(negative);
            } else {
                on.push(negative);
                off.push(positive);
            }
        }
        Self { on, off }
    }

    /// Build a schedule from explicit `(on, off)` pairs.
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Result<Self, KeyError> {
        if let Some(index) = pairs.iter().position(|(on, off)| on == off) {
            return Err(KeyError::DegenerateBit(index));
        }
        Ok(Self {
            on: pairs.iter().map(|(on, _)| *on).collect(),
            off: pairs.iter().map(|(_, off)| *off).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.on.is_empty()
    }

    /// `(on, off)` constants of bit `index`.
    pub fn pair(&self, index: usize) -> Option<(f32, f32)> {
        Some((*self.on.get(index)?, *self.off.get(index)?))
    }

    /// Iterate `(on, off)` constants in bit order.
    pub fn pairs(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.on.iter().copied().zip(self.off.iter().copied())
    }
}

impl KeyDerivation for KeySchedule {
    fn derive(&self, key: &KeyVector) -> Result<Vec<f32>, KeyError> {
        if key.len() != self.len() {
            return Err(KeyError::LengthMismatch {
                key: key.len(),
                schedule: self.len(),
            });
        }
        Ok(key
            .bits()
            .iter()
            .zip(self.pairs())
            .map(|(&bit, (on, off))| if bit { on } else { off })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generate_has_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let key = KeyVector::generate(DEFAULT_KEY_LENGTH, &mut rng);
        assert_eq!(key.len(), DEFAULT_KEY_LENGTH);
    }

    #[test]
    fn generate_is_not_constant() {
        let mut rng = StdRng::seed_from_u64(11);
        let key = KeyVector::generate(256, &mut rng);
        assert!(key.bits().iter().any(|&b| b));
        assert!(key.bits().iter().any(|&b| !b));
    }

    #[test]
    fn bit_names_default_and_renamed() {
        let key = KeyVector::from_bits(vec![true, false, true]);
        let mut renames = BTreeMap::new();
        renames.insert("BitKey1".to_owned(), "Blink".to_owned());

        assert_eq!(key.bit_names(&renames), vec!["BitKey0", "Blink", "BitKey2"]);
    }

    #[test]
    fn flipped_inverts_one_bit() {
        let key = KeyVector::from_bits(vec![true, false]);
        assert_eq!(key.flipped(1).bits(), &[true, true]);
        assert_eq!(key.flipped(9), key);
    }

    #[test]
    fn schedule_constants_differ_per_bit() {
        let mut rng = StdRng::seed_from_u64(3);
        let schedule = KeySchedule::generate(64, &mut rng);
        for (on, off) in schedule.pairs() {
            assert!(on.signum() != off.signum());
            assert!(on.abs() >= MIN_SCHEDULE_MAGNITUDE);
            assert!(off.abs() >= MIN_SCHEDULE_MAGNITUDE);
        }
    }

    #[test]
    fn derive_selects_on_or_off() {
        let schedule = KeySchedule::from_pairs(&[(0.5, -0.5), (0.9, -0.3), (-0.4, 0.8)]).unwrap();
        let key = KeyVector::from_bits(vec![true, false, false]);
        assert_eq!(schedule.derive(&key).unwrap(), vec![0.5, -0.3, 0.8]);
    }

    #[test]
    fn derive_rejects_length_mismatch() {
        let schedule = KeySchedule::from_pairs(&[(0.5, -0.5)]).unwrap();
        let key = KeyVector::from_bits(vec![true, false]);
        assert_eq!(
            schedule.derive(&key),
            Err(KeyError::LengthMismatch {
                key: 2,
                schedule: 1
            })
        );
    }

    #[test]
    fn degenerate_pair_rejected() {
        assert_eq!(
            KeySchedule::from_pairs(&[(0.5, -0.5), (0.2, 0.2)]),
            Err(KeyError::DegenerateBit(1))
        );
    }
}
