//! Identifier rewriting for the preprocess-only mode.

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasher, Hasher, RandomState};

const REPLACEMENT_LEN: usize = 16;
const GLYPHS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// splitmix64, enough randomness for name generation without pulling in an
/// RNG dependency.
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

/// Maps every identifier to a stable 16-character alphanumeric replacement.
/// Distinct inputs always get distinct outputs.
pub struct IdentifierObfuscator {
    rng: SplitMix64,
    map: HashMap<String, String>,
    used: HashSet<String>,
}

impl IdentifierObfuscator {
    /// Deterministic generator for reproducible output.
    #[must_use]
    pub fn with_fixed_seed() -> Self {
        Self::with_seed(0x73_76_66_72_6f_6e_74)
    }

    /// Generator seeded from system entropy.
    #[must_use]
    pub fn with_random_seed() -> Self {
        let seed = RandomState::new().build_hasher().finish();
        Self::with_seed(seed)
    }

    fn with_seed(seed: u64) -> Self {
        Self {
            rng: SplitMix64::new(seed),
            map: HashMap::new(),
            used: HashSet::new(),
        }
    }

    /// Replacement for `name`, generating and remembering one on first use.
    pub fn rename(&mut self, name: &str) -> String {
        if let Some(existing) = self.map.get(name) {
            return existing.clone();
        }
        let replacement = loop {
            let candidate = self.generate();
            if self.used.insert(candidate.clone()) {
                break candidate;
            }
        };
        self.map
            .insert(name.to_owned(), replacement.clone());
        replacement
    }

    fn generate(&mut self) -> String {
        let mut out = String::with_capacity(REPLACEMENT_LEN);
        for _ in 0..REPLACEMENT_LEN {
            let index = (self.rng.next() % GLYPHS.len() as u64) as usize;
            out.push(GLYPHS[index] as char);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacements_are_alphanumeric_and_sized() {
        let mut obfuscator = IdentifierObfuscator::with_fixed_seed();
        let name = obfuscator.rename("clk");
        assert_eq!(name.len(), 16);
        assert!(name.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn same_input_maps_to_same_output() {
        let mut obfuscator = IdentifierObfuscator::with_fixed_seed();
        let first = obfuscator.rename("data");
        let second = obfuscator.rename("data");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_inputs_map_to_distinct_outputs() {
        let mut obfuscator = IdentifierObfuscator::with_fixed_seed();
        let mut seen = HashSet::new();
        for index in 0..500 {
            let name = obfuscator.rename(&format!("name{index}"));
            assert!(seen.insert(name));
        }
    }

    #[test]
    fn fixed_seed_is_deterministic_across_instances() {
        let mut first = IdentifierObfuscator::with_fixed_seed();
        let mut second = IdentifierObfuscator::with_fixed_seed();
        for name in ["a", "b", "c", "a"] {
            assert_eq!(first.rename(name), second.rename(name));
        }
    }
}
