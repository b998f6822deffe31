//! Deterministic, seed-addressed pseudo-random source.
//!
//! The algorithm is fixed so any implementation reproduces the same
//! permutations from the same seed:
//!
//! - seed parts are hashed with 64-bit FNV-1a, a `0x1f` byte between parts;
//! - a zero hash becomes `0x9e3779b97f4a7c15`;
//! - each step is xorshift64* (`>>12`, `<<25`, `>>27`, multiply by
//!   `0x2545F4914F6CDD1D`);
//! - floats take the top 53 bits of the output;
//! - shuffles are Fisher–Yates from the last index down.

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const PART_SEPARATOR: u8 = 0x1f;
const ZERO_STATE_REPLACEMENT: u64 = 0x9e3779b97f4a7c15;
const XORSHIFT_MULTIPLIER: u64 = 0x2545F4914F6CDD1D;

/// Hash seed parts with FNV-1a.
pub fn seed_hash<S: AsRef<str>>(parts: &[S]) -> u64 {
    let mut hash = FNV_OFFSET;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hash ^= PART_SEPARATOR as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for byte in part.as_ref().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Seeded xorshift64* generator.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a generator from a raw state.
    pub fn new(state: u64) -> Self {
        let state = if state == 0 {
            ZERO_STATE_REPLACEMENT
        } else {
            state
        };
        Self { state }
    }

    /// Create a generator from seed parts, e.g. `["gen-1", "0", "questions"]`.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        Self::new(seed_hash(parts))
    }

    /// Next raw 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(XORSHIFT_MULTIPLIER)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `[0, n)`. `n` must be non-zero.
    pub fn next_below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        let idx = (self.next_float() * n as f64) as usize;
        idx.min(n - 1)
    }

    /// A Fisher–Yates permutation of `0..len`.
    pub fn shuffle(&mut self, len: usize) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = self.next_below(i + 1);
            perm.swap(i, j);
        }
        perm
    }
}

/// Shuffle `0..len` with a generator seeded from `parts`.
pub fn shuffle_with<S: AsRef<str>>(parts: &[S], len: usize) -> Vec<usize> {
    SeededRng::from_parts(parts).shuffle(len)
}

/// Returns `true` if `perm` is a bijection on `0..perm.len()`.
pub fn is_permutation(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    for &p in perm {
        if p >= perm.len() || seen[p] {
            return false;
        }
        seen[p] = true;
    }
    true
}

/// Inverse of a permutation: `inverse[perm[i]] == i`.
pub fn invert(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (position, &original) in perm.iter().enumerate() {
        inverse[original] = position;
    }
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(seed_hash::<&str>(&[]), 0xcbf29ce484222325);
        assert_eq!(seed_hash(&["a"]), 0xaf63dc4c8601ec8c);
        assert_eq!(seed_hash(&["foobar"]), 0x85944171f73967e8);
    }

    #[test]
    fn separator_distinguishes_part_boundaries() {
        assert_ne!(seed_hash(&["ab", "c"]), seed_hash(&["a", "bc"]));
        assert_ne!(seed_hash(&["abc"]), seed_hash(&["ab", "c"]));
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng::from_parts(&["gen-1", "0", "questions"]);
        let mut b = SeededRng::from_parts(&["gen-1", "0", "questions"]);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn xorshift_stream_matches_reference_vectors() {
        let mut rng = SeededRng::from_parts(&["gen-1", "0", "questions"]);
        assert_eq!(rng.next_u64(), 0x4b46adbc7eb46505);
        assert_eq!(rng.next_u64(), 0xccc05f0f1e43cae6);
        assert_eq!(rng.next_u64(), 0x62428168f0d9c685);

        let mut rng = SeededRng::from_parts(&["gen-1", "0", "questions"]);
        let f = rng.next_float();
        assert!((f - 0.2940472207253193).abs() < 1e-15, "got {f}");
    }

    #[test]
    fn shuffle_matches_reference_vector() {
        assert_eq!(shuffle_with(&["gen-1", "0", "questions"], 5), vec![0, 2, 4, 3, 1]);
        assert_eq!(shuffle_with(&["gen-1", "0", "questions"], 4), vec![3, 0, 2, 1]);
    }

    #[test]
    fn different_sub_seeds_diverge() {
        let a = shuffle_with(&["gen-1", "0", "q1"], 20);
        let b = shuffle_with(&["gen-1", "0", "q2"], 20);
        assert_ne!(a, b);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut rng = SeededRng::from_parts(&["bounds"]);
        for _ in 0..10_000 {
            let f = rng.next_float();
            assert!((0.0..1.0).contains(&f), "out of range: {f}");
        }
    }

    #[test]
    fn zero_state_is_replaced() {
        let mut rng = SeededRng::new(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        for len in 0..12 {
            let key = len.to_string();
            let perm = shuffle_with(&["perm", key.as_str()], len);
            assert_eq!(perm.len(), len);
            assert!(is_permutation(&perm));
        }
    }

    #[test]
    fn shuffle_reaches_every_position() {
        let mut first_seen = [false; 4];
        for i in 0..200 {
            let key = i.to_string();
            let perm = shuffle_with(&["spread", key.as_str()], 4);
            first_seen[perm[0]] = true;
        }
        assert!(first_seen.iter().all(|&s| s));
    }

    #[test]
    fn invert_round_trips() {
        let perm = vec![2, 0, 3, 1];
        let inv = invert(&perm);
        for (i, &p) in perm.iter().enumerate() {
            assert_eq!(inv[p], i);
        }
    }

    #[test]
    fn detects_non_permutations() {
        assert!(is_permutation(&[1, 0, 2]));
        assert!(!is_permutation(&[0, 0, 2]));
        assert!(!is_permutation(&[0, 3, 1]));
        assert!(is_permutation(&[]));
    }
}
