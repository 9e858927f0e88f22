//! Deterministic random number generation
//!
//! Named, seeded, independent substreams. Every stream's seed is derived
//! from the master seed and a stable hash of the stream name, so adding a
//! new named stream can never perturb the sequences of existing ones.
//!
//! CRITICAL: all randomness in a run MUST come from these streams. Ambient
//! randomness breaks replay.

mod xorshift;

use std::collections::HashMap;

use sha2::{Digest, Sha256};

pub use xorshift::RngStream;

/// Stable 64-bit hash of a stream name.
///
/// SHA-256 truncated to its first 8 bytes. Stability across processes and
/// platforms is the point; speed is irrelevant at stream creation.
fn stable_name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// SplitMix64 finalizer mixing the master seed with a name hash.
///
/// Well distributed and reversible, so distinct names land on distinct
/// stream seeds even under adversarial master seeds.
fn mix(master_seed: u64, name_hash: u64) -> u64 {
    let mut z = master_seed
        .wrapping_add(name_hash)
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Registry of named substreams, all derived from one master seed.
///
/// # Example
/// ```
/// use des_simulator_core_rs::rng::RngStreams;
///
/// let mut streams = RngStreams::new(12345);
/// let arrival = streams.stream("arrivals").next_f64();
///
/// // same master seed, same name: same sequence
/// let mut replay = RngStreams::new(12345);
/// assert_eq!(replay.stream("arrivals").next_f64(), arrival);
/// ```
#[derive(Debug, Clone)]
pub struct RngStreams {
    master_seed: u64,
    streams: HashMap<String, RngStream>,
}

impl RngStreams {
    /// Create a registry seeded with `master_seed`.
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            streams: HashMap::new(),
        }
    }

    /// The master seed this registry derives from.
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream keyed by `name`, created on first use.
    pub fn stream(&mut self, name: &str) -> &mut RngStream {
        let master_seed = self.master_seed;
        self.streams
            .entry(name.to_string())
            .or_insert_with(|| RngStream::new(mix(master_seed, stable_name_hash(name))))
    }
}
