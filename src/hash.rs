//! Seeded sine hash used to drive procedural geometry

/// Deterministic integer -> float hash.
///
/// The classic `fract(sin(x) * 43758.5453)` shader hash, with the seed folded
/// into the phase so independent streams (spikes, jitter) never line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededHash {
    seed: u32,
}

impl SeededHash {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Hash `index` into `[0, 1)`
    pub fn value(&self, index: usize) -> f64 {
        let phase = index as f64 * 12.9898 + self.seed as f64 * 78.233;
        let x = phase.sin() * 43758.5453;
        let v = x - x.floor();
        // floor of a value just below an integer can round up to 1.0
        if v >= 1.0 {
            0.0
        } else {
            v
        }
    }
}
