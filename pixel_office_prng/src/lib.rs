// Seeded pseudo-random number generator for the office.
//
// xoshiro256++ seeded through SplitMix64. Two consumers draw from it:
// - `pixel_office_sim` picks spawn tiles and idle-wander targets for locally
//   driven characters.
// - `pixel_office_relay` generates room codes.
//
// Everything that consumes randomness takes an explicit `&mut OfficeRng`, so
// tests can seed it and get the same spawn tiles, wander walks and room codes
// on every run. The relay seeds from the wall clock; the sim is seeded by its
// caller.

use serde::{Deserialize, Serialize};

/// xoshiro256++ state. Cheap to clone; serializable so an engine snapshot can
/// carry its generator along.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfficeRng {
    s: [u64; 4],
}

impl OfficeRng {
    /// Expand a `u64` seed into the full 256-bit state with SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f32` in [0, 1) built from the top 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform integer in `[low, high)`, rejection-sampled so small ranges
    /// (room-code alphabets, wander radii) carry no modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % span);
            }
        }
    }

    /// Uniform index in `[0, len)`. Panics on an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        self.range_u64(0, len as u64) as usize
    }

    /// Uniform `f32` in `[low, high)`. Used for wander pause durations.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        low + self.next_f32() * (high - low)
    }

    /// Pick one element of a slice, or `None` if it is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.index(items.len())])
        }
    }
}

/// SplitMix64 step, only used to expand seeds.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
