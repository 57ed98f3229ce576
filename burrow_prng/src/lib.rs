// Seedable pseudo-random number generator for the Burrow simulation.
//
// `SimRng` is xoshiro256++ (Blackman & Vigna, 2019) expanded from a single
// `u64` seed with SplitMix64. Every random draw in the workspace goes through
// it: cave noise, density correction shuffles, resource scattering, and the
// per-unit exploration headings.
//
// The generator is small enough to clone per unit. `split()` derives an
// independent child stream so each controller can own its generator without
// sharing mutable state with the world generator.
//
// See also: `burrow_sim::terrain` for the cellular-automata noise pass and
// `burrow_sim::controller` for exploration headings.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Xoshiro256++ generator with the draw helpers the simulation needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRng {
    s: [u64; 4],
}

impl SimRng {
    /// Seed a generator. Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self { s }
    }

    /// Derive a child generator. The parent advances by one draw, so
    /// successive splits yield distinct children.
    pub fn split(&mut self) -> Self {
        Self::new(self.next_u64())
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.s[0]
            .wrapping_add(self.s[3])
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

    /// Uniform `f64` in [0, 1), built from the top 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f64` in [low, high). Returns `low` when the range is empty.
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + self.next_f64() * (high - low)
    }

    /// Uniform index in [0, len). Rejection sampling keeps it unbiased.
    ///
    /// Returns 0 for `len == 0`; callers that care check emptiness first.
    pub fn below(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let range = len as u64;
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return (r % range) as usize;
            }
        }
    }

    /// Uniform integer in [low, high] inclusive.
    pub fn range_i32_inclusive(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        let span = (high as i64 - low as i64 + 1) as usize;
        (low as i64 + self.below(span) as i64) as i32
    }

    /// `true` with probability `p`. `p <= 0` never fires, `p >= 1` always does.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Heading in radians, uniform over [0, 2π).
    pub fn angle(&mut self) -> f64 {
        self.next_f64() * TAU
    }

    /// Pick one element, or `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.below(items.len()))
        }
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}

/// SplitMix64 step, used only to expand the seed.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
