//! Seeded random source for game mechanics.
//!
//! Every roll in the engine goes through [`GameRng`]. Given the same seed (and
//! the same sequence of calls) it produces the same results, which is what makes
//! a session replayable and a restored save continue where it left off.
//!
//! # Scripted draws
//!
//! Tests and the driver's `force_rolls` command can queue raw values that are
//! consumed before the generator advances. A queued value `v` answers the next
//! `below(n)` call with `v % n`, so queueing `19` forces the next d20 to a 20.
use std::collections::VecDeque;

/// PCG random number generator (Permuted Congruential Generator) with state.
///
/// Uses the PCG-XSH-RR variant: 64-bit state, 32-bit output.
///
/// # References
///
/// - PCG paper: <https://www.pcg-random.org/>
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameRng {
    state: u64,
    scripted: VecDeque<u32>,
}

impl GameRng {
    /// PCG multiplier constant.
    const MULTIPLIER: u64 = 6364136223846793005;

    /// PCG increment constant.
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        Self {
            state: seed,
            scripted: VecDeque::new(),
        }
    }

    /// Current generator state, for diagnostics.
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Queue raw values to be consumed before the generator advances.
    pub fn push_script(&mut self, values: impl IntoIterator<Item = u32>) {
        self.scripted.extend(values);
    }

    pub fn scripted_len(&self) -> usize {
        self.scripted.len()
    }

    pub fn clear_script(&mut self) {
        self.scripted.clear();
    }

    /// Advance the LCG state by one step.
    #[inline]
    fn pcg_step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// XSH-RR output permutation.
    #[inline]
    fn pcg_output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = Self::pcg_step(self.state);
        Self::pcg_output(self.state)
    }

    /// Uniform in `[0, n)`. Scripted values take priority.
    pub fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        if let Some(forced) = self.scripted.pop_front() {
            return forced % n;
        }
        self.next_u32() % n
    }

    /// `[0, n)`, or 0 when `n <= 0`.
    pub fn rn2(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        self.below(n as u32) as i32
    }

    /// `[0, x) + y`
    pub fn rn1(&mut self, x: i32, y: i32) -> i32 {
        y + self.rn2(x)
    }

    /// `[min, max]`
    pub fn rn_range(&mut self, min: i32, max: i32) -> i32 {
        if max < min {
            return min;
        }
        min + self.rn2(max - min + 1)
    }

    /// Geometric roll in `[1, n]`: keeps adding one while a coin flip succeeds.
    pub fn rne(&mut self, n: i32) -> i32 {
        let mut result = 1;
        while result < n && self.rn2(2) == 0 {
            result += 1;
        }
        result
    }

    /// Single die, `[1, sides]`.
    pub fn d(&mut self, sides: i32) -> i32 {
        self.rn1(sides, 1)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.rn2(items.len() as i32) as usize)
    }

    /// Weighted choice; falls back to the last item if weights don't cover the roll.
    pub fn pick_weighted<'a, T>(
        &mut self,
        items: &'a [T],
        weight: impl Fn(&T) -> i32,
    ) -> Option<&'a T> {
        let total: i32 = items.iter().map(&weight).sum();
        let mut roll = self.rn2(total);
        for item in items {
            roll -= weight(item);
            if roll < 0 {
                return Some(item);
            }
        }
        items.last()
    }

    /// Fisher-Yates.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rn2(i as i32 + 1) as usize;
            items.swap(i, j);
        }
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Compute a deterministic seed from several entropy sources.
///
/// # Arguments
///
/// * `game_seed` - Base seed set at game start
/// * `round` - Round counter
/// * `actor_id` - Entity the stream belongs to
/// * `context` - Additional discriminator for independent streams
pub fn compute_seed(game_seed: u64, round: u64, actor_id: u32, context: u32) -> u64 {
    // SplitMix64 and FxHash multipliers
    let mut hash = game_seed;
    hash ^= round.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= (actor_id as u64).wrapping_mul(0x517cc1b727220a95);
    hash ^= (context as u64).wrapping_mul(0x85ebca6b);

    // Final avalanche step
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(42);
        let xs: Vec<_> = (0..16).map(|_| a.d(20)).collect();
        let ys: Vec<_> = (0..16).map(|_| b.d(20)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn helpers_stay_in_range() {
        let mut rng = GameRng::new(7);
        for _ in 0..500 {
            let r = rng.rn_range(3, 8);
            assert!((3..=8).contains(&r));
            assert!((1..=6).contains(&rng.d(6)));
            assert!((1..=4).contains(&rng.rne(4)));
        }
        assert_eq!(rng.rn2(0), 0);
        assert_eq!(rng.rn_range(5, 2), 5);
    }

    #[test]
    fn scripted_values_come_first() {
        let mut rng = GameRng::new(1);
        rng.push_script([19, 0]);
        assert_eq!(rng.d(20), 20);
        assert_eq!(rng.d(20), 1);
        assert_eq!(rng.scripted_len(), 0);
    }

    #[test]
    fn pick_weighted_skips_zero_weights() {
        let mut rng = GameRng::new(99);
        let items = [("never", 0), ("always", 5)];
        for _ in 0..50 {
            let picked = rng.pick_weighted(&items, |(_, w)| *w);
            assert_eq!(picked.map(|(n, _)| *n), Some("always"));
        }
    }

    #[test]
    fn compute_seed_separates_streams() {
        assert_ne!(compute_seed(1, 0, 0, 0), compute_seed(1, 0, 0, 1));
        assert_eq!(compute_seed(9, 3, 2, 1), compute_seed(9, 3, 2, 1));
    }
}
