//! Geometry, randomness and dice; the leaves everything else builds on.
pub mod dice;
pub mod geometry;
pub mod rng;

pub use dice::{Dice, DiceFormula, DiceParseError};
pub use geometry::{Pos, Rect};
pub use rng::{GameRng, compute_seed};
