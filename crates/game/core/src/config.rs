/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    /// Seed for the session random source.
    pub seed: u64,
    /// Energy every actor gains at the start of its phase of a round.
    pub energy_per_round: i32,
    /// Difficulty class used by area abilities that do not specify one.
    pub default_save_dc: i32,
    /// Hit points given to the player when no template overrides them.
    pub player_hp: i32,
}

impl GameConfig {
    // ===== compile-time constants =====
    /// Maximum number of d20s kept on one check (normal roll plus one for advantage).
    pub const MAX_CHECK_DICE: usize = 2;
    /// Upper bound for the deferred-action drain, guards against hooks that requeue forever.
    pub const MAX_DEFERRED_PER_FLUSH: usize = 1024;
    /// Actions are allowed while energy is strictly above this value.
    pub const ACT_THRESHOLD: i32 = 1;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_SEED: u64 = 0x5eed_1234_abcd_0001;
    pub const DEFAULT_ENERGY_PER_ROUND: i32 = 12;
    pub const DEFAULT_SAVE_DC: i32 = 15;
    pub const DEFAULT_PLAYER_HP: i32 = 30;

    pub fn new() -> Self {
        Self {
            seed: Self::DEFAULT_SEED,
            energy_per_round: Self::DEFAULT_ENERGY_PER_ROUND,
            default_save_dc: Self::DEFAULT_SAVE_DC,
            player_hp: Self::DEFAULT_PLAYER_HP,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::new()
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
