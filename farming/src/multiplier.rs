//! Lock duration (weeks) → scaled reward multiplier.

use crate::error::FarmError;
use serde::{Deserialize, Serialize};

/// Shortest accepted lock, in weeks.
pub const MIN_LOCK_WEEKS: u16 = 4;

/// Multipliers are stored ×100 (`100` = ×1.00) so that weights stay integral.
pub const MULTIPLIER_SCALE: u128 = 100;

/// Multipliers for 4..=103 week locks.
const DEFAULT_MULTIPLIERS: [u16; 100] = [
    100, 104, 108, 112, 115, 119, 122, 125, 128, 131, //
    134, 136, 139, 142, 144, 147, 149, 152, 154, 157, //
    159, 161, 164, 166, 168, 170, 173, 175, 177, 179, //
    181, 183, 185, 187, 189, 191, 193, 195, 197, 199, //
    201, 203, 205, 207, 209, 211, 213, 214, 216, 218, //
    220, 222, 223, 225, 227, 229, 230, 232, 234, 236, //
    237, 239, 241, 242, 244, 246, 247, 249, 251, 252, //
    254, 255, 257, 259, 260, 262, 263, 265, 267, 268, //
    270, 271, 273, 274, 276, 277, 279, 280, 282, 283, //
    285, 286, 288, 289, 291, 292, 294, 295, 297, 298,
];

/// Ordered mapping from lock weeks to multiplier; entry `i` is the multiplier
/// for a lock of `MIN_LOCK_WEEKS + i` weeks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierTable {
    multipliers: Vec<u16>,
}

impl MultiplierTable {
    /// Build a table. Entries must be non-zero and non-decreasing so that a
    /// longer lock never earns less.
    pub fn new(multipliers: Vec<u16>) -> Result<Self, FarmError> {
        if multipliers.is_empty() {
            return Err(FarmError::InvalidMultiplierTable("table is empty".into()));
        }
        if multipliers.len() > usize::from(u16::MAX - MIN_LOCK_WEEKS) {
            return Err(FarmError::InvalidMultiplierTable(format!(
                "{} entries exceed the week range",
                multipliers.len()
            )));
        }
        if multipliers.contains(&0) {
            return Err(FarmError::InvalidMultiplierTable(
                "multiplier must be non-zero".into(),
            ));
        }
        if multipliers.windows(2).any(|w| w[1] < w[0]) {
            return Err(FarmError::InvalidMultiplierTable(
                "multipliers must be non-decreasing".into(),
            ));
        }
        Ok(Self { multipliers })
    }

    pub fn min_weeks(&self) -> u16 {
        MIN_LOCK_WEEKS
    }

    pub fn max_weeks(&self) -> u16 {
        // len is bounded in `new`
        MIN_LOCK_WEEKS + self.multipliers.len() as u16 - 1
    }

    /// Resolve the multiplier for a lock of `weeks` weeks.
    pub fn get(&self, weeks: u16) -> Result<u16, FarmError> {
        weeks
            .checked_sub(MIN_LOCK_WEEKS)
            .and_then(|i| self.multipliers.get(usize::from(i)))
            .copied()
            .ok_or(FarmError::InvalidDuration {
                weeks,
                min: self.min_weeks(),
                max: self.max_weeks(),
            })
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.multipliers
    }
}

impl Default for MultiplierTable {
    fn default() -> Self {
        Self {
            multipliers: DEFAULT_MULTIPLIERS.to_vec(),
        }
    }
}
