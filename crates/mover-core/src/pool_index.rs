use serde::{Deserialize, Serialize};

use crate::MAX_SCRIPTS;

/// Index of a slot in the script pool.
///
/// Kept separate from position slot indices so the two can't be mixed up.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct PoolIndex(u8);

impl PoolIndex {
    pub fn new(index: u8) -> Self {
        Self(index)
    }

    /// Build an index from a physical array position, if it fits in the pool.
    pub fn from_usize(index: usize) -> Option<Self> {
        if index < MAX_SCRIPTS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PoolIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
