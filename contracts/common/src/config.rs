//! Runtime Configuration
//!
//! Tunable engine parameters. Defaults come from [`crate::constants`];
//! `validate` enforces the hard ceilings declared there.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{fees, limits};
use crate::errors::{GlueError, GlueResult};

/// Configuration for the reserve engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(default)]
pub struct GlueConfig {
    /// Flash loan fee in basis points, charged per loan leg and rounded up
    pub flash_fee_bps: u64,
    /// Maximum number of reserve tokens one asset class may register
    pub max_reserves_per_class: u32,
}

impl Default for GlueConfig {
    fn default() -> Self {
        Self {
            flash_fee_bps: fees::DEFAULT_FLASH_LOAN_FEE_BPS,
            max_reserves_per_class: limits::DEFAULT_MAX_RESERVES_PER_CLASS as u32,
        }
    }
}

impl GlueConfig {
    /// Default configuration with a custom flash loan fee
    pub fn with_flash_fee_bps(flash_fee_bps: u64) -> Self {
        Self { flash_fee_bps, ..Self::default() }
    }

    /// Check every parameter against its hard bound
    pub fn validate(&self) -> GlueResult<()> {
        if self.flash_fee_bps > fees::MAX_FLASH_LOAN_FEE_BPS {
            return Err(GlueError::InvalidConfig {
                param: "flash_fee_bps",
                reason: "exceeds maximum flash loan fee",
            });
        }

        let max_reserves = self.max_reserves_per_class as usize;
        if max_reserves == 0 || max_reserves > limits::MAX_RESERVES_PER_CLASS {
            return Err(GlueError::InvalidConfig {
                param: "max_reserves_per_class",
                reason: "must be between 1 and the reserve ceiling",
            });
        }

        Ok(())
    }
}
