//! Protocol Constants
//!
//! All fixed configuration values for the Glue reserve engine.
//! Runtime-tunable values live in [`crate::config::GlueConfig`] and default
//! to the constants declared here.

/// Fee Configuration (in basis points, 100 = 1%)
pub mod fees {
    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Default flash loan fee (0.01%)
    pub const DEFAULT_FLASH_LOAN_FEE_BPS: u64 = 1;

    /// Hard ceiling for the flash loan fee (10%)
    pub const MAX_FLASH_LOAN_FEE_BPS: u64 = 1_000;
}

/// Bounds on per-class state
pub mod limits {
    /// Default number of reserve tokens an asset class may track.
    ///
    /// Every unglue iterates all registered reserves, so the list is bounded.
    pub const DEFAULT_MAX_RESERVES_PER_CLASS: usize = 64;

    /// Absolute ceiling for `max_reserves_per_class`
    pub const MAX_RESERVES_PER_CLASS: usize = 256;
}

/// Domain separators for deterministic identifiers
pub mod domains {
    /// Prefix hashed into every asset class id
    pub const ASSET_CLASS: &[u8] = b"glue/asset-class/v1";
}
