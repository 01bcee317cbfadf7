//! Error Types for Glue Protocol
//!
//! Typed errors with stable codes. Every error aborts the enclosing
//! operation; the engine restores all state before surfacing it.

use core::fmt;

use crate::types::{Address, AssetClassId, HookStage, TokenId};

/// Result type alias for Glue operations
pub type GlueResult<T> = Result<T, GlueError>;

/// Main error enum for all Glue protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlueError {
    // ============ Amount Errors ============
    /// Zero or malformed amount
    InvalidAmount { amount: u64, reason: AmountErrorReason },

    /// Caller holds fewer sticky tokens than requested
    InsufficientBalance { available: u64, requested: u64 },

    /// Pool tracks less of a reserve than requested
    InsufficientReserve {
        token: Address,
        available: u64,
        requested: u64,
    },

    // ============ Idempotency Errors ============
    /// Reserve token already registered for the class
    DuplicateReserve { token: Address },

    /// Same id appears twice in one request
    DuplicateEntry { id: [u8; 32] },

    /// Non-fungible token id already minted
    TokenExists { token_id: TokenId },

    /// Hooks may only be configured once
    HooksAlreadySet { asset_class: AssetClassId },

    // ============ Guard Errors ============
    /// Single-flight guard of the class is already held
    ReentrantCall { asset_class: AssetClassId },

    // ============ Loan Errors ============
    /// Borrower returned less than principal plus fee
    LoanNotRepaid {
        token: Address,
        expected: u64,
        actual: u64,
    },

    // ============ Hook Errors ============
    /// Hook or loan callback failed
    HookAborted { stage: HookStage, cause: Box<GlueError> },

    /// Abort raised by hook or receiver logic
    Rejected { reason: &'static str },

    // ============ Lookup Errors ============
    /// Unknown asset class
    AssetClassNotFound { asset_class: AssetClassId },

    /// Token is not a registered reserve of the class
    ReserveNotRegistered { token: Address },

    /// Reserve list is full
    TooManyReserves { maximum: usize },

    /// Redeemer does not own the non-fungible token
    NotTokenOwner { token_id: TokenId },

    /// Operation does not apply to this asset kind
    WrongAssetKind,

    // ============ Authorization Errors ============
    /// Caller is not authorized for this operation
    Unauthorized { expected: Address, actual: Address },

    /// Only the engine may move funds held by an asset class
    ProtectedAddress { address: Address },

    // ============ Invariant Errors ============
    /// Tracked reserve exceeds what the class actually holds
    BackingDeficit { token: Address, tracked: u64, held: u64 },

    // ============ Config Errors ============
    /// Runtime configuration out of bounds
    InvalidConfig { param: &'static str, reason: &'static str },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Division by zero
    DivisionByZero,
}

/// Reasons for amount-related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountErrorReason {
    /// Amount is zero when non-zero required
    Zero,
    /// Amount exceeds what the operation allows
    TooLarge,
}

impl GlueError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "E010_INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "E011_INSUFFICIENT_BALANCE",
            Self::InsufficientReserve { .. } => "E012_INSUFFICIENT_RESERVE",
            Self::DuplicateReserve { .. } => "E020_DUPLICATE_RESERVE",
            Self::DuplicateEntry { .. } => "E021_DUPLICATE_ENTRY",
            Self::TokenExists { .. } => "E022_TOKEN_EXISTS",
            Self::HooksAlreadySet { .. } => "E023_HOOKS_SET",
            Self::ReentrantCall { .. } => "E030_REENTRANT_CALL",
            Self::LoanNotRepaid { .. } => "E040_LOAN_NOT_REPAID",
            Self::HookAborted { .. } => "E050_HOOK_ABORTED",
            Self::Rejected { .. } => "E051_REJECTED",
            Self::AssetClassNotFound { .. } => "E060_CLASS_NOT_FOUND",
            Self::ReserveNotRegistered { .. } => "E061_RESERVE_NOT_REGISTERED",
            Self::TooManyReserves { .. } => "E062_TOO_MANY_RESERVES",
            Self::NotTokenOwner { .. } => "E063_NOT_TOKEN_OWNER",
            Self::WrongAssetKind => "E064_WRONG_ASSET_KIND",
            Self::Unauthorized { .. } => "E070_UNAUTHORIZED",
            Self::ProtectedAddress { .. } => "E071_PROTECTED_ADDRESS",
            Self::BackingDeficit { .. } => "E080_BACKING_DEFICIT",
            Self::InvalidConfig { .. } => "E090_INVALID_CONFIG",
            Self::Overflow => "E100_OVERFLOW",
            Self::DivisionByZero => "E101_DIV_ZERO",
        }
    }

    /// Returns true if this error is recoverable (caller can fix it and retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientBalance { .. } => true, // Acquire more tokens
            Self::InsufficientReserve { .. } => true, // Borrow less
            Self::ReentrantCall { .. } => true,       // Retry as a fresh operation
            Self::HookAborted { cause, .. } => cause.is_recoverable(),
            _ => false,
        }
    }

    /// Innermost error, looking through hook aborts
    pub fn root_cause(&self) -> &GlueError {
        match self {
            Self::HookAborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for GlueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount { amount, reason } => {
                write!(f, "{}: amount {} rejected ({:?})", self.code(), amount, reason)
            }
            Self::InsufficientBalance { available, requested } => {
                write!(f, "{}: requested {}, available {}", self.code(), requested, available)
            }
            Self::InsufficientReserve { available, requested, .. } => {
                write!(f, "{}: requested {}, reserve {}", self.code(), requested, available)
            }
            Self::LoanNotRepaid { expected, actual, .. } => {
                write!(f, "{}: expected balance {}, found {}", self.code(), expected, actual)
            }
            Self::HookAborted { stage, cause } => {
                write!(f, "{}: {:?} failed: {}", self.code(), stage, cause)
            }
            Self::Rejected { reason } => write!(f, "{}: {}", self.code(), reason),
            Self::BackingDeficit { tracked, held, .. } => {
                write!(f, "{}: tracked {} exceeds held {}", self.code(), tracked, held)
            }
            Self::InvalidConfig { param, reason } => {
                write!(f, "{}: {} {}", self.code(), param, reason)
            }
            other => f.write_str(other.code()),
        }
    }
}

impl std::error::Error for GlueError {}
