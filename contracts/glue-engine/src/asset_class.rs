//! Asset Class State
//!
//! One wrapped-token family: its sticky supply, its reserve ledger, its
//! hook registration and its single-flight guard. The class id is also
//! the address that holds the class's reserves.

use glue_common::{Address, AssetKind, ReserveLedger};

use crate::guard::SingleFlight;
use crate::hooks::HookRegistration;
use crate::sticky::StickySupply;

#[derive(Debug, Clone)]
pub struct AssetClass {
    pub(crate) owner: Address,
    pub(crate) supply: StickySupply,
    pub(crate) ledger: ReserveLedger,
    pub(crate) hooks: HookRegistration,
    pub(crate) guard: SingleFlight,
}

impl AssetClass {
    pub(crate) fn new(owner: Address, kind: AssetKind) -> Self {
        Self {
            owner,
            supply: StickySupply::new(kind),
            ledger: ReserveLedger::new(),
            hooks: HookRegistration::default(),
            guard: SingleFlight::default(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn kind(&self) -> AssetKind {
        self.supply.kind()
    }

    pub fn supply(&self) -> &StickySupply {
        &self.supply
    }

    pub fn ledger(&self) -> &ReserveLedger {
        &self.ledger
    }

    pub fn has_hooks(&self) -> bool {
        self.hooks.is_set()
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_held()
    }
}
