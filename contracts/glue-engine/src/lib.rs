//! Glue Reserve Engine
//!
//! Reserve accounting, redemption and flash loans for sticky assets.
//!
//! ## Model
//!
//! - An **asset class** is one wrapped-token family (fungible or
//!   non-fungible). Its id is also the address holding its reserves.
//! - **Glue** deposits reserve tokens into a class; **unglue** burns sticky
//!   tokens for `floor(reserve * burned / supply)` of every reserve.
//! - **Flash loans** lend reserves within one operation and require
//!   principal plus a rounded-up fee to be back before it completes.
//! - **Hooks** and loan receivers are untrusted callbacks that may re-enter
//!   the engine; a per-class single-flight guard rejects re-entry into a
//!   class that is mid-operation.
//!
//! ## Atomicity
//!
//! Every public mutating operation runs against a checkpoint of the whole
//! engine state. If it fails at any point, including inside a hook or a
//! nested call, the state is restored to the checkpoint before the error
//! is returned.

use std::collections::BTreeMap;
use std::rc::Rc;

use glue_common::{
    derive_asset_class_id, errors::AmountErrorReason, Address, AssetClassId, AssetKind,
    EventLog, GlueConfig, GlueError, GlueEvent, GlueResult, ReserveLedger, TokenId,
};
use tracing::{debug, warn};

pub mod asset_class;
pub mod bank;
pub mod batch;
pub mod flash;
pub mod guard;
pub mod hooks;
pub mod receiver;
pub mod redemption;
pub mod reserve;
pub mod sticky;


pub use asset_class::AssetClass;
pub use batch::BatchOutcome;
pub use flash::{GluedLoanReceiver, LoanCallback, LoanLeg, LoanReceipt};
pub use hooks::{GlueHookArgs, GluedHooks, UnglueHookArgs};
pub use receiver::{LoanLogic, RepayingReceiver};
pub use redemption::{RedemptionOutcome, RedemptionRequest};

/// Everything restored when an operation fails
#[derive(Debug, Clone, Default)]
struct GlueState {
    classes: BTreeMap<AssetClassId, AssetClass>,
    bank: bank::TokenBank,
    events: EventLog,
    nonce: u64,
}

/// The reserve engine
#[derive(Debug)]
pub struct Glue {
    config: GlueConfig,
    state: GlueState,
}

impl Default for Glue {
    fn default() -> Self {
        Self { config: GlueConfig::default(), state: GlueState::default() }
    }
}

impl Glue {
    pub fn new(config: GlueConfig) -> GlueResult<Self> {
        config.validate()?;
        Ok(Self { config, state: GlueState::default() })
    }

    pub fn config(&self) -> &GlueConfig {
        &self.config
    }

    // ============ Asset Classes ============

    /// Create a new asset class owned by `owner`
    pub fn create_asset_class(&mut self, owner: Address, kind: AssetKind) -> GlueResult<AssetClassId> {
        self.atomic("create_asset_class", |g| {
            let asset_class = derive_asset_class_id(&owner, g.state.nonce);
            if g.state.classes.contains_key(&asset_class) {
                return Err(GlueError::DuplicateEntry { id: asset_class });
            }
            g.state.nonce = g.state.nonce.checked_add(1).ok_or(GlueError::Overflow)?;
            g.state.classes.insert(asset_class, AssetClass::new(owner, kind));
            g.state.events.emit(GlueEvent::AssetClassCreated { asset_class, owner, kind });
            Ok(asset_class)
        })
    }

    /// Install the hooks of a class; owner only, once
    pub fn set_hooks(
        &mut self,
        asset_class: &AssetClassId,
        caller: Address,
        hooks: Rc<dyn GluedHooks>,
    ) -> GlueResult<()> {
        self.atomic("set_hooks", |g| {
            let class = g.class_mut(asset_class)?;
            ensure_owner(class, &caller)?;
            if class.hooks.is_set() {
                return Err(GlueError::HooksAlreadySet { asset_class: *asset_class });
            }
            class.hooks.install(hooks);
            g.state.events.emit(GlueEvent::HooksConfigured {
                asset_class: *asset_class,
                owner: caller,
            });
            Ok(())
        })
    }

    /// Mint fungible sticky tokens; owner only
    pub fn mint(
        &mut self,
        asset_class: &AssetClassId,
        caller: Address,
        to: Address,
        amount: u64,
    ) -> GlueResult<u64> {
        self.atomic("mint", |g| {
            g.guarded(&[*asset_class], |g| {
                let class = g.class_mut(asset_class)?;
                ensure_owner(class, &caller)?;
                let new_total_supply = class.supply.mint(&to, amount)?;
                g.state.events.emit(GlueEvent::StickyMinted {
                    asset_class: *asset_class,
                    to,
                    amount,
                    new_total_supply,
                });
                Ok(new_total_supply)
            })
        })
    }

    /// Mint one non-fungible sticky token; owner only
    pub fn mint_token(
        &mut self,
        asset_class: &AssetClassId,
        caller: Address,
        to: Address,
        token_id: TokenId,
    ) -> GlueResult<u64> {
        self.atomic("mint_token", |g| {
            g.guarded(&[*asset_class], |g| {
                let class = g.class_mut(asset_class)?;
                ensure_owner(class, &caller)?;
                let new_total_supply = class.supply.mint_token(&to, token_id)?;
                g.state.events.emit(GlueEvent::StickyMinted {
                    asset_class: *asset_class,
                    to,
                    amount: 1,
                    new_total_supply,
                });
                Ok(new_total_supply)
            })
        })
    }

    // ============ External Tokens ============

    /// Issue external tokens to `to`, standing in for the token's own mint
    ///
    /// This is the test-double issuer of the in-memory token bank. It is
    /// refused while any asset class is mid-operation, so a hook or loan
    /// receiver cannot conjure repayment out of thin air.
    pub fn fund(&mut self, token: &Address, to: &Address, amount: u64) -> GlueResult<()> {
        if let Some(asset_class) = self.busy_class() {
            return Err(GlueError::ReentrantCall { asset_class });
        }
        self.atomic("fund", |g| g.state.bank.mint(token, to, amount))
    }

    /// Move external tokens on behalf of `from`
    ///
    /// Funds held by an asset class can only leave through unglue or a
    /// flash loan, so `from` may not be a class address.
    pub fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> GlueResult<()> {
        self.ensure_unprotected(from)?;
        self.atomic("transfer", |g| g.state.bank.transfer(token, from, to, amount))
    }

    // ============ Views ============

    pub fn class(&self, asset_class: &AssetClassId) -> GlueResult<&AssetClass> {
        self.state
            .classes
            .get(asset_class)
            .ok_or(GlueError::AssetClassNotFound { asset_class: *asset_class })
    }

    pub fn total_supply(&self, asset_class: &AssetClassId) -> GlueResult<u64> {
        Ok(self.class(asset_class)?.supply.total_supply())
    }

    pub fn sticky_balance(&self, asset_class: &AssetClassId, holder: &Address) -> GlueResult<u64> {
        Ok(self.class(asset_class)?.supply.balance_of(holder))
    }

    pub fn ledger(&self, asset_class: &AssetClassId) -> GlueResult<&ReserveLedger> {
        Ok(&self.class(asset_class)?.ledger)
    }

    /// Tracked reserve of `token` in `asset_class`
    pub fn reserve_of(&self, asset_class: &AssetClassId, token: &Address) -> GlueResult<u64> {
        Ok(self.class(asset_class)?.ledger.balance_of(token))
    }

    /// Amount of `token` actually held at `holder`
    pub fn token_balance(&self, token: &Address, holder: &Address) -> u64 {
        self.state.bank.balance_of(token, holder)
    }

    pub fn is_guarded(&self, asset_class: &AssetClassId) -> bool {
        self.class(asset_class).map(AssetClass::is_guarded).unwrap_or(false)
    }

    /// Storage encoding of a class's reserve ledger
    pub fn export_ledger(&self, asset_class: &AssetClassId) -> GlueResult<Vec<u8>> {
        Ok(self.class(asset_class)?.ledger.to_bytes())
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    /// Drain the event log
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.state.events)
    }

    // ============ Internals ============

    pub(crate) fn class_mut(&mut self, asset_class: &AssetClassId) -> GlueResult<&mut AssetClass> {
        self.state
            .classes
            .get_mut(asset_class)
            .ok_or(GlueError::AssetClassNotFound { asset_class: *asset_class })
    }

    /// Refuse to move funds out of any asset class address
    pub(crate) fn ensure_unprotected(&self, address: &Address) -> GlueResult<()> {
        if self.state.classes.contains_key(address) {
            return Err(GlueError::ProtectedAddress { address: *address });
        }
        Ok(())
    }

    /// First class whose guard is currently held
    fn busy_class(&self) -> Option<AssetClassId> {
        self.state
            .classes
            .iter()
            .find(|(_, class)| class.is_guarded())
            .map(|(asset_class, _)| *asset_class)
    }

    pub(crate) fn emit(&mut self, event: GlueEvent) {
        self.state.events.emit(event);
    }

    /// Run `operation` against a checkpoint; restore the checkpoint on error
    pub(crate) fn atomic<T>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&mut Glue) -> GlueResult<T>,
    ) -> GlueResult<T> {
        debug!(operation, "begin");
        let checkpoint = self.state.clone();
        match body(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(operation, code = err.code(), "operation rolled back");
                self.state = checkpoint;
                Err(err)
            }
        }
    }

    /// Pay `amount` of a reserve out of a class: validate, debit, transfer
    pub(crate) fn pay_reserve(
        &mut self,
        asset_class: &AssetClassId,
        token: &Address,
        to: &Address,
        amount: u64,
    ) -> GlueResult<()> {
        let held = self.state.bank.balance_of(token, asset_class);
        if held < amount {
            return Err(GlueError::BackingDeficit {
                token: *token,
                tracked: self.class(asset_class)?.ledger.balance_of(token),
                held,
            });
        }
        self.class_mut(asset_class)?.ledger.debit(token, amount)?;
        self.state.bank.transfer(token, asset_class, to, amount)
    }

    /// Check every tracked reserve of a class against actual holdings
    pub(crate) fn verify_backing(&self, asset_class: &AssetClassId) -> GlueResult<()> {
        for entry in self.class(asset_class)?.ledger.entries() {
            let held = self.state.bank.balance_of(&entry.token, asset_class);
            if entry.balance > held {
                return Err(GlueError::BackingDeficit {
                    token: entry.token,
                    tracked: entry.balance,
                    held,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn bank(&self) -> &bank::TokenBank {
        &self.state.bank
    }

    pub(crate) fn bank_mut(&mut self) -> &mut bank::TokenBank {
        &mut self.state.bank
    }
}

fn ensure_owner(class: &AssetClass, caller: &Address) -> GlueResult<()> {
    if class.owner != *caller {
        return Err(GlueError::Unauthorized { expected: class.owner, actual: *caller });
    }
    Ok(())
}

fn require_nonzero(amount: u64) -> GlueResult<()> {
    if amount == 0 {
        return Err(GlueError::InvalidAmount { amount, reason: AmountErrorReason::Zero });
    }
    Ok(())
}
