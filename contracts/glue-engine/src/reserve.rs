//! Reserve Operations
//!
//! Registering reserve tokens, gluing (depositing) reserves and absorbing
//! untracked holdings. Each mutation of the ledger is paired with the
//! transfer it accounts for.

use glue_common::{Address, AssetClassId, GlueError, GlueEvent, GlueResult};
use tracing::debug;

use crate::hooks::{self, GlueHookArgs, HookCall};
use crate::{ensure_owner, require_nonzero, Glue};

impl Glue {
    /// Start tracking `token` as a reserve of `asset_class`; owner only
    pub fn register(
        &mut self,
        asset_class: &AssetClassId,
        caller: Address,
        token: Address,
    ) -> GlueResult<()> {
        let maximum = self.config().max_reserves_per_class as usize;
        self.atomic("register", |g| {
            g.guarded(&[*asset_class], |g| {
                let class = g.class_mut(asset_class)?;
                ensure_owner(class, &caller)?;
                if class.ledger.is_registered(&token) {
                    return Err(GlueError::DuplicateReserve { token });
                }
                if class.ledger.len() >= maximum {
                    return Err(GlueError::TooManyReserves { maximum });
                }
                class.ledger.register(token)?;
                g.emit(GlueEvent::ReserveRegistered { asset_class: *asset_class, token });
                Ok(())
            })
        })
    }

    /// Deposit `amount` of a registered reserve from `depositor`
    ///
    /// Runs `before_glue`, pulls the tokens, credits the ledger, then runs
    /// `after_glue`. Returns the new tracked reserve. The depositor may not
    /// be an asset class: class funds leave only through unglue or a loan.
    pub fn glue(
        &mut self,
        asset_class: &AssetClassId,
        depositor: Address,
        token: Address,
        amount: u64,
    ) -> GlueResult<u64> {
        self.atomic("glue", |g| {
            g.guarded(&[*asset_class], |g| {
                require_nonzero(amount)?;
                g.ensure_unprotected(&depositor)?;
                if !g.class(asset_class)?.ledger.is_registered(&token) {
                    return Err(GlueError::ReserveNotRegistered { token });
                }
                let available = g.token_balance(&token, &depositor);
                if available < amount {
                    return Err(GlueError::InsufficientBalance { available, requested: amount });
                }

                let args = GlueHookArgs { asset_class: *asset_class, depositor, token, amount };
                hooks::dispatch(g, asset_class, HookCall::BeforeGlue(&args))?;

                g.bank_mut().transfer(&token, &depositor, asset_class, amount)?;
                let new_reserve = g.class_mut(asset_class)?.ledger.credit(&token, amount)?;

                hooks::dispatch(g, asset_class, HookCall::AfterGlue(&args))?;
                g.verify_backing(asset_class)?;

                debug!(amount, new_reserve, "glued");
                g.emit(GlueEvent::Glued {
                    asset_class: *asset_class,
                    depositor,
                    token,
                    amount,
                    new_reserve,
                });
                Ok(new_reserve)
            })
        })
    }

    /// Absorb tokens sent to the class outside of `glue` into the ledger
    ///
    /// Credits exactly the gap between held and tracked, so the tracked
    /// balance ends equal to the held balance. Returns the amount absorbed.
    pub fn sync(&mut self, asset_class: &AssetClassId, token: Address) -> GlueResult<u64> {
        self.atomic("sync", |g| {
            g.guarded(&[*asset_class], |g| {
                let ledger = &g.class(asset_class)?.ledger;
                if !ledger.is_registered(&token) {
                    return Err(GlueError::ReserveNotRegistered { token });
                }
                let tracked = ledger.balance_of(&token);
                let held = g.token_balance(&token, asset_class);
                let absorbed = held.checked_sub(tracked).ok_or(GlueError::BackingDeficit {
                    token,
                    tracked,
                    held,
                })?;
                if absorbed == 0 {
                    return Ok(0);
                }

                let new_reserve = g.class_mut(asset_class)?.ledger.credit(&token, absorbed)?;
                g.emit(GlueEvent::ReserveSynced {
                    asset_class: *asset_class,
                    token,
                    absorbed,
                    new_reserve,
                });
                Ok(absorbed)
            })
        })
    }
}
