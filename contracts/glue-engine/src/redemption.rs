//! Redemption Engine
//!
//! Burns sticky tokens for a proportional share of every reserve of their
//! class. For a burn of `b` against a pre-burn supply `T`, each reserve
//! `R` pays `floor(R * b / T)`.
//!
//! ## Execution Order
//!
//! 1. Snapshot `T` and every `R` (no external call in between)
//! 2. `before_unglue` hook; it may abort but cannot touch the snapshot
//! 3. Burn `b`
//! 4. Per reserve: compute, skip if zero, debit ledger, transfer
//! 5. `after_unglue` hook
//!
//! The class guard is held for the whole sequence, so a hook that tries to
//! unglue or borrow from the same class fails with `ReentrantCall`.

use borsh::{BorshDeserialize, BorshSerialize};
use glue_common::{
    errors::AmountErrorReason, proportional_share, Address, AssetClassId, GlueError, GlueEvent,
    GlueResult, Payout, RedeemAmount, ReserveEntry, TokenId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hooks::{self, HookCall, UnglueHookArgs};
use crate::Glue;

/// One unglue, frozen at entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionRequest {
    pub asset_class: AssetClassId,
    pub redeemer: Address,
    pub recipient: Address,
    pub amount: RedeemAmount,
    /// Total supply before the burn
    pub supply_snapshot: u64,
    /// Tracked reserves before the burn, in ledger order
    pub reserve_snapshot: Vec<ReserveEntry>,
}

impl RedemptionRequest {
    /// Validate the burn and capture supply and reserves
    pub(crate) fn snapshot(
        glue: &Glue,
        asset_class: &AssetClassId,
        redeemer: Address,
        recipient: Address,
        amount: RedeemAmount,
    ) -> GlueResult<Self> {
        let class = glue.class(asset_class)?;
        class.supply.check_burn(&redeemer, &amount)?;

        Ok(Self {
            asset_class: *asset_class,
            redeemer,
            recipient,
            amount,
            supply_snapshot: class.supply.total_supply(),
            reserve_snapshot: class.ledger.entries().to_vec(),
        })
    }

    /// Supply units destroyed by this request
    pub fn burned(&self) -> u64 {
        self.amount.units()
    }

    /// Payouts owed against the snapshot
    pub fn quote(&self) -> GlueResult<Vec<Payout>> {
        quote(&self.reserve_snapshot, self.burned(), self.supply_snapshot)
    }
}

/// Result of one completed unglue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RedemptionOutcome {
    pub asset_class: AssetClassId,
    pub burned: u64,
    pub supply_before: u64,
    /// One entry per registered reserve, zero amounts included
    pub payouts: Vec<Payout>,
    /// Reserves processed, skipped zero payouts included
    pub processed: u32,
}

impl RedemptionOutcome {
    /// Amount of `token` paid out
    pub fn paid(&self, token: &Address) -> u64 {
        self.payouts
            .iter()
            .find(|payout| payout.token == *token)
            .map(|payout| payout.amount)
            .unwrap_or(0)
    }
}

/// Floor-rounded share of every reserve for burning `burned` of `supply`
pub fn quote(reserves: &[ReserveEntry], burned: u64, supply: u64) -> GlueResult<Vec<Payout>> {
    reserves
        .iter()
        .map(|entry| {
            Ok(Payout {
                token: entry.token,
                amount: proportional_share(entry.balance, burned, supply)?,
            })
        })
        .collect()
}

/// Run a snapshotted request; the caller holds the class guard
pub(crate) fn execute(glue: &mut Glue, request: RedemptionRequest) -> GlueResult<RedemptionOutcome> {
    let asset_class = request.asset_class;
    let payouts = request.quote()?;

    let args = UnglueHookArgs {
        asset_class,
        redeemer: request.redeemer,
        recipient: request.recipient,
        amount: request.amount.clone(),
        supply_snapshot: request.supply_snapshot,
        payouts: payouts.clone(),
    };
    hooks::dispatch(glue, &asset_class, HookCall::BeforeUnglue(&args))?;

    glue.class_mut(&asset_class)?
        .supply
        .burn(&request.redeemer, &request.amount)?;

    let mut processed: u32 = 0;
    for payout in &payouts {
        if payout.amount > 0 {
            glue.pay_reserve(&asset_class, &payout.token, &request.recipient, payout.amount)?;
        }
        processed = processed.checked_add(1).ok_or(GlueError::Overflow)?;
    }

    hooks::dispatch(glue, &asset_class, HookCall::AfterUnglue(&args))?;

    let burned = request.burned();
    debug!(burned, supply_before = request.supply_snapshot, processed, "unglued");
    glue.emit(GlueEvent::Unglued {
        asset_class,
        redeemer: request.redeemer,
        recipient: request.recipient,
        burned,
        supply_before: request.supply_snapshot,
        payouts: payouts.clone(),
    });

    Ok(RedemptionOutcome {
        asset_class,
        burned,
        supply_before: request.supply_snapshot,
        payouts,
        processed,
    })
}

impl Glue {
    /// Burn `amount` fungible sticky tokens of `redeemer`, paying the
    /// proportional reserves to `recipient`
    pub fn unglue(
        &mut self,
        asset_class: &AssetClassId,
        redeemer: Address,
        amount: u64,
        recipient: Address,
    ) -> GlueResult<RedemptionOutcome> {
        self.unglue_with("unglue", asset_class, redeemer, RedeemAmount::Units(amount), recipient)
    }

    /// Burn specific non-fungible sticky tokens, one supply unit each
    pub fn unglue_tokens(
        &mut self,
        asset_class: &AssetClassId,
        redeemer: Address,
        token_ids: Vec<TokenId>,
        recipient: Address,
    ) -> GlueResult<RedemptionOutcome> {
        self.unglue_with(
            "unglue_tokens",
            asset_class,
            redeemer,
            RedeemAmount::TokenIds(token_ids),
            recipient,
        )
    }

    /// What burning `amount` units would pay right now
    pub fn preview_unglue(&self, asset_class: &AssetClassId, amount: u64) -> GlueResult<Vec<Payout>> {
        let class = self.class(asset_class)?;
        let supply = class.supply.total_supply();
        if amount == 0 {
            return Err(GlueError::InvalidAmount { amount, reason: AmountErrorReason::Zero });
        }
        if amount > supply {
            return Err(GlueError::InvalidAmount { amount, reason: AmountErrorReason::TooLarge });
        }
        quote(class.ledger.entries(), amount, supply)
    }

    fn unglue_with(
        &mut self,
        operation: &'static str,
        asset_class: &AssetClassId,
        redeemer: Address,
        amount: RedeemAmount,
        recipient: Address,
    ) -> GlueResult<RedemptionOutcome> {
        self.atomic(operation, |g| {
            g.guarded(&[*asset_class], |g| {
                let request = RedemptionRequest::snapshot(g, asset_class, redeemer, recipient, amount)?;
                let outcome = execute(g, request)?;
                info!(burned = outcome.burned, processed = outcome.processed, "redemption complete");
                Ok(outcome)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glue_common::{AssetKind, HookStage};
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::GluedHooks;

    const OWNER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];
    const TOKEN_A: Address = [0xA1; 32];
    const TOKEN_B: Address = [0xB2; 32];

    /// Class with reserve A = 1000 and supply 100 held by Alice
    fn setup() -> (Glue, AssetClassId) {
        let mut glue = Glue::default();
        let class = glue.create_asset_class(OWNER, AssetKind::Fungible).unwrap();
        glue.register(&class, OWNER, TOKEN_A).unwrap();
        glue.fund(&TOKEN_A, &OWNER, 1_000).unwrap();
        glue.glue(&class, OWNER, TOKEN_A, 1_000).unwrap();
        glue.mint(&class, OWNER, ALICE, 100).unwrap();
        (glue, class)
    }

    #[test]
    fn test_proportional_scenario() {
        let (mut glue, class) = setup();

        let first = glue.unglue(&class, ALICE, 25, ALICE).unwrap();
        assert_eq!(first.paid(&TOKEN_A), 250);
        assert_eq!(first.supply_before, 100);
        assert_eq!(glue.reserve_of(&class, &TOKEN_A).unwrap(), 750);
        assert_eq!(glue.total_supply(&class).unwrap(), 75);

        let second = glue.unglue(&class, ALICE, 75, ALICE).unwrap();
        assert_eq!(second.paid(&TOKEN_A), 750);
        assert_eq!(glue.reserve_of(&class, &TOKEN_A).unwrap(), 0);
        assert_eq!(glue.total_supply(&class).unwrap(), 0);
        assert_eq!(glue.token_balance(&TOKEN_A, &ALICE), 1_000);
    }

    #[test]
    fn test_payout_goes_to_recipient() {
        let (mut glue, class) = setup();
        glue.unglue(&class, ALICE, 10, BOB).unwrap();

        assert_eq!(glue.token_balance(&TOKEN_A, &BOB), 100);
        assert_eq!(glue.token_balance(&TOKEN_A, &ALICE), 0);
        assert_eq!(glue.sticky_balance(&class, &ALICE).unwrap(), 90);
    }

    #[test]
    fn test_invalid_amounts() {
        let (mut glue, class) = setup();

        assert_eq!(
            glue.unglue(&class, ALICE, 0, ALICE),
            Err(GlueError::InvalidAmount { amount: 0, reason: AmountErrorReason::Zero })
        );
        assert_eq!(
            glue.unglue(&class, ALICE, 101, ALICE),
            Err(GlueError::InsufficientBalance { available: 100, requested: 101 })
        );
        assert_eq!(
            glue.unglue(&class, BOB, 1, BOB),
            Err(GlueError::InsufficientBalance { available: 0, requested: 1 })
        );
        assert_eq!(glue.reserve_of(&class, &TOKEN_A).unwrap(), 1_000);
    }

    #[test]
    fn test_zero_payout_skipped_but_processed() {
        let (mut glue, class) = setup();
        glue.register(&class, OWNER, TOKEN_B).unwrap();
        glue.fund(&TOKEN_B, &OWNER, 5).unwrap();
        glue.glue(&class, OWNER, TOKEN_B, 5).unwrap();

        // floor(5 * 10 / 100) = 0
        let outcome = glue.unglue(&class, ALICE, 10, ALICE).unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.paid(&TOKEN_A), 100);
        assert_eq!(outcome.paid(&TOKEN_B), 0);
        assert_eq!(glue.reserve_of(&class, &TOKEN_B).unwrap(), 5);
        assert_eq!(glue.token_balance(&TOKEN_B, &ALICE), 0);
    }

    #[test]
    fn test_preview_matches_execution() {
        let (mut glue, class) = setup();
        let preview = glue.preview_unglue(&class, 33).unwrap();
        let outcome = glue.unglue(&class, ALICE, 33, ALICE).unwrap();

        assert_eq!(preview, outcome.payouts);
        assert!(matches!(
            glue.preview_unglue(&class, 68),
            Err(GlueError::InvalidAmount { reason: AmountErrorReason::TooLarge, .. })
        ));
    }

    #[test]
    fn test_non_fungible_unglue() {
        let mut glue = Glue::default();
        let class = glue.create_asset_class(OWNER, AssetKind::NonFungible).unwrap();
        glue.register(&class, OWNER, TOKEN_A).unwrap();
        glue.fund(&TOKEN_A, &OWNER, 400).unwrap();
        glue.glue(&class, OWNER, TOKEN_A, 400).unwrap();
        for id in 1..=4 {
            glue.mint_token(&class, OWNER, ALICE, id).unwrap();
        }

        let outcome = glue.unglue_tokens(&class, ALICE, vec![2, 3], BOB).unwrap();
        assert_eq!(outcome.burned, 2);
        assert_eq!(outcome.paid(&TOKEN_A), 200);
        assert_eq!(glue.total_supply(&class).unwrap(), 2);
        assert_eq!(glue.class(&class).unwrap().supply().owner_of(2), None);

        assert_eq!(
            glue.unglue_tokens(&class, ALICE, vec![2], BOB),
            Err(GlueError::NotTokenOwner { token_id: 2 })
        );
        assert!(matches!(
            glue.unglue_tokens(&class, ALICE, vec![], BOB),
            Err(GlueError::InvalidAmount { .. })
        ));
        assert_eq!(glue.unglue(&class, ALICE, 1, BOB), Err(GlueError::WrongAssetKind));
    }

    struct ReenterUnglue {
        nested: RefCell<Option<GlueResult<RedemptionOutcome>>>,
    }

    impl GluedHooks for ReenterUnglue {
        fn before_unglue(&self, glue: &mut Glue, args: &UnglueHookArgs) -> GlueResult<()> {
            let nested = glue.unglue(&args.asset_class, args.redeemer, 1, args.redeemer);
            *self.nested.borrow_mut() = Some(nested);
            Ok(())
        }
    }

    #[test]
    fn test_reentrant_unglue_from_hook_rejected() {
        let (mut glue, class) = setup();
        let hook = Rc::new(ReenterUnglue { nested: RefCell::new(None) });
        glue.set_hooks(&class, OWNER, hook.clone()).unwrap();

        let outcome = glue.unglue(&class, ALICE, 25, ALICE).unwrap();
        assert_eq!(outcome.paid(&TOKEN_A), 250);
        assert_eq!(
            hook.nested.borrow().clone(),
            Some(Err(GlueError::ReentrantCall { asset_class: class }))
        );
        assert_eq!(glue.total_supply(&class).unwrap(), 75);
    }

    #[derive(Default)]
    struct SeesPayouts {
        seen: RefCell<Vec<(HookStage, u64, u64)>>,
    }

    impl GluedHooks for SeesPayouts {
        fn before_unglue(&self, glue: &mut Glue, args: &UnglueHookArgs) -> GlueResult<()> {
            let held = glue.token_balance(&TOKEN_A, &args.recipient);
            self.seen.borrow_mut().push((HookStage::BeforeUnglue, args.payouts[0].amount, held));
            Ok(())
        }

        fn after_unglue(&self, glue: &mut Glue, args: &UnglueHookArgs) -> GlueResult<()> {
            let held = glue.token_balance(&TOKEN_A, &args.recipient);
            self.seen.borrow_mut().push((HookStage::AfterUnglue, args.payouts[0].amount, held));
            Ok(())
        }
    }

    #[test]
    fn test_hooks_bracket_transfer() {
        let (mut glue, class) = setup();
        let hook = Rc::new(SeesPayouts::default());
        glue.set_hooks(&class, OWNER, hook.clone()).unwrap();

        glue.unglue(&class, ALICE, 25, BOB).unwrap();
        assert_eq!(
            *hook.seen.borrow(),
            vec![(HookStage::BeforeUnglue, 250, 0), (HookStage::AfterUnglue, 250, 250)]
        );
    }

    struct Thief;

    impl GluedHooks for Thief {
        fn after_unglue(&self, glue: &mut Glue, args: &UnglueHookArgs) -> GlueResult<()> {
            glue.transfer(&TOKEN_A, &args.asset_class, &args.redeemer, 1)
        }
    }

    #[test]
    fn test_hook_cannot_move_reserves() {
        let (mut glue, class) = setup();
        glue.set_hooks(&class, OWNER, Rc::new(Thief)).unwrap();

        let err = glue.unglue(&class, ALICE, 25, ALICE).unwrap_err();
        assert_eq!(err.root_cause(), &GlueError::ProtectedAddress { address: class });
        assert_eq!(glue.reserve_of(&class, &TOKEN_A).unwrap(), 1_000);
        assert_eq!(glue.total_supply(&class).unwrap(), 100);
        assert_eq!(glue.token_balance(&TOKEN_A, &ALICE), 0);
    }
}
