//! Batch Redemption
//!
//! Several unglues across asset classes as one all-or-nothing unit. The
//! guards of every class are taken up front, then every entry is
//! snapshotted before any entry executes, so each payout is computed
//! against the pre-batch state.

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use glue_common::{
    errors::AmountErrorReason, Address, AssetClassId, BatchEntry, GlueError, GlueEvent,
    GlueResult,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::redemption::{self, RedemptionOutcome, RedemptionRequest};
use crate::Glue;

/// Outcomes of a batch, in entry order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BatchOutcome {
    pub redemptions: Vec<RedemptionOutcome>,
}

impl BatchOutcome {
    /// Total paid in `token` across every entry
    pub fn total_paid(&self, token: &Address) -> u64 {
        self.redemptions
            .iter()
            .fold(0u64, |total, outcome| total.saturating_add(outcome.paid(token)))
    }
}

impl Glue {
    /// Unglue every entry for `redeemer`, paying `recipient`
    ///
    /// Fails without any retained mutation if any entry fails.
    pub fn batch_unglue(
        &mut self,
        redeemer: Address,
        entries: &[BatchEntry],
        recipient: Address,
    ) -> GlueResult<BatchOutcome> {
        // 1. Batch must be non-empty
        if entries.is_empty() {
            return Err(GlueError::InvalidAmount { amount: 0, reason: AmountErrorReason::Zero });
        }

        // 2. Each class at most once
        let mut seen = BTreeSet::new();
        for entry in entries {
            if !seen.insert(entry.asset_class) {
                return Err(GlueError::DuplicateEntry { id: entry.asset_class });
            }
        }
        let classes: Vec<AssetClassId> = entries.iter().map(|entry| entry.asset_class).collect();

        self.atomic("batch_unglue", |g| {
            g.guarded(&classes, |g| {
                // 3. One snapshot for the whole batch
                let requests = entries
                    .iter()
                    .map(|entry| {
                        RedemptionRequest::snapshot(
                            g,
                            &entry.asset_class,
                            redeemer,
                            recipient,
                            entry.amount.clone(),
                        )
                    })
                    .collect::<GlueResult<Vec<_>>>()?;

                // 4. Execute in order
                let mut outcome = BatchOutcome::default();
                for request in requests {
                    outcome.redemptions.push(redemption::execute(g, request)?);
                }

                let count = u32::try_from(outcome.redemptions.len()).map_err(|_| GlueError::Overflow)?;
                info!(entries = count, "batch unglue complete");
                g.emit(GlueEvent::BatchUnglued { redeemer, recipient, entries: count });
                Ok(outcome)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glue_common::AssetKind;

    const OWNER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const USDC: Address = [0xA1; 32];
    const WETH: Address = [0xB2; 32];

    fn fungible_class(glue: &mut Glue, token: Address, reserve: u64, supply: u64) -> AssetClassId {
        let class = glue.create_asset_class(OWNER, AssetKind::Fungible).unwrap();
        glue.register(&class, OWNER, token).unwrap();
        glue.fund(&token, &OWNER, reserve).unwrap();
        glue.glue(&class, OWNER, token, reserve).unwrap();
        glue.mint(&class, OWNER, ALICE, supply).unwrap();
        class
    }

    #[test]
    fn test_batch_across_classes() {
        let mut glue = Glue::default();
        let first = fungible_class(&mut glue, USDC, 1_000, 100);
        let second = fungible_class(&mut glue, WETH, 50, 10);

        let outcome = glue
            .batch_unglue(
                ALICE,
                &[BatchEntry::units(first, 25), BatchEntry::units(second, 2)],
                ALICE,
            )
            .unwrap();

        assert_eq!(outcome.redemptions.len(), 2);
        assert_eq!(outcome.total_paid(&USDC), 250);
        assert_eq!(outcome.total_paid(&WETH), 10);
        assert_eq!(glue.reserve_of(&first, &USDC).unwrap(), 750);
        assert_eq!(glue.reserve_of(&second, &WETH).unwrap(), 40);
        assert_eq!(glue.events().filter_by_type(glue_common::EventType::BatchUnglued).len(), 1);
    }

    #[test]
    fn test_failing_entry_reverts_earlier_entries() {
        let mut glue = Glue::default();
        let first = fungible_class(&mut glue, USDC, 1_000, 100);
        let second = fungible_class(&mut glue, WETH, 50, 10);
        let events_before = glue.events().len();

        let result = glue.batch_unglue(
            ALICE,
            &[BatchEntry::units(first, 25), BatchEntry::units(second, 11)],
            ALICE,
        );

        assert_eq!(result, Err(GlueError::InsufficientBalance { available: 10, requested: 11 }));
        assert_eq!(glue.reserve_of(&first, &USDC).unwrap(), 1_000);
        assert_eq!(glue.total_supply(&first).unwrap(), 100);
        assert_eq!(glue.token_balance(&USDC, &ALICE), 0);
        assert_eq!(glue.events().len(), events_before);
        assert!(!glue.is_guarded(&first));
        assert!(!glue.is_guarded(&second));
    }

    #[test]
    fn test_duplicate_and_empty_batches() {
        let mut glue = Glue::default();
        let class = fungible_class(&mut glue, USDC, 1_000, 100);

        assert_eq!(
            glue.batch_unglue(
                ALICE,
                &[BatchEntry::units(class, 1), BatchEntry::units(class, 1)],
                ALICE
            ),
            Err(GlueError::DuplicateEntry { id: class })
        );
        assert!(matches!(
            glue.batch_unglue(ALICE, &[], ALICE),
            Err(GlueError::InvalidAmount { .. })
        ));
        assert_eq!(glue.total_supply(&class).unwrap(), 100);
    }

    #[test]
    fn test_batch_with_non_fungible_entry() {
        let mut glue = Glue::default();
        let fungible = fungible_class(&mut glue, USDC, 1_000, 100);
        let nft = glue.create_asset_class(OWNER, AssetKind::NonFungible).unwrap();
        glue.register(&nft, OWNER, WETH).unwrap();
        glue.fund(&WETH, &OWNER, 90).unwrap();
        glue.glue(&nft, OWNER, WETH, 90).unwrap();
        for id in [7, 8, 9] {
            glue.mint_token(&nft, OWNER, ALICE, id).unwrap();
        }

        let outcome = glue
            .batch_unglue(
                ALICE,
                &[BatchEntry::tokens(nft, vec![7, 9]), BatchEntry::units(fungible, 10)],
                ALICE,
            )
            .unwrap();

        assert_eq!(outcome.total_paid(&WETH), 60);
        assert_eq!(outcome.total_paid(&USDC), 100);
        assert_eq!(glue.total_supply(&nft).unwrap(), 1);
    }

    #[test]
    fn test_unknown_class_in_batch() {
        let mut glue = Glue::default();
        let class = fungible_class(&mut glue, USDC, 1_000, 100);
        let missing = [0xEE; 32];

        let result = glue.batch_unglue(
            ALICE,
            &[BatchEntry::units(class, 1), BatchEntry::units(missing, 1)],
            ALICE,
        );
        assert_eq!(result, Err(GlueError::AssetClassNotFound { asset_class: missing }));
        assert!(!glue.is_guarded(&class));
    }
}
