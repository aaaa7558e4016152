use proptest::prelude::*;

use dexf_farming::{CheckpointLedger, FarmConfig, FarmingEngine, RewardDistributor};
use dexf_nullables::NullLedger;
use dexf_types::{Address, Asset, EpochId, Timestamp, WEEK_SECS};

const START: u64 = 1_600_000_000;

fn at(epoch: EpochId) -> Timestamp {
    Timestamp::new(START + epoch * WEEK_SECS)
}

fn engine(emission: u128) -> FarmingEngine {
    let owner = Address::from_index(0xd0);
    let config = FarmConfig {
        epoch_duration_secs: WEEK_SECS,
        epoch1_start: Some(START),
        emission_per_epoch_tokens: 0,
        ..FarmConfig::default()
    };
    let mut engine = FarmingEngine::new(Address::from_index(0xfa), owner.clone(), &config).unwrap();
    engine.set_emission_per_epoch(&owner, emission, at(0)).unwrap();
    engine
}

fn ledger(accounts: u64) -> NullLedger {
    let mut ledger = NullLedger::new(Address::from_index(0xfa));
    for i in 1..=accounts {
        ledger.mint(&Asset::Native, &Address::from_index(i), u128::MAX / 1024);
    }
    ledger.fund_reward_pool(u128::MAX / 2);
    ledger
}

/// (epoch gap, account, amount, weeks, withdraw after n epochs)
fn actions() -> impl Strategy<Value = Vec<(u64, u64, u128, u16, Option<u64>)>> {
    prop::collection::vec(
        (
            0u64..3,
            1u64..4,
            1u128..1_000_000,
            4u16..20,
            prop::option::of(0u64..6),
        ),
        1..12,
    )
}

proptest! {
    /// A query returns the value of the greatest recorded epoch at or before it.
    #[test]
    fn checkpoint_queries_forward_fill(
        gaps in prop::collection::vec((1u64..5, 0u128..1_000), 1..20),
        target in 0u64..120,
    ) {
        let mut ledger = CheckpointLedger::new();
        let mut epoch = 0;
        let mut recorded = Vec::new();
        for (gap, value) in gaps {
            epoch += gap;
            ledger.record(epoch, value).unwrap();
            recorded.push((epoch, value));
        }
        let expected = recorded
            .iter()
            .rev()
            .find(|(e, _)| *e <= target)
            .map(|(_, v)| *v)
            .unwrap_or(0);
        prop_assert_eq!(ledger.query(target), expected);
    }

    /// The stored total always equals the weights of the stakes open at that epoch.
    #[test]
    fn total_multiplier_tracks_open_stakes(actions in actions()) {
        let mut engine = engine(1_000);
        let mut ledger = ledger(3);
        let mut epoch = 0;
        let mut withdrawals = Vec::new();

        for (gap, who, amount, weeks, withdraw) in actions {
            epoch += gap;
            withdrawals.retain(|(when, account, index): &(u64, Address, usize)| {
                if *when <= epoch {
                    engine.emergency_withdraw(account, *index, at(epoch), &mut ledger).unwrap();
                    false
                } else {
                    true
                }
            });
            let account = Address::from_index(who);
            let index = engine.stake(&account, amount, weeks, at(epoch), &mut ledger).unwrap();
            if let Some(after) = withdraw {
                withdrawals.push((epoch + after, account, index));
            }
        }

        let stakers: Vec<Address> = engine.stakers().cloned().collect();
        for e in 0..=epoch + 1 {
            let expected: u128 = stakers
                .iter()
                .flat_map(|a| engine.get_stakes(a))
                .filter(|s| s.start_epoch <= e && s.end_epoch.map_or(true, |end| e < end))
                .map(|s| s.weighted_amount)
                .sum();
            prop_assert_eq!(engine.total_multiplier_at(e), expected, "epoch {}", e);
        }
    }

    /// Claimable is pure and a claim drains it for the current epoch.
    #[test]
    fn claim_is_idempotent(
        amount in 1u128..1_000_000_000,
        other in 1u128..1_000_000_000,
        claim_epoch in 0u64..30,
        emission in 1u128..1_000_000_000_000,
    ) {
        let mut engine = engine(emission);
        let mut ledger = ledger(2);
        let alice = Address::from_index(1);
        engine.stake(&alice, amount, 10, at(0), &mut ledger).unwrap();
        engine.stake(&Address::from_index(2), other, 12, at(0), &mut ledger).unwrap();

        let first = engine.claimable(&alice, 0, at(claim_epoch)).unwrap();
        let second = engine.claimable(&alice, 0, at(claim_epoch)).unwrap();
        prop_assert_eq!(first, second);

        let paid = engine.claim(&alice, 0, at(claim_epoch), &mut ledger).unwrap();
        prop_assert_eq!(paid, first);
        prop_assert_eq!(engine.claimable(&alice, 0, at(claim_epoch)).unwrap(), 0);
    }

    /// The run-wise sum matches a plain per-epoch sum, and no epoch pays out
    /// more than its emission.
    #[test]
    fn rewards_match_per_epoch_sum(
        actions in actions(),
        emission in 1u128..10_000_000,
        horizon in 1u64..40,
    ) {
        let mut engine = engine(emission);
        let mut ledger = ledger(3);
        let mut epoch = 0;
        for (gap, who, amount, weeks, _) in actions {
            epoch += gap;
            engine.stake(&Address::from_index(who), amount, weeks, at(epoch), &mut ledger).unwrap();
        }
        let upto = epoch + horizon;

        let emission_ledger = {
            let mut l = CheckpointLedger::new();
            l.record(0, emission).unwrap();
            l
        };
        let distributor = RewardDistributor::new(engine.total_multiplier_ledger(), &emission_ledger);
        let stakers: Vec<Address> = engine.stakers().cloned().collect();

        for e in 0..upto {
            let paid: u128 = stakers
                .iter()
                .flat_map(|a| engine.get_stakes(a))
                .map(|s| if s.start_epoch <= e { distributor.epoch_reward(s, e).unwrap() } else { 0 })
                .sum();
            prop_assert!(paid <= emission, "epoch {} paid {} > {}", e, paid, emission);
        }

        for account in &stakers {
            for (index, stake) in engine.get_stakes(account).enumerate() {
                let naive: u128 = (stake.start_epoch..upto)
                    .map(|e| distributor.epoch_reward(stake, e).unwrap())
                    .sum();
                prop_assert_eq!(engine.claimable(account, index, at(upto)).unwrap(), naive);
            }
        }
    }
}
