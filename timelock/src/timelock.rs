use crate::call::{decode_args, CallError, CallRouter, TimelockCall};
use crate::config::{TimelockConfig, GRACE_PERIOD, MAXIMUM_DELAY, MINIMUM_DELAY};
use crate::error::TimelockError;
use dexf_store::{decode, decode_required, encode, TimelockStore};
use dexf_types::{Address, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const SETTINGS_KEY: &str = "timelock/settings";

const SET_DELAY: &str = "setDelay(uint256)";
const SET_PENDING_ADMIN: &str = "setPendingAdmin(address)";
const ACCEPT_ADMIN: &str = "acceptAdmin()";

/// The narrow contract the governor relies on.
pub trait TimelockController {
    fn address(&self) -> &Address;
    fn delay(&self) -> u64;
    fn grace_period(&self) -> u64;
    fn is_queued(&self, hash: &TxHash) -> bool;

    fn queue_transaction(
        &mut self,
        caller: &Address,
        call: TimelockCall,
        now: Timestamp,
    ) -> Result<TxHash, TimelockError>;

    fn cancel_transaction(
        &mut self,
        caller: &Address,
        call: &TimelockCall,
    ) -> Result<TxHash, TimelockError>;

    fn execute_transaction(
        &mut self,
        caller: &Address,
        call: &TimelockCall,
        now: Timestamp,
        router: &mut dyn CallRouter,
    ) -> Result<Vec<u8>, TimelockError>;

    fn accept_admin(&mut self, caller: &Address) -> Result<(), TimelockError>;
}

#[derive(Serialize, Deserialize)]
struct TimelockSettings {
    address: Address,
    admin: Address,
    pending_admin: Option<Address>,
    admin_initialized: bool,
    delay: u64,
}

/// Queue of delayed calls keyed by their hash.
#[derive(Clone, Debug)]
pub struct Timelock {
    address: Address,
    admin: Address,
    pending_admin: Option<Address>,
    /// Set once the admin has used its one-off right to name a pending admin
    /// directly. Afterwards only the timelock itself may do so.
    admin_initialized: bool,
    delay: u64,
    queued: BTreeMap<TxHash, TimelockCall>,
}

impl Timelock {
    pub fn new(address: Address, admin: Address, config: &TimelockConfig) -> Result<Self, TimelockError> {
        check_delay(config.delay_secs)?;
        Ok(Self {
            address,
            admin,
            pending_admin: None,
            admin_initialized: false,
            delay: config.delay_secs,
            queued: BTreeMap::new(),
        })
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn pending_admin(&self) -> Option<&Address> {
        self.pending_admin.as_ref()
    }

    pub fn queued(&self) -> impl Iterator<Item = (&TxHash, &TimelockCall)> + '_ {
        self.queued.iter()
    }

    /// Change the delay. Only reachable through a queued self-call.
    pub fn set_delay(&mut self, caller: &Address, delay: u64) -> Result<(), TimelockError> {
        self.ensure_self(caller)?;
        check_delay(delay)?;
        self.delay = delay;
        info!(delay, "timelock delay changed");
        Ok(())
    }

    /// Name the next admin. The current admin may do this directly exactly
    /// once; after that it must go through a queued self-call.
    pub fn set_pending_admin(&mut self, caller: &Address, pending: Address) -> Result<(), TimelockError> {
        if self.admin_initialized {
            self.ensure_self(caller)?;
        } else {
            if caller != &self.admin {
                return Err(TimelockError::NotAdmin {
                    caller: caller.clone(),
                });
            }
            self.admin_initialized = true;
        }
        info!(pending = %pending, "timelock pending admin set");
        self.pending_admin = Some(pending);
        Ok(())
    }

    fn ensure_admin(&self, caller: &Address) -> Result<(), TimelockError> {
        if caller != &self.admin {
            return Err(TimelockError::NotAdmin {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    fn ensure_self(&self, caller: &Address) -> Result<(), TimelockError> {
        if caller != &self.address {
            return Err(TimelockError::NotSelf {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Calls whose target is the timelock run here; the router never sees
    /// them.
    fn call_self(&mut self, call: &TimelockCall) -> Result<Vec<u8>, TimelockError> {
        let me = self.address.clone();
        match call.signature.as_str() {
            SET_DELAY => {
                let delay: u128 = decode_args(&call.data)?;
                let delay = u64::try_from(delay)
                    .map_err(|_| CallError::InvalidCalldata(format!("delay {delay} out of range")))?;
                self.set_delay(&me, delay)?
            }
            SET_PENDING_ADMIN => self.set_pending_admin(&me, decode_args(&call.data)?)?,
            ACCEPT_ADMIN => self.accept_admin(&me)?,
            other => return Err(TimelockError::UnknownSelfCall(other.to_string())),
        }
        Ok(Vec::new())
    }
}

impl TimelockController for Timelock {
    fn address(&self) -> &Address {
        &self.address
    }

    fn delay(&self) -> u64 {
        self.delay
    }

    fn grace_period(&self) -> u64 {
        GRACE_PERIOD
    }

    fn is_queued(&self, hash: &TxHash) -> bool {
        self.queued.contains_key(hash)
    }

    /// Queue `call`. Queueing an identical call again is a no-op that
    /// returns the same hash.
    fn queue_transaction(
        &mut self,
        caller: &Address,
        call: TimelockCall,
        now: Timestamp,
    ) -> Result<TxHash, TimelockError> {
        self.ensure_admin(caller)?;
        let earliest = now.saturating_add_secs(self.delay);
        if call.eta < earliest {
            return Err(TimelockError::EtaTooEarly {
                eta: call.eta,
                earliest,
            });
        }
        let hash = call.hash()?;
        info!(
            %hash,
            target = %call.target,
            signature = %call.signature,
            eta = call.eta.as_secs(),
            "transaction queued"
        );
        self.queued.entry(hash).or_insert(call);
        Ok(hash)
    }

    fn cancel_transaction(
        &mut self,
        caller: &Address,
        call: &TimelockCall,
    ) -> Result<TxHash, TimelockError> {
        self.ensure_admin(caller)?;
        let hash = call.hash()?;
        if self.queued.remove(&hash).is_some() {
            info!(%hash, signature = %call.signature, "transaction canceled");
        }
        Ok(hash)
    }

    fn execute_transaction(
        &mut self,
        caller: &Address,
        call: &TimelockCall,
        now: Timestamp,
        router: &mut dyn CallRouter,
    ) -> Result<Vec<u8>, TimelockError> {
        self.ensure_admin(caller)?;
        let hash = call.hash()?;
        if !self.queued.contains_key(&hash) {
            return Err(TimelockError::NotQueued(hash));
        }
        if now < call.eta {
            return Err(TimelockError::NotSurpassed { eta: call.eta, now });
        }
        let deadline = call.eta.saturating_add_secs(GRACE_PERIOD);
        if now > deadline {
            return Err(TimelockError::Stale { deadline, now });
        }

        let Some(entry) = self.queued.remove(&hash) else {
            return Err(TimelockError::NotQueued(hash));
        };
        let result = if call.target == self.address {
            self.call_self(call)
        } else {
            router
                .call(&self.address, &call.target, call.value, &call.signature, &call.data)
                .map_err(TimelockError::from)
        };

        match result {
            Ok(output) => {
                info!(%hash, target = %call.target, signature = %call.signature, "transaction executed");
                Ok(output)
            }
            Err(e) => {
                warn!(%hash, signature = %call.signature, error = %e, "transaction execution failed");
                self.queued.insert(hash, entry);
                Err(e)
            }
        }
    }

    fn accept_admin(&mut self, caller: &Address) -> Result<(), TimelockError> {
        if self.pending_admin.as_ref() != Some(caller) {
            return Err(TimelockError::NotPendingAdmin {
                caller: caller.clone(),
            });
        }
        self.admin = caller.clone();
        self.pending_admin = None;
        info!(admin = %caller, "timelock admin accepted");
        Ok(())
    }
}

fn check_delay(delay: u64) -> Result<(), TimelockError> {
    if !TimelockConfig::delay_in_bounds(delay) {
        return Err(TimelockError::InvalidDelay {
            delay,
            min: MINIMUM_DELAY,
            max: MAXIMUM_DELAY,
        });
    }
    Ok(())
}

impl Timelock {
    pub fn save_to_store(&self, store: &dyn TimelockStore) -> Result<(), TimelockError> {
        let settings = TimelockSettings {
            address: self.address.clone(),
            admin: self.admin.clone(),
            pending_admin: self.pending_admin.clone(),
            admin_initialized: self.admin_initialized,
            delay: self.delay,
        };
        store.put_meta(SETTINGS_KEY, &encode(&settings)?)?;

        for (hash, _) in store.iter_queued()? {
            if !self.queued.contains_key(&hash) {
                store.delete_queued(&hash)?;
            }
        }
        for (hash, call) in &self.queued {
            store.put_queued(hash, &encode(call)?)?;
        }
        Ok(())
    }

    pub fn load_from_store(store: &dyn TimelockStore) -> Result<Self, TimelockError> {
        let settings: TimelockSettings =
            decode_required(SETTINGS_KEY, store.get_meta(SETTINGS_KEY)?)?;

        let mut queued = BTreeMap::new();
        for (hash, bytes) in store.iter_queued()? {
            let call: TimelockCall = decode(&format!("queued {hash}"), &bytes)?;
            queued.insert(hash, call);
        }

        Ok(Self {
            address: settings.address,
            admin: settings.admin,
            pending_admin: settings.pending_admin,
            admin_initialized: settings.admin_initialized,
            delay: settings.delay,
            queued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::encode_args;
    use dexf_nullables::NullStore;
    use dexf_types::{ErrorKind, DAY_SECS};

    const NOW: u64 = 1_700_000_000;

    fn admin() -> Address {
        Address::from_index(0xad)
    }

    fn timelock_address() -> Address {
        Address::from_index(0x71)
    }

    fn target() -> Address {
        Address::from_index(0xee)
    }

    fn timelock() -> Timelock {
        Timelock::new(timelock_address(), admin(), &TimelockConfig::default()).unwrap()
    }

    #[derive(Default)]
    struct RecordingRouter {
        calls: Vec<(Address, Address, String, Vec<u8>)>,
        fail: bool,
    }

    impl CallRouter for RecordingRouter {
        fn call(
            &mut self,
            caller: &Address,
            target: &Address,
            _value: u128,
            signature: &str,
            data: &[u8],
        ) -> Result<Vec<u8>, CallError> {
            if self.fail {
                return Err(CallError::Reverted("boom".into()));
            }
            self.calls
                .push((caller.clone(), target.clone(), signature.to_string(), data.to_vec()));
            Ok(vec![1])
        }
    }

    fn release_call(eta: u64) -> TimelockCall {
        TimelockCall::new(
            target(),
            0,
            "setDailyReleaseAmountTreasury(uint256)",
            encode_args(&100u128).unwrap(),
            Timestamp::new(eta),
        )
    }

    #[test]
    fn test_new_rejects_delay_out_of_bounds() {
        for delay in [DAY_SECS, 31 * DAY_SECS] {
            let config = TimelockConfig { delay_secs: delay };
            assert!(matches!(
                Timelock::new(timelock_address(), admin(), &config),
                Err(TimelockError::InvalidDelay { .. })
            ));
        }
    }

    #[test]
    fn test_grace_period_is_fixed() {
        for delay in [MINIMUM_DELAY, MAXIMUM_DELAY] {
            let tl = Timelock::new(
                timelock_address(),
                admin(),
                &TimelockConfig { delay_secs: delay },
            )
            .unwrap();
            assert_eq!(tl.delay(), delay);
            assert_eq!(tl.grace_period(), 14 * DAY_SECS);
        }
    }

    #[test]
    fn test_queue_requires_admin() {
        let mut tl = timelock();
        let err = tl
            .queue_transaction(&target(), release_call(NOW + 4 * DAY_SECS), Timestamp::new(NOW))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_queue_eta_must_satisfy_delay() {
        let mut tl = timelock();
        let now = Timestamp::new(NOW);
        let delay = tl.delay();

        assert!(matches!(
            tl.queue_transaction(&admin(), release_call(NOW + delay - 1), now),
            Err(TimelockError::EtaTooEarly { .. })
        ));
        let hash = tl
            .queue_transaction(&admin(), release_call(NOW + delay), now)
            .unwrap();
        assert!(tl.is_queued(&hash));
    }

    #[test]
    fn test_queue_is_idempotent() {
        let mut tl = timelock();
        let now = Timestamp::new(NOW);
        let call = release_call(NOW + 5 * DAY_SECS);
        let a = tl.queue_transaction(&admin(), call.clone(), now).unwrap();
        let b = tl.queue_transaction(&admin(), call, now).unwrap();
        assert_eq!(a, b);
        assert_eq!(tl.queued().count(), 1);
    }

    #[test]
    fn test_execute_window() {
        let mut tl = timelock();
        let mut router = RecordingRouter::default();
        let eta = NOW + 3 * DAY_SECS;
        let call = release_call(eta);
        tl.queue_transaction(&admin(), call.clone(), Timestamp::new(NOW))
            .unwrap();

        let early = tl
            .execute_transaction(&admin(), &call, Timestamp::new(eta - 1), &mut router)
            .unwrap_err();
        assert!(matches!(early, TimelockError::NotSurpassed { .. }));
        assert!(early.to_string().contains("hasn't surpassed time lock"));

        let late = tl
            .execute_transaction(
                &admin(),
                &call,
                Timestamp::new(eta + GRACE_PERIOD + 1),
                &mut router,
            )
            .unwrap_err();
        assert!(matches!(late, TimelockError::Stale { .. }));
        assert_eq!(late.kind(), ErrorKind::TemporalPrecondition);

        // Last second of the window still counts.
        tl.execute_transaction(&admin(), &call, Timestamp::new(eta + GRACE_PERIOD), &mut router)
            .unwrap();
        assert_eq!(router.calls.len(), 1);
        assert_eq!(router.calls[0].0, timelock_address());
        assert_eq!(router.calls[0].2, "setDailyReleaseAmountTreasury(uint256)");

        assert!(matches!(
            tl.execute_transaction(&admin(), &call, Timestamp::new(eta), &mut router),
            Err(TimelockError::NotQueued(_))
        ));
        assert_eq!(router.calls.len(), 1);
    }

    #[test]
    fn test_failed_execution_stays_queued() {
        let mut tl = timelock();
        let mut router = RecordingRouter {
            fail: true,
            ..RecordingRouter::default()
        };
        let eta = NOW + 3 * DAY_SECS;
        let call = release_call(eta);
        let hash = tl
            .queue_transaction(&admin(), call.clone(), Timestamp::new(NOW))
            .unwrap();

        let err = tl
            .execute_transaction(&admin(), &call, Timestamp::new(eta), &mut router)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::External);
        assert!(tl.is_queued(&hash));

        router.fail = false;
        tl.execute_transaction(&admin(), &call, Timestamp::new(eta), &mut router)
            .unwrap();
        assert!(!tl.is_queued(&hash));
    }

    #[test]
    fn test_cancel_transaction() {
        let mut tl = timelock();
        let call = release_call(NOW + 3 * DAY_SECS);
        let hash = tl
            .queue_transaction(&admin(), call.clone(), Timestamp::new(NOW))
            .unwrap();
        assert!(tl.cancel_transaction(&target(), &call).is_err());
        tl.cancel_transaction(&admin(), &call).unwrap();
        assert!(!tl.is_queued(&hash));
    }

    #[test]
    fn test_set_delay_only_through_queue() {
        let mut tl = timelock();
        let mut router = RecordingRouter::default();
        assert!(matches!(
            tl.set_delay(&admin(), 5 * DAY_SECS),
            Err(TimelockError::NotSelf { .. })
        ));

        let eta = NOW + 3 * DAY_SECS;
        let call = TimelockCall::new(
            timelock_address(),
            0,
            "setDelay(uint256)",
            encode_args(&u128::from(5 * DAY_SECS)).unwrap(),
            Timestamp::new(eta),
        );
        tl.queue_transaction(&admin(), call.clone(), Timestamp::new(NOW))
            .unwrap();
        tl.execute_transaction(&admin(), &call, Timestamp::new(eta), &mut router)
            .unwrap();
        assert_eq!(tl.delay(), 5 * DAY_SECS);
        assert!(router.calls.is_empty());
    }

    #[test]
    fn test_admin_handover() {
        let mut tl = timelock();
        let mut router = RecordingRouter::default();
        let governor = Address::from_index(0x60);

        tl.set_pending_admin(&admin(), governor.clone()).unwrap();
        // The direct route is one-off.
        assert!(matches!(
            tl.set_pending_admin(&admin(), target()),
            Err(TimelockError::NotSelf { .. })
        ));
        assert!(matches!(
            tl.accept_admin(&target()),
            Err(TimelockError::NotPendingAdmin { .. })
        ));
        tl.accept_admin(&governor).unwrap();
        assert_eq!(tl.admin(), &governor);
        assert!(tl.pending_admin().is_none());

        // From now on the pending admin moves only through a queued self-call.
        let eta = NOW + 3 * DAY_SECS;
        let call = TimelockCall::new(
            timelock_address(),
            0,
            "setPendingAdmin(address)",
            encode_args(&admin()).unwrap(),
            Timestamp::new(eta),
        );
        assert!(tl
            .queue_transaction(&admin(), call.clone(), Timestamp::new(NOW))
            .is_err());
        tl.queue_transaction(&governor, call.clone(), Timestamp::new(NOW))
            .unwrap();
        tl.execute_transaction(&governor, &call, Timestamp::new(eta), &mut router)
            .unwrap();
        assert_eq!(tl.pending_admin(), Some(&admin()));
    }

    #[test]
    fn test_unknown_self_call_rejected() {
        let mut tl = timelock();
        let mut router = RecordingRouter::default();
        let eta = NOW + 3 * DAY_SECS;
        let call = TimelockCall::new(timelock_address(), 0, "selfdestruct()", vec![], Timestamp::new(eta));
        tl.queue_transaction(&admin(), call.clone(), Timestamp::new(NOW))
            .unwrap();
        assert!(matches!(
            tl.execute_transaction(&admin(), &call, Timestamp::new(eta), &mut router),
            Err(TimelockError::UnknownSelfCall(_))
        ));
    }

    #[test]
    fn test_store_roundtrip() {
        let mut tl = timelock();
        let store = NullStore::new();
        let a = release_call(NOW + 3 * DAY_SECS);
        let b = release_call(NOW + 4 * DAY_SECS);
        let ha = tl.queue_transaction(&admin(), a.clone(), Timestamp::new(NOW)).unwrap();
        let hb = tl.queue_transaction(&admin(), b, Timestamp::new(NOW)).unwrap();
        tl.save_to_store(&store).unwrap();

        tl.cancel_transaction(&admin(), &a).unwrap();
        tl.save_to_store(&store).unwrap();

        let restored = Timelock::load_from_store(&store).unwrap();
        assert!(!restored.is_queued(&ha));
        assert!(restored.is_queued(&hb));
        assert_eq!(restored.admin(), &admin());
        assert_eq!(restored.delay(), tl.delay());
    }
}
