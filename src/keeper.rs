use std::ops::ControlFlow;

use near_sdk::{near, AccountId, BlockHeight, IntoStorageKey};

use crate::bank::EscrowLedger;
use crate::coins::Coins;
use crate::errors::HtlcError;
use crate::events::HtlcEvent;
use crate::hashlock::{derive_hash_lock, hash_lock_to_hex, HashLock};
use crate::htlc::{Htlc, HtlcState};
use crate::queue::ExpirationQueue;
use crate::store::HtlcStore;

/// Most queue entries one call may sweep. Each expiry writes one log line and
/// a receipt may carry at most 100, so this leaves room for the call's own.
pub const MAX_EXPIRIES_PER_SWEEP: u32 = 40;

/// The HTLC state machine: records, their expiration index, and the
/// transitions between them. Funds move only through the [`EscrowLedger`]
/// passed into each operation, and every check runs before anything is
/// written.
#[near(serializers = [borsh])]
pub struct Keeper {
    store: HtlcStore,
    queue: ExpirationQueue,
}

impl Keeper {
    pub fn new<S, B, H>(htlcs_prefix: S, buckets_prefix: B, heights_prefix: H) -> Self
    where
        S: IntoStorageKey,
        B: IntoStorageKey,
        H: IntoStorageKey,
    {
        Self {
            store: HtlcStore::new(htlcs_prefix),
            queue: ExpirationQueue::new(buckets_prefix, heights_prefix),
        }
    }

    pub fn get_htlc(&self, hash_lock: &HashLock) -> Option<Htlc> {
        self.store.get(hash_lock)
    }

    pub fn has_htlc(&self, hash_lock: &HashLock) -> bool {
        self.store.has(hash_lock)
    }

    pub fn is_queued(&self, height: BlockHeight, hash_lock: &HashLock) -> bool {
        self.queue.contains(height, hash_lock)
    }

    /// Writes pending collection changes so `env::storage_usage` sees them.
    pub fn flush(&mut self) {
        self.store.flush();
        self.queue.flush();
    }

    /// Locks `amount` from `sender` under `hash_lock` until `expiration_height`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_htlc<L: EscrowLedger>(
        &mut self,
        ledger: &mut L,
        sender: AccountId,
        to: AccountId,
        receiver_on_other_chain: String,
        amount: Coins,
        hash_lock: HashLock,
        timestamp: u64,
        expiration_height: BlockHeight,
        current_height: BlockHeight,
    ) -> Result<Htlc, HtlcError> {
        if self.store.has(&hash_lock) {
            return Err(HtlcError::AlreadyExists(hash_lock_to_hex(&hash_lock)));
        }

        let htlc = Htlc::new(
            sender,
            to,
            receiver_on_other_chain,
            amount,
            timestamp,
            expiration_height,
        );
        htlc.validate()?;
        if expiration_height <= current_height {
            return Err(HtlcError::InvalidExpirationHeight {
                expiration_height,
                current_height,
            });
        }

        ledger.transfer_to_module(&htlc.sender, &htlc.amount)?;

        self.store.set(hash_lock, htlc.clone());
        self.queue.add(expiration_height, hash_lock);

        Ok(htlc)
    }

    /// Loads an HTLC that a secret could still open at `current_height`. A
    /// record past its expiration height that the sweep has not reached yet
    /// is expired here first.
    pub fn claimable_htlc(
        &mut self,
        hash_lock: &HashLock,
        current_height: BlockHeight,
    ) -> Result<Htlc, HtlcError> {
        let htlc = self.load_at(hash_lock, current_height)?;
        if htlc.state != HtlcState::Open {
            return Err(HtlcError::NotOpen(hash_lock_to_hex(hash_lock)));
        }
        Ok(htlc)
    }

    /// Releases the funds to the receiver if `secret` opens the hash lock.
    pub fn claim_htlc<L: EscrowLedger>(
        &mut self,
        ledger: &mut L,
        hash_lock: &HashLock,
        secret: &[u8],
        current_height: BlockHeight,
    ) -> Result<Htlc, HtlcError> {
        let mut htlc = self.claimable_htlc(hash_lock, current_height)?;

        if derive_hash_lock(secret, htlc.timestamp) != *hash_lock {
            return Err(HtlcError::InvalidSecret(hex::encode(secret)));
        }

        ledger.transfer_from_module(&htlc.to, &htlc.amount)?;

        htlc.secret = secret.to_vec();
        htlc.state = HtlcState::Completed;
        self.store.set(*hash_lock, htlc.clone());
        self.queue.delete(htlc.expiration_height, hash_lock);

        Ok(htlc)
    }

    /// Returns the funds of an expired HTLC to its sender.
    pub fn refund_htlc<L: EscrowLedger>(
        &mut self,
        ledger: &mut L,
        hash_lock: &HashLock,
        current_height: BlockHeight,
    ) -> Result<Htlc, HtlcError> {
        let mut htlc = self.load_at(hash_lock, current_height)?;

        if htlc.state != HtlcState::Expired {
            return Err(HtlcError::NotExpired(hash_lock_to_hex(hash_lock)));
        }

        ledger.transfer_from_module(&htlc.sender, &htlc.amount)?;

        htlc.state = HtlcState::Refunded;
        self.store.set(*hash_lock, htlc.clone());

        Ok(htlc)
    }

    /// Expires every HTLC filed at `height`. Entries are removed as they are
    /// processed, so a second call for the same height does nothing.
    pub fn on_block(&mut self, height: BlockHeight) -> u32 {
        let (_, expired) = self.sweep_height(height, u32::MAX);
        expired
    }

    /// Processes pending heights up to `current_height`, lowest first, until
    /// `limit` queue entries have been visited. Whatever is left stays queued
    /// for the next call.
    pub fn expire_through(&mut self, current_height: BlockHeight, limit: u32) -> u32 {
        let mut budget = limit;
        let mut expired = 0;
        while budget > 0 {
            let Some(height) = self.queue.peek_due_height(current_height) else {
                break;
            };
            let (visited, count) = self.sweep_height(height, budget);
            expired += count;
            if visited < budget {
                // bucket drained
                self.queue.pop_due_height(current_height);
            }
            budget -= visited;
        }
        expired
    }

    pub fn iterate_htlcs<F>(&self, op: F)
    where
        F: FnMut(&HashLock, &Htlc) -> ControlFlow<()>,
    {
        self.store.iterate(op);
    }

    /// Visits the records filed in the expiration queue at `height`.
    pub fn iterate_expired_queue_by_height<F>(&self, height: BlockHeight, mut op: F)
    where
        F: FnMut(&HashLock, &Htlc) -> ControlFlow<()>,
    {
        for hash_lock in self.queue.hash_locks_at(height) {
            let Some(htlc) = self.store.get(&hash_lock) else {
                continue;
            };
            if op(&hash_lock, &htlc).is_break() {
                break;
            }
        }
    }

    /// Writes a record and its queue entry without touching any balance.
    /// Genesis import is the only caller; it restores the escrow itself.
    pub(crate) fn restore_htlc(&mut self, hash_lock: HashLock, htlc: Htlc) {
        self.queue.add(htlc.expiration_height, hash_lock);
        self.store.set(hash_lock, htlc);
    }

    /// Visits at most `limit` entries filed at `height`, dropping each from
    /// the queue and expiring the open ones. Returns (visited, expired).
    fn sweep_height(&mut self, height: BlockHeight, limit: u32) -> (u32, u32) {
        let mut due = Vec::new();
        self.iterate_expired_queue_by_height(height, |hash_lock, htlc| {
            due.push((*hash_lock, htlc.clone()));
            if due.len() as u32 >= limit {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        let visited = due.len() as u32;
        let mut expired = 0;
        for (hash_lock, mut htlc) in due {
            self.queue.delete(height, &hash_lock);
            if htlc.state == HtlcState::Open {
                self.expire(&hash_lock, &mut htlc);
                expired += 1;
            }
        }
        (visited, expired)
    }

    fn load_at(
        &mut self,
        hash_lock: &HashLock,
        current_height: BlockHeight,
    ) -> Result<Htlc, HtlcError> {
        let mut htlc = self
            .store
            .get(hash_lock)
            .ok_or_else(|| HtlcError::UnknownHtlc(hash_lock_to_hex(hash_lock)))?;

        if htlc.state == HtlcState::Open && htlc.expiration_height <= current_height {
            self.queue.delete(htlc.expiration_height, hash_lock);
            self.expire(hash_lock, &mut htlc);
        }
        Ok(htlc)
    }

    fn expire(&mut self, hash_lock: &HashLock, htlc: &mut Htlc) {
        htlc.state = HtlcState::Expired;
        self.store.set(*hash_lock, htlc.clone());
        HtlcEvent::Expired {
            hash_lock: *hash_lock,
        }
        .emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Bank, BankError, ESCROW_ACCOUNT};
    use crate::coins::{Coin, NATIVE_DENOM};
    use near_sdk::test_utils::{accounts, get_logs, VMContextBuilder};
    use near_sdk::testing_env;

    const SECRET: &[u8] = b"swap-secret";

    struct Setup {
        keeper: Keeper,
        bank: Bank,
        sender: AccountId,
        receiver: AccountId,
    }

    fn setup() -> Setup {
        testing_env!(VMContextBuilder::new().block_height(1).build());
        let sender = accounts(0);
        let receiver = accounts(1);
        let mut bank = Bank::new(b"b".to_vec(), b"m".to_vec());
        bank.credit(&sender, NATIVE_DENOM, 1_000).unwrap();
        Setup {
            keeper: Keeper::new(b"h".to_vec(), b"q".to_vec(), b"p".to_vec()),
            bank,
            sender,
            receiver,
        }
    }

    fn hundred() -> Coins {
        Coins::new(vec![Coin::native(100)])
    }

    fn create(
        s: &mut Setup,
        hash_lock: HashLock,
        expiration_height: u64,
    ) -> Result<Htlc, HtlcError> {
        s.keeper.create_htlc(
            &mut s.bank,
            s.sender.clone(),
            s.receiver.clone(),
            "bc1qreceiver".to_string(),
            hundred(),
            hash_lock,
            0,
            expiration_height,
            1,
        )
    }

    #[test]
    fn create_escrows_and_indexes() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);

        let htlc = create(&mut s, hash_lock, 50).unwrap();

        assert_eq!(htlc.state, HtlcState::Open);
        assert!(htlc.secret.is_empty());
        assert_eq!(s.keeper.get_htlc(&hash_lock), Some(htlc));
        assert!(s.keeper.is_queued(50, &hash_lock));
        assert_eq!(s.bank.balance_of(&s.sender, NATIVE_DENOM), 900);
        assert_eq!(s.bank.escrowed(NATIVE_DENOM), 100);
    }

    #[test]
    fn create_without_funds_leaves_no_record() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        let err = s
            .keeper
            .create_htlc(
                &mut s.bank,
                s.receiver.clone(),
                s.sender.clone(),
                String::new(),
                hundred(),
                hash_lock,
                0,
                50,
                1,
            )
            .unwrap_err();

        assert!(matches!(err, HtlcError::Bank(_)));
        assert!(!s.keeper.has_htlc(&hash_lock));
        assert!(!s.keeper.is_queued(50, &hash_lock));
    }

    #[test]
    fn create_rejects_past_expiration() {
        let mut s = setup();
        let err = s
            .keeper
            .create_htlc(
                &mut s.bank,
                s.sender.clone(),
                s.receiver.clone(),
                String::new(),
                hundred(),
                [3; 32],
                0,
                10,
                10,
            )
            .unwrap_err();
        assert!(matches!(err, HtlcError::InvalidExpirationHeight { .. }));
        assert_eq!(s.bank.escrowed(NATIVE_DENOM), 0);
    }

    #[test]
    fn duplicate_hash_lock_is_rejected_in_every_state() {
        let mut s = setup();

        let open = derive_hash_lock(b"open", 0);
        create(&mut s, open, 50).unwrap();
        assert!(matches!(create(&mut s, open, 60), Err(HtlcError::AlreadyExists(_))));

        let completed = derive_hash_lock(b"completed", 0);
        create(&mut s, completed, 50).unwrap();
        s.keeper.claim_htlc(&mut s.bank, &completed, b"completed", 1).unwrap();
        assert!(matches!(create(&mut s, completed, 60), Err(HtlcError::AlreadyExists(_))));

        let refunded = derive_hash_lock(b"refunded", 0);
        create(&mut s, refunded, 40).unwrap();
        s.keeper.on_block(40);
        assert!(matches!(create(&mut s, refunded, 60), Err(HtlcError::AlreadyExists(_))));
        s.keeper.refund_htlc(&mut s.bank, &refunded, 40).unwrap();
        assert!(matches!(create(&mut s, refunded, 60), Err(HtlcError::AlreadyExists(_))));

        assert_eq!(s.bank.balance_of(&s.sender, NATIVE_DENOM), 800);
    }

    #[test]
    fn claim_with_secret_completes_and_pays_receiver() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        create(&mut s, hash_lock, 50).unwrap();

        let htlc = s.keeper.claim_htlc(&mut s.bank, &hash_lock, SECRET, 10).unwrap();

        assert_eq!(htlc.state, HtlcState::Completed);
        assert_eq!(htlc.secret, SECRET.to_vec());
        assert_eq!(s.bank.balance_of(&s.receiver, NATIVE_DENOM), 100);
        assert_eq!(s.bank.escrowed(NATIVE_DENOM), 0);
        assert!(!s.keeper.is_queued(50, &hash_lock));

        assert!(matches!(
            s.keeper.claim_htlc(&mut s.bank, &hash_lock, SECRET, 10),
            Err(HtlcError::NotOpen(_))
        ));
        // the sweep at the old expiration height must not touch it
        assert_eq!(s.keeper.on_block(50), 0);
        assert_eq!(
            s.keeper.get_htlc(&hash_lock).map(|h| h.state),
            Some(HtlcState::Completed)
        );
    }

    #[test]
    fn claim_with_salted_hash_lock() {
        let mut s = setup();
        let timestamp = 1_600_000_000;
        let hash_lock = derive_hash_lock(SECRET, timestamp);
        s.keeper
            .create_htlc(
                &mut s.bank,
                s.sender.clone(),
                s.receiver.clone(),
                String::new(),
                hundred(),
                hash_lock,
                timestamp,
                50,
                1,
            )
            .unwrap();

        assert!(matches!(
            s.keeper.claim_htlc(&mut s.bank, &hash_lock, &derive_hash_lock(SECRET, 0), 1),
            Err(HtlcError::InvalidSecret(_))
        ));
        s.keeper.claim_htlc(&mut s.bank, &hash_lock, SECRET, 1).unwrap();
    }

    #[test]
    fn claim_with_wrong_secret_changes_nothing() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        create(&mut s, hash_lock, 50).unwrap();

        let err = s
            .keeper
            .claim_htlc(&mut s.bank, &hash_lock, b"not-the-secret", 1)
            .unwrap_err();

        assert!(matches!(err, HtlcError::InvalidSecret(_)));
        let htlc = s.keeper.get_htlc(&hash_lock).unwrap();
        assert_eq!(htlc.state, HtlcState::Open);
        assert!(htlc.secret.is_empty());
        assert!(s.keeper.is_queued(50, &hash_lock));
        assert_eq!(s.bank.escrowed(NATIVE_DENOM), 100);
    }

    #[test]
    fn unknown_hash_lock_is_reported_first() {
        let mut s = setup();
        assert!(matches!(
            s.keeper.claim_htlc(&mut s.bank, &[9; 32], SECRET, 1),
            Err(HtlcError::UnknownHtlc(_))
        ));
        assert!(matches!(
            s.keeper.refund_htlc(&mut s.bank, &[9; 32], 1),
            Err(HtlcError::UnknownHtlc(_))
        ));
    }

    #[test]
    fn refund_before_expiration_is_rejected() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        create(&mut s, hash_lock, 50).unwrap();

        assert!(matches!(
            s.keeper.refund_htlc(&mut s.bank, &hash_lock, 49),
            Err(HtlcError::NotExpired(_))
        ));
        assert_eq!(s.bank.balance_of(&s.sender, NATIVE_DENOM), 900);
    }

    #[test]
    fn expiry_then_refund_returns_funds() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        create(&mut s, hash_lock, 50).unwrap();

        assert_eq!(s.keeper.on_block(49), 0);
        assert_eq!(s.keeper.on_block(50), 1);
        assert_eq!(
            s.keeper.get_htlc(&hash_lock).map(|h| h.state),
            Some(HtlcState::Expired)
        );
        assert!(!s.keeper.is_queued(50, &hash_lock));
        assert_eq!(get_logs().len(), 1);
        assert!(get_logs()[0].contains("htlc_expired"));

        // idempotent
        assert_eq!(s.keeper.on_block(50), 0);

        assert!(matches!(
            s.keeper.claim_htlc(&mut s.bank, &hash_lock, SECRET, 50),
            Err(HtlcError::NotOpen(_))
        ));

        let htlc = s.keeper.refund_htlc(&mut s.bank, &hash_lock, 50).unwrap();
        assert_eq!(htlc.state, HtlcState::Refunded);
        assert_eq!(s.bank.balance_of(&s.sender, NATIVE_DENOM), 1_000);

        assert!(matches!(
            s.keeper.refund_htlc(&mut s.bank, &hash_lock, 51),
            Err(HtlcError::NotExpired(_))
        ));
        assert!(matches!(
            s.keeper.claim_htlc(&mut s.bank, &hash_lock, SECRET, 51),
            Err(HtlcError::NotOpen(_))
        ));
    }

    #[test]
    fn due_record_expires_on_access_before_the_sweep_reaches_it() {
        let mut s = setup();
        let claimed = derive_hash_lock(b"claimed", 0);
        let refunded = derive_hash_lock(b"refunded", 0);
        create(&mut s, claimed, 50).unwrap();
        create(&mut s, refunded, 50).unwrap();

        assert!(matches!(
            s.keeper.claim_htlc(&mut s.bank, &claimed, b"claimed", 50),
            Err(HtlcError::NotOpen(_))
        ));
        assert_eq!(
            s.keeper.get_htlc(&claimed).map(|h| h.state),
            Some(HtlcState::Expired)
        );

        let htlc = s.keeper.refund_htlc(&mut s.bank, &refunded, 60).unwrap();
        assert_eq!(htlc.state, HtlcState::Refunded);
        assert!(!s.keeper.is_queued(50, &refunded));

        // nothing left for the sweep at 50
        assert_eq!(s.keeper.expire_through(60, MAX_EXPIRIES_PER_SWEEP), 0);
    }

    #[test]
    fn expire_through_processes_skipped_heights_in_order() {
        let mut s = setup();
        let early = derive_hash_lock(b"early", 0);
        let late = derive_hash_lock(b"late", 0);
        let future = derive_hash_lock(b"future", 0);
        create(&mut s, late, 70).unwrap();
        create(&mut s, early, 30).unwrap();
        create(&mut s, future, 500).unwrap();

        assert_eq!(s.keeper.expire_through(100, MAX_EXPIRIES_PER_SWEEP), 2);
        assert_eq!(s.keeper.get_htlc(&early).map(|h| h.state), Some(HtlcState::Expired));
        assert_eq!(s.keeper.get_htlc(&late).map(|h| h.state), Some(HtlcState::Expired));
        assert_eq!(s.keeper.get_htlc(&future).map(|h| h.state), Some(HtlcState::Open));
        assert_eq!(s.keeper.expire_through(100, MAX_EXPIRIES_PER_SWEEP), 0);
    }

    #[test]
    fn sweep_is_bounded_and_resumes_where_it_stopped() {
        let mut s = setup();
        s.bank.credit(&s.sender, NATIVE_DENOM, 100 * 60).unwrap();
        let hash_locks: Vec<HashLock> = (0..60u32)
            .map(|i| derive_hash_lock(&i.to_be_bytes(), 0))
            .collect();
        for hash_lock in &hash_locks[..55] {
            create(&mut s, *hash_lock, 50).unwrap();
        }
        for hash_lock in &hash_locks[55..] {
            create(&mut s, *hash_lock, 52).unwrap();
        }

        assert_eq!(s.keeper.expire_through(60, MAX_EXPIRIES_PER_SWEEP), 40);
        assert_eq!(get_logs().len(), 40);
        assert_eq!(
            s.keeper.get_htlc(&hash_locks[39]).map(|h| h.state),
            Some(HtlcState::Expired)
        );
        assert_eq!(
            s.keeper.get_htlc(&hash_locks[40]).map(|h| h.state),
            Some(HtlcState::Open)
        );
        assert!(s.keeper.is_queued(50, &hash_locks[40]));

        assert_eq!(s.keeper.expire_through(60, MAX_EXPIRIES_PER_SWEEP), 20);
        assert_eq!(s.keeper.expire_through(60, MAX_EXPIRIES_PER_SWEEP), 0);
        for hash_lock in &hash_locks {
            assert_eq!(
                s.keeper.get_htlc(hash_lock).map(|h| h.state),
                Some(HtlcState::Expired)
            );
        }
    }

    #[test]
    fn sweep_stops_exactly_at_a_drained_bucket() {
        let mut s = setup();
        let first = derive_hash_lock(b"first", 0);
        let second = derive_hash_lock(b"second", 0);
        create(&mut s, first, 30).unwrap();
        create(&mut s, second, 40).unwrap();

        assert_eq!(s.keeper.expire_through(50, 1), 1);
        assert_eq!(s.keeper.expire_through(50, 1), 1);
        assert_eq!(
            s.keeper.get_htlc(&second).map(|h| h.state),
            Some(HtlcState::Expired)
        );
        assert_eq!(s.keeper.expire_through(50, 1), 0);
    }

    struct FrozenLedger;

    impl EscrowLedger for FrozenLedger {
        fn transfer_to_module(&mut self, from: &AccountId, _: &Coins) -> Result<(), BankError> {
            Err(BankError::InsufficientFunds {
                holder: from.to_string(),
                denom: NATIVE_DENOM.to_string(),
                available: 0,
                required: 100,
            })
        }

        fn transfer_from_module(&mut self, _: &AccountId, _: &Coins) -> Result<(), BankError> {
            Err(BankError::InsufficientFunds {
                holder: ESCROW_ACCOUNT.to_string(),
                denom: NATIVE_DENOM.to_string(),
                available: 0,
                required: 100,
            })
        }
    }

    #[test]
    fn failed_claim_payout_leaves_the_record_open() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        create(&mut s, hash_lock, 50).unwrap();

        let err = s
            .keeper
            .claim_htlc(&mut FrozenLedger, &hash_lock, SECRET, 10)
            .unwrap_err();

        assert!(matches!(err, HtlcError::Bank(BankError::InsufficientFunds { .. })));
        let htlc = s.keeper.get_htlc(&hash_lock).unwrap();
        assert_eq!(htlc.state, HtlcState::Open);
        assert!(htlc.secret.is_empty());
        assert!(s.keeper.is_queued(50, &hash_lock));
        assert_eq!(s.bank.escrowed(NATIVE_DENOM), 100);
    }

    #[test]
    fn failed_refund_payout_leaves_the_record_expired() {
        let mut s = setup();
        let hash_lock = derive_hash_lock(SECRET, 0);
        create(&mut s, hash_lock, 50).unwrap();
        s.keeper.on_block(50);

        let err = s
            .keeper
            .refund_htlc(&mut FrozenLedger, &hash_lock, 50)
            .unwrap_err();

        assert!(matches!(err, HtlcError::Bank(_)));
        assert_eq!(
            s.keeper.get_htlc(&hash_lock).map(|h| h.state),
            Some(HtlcState::Expired)
        );
        assert_eq!(s.bank.escrowed(NATIVE_DENOM), 100);

        // the real ledger still pays out
        s.keeper.refund_htlc(&mut s.bank, &hash_lock, 50).unwrap();
        assert_eq!(s.bank.balance_of(&s.sender, NATIVE_DENOM), 1_000);
    }

    #[test]
    fn queue_iteration_stops_early() {
        let mut s = setup();
        for secret in [b"a", b"b", b"c"] {
            create(&mut s, derive_hash_lock(secret, 0), 60).unwrap();
        }

        let mut seen = 0;
        s.keeper.iterate_expired_queue_by_height(60, |_, htlc| {
            assert_eq!(htlc.expiration_height, 60);
            seen += 1;
            ControlFlow::Break(())
        });
        assert_eq!(seen, 1);
    }
}
