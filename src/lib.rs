use near_sdk::json_types::U128;
use near_sdk::store::LookupMap;
use near_sdk::{
    env, ext_contract, log, near, require, serde_json, AccountId, BlockHeight, BorshStorageKey,
    FunctionError, NearToken, Promise, PromiseError, PromiseOrValue, StorageUsage,
};

pub mod bank;
pub mod coins;
pub mod config;
pub mod errors;
pub mod events;
pub mod genesis;
pub mod hashlock;
pub mod htlc;
pub mod keeper;
mod queue;
mod store;

use bank::Bank;
pub use coins::{Coin, Coins, NATIVE_DENOM};
pub use config::HtlcConfig;
pub use errors::HtlcError;
use events::HtlcEvent;
pub use genesis::GenesisState;
use hashlock::parse_hash_lock;
pub use htlc::{Htlc, HtlcState};
use keeper::{Keeper, MAX_EXPIRIES_PER_SWEEP};

use crate::coins::{denom_asset, Asset};

pub const MAX_SECRET_LENGTH: usize = 128;

/// Bytes charged at creation on top of what is written then: the secret
/// stored by a claim, and one balance entry with 64-byte names for the
/// payout.
pub const CLAIM_STORAGE_RESERVE: StorageUsage = MAX_SECRET_LENGTH as StorageUsage + 200;

// External contract interfaces
#[ext_contract(ext_fungible_token)]
pub trait FungibleToken {
    fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
}

#[ext_contract(ext_self)]
pub trait SelfCallbacks {
    fn on_withdraw_settled(&mut self, account_id: AccountId, denom: String, amount: U128);
}

#[near]
#[derive(BorshStorageKey)]
enum StorageKey {
    Htlcs,
    ExpirationQueue,
    ExpirationHeights,
    Balances,
    Escrow,
    StorageDeposits,
}

/// `msg` of an `ft_transfer_call` that locks the transferred tokens in a new
/// HTLC instead of only crediting them.
#[near(serializers = [json])]
pub struct FtOnTransferMsg {
    pub to: AccountId,
    pub receiver_on_other_chain: Option<String>,
    pub hash_lock: String,
    pub timestamp: Option<u64>,
    pub time_lock: u64,
}

#[near(contract_state)]
pub struct Contract {
    pub owner_id: AccountId,
    pub config: HtlcConfig,
    keeper: Keeper,
    bank: Bank,
    // account -> yoctoNEAR prepaid for the storage its calls add
    storage_deposits: LookupMap<AccountId, u128>,
    exported_at: Option<BlockHeight>,
}

impl Default for Contract {
    fn default() -> Self {
        Self::build(env::predecessor_account_id(), HtlcConfig::default())
    }
}

impl Contract {
    fn build(owner_id: AccountId, config: HtlcConfig) -> Self {
        Self {
            owner_id,
            config,
            keeper: Keeper::new(
                StorageKey::Htlcs,
                StorageKey::ExpirationQueue,
                StorageKey::ExpirationHeights,
            ),
            bank: Bank::new(StorageKey::Balances, StorageKey::Escrow),
            storage_deposits: LookupMap::new(StorageKey::StorageDeposits),
            exported_at: None,
        }
    }

    /// Runs the block tick for due heights before the calling transaction
    /// touches any HTLC. A bounded number of entries is swept per call.
    fn tick(&mut self) -> u32 {
        if self.exported_at.is_some() {
            return 0;
        }
        self.keeper
            .expire_through(env::block_height(), MAX_EXPIRIES_PER_SWEEP)
    }

    fn ensure_live(&self) -> Result<(), HtlcError> {
        match self.exported_at {
            Some(exported_at) => Err(HtlcError::Halted { exported_at }),
            None => Ok(()),
        }
    }

    fn storage_balance(&self, account_id: &AccountId) -> u128 {
        self.storage_deposits.get(account_id).copied().unwrap_or(0)
    }

    fn storage_checkpoint(&mut self) -> StorageUsage {
        self.keeper.flush();
        self.bank.flush();
        self.storage_deposits.flush();
        env::storage_usage()
    }

    /// Takes the bytes written since `since`, plus `reserved`, out of the
    /// account's storage deposit.
    fn charge_storage(
        &mut self,
        account_id: &AccountId,
        since: StorageUsage,
        reserved: StorageUsage,
    ) -> Result<(), HtlcError> {
        let used = self.storage_checkpoint().saturating_sub(since) + reserved;
        if used == 0 {
            return Ok(());
        }

        let required = env::storage_byte_cost()
            .as_yoctonear()
            .saturating_mul(u128::from(used));
        let available = self.storage_balance(account_id);
        if available < required {
            return Err(HtlcError::InsufficientStorageDeposit {
                account: account_id.to_string(),
                required,
                available,
            });
        }
        self.storage_deposits
            .insert(account_id.clone(), available - required);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn lock(
        &mut self,
        sender: AccountId,
        to: AccountId,
        receiver_on_other_chain: Option<String>,
        amount: Coins,
        hash_lock: &str,
        timestamp: Option<u64>,
        time_lock: u64,
    ) -> Result<Htlc, HtlcError> {
        self.ensure_live()?;
        let hash_lock = parse_hash_lock(hash_lock)?;
        let current_height = env::block_height();
        let expiration_height = self.config.expiration_height(current_height, time_lock)?;

        let htlc = self.keeper.create_htlc(
            &mut self.bank,
            sender,
            to,
            receiver_on_other_chain.unwrap_or_default(),
            amount,
            hash_lock,
            timestamp.unwrap_or(0),
            expiration_height,
            current_height,
        )?;

        HtlcEvent::Created {
            sender: htlc.sender.clone(),
            to: htlc.to.clone(),
            receiver_on_other_chain: htlc.receiver_on_other_chain.clone(),
            amount: htlc.amount.clone(),
            hash_lock,
            expiration_height,
        }
        .emit();

        Ok(htlc)
    }
}

// Implement the contract structure
#[near]
impl Contract {
    #[init]
    pub fn new(
        owner_id: AccountId,
        config: Option<HtlcConfig>,
        genesis: Option<GenesisState>,
    ) -> Self {
        let config = config.unwrap_or_default();
        if let Err(e) = config.validate() {
            e.panic();
        }

        let mut contract = Self::build(owner_id, config);
        if let Some(genesis) = genesis {
            let pending = genesis.pending_htlcs.len();
            if let Err(e) = genesis::init_genesis(
                &mut contract.keeper,
                &mut contract.bank,
                genesis,
                env::block_height(),
            ) {
                env::panic_str(&format!("invalid genesis: {e}"));
            }
            log!("Imported {} pending HTLCs from genesis", pending);
        }
        contract
    }

    /// Locks `amount` of the caller's balance under `hash_lock` for
    /// `time_lock` blocks. Native NEAR attached to the call is credited to
    /// the caller first. The storage the record takes is paid from the
    /// caller's storage deposit.
    #[payable]
    #[handle_result]
    pub fn create_htlc(
        &mut self,
        to: AccountId,
        receiver_on_other_chain: Option<String>,
        amount: Coins,
        hash_lock: String,
        timestamp: Option<u64>,
        time_lock: u64,
    ) -> Result<Htlc, HtlcError> {
        self.ensure_live()?;
        self.tick();
        let since = self.storage_checkpoint();

        let sender = env::predecessor_account_id();
        let attached = env::attached_deposit().as_yoctonear();
        if attached > 0 {
            self.bank.credit(&sender, NATIVE_DENOM, attached)?;
        }

        let htlc = self.lock(
            sender.clone(),
            to,
            receiver_on_other_chain,
            amount,
            &hash_lock,
            timestamp,
            time_lock,
        )?;
        self.charge_storage(&sender, since, CLAIM_STORAGE_RESERVE)?;
        Ok(htlc)
    }

    /// Pays the HTLC out to its receiver. `secret` is hex encoded.
    #[handle_result]
    pub fn claim_htlc(&mut self, hash_lock: String, secret: String) -> Result<Htlc, HtlcError> {
        self.ensure_live()?;
        self.tick();

        let hash_lock = parse_hash_lock(&hash_lock)?;
        let current_height = env::block_height();
        self.keeper.claimable_htlc(&hash_lock, current_height)?;

        let secret = hex::decode(&secret)
            .map_err(|e| HtlcError::InvalidSecret(format!("{secret}: {e}")))?;
        if secret.is_empty() || secret.len() > MAX_SECRET_LENGTH {
            return Err(HtlcError::InvalidSecretLength(secret.len()));
        }

        let htlc = self
            .keeper
            .claim_htlc(&mut self.bank, &hash_lock, &secret, current_height)?;

        HtlcEvent::Claimed {
            claimer: env::predecessor_account_id(),
            hash_lock,
            secret,
        }
        .emit();

        Ok(htlc)
    }

    /// Returns the funds of an expired HTLC to its sender. Anyone may call it.
    #[handle_result]
    pub fn refund_htlc(&mut self, hash_lock: String) -> Result<Htlc, HtlcError> {
        self.ensure_live()?;
        self.tick();

        let hash_lock = parse_hash_lock(&hash_lock)?;
        let htlc = self
            .keeper
            .refund_htlc(&mut self.bank, &hash_lock, env::block_height())?;

        HtlcEvent::Refunded {
            caller: env::predecessor_account_id(),
            hash_lock,
        }
        .emit();

        Ok(htlc)
    }

    /// Expires HTLCs due at or below the current block height, up to the
    /// per-call sweep limit. Every state-changing method does this on its
    /// own; calling it makes the stored states visible to views sooner and
    /// works through a backlog.
    #[handle_result]
    pub fn begin_block(&mut self) -> Result<u32, HtlcError> {
        self.ensure_live()?;
        Ok(self.tick())
    }

    #[handle_result]
    pub fn get_htlc(&self, hash_lock: String) -> Result<Htlc, HtlcError> {
        let hash_lock = parse_hash_lock(&hash_lock)?;
        self.keeper
            .get_htlc(&hash_lock)
            .ok_or_else(|| HtlcError::UnknownHtlc(hex::encode(hash_lock)))
    }

    /// Exports the pending HTLCs, refunding the expired ones, and halts the
    /// contract: the exported records now live on the importing side. Free
    /// balances stay withdrawable. Owner only.
    #[handle_result]
    pub fn export_genesis(&mut self) -> Result<GenesisState, HtlcError> {
        require!(
            env::predecessor_account_id() == self.owner_id,
            "Only the owner can export genesis"
        );
        self.ensure_live()?;
        self.tick();

        let height = env::block_height();
        let state = genesis::export_genesis(&mut self.keeper, &mut self.bank, height)?;
        self.exported_at = Some(height);
        log!(
            "Exported {} pending HTLCs at height {}, contract halted",
            state.pending_htlcs.len(),
            height
        );
        Ok(state)
    }

    pub fn exported_at(&self) -> Option<BlockHeight> {
        self.exported_at
    }

    pub fn get_config(&self) -> HtlcConfig {
        self.config.clone()
    }

    // --- BALANCES ---

    /// Credits the attached NEAR to the caller's balance.
    #[payable]
    pub fn deposit(&mut self) -> U128 {
        let account_id = env::predecessor_account_id();
        let amount = env::attached_deposit().as_yoctonear();
        require!(amount > 0, "Attach NEAR to deposit");

        let since = self.storage_checkpoint();
        if let Err(e) = self.bank.credit(&account_id, NATIVE_DENOM, amount) {
            env::panic_str(&e.to_string());
        }
        if let Err(e) = self.charge_storage(&account_id, since, 0) {
            e.panic();
        }
        log!("Deposited {} {} for {}", amount, NATIVE_DENOM, account_id);
        U128(self.bank.balance_of(&account_id, NATIVE_DENOM))
    }

    /// NEP-141 receiver. Credits the tokens to `sender_id`, denominated by
    /// the token contract's account id. A non-empty `msg` is a
    /// [`FtOnTransferMsg`] and locks the tokens in a new HTLC right away; if
    /// that fails the whole transfer is refunded by the token contract.
    pub fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        self.tick();
        let since = self.storage_checkpoint();

        let denom = env::predecessor_account_id().to_string();
        if let Err(e) = self.bank.credit(&sender_id, &denom, amount.0) {
            env::panic_str(&e.to_string());
        }

        let mut reserved = 0;
        if !msg.is_empty() {
            let params: FtOnTransferMsg =
                serde_json::from_str(&msg).expect("Invalid params format for HTLC creation");
            let result = self.lock(
                sender_id.clone(),
                params.to,
                params.receiver_on_other_chain,
                Coins::new(vec![Coin::new(denom, amount.0)]),
                &params.hash_lock,
                params.timestamp,
                params.time_lock,
            );
            if let Err(e) = result {
                e.panic();
            }
            reserved = CLAIM_STORAGE_RESERVE;
        }

        if let Err(e) = self.charge_storage(&sender_id, since, reserved) {
            e.panic();
        }
        PromiseOrValue::Value(U128(0))
    }

    /// Sends `amount` of `denom` from the caller's balance back out of the
    /// contract.
    pub fn withdraw(&mut self, denom: String, amount: U128) -> Promise {
        require!(amount.0 > 0, "Withdrawal amount must be positive");
        let account_id = env::predecessor_account_id();
        let Some(asset) = denom_asset(&denom) else {
            env::panic_str(&format!("invalid denom: {denom}"));
        };

        if let Err(e) = self.bank.debit(&account_id, &denom, amount.0) {
            env::panic_str(&e.to_string());
        }

        let transfer = match asset {
            Asset::Native => {
                Promise::new(account_id.clone()).transfer(NearToken::from_yoctonear(amount.0))
            }
            Asset::Ft(token_id) => ext_fungible_token::ext(token_id)
                .with_attached_deposit(NearToken::from_yoctonear(1))
                .with_static_gas(env::prepaid_gas().saturating_div(4))
                .ft_transfer(account_id.clone(), amount, Some("HTLC withdrawal".to_string())),
        };

        transfer.then(
            ext_self::ext(env::current_account_id())
                .with_static_gas(env::prepaid_gas().saturating_div(4))
                .on_withdraw_settled(account_id, denom, amount),
        )
    }

    pub fn balance_of(&self, account_id: AccountId, denom: String) -> U128 {
        U128(self.bank.balance_of(&account_id, &denom))
    }

    pub fn escrowed(&self, denom: String) -> U128 {
        U128(self.bank.escrowed(&denom))
    }

    // --- STORAGE ---

    /// Prepays storage for `account_id`, the caller by default. The entry
    /// holding the deposit is paid from the deposit itself.
    #[payable]
    pub fn storage_deposit(&mut self, account_id: Option<AccountId>) -> U128 {
        let account_id = account_id.unwrap_or_else(env::predecessor_account_id);
        let amount = env::attached_deposit().as_yoctonear();
        require!(amount > 0, "Attach NEAR to cover storage");

        let since = self.storage_checkpoint();
        let balance = self.storage_balance(&account_id) + amount;
        self.storage_deposits.insert(account_id.clone(), balance);
        if let Err(e) = self.charge_storage(&account_id, since, 0) {
            e.panic();
        }

        let balance = self.storage_balance(&account_id);
        log!("Storage deposit of {} is {}", account_id, balance);
        U128(balance)
    }

    /// Returns unused storage deposit to the caller, all of it by default.
    pub fn storage_withdraw(&mut self, amount: Option<U128>) -> Promise {
        let account_id = env::predecessor_account_id();
        let available = self.storage_balance(&account_id);
        let amount = amount.map_or(available, |amount| amount.0);
        require!(
            amount > 0 && amount <= available,
            "Not enough storage deposit to withdraw"
        );

        self.storage_deposits
            .insert(account_id.clone(), available - amount);
        Promise::new(account_id).transfer(NearToken::from_yoctonear(amount))
    }

    pub fn storage_balance_of(&self, account_id: AccountId) -> U128 {
        U128(self.storage_balance(&account_id))
    }

    // --- PRIVATE CALLBACKS ---

    #[private]
    pub fn on_withdraw_settled(&mut self, account_id: AccountId, denom: String, amount: U128) {
        // transfers return no data, so any result length counts as success
        match env::promise_result_checked(0, 0) {
            Ok(_) | Err(PromiseError::TooLong(_)) => {
                log!("Withdrew {} {} to {}", amount.0, denom, account_id);
                return;
            }
            Err(_) => {}
        }

        // The transfer failed, so the funds never left the contract.
        if let Err(e) = self.bank.credit(&account_id, &denom, amount.0) {
            env::panic_str(&e.to_string());
        }
        log!(
            "Withdrawal of {} {} to {} failed, balance restored",
            amount.0,
            denom,
            account_id
        );
    }
}
