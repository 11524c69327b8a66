use near_sdk::store::{IterableMap, LookupMap};
use near_sdk::{near, AccountId, IntoStorageKey};

use crate::coins::{denom_asset, Coins};

/// Label used for the module escrow account in error messages.
pub const ESCROW_ACCOUNT: &str = "htlc-escrow";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("insufficient funds: {holder} holds {available} {denom}, needs {required}")]
    InsufficientFunds {
        holder: String,
        denom: String,
        available: u128,
        required: u128,
    },
    #[error("invalid denom: {0}")]
    InvalidDenom(String),
    #[error("balance overflow for {0}")]
    Overflow(String),
}

/// Moves funds between account balances and the module escrow account.
/// Implementations must apply a transfer completely or not at all.
pub trait EscrowLedger {
    fn transfer_to_module(&mut self, from: &AccountId, amount: &Coins) -> Result<(), BankError>;
    fn transfer_from_module(&mut self, to: &AccountId, amount: &Coins) -> Result<(), BankError>;
}

/// Internal balance ledger: what each account has deposited into the
/// contract, and what the module holds in escrow for open HTLCs.
#[near(serializers = [borsh])]
pub struct Bank {
    // (account, denom) -> balance
    balances: LookupMap<(AccountId, String), u128>,
    // denom -> escrowed total
    escrow: IterableMap<String, u128>,
}

impl Bank {
    pub fn new<B, E>(balances_prefix: B, escrow_prefix: E) -> Self
    where
        B: IntoStorageKey,
        E: IntoStorageKey,
    {
        Self {
            balances: LookupMap::new(balances_prefix),
            escrow: IterableMap::new(escrow_prefix),
        }
    }

    pub fn balance_of(&self, account_id: &AccountId, denom: &str) -> u128 {
        self.balances
            .get(&(account_id.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn escrowed(&self, denom: &str) -> u128 {
        self.escrow.get(denom).copied().unwrap_or(0)
    }

    pub fn flush(&mut self) {
        self.balances.flush();
        self.escrow.flush();
    }

    pub fn credit(
        &mut self,
        account_id: &AccountId,
        denom: &str,
        amount: u128,
    ) -> Result<(), BankError> {
        if denom_asset(denom).is_none() {
            return Err(BankError::InvalidDenom(denom.to_string()));
        }
        let balance = self
            .balance_of(account_id, denom)
            .checked_add(amount)
            .ok_or_else(|| BankError::Overflow(account_id.to_string()))?;
        self.balances
            .insert((account_id.clone(), denom.to_string()), balance);
        Ok(())
    }

    pub fn debit(
        &mut self,
        account_id: &AccountId,
        denom: &str,
        amount: u128,
    ) -> Result<(), BankError> {
        let available = self.balance_of(account_id, denom);
        if available < amount {
            return Err(BankError::InsufficientFunds {
                holder: account_id.to_string(),
                denom: denom.to_string(),
                available,
                required: amount,
            });
        }
        let key = (account_id.clone(), denom.to_string());
        if available == amount {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, available - amount);
        }
        Ok(())
    }

    /// Puts funds straight into escrow. Used when HTLCs are restored from
    /// genesis and their backing arrives with the contract's own balance.
    pub fn credit_module(&mut self, amount: &Coins) -> Result<(), BankError> {
        self.check_module_credit(amount)?;
        for coin in amount.iter() {
            let escrowed = self.escrowed(&coin.denom) + coin.amount.0;
            self.escrow.insert(coin.denom.clone(), escrowed);
        }
        Ok(())
    }

    fn check_module_credit(&self, amount: &Coins) -> Result<(), BankError> {
        for coin in amount.iter() {
            if denom_asset(&coin.denom).is_none() {
                return Err(BankError::InvalidDenom(coin.denom.clone()));
            }
            self.escrowed(&coin.denom)
                .checked_add(coin.amount.0)
                .ok_or_else(|| BankError::Overflow(ESCROW_ACCOUNT.to_string()))?;
        }
        Ok(())
    }
}

impl EscrowLedger for Bank {
    fn transfer_to_module(&mut self, from: &AccountId, amount: &Coins) -> Result<(), BankError> {
        for coin in amount.iter() {
            let available = self.balance_of(from, &coin.denom);
            if available < coin.amount.0 {
                return Err(BankError::InsufficientFunds {
                    holder: from.to_string(),
                    denom: coin.denom.clone(),
                    available,
                    required: coin.amount.0,
                });
            }
        }
        self.check_module_credit(amount)?;

        for coin in amount.iter() {
            self.debit(from, &coin.denom, coin.amount.0)?;
        }
        self.credit_module(amount)
    }

    fn transfer_from_module(&mut self, to: &AccountId, amount: &Coins) -> Result<(), BankError> {
        for coin in amount.iter() {
            let escrowed = self.escrowed(&coin.denom);
            if escrowed < coin.amount.0 {
                return Err(BankError::InsufficientFunds {
                    holder: ESCROW_ACCOUNT.to_string(),
                    denom: coin.denom.clone(),
                    available: escrowed,
                    required: coin.amount.0,
                });
            }
            self.balance_of(to, &coin.denom)
                .checked_add(coin.amount.0)
                .ok_or_else(|| BankError::Overflow(to.to_string()))?;
        }

        for coin in amount.iter() {
            let remaining = self.escrowed(&coin.denom) - coin.amount.0;
            if remaining == 0 {
                self.escrow.remove(&coin.denom);
            } else {
                self.escrow.insert(coin.denom.clone(), remaining);
            }
            self.credit(to, &coin.denom, coin.amount.0)?;
        }
        Ok(())
    }
}
