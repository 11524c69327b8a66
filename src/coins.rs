use std::collections::BTreeSet;
use std::fmt;

use near_sdk::json_types::U128;
use near_sdk::{near, AccountId};

use crate::errors::HtlcError;

/// Denomination of native NEAR held in the internal ledger.
pub const NATIVE_DENOM: &str = "near";

/// A single denomination amount. The denom is either [`NATIVE_DENOM`] or the
/// account id of a NEP-141 token contract.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: U128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount: U128(amount),
        }
    }

    pub fn native(amount: u128) -> Self {
        Self::new(NATIVE_DENOM, amount)
    }
}

/// Where the funds of a denom physically live when they leave the contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Asset {
    Native,
    Ft(AccountId),
}

pub fn denom_asset(denom: &str) -> Option<Asset> {
    if denom == NATIVE_DENOM {
        return Some(Asset::Native);
    }
    denom.parse::<AccountId>().ok().map(Asset::Ft)
}

/// Multi-denomination amount.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coins(pub Vec<Coin>);

impl Coins {
    pub fn new(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A lockable amount is non-empty, positive in every denom and names each
    /// denom once.
    pub fn validate(&self) -> Result<(), HtlcError> {
        if self.is_empty() {
            return Err(HtlcError::InvalidAmount("no coins".to_string()));
        }

        let mut seen = BTreeSet::new();
        for coin in self.iter() {
            if denom_asset(&coin.denom).is_none() {
                return Err(HtlcError::InvalidAmount(format!(
                    "invalid denom {:?}",
                    coin.denom
                )));
            }
            if coin.amount.0 == 0 {
                return Err(HtlcError::InvalidAmount(format!(
                    "zero amount of {}",
                    coin.denom
                )));
            }
            if !seen.insert(coin.denom.as_str()) {
                return Err(HtlcError::InvalidAmount(format!(
                    "duplicate denom {}",
                    coin.denom
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|coin| format!("{}{}", coin.amount.0, coin.denom))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}
