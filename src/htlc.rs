use near_sdk::{near, AccountId, BlockHeight};

use crate::coins::Coins;
use crate::errors::HtlcError;

pub const MAX_RECEIVER_ON_OTHER_CHAIN_LEN: usize = 128;

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HtlcState {
    Open,
    Completed,
    Refunded,
    Expired,
}

// A single hashed time-locked contract, keyed by its hash lock.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Htlc {
    pub sender: AccountId,
    pub to: AccountId,
    // Routing hint for the counterparty chain, never interpreted here
    pub receiver_on_other_chain: String,
    pub amount: Coins,
    #[serde(with = "hex_bytes")]
    pub secret: Vec<u8>, // Empty until claimed
    pub timestamp: u64,  // 0 = unsalted hash lock
    pub expiration_height: BlockHeight,
    pub state: HtlcState,
}

impl Htlc {
    pub fn new(
        sender: AccountId,
        to: AccountId,
        receiver_on_other_chain: String,
        amount: Coins,
        timestamp: u64,
        expiration_height: BlockHeight,
    ) -> Self {
        Self {
            sender,
            to,
            receiver_on_other_chain,
            amount,
            secret: Vec::new(),
            timestamp,
            expiration_height,
            state: HtlcState::Open,
        }
    }

    /// Checks the record on its own, without looking at the chain.
    pub fn validate(&self) -> Result<(), HtlcError> {
        self.amount.validate()?;

        if self.receiver_on_other_chain.len() > MAX_RECEIVER_ON_OTHER_CHAIN_LEN {
            return Err(HtlcError::InvalidReceiverOnOtherChain {
                len: self.receiver_on_other_chain.len(),
                max: MAX_RECEIVER_ON_OTHER_CHAIN_LEN,
            });
        }

        if self.expiration_height == 0 {
            return Err(HtlcError::InvalidRecord(
                "expiration height must be positive".to_string(),
            ));
        }

        match (self.state, self.secret.is_empty()) {
            (HtlcState::Completed, true) => Err(HtlcError::InvalidRecord(
                "completed HTLC without a secret".to_string(),
            )),
            (HtlcState::Open | HtlcState::Expired | HtlcState::Refunded, false) => Err(
                HtlcError::InvalidRecord("unclaimed HTLC carries a secret".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

mod hex_bytes {
    use near_sdk::serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(D::Error::custom)
    }
}
