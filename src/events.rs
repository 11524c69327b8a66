use near_sdk::serde_json::{json, Value};
use near_sdk::{env, AccountId, BlockHeight};

use crate::coins::Coins;
use crate::hashlock::{hash_lock_to_hex, HashLock};

pub const EVENT_STANDARD: &str = "htlc";
pub const EVENT_VERSION: &str = "1.0.0";

/// NEP-297 events for every HTLC state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtlcEvent {
    Created {
        sender: AccountId,
        to: AccountId,
        receiver_on_other_chain: String,
        amount: Coins,
        hash_lock: HashLock,
        expiration_height: BlockHeight,
    },
    Claimed {
        claimer: AccountId,
        hash_lock: HashLock,
        secret: Vec<u8>,
    },
    Refunded {
        caller: AccountId,
        hash_lock: HashLock,
    },
    Expired {
        hash_lock: HashLock,
    },
}

impl HtlcEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HtlcEvent::Created { .. } => "create_htlc",
            HtlcEvent::Claimed { .. } => "claim_htlc",
            HtlcEvent::Refunded { .. } => "refund_htlc",
            HtlcEvent::Expired { .. } => "htlc_expired",
        }
    }

    fn data(&self) -> Value {
        match self {
            HtlcEvent::Created {
                sender,
                to,
                receiver_on_other_chain,
                amount,
                hash_lock,
                expiration_height,
            } => json!({
                "sender": sender,
                "receiver": to,
                "receiver_on_other_chain": receiver_on_other_chain,
                "amount": amount.to_string(),
                "hash_lock": hash_lock_to_hex(hash_lock),
                "expiration_height": expiration_height,
            }),
            HtlcEvent::Claimed {
                claimer,
                hash_lock,
                secret,
            } => json!({
                "sender": claimer,
                "hash_lock": hash_lock_to_hex(hash_lock),
                "secret": hex::encode(secret),
            }),
            HtlcEvent::Refunded { caller, hash_lock } => json!({
                "sender": caller,
                "hash_lock": hash_lock_to_hex(hash_lock),
            }),
            HtlcEvent::Expired { hash_lock } => json!({
                "hash_lock": hash_lock_to_hex(hash_lock),
            }),
        }
    }

    pub fn to_log(&self) -> String {
        let log = json!({
            "standard": EVENT_STANDARD,
            "version": EVENT_VERSION,
            "event": self.name(),
            "data": [self.data()],
        });
        format!("EVENT_JSON:{log}")
    }

    pub fn emit(&self) {
        env::log_str(&self.to_log());
    }
}
