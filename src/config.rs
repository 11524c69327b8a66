use near_sdk::{near, BlockHeight};

use crate::errors::HtlcError;

pub const DEFAULT_MIN_TIME_LOCK: u64 = 50;
pub const DEFAULT_MAX_TIME_LOCK: u64 = 25_480;

/// Bounds, in blocks, for how long an HTLC may stay claimable. Fixed when the
/// contract is initialized.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcConfig {
    pub min_time_lock: u64,
    pub max_time_lock: u64,
}

impl Default for HtlcConfig {
    fn default() -> Self {
        Self {
            min_time_lock: DEFAULT_MIN_TIME_LOCK,
            max_time_lock: DEFAULT_MAX_TIME_LOCK,
        }
    }
}

impl HtlcConfig {
    pub fn validate(&self) -> Result<(), HtlcError> {
        if self.min_time_lock == 0 {
            return Err(HtlcError::InvalidConfig(
                "min_time_lock must be positive".to_string(),
            ));
        }
        if self.min_time_lock > self.max_time_lock {
            return Err(HtlcError::InvalidConfig(format!(
                "min_time_lock {} exceeds max_time_lock {}",
                self.min_time_lock, self.max_time_lock
            )));
        }
        Ok(())
    }

    /// Turns a relative time lock into the absolute expiration height.
    pub fn expiration_height(
        &self,
        current_height: BlockHeight,
        time_lock: u64,
    ) -> Result<BlockHeight, HtlcError> {
        if time_lock < self.min_time_lock || time_lock > self.max_time_lock {
            return Err(HtlcError::InvalidTimeLock {
                time_lock,
                min: self.min_time_lock,
                max: self.max_time_lock,
            });
        }
        current_height
            .checked_add(time_lock)
            .ok_or(HtlcError::InvalidTimeLock {
                time_lock,
                min: self.min_time_lock,
                max: self.max_time_lock,
            })
    }
}
