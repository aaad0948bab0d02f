//! Ad-reward throttle state.
//!
//! Watch counters are kept per ad network, bounded by per-network daily caps
//! and a global daily cap. The daily reset is computed lazily from the stored
//! date: every read path rolls the state to the caller's current calendar day
//! before using it, so an account untouched for days catches up on its next
//! access without a scheduled job.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{AdNetwork, EconomyConfig};
use crate::error::{EconomyError, Result};

/// Per-account ad watch state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdRewardState {
    /// Watches today, per network id.
    pub watched_today: BTreeMap<String, u32>,

    /// The calendar day the counters belong to.
    pub last_watch_date: Option<NaiveDate>,

    /// Lifetime watch count across all networks.
    pub lifetime_watched: u64,

    /// Whether today's cap-completion bonus has been claimed.
    pub bonus_claimed: bool,
}

impl AdRewardState {
    /// Total watches today across all networks.
    #[must_use]
    pub fn total_today(&self) -> u32 {
        self.watched_today.values().sum()
    }

    /// Watches today on a specific network.
    #[must_use]
    pub fn network_today(&self, network_id: &str) -> u32 {
        self.watched_today.get(network_id).copied().unwrap_or(0)
    }

    /// Roll the counters to `today`. Returns `true` if anything changed.
    ///
    /// Idempotent: rolling twice to the same day is a no-op the second time,
    /// regardless of how many days elapsed since `last_watch_date`.
    pub fn roll_to(&mut self, today: NaiveDate) -> bool {
        if self.last_watch_date == Some(today) {
            return false;
        }
        self.watched_today.clear();
        self.bonus_claimed = false;
        self.last_watch_date = Some(today);
        true
    }

    /// Record one watch on `network`, after rolling to `today`.
    ///
    /// # Errors
    ///
    /// Returns `AdCapReached` when the global or per-network daily cap is
    /// already met; counters are left unchanged in that case.
    pub fn record_watch(
        &mut self,
        network: &AdNetwork,
        global_cap: u32,
        today: NaiveDate,
    ) -> Result<()> {
        self.roll_to(today);

        if self.total_today() >= global_cap {
            return Err(EconomyError::AdCapReached {
                network: network.id.clone(),
                cap: global_cap,
            });
        }
        if self.network_today(&network.id) >= network.daily_cap {
            return Err(EconomyError::AdCapReached {
                network: network.id.clone(),
                cap: network.daily_cap,
            });
        }

        *self.watched_today.entry(network.id.clone()).or_insert(0) += 1;
        self.lifetime_watched += 1;
        Ok(())
    }

    /// Whether the daily bonus is claimable: cap reached, bonus untaken.
    #[must_use]
    pub fn can_claim_bonus(&self, global_cap: u32) -> bool {
        self.total_today() >= global_cap && !self.bonus_claimed
    }

    /// Claim the daily bonus, after rolling to `today`.
    ///
    /// # Errors
    ///
    /// Returns `BonusUnavailable` if the cap has not been reached today or
    /// the bonus was already claimed.
    pub fn claim_bonus(&mut self, config: &EconomyConfig, today: NaiveDate) -> Result<()> {
        self.roll_to(today);

        if !self.can_claim_bonus(config.daily_ad_cap) {
            return Err(EconomyError::BonusUnavailable);
        }
        self.bonus_claimed = true;
        Ok(())
    }
}
