//! Tiers, quotas and the per-user usage record.
//!
//! The stored plan is either free or pro. The *effective* tier adds basic: a
//! free-plan user holding purchased credits is treated as basic for gating.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TierError;
use crate::render::{Resolution, VideoLength};
use crate::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Generations per calendar month on the free tier.
pub const FREE_MONTHLY_LIMIT: u32 = 5;

/// Generations per subscription period on the pro tier.
pub const PRO_MONTHLY_LIMIT: u32 = 50;

/// Credits granted by one basic pack purchase.
pub const BASIC_PACK_CREDITS: u32 = 5;

/// Length of a pro subscription period in days.
pub const PRO_SUBSCRIPTION_DAYS: i64 = 30;

/// The plan stored on a usage record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// No subscription.
    #[default]
    Free,
    /// Active pro subscription.
    Pro,
}

/// A user's effective subscription level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Monthly free quota only.
    Free,
    /// Purchased one-time credits.
    Basic,
    /// Pro subscription.
    Pro,
}

impl Tier {
    /// Get the tier name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }

    /// Generations allowed per period, or `None` when credit-based.
    #[must_use]
    pub const fn monthly_limit(self) -> Option<u32> {
        match self {
            Self::Free => Some(FREE_MONTHLY_LIMIT),
            Self::Basic => None,
            Self::Pro => Some(PRO_MONTHLY_LIMIT),
        }
    }

    /// Longest video this tier may request.
    #[must_use]
    pub const fn max_length(self) -> VideoLength {
        match self {
            Self::Free => VideoLength::Long,
            Self::Basic | Self::Pro => VideoLength::Extended,
        }
    }

    /// Highest resolution this tier may request.
    #[must_use]
    pub const fn max_resolution(self) -> Resolution {
        match self {
            Self::Free => Resolution::Hd,
            Self::Basic => Resolution::FullHd,
            Self::Pro => Resolution::Uhd,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 1st of the month following `from`, at midnight UTC.
#[must_use]
pub fn next_month_reset(from: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if from.month() == 12 {
        (from.year() + 1, 1)
    } else {
        (from.year(), from.month() + 1)
    };
    // INVARIANT: midnight on the 1st exists for every month in UTC.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first of month is a valid UTC timestamp")
}

/// End of a pro subscription period starting at `from`.
#[must_use]
pub fn subscription_reset(from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(PRO_SUBSCRIPTION_DAYS)
}

/// Per-user usage record.
///
/// Credits are unsigned and only ever decremented when positive, so the
/// balance can never go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    /// The owning user.
    pub user_id: UserId,

    /// Stored plan.
    pub plan: Plan,

    /// One-time purchased credits remaining.
    pub basic_credits: u32,

    /// Generations counted in the current period.
    pub monthly_count: u32,

    /// When the monthly counter next resets.
    pub month_reset_at: DateTime<Utc>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a pre-generation quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCheck {
    /// Whether the user may start a generation.
    pub allowed: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Generations left after this check.
    pub remaining: u32,
    /// Effective tier used for the decision.
    pub tier: Tier,
}

/// What a completed generation was charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// One basic credit was spent.
    Credit {
        /// Credits left afterwards.
        remaining: u32,
    },
    /// The period counter was incremented.
    Monthly {
        /// Generations used this period afterwards.
        used: u32,
    },
}

/// Usage summary returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Effective tier.
    pub tier: Tier,
    /// Generations used this period.
    pub used: u32,
    /// Period limit for the tier.
    pub limit: u32,
    /// Generations left this period (never negative).
    pub remaining: u32,
    /// One-time credits remaining.
    pub basic_credits: u32,
    /// When the period counter resets.
    pub reset_date: DateTime<Utc>,
}

impl UserUsage {
    /// Create a new free-plan record.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            plan: Plan::Free,
            basic_credits: 0,
            monthly_count: 0,
            month_reset_at: next_month_reset(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Effective tier: pro, else basic while credits remain, else free.
    #[must_use]
    pub fn effective_tier(&self) -> Tier {
        match self.plan {
            Plan::Pro => Tier::Pro,
            Plan::Free if self.basic_credits > 0 => Tier::Basic,
            Plan::Free => Tier::Free,
        }
    }

    /// Reset the period counter if the reset date has passed.
    ///
    /// Returns `true` when a reset happened.
    pub fn reset_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.month_reset_at {
            return false;
        }

        self.monthly_count = 0;
        self.month_reset_at = match self.plan {
            Plan::Pro => {
                let mut next = self.month_reset_at;
                while next <= now {
                    next = subscription_reset(next);
                }
                next
            }
            Plan::Free => next_month_reset(now),
        };
        self.updated_at = now;
        true
    }

    /// Check whether a generation may start.
    pub fn check(&mut self, now: DateTime<Utc>) -> GenerationCheck {
        self.reset_if_due(now);
        let reset = self.month_reset_at.format("%B %-d");

        if self.plan == Plan::Pro {
            if self.monthly_count >= PRO_MONTHLY_LIMIT {
                return GenerationCheck {
                    allowed: false,
                    reason: format!(
                        "Pro monthly limit reached ({PRO_MONTHLY_LIMIT} videos). Resets on {reset}."
                    ),
                    remaining: 0,
                    tier: Tier::Pro,
                };
            }
            return GenerationCheck {
                allowed: true,
                reason: "Pro user".into(),
                remaining: PRO_MONTHLY_LIMIT - self.monthly_count,
                tier: Tier::Pro,
            };
        }

        if self.basic_credits > 0 {
            return GenerationCheck {
                allowed: true,
                reason: "Using Basic credits".into(),
                remaining: self.basic_credits,
                tier: Tier::Basic,
            };
        }

        if self.monthly_count >= FREE_MONTHLY_LIMIT {
            return GenerationCheck {
                allowed: false,
                reason: format!(
                    "Free tier limit reached ({FREE_MONTHLY_LIMIT} videos/month). Upgrade to continue or wait until {reset}."
                ),
                remaining: 0,
                tier: Tier::Free,
            };
        }

        GenerationCheck {
            allowed: true,
            reason: "Free tier".into(),
            remaining: FREE_MONTHLY_LIMIT - self.monthly_count,
            tier: Tier::Free,
        }
    }

    /// Check whether a generation may start while `pending` admitted
    /// generations are still waiting to be charged.
    #[must_use]
    pub fn check_with_pending(&self, now: DateTime<Utc>, pending: u32) -> GenerationCheck {
        let mut projected = self.clone();
        for _ in 0..pending {
            projected.consume(now);
        }
        projected.check(now)
    }

    /// Check the requested settings against the effective tier.
    ///
    /// # Errors
    ///
    /// Returns a `TierError` when the length or resolution is above the tier maximum.
    pub fn check_settings(
        &self,
        length: VideoLength,
        resolution: Resolution,
    ) -> Result<(), TierError> {
        let tier = self.effective_tier();
        if length > tier.max_length() {
            return Err(TierError::LengthNotAllowed {
                tier,
                length,
                max: tier.max_length(),
            });
        }
        if resolution > tier.max_resolution() {
            return Err(TierError::ResolutionNotAllowed {
                tier,
                resolution,
                max: tier.max_resolution(),
            });
        }
        Ok(())
    }

    /// Charge one completed generation.
    ///
    /// Pro users always count against the period quota. Everyone else spends
    /// a basic credit when they hold one, otherwise the period counter grows.
    pub fn consume(&mut self, now: DateTime<Utc>) -> Consumption {
        self.reset_if_due(now);
        self.updated_at = now;

        if self.plan == Plan::Free && self.basic_credits > 0 {
            self.basic_credits -= 1;
            return Consumption::Credit {
                remaining: self.basic_credits,
            };
        }

        self.monthly_count = self.monthly_count.saturating_add(1);
        Consumption::Monthly {
            used: self.monthly_count,
        }
    }

    /// Add purchased basic credits.
    pub fn add_basic_credits(&mut self, credits: u32, now: DateTime<Utc>) {
        self.basic_credits = self.basic_credits.saturating_add(credits);
        self.updated_at = now;
    }

    /// Activate a pro subscription, starting a fresh 30-day period.
    pub fn activate_pro(&mut self, now: DateTime<Utc>) {
        self.plan = Plan::Pro;
        self.monthly_count = 0;
        self.month_reset_at = subscription_reset(now);
        self.updated_at = now;
    }

    /// Cancel a pro subscription, returning to the free plan.
    pub fn cancel_pro(&mut self, now: DateTime<Utc>) {
        self.plan = Plan::Free;
        self.updated_at = now;
    }

    /// Summarize usage for display.
    #[must_use]
    pub fn summary(&self) -> UsageSummary {
        let limit = match self.plan {
            Plan::Pro => PRO_MONTHLY_LIMIT,
            Plan::Free => FREE_MONTHLY_LIMIT,
        };
        UsageSummary {
            tier: self.effective_tier(),
            used: self.monthly_count,
            limit,
            remaining: limit.saturating_sub(self.monthly_count),
            basic_credits: self.basic_credits,
            reset_date: self.month_reset_at,
        }
    }
}
