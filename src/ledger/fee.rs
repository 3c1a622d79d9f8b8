//! Platform fee arithmetic.
//!
//! All computation happens in integer minor currency units. Amounts are
//! rendered as 2-decimal major-unit strings only at the display boundary,
//! so repeated splits never accumulate floating-point drift.

/// Default platform cut: 1000 basis points of 10000 (10%).
pub const DEFAULT_PLATFORM_RATE_BPS: u32 = 1_000;

const BPS_DENOMINATOR: i64 = 10_000;

/// Splits a charge amount into payee earnings and the platform cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    rate_bps: u32,
}

/// Result of splitting one charge, in minor units.
///
/// The payee is credited the full charge amount; the platform cut is tracked
/// alongside it rather than deducted, matching how the processor settles
/// funds to the connected account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub earned_minor: i64,
    pub platform_cut_minor: i64,
}

impl FeePolicy {
    /// Create a policy with the given rate in basis points of 10000.
    ///
    /// Rates above 10000 (100%) are clamped.
    #[must_use]
    pub fn new(rate_bps: u32) -> Self {
        Self {
            rate_bps: rate_bps.min(BPS_DENOMINATOR as u32),
        }
    }

    #[must_use]
    pub fn rate_bps(&self) -> u32 {
        self.rate_bps
    }

    /// Split a non-negative charge amount.
    ///
    /// The platform cut is `round_half_up(amount * rate)`, computed per
    /// charge. Cumulative totals must sum these per-charge cuts rather than
    /// re-derive a percentage of the earned total, so a rate change never
    /// rewrites history.
    #[must_use]
    pub fn split(&self, amount_minor: i64) -> FeeSplit {
        debug_assert!(amount_minor >= 0, "charge amounts are non-negative");
        FeeSplit {
            earned_minor: amount_minor,
            platform_cut_minor: round_half_up(amount_minor, self.rate_bps),
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM_RATE_BPS)
    }
}

/// `round_half_up(amount * bps / 10000)` in pure integer arithmetic.
fn round_half_up(amount_minor: i64, rate_bps: u32) -> i64 {
    (amount_minor * i64::from(rate_bps) + BPS_DENOMINATOR / 2) / BPS_DENOMINATOR
}

/// Render minor units as a 2-decimal major-unit string (e.g. 250 -> "2.50").
#[must_use]
pub fn format_minor_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
