//! Opportunity scoring.
//!
//! Turns aggregated analytics plus static lexical heuristics into a
//! priority in [0, 100] per opportunity category. Consumed by downstream
//! notification and presentation layers; only the inputs/outputs contract
//! is load-bearing here.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::analytics::DomainAnalytics;
use super::event::EventKind;
use super::traits::{DomainTraits, PREMIUM_EXTENSIONS};

/// Categories of scored opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpportunityCategory {
    /// Domain expired or about to; registrable upside.
    Expired,
    /// A high-value sale just happened.
    Sale,
    /// Sustained activity: offers and trades accumulating.
    Trending,
    /// Newly listed with an asking price.
    Listing,
}

/// Relative weights for combining scoring factors.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub quality: f64,
    pub activity: f64,
    pub value: f64,
    pub urgency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            quality: 0.35,
            activity: 0.25,
            value: 0.25,
            urgency: 0.15,
        }
    }
}

/// Score one opportunity category for a domain.
///
/// Factors are each normalized to [0.0, 1.0], combined with the weights,
/// and scaled to [0, 100].
#[must_use]
pub fn score_opportunity(
    category: OpportunityCategory,
    analytics: &DomainAnalytics,
    traits: &DomainTraits,
    weights: &ScoreWeights,
) -> u8 {
    let quality = quality_factor(traits);
    let activity = activity_factor(analytics);
    let value = value_factor(analytics);
    let urgency = urgency_factor(category, analytics);

    let composite = weights.quality * quality
        + weights.activity * activity
        + weights.value * value
        + weights.urgency * urgency;

    let total = weights.quality + weights.activity + weights.value + weights.urgency;
    if total <= 0.0 {
        return 0;
    }

    ((composite / total) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Lexical quality from static traits: length band, pronounceability,
/// extension allow-list, brandability composite.
fn quality_factor(traits: &DomainTraits) -> f64 {
    let length_band: f64 = match traits.length {
        0 => 0.0,
        1..=3 => 1.0,
        4..=5 => 0.8,
        6..=8 => 0.55,
        _ => 0.3,
    };

    let pronounceable: f64 = if (0.25..=0.6).contains(&traits.vowel_ratio) {
        1.0
    } else {
        0.4
    };

    let extension: f64 = if PREMIUM_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(&traits.extension))
    {
        1.0
    } else {
        0.4
    };

    let brandability = f64::from(traits.brandability) / 100.0;

    0.3 * length_band + 0.2 * pronounceable + 0.2 * extension + 0.3 * brandability
}

/// Activity from the rollup: event volume, offers, trades.
fn activity_factor(analytics: &DomainAnalytics) -> f64 {
    let events = saturating_ratio(analytics.total_events, 50);
    let offers = saturating_ratio(analytics.offer_count, 10);
    let trades = saturating_ratio(analytics.trade_count, 5);

    0.3 * events + 0.3 * offers + 0.4 * trades
}

/// Monetary value: total volume and peak price, log-scaled against fixed
/// reference magnitudes.
fn value_factor(analytics: &DomainAnalytics) -> f64 {
    let volume = log_scaled(analytics.total_volume, 100_000.0);
    let peak = analytics
        .highest_price
        .map_or(0.0, |p| log_scaled(p, 50_000.0));

    0.5 * volume + 0.5 * peak
}

/// Category-specific urgency.
fn urgency_factor(category: OpportunityCategory, analytics: &DomainAnalytics) -> f64 {
    match category {
        OpportunityCategory::Expired => match analytics.expires_at {
            // Closer expiry (or already past) is more urgent.
            Some(expires_at) => {
                let days = (expires_at - Utc::now()).num_days();
                if days <= 0 {
                    1.0
                } else if days <= 7 {
                    0.9
                } else if days <= 30 {
                    0.6
                } else {
                    0.2
                }
            }
            None => 0.0,
        },
        OpportunityCategory::Sale => saturating_ratio(analytics.trade_count, 3),
        OpportunityCategory::Trending => saturating_ratio(analytics.offer_count, 5),
        OpportunityCategory::Listing => {
            let last_kind = analytics
                .last_event_type
                .as_deref()
                .map(EventKind::classify);
            if last_kind == Some(EventKind::Listing) {
                0.8
            } else {
                0.3
            }
        }
    }
}

fn saturating_ratio(count: i64, saturation: i64) -> f64 {
    if count <= 0 {
        0.0
    } else {
        (count as f64 / saturation as f64).min(1.0)
    }
}

fn log_scaled(amount: Decimal, reference: f64) -> f64 {
    let amount = amount.to_f64().unwrap_or(0.0);
    if amount <= 0.0 {
        return 0.0;
    }
    (amount.ln() / reference.ln()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn analytics_with(trades: i64, offers: i64, volume: Decimal) -> DomainAnalytics {
        let mut analytics = DomainAnalytics::seed("zest.com");
        analytics.total_events = trades + offers;
        analytics.trade_count = trades;
        analytics.offer_count = offers;
        analytics.total_volume = volume;
        analytics.highest_price = if volume > Decimal::ZERO {
            Some(volume)
        } else {
            None
        };
        analytics
    }

    #[test]
    fn score_is_bounded() {
        let traits = DomainTraits::derive("zest.com");
        let analytics = analytics_with(100, 100, dec!(10_000_000));
        let score = score_opportunity(
            OpportunityCategory::Sale,
            &analytics,
            &traits,
            &ScoreWeights::default(),
        );
        assert!(score <= 100);
    }

    #[test]
    fn active_premium_domain_outscores_idle_obscure_one() {
        let weights = ScoreWeights::default();

        let strong_traits = DomainTraits::derive("zest.com");
        let strong = analytics_with(5, 8, dec!(25_000));

        let weak_traits = DomainTraits::derive("xqzw-99-promo.biz");
        let weak = analytics_with(0, 0, dec!(0));

        let strong_score =
            score_opportunity(OpportunityCategory::Sale, &strong, &strong_traits, &weights);
        let weak_score = score_opportunity(OpportunityCategory::Sale, &weak, &weak_traits, &weights);
        assert!(strong_score > weak_score);
    }

    #[test]
    fn expired_category_needs_an_expiry() {
        let traits = DomainTraits::derive("zest.com");
        let mut analytics = analytics_with(1, 1, dec!(100));

        let without = score_opportunity(
            OpportunityCategory::Expired,
            &analytics,
            &traits,
            &ScoreWeights::default(),
        );

        analytics.expires_at = Some(Utc::now() + chrono::Duration::days(2));
        let with = score_opportunity(
            OpportunityCategory::Expired,
            &analytics,
            &traits,
            &ScoreWeights::default(),
        );

        assert!(with > without);
    }

    #[test]
    fn zero_weights_yield_zero() {
        let traits = DomainTraits::derive("zest.com");
        let analytics = analytics_with(1, 1, dec!(100));
        let weights = ScoreWeights {
            quality: 0.0,
            activity: 0.0,
            value: 0.0,
            urgency: 0.0,
        };
        assert_eq!(
            score_opportunity(OpportunityCategory::Sale, &analytics, &traits, &weights),
            0
        );
    }
}
