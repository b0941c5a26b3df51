//! Founder royalty curve.
//!
//! `r(v) = R0 * (1 + v / V_STAR) ^ (-alpha)` with `R0 = 0.15`,
//! `V_STAR = 125,000,000` sats and `alpha = log(2)/log(9)`. The curve starts
//! at 15% at genesis, halves by the time cumulative protocol volume reaches
//! `V_STAR`, and asymptotically approaches zero. Every credit pays exactly
//! `floor(amount * r(v))` to the protocol and the remainder to the pool —
//! rounding dust always favors the pool, never the founder.

use coordinator_core::constants::{FOUNDER_ROYALTY_ALPHA, FOUNDER_ROYALTY_R0, V_STAR};
use coordinator_core::types::Sats;

/// The founder royalty rate at cumulative protocol volume `v` (sats).
pub fn royalty_rate(v: Sats) -> f64 {
    let ratio = 1.0 + (v as f64) / V_STAR;
    FOUNDER_ROYALTY_R0 * ratio.powf(-FOUNDER_ROYALTY_ALPHA)
}

/// Split `amount` into `(protocol_fee, net_to_pool)` at cumulative volume
/// `v`, with `protocol_fee + net_to_pool == amount` exactly.
pub fn split_with_royalty(amount: Sats, v: Sats) -> (Sats, Sats) {
    let fee = ((amount as f64) * royalty_rate(v)).floor() as Sats;
    let fee = fee.min(amount);
    (fee, amount - fee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_at_genesis_is_r0() {
        assert!((royalty_rate(0) - FOUNDER_ROYALTY_R0).abs() < 1e-12);
    }

    #[test]
    fn rate_strictly_decreases() {
        let r0 = royalty_rate(0);
        let r1 = royalty_rate(10_000_000);
        let r2 = royalty_rate(1_000_000_000);
        let r3 = royalty_rate(100_000_000_000);
        assert!(r0 > r1);
        assert!(r1 > r2);
        assert!(r2 > r3);
        assert!(r3 > 0.0);
    }

    #[test]
    fn rate_at_10_btc_is_half_r0() {
        // At v = 10 BTC, (1 + v/V_STAR) = 9, and alpha = ln2/ln9 makes
        // 9^-alpha = 1/2 exactly, so the rate halves to 7.5%.
        let r = royalty_rate(1_000_000_000);
        assert!((r - FOUNDER_ROYALTY_R0 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn rate_at_100_btc_is_quarter_r0() {
        let r = royalty_rate(10_000_000_000);
        assert!((r - FOUNDER_ROYALTY_R0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn split_sums_exactly() {
        for amount in [0u64, 1, 7, 1000, 1_000_000, 999_999_999] {
            for v in [0u64, 1_000, 125_000_000, 10_000_000_000] {
                let (fee, net) = split_with_royalty(amount, v);
                assert_eq!(fee + net, amount);
            }
        }
    }

    #[test]
    fn genesis_credit_matches_example() {
        let (fee, net) = split_with_royalty(1000, 0);
        assert_eq!(fee, 150);
        assert_eq!(net, 850);
    }
}
