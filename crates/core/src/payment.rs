//! Payment-event verification for the reconciliation processor.
//!
//! A verified checkout event arrives with client-supplied metadata (user,
//! package, credits, price id) and provider-computed totals. Everything here
//! fails closed: any mismatch yields a [`RejectReason`] and the caller
//! acknowledges the event without touching the ledger.

use crate::packages::{find_package, CreditPackage, SUPPORTED_CURRENCY};

/// Checkout metadata after structural validation at the webhook boundary.
#[derive(Debug, Clone)]
pub struct PurchaseIntent {
    /// External auth identifier of the purchasing user.
    pub user_auth_id: String,
    /// Package identifier from checkout metadata.
    pub package_id: String,
    /// Credit count from checkout metadata.
    pub credits: i32,
    /// Provider price identifier the checkout was created under.
    pub price_id: String,
}

/// Provider-computed money fields of the checkout event, in minor units.
#[derive(Debug, Clone, Copy)]
pub struct PaymentTotals<'a> {
    /// Pre-discount subtotal.
    pub amount_subtotal: Option<i64>,
    /// Amount actually charged.
    pub amount_total: Option<i64>,
    /// Total discount applied (0 when absent).
    pub amount_discount: i64,
    /// ISO currency code as reported by the provider.
    pub currency: &'a str,
}

/// Which branch of the dual amount check accepted the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountMatch {
    /// `amount_subtotal == package price`.
    Subtotal,
    /// `amount_total + amount_discount == package price`.
    ///
    /// The discount magnitude is unbounded here; see DESIGN.md.
    DiscountAdjusted,
}

/// Why a structurally valid event was rejected. Every variant is a
/// no-op-success at the HTTP layer: acknowledged, logged, no ledger action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("Unknown package '{0}'")]
    UnknownPackage(String),

    #[error("Price id '{got}' does not match package '{package}' (expected '{expected}')")]
    PriceIdMismatch {
        package: &'static str,
        expected: &'static str,
        got: String,
    },

    #[error("Credit count {got} does not match package '{package}' ({expected})")]
    CreditsMismatch {
        package: &'static str,
        expected: i32,
        got: i32,
    },

    #[error("Paid amount does not match package price {expected}")]
    AmountMismatch { expected: i64 },

    #[error("Unsupported currency '{0}'")]
    CurrencyMismatch(String),
}

/// Verify a purchase intent against the static catalog and the provider's
/// totals. Returns the resolved package and which amount branch matched.
pub fn verify_purchase(
    intent: &PurchaseIntent,
    totals: PaymentTotals<'_>,
) -> Result<(&'static CreditPackage, AmountMatch), RejectReason> {
    let package = find_package(&intent.package_id)
        .ok_or_else(|| RejectReason::UnknownPackage(intent.package_id.clone()))?;

    if intent.price_id != package.external_price_id {
        return Err(RejectReason::PriceIdMismatch {
            package: package.id,
            expected: package.external_price_id,
            got: intent.price_id.clone(),
        });
    }

    if intent.credits != package.credits {
        return Err(RejectReason::CreditsMismatch {
            package: package.id,
            expected: package.credits,
            got: intent.credits,
        });
    }

    if !totals.currency.eq_ignore_ascii_case(SUPPORTED_CURRENCY) {
        return Err(RejectReason::CurrencyMismatch(totals.currency.to_string()));
    }

    let matched = check_amount(totals, package.price_minor_units).ok_or(
        RejectReason::AmountMismatch {
            expected: package.price_minor_units,
        },
    )?;

    Ok((package, matched))
}

/// Dual amount check: accept when the pre-discount subtotal equals the
/// configured price, or when the charged total plus the discount equals it
/// (legitimate coupon flows).
fn check_amount(totals: PaymentTotals<'_>, expected_price: i64) -> Option<AmountMatch> {
    if totals.amount_subtotal == Some(expected_price) {
        return Some(AmountMatch::Subtotal);
    }
    if let Some(total) = totals.amount_total {
        if total + totals.amount_discount == expected_price {
            return Some(AmountMatch::DiscountAdjusted);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starter_intent() -> PurchaseIntent {
        PurchaseIntent {
            user_auth_id: "auth_123".into(),
            package_id: "starter".into(),
            credits: 10,
            price_id: "price_starter_10".into(),
        }
    }

    fn totals(subtotal: Option<i64>, total: Option<i64>, discount: i64) -> PaymentTotals<'static> {
        PaymentTotals {
            amount_subtotal: subtotal,
            amount_total: total,
            amount_discount: discount,
            currency: "usd",
        }
    }

    #[test]
    fn exact_subtotal_is_accepted() {
        let (pkg, matched) =
            verify_purchase(&starter_intent(), totals(Some(999), Some(999), 0)).unwrap();
        assert_eq!(pkg.id, "starter");
        assert_eq!(matched, AmountMatch::Subtotal);
    }

    #[test]
    fn discounted_total_plus_discount_is_accepted() {
        // 799 charged + 200 coupon = 999 configured price.
        let (_, matched) =
            verify_purchase(&starter_intent(), totals(Some(999), Some(799), 200)).unwrap();
        // Subtotal branch wins when both hold.
        assert_eq!(matched, AmountMatch::Subtotal);

        let (_, matched) =
            verify_purchase(&starter_intent(), totals(Some(899), Some(799), 200)).unwrap();
        assert_eq!(matched, AmountMatch::DiscountAdjusted);
    }

    #[test]
    fn unrelated_amount_is_rejected() {
        let err = verify_purchase(&starter_intent(), totals(Some(500), Some(500), 0)).unwrap_err();
        assert_eq!(err, RejectReason::AmountMismatch { expected: 999 });
    }

    #[test]
    fn missing_totals_are_rejected() {
        let err = verify_purchase(&starter_intent(), totals(None, None, 0)).unwrap_err();
        assert_eq!(err, RejectReason::AmountMismatch { expected: 999 });
    }

    #[test]
    fn wrong_currency_is_rejected() {
        let t = PaymentTotals {
            amount_subtotal: Some(999),
            amount_total: Some(999),
            amount_discount: 0,
            currency: "eur",
        };
        let err = verify_purchase(&starter_intent(), t).unwrap_err();
        assert_eq!(err, RejectReason::CurrencyMismatch("eur".into()));
    }

    #[test]
    fn unknown_package_is_rejected() {
        let mut intent = starter_intent();
        intent.package_id = "mega".into();
        let err = verify_purchase(&intent, totals(Some(999), Some(999), 0)).unwrap_err();
        assert_eq!(err, RejectReason::UnknownPackage("mega".into()));
    }

    #[test]
    fn price_id_mismatch_is_rejected() {
        let mut intent = starter_intent();
        intent.price_id = "price_archive_120".into();
        let err = verify_purchase(&intent, totals(Some(999), Some(999), 0)).unwrap_err();
        assert!(matches!(err, RejectReason::PriceIdMismatch { .. }));
    }

    #[test]
    fn tampered_credit_count_is_rejected() {
        let mut intent = starter_intent();
        intent.credits = 9999;
        let err = verify_purchase(&intent, totals(Some(999), Some(999), 0)).unwrap_err();
        assert!(matches!(err, RejectReason::CreditsMismatch { .. }));
    }

    #[test]
    fn oversized_discount_still_satisfies_second_branch() {
        // Documented open question: the discount magnitude is unbounded, so a
        // tiny total with a large discount matching the configured price is
        // accepted by the second branch.
        let (_, matched) =
            verify_purchase(&starter_intent(), totals(Some(5999), Some(1), 998)).unwrap();
        assert_eq!(matched, AmountMatch::DiscountAdjusted);
    }
}
