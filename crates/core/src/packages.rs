//! Static credit-package catalog.
//!
//! Used only as a verification oracle by payment reconciliation; never
//! mutated at runtime. Prices are in minor units (cents).

/// The single currency accepted by payment verification.
pub const SUPPORTED_CURRENCY: &str = "usd";

/// One purchasable credit package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPackage {
    /// Stable package identifier carried in checkout metadata.
    pub id: &'static str,
    /// Credits granted on a reconciled purchase.
    pub credits: i32,
    /// Expected price in minor units.
    pub price_minor_units: i64,
    /// Expected payment-provider price identifier.
    pub external_price_id: &'static str,
}

/// All sellable packages.
pub const PACKAGES: &[CreditPackage] = &[
    CreditPackage {
        id: "starter",
        credits: 10,
        price_minor_units: 999,
        external_price_id: "price_starter_10",
    },
    CreditPackage {
        id: "family",
        credits: 40,
        price_minor_units: 2999,
        external_price_id: "price_family_40",
    },
    CreditPackage {
        id: "archive",
        credits: 120,
        price_minor_units: 6999,
        external_price_id: "price_archive_120",
    },
];

/// Look up a package by its metadata identifier.
pub fn find_package(id: &str) -> Option<&'static CreditPackage> {
    PACKAGES.iter().find(|p| p.id == id)
}
