//! Fixed-point money arithmetic for the Taqueria POS.
//!
//! All amounts inside the core are integer cents (`Cents`), so summing many
//! line items never drifts the way repeated `f64` addition does. Decimal
//! pesos exist only at the boundaries: price input, legacy data migration,
//! and display formatting.

/// Amount in cents. Signed so balances ("Ana owes $60.00") stay representable.
pub type Cents = i64;

/// Convert a decimal peso amount (user input, legacy storage) to cents,
/// rounding to the nearest cent.
pub fn cents_from_pesos(pesos: f64) -> Cents {
    (pesos * 100.0).round() as Cents
}

/// Cents back to decimal pesos, for JSON consumers that want a number.
pub fn pesos_from_cents(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as `$12.50`. Negative amounts render as `-$12.50`.
pub fn fmt_money(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
