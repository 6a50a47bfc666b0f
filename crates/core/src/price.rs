//! Prices
//!
//! All catalog and cart amounts are minor units (e.g. cents) held in a
//! `u64`, so a price is non-negative by construction. Arithmetic on prices
//! is always checked; see [`crate::cart`].

/// A minor-unit amount.
pub type Price = u64;

/// Render a minor-unit amount as a decimal string: `1050` becomes `"10.50"`.
pub fn format_price(minor: Price) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional_amounts() {
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(1050), "10.50");
        assert_eq!(format_price(2000), "20.00");
    }
}
