//! Fare amounts in whole rupees.

use std::fmt;

use serde::Serialize;

/// A non-negative amount in whole rupees.
///
/// Displays with the rupee sign and Indian digit grouping
/// (`₹1,25,000`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Rupees(u32);

impl Rupees {
    pub const ZERO: Rupees = Rupees(0);
    pub const MAX: Rupees = Rupees(u32::MAX);

    pub const fn new(amount: u32) -> Self {
        Self(amount)
    }

    /// Convert from a raw document number. Negative and non-finite
    /// values become zero, fractions are rounded.
    pub fn from_raw(amount: f64) -> Self {
        if !amount.is_finite() || amount <= 0.0 {
            return Self(0);
        }
        Self(amount.round().min(u32::MAX as f64) as u32)
    }

    pub fn amount(&self) -> u32 {
        self.0
    }

    /// Price after a percentage discount, rounded to the nearest rupee.
    ///
    /// ```
    /// use bus_server::domain::Rupees;
    ///
    /// assert_eq!(Rupees::new(1200).discounted(15), Rupees::new(1020));
    /// assert_eq!(Rupees::new(999).discounted(0), Rupees::new(999));
    /// assert_eq!(Rupees::new(999).discounted(100), Rupees::new(0));
    /// ```
    pub fn discounted(&self, percent: u8) -> Self {
        let percent = percent.min(100) as u64;
        let scaled = self.0 as u64 * (100 - percent);
        Self(((scaled + 50) / 100) as u32)
    }
}

impl fmt::Debug for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rupees({})", self.0)
    }
}

impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", group_indian(self.0))
    }
}

/// Group digits the Indian way: last three, then pairs.
fn group_indian(n: u32) -> String {
    let digits = n.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_digits() {
        assert_eq!(Rupees::new(0).to_string(), "₹0");
        assert_eq!(Rupees::new(999).to_string(), "₹999");
        assert_eq!(Rupees::new(1200).to_string(), "₹1,200");
        assert_eq!(Rupees::new(12345).to_string(), "₹12,345");
        assert_eq!(Rupees::new(125000).to_string(), "₹1,25,000");
        assert_eq!(Rupees::new(12345678).to_string(), "₹1,23,45,678");
    }

    #[test]
    fn from_raw_sanitizes() {
        assert_eq!(Rupees::from_raw(1199.6), Rupees::new(1200));
        assert_eq!(Rupees::from_raw(-5.0), Rupees::new(0));
        assert_eq!(Rupees::from_raw(f64::NAN), Rupees::new(0));
        assert_eq!(Rupees::from_raw(f64::INFINITY), Rupees::new(0));
    }

    #[test]
    fn discount_rounds_to_nearest() {
        assert_eq!(Rupees::new(999).discounted(10), Rupees::new(899));
        assert_eq!(Rupees::new(1000).discounted(33), Rupees::new(670));
        assert_eq!(Rupees::new(500).discounted(250), Rupees::new(0));
    }
}
