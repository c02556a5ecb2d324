//! # Money
//!
//! Centavo-exact BRL amounts. All cart totals, charge amounts and order
//! totals flow through `Price` so the value displayed, the value summed and
//! the value sent to charge creation are the same integer.

use serde::{Deserialize, Serialize};

/// A BRL amount in centavos
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price {
    centavos: i64,
}

impl Price {
    pub const ZERO: Price = Price { centavos: 0 };

    /// Create a price from a decimal amount (rounds to the nearest centavo)
    pub fn new(amount: f64) -> Self {
        Self {
            centavos: (amount * 100.0).round() as i64,
        }
    }

    pub fn from_centavos(centavos: i64) -> Self {
        Self { centavos }
    }

    pub fn centavos(&self) -> i64 {
        self.centavos
    }

    pub fn is_positive(&self) -> bool {
        self.centavos > 0
    }

    /// Saturating sum, used by cart/order totals
    pub fn add(&self, other: Price) -> Price {
        Price {
            centavos: self.centavos.saturating_add(other.centavos),
        }
    }

    pub fn saturating_sub(&self, other: Price) -> Price {
        Price {
            centavos: self.centavos.saturating_sub(other.centavos),
        }
    }

    /// Decimal value as sent on the wire (`valor=49.90`)
    pub fn to_wire(&self) -> String {
        let sign = if self.centavos < 0 { "-" } else { "" };
        let abs = self.centavos.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }

    /// Format for display, pt-BR style (e.g. "R$ 1.234,56")
    pub fn display(&self) -> String {
        let sign = if self.centavos < 0 { "-" } else { "" };
        let abs = self.centavos.unsigned_abs();
        let reais = abs / 100;
        let cents = abs % 100;

        let digits = reais.to_string();
        let mut grouped = String::new();
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        format!("{}R$ {},{:02}", sign, grouped, cents)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, |acc, p| acc.add(p))
    }
}
