//! Per-turn yields produced by tiles and buildings.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// One kind of yield. Doubles as the citizen focus a city can choose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldKind {
    #[default]
    Food,
    Production,
    Gold,
    Science,
    Culture,
}

impl YieldKind {
    /// Get all yield kinds.
    pub const fn all() -> &'static [YieldKind] {
        &[
            YieldKind::Food,
            YieldKind::Production,
            YieldKind::Gold,
            YieldKind::Science,
            YieldKind::Culture,
        ]
    }
}

/// Food, production, gold, science and culture produced per turn.
///
/// Values can be negative (jungle costs production, for instance).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Yields {
    pub food: i32,
    pub production: i32,
    pub gold: i32,
    pub science: i32,
    pub culture: i32,
}

impl Yields {
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0, 0)
    }

    pub const fn new(food: i32, production: i32, gold: i32, science: i32, culture: i32) -> Self {
        Self {
            food,
            production,
            gold,
            science,
            culture,
        }
    }

    /// Amount of a single yield kind.
    pub const fn amount(&self, kind: YieldKind) -> i32 {
        match kind {
            YieldKind::Food => self.food,
            YieldKind::Production => self.production,
            YieldKind::Gold => self.gold,
            YieldKind::Science => self.science,
            YieldKind::Culture => self.culture,
        }
    }

    /// Sum over every kind.
    pub fn total(&self) -> i32 {
        self.as_array().iter().sum()
    }

    /// Copy with every negative amount raised to zero.
    pub fn clamp_non_negative(&self) -> Self {
        self.map(|v| v.max(0))
    }

    const fn as_array(&self) -> [i32; 5] {
        [self.food, self.production, self.gold, self.science, self.culture]
    }

    fn from_array(values: [i32; 5]) -> Self {
        let [food, production, gold, science, culture] = values;
        Self::new(food, production, gold, science, culture)
    }

    fn map(&self, f: impl Fn(i32) -> i32) -> Self {
        Self::from_array(self.as_array().map(f))
    }

    fn zip_with(&self, other: &Self, f: impl Fn(i32, i32) -> i32) -> Self {
        let (a, b) = (self.as_array(), other.as_array());
        Self::from_array(std::array::from_fn(|i| f(a[i], b[i])))
    }
}

impl Add for Yields {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip_with(&rhs, |a, b| a + b)
    }
}

impl AddAssign for Yields {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Yields {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip_with(&rhs, |a, b| a - b)
    }
}

impl std::iter::Sum for Yields {
    fn sum<I: Iterator<Item = Yields>>(iter: I) -> Self {
        iter.fold(Yields::zero(), Add::add)
    }
}

impl std::fmt::Display for Yields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (amount, suffix) in self.as_array().into_iter().zip(["F", "P", "G", "S", "C"]) {
            if amount == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{amount}{suffix}")?;
            first = false;
        }
        if first {
            f.write_str("0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_matches_default() {
        assert_eq!(Yields::default(), Yields::zero());
        assert_eq!(Yields::zero().total(), 0);
    }

    #[test]
    fn test_amount_by_kind() {
        let y = Yields::new(2, 1, 3, 4, 5);
        assert_eq!(y.amount(YieldKind::Food), 2);
        assert_eq!(y.amount(YieldKind::Production), 1);
        assert_eq!(y.amount(YieldKind::Culture), 5);
        let sum: i32 = YieldKind::all().iter().map(|k| y.amount(*k)).sum();
        assert_eq!(sum, y.total());
    }

    #[test]
    fn test_sum_of_tiles() {
        let total: Yields = vec![Yields::new(2, 0, 0, 0, 0), Yields::new(1, 1, 0, 0, 0)]
            .into_iter()
            .sum();
        assert_eq!(total, Yields::new(3, 1, 0, 0, 0));
    }

    #[test]
    fn test_difference_keeps_sign() {
        let diff = Yields::new(1, 2, 0, 0, 0) - Yields::new(3, 0, 0, 0, 1);
        assert_eq!(diff, Yields::new(-2, 2, 0, 0, -1));
    }

    #[test]
    fn test_clamp_raises_negatives() {
        let clamped = Yields::new(-2, 3, -1, 0, 5).clamp_non_negative();
        assert_eq!(clamped, Yields::new(0, 3, 0, 0, 5));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Yields::new(2, 1, 3, 0, 0)), "2F 1P 3G");
        assert_eq!(format!("{}", Yields::zero()), "0");
    }
}
