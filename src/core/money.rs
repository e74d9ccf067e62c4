use crate::error::{LedgerError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places carried by one minor unit (paise, cents).
pub const MINOR_SCALE: u32 = 2;

/// Errors arising when converting external amounts into [`Money`].
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("invalid amount: {0}")]
    Parse(#[from] rust_decimal::Error),
    #[error("amount {0} does not fit in minor units")]
    OutOfRange(Decimal),
}

/// A monetary amount held as integer minor units.
///
/// All arithmetic is exact. Conversion from decimals rounds half away from
/// zero to [`MINOR_SCALE`] places; after that no rounding ever happens
/// again, so repeated summation cannot drift.
///
/// # Examples
///
/// ```
/// use ledger_settlement::core::money::Money;
///
/// let rent: Money = "100.00".parse().unwrap();
/// let shares = rent.allocate(3).unwrap();
/// assert_eq!(shares[0], Money::from_minor(3334));
/// assert_eq!(shares.iter().copied().sum::<Money>(), rent);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MAX: Money = Money(i64::MAX);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Whole currency units, e.g. `from_major(300)` is ₹300.00.
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub fn from_decimal(amount: Decimal) -> std::result::Result<Self, MoneyError> {
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or(MoneyError::OutOfRange(amount))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MINOR_SCALE)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Addition clamped to `[i64::MIN, i64::MAX]` minor units.
    pub fn saturating_add(self, rhs: Money) -> Money {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Self)
    }

    /// Euclidean division: the remainder is always in `0..|divisor|`.
    pub fn div_rem(self, divisor: i64) -> Result<(Money, Money)> {
        if divisor == 0 {
            return Err(LedgerError::DivisionDegenerate { amount: self });
        }
        Ok((
            Self(self.0.div_euclid(divisor)),
            Self(self.0.rem_euclid(divisor)),
        ))
    }

    /// Split into `parts` shares that sum exactly to `self`.
    ///
    /// Every share is `self / parts` rounded down; the first
    /// `self mod parts` shares carry one extra minor unit. Callers decide
    /// who sits first (see [`RemainderPolicy`]).
    pub fn allocate(self, parts: usize) -> Result<Vec<Money>> {
        let divisor = i64::try_from(parts).unwrap_or(i64::MAX);
        let (base, remainder) = self.div_rem(divisor)?;
        let extra = remainder.0 as usize;
        Ok((0..parts)
            .map(|i| if i < extra { base + Money(1) } else { base })
            .collect())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_decimal().to_string())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim())?;
        Self::from_decimal(amount)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> std::result::Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// How close to zero an amount must be to count as settled.
///
/// Expressed in hundredths of a minor unit: the default of 50 means half a
/// minor unit, so only an exact zero is settled. Raising it to 150 lets
/// one-paisa rounding residue count as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance(u32);

impl Tolerance {
    pub const DEFAULT_HUNDREDTHS: u32 = 50;

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(self) -> u32 {
        self.0
    }

    pub fn is_zero(self, amount: Money) -> bool {
        u128::from(amount.minor().unsigned_abs()) * 100 <= u128::from(self.0)
    }

    /// Strictly above `+tolerance`.
    pub fn is_positive(self, amount: Money) -> bool {
        amount.is_positive() && !self.is_zero(amount)
    }

    /// Strictly below `-tolerance`.
    pub fn is_negative(self, amount: Money) -> bool {
        amount.is_negative() && !self.is_zero(amount)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(Self::DEFAULT_HUNDREDTHS)
    }
}

/// Who receives the leftover minor units of an uneven split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// The payer first (when they participate), then members in id order.
    #[default]
    Payer,
    /// Members in id order, ignoring who paid.
    MemberOrder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_and_display() {
        let m: Money = "33.33".parse().unwrap();
        assert_eq!(m.minor(), 3333);
        assert_eq!(m.to_string(), "33.33");
        assert_eq!(Money::from_major(300).to_string(), "300.00");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(dec!(0.005)).unwrap().minor(), 1);
        assert_eq!(Money::from_decimal(dec!(-0.005)).unwrap().minor(), -1);
        assert_eq!(Money::from_decimal(dec!(12.344)).unwrap().minor(), 1234);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(matches!("ten".parse::<Money>(), Err(MoneyError::Parse(_))));
    }

    #[test]
    fn test_allocate_three_ways() {
        let shares = Money::from_major(100).allocate(3).unwrap();
        assert_eq!(
            shares,
            vec![
                Money::from_minor(3334),
                Money::from_minor(3333),
                Money::from_minor(3333)
            ]
        );
    }

    #[test]
    fn test_allocate_spreads_remainder_one_unit_each() {
        let shares = Money::from_major(200).allocate(3).unwrap();
        assert_eq!(
            shares,
            vec![
                Money::from_minor(6667),
                Money::from_minor(6667),
                Money::from_minor(6666)
            ]
        );
        assert_eq!(shares.iter().sum::<Money>(), Money::from_major(200));
    }

    #[test]
    fn test_allocate_zero_parts_is_degenerate() {
        let err = Money::from_major(10).allocate(0).unwrap_err();
        assert_eq!(
            err,
            LedgerError::DivisionDegenerate {
                amount: Money::from_major(10)
            }
        );
    }

    #[test]
    fn test_div_rem_negative_is_euclidean() {
        let (q, r) = Money::from_minor(-7).div_rem(3).unwrap();
        assert_eq!(q, Money::from_minor(-3));
        assert_eq!(r, Money::from_minor(2));
        assert_eq!(q * 3 + r, Money::from_minor(-7));
    }

    #[test]
    fn test_tolerance_default_only_zero() {
        let tol = Tolerance::default();
        assert!(tol.is_zero(Money::ZERO));
        assert!(!tol.is_zero(Money::from_minor(1)));
        assert!(tol.is_negative(Money::from_minor(-1)));
    }

    #[test]
    fn test_tolerance_one_paisa() {
        let tol = Tolerance::from_hundredths(150);
        assert!(tol.is_zero(Money::from_minor(-1)));
        assert!(!tol.is_zero(Money::from_minor(2)));
        assert!(tol.is_positive(Money::from_minor(2)));
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_minor(10050)).unwrap();
        assert_eq!(json, "\"100.50\"");
        let back: Money = serde_json::from_str("\"100.5\"").unwrap();
        assert_eq!(back, Money::from_minor(10050));
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
        assert_eq!(
            Money::from_minor(250).checked_mul(4),
            Some(Money::from_major(10))
        );
    }

    #[test]
    fn test_saturating_add_clamps() {
        assert_eq!(Money::MAX.saturating_add(Money::from_minor(1)), Money::MAX);
        assert_eq!(
            Money::from_minor(5).saturating_add(Money::from_minor(-7)),
            Money::from_minor(-2)
        );
    }
}
