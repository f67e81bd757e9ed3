//! Value Objects for the storefront

use chrono::Utc;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Money value object: a USD amount held at cent precision.
///
/// Serialized as a JSON number. Deserializes from a number or from a string,
/// with an optional leading `$` (the browser cart keeps prices as `"$24.99"`).
/// Amounts are bounded by [`Money::MAX_CENTS`] in either direction so every
/// value fits the cents columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// $10,000,000,000.00
    pub const MAX_CENTS: i64 = 1_000_000_000_000;

    /// Rounds to the cent and rejects amounts outside the supported range.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded.abs() > Self::max_amount() {
            return Err(MoneyError(amount.to_string()));
        }
        Ok(Self(rounded))
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    fn max_amount() -> Decimal {
        Decimal::new(Self::MAX_CENTS, 2)
    }

    /// Smallest difference two amounts may show and still be treated as equal.
    pub fn tolerance() -> Self {
        Self::from_cents(1)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn cents(&self) -> Result<i64, MoneyError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .filter(|c| c.abs() <= Self::MAX_CENTS)
            .ok_or_else(|| MoneyError(self.0.to_string()))
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_mul(&self, qty: u32) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(Decimal::from(qty))
            .ok_or_else(|| MoneyError(format!("{} x {}", self.0, qty)))
            .and_then(Money::new)
    }

    pub fn checked_add(&self, rhs: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(rhs.0)
            .ok_or_else(|| MoneyError(format!("{} + {}", self.0, rhs.0)))
            .and_then(Money::new)
    }

    pub fn checked_sum<I>(amounts: I) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }

    /// True when the two amounts differ by no more than one cent.
    pub fn matches(&self, other: &Money) -> bool {
        self.0
            .checked_sub(other.0)
            .is_some_and(|diff| diff.abs() <= Self::tolerance().0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyError(String);
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid amount: {}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
        Decimal::from_str(digits).map_err(|_| MoneyError(s.to_string())).and_then(Money::new)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Decimal::from_f64(value).ok_or_else(|| MoneyError(value.to_string())).and_then(Money::new)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl<'de> de::Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number or a price string such as \"$24.99\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                Money::new(Decimal::from(v)).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                Money::new(Decimal::from(v)).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::try_from(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

/// Payment method chosen at checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "card", alias = "stripe")]
    Card,
    #[serde(rename = "paypal")]
    Paypal,
    #[serde(rename = "cod", alias = "cash-on-delivery")]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Paypal => "paypal",
            Self::CashOnDelivery => "cod",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "stripe" => Ok(Self::Card),
            "paypal" => Ok(Self::Paypal),
            "cod" | "cash-on-delivery" | "cash_on_delivery" => Ok(Self::CashOnDelivery),
            other => Err(format!("unsupported payment method: {other}")),
        }
    }
}

/// Human-facing order token, `ORD-<millis>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const PREFIX: &'static str = "ORD-";

    pub fn from_token(token: u64) -> Self {
        Self(format!("{}{}", Self::PREFIX, token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues order numbers from the wall clock in milliseconds. Tokens are
/// strictly increasing within a process: when the clock has not moved past
/// the last issued token, the next token is last + 1.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    last: AtomicU64,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> OrderNumber {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return OrderNumber::from_token(candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// How a caller addressed an order: numeric input is the surrogate id,
/// anything else is an order number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderRef {
    Id(i64),
    Number(String),
}

impl OrderRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = raw.parse() {
                return Self::Id(id);
            }
        }
        Self::Number(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_parse() {
        assert_eq!("$24.99".parse::<Money>().unwrap(), Money::from_cents(2499));
        assert_eq!(" 10 ".parse::<Money>().unwrap(), Money::from_cents(1000));
        assert!("ten dollars".parse::<Money>().is_err());
        assert_eq!(Money::try_from(5.99).unwrap().cents().unwrap(), 599);
    }

    #[test]
    fn test_money_bounds() {
        assert!("100000000000000000".parse::<Money>().is_err());
        assert!("79228162514264337593543950335".parse::<Money>().is_err());
        assert!(serde_json::from_str::<Money>("1e30").is_err());
        assert!(serde_json::from_str::<Money>("18446744073709551615").is_err());

        let max = Money::from_cents(Money::MAX_CENTS);
        assert_eq!(max.cents().unwrap(), Money::MAX_CENTS);
        assert!(max.checked_add(Money::from_cents(1)).is_err());
        assert!(max.checked_mul(2).is_err());
        assert!(Money::from_cents(i64::MAX).cents().is_err());
    }

    #[test]
    fn test_money_json() {
        let m: Money = serde_json::from_str("25.99").unwrap();
        assert_eq!(m.cents().unwrap(), 2599);
        let m: Money = serde_json::from_str("\"$10.00\"").unwrap();
        assert_eq!(m, Money::from_cents(1000));
        assert_eq!(serde_json::to_string(&Money::from_cents(2599)).unwrap(), "25.99");
    }

    #[test]
    fn test_money_arithmetic() {
        let tee = Money::from_cents(1000).checked_mul(2).unwrap();
        let total = tee.checked_add(Money::from_cents(599)).unwrap();
        assert_eq!(Money::checked_sum([tee, tee]).unwrap(), Money::from_cents(4000));
        assert_eq!(total, Money::from_cents(2599));
        assert!(total.matches(&Money::from_cents(2600)));
        assert!(!total.matches(&Money::from_cents(2601)));
        assert_eq!(total.to_string(), "$25.99");
    }

    #[test]
    fn test_payment_method() {
        assert_eq!("cod".parse::<PaymentMethod>().unwrap(), PaymentMethod::CashOnDelivery);
        assert_eq!("Cash-On-Delivery".parse::<PaymentMethod>().unwrap(), PaymentMethod::CashOnDelivery);
        assert_eq!(serde_json::to_string(&PaymentMethod::Card).unwrap(), "\"card\"");
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_order_numbers_strictly_increase() {
        let gen = OrderNumberGenerator::new();
        let numbers: Vec<OrderNumber> = (0..1000).map(|_| gen.next()).collect();
        let tokens: Vec<u64> = numbers
            .iter()
            .map(|n| n.as_str().trim_start_matches(OrderNumber::PREFIX).parse().unwrap())
            .collect();
        assert!(tokens.windows(2).all(|w| w[0] < w[1]));
        assert!(numbers[0].as_str().starts_with("ORD-"));
    }

    #[test]
    fn test_order_ref() {
        assert_eq!(OrderRef::parse("42"), OrderRef::Id(42));
        assert_eq!(OrderRef::parse("ORD-1700000000000"), OrderRef::Number("ORD-1700000000000".into()));
        assert_eq!(OrderRef::parse("1e3"), OrderRef::Number("1e3".into()));
    }
}
