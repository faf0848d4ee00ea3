//! Value Objects for the marketplace

use chrono::{NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable document code such as `PB-20250614-7QK2ZD`.
///
/// Orders and invoices share the format and only differ in prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentCode(String);

pub const ORDER_PREFIX: &str = "PB";
pub const INVOICE_PREFIX: &str = "INV";

impl DocumentCode {
    pub fn generate(prefix: &str) -> Self { Self::generate_on(prefix, Utc::now().date_naive()) }

    pub fn generate_on(prefix: &str, date: NaiveDate) -> Self {
        let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect();
        Self(format!("{}-{}-{}", prefix, date.format("%Y%m%d"), suffix.to_uppercase()))
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, CodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(CodeError::Empty); }
        if value.len() > 50 { return Err(CodeError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') { return Err(CodeError::InvalidCharacter); }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CodeError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for CodeError {}
impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "code empty"),
            Self::TooLong => write!(f, "code too long"),
            Self::InvalidCharacter => write!(f, "code contains invalid characters"),
        }
    }
}

/// Integer rupiah amount. The currency has no minor unit in practice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rupiah(i64);

impl Rupiah {
    pub const ZERO: Rupiah = Rupiah(0);

    pub const fn new(amount: i64) -> Self { Self(amount) }
    pub fn amount(&self) -> i64 { self.0 }
    pub fn is_positive(&self) -> bool { self.0 > 0 }
    pub fn add(&self, other: Rupiah) -> Result<Rupiah, MoneyError> { self.0.checked_add(other.0).map(Rupiah).ok_or(MoneyError::Overflow) }
    pub fn subtract(&self, other: Rupiah) -> Result<Rupiah, MoneyError> {
        if other.0 > self.0 { return Err(MoneyError::Insufficient); }
        Ok(Rupiah(self.0 - other.0))
    }
    pub fn multiply(&self, qty: u32) -> Result<Rupiah, MoneyError> { self.0.checked_mul(i64::from(qty)).map(Rupiah).ok_or(MoneyError::Overflow) }

    pub fn checked_sum(amounts: impl IntoIterator<Item = Rupiah>) -> Result<Rupiah, MoneyError> {
        amounts.into_iter().try_fold(Rupiah::ZERO, |acc, r| acc.add(r))
    }
}

impl fmt::Display for Rupiah {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 { grouped.push('.'); }
            grouped.push(c);
        }
        if self.0 < 0 { write!(f, "-Rp {}", grouped) } else { write!(f, "Rp {}", grouped) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { Overflow, Insufficient }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Overflow => write!(f, "amount overflow"), Self::Insufficient => write!(f, "insufficient amount") }
    }
}

/// Review rating, 1 to 5 stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i32) -> Result<Self, RatingError> {
        if !(1..=5).contains(&value) { return Err(RatingError(value)); }
        Ok(Self(value as u8))
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Rating::new(value) }
}

impl From<Rating> for i32 { fn from(r: Rating) -> Self { i32::from(r.0) } }

#[derive(Debug, Clone, PartialEq, Eq)] pub struct RatingError(pub i32);
impl std::error::Error for RatingError {}
impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "rating {} outside 1..=5", self.0) }
}

/// URL slug derived from a display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        for c in name.trim().to_lowercase().chars() {
            if c.is_ascii_alphanumeric() { slug.push(c); }
            else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') { slug.push('-'); }
        }
        Self(slug.trim_matches('-').to_string())
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_code_format() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let code = DocumentCode::generate_on(ORDER_PREFIX, date);
        assert!(code.as_str().starts_with("PB-20250614-"));
        assert_eq!(code.as_str().len(), "PB-20250614-".len() + 6);
        assert_eq!(DocumentCode::parse(code.as_str().to_lowercase()).unwrap(), code);
    }

    #[test]
    fn test_code_rejects_garbage() {
        assert_eq!(DocumentCode::parse("   "), Err(CodeError::Empty));
        assert_eq!(DocumentCode::parse("PB 1"), Err(CodeError::InvalidCharacter));
        assert_eq!(DocumentCode::parse("X".repeat(51)), Err(CodeError::TooLong));
    }

    #[test]
    fn test_rupiah_display() {
        assert_eq!(Rupiah::new(1_250_000).to_string(), "Rp 1.250.000");
        assert_eq!(Rupiah::new(950).to_string(), "Rp 950");
        assert_eq!(Rupiah::new(-12_000).to_string(), "-Rp 12.000");
    }

    #[test]
    fn test_rupiah_arithmetic() {
        let a = Rupiah::new(15_000);
        assert_eq!(a.multiply(3).unwrap(), Rupiah::new(45_000));
        assert_eq!(a.subtract(Rupiah::new(20_000)), Err(MoneyError::Insufficient));
        assert_eq!(Rupiah::new(i64::MAX).add(a), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert!(Rating::new(6).is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(Slug::from_name("  Toko Baju  Bekas! ").as_str(), "toko-baju-bekas");
        assert_eq!(Slug::from_name("Kamera_Analog-35mm").as_str(), "kamera-analog-35mm");
    }
}
