use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Monetary amount carried on the wire, held as integer cents.
///
/// Serializes as a 2-decimal string (`"33.34"`). Deserializes from either a
/// decimal string or a JSON number, since clients send both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(pub i64);

// Amounts above this cannot be represented in cents without overflow.
const MAX_MONEY_UNITS: i64 = i64::MAX / 100;

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = String;

    /// Parses a decimal string into cents. Accepts `.` or `,` as decimal
    /// separator, an optional leading sign, and at most 2 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid amount: {s}");

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("empty amount".to_string());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let cents_str = parts.next().unwrap_or("");
        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if cents_str.len() > 2 || !cents_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;
        if units >= MAX_MONEY_UNITS {
            return Err(format!("amount too large: {s}"));
        }
        let mut cents: i64 = match cents_str {
            "" => 0,
            digits => digits.parse().map_err(|_| invalid())?,
        };
        if cents_str.len() == 1 {
            cents *= 10;
        }

        Ok(Money(sign * (units * 100 + cents)))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Money, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Money, E> {
        if !value.is_finite() {
            return Err(E::custom("invalid amount"));
        }
        let cents = (value * 100.0).round();
        if cents.abs() > MAX_MONEY_UNITS as f64 {
            return Err(E::custom(format!("amount too large: {value}")));
        }
        Ok(Money(cents as i64))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Money, E> {
        if value.abs() > MAX_MONEY_UNITS {
            return Err(E::custom(format!("amount too large: {value}")));
        }
        Ok(Money(value * 100))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Money, E> {
        i64::try_from(value)
            .map_err(|_| E::custom(format!("amount too large: {value}")))
            .and_then(|v| self.visit_i64(v))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

/// Percentage carried on the wire, held as tenths of a point (`333` is 33.3%).
///
/// Serializes as a JSON number with one decimal. Deserializes from a number
/// or a decimal string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percentage(pub i64);

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}

impl FromStr for Percentage {
    type Err = String;

    /// Parses a decimal string into tenths of a point, at most 1 fractional
    /// digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid percentage: {s}");

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("empty percentage".to_string());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let mut parts = rest.split('.');
        let points_str = parts.next().ok_or_else(invalid)?;
        let tenths_str = parts.next().unwrap_or("");
        if parts.next().is_some() {
            return Err(invalid());
        }

        if points_str.is_empty() || !points_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if tenths_str.len() > 1 || !tenths_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let points: i64 = points_str.parse().map_err(|_| invalid())?;
        let tenths: i64 = match tenths_str {
            "" => 0,
            digit => digit.parse().map_err(|_| invalid())?,
        };

        Ok(Percentage(sign * (points * 10 + tenths)))
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 10.0)
    }
}

struct PercentageVisitor;

impl Visitor<'_> for PercentageVisitor {
    type Value = Percentage;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a percentage as a number or string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Percentage, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Percentage, E> {
        if !value.is_finite() {
            return Err(E::custom("invalid percentage"));
        }
        let tenths = (value * 10.0).round();
        if tenths.abs() > (i64::MAX / 10) as f64 {
            return Err(E::custom(format!("percentage out of range: {value}")));
        }
        Ok(Percentage(tenths as i64))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Percentage, E> {
        value
            .checked_mul(10)
            .map(Percentage)
            .ok_or_else(|| E::custom(format!("percentage out of range: {value}")))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Percentage, E> {
        i64::try_from(value)
            .map_err(|_| E::custom(format!("percentage out of range: {value}")))
            .and_then(|v| self.visit_i64(v))
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PercentageVisitor)
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub email: String,
        pub password: String,
        pub first_name: String,
        pub last_name: String,
        pub phone: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Registered {
        pub id: Uuid,
    }

    /// Current account, as served by `GET /api/me`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub phone: Option<String>,
        /// Display convenience: `"{first_name} {last_name}"`.
        pub name: String,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub title: String,
        #[serde(rename = "memberEmails", default)]
        pub member_emails: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        #[serde(rename = "groupId")]
        pub group_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersAdd {
        #[serde(rename = "memberEmails")]
        pub member_emails: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: Uuid,
        pub name: String,
        pub email: String,
    }

    /// A group in the listing, without its member roster.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupSummary {
        pub id: Uuid,
        pub title: String,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
    }

    /// A single group with its members, as served by `GET /api/groups/{id}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub title: String,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
        pub members: Vec<MemberView>,
    }
}

pub mod expense {
    use super::*;

    /// How an expense's total is divided among participants.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SplitType {
        Even,
        Percentage,
        /// Fixed amount per participant; the wire name is `"amount"`.
        Amount,
    }

    /// One participant entry in an expense creation request.
    ///
    /// `amount` is read for `"amount"` splits, `percentage` for
    /// `"percentage"` splits; the other field is ignored. Even splits need
    /// neither.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitInput {
        pub user_id: Uuid,
        pub amount: Option<Money>,
        pub percentage: Option<Percentage>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub title: String,
        pub total_amount: Money,
        pub description: Option<String>,
        pub split_type: SplitType,
        pub splits: Vec<SplitInput>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub split_id: Uuid,
        pub user_id: Uuid,
        pub user_name: String,
        pub amount: Money,
        pub percentage: Percentage,
        pub is_accepted: bool,
        pub is_paid: bool,
    }

    /// An expense with its splits, as served by every expense read endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub expense_id: Uuid,
        pub group_id: Uuid,
        pub group_title: String,
        pub title: String,
        pub total_amount: Money,
        pub description: Option<String>,
        pub split_type: SplitType,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
        pub is_settled: bool,
        pub splits: Vec<SplitView>,
    }
}

pub mod split {
    use super::*;

    /// Body of `PUT /api/expenses/{expense_id}/splits/{split_id}`.
    ///
    /// Flags are one-way: `true` raises, `false` leaves unchanged.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitUpdate {
        #[serde(default)]
        pub is_accepted: bool,
        #[serde(default)]
        pub is_paid: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formats_with_two_decimals() {
        assert_eq!(Money(33_34).to_string(), "33.34");
        assert_eq!(Money(500).to_string(), "5.00");
        assert_eq!(Money(-120).to_string(), "-1.20");
        assert_eq!(Money(5).to_string(), "0.05");
    }

    #[test]
    fn money_parses_strings_and_numbers() {
        assert_eq!(serde_json::from_str::<Money>("\"33.34\"").unwrap(), Money(33_34));
        assert_eq!(serde_json::from_str::<Money>("\"10,5\"").unwrap(), Money(10_50));
        assert_eq!(serde_json::from_str::<Money>("33.34").unwrap(), Money(33_34));
        assert_eq!(serde_json::from_str::<Money>("20").unwrap(), Money(20_00));
        assert_eq!(serde_json::from_str::<Money>("\"-3.5\"").unwrap(), Money(-350));
        assert!(serde_json::from_str::<Money>("\"12.345\"").is_err());
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
        assert!(serde_json::from_str::<Money>("\"\"").is_err());
    }

    #[test]
    fn money_serializes_as_string() {
        let json = serde_json::to_string(&Money(20_00)).unwrap();
        assert_eq!(json, "\"20.00\"");
    }

    #[test]
    fn percentage_round_trips_as_number() {
        let json = serde_json::to_string(&Percentage(334)).unwrap();
        assert_eq!(json, "33.4");
        assert_eq!(serde_json::from_str::<Percentage>(&json).unwrap(), Percentage(334));
        assert_eq!(serde_json::from_str::<Percentage>("60").unwrap(), Percentage(600));
        assert_eq!(serde_json::from_str::<Percentage>("\"33.3\"").unwrap(), Percentage(333));
        assert!(serde_json::from_str::<Percentage>("\"33.33\"").is_err());
    }

    #[test]
    fn expense_request_accepts_client_payload() {
        let body = r#"{
            "title": "Dinner",
            "total_amount": "50.00",
            "description": "after the match",
            "split_type": "percentage",
            "splits": [
                {"user_id": "7f9a7bb2-5f48-4b69-b25c-55a6ad5c9c1c", "amount": 30.0, "percentage": 60.0},
                {"user_id": "6a6fa65e-79c5-47a4-9ef5-2b2e55c6a967", "amount": 20.0, "percentage": 40.0}
            ]
        }"#;
        let request: expense::ExpenseNew = serde_json::from_str(body).unwrap();
        assert_eq!(request.total_amount, Money(50_00));
        assert_eq!(request.split_type, expense::SplitType::Percentage);
        assert_eq!(request.splits.len(), 2);
        assert_eq!(request.splits[0].percentage, Some(Percentage(600)));
        assert_eq!(request.splits[0].amount, Some(Money(30_00)));
    }

    #[test]
    fn group_request_uses_camel_case_member_emails() {
        let body = r#"{"title": "Trip", "memberEmails": ["bob@example.com"]}"#;
        let request: group::GroupNew = serde_json::from_str(body).unwrap();
        assert_eq!(request.member_emails, vec!["bob@example.com".to_string()]);

        let body = r#"{"title": "Trip"}"#;
        let request: group::GroupNew = serde_json::from_str(body).unwrap();
        assert!(request.member_emails.is_empty());
    }

    #[test]
    fn split_update_defaults_missing_flags_to_false() {
        let update: split::SplitUpdate = serde_json::from_str(r#"{"is_accepted": true}"#).unwrap();
        assert!(update.is_accepted);
        assert!(!update.is_paid);
    }
}
