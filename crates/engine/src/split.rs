//! Split computation.
//!
//! Converts an expense total plus a strategy selection into a reconciled,
//! ordered list of per-member shares. Pure arithmetic, no side effects.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amount, EngineError, Percent, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    Even,
    Percentage,
    FixedAmount,
}

impl SplitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Even => "even",
            Self::Percentage => "percentage",
            Self::FixedAmount => "amount",
        }
    }
}

impl TryFrom<&str> for SplitKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "even" => Ok(Self::Even),
            "percentage" => Ok(Self::Percentage),
            "amount" => Ok(Self::FixedAmount),
            other => Err(EngineError::Validation(format!(
                "invalid split type: {other}"
            ))),
        }
    }
}

/// One participant's computed share of an expense total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Share {
    pub member_id: Uuid,
    pub amount: Amount,
    pub percent: Percent,
}

/// How an expense total is divided among its participants.
///
/// Strategy parameters only exist on the variants that need them, so a
/// percentage can never ride along with an even split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitSpec {
    Even { members: Vec<Uuid> },
    Percentage { shares: Vec<(Uuid, Percent)> },
    FixedAmount { shares: Vec<(Uuid, Amount)> },
}

/// Divides `numerator / denominator` rounding half up.
/// Callers guarantee `numerator >= 0` and `denominator > 0`.
fn div_half_up(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator / 2) / denominator
}

impl SplitSpec {
    pub fn kind(&self) -> SplitKind {
        match self {
            Self::Even { .. } => SplitKind::Even,
            Self::Percentage { .. } => SplitKind::Percentage,
            Self::FixedAmount { .. } => SplitKind::FixedAmount,
        }
    }

    fn member_ids(&self) -> Vec<Uuid> {
        match self {
            Self::Even { members } => members.clone(),
            Self::Percentage { shares } => shares.iter().map(|(id, _)| *id).collect(),
            Self::FixedAmount { shares } => shares.iter().map(|(id, _)| *id).collect(),
        }
    }

    /// Computes the reconciled shares for `total`.
    ///
    /// The output preserves the input member order. Guarantees by strategy:
    ///
    /// - `Even`: `sum(amount) == total` and `sum(percent) == 100.0` exactly.
    ///   Leftover cents (and percent tenths) from the integer division go one
    ///   each to the first members in order, so 100.00 over three members
    ///   yields 33.34 / 33.33 / 33.33.
    /// - `Percentage`: supplied percentages must sum to 100 within 0.1
    ///   percentage point; each amount is `total * percent / 100` rounded
    ///   half up to the cent.
    /// - `FixedAmount`: supplied amounts must sum to `total` within 0.01;
    ///   each percentage is `amount / total * 100` rounded half up to the
    ///   tenth.
    pub fn compute(&self, total: Amount) -> ResultEngine<Vec<Share>> {
        if !total.is_positive() {
            return Err(EngineError::Validation(
                "total amount must be positive".to_string(),
            ));
        }

        let members = self.member_ids();
        if members.is_empty() {
            return Err(EngineError::Validation(
                "at least one participant is required".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(members.len());
        for id in &members {
            if !seen.insert(*id) {
                return Err(EngineError::Validation(format!(
                    "duplicate participant: {id}"
                )));
            }
        }

        match self {
            Self::Even { members } => Ok(Self::compute_even(total, members)),
            Self::Percentage { shares } => Self::compute_percentage(total, shares),
            Self::FixedAmount { shares } => Self::compute_fixed(total, shares),
        }
    }

    fn compute_even(total: Amount, members: &[Uuid]) -> Vec<Share> {
        let count = members.len() as i64;
        let base_cents = total.cents() / count;
        let extra_cents = total.cents() % count;
        let base_tenths = Percent::HUNDRED.tenths() / count;
        let extra_tenths = Percent::HUNDRED.tenths() % count;

        members
            .iter()
            .enumerate()
            .map(|(position, member_id)| {
                let position = position as i64;
                let amount = base_cents + i64::from(position < extra_cents);
                let percent = base_tenths + i64::from(position < extra_tenths);
                Share {
                    member_id: *member_id,
                    amount: Amount::new(amount),
                    percent: Percent::new(percent),
                }
            })
            .collect()
    }

    fn compute_percentage(total: Amount, shares: &[(Uuid, Percent)]) -> ResultEngine<Vec<Share>> {
        let mut sum = Percent::ZERO;
        for (id, percent) in shares {
            if !percent.is_share() {
                return Err(EngineError::Validation(format!(
                    "percentage for {id} must be between 0 and 100, got {percent}"
                )));
            }
            sum = sum
                .checked_add(*percent)
                .ok_or_else(|| EngineError::Validation("percentage too large".to_string()))?;
        }

        let deviation = sum - Percent::HUNDRED;
        if deviation.abs().tenths() > 1 {
            return Err(EngineError::Validation(format!(
                "percentages must sum to 100, got {sum} (off by {deviation})"
            )));
        }

        shares
            .iter()
            .map(|(member_id, percent)| {
                let cents = total
                    .cents()
                    .checked_mul(percent.tenths())
                    .map(|product| div_half_up(product, 1000))
                    .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
                Ok(Share {
                    member_id: *member_id,
                    amount: Amount::new(cents),
                    percent: *percent,
                })
            })
            .collect()
    }

    fn compute_fixed(total: Amount, shares: &[(Uuid, Amount)]) -> ResultEngine<Vec<Share>> {
        let mut sum = Amount::ZERO;
        for (id, amount) in shares {
            if amount.is_negative() {
                return Err(EngineError::Validation(format!(
                    "amount for {id} must not be negative, got {amount}"
                )));
            }
            sum = sum
                .checked_add(*amount)
                .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
        }

        let remaining = total - sum;
        if remaining.abs().cents() > 1 {
            return Err(EngineError::Validation(format!(
                "amounts must sum to {total}, remaining {remaining}"
            )));
        }

        shares
            .iter()
            .map(|(member_id, amount)| {
                let tenths = amount
                    .cents()
                    .checked_mul(1000)
                    .map(|product| div_half_up(product, total.cents()))
                    .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
                Ok(Share {
                    member_id: *member_id,
                    amount: *amount,
                    percent: Percent::new(tenths),
                })
            })
            .collect()
    }
}
