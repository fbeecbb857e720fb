use std::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use crate::EngineError;

/// Percentage represented as **integer tenths** of a percentage point.
///
/// Shares are displayed with one decimal, so a resolution of 0.1 percentage
/// point is exact: `33.3%` is stored as `333`. The reconciliation tolerance of
/// 0.1 percentage point becomes a comparison against one tenth.
///
/// # Examples
///
/// ```rust
/// use engine::Percent;
///
/// let share = Percent::new(33_4);
/// assert_eq!(share.tenths(), 334);
/// assert_eq!(share.to_string(), "33.4");
/// assert_eq!("60".parse::<Percent>().unwrap(), Percent::new(600));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    /// 100%, the target sum of every percentage split.
    pub const HUNDRED: Percent = Percent(1000);

    /// Creates a new percentage from integer tenths of a point.
    #[must_use]
    pub const fn new(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Returns the raw value in tenths of a percentage point.
    #[must_use]
    pub const fn tenths(self) -> i64 {
        self.0
    }

    /// Returns the value as a 1-decimal floating point number, for display
    /// and wire serialization only.
    #[must_use]
    pub fn points(self) -> f64 {
        self.0 as f64 / 10.0
    }

    /// Returns `true` if the value lies in the closed range `[0%, 100%]`.
    #[must_use]
    pub const fn is_share(self) -> bool {
        self.0 >= 0 && self.0 <= 1000
    }

    /// Absolute value in tenths.
    #[must_use]
    pub const fn abs(self) -> Percent {
        Percent(self.0.abs())
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Percent) -> Option<Percent> {
        self.0.checked_add(rhs.0).map(Percent)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let points = abs / 10;
        let tenths = abs % 10;
        write!(f, "{sign}{points}.{tenths}")
    }
}

impl From<i64> for Percent {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Percent> for i64 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl Add for Percent {
    type Output = Percent;

    fn add(self, rhs: Percent) -> Self::Output {
        Percent(self.0 + rhs.0)
    }
}

impl AddAssign for Percent {
    fn add_assign(&mut self, rhs: Percent) {
        self.0 += rhs.0;
    }
}

impl Sub for Percent {
    type Output = Percent;

    fn sub(self, rhs: Percent) -> Self::Output {
        Percent(self.0 - rhs.0)
    }
}

impl SubAssign for Percent {
    fn sub_assign(&mut self, rhs: Percent) {
        self.0 -= rhs.0;
    }
}

impl FromStr for Percent {
    type Err = EngineError;

    /// Parses a decimal string into tenths of a percentage point.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading sign.
    ///
    /// Validation rules:
    /// - max 1 fractional digit (rejects `33.33`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::Validation("empty percentage".to_string());
        let invalid = || EngineError::Validation("invalid percentage".to_string());
        let overflow = || EngineError::Validation("percentage too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let points_str = parts.next().ok_or_else(invalid)?;
        let tenths_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if points_str.is_empty() || !points_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let points: i64 = points_str.parse().map_err(|_| invalid())?;

        let tenths: i64 = match tenths_str {
            None => 0,
            Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    0 => 0,
                    1 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(EngineError::Validation("too many decimals".to_string())),
                }
            }
        };

        let total = points
            .checked_mul(10)
            .and_then(|v| v.checked_add(tenths))
            .ok_or_else(overflow)?;

        let signed = if sign < 0 {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Percent(signed))
    }
}
