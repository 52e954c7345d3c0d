//! Relative-time expressions used to compute saga expiration deadlines.
//!
//! Grammar: one or more `[+|-]<integer> <unit>` terms separated by whitespace, or the
//! literal `now`. Units are case-insensitive, singular or plural: `second`/`sec`,
//! `minute`/`min`, `hour`, `day`, `week`. The number and unit may be written together
//! (`+1hour`). A missing sign means `+`.
//!
//! Examples: `+1 hour`, `-1 hour`, `+1 day 12 hours`, `90 minutes`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SagaError, SagaResult};
use crate::value_object::ValueObject;

/// Expiration rule applied when a saga is created without an explicit deadline.
pub const DEFAULT_EXPIRE_RULE: &str = "+1 hour";

/// A parsed relative-time expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExpireRule {
    expr: String,
    offset: Duration,
}

impl ExpireRule {
    pub fn parse(expr: &str) -> SagaResult<Self> {
        let offset = parse_offset(expr)?;
        Ok(Self {
            expr: expr.trim().to_string(),
            offset,
        })
    }

    /// Signed offset from "now".
    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Apply the offset to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> SagaResult<DateTime<Utc>> {
        now.checked_add_signed(self.offset).ok_or_else(|| {
            SagaError::invalid_expire_rule(format!(
                "`{}` overflows the supported date range",
                self.expr
            ))
        })
    }
}

impl Default for ExpireRule {
    fn default() -> Self {
        Self {
            expr: DEFAULT_EXPIRE_RULE.to_string(),
            offset: Duration::hours(1),
        }
    }
}

impl ValueObject for ExpireRule {}

impl core::fmt::Display for ExpireRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.expr)
    }
}

impl core::str::FromStr for ExpireRule {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExpireRule {
    type Error = SagaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExpireRule> for String {
    fn from(rule: ExpireRule) -> Self {
        rule.expr
    }
}

fn parse_offset(expr: &str) -> SagaResult<Duration> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(SagaError::invalid_expire_rule("empty expression"));
    }
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(Duration::zero());
    }

    let overflow = || SagaError::invalid_expire_rule(format!("`{trimmed}` is out of range"));

    let mut total_seconds: i64 = 0;
    let mut tokens = trimmed.split_whitespace();

    while let Some(token) = tokens.next() {
        let (sign, rest) = match token.strip_prefix('+') {
            Some(rest) => (1i64, rest),
            None => match token.strip_prefix('-') {
                Some(rest) => (-1i64, rest),
                None => (1i64, token),
            },
        };

        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, glued_unit) = rest.split_at(digits_end);
        if digits.is_empty() {
            return Err(SagaError::invalid_expire_rule(format!(
                "expected a number in `{trimmed}`, found `{token}`"
            )));
        }
        let amount: i64 = digits.parse().map_err(|_| overflow())?;

        let unit = if glued_unit.is_empty() {
            tokens.next().ok_or_else(|| {
                SagaError::invalid_expire_rule(format!("missing unit after `{token}` in `{trimmed}`"))
            })?
        } else {
            glued_unit
        };

        let term = amount
            .checked_mul(unit_seconds(unit, trimmed)?)
            .and_then(|secs| secs.checked_mul(sign))
            .ok_or_else(overflow)?;
        total_seconds = total_seconds.checked_add(term).ok_or_else(overflow)?;
    }

    Duration::try_seconds(total_seconds).ok_or_else(overflow)
}

fn unit_seconds(unit: &str, expr: &str) -> SagaResult<i64> {
    let unit = unit.to_ascii_lowercase();
    let seconds = match unit.as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        other => {
            return Err(SagaError::invalid_expire_rule(format!(
                "unknown unit `{other}` in `{expr}`"
            )));
        }
    };
    Ok(seconds)
}
