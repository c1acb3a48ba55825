//! Request-shape validation for incoming records.
//!
//! Bodies are first decoded into loosely typed `*Input` structs so that a
//! missing field or a wrong amount type is reported as a [`ValidationError`]
//! naming the field, rather than a generic decoding failure.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Amount, NewExpense, NewTopUp, NewTransfer, UserId};

/// Reason a request body was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or `null`.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A required text field was empty or only whitespace.
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// An amount was not a usable number.
    #[error("invalid amount in `{field}`: {reason}")]
    InvalidAmount {
        /// Field holding the amount.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// A referenced user does not exist.
    #[error("unknown user {0}")]
    UnknownUser(UserId),

    /// A transfer named the same user on both sides.
    #[error("transfer source and target must differ (user {0})")]
    SameParty(UserId),

    /// The body was not valid JSON or had the wrong overall shape.
    #[error("malformed request body: {0}")]
    Malformed(String),
}

/// Result of validating one request body.
pub type Validated<T> = Result<T, ValidationError>;

/// Loosely typed expense creation body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseInput {
    /// Expense date.
    #[serde(default)]
    pub date: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Payer name.
    #[serde(default)]
    pub payer: Option<String>,
    /// Amount, any JSON type until validated.
    #[serde(default)]
    pub amount: Option<Value>,
}

impl TryFrom<ExpenseInput> for NewExpense {
    type Error = ValidationError;

    #[inline]
    fn try_from(input: ExpenseInput) -> Validated<Self> {
        Ok(Self {
            date: required_text("date", input.date)?,
            description: required_text("description", input.description)?,
            payer: required_text("payer", input.payer)?,
            amount: numeric_amount("amount", input.amount)?,
        })
    }
}

/// Loosely typed top-up creation body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopUpInput {
    /// User name.
    #[serde(default)]
    pub user: Option<String>,
    /// Amount, a number or a numeric string.
    #[serde(default)]
    pub amount: Option<Value>,
}

impl TryFrom<TopUpInput> for NewTopUp {
    type Error = ValidationError;

    #[inline]
    fn try_from(input: TopUpInput) -> Validated<Self> {
        Ok(Self {
            user: required_text("user", input.user)?,
            amount: topup_amount("amount", input.amount)?,
        })
    }
}

/// Loosely typed transfer creation body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    /// Amount to transfer.
    #[serde(default)]
    pub amount: Option<Value>,
    /// Optional transfer date.
    #[serde(default)]
    pub date: Option<String>,
    /// Sending user.
    #[serde(default)]
    pub source_id: Option<UserId>,
    /// Receiving user.
    #[serde(default)]
    pub target_id: Option<UserId>,
}

impl TryFrom<TransferInput> for NewTransfer {
    type Error = ValidationError;

    #[inline]
    fn try_from(input: TransferInput) -> Validated<Self> {
        let amount = numeric_amount("amount", input.amount)?;
        if amount <= 0.0 {
            return Err(ValidationError::InvalidAmount {
                field: "amount",
                reason: "must be greater than zero".to_owned(),
            });
        }
        let source_id = input
            .source_id
            .ok_or(ValidationError::MissingField("sourceId"))?;
        let target_id = input
            .target_id
            .ok_or(ValidationError::MissingField("targetId"))?;
        if source_id == target_id {
            return Err(ValidationError::SameParty(source_id));
        }
        let date = match input.date {
            Some(date) => Some(non_empty("date", date)?),
            None => None,
        };
        Ok(Self {
            amount,
            date,
            source_id,
            target_id,
        })
    }
}

/// Requires a present, non-blank string.
fn required_text(field: &'static str, value: Option<String>) -> Validated<String> {
    non_empty(field, value.ok_or(ValidationError::MissingField(field))?)
}

/// Rejects blank strings.
fn non_empty(field: &'static str, value: String) -> Validated<String> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(value)
    }
}

/// Requires a JSON number.
fn numeric_amount(field: &'static str, value: Option<Value>) -> Validated<f64> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Number(number)) => number.as_f64().ok_or_else(|| invalid(field, "out of range")),
        Some(other) => Err(invalid(
            field,
            &format!("expected a number, found {}", json_type(&other)),
        )),
    }
}

/// Accepts a JSON number, or a numeric string kept verbatim.
fn topup_amount(field: &'static str, value: Option<Value>) -> Validated<Amount> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(Amount::Number)
            .ok_or_else(|| invalid(field, "out of range")),
        Some(Value::String(text)) => {
            let amount = Amount::Text(text);
            if amount.value().is_some() {
                Ok(amount)
            } else {
                Err(invalid(field, "text amount is not a number"))
            }
        }
        Some(other) => Err(invalid(
            field,
            &format!("expected a number, found {}", json_type(&other)),
        )),
    }
}

/// Builds an [`ValidationError::InvalidAmount`].
fn invalid(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidAmount {
        field,
        reason: reason.to_owned(),
    }
}

/// Names the JSON type of a value for error messages.
const fn json_type(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
