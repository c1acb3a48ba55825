//! Transaction and transfer models.

use serde::{Deserialize, Serialize};

use super::{TransactionId, User, UserId, UserRef};

/// Discriminates what a [`Transaction`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A shared expense split among participants.
    Expense,
    /// Money moved from the payer to a single recipient.
    Transfer,
}

impl core::fmt::Display for TransactionKind {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::Expense => f.write_str("expense"),
            Self::Transfer => f.write_str("transfer"),
        }
    }
}

/// An expense or a transfer between users.
///
/// A transfer always has exactly one participant, the recipient. The
/// constructors and the deserializer both enforce this, which is why the
/// fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTransaction")]
pub struct Transaction {
    /// Store-assigned identifier.
    id: TransactionId,
    /// Expense or transfer.
    kind: TransactionKind,
    /// Free-form description.
    description: String,
    /// Amount of money involved.
    amount: f64,
    /// Transaction date (`YYYY-MM-DD`).
    date: String,
    /// Who paid.
    payer: UserRef,
    /// Who benefits; the single recipient for a transfer.
    participants: Vec<UserRef>,
}

/// Wire shape of a transaction before the kind invariant is checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    /// Identifier.
    id: TransactionId,
    /// Kind.
    kind: TransactionKind,
    /// Description.
    #[serde(default)]
    description: String,
    /// Amount.
    amount: f64,
    /// Date.
    date: String,
    /// Payer.
    payer: UserRef,
    /// Participants.
    participants: Vec<UserRef>,
}

/// Rejection for a transfer that does not have exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transfer {id} must have exactly one participant, found {found}")]
pub struct InvalidTransfer {
    /// Offending transaction.
    pub id: TransactionId,
    /// Number of participants found.
    pub found: usize,
}

/// Rejects a transfer that does not name exactly one recipient.
impl TryFrom<RawTransaction> for Transaction {
    type Error = InvalidTransfer;

    /// Checks the participant count, then keeps the record as read.
    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        if raw.kind == TransactionKind::Transfer && raw.participants.len() != 1 {
            return Err(InvalidTransfer {
                id: raw.id,
                found: raw.participants.len(),
            });
        }
        Ok(Self {
            id: raw.id,
            kind: raw.kind,
            description: raw.description,
            amount: raw.amount,
            date: raw.date,
            payer: raw.payer,
            participants: raw.participants,
        })
    }
}

impl Transaction {
    /// Creates an expense transaction shared among `participants`.
    #[inline]
    #[must_use]
    pub fn expense(
        id: TransactionId,
        description: String,
        amount: f64,
        date: String,
        payer: UserRef,
        participants: Vec<UserRef>,
    ) -> Self {
        Self {
            id,
            kind: TransactionKind::Expense,
            description,
            amount,
            date,
            payer,
            participants,
        }
    }

    /// Creates a transfer from `source` to `target`.
    #[inline]
    #[must_use]
    pub fn transfer(
        id: TransactionId,
        amount: f64,
        date: String,
        source: UserRef,
        target: UserRef,
    ) -> Self {
        let description = format!("Transfer to {}", target.name);
        Self {
            id,
            kind: TransactionKind::Transfer,
            description,
            amount,
            date,
            payer: source,
            participants: vec![target],
        }
    }

    /// Returns the identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the amount.
    #[inline]
    #[must_use]
    pub const fn amount(&self) -> f64 {
        self.amount
    }

    /// Returns the date.
    #[inline]
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the payer.
    #[inline]
    #[must_use]
    pub const fn payer(&self) -> &UserRef {
        &self.payer
    }

    /// Returns the participants in stored order.
    #[inline]
    #[must_use]
    pub fn participants(&self) -> &[UserRef] {
        &self.participants
    }

    /// Returns the recipient of a transfer, or `None` for an expense.
    #[inline]
    #[must_use]
    pub fn recipient(&self) -> Option<&UserRef> {
        match self.kind {
            TransactionKind::Transfer => self.participants.first(),
            TransactionKind::Expense => None,
        }
    }
}

/// Request to move money between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransfer {
    /// Amount to transfer.
    pub amount: f64,
    /// Transfer date; defaults to the current UTC date when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Sending user.
    pub source_id: UserId,
    /// Receiving user.
    pub target_id: UserId,
}

/// A stored transfer with both parties resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Identifier of the recorded transaction.
    pub id: TransactionId,
    /// Amount transferred.
    pub amount: f64,
    /// Transfer date.
    pub date: String,
    /// Sending user.
    pub source: User,
    /// Receiving user.
    pub target: User,
}

/// An expense transaction with its payer and participants resolved to
/// full user records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDetails {
    /// Identifier of the recorded transaction.
    pub id: TransactionId,
    /// Free-form description.
    pub description: String,
    /// Total amount.
    pub amount: f64,
    /// Expense date.
    pub date: String,
    /// Who paid.
    pub payer: User,
    /// Who shares the cost, in stored order.
    pub participants: Vec<User>,
}

impl ExpenseDetails {
    /// Resolves an expense transaction against the stored users.
    ///
    /// Returns `None` for a transfer, or when the payer or a participant is
    /// no longer among `users`.
    #[inline]
    #[must_use]
    pub fn resolve(transaction: &Transaction, users: &[User]) -> Option<Self> {
        if transaction.kind != TransactionKind::Expense {
            return None;
        }
        let lookup = |user_ref: &UserRef| users.iter().find(|user| user.id == user_ref.id).cloned();
        let payer = lookup(&transaction.payer)?;
        let participants = transaction
            .participants
            .iter()
            .map(lookup)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            id: transaction.id,
            description: transaction.description.clone(),
            amount: transaction.amount,
            date: transaction.date.clone(),
            payer,
            participants,
        })
    }
}
