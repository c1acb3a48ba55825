//! Data models for splitbook records.
//!
//! This module contains the stored record types, the validated inputs used
//! to create them, and newtype ID wrappers for each collection.

mod amount;
mod envelope;
mod expense;
mod ids;
mod topup;
mod transaction;
mod user;

pub use amount::Amount;
pub use envelope::{DataEnvelope, HealthStatus};
pub use expense::{Expense, NewExpense};
pub use ids::{ExpenseId, TopUpId, TransactionId, UserId};
pub use topup::{NewTopUp, TopUp};
pub use transaction::{
    ExpenseDetails, InvalidTransfer, NewTransfer, Transaction, TransactionKind, Transfer,
};
pub use user::{User, UserRef};
