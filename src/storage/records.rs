//! Record helpers shared by every storage backend.

use chrono::Utc;

use crate::error::{Result, SplitbookError};
use crate::models::{
    Expense, NewTransfer, TopUp, Transaction, TransactionId, Transfer, User, UserId,
};
use crate::validation::ValidationError;

/// A record carrying a store-assigned numeric key.
pub(super) trait Keyed {
    /// Returns the raw numeric key.
    fn key(&self) -> i64;
}

impl Keyed for Expense {
    fn key(&self) -> i64 {
        self.id.get()
    }
}

impl Keyed for TopUp {
    fn key(&self) -> i64 {
        self.id.get()
    }
}

impl Keyed for User {
    fn key(&self) -> i64 {
        self.id.get()
    }
}

impl Keyed for Transaction {
    fn key(&self) -> i64 {
        self.id().get()
    }
}

/// Picks the next key for a collection.
///
/// The result is above both the persisted high-water mark and every key
/// currently present, so keys are never handed out twice even after the
/// highest record is deleted or the collection is reset.
///
/// # Errors
///
/// Returns [`SplitbookError::StorageUnavailable`] once the key space is
/// used up. `i64::MAX` is never handed out; it marks exhaustion.
pub(super) fn next_key<T: Keyed>(high_water: i64, existing: &[T]) -> Result<i64> {
    next_key_after(high_water, existing.iter().map(Keyed::key).max())
}

/// Same as [`next_key`], given only the largest key currently present.
pub(super) fn next_key_after(high_water: i64, max_existing: Option<i64>) -> Result<i64> {
    let key = high_water.max(mark_after(max_existing)).max(1);
    if key == i64::MAX {
        tracing::error!(high_water, ?max_existing, "id space exhausted");
        return Err(SplitbookError::StorageUnavailable("id space exhausted".into()));
    }
    Ok(key)
}

/// High-water mark just above every key in `existing`.
pub(super) fn high_water_of<T: Keyed>(existing: &[T]) -> i64 {
    mark_after(existing.iter().map(Keyed::key).max())
}

/// High-water mark just above `max_existing`, saturating at `i64::MAX`.
pub(super) fn mark_after(max_existing: Option<i64>) -> i64 {
    max_existing.map_or(1, |max| max.saturating_add(1))
}

/// Removes the first item matching `pred`, returning whether one was found.
pub(super) fn remove_first<T, F: Fn(&T) -> bool>(items: &mut Vec<T>, pred: F) -> bool {
    match items.iter().position(pred) {
        Some(index) => {
            let _removed = items.remove(index);
            true
        }
        None => false,
    }
}

/// Looks up a user by ID, reporting an unknown ID as a validation error.
pub(super) fn find_user(users: &[User], id: UserId) -> Result<User> {
    users
        .iter()
        .find(|user| user.id == id)
        .cloned()
        .ok_or_else(|| ValidationError::UnknownUser(id).into())
}

/// Resolves both parties of a transfer and builds the stored transaction
/// together with the response shape.
pub(super) fn build_transfer(
    users: &[User],
    transfer: NewTransfer,
    id: TransactionId,
) -> Result<(Transaction, Transfer)> {
    let source = find_user(users, transfer.source_id)?;
    let target = find_user(users, transfer.target_id)?;
    let date = transfer.date.unwrap_or_else(today);
    let transaction = Transaction::transfer(
        id,
        transfer.amount,
        date.clone(),
        source.to_ref(),
        target.to_ref(),
    );
    let response = Transfer {
        id,
        amount: transfer.amount,
        date,
        source,
        target,
    };
    Ok((transaction, response))
}

/// Current UTC date as `YYYY-MM-DD`.
pub(super) fn today() -> String {
    Utc::now().date_naive().to_string()
}
