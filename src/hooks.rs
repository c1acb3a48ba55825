//! Client data hooks: a store paired with its local mirror.
//!
//! A hook issues requests against any [`Storage`] (usually a
//! [`crate::client::SplitbookClient`]) and keeps a [`Mirror`] in step with
//! the answers, applying the optimistic-update protocol described in
//! [`crate::mirror`].

use crate::error::Result;
use crate::mirror::Mirror;
use crate::models::{Expense, ExpenseId, NewExpense, NewTopUp, TopUp};
use crate::sort::ExpenseSort;
use crate::storage::Storage;

/// Expenses list with optimistic create, delete and reset.
#[derive(Debug)]
pub struct ExpensesHook<S> {
    /// Store the requests go to.
    store: S,
    /// Local view of the collection.
    mirror: Mirror<Expense, NewExpense>,
    /// Presentation order.
    sort: ExpenseSort,
}

impl<S: Storage> ExpensesHook<S> {
    /// Wraps a store with an empty mirror.
    #[inline]
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            mirror: Mirror::new(),
            sort: ExpenseSort::default(),
        }
    }

    /// Returns the underlying store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the mirror.
    #[inline]
    #[must_use]
    pub const fn mirror(&self) -> &Mirror<Expense, NewExpense> {
        &self.mirror
    }

    /// Returns the current presentation order.
    #[inline]
    #[must_use]
    pub const fn sort_order(&self) -> ExpenseSort {
        self.sort
    }

    /// Changes the presentation order. The mirror itself is not reordered.
    #[inline]
    pub fn set_sort_order(&mut self, sort: ExpenseSort) {
        self.sort = sort;
    }

    /// Confirmed expenses in the current presentation order.
    #[inline]
    #[must_use]
    pub fn sorted(&self) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self.mirror.records().cloned().collect();
        self.sort.sort(&mut expenses);
        expenses
    }

    /// Re-fetches the whole collection into the mirror.
    ///
    /// Failures are recorded on the mirror rather than returned.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&mut self) {
        self.mirror.begin_load();
        let result = self.store.expenses().await;
        self.mirror.finish_load(result);
    }

    /// Creates an expense, showing it as pending until the store answers.
    ///
    /// On success the mirror adopts a fresh snapshot (or, if that fetch
    /// fails, swaps the stored record in). On failure the pending entry is
    /// rolled back.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the create itself fails.
    #[tracing::instrument(skip_all)]
    pub async fn create(&mut self, draft: NewExpense) -> Result<Expense> {
        let pending = self.mirror.begin_create(draft.clone());
        match self.store.create_expense(draft).await {
            Ok(stored) => {
                match self.store.expenses().await {
                    Ok(snapshot) => {
                        let _confirmed = self.mirror.confirm_with_snapshot(pending, snapshot);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "re-fetch after create failed");
                        let _confirmed = self.mirror.confirm(pending, stored.clone());
                    }
                }
                Ok(stored)
            }
            Err(err) => {
                let _draft = self.mirror.roll_back(pending, &err);
                Err(err)
            }
        }
    }

    /// Deletes an expense, removing it from the mirror first.
    ///
    /// If the store fails, the expense goes back where it was. A `false`
    /// answer (already gone) is not an error.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the delete fails.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn delete(&mut self, id: ExpenseId) -> Result<bool> {
        let removed = self.mirror.remove_where(|expense| expense.id == id);
        match self.store.delete_expense(id).await {
            Ok(deleted) => Ok(deleted),
            Err(err) => {
                if let Some((index, expense)) = removed {
                    self.mirror.restore(index, expense);
                }
                self.mirror.record_error(&err);
                Err(err)
            }
        }
    }

    /// Resets the collection to its seed, clearing the mirror meanwhile.
    ///
    /// On failure the mirror stays empty until the next successful
    /// [`ExpensesHook::refresh`].
    #[tracing::instrument(skip_all)]
    pub async fn reset(&mut self) {
        self.mirror.begin_reset();
        let result = self.store.reset_expenses().await;
        self.mirror.finish_reset(result);
    }
}

/// Top-ups list with optimistic create.
#[derive(Debug)]
pub struct TopUpsHook<S> {
    /// Store the requests go to.
    store: S,
    /// Local view of the collection.
    mirror: Mirror<TopUp, NewTopUp>,
}

impl<S: Storage> TopUpsHook<S> {
    /// Wraps a store with an empty mirror.
    #[inline]
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            mirror: Mirror::new(),
        }
    }

    /// Returns the underlying store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the mirror.
    #[inline]
    #[must_use]
    pub const fn mirror(&self) -> &Mirror<TopUp, NewTopUp> {
        &self.mirror
    }

    /// Re-fetches the whole collection into the mirror.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&mut self) {
        self.mirror.begin_load();
        let result = self.store.topups().await;
        self.mirror.finish_load(result);
    }

    /// Creates a top-up, showing it as pending until the store answers.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the create fails; the pending entry
    /// has been rolled back by then.
    #[tracing::instrument(skip_all)]
    pub async fn create(&mut self, draft: NewTopUp) -> Result<TopUp> {
        let pending = self.mirror.begin_create(draft.clone());
        match self.store.create_topup(draft).await {
            Ok(stored) => {
                match self.store.topups().await {
                    Ok(snapshot) => {
                        let _confirmed = self.mirror.confirm_with_snapshot(pending, snapshot);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "re-fetch after create failed");
                        let _confirmed = self.mirror.confirm(pending, stored.clone());
                    }
                }
                Ok(stored)
            }
            Err(err) => {
                let _draft = self.mirror.roll_back(pending, &err);
                Err(err)
            }
        }
    }
}
