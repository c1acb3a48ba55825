//! In-memory storage backend for testing.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! the storage traits. Ideal for unit and integration tests where file I/O
//! is undesirable.

use std::sync::Mutex;

use chrono::Utc;

use super::records;
use crate::error::{Result, SplitbookError};
use crate::models::{
    Expense, ExpenseId, NewExpense, NewTopUp, NewTransfer, TopUp, TopUpId, Transaction,
    TransactionId, Transfer, User,
};

/// Thread-safe in-memory storage for testing.
///
/// This type implements both [`super::Storage`] (async) and
/// [`super::BlockingStorage`] (blocking) traits, providing a zero-setup
/// storage backend for tests.
///
/// # Seeds
///
/// Seed datasets are supplied with the `with_seed_*` builders. Resetting a
/// collection without a seed fails with
/// [`SplitbookError::SeedUnavailable`], like a missing seed file would.
///
/// # Example
///
/// ```rust
/// use splitbook::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new().with_seed_expenses(Vec::new());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Stored expenses.
    expenses: Vec<Expense>,
    /// Stored top-ups.
    topups: Vec<TopUp>,
    /// Stored users.
    users: Vec<User>,
    /// Stored transactions.
    transactions: Vec<Transaction>,
    /// Seed datasets, if configured.
    seeds: Seeds,
    /// Next free key per collection.
    high_water: HighWater,
    /// When set, every operation fails as if the medium were gone.
    offline: bool,
}

/// Seed datasets used by the reset operations.
#[derive(Debug, Default)]
struct Seeds {
    /// Expense seed.
    expenses: Option<Vec<Expense>>,
    /// User seed.
    users: Option<Vec<User>>,
    /// Transaction seed.
    transactions: Option<Vec<Transaction>>,
}

/// Key high-water marks.
#[derive(Debug, Default)]
struct HighWater {
    /// Expenses.
    expenses: i64,
    /// Top-ups.
    topups: i64,
    /// Transactions.
    transactions: i64,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seed returned by expense resets.
    #[inline]
    #[must_use]
    pub fn with_seed_expenses(self, seed: Vec<Expense>) -> Self {
        self.configure(|inner| inner.seeds.expenses = Some(seed))
    }

    /// Sets the seed returned by user resets.
    #[inline]
    #[must_use]
    pub fn with_seed_users(self, seed: Vec<User>) -> Self {
        self.configure(|inner| inner.seeds.users = Some(seed))
    }

    /// Sets the seed returned by transaction resets.
    #[inline]
    #[must_use]
    pub fn with_seed_transactions(self, seed: Vec<Transaction>) -> Self {
        self.configure(|inner| inner.seeds.transactions = Some(seed))
    }

    /// Replaces the live users directly, bypassing the seed.
    #[inline]
    #[must_use]
    pub fn with_users(self, users: Vec<User>) -> Self {
        self.configure(|inner| inner.users = users)
    }

    /// Makes every subsequent operation fail with
    /// [`SplitbookError::StorageUnavailable`] (or succeed again).
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn set_offline(&self, offline: bool) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        inner.offline = offline;
        Ok(())
    }

    /// Applies a builder change to state the caller still exclusively owns.
    fn configure<F: FnOnce(&mut Inner)>(mut self, change: F) -> Self {
        // The storage is owned here, so a poisoned lock still yields usable state.
        let inner = match self.inner.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        change(inner);
        self
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut Inner) -> Result<R>>(&self, f: F) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        if inner.offline {
            return Err(SplitbookError::StorageUnavailable(
                "in-memory storage is offline".into(),
            ));
        }
        f(&mut *inner)
    }

    /// Returns every expense.
    fn list_expenses(&self) -> Result<Vec<Expense>> {
        self.with_lock(|inner| Ok(inner.expenses.clone()))
    }

    /// Returns the first expense with the given ID.
    fn find_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.with_lock(|inner| Ok(inner.expenses.iter().find(|e| e.id == id).cloned()))
    }

    /// Appends a new expense.
    fn insert_expense(&self, expense: NewExpense) -> Result<Expense> {
        self.with_lock(|inner| {
            let key = records::next_key(inner.high_water.expenses, &inner.expenses)?;
            let stored = expense.into_expense(ExpenseId::new(key));
            inner.expenses.push(stored.clone());
            inner.high_water.expenses = key.saturating_add(1);
            Ok(stored)
        })
    }

    /// Removes the first expense with the given ID.
    fn remove_expense(&self, id: ExpenseId) -> Result<bool> {
        self.with_lock(|inner| Ok(records::remove_first(&mut inner.expenses, |e| e.id == id)))
    }

    /// Replaces expenses with the seed.
    fn restore_expenses(&self) -> Result<Vec<Expense>> {
        self.with_lock(|inner| {
            let seed = require_seed(inner.seeds.expenses.as_deref(), "expenses")?;
            inner.high_water.expenses = inner
                .high_water
                .expenses
                .max(records::high_water_of(&inner.expenses))
                .max(records::high_water_of(&seed));
            inner.expenses.clone_from(&seed);
            Ok(seed)
        })
    }

    /// Returns every top-up.
    fn list_topups(&self) -> Result<Vec<TopUp>> {
        self.with_lock(|inner| Ok(inner.topups.clone()))
    }

    /// Appends a new top-up stamped with the current time.
    fn insert_topup(&self, topup: NewTopUp) -> Result<TopUp> {
        let now = Utc::now();
        self.with_lock(|inner| {
            let key = records::next_key(inner.high_water.topups, &inner.topups)?;
            let stored = topup.into_topup(TopUpId::new(key), now);
            inner.topups.push(stored.clone());
            inner.high_water.topups = key.saturating_add(1);
            Ok(stored)
        })
    }

    /// Returns every user.
    fn list_users(&self) -> Result<Vec<User>> {
        self.with_lock(|inner| Ok(inner.users.clone()))
    }

    /// Replaces users with the seed.
    fn restore_users(&self) -> Result<Vec<User>> {
        self.with_lock(|inner| {
            let seed = require_seed(inner.seeds.users.as_deref(), "users")?;
            inner.users.clone_from(&seed);
            Ok(seed)
        })
    }

    /// Returns every transaction.
    fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.with_lock(|inner| Ok(inner.transactions.clone()))
    }

    /// Records a transfer between two stored users.
    fn insert_transfer(&self, transfer: NewTransfer) -> Result<Transfer> {
        self.with_lock(|inner| {
            let key = records::next_key(inner.high_water.transactions, &inner.transactions)?;
            let (transaction, response) =
                records::build_transfer(&inner.users, transfer, TransactionId::new(key))?;
            inner.transactions.push(transaction);
            inner.high_water.transactions = key.saturating_add(1);
            Ok(response)
        })
    }

    /// Replaces transactions with the seed.
    fn restore_transactions(&self) -> Result<Vec<Transaction>> {
        self.with_lock(|inner| {
            let seed = require_seed(inner.seeds.transactions.as_deref(), "transactions")?;
            inner.high_water.transactions = inner
                .high_water
                .transactions
                .max(records::high_water_of(&inner.transactions))
                .max(records::high_water_of(&seed));
            inner.transactions.clone_from(&seed);
            Ok(seed)
        })
    }
}

/// Clones a configured seed, or reports it as unavailable.
fn require_seed<T: Clone>(seed: Option<&[T]>, name: &str) -> Result<Vec<T>> {
    seed.map(<[T]>::to_vec).ok_or_else(|| {
        SplitbookError::SeedUnavailable(format!("no seed configured for {name}").into())
    })
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> SplitbookError {
    SplitbookError::StorageUnavailable(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for InMemoryStorage {
    #[inline]
    fn expenses(&self) -> Result<Vec<Expense>> {
        self.list_expenses()
    }

    #[inline]
    fn expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.find_expense(id)
    }

    #[inline]
    fn create_expense(&self, expense: NewExpense) -> Result<Expense> {
        self.insert_expense(expense)
    }

    #[inline]
    fn delete_expense(&self, id: ExpenseId) -> Result<bool> {
        self.remove_expense(id)
    }

    #[inline]
    fn reset_expenses(&self) -> Result<Vec<Expense>> {
        self.restore_expenses()
    }

    #[inline]
    fn topups(&self) -> Result<Vec<TopUp>> {
        self.list_topups()
    }

    #[inline]
    fn create_topup(&self, topup: NewTopUp) -> Result<TopUp> {
        self.insert_topup(topup)
    }

    #[inline]
    fn users(&self) -> Result<Vec<User>> {
        self.list_users()
    }

    #[inline]
    fn reset_users(&self) -> Result<Vec<User>> {
        self.restore_users()
    }

    #[inline]
    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.list_transactions()
    }

    #[inline]
    fn create_transfer(&self, transfer: NewTransfer) -> Result<Transfer> {
        self.insert_transfer(transfer)
    }

    #[inline]
    fn reset_transactions(&self) -> Result<Vec<Transaction>> {
        self.restore_transactions()
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for InMemoryStorage {
    #[inline]
    fn expenses(&self) -> impl Future<Output = Result<Vec<Expense>>> + Send {
        core::future::ready(self.list_expenses())
    }

    #[inline]
    fn expense(&self, id: ExpenseId) -> impl Future<Output = Result<Option<Expense>>> + Send {
        core::future::ready(self.find_expense(id))
    }

    #[inline]
    fn create_expense(&self, expense: NewExpense) -> impl Future<Output = Result<Expense>> + Send {
        core::future::ready(self.insert_expense(expense))
    }

    #[inline]
    fn delete_expense(&self, id: ExpenseId) -> impl Future<Output = Result<bool>> + Send {
        core::future::ready(self.remove_expense(id))
    }

    #[inline]
    fn reset_expenses(&self) -> impl Future<Output = Result<Vec<Expense>>> + Send {
        core::future::ready(self.restore_expenses())
    }

    #[inline]
    fn topups(&self) -> impl Future<Output = Result<Vec<TopUp>>> + Send {
        core::future::ready(self.list_topups())
    }

    #[inline]
    fn create_topup(&self, topup: NewTopUp) -> impl Future<Output = Result<TopUp>> + Send {
        core::future::ready(self.insert_topup(topup))
    }

    #[inline]
    fn users(&self) -> impl Future<Output = Result<Vec<User>>> + Send {
        core::future::ready(self.list_users())
    }

    #[inline]
    fn reset_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send {
        core::future::ready(self.restore_users())
    }

    #[inline]
    fn transactions(&self) -> impl Future<Output = Result<Vec<Transaction>>> + Send {
        core::future::ready(self.list_transactions())
    }

    #[inline]
    fn create_transfer(
        &self,
        transfer: NewTransfer,
    ) -> impl Future<Output = Result<Transfer>> + Send {
        core::future::ready(self.insert_transfer(transfer))
    }

    #[inline]
    fn reset_transactions(&self) -> impl Future<Output = Result<Vec<Transaction>>> + Send {
        core::future::ready(self.restore_transactions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, UserId};

    fn lunch() -> NewExpense {
        NewExpense {
            date: "2024-01-01".to_owned(),
            description: "Lunch".to_owned(),
            payer: "Alice".to_owned(),
            amount: 12.5,
        }
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id: UserId::new(id),
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_lowercase()),
            bank_account: None,
        }
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::storage::BlockingStorage;

        #[test]
        fn new_storage_is_empty() {
            let storage = InMemoryStorage::new();
            assert!(storage.expenses().unwrap().is_empty());
            assert!(storage.topups().unwrap().is_empty());
            assert!(storage.users().unwrap().is_empty());
            assert!(storage.transactions().unwrap().is_empty());
        }

        #[test]
        fn create_assigns_increasing_ids() {
            let storage = InMemoryStorage::new();
            let first = storage.create_expense(lunch()).unwrap();
            let second = storage.create_expense(lunch()).unwrap();
            assert_eq!(first.id, ExpenseId::new(1));
            assert_eq!(second.id, ExpenseId::new(2));
        }

        #[test]
        fn delete_then_create_does_not_reuse_id() {
            let storage = InMemoryStorage::new();
            let first = storage.create_expense(lunch()).unwrap();
            assert!(storage.delete_expense(first.id).unwrap());
            assert!(!storage.delete_expense(first.id).unwrap());
            let second = storage.create_expense(lunch()).unwrap();
            assert_eq!(second.id, ExpenseId::new(2));
        }

        #[test]
        fn reset_without_seed_fails_and_keeps_data() {
            let storage = InMemoryStorage::new();
            let created = storage.create_expense(lunch()).unwrap();
            assert!(matches!(
                storage.reset_expenses().unwrap_err(),
                SplitbookError::SeedUnavailable(_)
            ));
            assert_eq!(storage.expenses().unwrap(), vec![created]);
        }

        #[test]
        fn reset_restores_seed() {
            let seed = vec![lunch().into_expense(ExpenseId::new(1))];
            let storage = InMemoryStorage::new().with_seed_expenses(seed.clone());
            let _created = storage.create_expense(lunch()).unwrap();
            assert_eq!(storage.reset_expenses().unwrap(), seed);
            assert_eq!(storage.expenses().unwrap(), seed);
        }

        #[test]
        fn offline_storage_fails_every_call() {
            let storage = InMemoryStorage::new();
            storage.set_offline(true).unwrap();
            assert!(matches!(
                storage.expenses().unwrap_err(),
                SplitbookError::StorageUnavailable(_)
            ));
            storage.set_offline(false).unwrap();
            assert!(storage.expenses().is_ok());
        }

        #[test]
        fn failed_create_while_offline_keeps_state() {
            let storage = InMemoryStorage::new();
            let created = storage.create_expense(lunch()).unwrap();
            storage.set_offline(true).unwrap();
            assert!(matches!(
                storage.create_expense(lunch()).unwrap_err(),
                SplitbookError::StorageUnavailable(_)
            ));
            storage.set_offline(false).unwrap();
            assert_eq!(storage.expenses().unwrap(), vec![created]);
            assert_eq!(storage.create_expense(lunch()).unwrap().id, ExpenseId::new(2));
        }

        #[test]
        fn exhausted_keys_fail_create() {
            let storage = InMemoryStorage::new()
                .with_seed_expenses(vec![lunch().into_expense(ExpenseId::new(i64::MAX))]);
            let _seed = storage.reset_expenses().unwrap();
            assert!(matches!(
                storage.create_expense(lunch()).unwrap_err(),
                SplitbookError::StorageUnavailable(_)
            ));
            assert!(storage.delete_expense(ExpenseId::new(i64::MAX)).unwrap());
            assert!(storage.create_expense(lunch()).is_err());
            assert!(storage.expenses().unwrap().is_empty());
        }

        #[test]
        fn topup_keeps_amount_form() {
            let storage = InMemoryStorage::new();
            let topup = storage
                .create_topup(NewTopUp {
                    user: "Ann".to_owned(),
                    amount: Amount::Number(15.0),
                })
                .unwrap();
            assert_eq!(topup.id, TopUpId::new(1));
            assert_eq!(storage.topups().unwrap(), vec![topup]);
        }

        #[test]
        fn transfer_records_transaction() {
            let storage =
                InMemoryStorage::new().with_users(vec![user(1, "Alice"), user(2, "Bob")]);
            let transfer = storage
                .create_transfer(NewTransfer {
                    amount: 12.0,
                    date: None,
                    source_id: UserId::new(2),
                    target_id: UserId::new(1),
                })
                .unwrap();
            assert_eq!(transfer.source.name, "Bob");
            let transactions = storage.transactions().unwrap();
            assert_eq!(transactions.len(), 1);
            assert_eq!(transactions[0].recipient().map(|r| r.name.as_str()), Some("Alice"));
        }

        #[test]
        fn reset_users_from_seed() {
            let storage = InMemoryStorage::new().with_seed_users(vec![user(1, "Alice")]);
            assert_eq!(storage.reset_users().unwrap().len(), 1);
            assert_eq!(storage.users().unwrap()[0].name, "Alice");
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::storage::Storage;

        #[tokio::test]
        async fn create_and_find() {
            let storage = InMemoryStorage::new();
            let created = storage.create_expense(lunch()).await.unwrap();
            let found = storage.expense(created.id).await.unwrap();
            assert_eq!(found, Some(created));
        }

        #[tokio::test]
        async fn reset_transactions_without_seed() {
            let storage = InMemoryStorage::new();
            assert!(storage.reset_transactions().await.is_err());
        }
    }
}
