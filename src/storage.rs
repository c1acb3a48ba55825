//! Pluggable record stores for splitbook collections.
//!
//! This module defines the [`Storage`] (async) and [`BlockingStorage`]
//! (blocking) traits via a shared macro, mirroring the client generation
//! pattern in [`crate::client`]. Every backend exposes the same operations
//! over four collections: expenses, top-ups, users and transactions.

#[cfg(feature = "storage-file")]
mod file;
mod memory;
mod records;
#[cfg(feature = "storage-sqlx")]
mod sqlite;

#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use memory::InMemoryStorage;
#[cfg(feature = "storage-sqlx")]
pub use sqlite::SqliteStorage;

/// A named collection persisted as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Expenses.
    Expenses,
    /// Top-ups.
    TopUps,
    /// Users.
    Users,
    /// Transactions (expenses and transfers between users).
    Transactions,
}

impl Collection {
    /// All collections, in a stable order.
    pub const ALL: [Self; 4] = [Self::Expenses, Self::TopUps, Self::Users, Self::Transactions];

    /// Returns the collection name used for files, tables and logs.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Expenses => "expenses",
            Self::TopUps => "topups",
            Self::Users => "users",
            Self::Transactions => "transactions",
        }
    }

    /// Returns the live file name, e.g. `expenses.json`.
    #[inline]
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }

    /// Returns the seed file name, e.g. `expenses.init.json`.
    #[inline]
    #[must_use]
    pub fn seed_file_name(self) -> String {
        format!("{}.init.json", self.name())
    }
}

impl core::fmt::Display for Collection {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Generates a storage trait (async or blocking) with all record methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_storage {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        // Expenses
        define_storage!(@method $mode, expenses,
            "Returns every stored expense in stored order.\n\n# Errors\n\nReturns [`SplitbookError::StorageUnavailable`](crate::error::SplitbookError::StorageUnavailable) if the collection cannot be read.",
            -> Result<Vec<Expense>>);
        define_storage!(@method $mode, expense,
            "Returns the first expense with the given ID, if any.\n\n# Errors\n\nReturns an error if the collection cannot be read.",
            id: ExpenseId, -> Result<Option<Expense>>);
        define_storage!(@method $mode, create_expense,
            "Assigns a fresh ID, appends the expense and persists the collection.\n\nReturns the stored record.\n\n# Errors\n\nReturns an error if the collection cannot be read or written; the previously persisted state is left intact.",
            expense: NewExpense, -> Result<Expense>);
        define_storage!(@method $mode, delete_expense,
            "Removes the first expense with the given ID.\n\nReturns `false`, with no side effect, if no expense matches.\n\n# Errors\n\nReturns an error if the collection cannot be read or written.",
            id: ExpenseId, -> Result<bool>);
        define_storage!(@method $mode, reset_expenses,
            "Replaces the live expenses with the seed dataset and returns it.\n\n# Errors\n\nReturns [`SplitbookError::SeedUnavailable`](crate::error::SplitbookError::SeedUnavailable) if the seed cannot be read, leaving the live collection untouched.",
            -> Result<Vec<Expense>>);

        // Top-ups
        define_storage!(@method $mode, topups,
            "Returns every stored top-up in stored order.\n\n# Errors\n\nReturns an error if the collection cannot be read.",
            -> Result<Vec<TopUp>>);
        define_storage!(@method $mode, create_topup,
            "Assigns a fresh ID and the current time, then appends the top-up.\n\n# Errors\n\nReturns an error if the collection cannot be read or written.",
            topup: NewTopUp, -> Result<TopUp>);

        // Users
        define_storage!(@method $mode, users,
            "Returns every stored user in stored order.\n\n# Errors\n\nReturns an error if the collection cannot be read.",
            -> Result<Vec<User>>);
        define_storage!(@method $mode, reset_users,
            "Replaces the live users with the seed dataset and returns it.\n\n# Errors\n\nReturns an error if the seed cannot be read or the collection cannot be written.",
            -> Result<Vec<User>>);

        // Transactions
        define_storage!(@method $mode, transactions,
            "Returns every stored transaction in stored order.\n\n# Errors\n\nReturns an error if the collection cannot be read.",
            -> Result<Vec<Transaction>>);
        define_storage!(@method $mode, create_transfer,
            "Records a transfer between two existing users.\n\n# Errors\n\nReturns [`SplitbookError::Validation`](crate::error::SplitbookError::Validation) if either user is unknown, or a storage error if the collections cannot be read or written.",
            transfer: NewTransfer, -> Result<Transfer>);
        define_storage!(@method $mode, reset_transactions,
            "Replaces the live transactions with the seed dataset and returns it.\n\n# Errors\n\nReturns an error if the seed cannot be read or the collection cannot be written.",
            -> Result<Vec<Transaction>>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_storage {
    //! Async storage trait definition.

    use crate::error::Result;
    use crate::models::{
        Expense, ExpenseId, NewExpense, NewTopUp, NewTransfer, TopUp, Transaction, Transfer, User,
    };

    define_storage! {
        trait_name: Storage,
        trait_doc: "Async record store for splitbook collections.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) or a connection pool for mutation.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_storage {
    //! Blocking storage trait definition.

    use crate::error::Result;
    use crate::models::{
        Expense, ExpenseId, NewExpense, NewTopUp, NewTransfer, TopUp, Transaction, Transfer, User,
    };

    define_storage! {
        trait_name: BlockingStorage,
        trait_doc: "Blocking record store for splitbook collections.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for mutation.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_storage::Storage;
#[cfg(feature = "blocking")]
pub use blocking_storage::BlockingStorage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_file_names() {
        assert_eq!(Collection::Expenses.file_name(), "expenses.json");
        assert_eq!(Collection::TopUps.seed_file_name(), "topups.init.json");
    }

    #[test]
    fn collection_names_are_unique() {
        let names: std::collections::HashSet<&str> =
            Collection::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), Collection::ALL.len());
    }
}
