//! SQLite storage backend built on `sqlx`.
//!
//! Each collection is a table. Rows keep an `AUTOINCREMENT` sequence column
//! for stored order, separate from the record ID, so seeds may carry any
//! IDs they like. Top-up amounts and whole transactions are kept as JSON
//! text to preserve their exact wire form.

use core::str::FromStr;
use core::time::Duration;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction as DbTransaction};

use super::Collection;
use super::records;
use crate::error::{Result, SplitbookError};
use crate::models::{
    Amount, Expense, ExpenseId, NewExpense, NewTopUp, NewTransfer, TopUp, TopUpId, Transaction,
    TransactionId, Transfer, User, UserId,
};

/// How long a write waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(15);

/// Schema statements, applied on every connect.
const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS expenses (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL,
        date TEXT NOT NULL,
        description TEXT NOT NULL,
        payer TEXT NOT NULL,
        amount REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS topups (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL,
        user TEXT NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        bank_account TEXT
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL,
        record TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS high_water (
        collection TEXT PRIMARY KEY,
        next_key INTEGER NOT NULL
    )",
];

/// Relational storage backed by a SQLite connection pool.
///
/// Every mutation runs inside one database transaction, so a failure at
/// any step leaves the previously committed state in place. Transactions
/// that allocate keys take the write lock with their first statement, so
/// concurrent creates queue on the busy timeout instead of failing.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    /// Connection pool.
    pool: SqlitePool,
    /// Directory holding `<collection>.init.json` seed files.
    seed_dir: PathBuf,
}

impl SqliteStorage {
    /// Connects to the database at `url`, creating it and its schema if
    /// missing.
    ///
    /// `url` accepts anything `sqlx` does, e.g. `sqlite:splitbook.db` or
    /// `file:memdb_1?mode=memory&cache=shared`.
    ///
    /// # Errors
    ///
    /// Returns [`SplitbookError::StorageUnavailable`] if the URL is invalid,
    /// the database cannot be opened or the schema cannot be applied.
    #[tracing::instrument(skip_all)]
    pub async fn connect(url: &str, seed_dir: PathBuf) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePool::connect_with(options).await.map_err(db_error)?;
        for statement in SCHEMA {
            let _applied = sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(db_error)?;
        }
        tracing::debug!(url, "connected to sqlite storage");
        Ok(Self { pool, seed_dir })
    }

    /// Returns the directory holding the seed files.
    #[inline]
    #[must_use]
    pub fn seed_dir(&self) -> &Path {
        &self.seed_dir
    }

    /// Closes every pooled connection.
    #[inline]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Reads and parses a seed file.
    async fn read_seed<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let path = self.seed_dir.join(collection.seed_file_name());
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| SplitbookError::SeedUnavailable(Box::new(err)))?;
        serde_json::from_str(&contents).map_err(|err| SplitbookError::SeedUnavailable(Box::new(err)))
    }

    /// Opens a database transaction and takes the write lock right away by
    /// touching the high-water row of `collection`.
    async fn begin_write(&self, collection: Collection) -> Result<DbTransaction<'static, Sqlite>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let _locked = sqlx::query(
            "INSERT INTO high_water (collection, next_key) VALUES (?, 0)
             ON CONFLICT(collection) DO NOTHING",
        )
        .bind(collection.name())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        Ok(tx)
    }

    /// Fetches every row of `collection` in stored order.
    async fn fetch_all(&self, collection: Collection, columns: &str) -> Result<Vec<SqliteRow>> {
        let sql = format!("SELECT {columns} FROM {collection} ORDER BY seq");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    /// Lists expenses in stored order.
    async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let rows = self
            .fetch_all(Collection::Expenses, "id, date, description, payer, amount")
            .await?;
        rows.iter().map(expense_from_row).collect()
    }

    /// Lists top-ups in stored order.
    async fn list_topups(&self) -> Result<Vec<TopUp>> {
        let rows = self
            .fetch_all(Collection::TopUps, "id, user, amount, date")
            .await?;
        rows.iter().map(topup_from_row).collect()
    }

    /// Lists users in stored order.
    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = self
            .fetch_all(Collection::Users, "id, name, email, bank_account")
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    /// Lists transactions in stored order.
    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = self.fetch_all(Collection::Transactions, "record").await?;
        rows.iter().map(transaction_from_row).collect()
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Wraps a database error into a [`SplitbookError::StorageUnavailable`].
fn db_error(err: sqlx::Error) -> SplitbookError {
    SplitbookError::StorageUnavailable(Box::new(err))
}

/// Wraps malformed stored data into a [`SplitbookError::StorageUnavailable`].
fn corrupt<E: core::error::Error + Send + Sync + 'static>(err: E) -> SplitbookError {
    SplitbookError::StorageUnavailable(Box::new(err))
}

/// Reserves the next key of `collection` inside `tx`, which must already
/// hold the write lock (see [`SqliteStorage::begin_write`]).
async fn reserve_key(tx: &mut DbTransaction<'static, Sqlite>, collection: Collection) -> Result<i64> {
    let high_water = read_high_water(tx, collection).await?;
    let max_existing: Option<i64> = sqlx::query(&format!("SELECT MAX(id) AS max_id FROM {collection}"))
        .fetch_one(&mut **tx)
        .await
        .and_then(|row| row.try_get("max_id"))
        .map_err(db_error)?;
    let key = records::next_key_after(high_water, max_existing)?;
    raise_high_water(tx, collection, key.saturating_add(1)).await?;
    Ok(key)
}

/// Returns the stored high-water mark of `collection` (0 if unset).
async fn read_high_water(tx: &mut DbTransaction<'static, Sqlite>, collection: Collection) -> Result<i64> {
    let row = sqlx::query("SELECT next_key FROM high_water WHERE collection = ?")
        .bind(collection.name())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error)?;
    row.map_or(Ok(0), |row| row.try_get("next_key").map_err(db_error))
}

/// Raises the high-water mark of `collection` to at least `next`.
async fn raise_high_water(
    tx: &mut DbTransaction<'static, Sqlite>,
    collection: Collection,
    next: i64,
) -> Result<()> {
    let _raised = sqlx::query(
        "INSERT INTO high_water (collection, next_key) VALUES (?, ?)
         ON CONFLICT(collection) DO UPDATE SET next_key = MAX(next_key, excluded.next_key)",
    )
    .bind(collection.name())
    .bind(next)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

/// Keeps every key handed out so far retired, then empties the table.
async fn clear_collection(tx: &mut DbTransaction<'static, Sqlite>, collection: Collection) -> Result<()> {
    let max_existing: Option<i64> = sqlx::query(&format!("SELECT MAX(id) AS max_id FROM {collection}"))
        .fetch_one(&mut **tx)
        .await
        .and_then(|row| row.try_get("max_id"))
        .map_err(db_error)?;
    raise_high_water(tx, collection, records::mark_after(max_existing)).await?;
    let _cleared = sqlx::query(&format!("DELETE FROM {collection}"))
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Inserts one expense row.
async fn insert_expense_row(tx: &mut DbTransaction<'static, Sqlite>, expense: &Expense) -> Result<()> {
    let _inserted = sqlx::query(
        "INSERT INTO expenses (id, date, description, payer, amount) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(expense.id.get())
    .bind(&expense.date)
    .bind(&expense.description)
    .bind(&expense.payer)
    .bind(expense.amount)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

/// Inserts one user row.
async fn insert_user_row(tx: &mut DbTransaction<'static, Sqlite>, user: &User) -> Result<()> {
    let _inserted =
        sqlx::query("INSERT INTO users (id, name, email, bank_account) VALUES (?, ?, ?, ?)")
            .bind(user.id.get())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.bank_account.as_deref())
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
    Ok(())
}

/// Inserts one transaction, stored as its JSON wire form.
async fn insert_transaction_row(
    tx: &mut DbTransaction<'static, Sqlite>,
    transaction: &Transaction,
) -> Result<()> {
    let record = serde_json::to_string(transaction)?;
    let _inserted = sqlx::query("INSERT INTO transactions (id, record) VALUES (?, ?)")
        .bind(transaction.id().get())
        .bind(record)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Decodes an expense row.
fn expense_from_row(row: &SqliteRow) -> Result<Expense> {
    Ok(Expense {
        id: ExpenseId::new(row.try_get("id").map_err(db_error)?),
        date: row.try_get("date").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        payer: row.try_get("payer").map_err(db_error)?,
        amount: row.try_get("amount").map_err(db_error)?,
    })
}

/// Decodes a top-up row. The amount column holds JSON, the date RFC 3339.
fn topup_from_row(row: &SqliteRow) -> Result<TopUp> {
    let amount: String = row.try_get("amount").map_err(db_error)?;
    let date: String = row.try_get("date").map_err(db_error)?;
    Ok(TopUp {
        id: TopUpId::new(row.try_get("id").map_err(db_error)?),
        user: row.try_get("user").map_err(db_error)?,
        amount: serde_json::from_str::<Amount>(&amount).map_err(corrupt)?,
        date: DateTime::parse_from_rfc3339(&date)
            .map_err(corrupt)?
            .with_timezone(&Utc),
    })
}

/// Decodes a user row.
fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id").map_err(db_error)?),
        name: row.try_get("name").map_err(db_error)?,
        email: row.try_get("email").map_err(db_error)?,
        bank_account: row.try_get("bank_account").map_err(db_error)?,
    })
}

/// Decodes a transaction from its stored JSON.
fn transaction_from_row(row: &SqliteRow) -> Result<Transaction> {
    let record: String = row.try_get("record").map_err(db_error)?;
    serde_json::from_str(&record).map_err(corrupt)
}

// ── Storage (async) implementation ──────────────────────────────────────

impl super::Storage for SqliteStorage {
    async fn expenses(&self) -> Result<Vec<Expense>> {
        self.list_expenses().await
    }

    async fn expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(
            "SELECT id, date, description, payer, amount FROM expenses
             WHERE id = ? ORDER BY seq LIMIT 1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref().map(expense_from_row).transpose()
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense> {
        let mut tx = self.begin_write(Collection::Expenses).await?;
        let key = reserve_key(&mut tx, Collection::Expenses).await?;
        let stored = expense.into_expense(ExpenseId::new(key));
        insert_expense_row(&mut tx, &stored).await?;
        tx.commit().await.map_err(db_error)?;
        tracing::debug!(key, "expense stored");
        Ok(stored)
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM expenses WHERE seq =
             (SELECT seq FROM expenses WHERE id = ? ORDER BY seq LIMIT 1)",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_expenses(&self) -> Result<Vec<Expense>> {
        let seed: Vec<Expense> = self.read_seed(Collection::Expenses).await?;
        let mut tx = self.begin_write(Collection::Expenses).await?;
        clear_collection(&mut tx, Collection::Expenses).await?;
        for expense in &seed {
            insert_expense_row(&mut tx, expense).await?;
        }
        raise_high_water(&mut tx, Collection::Expenses, records::high_water_of(&seed)).await?;
        tx.commit().await.map_err(db_error)?;
        tracing::info!(records = seed.len(), "expenses reset from seed");
        Ok(seed)
    }

    async fn topups(&self) -> Result<Vec<TopUp>> {
        self.list_topups().await
    }

    async fn create_topup(&self, topup: NewTopUp) -> Result<TopUp> {
        let mut tx = self.begin_write(Collection::TopUps).await?;
        let key = reserve_key(&mut tx, Collection::TopUps).await?;
        let stored = topup.into_topup(TopUpId::new(key), Utc::now());
        let _inserted = sqlx::query("INSERT INTO topups (id, user, amount, date) VALUES (?, ?, ?, ?)")
            .bind(key)
            .bind(&stored.user)
            .bind(serde_json::to_string(&stored.amount)?)
            .bind(stored.date.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(stored)
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.list_users().await
    }

    async fn reset_users(&self) -> Result<Vec<User>> {
        let seed: Vec<User> = self.read_seed(Collection::Users).await?;
        let mut tx = self.begin_write(Collection::Users).await?;
        clear_collection(&mut tx, Collection::Users).await?;
        for user in &seed {
            insert_user_row(&mut tx, user).await?;
        }
        tx.commit().await.map_err(db_error)?;
        tracing::info!(records = seed.len(), "users reset from seed");
        Ok(seed)
    }

    async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.list_transactions().await
    }

    async fn create_transfer(&self, transfer: NewTransfer) -> Result<Transfer> {
        let users = self.list_users().await?;
        let mut tx = self.begin_write(Collection::Transactions).await?;
        let key = reserve_key(&mut tx, Collection::Transactions).await?;
        let (transaction, response) =
            records::build_transfer(&users, transfer, TransactionId::new(key))?;
        insert_transaction_row(&mut tx, &transaction).await?;
        tx.commit().await.map_err(db_error)?;
        tracing::debug!(key, "transfer recorded");
        Ok(response)
    }

    async fn reset_transactions(&self) -> Result<Vec<Transaction>> {
        let seed: Vec<Transaction> = self.read_seed(Collection::Transactions).await?;
        let mut tx = self.begin_write(Collection::Transactions).await?;
        clear_collection(&mut tx, Collection::Transactions).await?;
        for transaction in &seed {
            insert_transaction_row(&mut tx, transaction).await?;
        }
        raise_high_water(&mut tx, Collection::Transactions, records::high_water_of(&seed)).await?;
        tx.commit().await.map_err(db_error)?;
        tracing::info!(records = seed.len(), "transactions reset from seed");
        Ok(seed)
    }
}
