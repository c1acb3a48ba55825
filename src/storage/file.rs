//! JSON-file-based storage backend.
//!
//! Stores each collection as a JSON array in its own file under a
//! configurable directory (default: `$XDG_DATA_HOME/splitbook/`). Seed
//! datasets live next to the live files as `<collection>.init.json` unless a
//! separate seed directory is configured.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Collection;
use super::records::{self, Keyed};
use crate::error::{Result, SplitbookError};
use crate::models::{
    Expense, ExpenseId, NewExpense, NewTopUp, NewTransfer, TopUp, TopUpId, Transaction,
    TransactionId, Transfer, User,
};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "splitbook";

/// File holding per-collection ID high-water marks.
const META_FILE: &str = "meta.json";
/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// Metadata stored alongside collection files.
#[derive(Debug, Serialize, Deserialize, Default)]
struct Meta {
    /// Next free key per collection name. Never decreases.
    #[serde(default)]
    high_water: BTreeMap<String, i64>,
}

impl Meta {
    /// Returns the high-water mark of a collection (0 if never written).
    fn high_water(&self, collection: Collection) -> i64 {
        self.high_water
            .get(collection.name())
            .copied()
            .unwrap_or_default()
    }

    /// Raises the high-water mark of a collection to at least `next`.
    fn raise(&mut self, collection: Collection, next: i64) {
        let entry = self
            .high_water
            .entry(collection.name().to_owned())
            .or_default();
        *entry = (*entry).max(next);
    }
}

/// File-backed storage that persists each collection as a JSON file.
///
/// # Consistency
///
/// Every mutation reads the whole collection, modifies it in memory and
/// overwrites the whole file. The overwrite goes to a temporary file that
/// is then renamed over the live one, so a reader never observes a partial
/// write and a failed write leaves the previous state intact.
///
/// # Concurrency
///
/// Within a process, an in-process [`Mutex`] serializes access. Across
/// processes, an advisory lock on `storage.lock` does the same (using
/// [`std::fs::File::lock`] / [`std::fs::File::lock_shared`]). Reads take a
/// shared lock and writes an exclusive one, so concurrent creates are not
/// lost.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock               (cross-process lock sentinel)
///   meta.json                  (ID high-water marks)
///   expenses.json
///   topups.json
///   users.json
///   transactions.json
/// <seed_dir>/                  (defaults to <dir>)
///   expenses.init.json
///   users.init.json
///   transactions.init.json
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Directory containing the live collection files.
    dir: PathBuf,
    /// Directory containing the seed files.
    seed_dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist. Also
    /// opens (or creates) the `storage.lock` sentinel file. Seeds are read
    /// from the same directory until [`FileStorage::with_seed_dir`] says
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        tracing::debug!(dir = %dir.display(), "opened file storage");
        Ok(Self {
            seed_dir: dir.clone(),
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Reads seed datasets from `seed_dir` instead of the data directory.
    #[inline]
    #[must_use]
    pub fn with_seed_dir(mut self, seed_dir: PathBuf) -> Self {
        self.seed_dir = seed_dir;
        self
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/splitbook/` (typically
    /// `~/.local/share/splitbook/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                SplitbookError::StorageUnavailable(
                    "could not determine platform data directory".into(),
                )
            })
    }

    /// Returns the directory holding the live collection files.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the directory holding the seed files.
    #[inline]
    #[must_use]
    pub fn seed_dir(&self) -> &Path {
        &self.seed_dir
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the full path for a given file name in the data directory.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Only surface the unlock error when the operation succeeded;
        // otherwise the original error is more useful.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads a live collection. A missing file reads as an empty
    /// collection; a malformed one is a storage failure.
    fn read_collection<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let path = self.path(&collection.file_name());
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                tracing::error!(%collection, error = %err, "stored collection is malformed");
                SplitbookError::StorageUnavailable(Box::new(err))
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically overwrites a live collection (write-to-tmp then rename).
    fn write_collection<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)?;
        self.write_atomic(&collection.file_name(), &json)
    }

    /// Writes `contents` to `<name>.tmp` and renames it over `<name>`.
    fn write_atomic(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.path(name);
        let tmp_path = self.path(&format!("{name}.tmp"));
        fs::write(&tmp_path, contents).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
        Ok(())
    }

    /// Reads the metadata file.
    fn read_meta(&self) -> Result<Meta> {
        let path = self.path(META_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| SplitbookError::StorageUnavailable(Box::new(err))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Meta::default()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically writes the metadata file.
    fn write_meta(&self, meta: &Meta) -> Result<()> {
        let json = serde_json::to_string_pretty(meta)?;
        self.write_atomic(META_FILE, &json)
    }

    /// Reads a collection under a shared lock.
    fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        self.with_shared_lock(|| self.read_collection(collection))
    }

    /// Appends a record built from the next free key and persists the
    /// raised high-water mark, then the collection.
    ///
    /// A failure after the mark is written only retires an unused key.
    fn append<T, F>(&self, collection: Collection, build: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Keyed + Clone,
        F: FnOnce(i64) -> T,
    {
        self.with_exclusive_lock(|| {
            let mut items: Vec<T> = self.read_collection(collection)?;
            let mut meta = self.read_meta()?;
            let key = records::next_key(meta.high_water(collection), &items)?;
            let record = build(key);
            items.push(record.clone());
            meta.raise(collection, key.saturating_add(1));
            self.write_meta(&meta)?;
            self.write_collection(collection, &items)?;
            tracing::debug!(%collection, key, "appended record");
            Ok(record)
        })
    }

    /// Reads a seed dataset.
    fn read_seed<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let path = self.seed_dir.join(collection.seed_file_name());
        let contents = fs::read_to_string(&path).map_err(seed_io_error)?;
        serde_json::from_str(&contents).map_err(|err| SplitbookError::SeedUnavailable(Box::new(err)))
    }

    /// Replaces a live collection with its seed. The seed is fully read and
    /// parsed before anything is written.
    fn reset_collection<T>(&self, collection: Collection) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Keyed,
    {
        self.with_exclusive_lock(|| {
            let seed: Vec<T> = self.read_seed(collection)?;
            let mut meta = self.read_meta()?;
            match self.read_collection::<T>(collection) {
                Ok(current) => meta.raise(collection, records::high_water_of(&current)),
                Err(err) => {
                    tracing::warn!(%collection, error = %err, "replacing unreadable collection");
                }
            }
            meta.raise(collection, records::high_water_of(&seed));
            self.write_meta(&meta)?;
            self.write_collection(collection, &seed)?;
            tracing::info!(%collection, records = seed.len(), "collection reset from seed");
            Ok(seed)
        })
    }

    /// Returns the first expense with the given ID.
    fn find_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let expenses: Vec<Expense> = self.list(Collection::Expenses)?;
        Ok(expenses.into_iter().find(|expense| expense.id == id))
    }

    /// Appends a new expense.
    fn insert_expense(&self, expense: NewExpense) -> Result<Expense> {
        self.append(Collection::Expenses, |key| {
            expense.into_expense(ExpenseId::new(key))
        })
    }

    /// Removes the first expense with the given ID.
    fn remove_expense(&self, id: ExpenseId) -> Result<bool> {
        self.with_exclusive_lock(|| {
            let mut expenses: Vec<Expense> = self.read_collection(Collection::Expenses)?;
            let next = records::high_water_of(&expenses);
            if !records::remove_first(&mut expenses, |expense| expense.id == id) {
                tracing::debug!(%id, "expense not found, nothing deleted");
                return Ok(false);
            }
            // Records written outside this store never raised the mark.
            let mut meta = self.read_meta()?;
            if meta.high_water(Collection::Expenses) < next {
                meta.raise(Collection::Expenses, next);
                self.write_meta(&meta)?;
            }
            self.write_collection(Collection::Expenses, &expenses)?;
            tracing::debug!(%id, "expense deleted");
            Ok(true)
        })
    }

    /// Appends a new top-up stamped with the current time.
    fn insert_topup(&self, topup: NewTopUp) -> Result<TopUp> {
        let now = Utc::now();
        self.append(Collection::TopUps, |key| {
            topup.into_topup(TopUpId::new(key), now)
        })
    }

    /// Records a transfer between two stored users.
    fn insert_transfer(&self, transfer: NewTransfer) -> Result<Transfer> {
        self.with_exclusive_lock(|| {
            let users: Vec<User> = self.read_collection(Collection::Users)?;
            let mut transactions: Vec<Transaction> =
                self.read_collection(Collection::Transactions)?;
            let mut meta = self.read_meta()?;
            let key = records::next_key(meta.high_water(Collection::Transactions), &transactions)?;
            let (transaction, response) =
                records::build_transfer(&users, transfer, TransactionId::new(key))?;
            transactions.push(transaction);
            meta.raise(Collection::Transactions, key.saturating_add(1));
            self.write_meta(&meta)?;
            self.write_collection(Collection::Transactions, &transactions)?;
            tracing::debug!(key, "transfer recorded");
            Ok(response)
        })
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Wraps an I/O error into a [`SplitbookError::StorageUnavailable`].
fn storage_io_error(err: io::Error) -> SplitbookError {
    SplitbookError::StorageUnavailable(Box::new(err))
}

/// Wraps a seed I/O error into a [`SplitbookError::SeedUnavailable`].
fn seed_io_error(err: io::Error) -> SplitbookError {
    SplitbookError::SeedUnavailable(Box::new(err))
}

/// Wraps a mutex poison error into a [`SplitbookError::StorageUnavailable`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> SplitbookError {
    SplitbookError::StorageUnavailable(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for FileStorage {
    #[inline]
    fn expenses(&self) -> Result<Vec<Expense>> {
        self.list(Collection::Expenses)
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
        self.reset_collection(Collection::Expenses)
    }

    #[inline]
    fn topups(&self) -> Result<Vec<TopUp>> {
        self.list(Collection::TopUps)
    }

    #[inline]
    fn create_topup(&self, topup: NewTopUp) -> Result<TopUp> {
        self.insert_topup(topup)
    }

    #[inline]
    fn users(&self) -> Result<Vec<User>> {
        self.list(Collection::Users)
    }

    #[inline]
    fn reset_users(&self) -> Result<Vec<User>> {
        self.reset_collection(Collection::Users)
    }

    #[inline]
    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.list(Collection::Transactions)
    }

    #[inline]
    fn create_transfer(&self, transfer: NewTransfer) -> Result<Transfer> {
        self.insert_transfer(transfer)
    }

    #[inline]
    fn reset_transactions(&self) -> Result<Vec<Transaction>> {
        self.reset_collection(Collection::Transactions)
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for FileStorage {
    #[inline]
    fn expenses(&self) -> impl Future<Output = Result<Vec<Expense>>> + Send {
        core::future::ready(self.list(Collection::Expenses))
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
        core::future::ready(self.reset_collection(Collection::Expenses))
    }

    #[inline]
    fn topups(&self) -> impl Future<Output = Result<Vec<TopUp>>> + Send {
        core::future::ready(self.list(Collection::TopUps))
    }

    #[inline]
    fn create_topup(&self, topup: NewTopUp) -> impl Future<Output = Result<TopUp>> + Send {
        core::future::ready(self.insert_topup(topup))
    }

    #[inline]
    fn users(&self) -> impl Future<Output = Result<Vec<User>>> + Send {
        core::future::ready(self.list(Collection::Users))
    }

    #[inline]
    fn reset_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send {
        core::future::ready(self.reset_collection(Collection::Users))
    }

    #[inline]
    fn transactions(&self) -> impl Future<Output = Result<Vec<Transaction>>> + Send {
        core::future::ready(self.list(Collection::Transactions))
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
        core::future::ready(self.reset_collection(Collection::Transactions))
    }
}
