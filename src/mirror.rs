//! Local mirror of a remote collection with optimistic updates.
//!
//! A [`Mirror`] holds what a client currently believes a collection looks
//! like. Creates show up immediately as [`Entry::Pending`] rows at the head
//! and then move through an explicit state machine:
//!
//! ```text
//!             begin_create
//!                  │
//!                  ▼
//!              Pending ──confirm / confirm_with_snapshot──▶ Confirmed
//!                  │
//!              roll_back
//!                  │
//!                  ▼
//!           (removed, error recorded)
//! ```
//!
//! The mirror is pure state. The network side lives in [`crate::hooks`].

use crate::error::SplitbookError;

/// Sentinel identifying an optimistic entry until the store confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingId(u64);

impl core::fmt::Display for PendingId {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pending-{}", self.0)
    }
}

/// One row of a mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<R, D> {
    /// Shown optimistically; the store has not answered yet.
    Pending {
        /// Sentinel for this entry.
        id: PendingId,
        /// What the caller asked to create.
        draft: D,
    },
    /// A record the store has acknowledged.
    Confirmed(R),
}

impl<R, D> Entry<R, D> {
    /// Returns the confirmed record, if any.
    #[inline]
    #[must_use]
    pub const fn record(&self) -> Option<&R> {
        match *self {
            Self::Confirmed(ref record) => Some(record),
            Self::Pending { .. } => None,
        }
    }

    /// Returns `true` for an optimistic entry.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(*self, Self::Pending { .. })
    }

    /// Returns `true` if this is the pending entry `id`.
    fn is_pending_id(&self, id: PendingId) -> bool {
        matches!(*self, Self::Pending { id: entry_id, .. } if entry_id == id)
    }
}

/// Client-side copy of a collection of `R` records created from `D` drafts.
#[derive(Debug, Clone, PartialEq)]
pub struct Mirror<R, D> {
    /// Rows in display order: pending entries first, then confirmed ones.
    entries: Vec<Entry<R, D>>,
    /// A fetch or reset is in flight.
    loading: bool,
    /// User-facing message of the last failure, cleared by a good refresh.
    last_error: Option<String>,
    /// Next sentinel value.
    next_pending: u64,
}

impl<R, D> Default for Mirror<R, D> {
    #[inline]
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            loading: false,
            last_error: None,
            next_pending: 0,
        }
    }
}

impl<R, D> Mirror<R, D> {
    /// Creates an empty mirror.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every row in display order.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Entry<R, D>] {
        &self.entries
    }

    /// Iterates over confirmed records only.
    #[inline]
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().filter_map(Entry::record)
    }

    /// Number of entries still waiting for the store.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_pending()).count()
    }

    /// Number of rows, pending ones included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no rows at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` while a fetch or reset is in flight.
    #[inline]
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the message of the last recorded failure.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Records a failure for display.
    #[inline]
    pub fn record_error(&mut self, error: &SplitbookError) {
        tracing::warn!(error = %error, "mirror operation failed");
        self.last_error = Some(error.user_message());
    }

    /// Marks a fetch as started.
    #[inline]
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Completes a fetch.
    ///
    /// On success the confirmed rows become `snapshot` (pending rows stay at
    /// the head) and the last error is cleared. On failure the rows are
    /// left as they were and the error is recorded.
    #[inline]
    pub fn finish_load(&mut self, result: Result<Vec<R>, SplitbookError>) {
        self.loading = false;
        match result {
            Ok(snapshot) => {
                self.install(snapshot);
                self.last_error = None;
            }
            Err(error) => self.record_error(&error),
        }
    }

    /// Inserts an optimistic entry at the head and returns its sentinel.
    #[inline]
    pub fn begin_create(&mut self, draft: D) -> PendingId {
        let id = PendingId(self.next_pending);
        self.next_pending = self.next_pending.wrapping_add(1);
        self.entries.insert(0, Entry::Pending { id, draft });
        id
    }

    /// Confirms `id` by adopting an authoritative snapshot.
    ///
    /// The sentinel disappears; other pending entries keep their place at
    /// the head, followed by `snapshot`. Returns `false` if `id` was no
    /// longer pending (the snapshot is installed anyway).
    #[inline]
    pub fn confirm_with_snapshot(&mut self, id: PendingId, snapshot: Vec<R>) -> bool {
        let found = self.take_pending(id).is_some();
        self.install(snapshot);
        found
    }

    /// Confirms `id` by swapping the sentinel for the stored record in
    /// place. Returns `false` if `id` was no longer pending.
    #[inline]
    pub fn confirm(&mut self, id: PendingId, record: R) -> bool {
        match self.entries.iter_mut().find(|entry| entry.is_pending_id(id)) {
            Some(entry) => {
                *entry = Entry::Confirmed(record);
                true
            }
            None => false,
        }
    }

    /// Removes the pending entry `id` after the store refused it, records
    /// the error and hands the draft back.
    #[inline]
    pub fn roll_back(&mut self, id: PendingId, error: &SplitbookError) -> Option<D> {
        self.record_error(error);
        self.take_pending(id)
    }

    /// Clears every row ahead of a reset and marks the mirror as loading.
    #[inline]
    pub fn begin_reset(&mut self) {
        self.entries.clear();
        self.loading = true;
    }

    /// Completes a reset: installs the seed, or records the error and
    /// stays empty until the next successful load.
    #[inline]
    pub fn finish_reset(&mut self, result: Result<Vec<R>, SplitbookError>) {
        self.loading = false;
        match result {
            Ok(seed) => {
                self.install(seed);
                self.last_error = None;
            }
            Err(error) => self.record_error(&error),
        }
    }

    /// Removes the first confirmed record matching `pred`, returning it with
    /// its former position so it can be put back.
    #[inline]
    pub fn remove_where<F: Fn(&R) -> bool>(&mut self, pred: F) -> Option<(usize, R)> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.record().is_some_and(&pred))?;
        match self.entries.remove(index) {
            Entry::Confirmed(record) => Some((index, record)),
            // `position` only matches confirmed rows.
            Entry::Pending { .. } => None,
        }
    }

    /// Puts a previously removed record back at `index` (or at the end if
    /// the mirror has shrunk since).
    #[inline]
    pub fn restore(&mut self, index: usize, record: R) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, Entry::Confirmed(record));
    }

    /// Replaces confirmed rows with `snapshot`, keeping pending rows first.
    fn install(&mut self, snapshot: Vec<R>) {
        self.entries.retain(Entry::is_pending);
        self.entries
            .extend(snapshot.into_iter().map(Entry::Confirmed));
    }

    /// Removes and returns the draft of pending entry `id`.
    fn take_pending(&mut self, id: PendingId) -> Option<D> {
        let index = self.entries.iter().position(|entry| entry.is_pending_id(id))?;
        match self.entries.remove(index) {
            Entry::Pending { draft, .. } => Some(draft),
            Entry::Confirmed(_) => None,
        }
    }
}
