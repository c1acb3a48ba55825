//! Client-side ordering of expense snapshots.
//!
//! Sorting is a pure transform over a fetched snapshot: it never touches
//! the store and uses a stable sort, so applying the same order twice gives
//! the same result as applying it once.

use core::cmp::Ordering;

use crate::models::Expense;

/// Order in which to present expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ExpenseSort {
    /// Stored order.
    #[default]
    Unsorted,
    /// Oldest first.
    DateAsc,
    /// Newest first.
    DateDesc,
    /// Cheapest first.
    AmountAsc,
    /// Most expensive first.
    AmountDesc,
    /// By payer name.
    Payer,
    /// By description.
    Description,
}

impl ExpenseSort {
    /// Compares two expenses under this order.
    ///
    /// [`ExpenseSort::Unsorted`] treats every pair as equal, which leaves a
    /// stable sort as the identity.
    #[inline]
    #[must_use]
    pub fn compare(self, a: &Expense, b: &Expense) -> Ordering {
        match self {
            Self::Unsorted => Ordering::Equal,
            Self::DateAsc => a.date.cmp(&b.date),
            Self::DateDesc => b.date.cmp(&a.date),
            Self::AmountAsc => a.amount.total_cmp(&b.amount),
            Self::AmountDesc => b.amount.total_cmp(&a.amount),
            Self::Payer => a.payer.cmp(&b.payer),
            Self::Description => a.description.cmp(&b.description),
        }
    }

    /// Sorts `expenses` in place.
    #[inline]
    pub fn sort(self, expenses: &mut [Expense]) {
        if self != Self::Unsorted {
            expenses.sort_by(|a, b| self.compare(a, b));
        }
    }

    /// Returns a sorted copy of `expenses`, leaving the input untouched.
    #[inline]
    #[must_use]
    pub fn apply(self, expenses: &[Expense]) -> Vec<Expense> {
        let mut sorted = expenses.to_vec();
        self.sort(&mut sorted);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseId;

    fn expense(id: i64, date: &str, payer: &str, amount: f64) -> Expense {
        Expense {
            id: ExpenseId::new(id),
            date: date.to_owned(),
            description: format!("item {id}"),
            payer: payer.to_owned(),
            amount,
        }
    }

    fn snapshot() -> Vec<Expense> {
        vec![
            expense(1, "2024-03-01", "Bob", 20.0),
            expense(2, "2024-01-15", "Alice", 5.5),
            expense(3, "2024-02-10", "Bob", 20.0),
            expense(4, "2024-01-15", "Cleo", 99.0),
        ]
    }

    fn ids(expenses: &[Expense]) -> Vec<i64> {
        expenses.iter().map(|e| e.id.get()).collect()
    }

    #[test]
    fn unsorted_keeps_stored_order() {
        assert_eq!(ids(&ExpenseSort::Unsorted.apply(&snapshot())), vec![1, 2, 3, 4]);
    }

    #[test]
    fn date_orders_are_stable() {
        assert_eq!(ids(&ExpenseSort::DateAsc.apply(&snapshot())), vec![2, 4, 3, 1]);
        assert_eq!(ids(&ExpenseSort::DateDesc.apply(&snapshot())), vec![1, 3, 2, 4]);
    }

    #[test]
    fn amount_orders() {
        assert_eq!(ids(&ExpenseSort::AmountAsc.apply(&snapshot())), vec![2, 1, 3, 4]);
        assert_eq!(ids(&ExpenseSort::AmountDesc.apply(&snapshot())), vec![4, 1, 3, 2]);
    }

    #[test]
    fn payer_order_keeps_ties_in_place() {
        assert_eq!(ids(&ExpenseSort::Payer.apply(&snapshot())), vec![2, 1, 3, 4]);
    }

    #[test]
    fn sorting_twice_equals_sorting_once() {
        for order in [
            ExpenseSort::Unsorted,
            ExpenseSort::DateAsc,
            ExpenseSort::DateDesc,
            ExpenseSort::AmountAsc,
            ExpenseSort::AmountDesc,
            ExpenseSort::Payer,
            ExpenseSort::Description,
        ] {
            let once = order.apply(&snapshot());
            let twice = order.apply(&once);
            assert_eq!(once, twice, "{order:?}");
        }
    }

    #[test]
    fn apply_does_not_mutate_input() {
        let input = snapshot();
        let _sorted = ExpenseSort::AmountDesc.apply(&input);
        assert_eq!(input, snapshot());
    }
}
