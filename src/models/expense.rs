//! Expense model.

use serde::{Deserialize, Serialize};

use super::ExpenseId;

/// A shared expense paid by one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Store-assigned identifier.
    pub id: ExpenseId,
    /// Expense date, as entered by the caller.
    pub date: String,
    /// Free-form description.
    pub description: String,
    /// Name of the person who paid.
    pub payer: String,
    /// Amount paid.
    pub amount: f64,
}

/// A validated expense that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    /// Expense date.
    pub date: String,
    /// Free-form description.
    pub description: String,
    /// Name of the person who paid.
    pub payer: String,
    /// Amount paid.
    pub amount: f64,
}

impl NewExpense {
    /// Attaches the store-assigned identifier.
    #[inline]
    #[must_use]
    pub fn into_expense(self, id: ExpenseId) -> Expense {
        Expense {
            id,
            date: self.date,
            description: self.description,
            payer: self.payer,
            amount: self.amount,
        }
    }

    /// Returns `true` if `expense` carries the same caller-provided fields.
    #[inline]
    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        self.date == expense.date
            && self.description == expense.description
            && self.payer == expense.payer
            && self.amount.total_cmp(&expense.amount).is_eq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lunch() -> NewExpense {
        NewExpense {
            date: "2024-01-01".to_owned(),
            description: "Lunch".to_owned(),
            payer: "Alice".to_owned(),
            amount: 12.5,
        }
    }

    #[test]
    fn into_expense_keeps_fields() {
        let expense = lunch().into_expense(ExpenseId::new(3));
        assert_eq!(expense.id, ExpenseId::new(3));
        assert!(lunch().matches(&expense));
    }

    #[test]
    fn matches_detects_difference() {
        let mut expense = lunch().into_expense(ExpenseId::new(1));
        expense.amount = 13.0;
        assert!(!lunch().matches(&expense));
    }

    #[test]
    fn deserialize_stored_expense() {
        let json = r#"{"id":1,"date":"2024-03-02","description":"Groceries","payer":"Bob","amount":54.2}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.id, ExpenseId::new(1));
        assert_eq!(expense.payer, "Bob");
    }
}
