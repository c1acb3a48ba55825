//! User model.

use serde::{Deserialize, Serialize};

use super::UserId;

/// A person taking part in shared expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Bank account for settling up, if known.
    #[serde(default)]
    pub bank_account: Option<String>,
}

impl User {
    /// Returns the lightweight reference embedded in transactions.
    #[inline]
    #[must_use]
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Reference to a [`User`] held by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Referenced user identifier.
    pub id: UserId,
    /// User name at the time the transaction was recorded.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_user() {
        let json = r#"{"id":1,"name":"Alice","email":"alice@example.com","bankAccount":"FR76 3000"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId::new(1));
        assert_eq!(user.bank_account.as_deref(), Some("FR76 3000"));
    }

    #[test]
    fn bank_account_is_optional() {
        let json = r#"{"id":2,"name":"Bob","email":"bob@example.com"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.bank_account.is_none());
    }

    #[test]
    fn null_bank_account_serializes_as_null() {
        let user = User {
            id: UserId::new(3),
            name: "Cleo".to_owned(),
            email: "cleo@example.com".to_owned(),
            bank_account: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains(r#""bankAccount":null"#));
    }

    #[test]
    fn to_ref_copies_id_and_name() {
        let user = User {
            id: UserId::new(5),
            name: "Dan".to_owned(),
            email: "dan@example.com".to_owned(),
            bank_account: None,
        };
        assert_eq!(
            user.to_ref(),
            UserRef {
                id: UserId::new(5),
                name: "Dan".to_owned()
            }
        );
    }
}
