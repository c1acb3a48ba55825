//! Top-up model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, TopUpId};

/// Money added to a user's balance. Top-ups are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUp {
    /// Store-assigned identifier.
    pub id: TopUpId,
    /// Name of the user being topped up.
    pub user: String,
    /// Amount as sent by the caller.
    pub amount: Amount,
    /// Server-assigned creation time.
    pub date: DateTime<Utc>,
}

/// A validated top-up that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopUp {
    /// Name of the user being topped up.
    pub user: String,
    /// Amount, preserved in the form it was given.
    pub amount: Amount,
}

impl NewTopUp {
    /// Attaches the store-assigned identifier and creation time.
    #[inline]
    #[must_use]
    pub fn into_topup(self, id: TopUpId, date: DateTime<Utc>) -> TopUp {
        TopUp {
            id,
            user: self.user,
            amount: self.amount,
            date,
        }
    }
}
