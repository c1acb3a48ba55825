//! Top-up amount, accepting the legacy numeric-string shape.

use serde::{Deserialize, Serialize};

/// Monetary amount of a top-up.
///
/// New clients should send a JSON number. The `Text` form exists for
/// compatibility with older clients that sent the amount as a string; it is
/// stored exactly as given so that reading it back yields the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// Numeric amount.
    Number(f64),
    /// Legacy amount carried as text, e.g. `"20"`.
    Text(String),
}

impl Amount {
    /// Returns the numeric value, parsing the legacy text form.
    ///
    /// Returns `None` if the text is not a finite number.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match *self {
            Self::Number(value) => value.is_finite().then_some(value),
            Self::Text(ref text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
        }
    }

    /// Returns `true` for the legacy string-typed form.
    #[inline]
    #[must_use]
    pub const fn is_legacy_text(&self) -> bool {
        matches!(*self, Self::Text(_))
    }
}

impl From<f64> for Amount {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl core::fmt::Display for Amount {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::Number(value) => write!(f, "{value:.2}"),
            Self::Text(ref text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_amount_is_preserved() {
        let amount: Amount = serde_json::from_str(r#""20""#).unwrap();
        assert_eq!(amount, Amount::Text("20".to_owned()));
        assert!(amount.is_legacy_text());
        assert_eq!(serde_json::to_string(&amount).unwrap(), r#""20""#);
        assert_eq!(amount.value(), Some(20.0));
    }

    #[test]
    fn number_amount() {
        let amount: Amount = serde_json::from_str("12.5").unwrap();
        assert_eq!(amount, Amount::Number(12.5));
        assert!(!amount.is_legacy_text());
    }

    #[test]
    fn non_numeric_text_has_no_value() {
        assert_eq!(Amount::Text("twenty".to_owned()).value(), None);
        assert_eq!(Amount::Text("inf".to_owned()).value(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Amount::Number(3.0).to_string(), "3.00");
        assert_eq!(Amount::Text("7".to_owned()).to_string(), "7");
    }
}
