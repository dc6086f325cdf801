//! Supported account currencies.
//!
//! Transfers do not compare currencies; callers that need that guarantee
//! check both accounts with [`ensure_currency`] first.

use crate::ledger::{Account, LedgerError};

/// United States dollar.
pub const USD: &str = "USD";

/// Euro.
pub const EUR: &str = "EUR";

/// Currencies an account may be opened in.
pub const SUPPORTED_CURRENCIES: [&str; 2] = [USD, EUR];

/// Returns true if `code` is a supported ISO 4217 code. Case-sensitive.
#[must_use]
pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Fails with [`LedgerError::CurrencyMismatch`] unless `account` holds `currency`.
pub fn ensure_currency(account: &Account, currency: &str) -> Result<(), LedgerError> {
    if account.currency == currency {
        return Ok(());
    }
    Err(LedgerError::CurrencyMismatch {
        account_id: account.id,
        expected: currency.to_string(),
        actual: account.currency.clone(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;
    use simplebank_shared::types::AccountId;

    use super::*;

    fn account(currency: &str) -> Account {
        Account {
            id: AccountId::new(9),
            owner: "carol".to_string(),
            balance: 0,
            currency: currency.to_string(),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case("USD", true)]
    #[case("EUR", true)]
    #[case("usd", false)]
    #[case("GBP", false)]
    #[case("", false)]
    fn test_is_supported_currency(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(is_supported_currency(code), expected);
    }

    #[test]
    fn test_ensure_currency_matches() {
        assert!(ensure_currency(&account(USD), USD).is_ok());
    }

    #[test]
    fn test_ensure_currency_mismatch() {
        let err = ensure_currency(&account(EUR), USD).unwrap_err();
        match err {
            LedgerError::CurrencyMismatch {
                account_id,
                expected,
                actual,
            } => {
                assert_eq!(account_id, AccountId::new(9));
                assert_eq!(expected, "USD");
                assert_eq!(actual, "EUR");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
