use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A point-in-time read of the bridge's connected account.
///
/// Identity is the triple `(login, server, company)` — not the whole struct —
/// because balance/equity/margin legitimately change tick to tick without
/// meaning the user switched accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub login: u64,
    pub server: String,
    pub name: String,
    pub company: String,
    pub currency: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin_level: Decimal,
    pub timestamp: i64,
}

impl AccountSnapshot {
    pub fn is_same_account(&self, other: &AccountSnapshot) -> bool {
        self.login == other.login && self.server == other.server && self.company == other.company
    }

    /// Balance/equity moved by more than 10%, or margin level by more than 5
    /// percentage points, relative to `other`.
    pub fn has_changed_significantly(&self, other: &AccountSnapshot) -> bool {
        use rust_decimal_macros::dec;
        let balance_change = (self.balance - other.balance).abs()
            / other.balance.abs().max(Decimal::ONE);
        let equity_change =
            (self.equity - other.equity).abs() / other.equity.abs().max(Decimal::ONE);
        let margin_change = (self.margin_level - other.margin_level).abs();

        balance_change > dec!(0.10) || equity_change > dec!(0.10) || margin_change > dec!(5)
    }

    /// `hash(login, server)`, used as the [`Session`] identifier.
    pub fn session_id(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.login.hash(&mut hasher);
        self.server.hash(&mut hasher);
        hasher.finish()
    }
}

/// One continuous connection to a specific account on a specific broker,
/// bounded by `AccountChanged` events.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: AccountSnapshot,
    pub session_id: u64,
}

impl Session {
    pub fn born(account: AccountSnapshot) -> Self {
        let session_id = account.session_id();
        Self { account, session_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(login: u64, server: &str, balance: Decimal, equity: Decimal, margin: Decimal) -> AccountSnapshot {
        AccountSnapshot {
            login,
            server: server.to_string(),
            name: "Trader".to_string(),
            company: "Broker".to_string(),
            currency: "USD".to_string(),
            balance,
            equity,
            margin_level: margin,
            timestamp: 0,
        }
    }

    #[test]
    fn test_same_account_identity_ignores_balance() {
        let a = account(1, "S1", dec!(1000), dec!(1000), dec!(200));
        let b = account(1, "S1", dec!(5000), dec!(5000), dec!(500));
        assert!(a.is_same_account(&b));
    }

    #[test]
    fn test_different_login_is_different_account() {
        let a = account(1, "S1", dec!(1000), dec!(1000), dec!(200));
        let b = account(2, "S1", dec!(1000), dec!(1000), dec!(200));
        assert!(!a.is_same_account(&b));
    }

    #[test]
    fn test_significant_change_balance_threshold() {
        let a = account(1, "S1", dec!(1100), dec!(1000), dec!(200));
        let b = account(1, "S1", dec!(1000), dec!(1000), dec!(200));
        assert!(a.has_changed_significantly(&b));
    }

    #[test]
    fn test_no_significant_change_within_threshold() {
        let a = account(1, "S1", dec!(1050), dec!(1000), dec!(202));
        let b = account(1, "S1", dec!(1000), dec!(1000), dec!(200));
        assert!(!a.has_changed_significantly(&b));
    }

    #[test]
    fn test_session_born_from_account() {
        let a = account(1, "S1", dec!(1000), dec!(1000), dec!(200));
        let session = Session::born(a.clone());
        assert_eq!(session.session_id, a.session_id());
    }
}
