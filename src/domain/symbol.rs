use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Asset-class bucket a symbol name is classified into. Every symbol lands in
/// exactly one category, `Other` being the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolCategory {
    ForexMajors,
    ForexMinors,
    ForexExotics,
    VolatilityIndices,
    BoomCrash,
    JumpIndices,
    StepIndices,
    Indices,
    Commodities,
    Metals,
    Crypto,
    Other,
}

impl SymbolCategory {
    /// Which analyzer groups apply to this category, per the symbol-category
    /// dispatch table: forex-family symbols get forex-oriented analyzers,
    /// synthetic-family symbols get synthetic-oriented analyzers, everything
    /// else gets the general group. Candlestick/chart/structural analyzers
    /// run unconditionally.
    pub fn is_forex_family(&self) -> bool {
        matches!(
            self,
            SymbolCategory::ForexMajors | SymbolCategory::ForexMinors | SymbolCategory::ForexExotics
        )
    }

    pub fn is_synthetic_family(&self) -> bool {
        matches!(
            self,
            SymbolCategory::VolatilityIndices
                | SymbolCategory::BoomCrash
                | SymbolCategory::JumpIndices
                | SymbolCategory::StepIndices
        )
    }
}

const FOREX_MAJORS: &[&str] = &["EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "USDCAD", "NZDUSD"];
const FOREX_MINORS: &[&str] = &[
    "EURJPY", "EURGBP", "EURCHF", "EURCAD", "EURAUD", "EURNZD",
    "GBPJPY", "GBPCHF", "GBPCAD", "GBPAUD", "GBPNZD",
    "CHFJPY", "CADCHF", "AUDCHF", "NZDCHF",
    "CADJPY", "AUDJPY", "NZDJPY",
    "AUDCAD", "AUDNZD", "CADNZD",
];
const VOLATILITY_INDICES: &[&str] = &["VOLATILITY", "VIX"];
const BOOM_CRASH: &[&str] = &["BOOM", "CRASH"];
const JUMP_INDICES: &[&str] = &["JUMP"];
const STEP_INDICES: &[&str] = &["STEP", "STEPRISE", "STEPFALL", "RISEFALL", "HIGHLOW"];
const INDICES: &[&str] = &["SPX", "FTSE", "DAX", "CAC40", "NIKKEI", "ASX", "HSI", "NAS100", "US30"];
const COMMODITIES: &[&str] = &["WTI", "BRENT", "NATGAS", "OIL"];
const METALS: &[&str] = &["XAU", "XAG", "XPT", "XPD", "GOLD", "SILVER", "COPPER"];
const CRYPTO: &[&str] = &["BTC", "ETH", "XRP", "LTC", "BCH", "ADA", "DOGE", "SOL"];

/// Currency codes the source treats as "exotic" counterparties, checked
/// against the major codes `{USD, EUR, GBP}` per `_is_forex_exotic`.
const EXOTIC_CURRENCY_CODES: &[&str] =
    &["ZAR", "TRY", "MXN", "BRL", "CNY", "INR", "RUB", "SGD", "HKD", "NOK", "SEK", "DKK"];
const EXOTIC_MAJOR_COUNTERPARTS: &[&str] = &["USD", "EUR", "GBP"];

/// Pure string classifier for bridge symbol names.
///
/// A name-prefix/suffix classifier cascade, split into a finer-grained
/// category enum.
pub struct SymbolCatalog {
    known: HashSet<String>,
}

impl SymbolCatalog {
    pub fn new() -> Self {
        Self {
            known: HashSet::new(),
        }
    }

    /// Classifies a symbol name. Idempotent and total: every input lands in
    /// exactly one category.
    pub fn classify(symbol_name: &str) -> SymbolCategory {
        let upper = symbol_name.to_uppercase();

        if FOREX_MAJORS.iter().any(|s| upper == *s) {
            return SymbolCategory::ForexMajors;
        }
        if FOREX_MINORS.iter().any(|s| upper == *s) {
            return SymbolCategory::ForexMinors;
        }
        if VOLATILITY_INDICES.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::VolatilityIndices;
        }
        if BOOM_CRASH.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::BoomCrash;
        }
        if JUMP_INDICES.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::JumpIndices;
        }
        if STEP_INDICES.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::StepIndices;
        }

        // Exotic forex: an exotic-currency code paired with one of the three
        // major counterparts, checked before metals/crypto/commodities/
        // indices so e.g. a USD/ZAR pair doesn't fall through to `Other`.
        let has_exotic_code = EXOTIC_CURRENCY_CODES.iter().any(|s| upper.contains(s));
        let has_major_counterpart = EXOTIC_MAJOR_COUNTERPARTS.iter().any(|s| upper.contains(s));
        if has_exotic_code && has_major_counterpart {
            return SymbolCategory::ForexExotics;
        }

        if METALS.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::Metals;
        }
        if CRYPTO.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::Crypto;
        }
        if COMMODITIES.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::Commodities;
        }
        if INDICES.iter().any(|s| upper.contains(s)) {
            return SymbolCategory::Indices;
        }

        SymbolCategory::Other
    }

    /// Replaces the tracked symbol set and reports what changed relative to
    /// the previous snapshot.
    pub fn refresh(&mut self, symbols: &[String]) -> SymbolDiff {
        let new_set: HashSet<String> = symbols.iter().cloned().collect();

        let added: Vec<String> = new_set.difference(&self.known).cloned().collect();
        let removed: Vec<String> = self.known.difference(&new_set).cloned().collect();

        self.known = new_set;

        SymbolDiff { added, removed }
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`SymbolCatalog::refresh`]: symbols newly seen and symbols no
/// longer present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majors_and_minors() {
        assert_eq!(SymbolCatalog::classify("EURUSD"), SymbolCategory::ForexMajors);
        assert_eq!(SymbolCatalog::classify("eurjpy"), SymbolCategory::ForexMinors);
    }

    #[test]
    fn test_synthetics() {
        assert_eq!(SymbolCatalog::classify("Volatility 75 Index"), SymbolCategory::VolatilityIndices);
        assert_eq!(SymbolCatalog::classify("Boom 1000 Index"), SymbolCategory::BoomCrash);
        assert_eq!(SymbolCatalog::classify("Jump 50 Index"), SymbolCategory::JumpIndices);
        assert_eq!(SymbolCatalog::classify("Step Index"), SymbolCategory::StepIndices);
    }

    #[test]
    fn test_metals_commodities_crypto_indices() {
        assert_eq!(SymbolCatalog::classify("XAUUSD"), SymbolCategory::Metals);
        assert_eq!(SymbolCatalog::classify("WTI"), SymbolCategory::Commodities);
        assert_eq!(SymbolCatalog::classify("BTCUSD"), SymbolCategory::Crypto);
        assert_eq!(SymbolCatalog::classify("US30"), SymbolCategory::Indices);
    }

    #[test]
    fn test_exotic_forex_fallback() {
        assert_eq!(SymbolCatalog::classify("USDZAR"), SymbolCategory::ForexExotics);
    }

    #[test]
    fn test_minors_with_exotic_looking_codes_are_not_misclassified_as_exotic() {
        assert_eq!(SymbolCatalog::classify("EURAUD"), SymbolCategory::ForexMinors);
        assert_eq!(SymbolCatalog::classify("CHFJPY"), SymbolCategory::ForexMinors);
    }

    #[test]
    fn test_unknown_falls_to_other() {
        assert_eq!(SymbolCatalog::classify("UNKNOWNSYMBOL123"), SymbolCategory::Other);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let a = SymbolCatalog::classify("EURUSD");
        let b = SymbolCatalog::classify("EURUSD");
        assert_eq!(a, b);
    }

    #[test]
    fn test_refresh_reports_added_and_removed() {
        let mut catalog = SymbolCatalog::new();
        let first = catalog.refresh(&["EURUSD".to_string(), "GBPUSD".to_string()]);
        assert_eq!(first.added.len(), 2);
        assert!(first.removed.is_empty());

        let second = catalog.refresh(&["EURUSD".to_string(), "XAUUSD".to_string()]);
        assert_eq!(second.added, vec!["XAUUSD".to_string()]);
        assert_eq!(second.removed, vec!["GBPUSD".to_string()]);
    }

    #[test]
    fn test_forex_family_and_synthetic_family_groupings() {
        assert!(SymbolCategory::ForexMajors.is_forex_family());
        assert!(!SymbolCategory::ForexMajors.is_synthetic_family());
        assert!(SymbolCategory::BoomCrash.is_synthetic_family());
        assert!(!SymbolCategory::Crypto.is_forex_family());
        assert!(!SymbolCategory::Crypto.is_synthetic_family());
    }
}
