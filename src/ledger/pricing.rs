//! Static per-model pricing table.
//!
//! Prices are blended USD per million tokens. Real provider pricing
//! splits prompt/completion rates; a blended figure is accurate enough
//! for advisory budget accounting, which is all the ledger promises.

use std::collections::HashMap;

/// Blended USD per million tokens charged for models not in the table.
pub const DEFAULT_PRICE_PER_MILLION: f64 = 2.0;

/// Seed prices for commonly routed models.
const SEED_PRICES: &[(&str, f64)] = &[
    ("gpt-4o", 7.5),
    ("gpt-4o-mini", 0.45),
    ("gpt-4.1", 6.0),
    ("gpt-4.1-mini", 1.2),
    ("claude-sonnet-4", 9.0),
    ("claude-haiku-3.5", 2.4),
    ("llama-3.1-70b", 0.9),
];

/// Model identifier → price-per-million-tokens lookup.
#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, f64>,
    default_price: f64,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_seed()
    }
}

impl PricingTable {
    /// Table pre-populated with the seed prices.
    pub fn with_seed() -> Self {
        Self {
            prices: SEED_PRICES
                .iter()
                .map(|(model, price)| ((*model).to_owned(), *price))
                .collect(),
            default_price: DEFAULT_PRICE_PER_MILLION,
        }
    }

    /// Empty table (every model falls back to the default price).
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
            default_price: DEFAULT_PRICE_PER_MILLION,
        }
    }

    /// Set or override the price for a model.
    pub fn price(mut self, model: impl Into<String>, per_million_usd: f64) -> Self {
        self.prices.insert(model.into(), per_million_usd);
        self
    }

    /// Set the fallback price for unknown models.
    pub fn default_price(mut self, per_million_usd: f64) -> Self {
        self.default_price = per_million_usd;
        self
    }

    /// Price per million tokens for `model`, falling back to the default.
    pub fn price_for(&self, model: &str) -> f64 {
        self.prices
            .get(model)
            .copied()
            .unwrap_or(self.default_price)
    }

    /// Estimated USD cost of `tokens` tokens against `model`.
    pub fn estimate(&self, tokens: u64, model: &str) -> f64 {
        tokens as f64 / 1_000_000.0 * self.price_for(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_table_price() {
        let table = PricingTable::with_seed();
        let cost = table.estimate(1_000_000, "gpt-4o-mini");
        assert!((cost - 0.45).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_uses_default_price() {
        let table = PricingTable::with_seed();
        let cost = table.estimate(500_000, "some-new-model");
        assert!((cost - DEFAULT_PRICE_PER_MILLION / 2.0).abs() < 1e-9);
    }

    #[test]
    fn overrides_win() {
        let table = PricingTable::empty()
            .price("tiny", 0.1)
            .default_price(10.0);
        assert!((table.estimate(1_000_000, "tiny") - 0.1).abs() < 1e-9);
        assert!((table.estimate(100_000, "other") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(PricingTable::with_seed().estimate(0, "gpt-4o"), 0.0);
    }
}
