use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Units outstanding for a fund and how they split across contributors.
///
/// Invariant: `units_by_contributor` sums to `total_units`. Only the ledger
/// mutates this, one event at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipState {
    total_units: Decimal,
    units_by_contributor: BTreeMap<String, Decimal>,
}

impl OwnershipState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from explicit balances
    pub fn from_units<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let mut state = Self::new();
        for (contributor, u) in units {
            state.apply(&contributor.into(), u);
        }
        state
    }

    pub fn total_units(&self) -> Decimal {
        self.total_units
    }

    pub fn units_of(&self, contributor: &str) -> Decimal {
        self.units_by_contributor
            .get(contributor)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn units_by_contributor(&self) -> &BTreeMap<String, Decimal> {
        &self.units_by_contributor
    }

    pub fn contributors(&self) -> impl Iterator<Item = &str> {
        self.units_by_contributor.keys().map(String::as_str)
    }

    /// Contributor's share of the fund in `[0, 1]`; 0 when no units are outstanding
    pub fn ownership_pct(&self, contributor: &str) -> Decimal {
        if self.total_units <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.units_of(contributor) / self.total_units
    }

    /// Sum of per-contributor balances; equals `total_units` by construction
    pub fn sum_of_contributor_units(&self) -> Decimal {
        self.units_by_contributor.values().copied().sum()
    }

    pub(crate) fn apply(&mut self, contributor: &str, units: Decimal) {
        *self
            .units_by_contributor
            .entry(contributor.to_string())
            .or_insert(Decimal::ZERO) += units;
        self.total_units += units;
    }
}

/// Gain or loss of a holding: its share of the fund's value minus the net cash
/// the contributor put in
pub fn gain_loss_for(
    ownership_pct: Decimal,
    current_total_value: Decimal,
    net_contribution: Decimal,
) -> Decimal {
    ownership_pct * current_total_value - net_contribution
}
