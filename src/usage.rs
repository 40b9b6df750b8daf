//! Unused-symbol and dead-production analysis.
//!
//! Pure scans over the frozen grammar and the finished tables, run after
//! table construction. Findings are advisory; they never block emission.

use crate::{
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    table::{Action, ParseTable},
    types::Set,
};

/// What the checker found.
#[derive(Debug, Default)]
pub struct UsageReport {
    /// Terminals with no non-error action cell in any state.
    pub unused_terminals: Vec<TerminalID>,

    /// Nonterminals referenced by no right-hand side (start symbol excepted).
    pub unused_nonterminals: Vec<NonterminalID>,

    /// Productions no reduce entry ever targets.
    pub never_reduced: Vec<ProductionID>,
}

impl UsageReport {
    pub fn is_clean(&self) -> bool {
        self.unused_terminals.is_empty()
            && self.unused_nonterminals.is_empty()
            && self.never_reduced.is_empty()
    }
}

/// Determine unused terminals and nonterminals, and productions that can
/// never reduce.
pub fn check(g: &Grammar, table: &ParseTable) -> UsageReport {
    let mut used_terminals = Set::default();
    for state in (0..table.num_states()).map(crate::lr0::StateID::from_index) {
        for (t, action) in table.actions_of(state) {
            if !matches!(action, Action::Error) {
                used_terminals.insert(t);
            }
        }
    }

    let mut referenced_nonterminals = Set::default();
    referenced_nonterminals.insert(g.start_symbol);
    for p in g.productions.values() {
        for s in &p.right {
            if let SymbolID::N(n) = s {
                referenced_nonterminals.insert(*n);
            }
        }
    }

    let reduced = table.referenced_productions();

    let unused_terminals = g
        .terminals
        .keys()
        .filter(|&&t| t != TerminalID::EOI && !used_terminals.contains(&t))
        .copied()
        .collect();
    let unused_nonterminals = g
        .nonterminals
        .keys()
        .filter(|&&n| n != NonterminalID::START && !referenced_nonterminals.contains(&n))
        .copied()
        .collect();
    let never_reduced = g
        .productions
        .keys()
        .filter(|&&p| p != ProductionID::ACCEPT && !reduced.contains(&p))
        .copied()
        .collect();

    UsageReport {
        unused_terminals,
        unused_nonterminals,
        never_reduced,
    }
}
