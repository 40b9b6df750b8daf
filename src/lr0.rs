//! LR(0) automaton construction.
//!
//! States are discovered breadth-first from the augmented item, assigned
//! sequential identifiers in first-seen order, and merged whenever a newly
//! computed item set has the same kernel as an existing state (isocore
//! merging). Kernels are kept sorted so that merging never depends on the
//! order in which items were produced.

use crate::{
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    observer::BuildObserver,
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl StateID {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Recover a state identifier from its dense row index.
    pub const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }
}

/// The LR(0) item, a.k.a. LR item core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub index: u16,
}
impl LR0Item {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let production = g.production(self.production);
            write!(f, "{} -> [ ", g.nonterminals[&production.left])?;
            for (i, r) in production.right.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                if i == self.index as usize {
                    f.write_str(". ")?;
                }
                match r {
                    SymbolID::N(n) => f.write_str(&g.nonterminals[n])?,
                    SymbolID::T(t) => f.write_str(&g.terminals[t].name)?,
                }
            }
            if production.right.len() == self.index as usize {
                write!(f, " .")?;
            }
            write!(f, " ]")
        })
    }
}

#[derive(Debug, Clone)]
pub struct LR0State {
    pub kernels: Vec<LR0Item>,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
    pub reduces: Set<ProductionID>,
}

impl LR0State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## kernels:")?;
            for kernel in &self.kernels {
                writeln!(f, "- {}", kernel.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminals[t].name, to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminals[n], to)?;
                }
            }
            if !self.reduces.is_empty() {
                writeln!(f, "## reduces:")?;
                for reduce in &self.reduces {
                    writeln!(f, "- {}", g.production(*reduce).display(g))?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
    pub start: StateID,
}

impl LR0Automaton {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

/// Calculate the LR(0) automaton for the specified grammar.
pub fn lr0(g: &Grammar, observer: &mut dyn BuildObserver) -> LR0Automaton {
    let nonkernels = nonkernels(g);

    let mut states = Map::<StateID, LR0State>::default();
    let mut state_id = {
        let mut next_state_id = 0;
        move || {
            let id = StateID(next_state_id);
            next_state_id += 1;
            id
        }
    };

    let start = state_id();
    let mut pending_states = VecDeque::<(StateID, Vec<LR0Item>)>::new();
    pending_states.push_back((
        start,
        vec![LR0Item {
            production: ProductionID::ACCEPT,
            index: 0,
        }],
    ));
    observer.state_discovered(start, 1);

    let mut items = Set::default();
    let mut new_kernels = Map::<SymbolID, Set<LR0Item>>::default();
    let mut isocores = Map::<Vec<LR0Item>, StateID>::default();
    while let Some((current, kernels)) = pending_states.pop_front() {
        observer.closure_started(current);

        items.clear();
        for kernel in &kernels {
            items.insert(*kernel);
            let production = g.production(kernel.production);
            if let Some(SymbolID::N(n)) = production.right.get::<usize>(kernel.index.into()) {
                items.extend(&nonkernels[n]);
            }
        }

        let mut reduces = Set::default();
        new_kernels.clear();
        for item in items.drain(..) {
            let production = g.production(item.production);
            match production.right.get::<usize>(item.index.into()) {
                Some(sym) => {
                    let new_kernel = new_kernels.entry(*sym).or_default();
                    new_kernel.insert(LR0Item {
                        index: item.index + 1,
                        ..item
                    });
                }
                None => {
                    reduces.insert(item.production);
                }
            }
        }
        // Explore outgoing edges by symbol index so that state numbering does
        // not depend on closure iteration order.
        new_kernels.sort_unstable_keys();

        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for (sym, new_kernel) in new_kernels.drain(..) {
            let mut new_kernel: Vec<_> = new_kernel.into_iter().collect();
            new_kernel.sort_unstable();
            let next = match isocores.get(&new_kernel) {
                Some(id) => {
                    observer.states_merged(*id);
                    *id
                }
                None => {
                    let id = state_id();
                    observer.state_discovered(id, new_kernel.len());
                    isocores.insert(new_kernel.clone(), id);
                    pending_states.push_back((id, new_kernel));
                    id
                }
            };
            match sym {
                SymbolID::T(t) => {
                    shifts.insert(t, next);
                }
                SymbolID::N(n) => {
                    gotos.insert(n, next);
                }
            }
        }

        states.insert(
            current,
            LR0State {
                kernels,
                shifts,
                gotos,
                reduces,
            },
        );
    }

    tracing::debug!(num_states = states.len(), "LR(0) automaton constructed");

    LR0Automaton { states, start }
}

/// The closure items contributed by each nonterminal: every production of the
/// nonterminal with the dot at position zero, plus (transitively) the same for
/// any nonterminal appearing directly after the dot.
fn nonkernels(g: &Grammar) -> Map<NonterminalID, Set<LR0Item>> {
    let mut nonkernels: Map<NonterminalID, Set<LR0Item>> = Map::default();
    for &n in g.nonterminals.keys() {
        let mut items = Set::default();
        for (id, _) in g.productions_of(n) {
            items.insert(LR0Item {
                production: id,
                index: 0,
            });
        }

        let mut added = Set::default();
        loop {
            added.clear();
            for item in &items {
                let production = g.production(item.production);
                if let Some(SymbolID::N(n)) = production.right.first() {
                    for (id, _) in g.productions_of(*n) {
                        added.insert(LR0Item {
                            production: id,
                            index: 0,
                        });
                    }
                }
            }

            let changed = added
                .drain(..)
                .fold(false, |changed, item| changed | items.insert(item));
            if !changed {
                break;
            }
        }
        nonkernels.insert(n, items);
    }
    nonkernels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use SymbolID::*;

    fn right_recursive() -> Grammar {
        // S -> a S | a
        Grammar::define(|g| {
            let a = g.terminal("a", None);
            let s = g.nonterminal("S");
            g.start_symbol(s);
            g.production(s, [T(a), N(s)], None);
            g.production(s, [T(a)], None);
        })
        .unwrap()
    }

    #[test]
    fn start_state_holds_augmented_item() {
        let g = right_recursive();
        let automaton = lr0(&g, &mut NullObserver);
        let start = &automaton.states[&automaton.start];
        assert_eq!(
            start.kernels,
            vec![LR0Item {
                production: ProductionID::ACCEPT,
                index: 0
            }]
        );
    }

    #[test]
    fn every_state_reachable_from_start() {
        let g = right_recursive();
        let automaton = lr0(&g, &mut NullObserver);

        let mut seen = Set::default();
        let mut queue = VecDeque::from([automaton.start]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let state = &automaton.states[&id];
            queue.extend(state.shifts.values().copied());
            queue.extend(state.gotos.values().copied());
        }
        assert_eq!(seen.len(), automaton.num_states());
    }

    #[test]
    fn isocore_merging_ignores_item_order() {
        // Both branches of S reach the same kernel for the trailing `b`.
        let g = Grammar::define(|g| {
            let a = g.terminal("a", None);
            let b = g.terminal("b", None);
            let c = g.terminal("c", None);
            let s = g.nonterminal("S");
            let x = g.nonterminal("X");
            g.start_symbol(s);
            g.production(s, [T(a), N(x)], None);
            g.production(s, [T(c), N(x)], None);
            g.production(x, [T(b)], None);
        })
        .unwrap();
        let automaton = lr0(&g, &mut NullObserver);

        // The `X -> [ b . ]` kernel must exist exactly once.
        let reduce_states: Vec<_> = automaton
            .states
            .values()
            .filter(|s| {
                s.kernels
                    .iter()
                    .any(|k| k.production != ProductionID::ACCEPT && k.index == 1)
                    && !s.reduces.is_empty()
            })
            .collect();
        let b_states = reduce_states
            .iter()
            .filter(|s| s.kernels.len() == 1 && s.reduces.len() == 1)
            .count();
        assert!(b_states >= 1);

        let mut kernels: Vec<_> = automaton
            .states
            .values()
            .map(|s| s.kernels.clone())
            .collect();
        let total = kernels.len();
        kernels.sort();
        kernels.dedup();
        assert_eq!(kernels.len(), total, "duplicate kernels imply a failed merge");
    }

    #[test]
    fn discovery_is_deterministic() {
        let g1 = right_recursive();
        let g2 = right_recursive();
        let a1 = lr0(&g1, &mut NullObserver);
        let a2 = lr0(&g2, &mut NullObserver);

        assert_eq!(a1.num_states(), a2.num_states());
        for (id, s1) in &a1.states {
            let s2 = &a2.states[id];
            assert_eq!(s1.kernels, s2.kernels);
            let shifts1: Vec<_> = s1.shifts.iter().collect();
            let shifts2: Vec<_> = s2.shifts.iter().collect();
            assert_eq!(shifts1, shifts2);
            let gotos1: Vec<_> = s1.gotos.iter().collect();
            let gotos2: Vec<_> = s2.gotos.iter().collect();
            assert_eq!(gotos1, gotos2);
        }
    }
}
