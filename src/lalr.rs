//! LALR(1) look-ahead set computation.
//!
//! The algorithm is DeRemer and Pennello's relational method\[1\]: direct-read
//! sets on goto transitions are propagated through the `reads` and `includes`
//! relations with the DIGRAPH procedure until the whole-graph fixpoint is
//! reached, then attached to reductions through the `lookback` relation.
//! All relations are iterated in goto-discovery order, so the resulting sets
//! are identical across runs of the same grammar.
//!
//! \[1\]: DeRemer and Pennello, Efficient Computation of LALR(1) Look-Ahead Sets
//!       <https://dl.acm.org/doi/10.1145/69622.357187>

use crate::{
    digraph::digraph,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalSet},
    lr0::{LR0Automaton, StateID},
    observer::BuildObserver,
    types::{Map, Set},
};
use std::fmt;

/// A goto transition, identified by its source state and nonterminal label.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Goto {
    pub from: StateID,
    pub symbol: NonterminalID,
}

impl fmt::Debug for Goto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.from, self.symbol)
    }
}

/// A reduction, identified by the state performing it and the production
/// being reduced.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reduce {
    pub state: StateID,
    pub production: ProductionID,
}

impl fmt::Debug for Reduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.state, self.production)
    }
}

/// The finished look-ahead sets for every reduction in the automaton.
#[derive(Debug)]
pub struct LookaheadSets {
    lookaheads: Map<Reduce, TerminalSet>,
}

impl LookaheadSets {
    pub fn get(&self, state: StateID, production: ProductionID) -> Option<&TerminalSet> {
        self.lookaheads.get(&Reduce { state, production })
    }
}

/// Compute the look-ahead sets corresponding to the reductions in the provided
/// LR(0) automaton.
pub fn lalr(g: &Grammar, lr0: &LR0Automaton, observer: &mut dyn BuildObserver) -> LookaheadSets {
    // Step 0: extract goto transitions and their direct-read sets.
    //
    //   DirectRead(p,A) := { t \in T | \exists r s.t. p --(A)--> r --(t)--> ... }
    let mut gotos = Map::default();
    let mut direct_reads = Map::<Goto, TerminalSet>::default();
    for (&from, state) in &lr0.states {
        for (&n, &to) in &state.gotos {
            let key = Goto { from, symbol: n };
            gotos.insert(key, to);
            direct_reads.insert(key, lr0.states[&to].shifts.keys().copied().collect());
        }
    }

    // - (p,A) `reads` (r,C) <==> p --(A)--> r --(C)--> && C =>* ε
    // - (p,A) `includes` (p',B) <==> B -> βAγ, γ =>* ε, p' -(β)-> p
    // - (q, A->ω) `lookback` (p,A) <==> p --(ω)--> q
    let reads = calc_reads(g, lr0, &gotos);
    let includes = calc_includes(g, lr0, &gotos);
    let lookbacks = calc_lookbacks(g, lr0);

    // Step 1: Read(p,A) = DirectRead(p,A) \cup \bigcup { Read(r,C) | (p,A) `reads` (r,C) }
    let mut follows = direct_reads;
    digraph(&mut follows, |a, b| {
        reads.get(a).map_or(false, |r| r.contains(b))
    });

    // Step 2: Follow(p,A) = Read(p,A) \cup \bigcup { Follow(p',B) | (p,A) `includes` (p',B) }
    digraph(&mut follows, |a, b| {
        includes.get(a).map_or(false, |i| i.contains(b))
    });

    // Step 3: LA(q,A->ω) = \bigcup { Follow(p,A) | (q,A->ω) `lookback` (p,A) }
    let mut lookaheads = Map::<_, TerminalSet>::default();
    for (&from, lr0_state) in &lr0.states {
        for &production in &lr0_state.reduces {
            let reduce_id = Reduce {
                state: from,
                production,
            };
            let entry = lookaheads.entry(reduce_id).or_default();
            if let Some(lookbacks) = lookbacks.get(&reduce_id) {
                for goto in lookbacks {
                    if let Some(follows) = follows.get(goto) {
                        entry.union_with(follows);
                    }
                }
            }
            observer.lookahead_computed(from, entry.len());
        }
    }

    tracing::debug!(
        num_gotos = gotos.len(),
        num_reductions = lookaheads.len(),
        "LALR look-ahead sets computed"
    );

    LookaheadSets { lookaheads }
}

fn calc_reads(g: &Grammar, lr0: &LR0Automaton, gotos: &Map<Goto, StateID>) -> Map<Goto, Set<Goto>> {
    let mut reads = Map::<Goto, Set<Goto>>::default();

    for (a_key, r) in gotos {
        reads.entry(*a_key).or_default().extend(
            lr0.states[r]
                .gotos
                .keys()
                .filter(|&c| g.nullables.contains(c))
                .map(|&c| Goto {
                    from: *r,
                    symbol: c,
                }),
        );
    }

    reads
}

fn calc_includes(
    g: &Grammar,
    lr0: &LR0Automaton,
    gotos: &Map<Goto, StateID>,
) -> Map<Goto, Set<Goto>> {
    let mut includes = Map::<Goto, Set<Goto>>::default();

    for a_key in gotos.keys() {
        for b_key in gotos.keys() {
            for p in g.productions.values() {
                // B -> β A γ with γ =>* ε; the same A may occur several times
                // in one right-hand side, each occurrence is its own edge.
                if p.left != b_key.symbol {
                    continue;
                }
                'occurrence: for (i, s) in p.right.iter().enumerate() {
                    if !matches!(s, SymbolID::N(n) if *n == a_key.symbol) {
                        continue;
                    }
                    let is_gamma_nullable = p.right[i + 1..]
                        .iter()
                        .all(|s| matches!(s, SymbolID::N(n) if g.nullables.contains(n)));
                    if !is_gamma_nullable {
                        continue;
                    }

                    // p' -->(β)--> p
                    let mut current = b_key.from;
                    for n in &p.right[..i] {
                        let next = match n {
                            SymbolID::T(t) => lr0.states[&current].shifts.get(t),
                            SymbolID::N(n) => lr0.states[&current].gotos.get(n),
                        };
                        match next {
                            Some(next) => current = *next,
                            None => continue 'occurrence,
                        }
                    }
                    if current == a_key.from {
                        includes.entry(*a_key).or_default().insert(*b_key);
                    }
                }
            }
        }
    }

    includes
}

fn calc_lookbacks(g: &Grammar, lr0: &LR0Automaton) -> Map<Reduce, Set<Goto>> {
    let mut lookbacks = Map::<Reduce, Set<Goto>>::default();

    for &from in lr0.states.keys() {
        for (&p_id, p) in &g.productions {
            let mut current = from;
            let mut right = &p.right[..];
            while !right.is_empty() {
                let next = match &right[0] {
                    SymbolID::T(t) => lr0.states[&current].shifts.get(t),
                    SymbolID::N(n) => lr0.states[&current].gotos.get(n),
                };
                match next {
                    Some(next) => {
                        current = *next;
                        right = &right[1..];
                    }
                    None => break,
                }
            }
            if right.is_empty() {
                let reduce = Reduce {
                    state: current,
                    production: p_id,
                };
                lookbacks.entry(reduce).or_default().insert(Goto {
                    from,
                    symbol: p.left,
                });
            }
        }
    }

    lookbacks
}
