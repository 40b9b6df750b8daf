//! Parse table construction with conflict resolution.
//!
//! The action and goto tables are dense: one row per automaton state, one
//! column per terminal (respectively nonterminal). Conflicted cells are
//! resolved by precedence declarations where possible and by the configured
//! [`ResolutionPolicy`] otherwise, but every conflict is recorded regardless
//! of how it was settled. Resolution is a policy choice, not evidence that
//! the grammar is unambiguous.

use crate::{
    grammar::{Assoc, Grammar, NonterminalID, Precedence, ProductionID, TerminalID},
    lalr::LookaheadSets,
    lr0::{LR0Automaton, StateID},
    observer::BuildObserver,
    types::{Map, Set},
    util::display_fn,
};
use std::{cmp::Ordering, fmt};

/// A single cell of the action table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read the lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce by the specified production.
    Reduce(ProductionID),

    Accept,

    /// Reject the lookahead symbol.
    ///
    /// Also used for cells whose shift/reduce conflict was resolved as
    /// neither by a nonassoc declaration.
    Error,
}

/// How a conflicted cell without applicable precedence is settled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShiftReduceDefault {
    /// Keep the shift, the yacc-lineage default.
    PreferShift,
    PreferReduce,
}

/// Which of several competing reductions wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReduceReduceDefault {
    /// The production declared earliest in the grammar, the yacc-lineage
    /// default.
    EarliestDeclared,
    LatestDeclared,
}

/// The conflict resolution policy applied by [`build`].
///
/// The defaults mirror long-standing LALR tooling conventions; they are
/// configurable because they are conventions, not properties derived from
/// the grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResolutionPolicy {
    pub shift_reduce: ShiftReduceDefault,
    pub reduce_reduce: ReduceReduceDefault,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            shift_reduce: ShiftReduceDefault::PreferShift,
            reduce_reduce: ReduceReduceDefault::EarliestDeclared,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

/// The decision recorded for a conflicted cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The shift won. `by_precedence` tells whether declared precedence
    /// decided the cell or the policy default did.
    Shift { by_precedence: bool },

    /// The specified reduction won.
    Reduce {
        production: ProductionID,
        by_precedence: bool,
    },

    /// Equal precedence with nonassoc: the cell became an error entry.
    Error,
}

/// A recorded ambiguity: one (state, lookahead) cell with more than one
/// possible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub symbol: TerminalID,
    pub shift: Option<StateID>,
    pub reduces: Vec<ProductionID>,
    pub resolution: Resolution,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        if self.shift.is_some() {
            ConflictKind::ShiftReduce
        } else {
            ConflictKind::ReduceReduce
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            match self.kind() {
                ConflictKind::ShiftReduce => write!(f, "shift/reduce")?,
                ConflictKind::ReduceReduce => write!(f, "reduce/reduce")?,
            }
            write!(
                f,
                " conflict in {:?} on {}:",
                self.state, g.terminals[&self.symbol].name
            )?;
            if let Some(next) = self.shift {
                write!(f, " shift({:?})", next)?;
            }
            for reduce in &self.reduces {
                write!(f, " reduce({})", g.production(*reduce).display(g))?;
            }
            Ok(())
        })
    }
}

/// The finished parse tables. Read-only after construction.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseTable {
    num_states: usize,
    num_terminals: usize,
    num_nonterminals: usize,
    actions: Vec<Action>,
    gotos: Vec<Option<StateID>>,
    default_reduce: Vec<Option<ProductionID>>,
}

impl ParseTable {
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Action {
        self.actions[state.index() * self.num_terminals + lookahead.index()]
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.gotos[state.index() * self.num_nonterminals + symbol.index()]
    }

    /// The reduction applied when no lookahead column matches, used by
    /// error-recovering drivers as a row shortcut.
    pub fn default_reduce(&self, state: StateID) -> Option<ProductionID> {
        self.default_reduce[state.index()]
    }

    /// Iterate one state's action row in terminal-index order.
    pub fn actions_of(
        &self,
        state: StateID,
    ) -> impl Iterator<Item = (TerminalID, Action)> + '_ {
        let row = &self.actions
            [state.index() * self.num_terminals..(state.index() + 1) * self.num_terminals];
        row.iter()
            .enumerate()
            .map(|(i, action)| (TerminalID::from_index(i), *action))
    }

    /// Every production referenced by a reduce cell or a default-reduce entry.
    pub fn referenced_productions(&self) -> Set<ProductionID> {
        let mut referenced = Set::default();
        for action in &self.actions {
            if let Action::Reduce(p) = action {
                referenced.insert(*p);
            }
        }
        referenced.extend(self.default_reduce.iter().flatten().copied());
        referenced
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for state in (0..self.num_states).map(StateID::from_index) {
                writeln!(f, "#### State {:?}", state)?;
                writeln!(f, "## actions")?;
                for (t, action) in self.actions_of(state) {
                    let name = &g.terminals[&t].name;
                    match action {
                        Action::Shift(n) => writeln!(f, "- {} => shift({:?})", name, n)?,
                        Action::Reduce(p) => {
                            writeln!(f, "- {} => reduce({})", name, g.production(p).display(g))?
                        }
                        Action::Accept => writeln!(f, "- {} => accept", name)?,
                        Action::Error => (),
                    }
                }
                writeln!(f, "## gotos")?;
                for (i, n) in g.nonterminals.keys().enumerate() {
                    if let Some(next) = self.gotos[state.index() * self.num_nonterminals + i] {
                        writeln!(f, "- {} => goto({:?})", g.nonterminals[n], next)?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Convert the automaton and its look-ahead sets into dense parse tables,
/// recording every conflict encountered.
pub fn build(
    g: &Grammar,
    lr0: &LR0Automaton,
    lookaheads: &LookaheadSets,
    policy: &ResolutionPolicy,
    observer: &mut dyn BuildObserver,
) -> (ParseTable, Vec<Conflict>) {
    let num_states = lr0.num_states();
    let num_terminals = g.num_terminals();
    let num_nonterminals = g.num_nonterminals();

    let mut actions = vec![Action::Error; num_states * num_terminals];
    let mut gotos = vec![None; num_states * num_nonterminals];
    let mut default_reduce = vec![None; num_states];
    let mut conflicts = Vec::new();

    for (&id, state) in &lr0.states {
        #[derive(Default)]
        struct Pending {
            shift: Option<StateID>,
            accept: bool,
            reduces: Vec<ProductionID>,
        }
        let mut pending = Map::<TerminalID, Pending>::default();
        for (&t, &next) in &state.shifts {
            let cell = pending.entry(t).or_default();
            if t == TerminalID::EOI {
                // Shifting the end marker completes the augmented production.
                // Its successor is still recorded, so a competing reduction
                // shows up as a shift/reduce conflict against the accepting
                // transition.
                cell.accept = true;
            }
            cell.shift = Some(next);
        }
        for &reduce in &state.reduces {
            if reduce == ProductionID::ACCEPT {
                continue;
            }
            if let Some(la) = lookaheads.get(id, reduce) {
                for t in la.iter() {
                    pending.entry(t).or_default().reduces.push(reduce);
                }
            }
        }
        pending.sort_unstable_keys();
        for cell in pending.values_mut() {
            cell.reduces.sort_unstable();
        }

        for (t, cell) in &pending {
            let resolved = resolve_cell(g, *t, cell.shift, cell.accept, &cell.reduces, policy);
            if let Some(conflict) = resolved.conflict {
                let conflict = Conflict {
                    state: id,
                    symbol: *t,
                    shift: cell.shift,
                    reduces: cell.reduces.clone(),
                    resolution: conflict,
                };
                observer.conflict_resolved(&conflict);
                conflicts.push(conflict);
            }
            actions[id.index() * num_terminals + t.index()] = resolved.action;
            observer.action_emitted(id, *t);
        }

        for (&n, &next) in &state.gotos {
            gotos[id.index() * num_nonterminals + n.index()] = Some(next);
        }

        default_reduce[id.index()] = pick_default_reduce(
            &actions[id.index() * num_terminals..(id.index() + 1) * num_terminals],
        );
    }

    tracing::debug!(
        num_states,
        num_conflicts = conflicts.len(),
        "parse tables constructed"
    );

    (
        ParseTable {
            num_states,
            num_terminals,
            num_nonterminals,
            actions,
            gotos,
            default_reduce,
        },
        conflicts,
    )
}

struct ResolvedCell {
    action: Action,
    conflict: Option<Resolution>,
}

impl ResolvedCell {
    fn unambiguous(action: Action) -> Self {
        Self {
            action,
            conflict: None,
        }
    }
}

fn resolve_cell(
    g: &Grammar,
    symbol: TerminalID,
    shift: Option<StateID>,
    accept: bool,
    reduces: &[ProductionID],
    policy: &ResolutionPolicy,
) -> ResolvedCell {
    if accept {
        // A reduction competing with the end marker can only come from an
        // imprecise LALR lookahead; accepting wins, but the ambiguity is
        // still reported.
        let conflict = (!reduces.is_empty()).then_some(Resolution::Shift {
            by_precedence: false,
        });
        return ResolvedCell {
            action: Action::Accept,
            conflict,
        };
    }

    match (shift, reduces) {
        (Some(next), []) => ResolvedCell::unambiguous(Action::Shift(next)),
        (None, [reduce]) => ResolvedCell::unambiguous(Action::Reduce(*reduce)),
        (None, []) => ResolvedCell::unambiguous(Action::Error),

        (shift, reduces) => {
            // Several reductions first race among themselves, then the winner
            // races the shift.
            let reduce = match policy.reduce_reduce {
                ReduceReduceDefault::EarliestDeclared => *reduces.first().unwrap(),
                ReduceReduceDefault::LatestDeclared => *reduces.last().unwrap(),
            };

            let Some(next) = shift else {
                return ResolvedCell {
                    action: Action::Reduce(reduce),
                    conflict: Some(Resolution::Reduce {
                        production: reduce,
                        by_precedence: false,
                    }),
                };
            };

            let shift_prec = g.terminals[&symbol].precedence;
            let reduce_prec = g.production(reduce).effective_precedence(g);
            let (action, resolution) = match compare_precs(shift_prec, reduce_prec) {
                Some(PrecWinner::Shift) => (
                    Action::Shift(next),
                    Resolution::Shift {
                        by_precedence: true,
                    },
                ),
                Some(PrecWinner::Reduce) => (
                    Action::Reduce(reduce),
                    Resolution::Reduce {
                        production: reduce,
                        by_precedence: true,
                    },
                ),
                Some(PrecWinner::Neither) => (Action::Error, Resolution::Error),
                None => match policy.shift_reduce {
                    ShiftReduceDefault::PreferShift => (
                        Action::Shift(next),
                        Resolution::Shift {
                            by_precedence: false,
                        },
                    ),
                    ShiftReduceDefault::PreferReduce => (
                        Action::Reduce(reduce),
                        Resolution::Reduce {
                            production: reduce,
                            by_precedence: false,
                        },
                    ),
                },
            };
            ResolvedCell {
                action,
                conflict: Some(resolution),
            }
        }
    }
}

enum PrecWinner {
    Shift,
    Reduce,
    Neither,
}

fn compare_precs(
    shift_prec: Option<Precedence>,
    reduce_prec: Option<Precedence>,
) -> Option<PrecWinner> {
    match (shift_prec, reduce_prec) {
        (Some(p1), Some(p2)) => match Ord::cmp(&p1.priority, &p2.priority) {
            Ordering::Greater => Some(PrecWinner::Shift),
            Ordering::Less => Some(PrecWinner::Reduce),
            Ordering::Equal => match p1.assoc {
                Assoc::Left => Some(PrecWinner::Reduce),
                Assoc::Right => Some(PrecWinner::Shift),
                Assoc::Nonassoc => Some(PrecWinner::Neither),
            },
        },
        _ => None,
    }
}

/// The most frequent reduction of a row, ties broken toward the earliest
/// declared production. `None` for rows without any reduce cell.
fn pick_default_reduce(row: &[Action]) -> Option<ProductionID> {
    let mut counts = Map::<ProductionID, usize>::default();
    for action in row {
        if let Action::Reduce(p) = action {
            *counts.entry(*p).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(p1, c1), (p2, c2)| c1.cmp(c2).then(p2.cmp(p1)))
        .map(|(p, _)| p)
}
