//! Context-free grammar model.
//!
//! A [`Grammar`] is built once through [`Grammar::define`], validated and then
//! frozen. All later stages treat it as read-only input; symbol and production
//! identifiers stay stable for the lifetime of the tables built from them.

use crate::types::{Map, Set};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);
impl TerminalID {
    /// Reserved terminal marking the end of input.
    pub const EOI: Self = Self(0);
    const OFFSET: u16 = 1;

    /// The dense column index of this terminal.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Recover a terminal identifier from its dense column index.
    pub const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

/// A set of terminal symbols, backed by a bitset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.0.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.0.into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| raw.try_into().map(TerminalID).unwrap())
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.0.into()).collect(),
        }
    }
}
impl crate::digraph::Merge for TerminalSet {
    fn union_with(&mut self, other: &Self) {
        self.union_with(other)
    }
}

#[derive(Debug)]
pub struct TerminalData {
    pub name: String,
    pub precedence: Option<Precedence>,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);
impl NonterminalID {
    /// Reserved nonterminal used as the left-hand side of the augmented rule.
    pub const START: Self = Self(0);
    const OFFSET: u16 = 1;

    /// The dense column index of this nonterminal.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u16);
impl ProductionID {
    /// Reserved identifier of the augmented production `#Start -> start #EOI`.
    pub const ACCEPT: Self = Self(u16::MAX);

    /// The declaration index of this production.
    ///
    /// User productions are numbered densely from zero in declaration order,
    /// which is also the reduce/reduce tie-break key.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "P#Accept"),
            _ => write!(f, "P#{:03}", self.0),
        }
    }
}

#[derive(Debug)]
pub struct Production {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
    pub precedence: Option<Precedence>,
}
impl Production {
    /// The precedence used when this production competes in a shift/reduce
    /// conflict: the explicit override if any, otherwise the precedence of the
    /// rightmost terminal on the right-hand side.
    pub fn effective_precedence(&self, g: &Grammar) -> Option<Precedence> {
        match self.precedence {
            Some(prec) => Some(prec),
            None => self.right.iter().rev().find_map(|s| match s {
                SymbolID::T(t) => g.terminals[t].precedence,
                SymbolID::N(_) => None,
            }),
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(|f| {
            write!(f, "{} -> ", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                f.write_str("ε")?;
            } else {
                for (i, r) in self.right.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match r {
                        SymbolID::N(n) => f.write_str(&g.nonterminals[n])?,
                        SymbolID::T(t) => f.write_str(&g.terminals[t].name)?,
                    }
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}
impl Precedence {
    pub const fn new(priority: u16, assoc: Assoc) -> Self {
        Self { priority, assoc }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::Nonassoc => f.write_str("nonassoc"),
        }
    }
}

/// Errors detected while freezing a grammar definition.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("the start symbol is not a registered nonterminal")]
    InvalidStartSymbol,

    #[error("the grammar declares no production for its start symbol")]
    NoStartSymbol,

    #[error("duplicate production rule for `{left}'")]
    DuplicateProduction { left: String },

    #[error("production references a symbol that is not registered")]
    UnknownSymbol,
}

/// The frozen grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, TerminalData>,
    pub nonterminals: Map<NonterminalID, String>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
    pub nullables: Set<NonterminalID>,
    /// The number of conflicts the grammar author has reviewed and accepts.
    pub expected_conflicts: usize,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef),
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start_symbol: None,
            expected_conflicts: 0,
            next_terminal: TerminalID::OFFSET,
            next_nonterminal: NonterminalID::OFFSET,
            next_production: 0,
        };

        def.terminals.insert(
            TerminalID::EOI,
            TerminalData {
                name: "#EOI".into(),
                precedence: None,
            },
        );
        def.nonterminals
            .insert(NonterminalID::START, "#Start".into());

        f(&mut def);

        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// Productions whose left-hand side is the specified nonterminal,
    /// in declaration order.
    pub fn productions_of(
        &self,
        left: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions
            .iter()
            .filter(move |(_, p)| p.left == left)
            .map(|(id, p)| (*id, p))
    }

    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn num_nonterminals(&self) -> usize {
        self.nonterminals.len()
    }

    /// Re-check the structural invariants of a frozen grammar.
    ///
    /// [`Grammar::define`] establishes these at construction time; the
    /// pipeline re-validates its input so that a model obtained any other
    /// way still fails fast instead of corrupting the build.
    pub fn validate(&self) -> Result<(), GrammarError> {
        if !self.nonterminals.contains_key(&self.start_symbol)
            || self.start_symbol == NonterminalID::START
        {
            return Err(GrammarError::InvalidStartSymbol);
        }
        if !self.productions.values().any(|p| p.left == self.start_symbol) {
            return Err(GrammarError::NoStartSymbol);
        }
        for p in self.productions.values() {
            if !self.nonterminals.contains_key(&p.left) {
                return Err(GrammarError::UnknownSymbol);
            }
            for s in &p.right {
                let known = match s {
                    SymbolID::T(t) => self.terminals.contains_key(t),
                    SymbolID::N(n) => self.nonterminals.contains_key(n),
                };
                if !known {
                    return Err(GrammarError::UnknownSymbol);
                }
            }
        }
        Ok(())
    }

    /// Nonterminals derivable from the start symbol.
    pub fn reachable_nonterminals(&self) -> Set<NonterminalID> {
        let mut reachable = Set::default();
        reachable.insert(NonterminalID::START);
        reachable.insert(self.start_symbol);
        let mut queue = vec![self.start_symbol];
        while let Some(n) = queue.pop() {
            for (_, p) in self.productions_of(n) {
                for s in &p.right {
                    if let SymbolID::N(next) = s {
                        if reachable.insert(*next) {
                            queue.push(*next);
                        }
                    }
                }
            }
        }
        reachable
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        for (i, t) in self.terminals.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", t.name)?;
        }
        write!(f, "\n#### nonterminals: ")?;
        for (i, n) in self.nonterminals.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", n)?;
        }
        writeln!(f, "\n#### productions:")?;
        for p in self.productions.values() {
            writeln!(f, "- {}", p.display(self))?;
        }
        Ok(())
    }
}

/// The contextual values for building a [`Grammar`].
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, TerminalData>,
    nonterminals: Map<NonterminalID, String>,
    productions: Map<ProductionID, Production>,
    start_symbol: Option<NonterminalID>,
    expected_conflicts: usize,
    next_terminal: u16,
    next_nonterminal: u16,
    next_production: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str, precedence: Option<Precedence>) -> TerminalID {
        let id = TerminalID(self.next_terminal);
        self.next_terminal += 1;
        self.terminals.insert(
            id,
            TerminalData {
                name: name.into(),
                precedence,
            },
        );
        id
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> NonterminalID {
        let id = NonterminalID(self.next_nonterminal);
        self.next_nonterminal += 1;
        self.nonterminals.insert(id, name.into());
        id
    }

    /// Add a production rule to this grammar.
    pub fn production<I>(
        &mut self,
        left: NonterminalID,
        right: I,
        precedence: Option<Precedence>,
    ) -> ProductionID
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let id = ProductionID(self.next_production);
        self.next_production += 1;
        self.productions.insert(
            id,
            Production {
                left,
                right: right.into_iter().collect(),
                precedence,
            },
        );
        id
    }

    /// Specify the start symbol for this grammar.
    ///
    /// Defaults to the first declared nonterminal when left unspecified.
    pub fn start_symbol(&mut self, start: NonterminalID) {
        self.start_symbol.replace(start);
    }

    /// Declare how many conflicts the author expects the tables to contain.
    pub fn expect_conflicts(&mut self, count: usize) {
        self.expected_conflicts = count;
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        let start_symbol = self
            .start_symbol
            .or_else(|| {
                self.nonterminals
                    .keys()
                    .find(|&&id| id != NonterminalID::START)
                    .copied()
            })
            .ok_or(GrammarError::NoStartSymbol)?;

        if !self.nonterminals.contains_key(&start_symbol) || start_symbol == NonterminalID::START {
            return Err(GrammarError::InvalidStartSymbol);
        }
        if !self.productions.values().any(|p| p.left == start_symbol) {
            return Err(GrammarError::NoStartSymbol);
        }

        for (id, p) in &self.productions {
            if !self.nonterminals.contains_key(&p.left) {
                return Err(GrammarError::UnknownSymbol);
            }
            for s in &p.right {
                let known = match s {
                    SymbolID::T(t) => self.terminals.contains_key(t),
                    SymbolID::N(n) => self.nonterminals.contains_key(n),
                };
                if !known {
                    return Err(GrammarError::UnknownSymbol);
                }
            }
            for (other_id, other) in &self.productions {
                if other_id > id && other.left == p.left && other.right == p.right {
                    return Err(GrammarError::DuplicateProduction {
                        left: self.nonterminals[&p.left].clone(),
                    });
                }
            }
        }

        // The end-of-input marker is part of the augmented rule, so the
        // lookahead computation needs no special case for it.
        self.productions.insert(
            ProductionID::ACCEPT,
            Production {
                left: NonterminalID::START,
                right: vec![SymbolID::N(start_symbol), SymbolID::T(TerminalID::EOI)],
                precedence: None,
            },
        );

        let mut nullables = Set::default();
        loop {
            let mut changed = false;
            for p in self.productions.values() {
                if p.right
                    .iter()
                    .all(|s| matches!(s, SymbolID::N(n) if nullables.contains(n)))
                {
                    changed |= nullables.insert(p.left);
                }
            }
            if !changed {
                break;
            }
        }

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            start_symbol,
            nullables,
            expected_conflicts: self.expected_conflicts,
        })
    }
}
