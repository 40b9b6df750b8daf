//! The compilation pipeline.
//!
//! `compile` runs the stages in order — automaton construction, look-ahead
//! computation, table building, usage checking, reporting — and applies the
//! two gates the caller relies on: structural grammar errors abort before the
//! automaton is built, and a conflict count above the declared expectation
//! marks the outcome as failed so that no code is emitted from drifting
//! grammars. Every run owns its own automaton, tables and diagnostic sink;
//! nothing is shared between concurrent runs.

use crate::{
    grammar::{Grammar, GrammarError},
    lalr::{self, LookaheadSets},
    lr0::{self, LR0Automaton},
    observer::{BuildObserver, NullObserver},
    report::{DiagnosticSink, Report},
    table::{self, Conflict, ParseTable, ResolutionPolicy},
    usage::{self, UsageReport},
};

/// Knobs for one compilation run.
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct Options {
    pub policy: ResolutionPolicy,
}

/// How the run ended, from the caller's point of view.
///
/// Exit-code mapping is left to the embedding tool; the pipeline never
/// terminates the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    WarningsOnly,
    /// Blocking errors are present and code emission must be skipped.
    Failed,
}

/// Everything one `compile` call produced.
///
/// Tables and diagnostics are returned together so the caller can answer
/// "did it succeed", "what tables resulted" and "what was diagnosed"
/// without re-running any stage.
#[derive(Debug)]
#[non_exhaustive]
pub struct CompileOutcome {
    pub status: Status,
    pub automaton: LR0Automaton,
    pub lookaheads: LookaheadSets,
    pub table: ParseTable,
    pub conflicts: Vec<Conflict>,
    pub usage: UsageReport,
    pub report: Report,
}

impl CompileOutcome {
    /// Whether a code generator may consume [`CompileOutcome::table`].
    pub fn may_emit(&self) -> bool {
        self.status != Status::Failed
    }
}

/// Compile the grammar into LALR(1) parse tables and diagnostics.
pub fn compile(g: &Grammar, options: &Options) -> Result<CompileOutcome, GrammarError> {
    compile_with_observer(g, options, &mut NullObserver)
}

/// Like [`compile`], but reporting trace events to the supplied observer.
pub fn compile_with_observer(
    g: &Grammar,
    options: &Options,
    observer: &mut dyn BuildObserver,
) -> Result<CompileOutcome, GrammarError> {
    g.validate()?;

    let mut sink = DiagnosticSink::default();

    let reachable = g.reachable_nonterminals();
    for (n, name) in &g.nonterminals {
        if !reachable.contains(n) {
            sink.warning(format!(
                "nonterminal `{}' is not reachable from the start symbol",
                name
            ));
        }
    }

    let automaton = {
        let _span = tracing::debug_span!("lr0").entered();
        lr0::lr0(g, observer)
    };
    let lookaheads = {
        let _span = tracing::debug_span!("lalr").entered();
        lalr::lalr(g, &automaton, observer)
    };
    let (table, conflicts) = {
        let _span = tracing::debug_span!("table").entered();
        table::build(g, &automaton, &lookaheads, &options.policy, observer)
    };

    for conflict in &conflicts {
        sink.warning(format!("{}", conflict.display(g)));
    }
    if conflicts.len() > g.expected_conflicts {
        sink.error(format!(
            "{} conflict(s) detected, but only {} expected",
            conflicts.len(),
            g.expected_conflicts
        ));
    }

    let usage = usage::check(g, &table);
    for t in &usage.unused_terminals {
        sink.warning(format!(
            "terminal `{}' is declared but never used",
            g.terminals[t].name
        ));
    }
    for n in &usage.unused_nonterminals {
        sink.warning(format!(
            "nonterminal `{}' is declared but never used",
            g.nonterminals[n]
        ));
    }
    for p in &usage.never_reduced {
        sink.warning(format!("production `{}' is never reduced", g.production(*p).display(g)));
    }

    let num_errors = sink.num_errors();
    let num_warnings = sink.num_warnings();
    let report = Report {
        num_errors,
        num_warnings,
        num_terminals: g.num_terminals() - 1,
        num_nonterminals: g.num_nonterminals() - 1,
        num_productions: g.productions.len() - 1,
        num_states: automaton.num_states(),
        num_conflicts: conflicts.len(),
        expected_conflicts: g.expected_conflicts,
        num_unused_terminals: usage.unused_terminals.len(),
        num_unused_nonterminals: usage.unused_nonterminals.len(),
        num_never_reduced: usage.never_reduced.len(),
        diagnostics: sink.into_diagnostics(),
    };

    let status = if num_errors > 0 {
        Status::Failed
    } else if num_warnings > 0 {
        Status::WarningsOnly
    } else {
        Status::Success
    };

    Ok(CompileOutcome {
        status,
        automaton,
        lookaheads,
        table,
        conflicts,
        usage,
        report,
    })
}
