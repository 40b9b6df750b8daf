use lalrgen::{
    grammar::{Assoc, Grammar, Precedence, SymbolID::*, TerminalID},
    pipeline::{compile, CompileOutcome, Options, Status},
    table::{Action, ConflictKind, Resolution},
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Drive the generated tables over a token sequence, reducing with the
/// grammar's productions, and tell whether the input is accepted.
fn accepts(g: &Grammar, outcome: &CompileOutcome, input: &[TerminalID]) -> bool {
    let mut stack = vec![outcome.automaton.start];
    let mut pos = 0;
    loop {
        let state = *stack.last().unwrap();
        let lookahead = input.get(pos).copied().unwrap_or(TerminalID::EOI);
        match outcome.table.action(state, lookahead) {
            Action::Shift(next) => {
                stack.push(next);
                pos += 1;
            }
            Action::Reduce(p) => {
                let production = g.production(p);
                for _ in 0..production.right.len() {
                    stack.pop();
                }
                let top = *stack.last().unwrap();
                match outcome.table.goto(top, production.left) {
                    Some(next) => stack.push(next),
                    None => return false,
                }
            }
            Action::Accept => return pos >= input.len(),
            Action::Error => return false,
        }
    }
}

struct Arithmetic {
    grammar: Grammar,
    num: TerminalID,
    plus: TerminalID,
    star: TerminalID,
    lparen: TerminalID,
    rparen: TerminalID,
}

/// The classic layered expression grammar: unambiguous, no precedence needed.
fn arithmetic() -> Arithmetic {
    let mut ids = None;
    let grammar = Grammar::define(|g| {
        let lparen = g.terminal("(", None);
        let rparen = g.terminal(")", None);
        let plus = g.terminal("+", None);
        let star = g.terminal("*", None);
        let num = g.terminal("NUM", None);

        let expr = g.nonterminal("expr");
        let term = g.nonterminal("term");
        let factor = g.nonterminal("factor");

        g.start_symbol(expr);

        g.production(expr, [N(expr), T(plus), N(term)], None);
        g.production(expr, [N(term)], None);
        g.production(term, [N(term), T(star), N(factor)], None);
        g.production(term, [N(factor)], None);
        g.production(factor, [T(num)], None);
        g.production(factor, [T(lparen), N(expr), T(rparen)], None);

        ids = Some((num, plus, star, lparen, rparen));
    })
    .unwrap();
    let (num, plus, star, lparen, rparen) = ids.unwrap();
    Arithmetic {
        grammar,
        num,
        plus,
        star,
        lparen,
        rparen,
    }
}

#[test]
fn arithmetic_compiles_without_conflicts() {
    init_tracing();
    let a = arithmetic();
    let outcome = compile(&a.grammar, &Options::default()).unwrap();

    assert_eq!(outcome.status, Status::Success);
    assert!(outcome.conflicts.is_empty());
    assert!(outcome.usage.is_clean());

    assert!(accepts(&a.grammar, &outcome, &[a.num]));
    assert!(accepts(
        &a.grammar,
        &outcome,
        &[a.num, a.plus, a.num, a.star, a.num],
    ));
    assert!(accepts(
        &a.grammar,
        &outcome,
        &[a.lparen, a.num, a.plus, a.num, a.rparen, a.star, a.num],
    ));

    assert!(!accepts(&a.grammar, &outcome, &[a.plus]));
    assert!(!accepts(&a.grammar, &outcome, &[a.num, a.plus]));
    assert!(!accepts(&a.grammar, &outcome, &[a.lparen, a.num]));
    assert!(!accepts(&a.grammar, &outcome, &[a.num, a.num]));
}

fn ambiguous_sum(expected_conflicts: usize) -> (Grammar, TerminalID, TerminalID) {
    let mut ids = None;
    let grammar = Grammar::define(|g| {
        let plus = g.terminal("+", Some(Precedence::new(0, Assoc::Left)));
        let id = g.terminal("id", None);
        let e = g.nonterminal("E");
        g.start_symbol(e);
        g.expect_conflicts(expected_conflicts);
        g.production(e, [N(e), T(plus), N(e)], None);
        g.production(e, [T(id)], None);
        ids = Some((plus, id));
    })
    .unwrap();
    let (plus, id) = ids.unwrap();
    (grammar, plus, id)
}

#[test]
fn ambiguous_sum_resolved_by_left_associativity() {
    init_tracing();
    let (g, plus, id) = ambiguous_sum(1);
    let outcome = compile(&g, &Options::default()).unwrap();

    // Exactly one shift/reduce conflict, settled by the declared precedence.
    assert_eq!(outcome.conflicts.len(), 1);
    let conflict = &outcome.conflicts[0];
    assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
    assert_eq!(conflict.symbol, plus);
    assert!(matches!(
        conflict.resolution,
        Resolution::Reduce {
            by_precedence: true,
            ..
        }
    ));

    // Within budget, so the caller may still emit code.
    assert_eq!(outcome.status, Status::WarningsOnly);
    assert!(outcome.may_emit());

    assert!(accepts(&g, &outcome, &[id, plus, id, plus, id]));
    assert!(!accepts(&g, &outcome, &[id, plus]));
}

#[test]
fn conflict_budget_gates_emission() {
    let (g, _, _) = ambiguous_sum(0);
    let outcome = compile(&g, &Options::default()).unwrap();

    assert_eq!(outcome.status, Status::Failed);
    assert!(!outcome.may_emit());
    assert_eq!(outcome.report.num_conflicts, 1);
    assert_eq!(outcome.report.expected_conflicts, 0);
    // Diagnostics and tables are still fully populated.
    assert!(outcome.report.has_blocking_errors());
    assert!(outcome.table.num_states() > 0);
}

#[test]
fn precedence_ladder_resolves_every_conflict() {
    let prec_add = Some(Precedence::new(0, Assoc::Left));
    let prec_mul = Some(Precedence::new(1, Assoc::Left));
    let prec_neg = Some(Precedence::new(2, Assoc::Right));

    let build = |expected: usize| {
        let mut captured = None;
        let g = Grammar::define(|g| {
            let lparen = g.terminal("(", None);
            let rparen = g.terminal(")", None);
            let plus = g.terminal("+", prec_add);
            let minus = g.terminal("-", prec_add);
            let star = g.terminal("*", prec_mul);
            let slash = g.terminal("/", prec_mul);
            let num = g.terminal("NUM", None);

            let expr = g.nonterminal("expr");
            g.start_symbol(expr);
            g.expect_conflicts(expected);

            g.production(expr, [N(expr), T(plus), N(expr)], None);
            g.production(expr, [N(expr), T(minus), N(expr)], None);
            g.production(expr, [N(expr), T(star), N(expr)], None);
            g.production(expr, [N(expr), T(slash), N(expr)], None);
            g.production(expr, [T(minus), N(expr)], prec_neg);
            g.production(expr, [T(num)], None);
            g.production(expr, [T(lparen), N(expr), T(rparen)], None);

            captured = Some((num, plus, star, minus));
        })
        .unwrap();
        (g, captured.unwrap())
    };

    let (probe, _) = build(usize::MAX);
    let probe_outcome = compile(&probe, &Options::default()).unwrap();
    let num_conflicts = probe_outcome.conflicts.len();
    assert!(num_conflicts > 0);
    for conflict in &probe_outcome.conflicts {
        assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
        assert!(matches!(
            conflict.resolution,
            Resolution::Shift {
                by_precedence: true
            } | Resolution::Reduce {
                by_precedence: true,
                ..
            }
        ));
    }

    // Declaring the observed count as expected makes the build clean enough
    // to emit.
    let (g, (num, plus, star, minus)) = build(num_conflicts);
    let outcome = compile(&g, &Options::default()).unwrap();
    assert!(outcome.may_emit());

    assert!(accepts(&g, &outcome, &[num, plus, num, star, num]));
    assert!(accepts(&g, &outcome, &[minus, num, star, num]));
    assert!(accepts(&g, &outcome, &[num, minus, minus, num]));
    assert!(!accepts(&g, &outcome, &[num, star, star, num]));
}

#[test]
fn end_to_end_build_is_deterministic() {
    let run = || {
        let a = arithmetic();
        let outcome = compile(&a.grammar, &Options::default()).unwrap();
        (a, outcome)
    };
    let (_, o1) = run();
    let (_, o2) = run();

    assert_eq!(o1.table, o2.table);
    assert_eq!(o1.conflicts, o2.conflicts);
    assert_eq!(o1.automaton.num_states(), o2.automaton.num_states());
    for (id, s1) in &o1.automaton.states {
        let s2 = &o2.automaton.states[id];
        assert_eq!(s1.kernels, s2.kernels);
    }
}
