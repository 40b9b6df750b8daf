//! LALR(1) parse table construction.
//!
//! This crate takes a frozen [`Grammar`](grammar::Grammar) and compiles it into
//! a deterministic LALR(1) automaton and dense action/goto tables, recording
//! every shift/reduce and reduce/reduce conflict it encounters along the way.
//! Reading a grammar definition from text and rendering the finished tables
//! into source code are left to the caller.
//!
//! The entry point for most users is [`pipeline::compile`].

pub mod digraph;
pub mod grammar;
pub mod lalr;
pub mod lr0;
pub mod observer;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod types;
pub mod usage;
pub mod util;
