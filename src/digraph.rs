//! The DIGRAPH procedure from DeRemer and Pennello's look-ahead computation.
//!
//! Collapses strongly connected components of the given relation while
//! propagating set values, so each fixpoint is reached in a single traversal.
//! Traversal follows the insertion order of the map keys, which keeps the
//! resulting sets (and everything derived from them) reproducible.

use crate::types::Map;
use indexmap::map::Slice;
use std::{cmp, hash::Hash};

/// A set value that can absorb another of its kind.
pub trait Merge {
    fn union_with(&mut self, other: &Self);
}

impl<T> Merge for crate::types::Set<T>
where
    T: Clone + Eq + Hash,
{
    fn union_with(&mut self, other: &Self) {
        self.extend(other.iter().cloned())
    }
}

impl<B> Merge for bit_set::BitSet<B>
where
    B: bit_vec::BitBlock,
{
    fn union_with(&mut self, other: &Self) {
        self.union_with(other)
    }
}

/// For every pair `(x, y)` with `relation(x, y)`, add `F(y)` into `F(x)`,
/// transitively, until nothing changes.
pub fn digraph<K, T>(result: &mut Map<K, T>, relation: impl Fn(&K, &K) -> bool)
where
    K: Clone + Eq + Hash,
    T: Merge,
{
    let keys: Vec<_> = result.keys().cloned().collect();
    Digraph {
        result: result.as_mut_slice(),
        relation,
        keys: &keys[..],
        n: vec![0usize; keys.len()],
        stack: vec![],
    }
    .run()
}

struct Digraph<'a, K, T, F> {
    result: &'a mut Slice<K, T>,
    relation: F,
    keys: &'a [K],
    n: Vec<usize>,
    stack: Vec<usize>,
}

impl<K, T, F> Digraph<'_, K, T, F>
where
    K: Eq + Hash,
    T: Merge,
    F: Fn(&K, &K) -> bool,
{
    fn run(&mut self) {
        for x in 0..self.keys.len() {
            if self.n[x] == 0 {
                self.traverse(x);
            }
        }
    }

    fn traverse(&mut self, x: usize) {
        self.stack.push(x);
        let d = self.stack.len();
        self.n[x] = d;

        let x_key = &self.keys[x];
        for (y, y_key) in self.keys.iter().enumerate() {
            if !(self.relation)(x_key, y_key) {
                continue;
            }

            if self.n[y] == 0 {
                self.traverse(y);
            }
            self.n[x] = cmp::min(self.n[x], self.n[y]);

            if x != y {
                // F(x) <- F(x) \cup F(y)
                let (slot, added) = get_two_mut(self.result, x, y);
                slot.union_with(added);
            }
        }

        if self.n[x] != d {
            return;
        }

        while let Some(s) = self.stack.pop() {
            self.n[s] = usize::MAX;
            if s == x {
                break;
            }
            // F(s) <- F(x)
            let (slot, added) = get_two_mut(self.result, s, x);
            slot.union_with(added);
        }
    }
}

fn get_two_mut<K, V>(slice: &mut Slice<K, V>, x: usize, y: usize) -> (&mut V, &mut V) {
    assert!(
        x != y && cmp::max(x, y) < slice.len(),
        "index condition not satisfied"
    );
    let i = (x + y) / 2 + 1;
    let (a, b) = slice.split_at_mut(i);
    if x < y {
        (&mut a[x], &mut b[y - i])
    } else {
        (&mut b[x - i], &mut a[y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{TerminalID, TerminalSet},
        types::Set,
    };

    #[test]
    fn terminal_sets_flow_back_along_chains() {
        // x -> y -> z: the source of an edge absorbs the target's terminals,
        // transitively, while the targets stay untouched.
        let t = TerminalID::from_index;
        let mut map: Map<&str, TerminalSet> = Map::default();
        map.insert("x", [t(1)].into_iter().collect());
        map.insert("y", [t(2)].into_iter().collect());
        map.insert("z", [t(3)].into_iter().collect());
        let edges = [("x", "y"), ("y", "z")];
        digraph(&mut map, |a, b| edges.contains(&(*a, *b)));

        for i in 1..=3 {
            assert!(map["x"].contains(t(i)), "x lacks terminal {i}");
        }
        assert!(map["y"].contains(t(2)) && map["y"].contains(t(3)));
        assert!(!map["y"].contains(t(1)));
        assert_eq!(map["z"].len(), 1);
    }

    #[test]
    fn propagates_through_cycles() {
        // a -> b -> c -> a, d -> c
        let mut map: Map<&str, Set<u32>> = Map::default();
        map.insert("a", [1].into_iter().collect());
        map.insert("b", [2].into_iter().collect());
        map.insert("c", [3].into_iter().collect());
        map.insert("d", [4].into_iter().collect());
        let edges = [("a", "b"), ("b", "c"), ("c", "a"), ("d", "c")];
        digraph(&mut map, |x, y| edges.contains(&(*x, *y)));

        for key in ["a", "b", "c"] {
            let mut got: Vec<_> = map[key].iter().copied().collect();
            got.sort_unstable();
            assert_eq!(got, vec![1, 2, 3], "component member {key}");
        }
        let mut got: Vec<_> = map["d"].iter().copied().collect();
        got.sort_unstable();
        assert_eq!(got, vec![1, 2, 3, 4]);
    }
}
