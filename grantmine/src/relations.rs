/*
 * Copyright Grantmine Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Per-attribute dominance relations over the policy's literal universe.
//!
//! For every key, the engine orders the key's literals by strict region
//! containment (decided by the oracle, with literal-level fast paths for
//! the top value), then reduces the order to its covering relation — the
//! immediate-dominance edges the miner refines along. Keeping only the
//! covering edges avoids re-deriving the transitive closure during the
//! lattice search.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;
use tracing::debug;

use crate::ast::{AttrKey, Policy};
use crate::err::{Error, Result};
use crate::symbolic::SymOracle;

type ValueEdges = BTreeMap<SmolStr, BTreeSet<SmolStr>>;

/// The dominance data of one mining run: for every key, the full strict
/// relation and its immediate-dominance reduction.
#[derive(Debug, Default)]
pub struct KvRelations {
    relations: BTreeMap<AttrKey, ValueEdges>,
    idoms: BTreeMap<AttrKey, ValueEdges>,
}

impl KvRelations {
    /// Builds dominance data for `policy`. Every key's universe is topped
    /// up with the key's top literal before the pairwise ordering queries.
    pub fn build<O: SymOracle>(policy: &Policy, oracle: &mut O) -> Result<Self> {
        let mut universes: BTreeMap<AttrKey, BTreeSet<SmolStr>> = policy.key_universe().clone();
        for (key, values) in &mut universes {
            values.insert(SmolStr::new_static(key.top_literal()));
        }

        let mut relations: BTreeMap<AttrKey, ValueEdges> = BTreeMap::new();
        for (key, values) in &universes {
            let edges = relations.entry(*key).or_default();
            for value in values {
                edges.entry(value.clone()).or_default();
            }
            for a in values {
                for b in values {
                    if a == b {
                        continue;
                    }
                    // One direction already recorded settles the pair:
                    // the relation is strict, so the other cannot hold.
                    if edges[a].contains(b) || edges[b].contains(a) {
                        continue;
                    }
                    if oracle.greater_than_value(*key, a, b)? {
                        edges.entry(a.clone()).or_default().insert(b.clone());
                    }
                }
            }
            debug!(
                key = %key,
                universe = values.len(),
                edges = edges.values().map(BTreeSet::len).sum::<usize>(),
                "built dominance relation"
            );
        }

        let idoms = build_idoms(&relations);
        let out = Self { relations, idoms };
        out.check_acyclic()?;
        Ok(out)
    }

    /// The direct specializations of `value` under `key`: its
    /// immediate-dominance children.
    pub fn idom(&self, key: AttrKey, value: &str) -> impl Iterator<Item = &SmolStr> {
        self.idoms
            .get(&key)
            .and_then(|m| m.get(value))
            .into_iter()
            .flatten()
    }

    /// Every value strictly dominated by `value` under `key` — the full
    /// relation, for containment checks.
    pub fn dominated(&self, key: AttrKey, value: &str) -> impl Iterator<Item = &SmolStr> {
        self.relations
            .get(&key)
            .and_then(|m| m.get(value))
            .into_iter()
            .flatten()
    }

    /// The (topped-up) literal universe of `key`.
    pub fn universe(&self, key: AttrKey) -> impl Iterator<Item = &SmolStr> {
        self.relations
            .get(&key)
            .into_iter()
            .flat_map(BTreeMap::keys)
    }

    /// The relation must be a strict partial order; a cycle means the
    /// oracle's containment answers are inconsistent, which is a fatal
    /// invariant violation rather than something to resolve silently.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            InProgress,
            Done,
        }
        for (key, edges) in &self.relations {
            let mut states: BTreeMap<&SmolStr, State> = BTreeMap::new();
            for start in edges.keys() {
                if states.contains_key(start) {
                    continue;
                }
                // Iterative DFS with an explicit child-iterator stack. The
                // yielded children borrow from `edges`, not from the
                // stack, so the stack stays free to grow and shrink.
                let mut stack: Vec<(&SmolStr, std::collections::btree_set::Iter<'_, SmolStr>)> =
                    vec![(start, edges[start].iter())];
                states.insert(start, State::InProgress);
                loop {
                    let next_child = match stack.last_mut() {
                        None => break,
                        Some((_, children)) => children.next(),
                    };
                    match next_child {
                        Some(child) => match states.get(child) {
                            Some(State::InProgress) => {
                                return Err(Error::DominanceCycle {
                                    key: *key,
                                    value: child.clone(),
                                });
                            }
                            Some(State::Done) => {}
                            None => {
                                states.insert(child, State::InProgress);
                                stack.push((child, edges[child].iter()));
                            }
                        },
                        None => {
                            if let Some((node, _)) = stack.pop() {
                                states.insert(node, State::Done);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// The covering relation: `smaller` is an idom-child of `greater` iff
/// `greater` dominates it with no third value strictly in between.
fn build_idoms(relations: &BTreeMap<AttrKey, ValueEdges>) -> BTreeMap<AttrKey, ValueEdges> {
    let mut idoms: BTreeMap<AttrKey, ValueEdges> = BTreeMap::new();
    for (key, edges) in relations {
        let key_idoms = idoms.entry(*key).or_default();
        for value in edges.keys() {
            key_idoms.entry(value.clone()).or_default();
        }
        for (greater, dominated) in edges {
            for smaller in dominated {
                let direct = !dominated.iter().any(|mid| {
                    mid != smaller
                        && edges
                            .get(mid)
                            .is_some_and(|below_mid| below_mid.contains(smaller))
                });
                if direct {
                    key_idoms
                        .entry(greater.clone())
                        .or_default()
                        .insert(smaller.clone());
                }
            }
        }
    }
    idoms
}
