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

//! The miner: a worklist search over the lattice of findings, and the
//! reduction stage that compresses the mined set to a provably minimum
//! equivalent one.
//!
//! The search starts from the all-top root finding. A finding is accepted
//! when its *reduced* region — its formula minus the regions of its
//! one-step specializations — still intersects the policy; otherwise it is
//! refined one idom edge at a time. Acceptance and enqueueing both drop
//! candidates subsumed by an already accepted result, so the output is an
//! antichain. Refinement strictly narrows one key per step over finite
//! idom DAGs, so the worklist drains.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::ast::{Finding, Policy};
use crate::atomic::{AtomicPartition, StaticVar, VarKind};
use crate::cover;
use crate::encode;
use crate::err::{Error, Result};
use crate::relations::KvRelations;
use crate::symbolic::SymOracle;

/// The outcome of a mining run: the accepted findings plus per-round wall
/// times for the driver's timing file.
#[derive(Debug)]
pub struct MineReport {
    /// The accepted findings, in acceptance order.
    pub findings: Vec<Finding>,
    /// One entry per worklist round.
    pub rounds: Vec<Duration>,
}

/// Finding formulas are memoized per object: encode once, reuse for every
/// subsumption query.
struct FormulaCache<F>(HashMap<Finding, F>);

impl<F: Clone> FormulaCache<F> {
    fn new() -> Self {
        Self(HashMap::new())
    }

    fn get<O: SymOracle<Formula = F>>(&mut self, finding: &Finding, oracle: &mut O) -> F {
        if let Some(f) = self.0.get(finding) {
            return f.clone();
        }
        let f = encode::finding(finding, oracle);
        self.0.insert(finding.clone(), f.clone());
        f
    }
}

/// Mines the maximal grants a policy permits.
pub fn mine<O: SymOracle>(policy: &Policy, oracle: &mut O) -> Result<MineReport> {
    let relations = KvRelations::build(policy, oracle)?;
    mine_with_relations(policy, &relations, oracle)
}

/// As [`mine`], with dominance data the caller already built.
pub fn mine_with_relations<O: SymOracle>(
    policy: &Policy,
    relations: &KvRelations,
    oracle: &mut O,
) -> Result<MineReport> {
    let policy_formula = encode::policy(policy, oracle)?;
    let mut cache = FormulaCache::new();

    let mut worklist: VecDeque<Finding> = VecDeque::from([Finding::root(policy)]);
    let mut results: Vec<(Finding, O::Formula)> = Vec::new();
    let mut rounds: Vec<Duration> = Vec::new();

    while let Some(current) = worklist.pop_front() {
        let round_start = Instant::now();

        let reduced = encode::reduced_finding(&current, relations, oracle);
        if oracle.check_intersection(vec![policy_formula.clone(), reduced])? {
            let formula = cache.get(&current, oracle);
            if !subsumed_by_results(&results, &current, &formula, oracle)? {
                debug!(finding = %current, "accepted");
                results.push((current, formula));
            }
        } else {
            for refinement in current.refine(relations) {
                let formula = cache.get(&refinement, oracle);
                if subsumed_by_results(&results, &refinement, &formula, oracle)? {
                    continue;
                }
                if worklist.iter().any(|queued| *queued == refinement) {
                    continue;
                }
                worklist.push_back(refinement);
            }
        }

        rounds.push(round_start.elapsed());
    }

    info!(
        findings = results.len(),
        rounds = rounds.len(),
        "mining finished"
    );
    Ok(MineReport {
        findings: results.into_iter().map(|(finding, _)| finding).collect(),
        rounds,
    })
}

/// Is the candidate equal to, or entailed by, an accepted result?
fn subsumed_by_results<O: SymOracle>(
    results: &[(Finding, O::Formula)],
    candidate: &Finding,
    candidate_formula: &O::Formula,
    oracle: &mut O,
) -> Result<bool> {
    for (result, result_formula) in results {
        if result == candidate || oracle.greater_equals(result_formula, candidate_formula)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Compresses a mined finding set to a minimum subset with the same
/// coverage of the policy: partition the Boolean algebra generated by the
/// findings and the policy into atoms, then solve an exact set cover of
/// the policy's atoms.
pub fn reduce<O: SymOracle>(
    policy: &Policy,
    findings: Vec<Finding>,
    oracle: &mut O,
) -> Result<Vec<Finding>> {
    if findings.is_empty() {
        return Ok(Vec::new());
    }

    // The true anchor goes first so the initial universe atom exists.
    let anchor = oracle.mk_true();
    let mut vars: Vec<StaticVar<O::Formula>> = vec![StaticVar::anchor(anchor)];
    let policy_formula = encode::policy(policy, oracle)?;
    vars.push(StaticVar::policy(policy_formula));
    let mut cache = FormulaCache::new();
    for finding in findings {
        let formula = cache.get(&finding, oracle);
        vars.push(StaticVar::finding(formula, finding));
    }

    let partition = AtomicPartition::build(&vars, oracle)?;

    let mut subsets = std::collections::BTreeMap::new();
    let mut policy_atoms = std::collections::BTreeSet::new();
    for (index, atoms) in partition.assignments() {
        match vars[index].kind() {
            VarKind::Finding => {
                subsets.insert(index, atoms.clone());
            }
            VarKind::Policy => policy_atoms = atoms.clone(),
            VarKind::Anchor => {}
        }
    }

    let selected = cover::solve_min_cover(&subsets, &policy_atoms);
    if selected.is_empty() && !policy_atoms.is_empty() {
        // Mined findings are constructed to cover the policy, so an
        // infeasible cover is an invariant violation, not a result.
        return Err(Error::CoverInfeasible);
    }

    info!(
        atoms = partition.num_atoms(),
        selected = selected.len(),
        "reduction finished"
    );
    Ok(selected
        .into_keys()
        .filter_map(|index| vars[index].as_finding().cloned())
        .collect())
}
