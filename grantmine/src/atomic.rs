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

//! The atomic-predicate partition: decomposing the Boolean algebra
//! generated by a set of source formulas (findings plus the policy) into
//! pairwise-disjoint, individually non-empty atoms, each tagged with the
//! sources whose region contains it.

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::Finding;
use crate::err::{Error, Result};
use crate::symbolic::SymOracle;

/// What a partition source stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// The universal `true` anchor, processed first so the initial
    /// universe atom exists.
    Anchor,
    /// The policy formula.
    Policy,
    /// One mined finding.
    Finding,
}

/// A partition source: a logical origin paired with its formula.
#[derive(Debug, Clone)]
pub struct StaticVar<F> {
    kind: VarKind,
    finding: Option<Finding>,
    formula: F,
}

impl<F> StaticVar<F> {
    /// The universal anchor.
    pub fn anchor(formula: F) -> Self {
        Self {
            kind: VarKind::Anchor,
            finding: None,
            formula,
        }
    }

    /// The policy source.
    pub fn policy(formula: F) -> Self {
        Self {
            kind: VarKind::Policy,
            finding: None,
            formula,
        }
    }

    /// A finding source.
    pub fn finding(formula: F, finding: Finding) -> Self {
        Self {
            kind: VarKind::Finding,
            finding: Some(finding),
            formula,
        }
    }

    /// The source kind.
    pub fn kind(&self) -> VarKind {
        self.kind
    }

    /// The finding, for `VarKind::Finding` sources.
    pub fn as_finding(&self) -> Option<&Finding> {
        self.finding.as_ref()
    }

    /// The source formula.
    pub fn formula(&self) -> &F {
        &self.formula
    }
}

impl<F> fmt::Display for StaticVar<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.finding) {
            (VarKind::Finding, Some(finding)) => write!(f, "finding {finding}"),
            (kind, _) => write!(f, "{kind:?}"),
        }
    }
}

/// An oracle-backed region value with set operations; the working
/// currency of the partition loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicVar<F> {
    formula: F,
}

impl<F: Clone + Eq> DynamicVar<F> {
    /// Wraps a formula.
    pub fn new(formula: F) -> Self {
        Self { formula }
    }

    /// The wrapped formula.
    pub fn formula(&self) -> &F {
        &self.formula
    }

    /// Region union.
    pub fn union<O: SymOracle<Formula = F>>(&self, other: &Self, oracle: &mut O) -> Self {
        Self::new(oracle.or(vec![self.formula.clone(), other.formula.clone()]))
    }

    /// Region intersection.
    pub fn inter<O: SymOracle<Formula = F>>(&self, other: &Self, oracle: &mut O) -> Self {
        Self::new(oracle.and(vec![self.formula.clone(), other.formula.clone()]))
    }

    /// Region difference.
    pub fn minus<O: SymOracle<Formula = F>>(&self, other: &Self, oracle: &mut O) -> Self {
        let negated = oracle.not(other.formula.clone());
        Self::new(oracle.and(vec![self.formula.clone(), negated]))
    }

    /// Emptiness test.
    pub fn is_empty<O: SymOracle<Formula = F>>(&self, oracle: &mut O) -> Result<bool> {
        Ok(!oracle.check(&self.formula)?)
    }
}

/// The finished partition: atoms numbered `0..num_atoms`, and for each
/// source (by its index in the input slice) the set of atom ids whose
/// region it contains.
#[derive(Debug)]
pub struct AtomicPartition {
    num_atoms: usize,
    assignments: Vec<BTreeSet<usize>>,
}

impl AtomicPartition {
    /// Partitions the Boolean algebra generated by `vars`.
    ///
    /// Sources are processed in slice order; the caller puts the `true`
    /// anchor first. A source found unsatisfiable is a fatal error: it
    /// signals an internal contradiction, never something to drop.
    pub fn build<O: SymOracle>(vars: &[StaticVar<O::Formula>], oracle: &mut O) -> Result<Self> {
        let mut regions: Vec<(DynamicVar<O::Formula>, BTreeSet<usize>)> = Vec::new();

        for (index, var) in vars.iter().enumerate() {
            let mut rest = DynamicVar::new(var.formula().clone());
            if rest.is_empty(oracle)? {
                return Err(Error::UnsatSource(var.to_string()));
            }

            let mut next: Vec<(DynamicVar<O::Formula>, BTreeSet<usize>)> = Vec::new();
            let mut absorbed = false;
            for (region, sources) in regions {
                if absorbed {
                    next.push((region, sources));
                    continue;
                }
                if region == rest {
                    let mut sources = sources;
                    sources.insert(index);
                    next.push((region, sources));
                    absorbed = true;
                    continue;
                }
                let inter = region.inter(&rest, oracle);
                if inter.is_empty(oracle)? {
                    next.push((region, sources));
                    continue;
                }
                let diff = region.minus(&rest, oracle);
                if !diff.is_empty(oracle)? {
                    next.push((diff, sources.clone()));
                }
                let mut with_new = sources;
                with_new.insert(index);
                rest = rest.minus(&region, oracle);
                next.push((inter, with_new));
            }
            if !absorbed && !rest.is_empty(oracle)? {
                next.push((rest, BTreeSet::from([index])));
            }
            regions = next;
        }

        let mut assignments = vec![BTreeSet::new(); vars.len()];
        for (atom_id, (_, sources)) in regions.iter().enumerate() {
            for &source in sources {
                assignments[source].insert(atom_id);
            }
        }
        Ok(Self {
            num_atoms: regions.len(),
            assignments,
        })
    }

    /// The number of atoms.
    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// The atom ids contained in source `index` (input slice order).
    pub fn atoms_of(&self, index: usize) -> &BTreeSet<usize> {
        &self.assignments[index]
    }

    /// Iterates over `(source index, atom ids)` pairs.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, &BTreeSet<usize>)> {
        self.assignments.iter().enumerate().map(|(i, s)| (i, s))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::symbolic::{factory, SampleOracle, Term};

    fn partition(oracle: &mut SampleOracle, formulas: &[Term]) -> AtomicPartition {
        let mut vars = vec![StaticVar::anchor(factory::tru())];
        for f in formulas {
            vars.push(StaticVar::policy(f.clone()));
        }
        AtomicPartition::build(&vars, oracle).unwrap()
    }

    #[test]
    fn nested_globs_partition_into_a_chain() {
        // GetObject ⊂ Get* ⊂ everything: three atoms.
        let get_star = factory::re_match("Action", "s3:Get*");
        let get_object = factory::re_match("Action", "s3:GetObject");
        let p = partition(&mut SampleOracle::new(), &[get_star, get_object]);
        assert_eq!(p.num_atoms(), 3);
        // The anchor contains every atom.
        assert_eq!(p.atoms_of(0).len(), 3);
        // Get* contains two atoms, GetObject one, and it is one of Get*'s.
        assert_eq!(p.atoms_of(1).len(), 2);
        assert_eq!(p.atoms_of(2).len(), 1);
        assert!(p.atoms_of(1).is_superset(p.atoms_of(2)));
    }

    #[test]
    fn overlapping_globs_partition_into_four() {
        // a* and *z overlap without containment:
        // a*∖*z, a*∩*z, *z∖a*, and the rest of the universe. The
        // intersection region needs a registered witness.
        let mut oracle = SampleOracle::new().with_witnesses("Action", ["az"]);
        let p = partition(
            &mut oracle,
            &[
                factory::re_match("Action", "a*"),
                factory::re_match("Action", "*z"),
            ],
        );
        assert_eq!(p.num_atoms(), 4);
        assert_eq!(p.atoms_of(1).len(), 2);
        assert_eq!(p.atoms_of(2).len(), 2);
        assert_eq!(p.atoms_of(1).intersection(p.atoms_of(2)).count(), 1);
    }

    #[test]
    fn equal_sources_share_their_atoms() {
        let f = factory::re_match("Action", "s3:Get*");
        let p = partition(&mut SampleOracle::new(), &[f.clone(), f]);
        assert_eq!(p.num_atoms(), 2);
        assert_eq!(p.atoms_of(1), p.atoms_of(2));
    }

    #[test]
    fn unsat_source_is_fatal() {
        let mut oracle = SampleOracle::new();
        let eq = factory::string_eq("A", "x");
        let contradiction = factory::and([eq.clone(), factory::not(eq)]);
        let vars = vec![
            StaticVar::<Term>::anchor(factory::tru()),
            StaticVar::policy(contradiction),
        ];
        let err = AtomicPartition::build(&vars, &mut oracle).unwrap_err();
        assert!(matches!(err, Error::UnsatSource(_)));
    }

    #[test]
    fn dynamic_var_set_ops() {
        let mut oracle = SampleOracle::new();
        let a = DynamicVar::new(factory::re_match("A", "x*"));
        let b = DynamicVar::new(factory::re_match("A", "y*"));
        assert!(!a.union(&b, &mut oracle).is_empty(&mut oracle).unwrap());
        assert!(a.inter(&b, &mut oracle).is_empty(&mut oracle).unwrap());
        assert!(!a.minus(&b, &mut oracle).is_empty(&mut oracle).unwrap());
        let self_minus = a.minus(&a, &mut oracle);
        assert!(self_minus.is_empty(&mut oracle).unwrap());
    }
}
