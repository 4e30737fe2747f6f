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

//! The symbolic oracle: boolean algebra plus satisfiability and
//! entailment queries over per-attribute predicates.
//!
//! Mining, dominance construction and the partitioner are written once
//! against the [`SymOracle`] trait; which engine decides the queries is a
//! backend detail behind the associated formula handle. The production
//! backend is [`SmtOracle`] over a local solver process; tests use the
//! in-process sample backend.
//!
//! An oracle owns an exclusive mutable solver context — one assert/reset
//! cycle per query, and a per-key symbolic-variable cache — so every
//! method takes `&mut self` and instances must be used sequentially.

use std::fmt::Debug;
use std::hash::Hash;

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::{AttrKey, ValueKind};

use super::encoder::{EncodeError, Encoder};
use super::factory;
use super::script::SmtLibScript;
use super::solver::{Decision, SmtSolver, SolverError};
use super::term::Term;

/// Errors from oracle queries.
#[derive(Debug, Diagnostic, Error)]
pub enum OracleError {
    /// Solver-level failure.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// Encoding failure.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The solver answered `unknown`. The theory fragment used here is
    /// decidable, so indecision signals a modeling bug and aborts the run.
    #[error("solver returned `unknown` for a query that must be decidable")]
    Indeterminate,
}

type Result<T> = std::result::Result<T, OracleError>;

/// The abstract satisfiability/entailment decision service the core
/// algorithms are written against.
pub trait SymOracle {
    /// Opaque formula handle.
    type Formula: Clone + Eq + Hash + Debug;

    /// The `true` formula.
    fn mk_true(&mut self) -> Self::Formula;
    /// The `false` formula.
    fn mk_false(&mut self) -> Self::Formula;
    /// Exact string equality of `key` against a literal.
    fn mk_string_eq(&mut self, key: &str, value: &str) -> Self::Formula;
    /// Case-insensitive string equality of `key` against a literal.
    fn mk_string_eq_ignore_case(&mut self, key: &str, value: &str) -> Self::Formula;
    /// Glob-pattern match of `key` against a literal pattern.
    fn mk_re_match(&mut self, key: &str, glob: &str) -> Self::Formula;
    /// CIDR containment of `key` in a literal range. A malformed CIDR
    /// yields the never-matching predicate.
    fn mk_ip_match(&mut self, key: &str, cidr: &str) -> Self::Formula;

    /// Conjunction.
    fn and(&mut self, fs: Vec<Self::Formula>) -> Self::Formula;
    /// Disjunction.
    fn or(&mut self, fs: Vec<Self::Formula>) -> Self::Formula;
    /// Negation.
    fn not(&mut self, f: Self::Formula) -> Self::Formula;

    /// Is the formula satisfiable?
    fn check(&mut self, f: &Self::Formula) -> Result<bool>;

    /// Is the conjunction of the formulas satisfiable?
    fn check_intersection(&mut self, fs: Vec<Self::Formula>) -> Result<bool> {
        let joint = self.and(fs);
        self.check(&joint)
    }

    /// Is `lhs`'s region a strict superset of `rhs`'s?
    fn greater_than(&mut self, lhs: &Self::Formula, rhs: &Self::Formula) -> Result<bool> {
        let not_rhs = self.not(rhs.clone());
        let contains = self.and(vec![lhs.clone(), not_rhs]);
        if !self.check(&contains)? {
            return Ok(false);
        }
        let not_lhs = self.not(lhs.clone());
        let covers = self.and(vec![not_lhs, rhs.clone()]);
        Ok(!self.check(&covers)?)
    }

    /// Is `lhs`'s region a (non-strict) superset of `rhs`'s?
    fn greater_equals(&mut self, lhs: &Self::Formula, rhs: &Self::Formula) -> Result<bool> {
        let not_lhs = self.not(lhs.clone());
        let covers = self.and(vec![not_lhs, rhs.clone()]);
        Ok(!self.check(&covers)?)
    }

    /// The base predicate of one literal under `key`: a glob match for
    /// string-pattern keys, a CIDR match for address keys.
    fn value_formula(&mut self, key: AttrKey, literal: &str) -> Self::Formula {
        match key.value_kind() {
            ValueKind::Pattern => self.mk_re_match(key.as_str(), literal),
            ValueKind::IpCidr => self.mk_ip_match(key.as_str(), literal),
        }
    }

    /// Literal-level [`Self::greater_than`]: `key`'s top literal strictly
    /// contains every other literal, nothing strictly contains it, and
    /// equal literals are never strictly ordered. The fast paths avoid a
    /// solver round-trip for the common top-value comparisons.
    fn greater_than_value(&mut self, key: AttrKey, lhs: &str, rhs: &str) -> Result<bool> {
        let top = key.top_literal();
        if lhs == rhs {
            return Ok(false);
        }
        if lhs == top {
            return Ok(true);
        }
        if rhs == top {
            return Ok(false);
        }
        let l = self.value_formula(key, lhs);
        let r = self.value_formula(key, rhs);
        self.greater_than(&l, &r)
    }

    /// Literal-level [`Self::greater_equals`], with the same fast paths.
    fn greater_equals_value(&mut self, key: AttrKey, lhs: &str, rhs: &str) -> Result<bool> {
        let top = key.top_literal();
        if lhs == rhs || lhs == top {
            return Ok(true);
        }
        if rhs == top {
            return Ok(false);
        }
        let l = self.value_formula(key, lhs);
        let r = self.value_formula(key, rhs);
        self.greater_equals(&l, &r)
    }
}

/// The production oracle: terms built by the factory, decided by an SMT
/// solver process with one reset/assert/check-sat cycle per query.
#[derive(Debug)]
pub struct SmtOracle<S> {
    solver: S,
    encoder: Encoder,
}

impl<S: SmtSolver> SmtOracle<S> {
    /// Wraps a solver.
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            encoder: Encoder::new(),
        }
    }

    /// The wrapped solver, e.g. to clean up the child process.
    pub fn into_solver(self) -> S {
        self.solver
    }

    fn check_term(&mut self, term: &Term) -> Result<bool> {
        // Folded constants need no solver round-trip.
        if term.is_true() {
            return Ok(true);
        }
        if term.is_false() {
            return Ok(false);
        }
        let encoded = self.encoder.encode(term)?;
        let input = self.solver.smtlib_input();
        input.reset().map_err(SolverError::from)?;
        input.set_logic("ALL").map_err(SolverError::from)?;
        for (id, sort) in &encoded.decls {
            input.declare_const(id, sort).map_err(SolverError::from)?;
        }
        input.assert(&encoded.expr).map_err(SolverError::from)?;
        match self.solver.check_sat()? {
            Decision::Sat => Ok(true),
            Decision::Unsat => Ok(false),
            Decision::Unknown => Err(OracleError::Indeterminate),
        }
    }
}

impl<S: SmtSolver> SymOracle for SmtOracle<S> {
    type Formula = Term;

    fn mk_true(&mut self) -> Term {
        factory::tru()
    }

    fn mk_false(&mut self) -> Term {
        factory::fls()
    }

    fn mk_string_eq(&mut self, key: &str, value: &str) -> Term {
        factory::string_eq(key, value)
    }

    fn mk_string_eq_ignore_case(&mut self, key: &str, value: &str) -> Term {
        factory::string_eq_no_case(key, value)
    }

    fn mk_re_match(&mut self, key: &str, glob: &str) -> Term {
        factory::re_match(key, glob)
    }

    fn mk_ip_match(&mut self, key: &str, cidr: &str) -> Term {
        factory::ip_match(key, cidr)
    }

    fn and(&mut self, fs: Vec<Term>) -> Term {
        factory::and(fs)
    }

    fn or(&mut self, fs: Vec<Term>) -> Term {
        factory::or(fs)
    }

    fn not(&mut self, f: Term) -> Term {
        factory::not(f)
    }

    fn check(&mut self, f: &Term) -> Result<bool> {
        self.check_term(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::symbolic::solver::LocalSolver;

    fn cvc5_oracle() -> Option<SmtOracle<LocalSolver>> {
        LocalSolver::cvc5().ok().map(SmtOracle::new)
    }

    // Exercised only where a cvc5 binary is installed; the hermetic
    // equivalents of these queries live in the sample-backend tests.

    #[test]
    fn smt_check_basics() {
        let Some(mut oracle) = cvc5_oracle() else {
            return;
        };
        let t = oracle.mk_string_eq("Action", "s3:GetObject");
        assert!(oracle.check(&t).unwrap());
        let f = oracle.not(t.clone());
        assert!(oracle.check_intersection(vec![t, f]).map(|b| !b).unwrap());
    }

    #[test]
    fn smt_glob_dominance() {
        let Some(mut oracle) = cvc5_oracle() else {
            return;
        };
        assert!(oracle
            .greater_than_value(AttrKey::Action, "s3:Get*", "s3:GetObject")
            .unwrap());
        assert!(!oracle
            .greater_than_value(AttrKey::Action, "s3:GetObject", "s3:Get*")
            .unwrap());
    }

    #[test]
    fn shortcut_paths_never_call_the_solver() {
        // WriterSolver would answer Unknown, so reaching the solver on a
        // shortcut path would surface as an Indeterminate error.
        let mut oracle = SmtOracle::new(crate::symbolic::solver::WriterSolver { w: Vec::new() });
        assert!(oracle
            .greater_than_value(AttrKey::Action, "*", "s3:GetObject")
            .unwrap());
        assert!(!oracle
            .greater_than_value(AttrKey::Action, "s3:GetObject", "*")
            .unwrap());
        assert!(!oracle.greater_than_value(AttrKey::Action, "*", "*").unwrap());
        assert!(oracle.greater_equals_value(AttrKey::Action, "*", "*").unwrap());
        assert!(oracle
            .greater_equals_value(AttrKey::SourceIp, "0.0.0.0/0", "10.1.2.3/32")
            .unwrap());
        assert!(!oracle
            .greater_equals_value(AttrKey::SourceIp, "10.1.2.3/32", "0.0.0.0/0")
            .unwrap());
    }
}
