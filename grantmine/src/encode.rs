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

//! The policy-to-logic encoding semantics: how conditions, statements,
//! policies and findings become oracle formulas.
//!
//! A positive condition is the disjunction of its values' predicates; a
//! negated condition is the conjunction of the negations (the De Morgan
//! dual). Quantifier variants encode exactly like their base forms — the
//! engine models a single attribute instance, not value sets. A statement
//! is the conjunction of its sections; a policy is
//! `(or allows) and not (or denies)`. A finding is the conjunction of one
//! base predicate per key.

use crate::ast::{BaseOp, Condition, Finding, Policy, Statement};
use crate::err::{Error, Result};
use crate::relations::KvRelations;
use crate::symbolic::SymOracle;

fn value_atom<O: SymOracle>(
    oracle: &mut O,
    base: BaseOp,
    key: &str,
    value: &str,
) -> O::Formula {
    match base {
        BaseOp::Equals => oracle.mk_string_eq(key, value),
        BaseOp::EqualsIgnoreCase => oracle.mk_string_eq_ignore_case(key, value),
        BaseOp::Match => oracle.mk_re_match(key, value),
        BaseOp::IpMatch => oracle.mk_ip_match(key, value),
    }
}

/// Encodes one condition clause.
pub fn condition<O: SymOracle>(cond: &Condition, oracle: &mut O) -> O::Formula {
    let op = cond.operator();
    let key = cond.key().as_str();
    let atoms: Vec<O::Formula> = cond
        .values()
        .iter()
        .map(|value| value_atom(oracle, op.base(), key, value))
        .collect();
    if op.negated() {
        let negated = atoms.into_iter().map(|a| oracle.not(a)).collect();
        oracle.and(negated)
    } else {
        oracle.or(atoms)
    }
}

/// Encodes one statement (ignoring its effect, which the policy encoding
/// applies): principal-match ∧ action-match ∧ resource-match ∧ conditions.
/// An absent principal block contributes no conjunct.
pub fn statement<O: SymOracle>(stmt: &Statement, oracle: &mut O) -> O::Formula {
    let mut parts: Vec<O::Formula> = Vec::new();

    if !stmt.principals.is_empty() {
        let domains: Vec<O::Formula> = stmt
            .principals
            .iter()
            .flat_map(|(domain, values)| {
                values.iter().map(|v| (*domain, v.clone())).collect::<Vec<_>>()
            })
            .map(|(domain, value)| oracle.mk_re_match(domain.as_str(), &value))
            .collect();
        parts.push(oracle.or(domains));
    }

    let actions: Vec<O::Formula> = stmt
        .actions
        .iter()
        .map(|v| oracle.mk_re_match("Action", v))
        .collect();
    parts.push(oracle.or(actions));

    let resources: Vec<O::Formula> = stmt
        .resources
        .iter()
        .map(|v| oracle.mk_re_match("Resource", v))
        .collect();
    parts.push(oracle.or(resources));

    for cond in &stmt.conditions {
        let f = condition(cond, oracle);
        parts.push(f);
    }

    oracle.and(parts)
}

/// Encodes a whole policy: `(or allow-statements) and not (or
/// deny-statements)`. A policy with no statements is a configuration
/// error.
pub fn policy<O: SymOracle>(policy: &Policy, oracle: &mut O) -> Result<O::Formula> {
    if policy.statements().is_empty() {
        return Err(Error::NoStatements);
    }
    let mut allows: Vec<O::Formula> = Vec::new();
    let mut denies: Vec<O::Formula> = Vec::new();
    for stmt in policy.statements() {
        let f = statement(stmt, oracle);
        match stmt.effect {
            crate::ast::Effect::Allow => allows.push(f),
            crate::ast::Effect::Deny => denies.push(f),
        }
    }
    let allowed = oracle.or(allows);
    let denied = oracle.or(denies);
    let not_denied = oracle.not(denied);
    Ok(oracle.and(vec![allowed, not_denied]))
}

/// Encodes a finding: the conjunction over its (key, value) entries of the
/// value's base predicate under that key.
pub fn finding<O: SymOracle>(finding: &Finding, oracle: &mut O) -> O::Formula {
    let parts: Vec<O::Formula> = finding
        .entries()
        .map(|(key, value)| oracle.value_formula(key, value))
        .collect();
    oracle.and(parts)
}

/// Encodes a finding's *reduced* region: per key, the value's predicate
/// minus the union of its immediate-dominance children's predicates. This
/// isolates the region attributable to exactly this finding rather than
/// to one of its more specific descendants in the refinement tree.
pub fn reduced_finding<O: SymOracle>(
    finding: &Finding,
    relations: &KvRelations,
    oracle: &mut O,
) -> O::Formula {
    let mut parts: Vec<O::Formula> = Vec::new();
    for (key, value) in finding.entries() {
        let base = oracle.value_formula(key, value);
        let children: Vec<O::Formula> = relations
            .idom(key, value)
            .map(|child| oracle.value_formula(key, child))
            .collect();
        if children.is_empty() {
            parts.push(base);
        } else {
            let claimed = oracle.or(children);
            let unclaimed = oracle.not(claimed);
            parts.push(oracle.and(vec![base, unclaimed]));
        }
    }
    oracle.and(parts)
}
