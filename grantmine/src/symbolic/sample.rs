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

//! A deterministic, in-process oracle backend that decides satisfiability
//! by enumerating a finite witness grid.
//!
//! For every attribute variable in a query, the backend derives candidate
//! values from the literals the formula itself mentions — equality
//! literals (in both ASCII cases), minimal and padded instantiations of
//! each glob pattern, the boundary addresses of each CIDR range — plus a
//! few fixed probes (the empty string, a private-use sentinel character,
//! the zero and max addresses) and any witnesses registered by the caller.
//! A formula is reported satisfiable iff some grid point satisfies it.
//!
//! The decision is exact only relative to the grid: a region none of the
//! derived witnesses lands in is reported empty. That makes this backend
//! unsuitable as a general decision procedure, and exactly right as the
//! hermetic stand-in the test suite runs against — the literal universes
//! exercised there are distinguishable by their own boundary witnesses.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use super::factory;
use super::oracle::{OracleError, SymOracle};
use super::term::{Term, TermX};
use crate::ast::{PatternElem, Pattern};

/// A character no policy literal uses, for padding wildcard slots.
const FILLER: char = '\u{e001}';
/// A probe string no sensible pattern matches except top-like ones.
const STRAY: &str = "\u{e000}";

/// One concrete attribute value in the witness grid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Witness {
    Str(SmolStr),
    Ip(u32),
}

/// The sample-backed oracle. See the module docs for the guarantees.
#[derive(Debug, Default)]
pub struct SampleOracle {
    extra: BTreeMap<SmolStr, BTreeSet<SmolStr>>,
}

impl SampleOracle {
    /// An oracle with no caller-registered witnesses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers additional string witnesses for one attribute variable.
    pub fn with_witnesses(
        mut self,
        key: impl Into<SmolStr>,
        witnesses: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) -> Self {
        self.extra
            .entry(key.into())
            .or_default()
            .extend(witnesses.into_iter().map(Into::into));
        self
    }

    fn grid(&self, term: &Term) -> BTreeMap<SmolStr, BTreeSet<Witness>> {
        let mut grid: BTreeMap<SmolStr, BTreeSet<Witness>> = BTreeMap::new();
        term.for_each_atom(&mut |atom| {
            let (key, witnesses) = derive_witnesses(atom);
            grid.entry(key.clone()).or_default().extend(witnesses);
        });
        for (key, witnesses) in &mut grid {
            let is_ip = witnesses.iter().all(|w| matches!(w, Witness::Ip(_)));
            if is_ip {
                witnesses.insert(Witness::Ip(0));
                witnesses.insert(Witness::Ip(u32::MAX));
            } else {
                witnesses.insert(Witness::Str(SmolStr::default()));
                witnesses.insert(Witness::Str(SmolStr::new_static(STRAY)));
                if let Some(extra) = self.extra.get(key) {
                    witnesses.extend(extra.iter().cloned().map(Witness::Str));
                }
            }
        }
        grid
    }

    fn exists(
        term: &Term,
        vars: &[(&SmolStr, &BTreeSet<Witness>)],
        env: &mut BTreeMap<SmolStr, Witness>,
    ) -> bool {
        match vars.split_first() {
            None => eval(term, env),
            Some(((key, witnesses), rest)) => witnesses.iter().any(|w| {
                env.insert((*key).clone(), w.clone());
                Self::exists(term, rest, env)
            }),
        }
    }
}

/// Candidate values an atom contributes for its own variable.
fn derive_witnesses(atom: &TermX) -> (&SmolStr, Vec<Witness>) {
    match atom {
        TermX::StrEq { key, value } | TermX::StrEqNoCase { key, value } => (
            key,
            vec![
                Witness::Str(value.clone()),
                Witness::Str(value.to_ascii_lowercase().into()),
                Witness::Str(value.to_ascii_uppercase().into()),
            ],
        ),
        TermX::InPattern { key, pattern } => (
            key,
            vec![
                Witness::Str(instantiate(pattern, "")),
                Witness::Str(instantiate(pattern, &FILLER.to_string())),
            ],
        ),
        TermX::InCidr { key, cidr } => {
            let (lo, hi) = cidr.range();
            (
                key,
                vec![
                    Witness::Ip(lo),
                    Witness::Ip(hi),
                    Witness::Ip(lo.wrapping_sub(1)),
                    Witness::Ip(hi.wrapping_add(1)),
                ],
            )
        }
        // Connectives and constants never reach this (`for_each_atom`).
        TermX::Bool(_) | TermX::Not(_) | TermX::And(_) | TermX::Or(_) => {
            unreachable!("derive_witnesses called on a non-atom")
        }
    }
}

/// Instantiates a pattern to a concrete string: `*` slots become `star`,
/// `?` slots become the filler character.
fn instantiate(pattern: &Pattern, star: &str) -> SmolStr {
    let mut out = String::new();
    for elem in pattern.iter() {
        match elem {
            PatternElem::Char(c) => out.push(*c),
            PatternElem::AnyChar => out.push(FILLER),
            PatternElem::Wildcard => out.push_str(star),
        }
    }
    out.into()
}

fn eval(term: &Term, env: &BTreeMap<SmolStr, Witness>) -> bool {
    match &**term {
        TermX::Bool(b) => *b,
        TermX::StrEq { key, value } => {
            matches!(env.get(key), Some(Witness::Str(s)) if s == value)
        }
        TermX::StrEqNoCase { key, value } => {
            matches!(env.get(key), Some(Witness::Str(s)) if s.eq_ignore_ascii_case(value))
        }
        TermX::InPattern { key, pattern } => {
            matches!(env.get(key), Some(Witness::Str(s)) if pattern.wildcard_match(s))
        }
        TermX::InCidr { key, cidr } => {
            matches!(env.get(key), Some(Witness::Ip(v)) if cidr.matches(*v))
        }
        TermX::Not(t) => !eval(t, env),
        TermX::And(ts) => ts.iter().all(|t| eval(t, env)),
        TermX::Or(ts) => ts.iter().any(|t| eval(t, env)),
    }
}

impl SymOracle for SampleOracle {
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

    fn check(&mut self, f: &Term) -> Result<bool, OracleError> {
        if f.is_true() {
            return Ok(true);
        }
        if f.is_false() {
            return Ok(false);
        }
        let grid = self.grid(f);
        let vars: Vec<_> = grid.iter().collect();
        let mut env = BTreeMap::new();
        Ok(Self::exists(f, &vars, &mut env))
    }
}
