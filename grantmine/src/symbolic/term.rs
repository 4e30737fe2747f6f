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

//! The term language: a small boolean IR over per-attribute string and
//! address predicates, with a straightforward translation to SMT-LIB.
//!
//! Terms should not be created with the `TermX` constructors directly;
//! use the factory functions in `factory.rs`, which fold constants and
//! keep terms in a normal enough form that structural equality is a useful
//! cheap pre-check before asking the solver anything.

use std::ops::Deref;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::{Cidr, Pattern};

/// A shared, immutable term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(Arc<TermX>);

/// The term variants. Atoms are predicates over a named attribute
/// variable; the variable's sort (string or 32-bit address) follows from
/// the atom kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermX {
    /// A boolean constant.
    Bool(bool),
    /// Exact string equality against a literal.
    StrEq {
        /// Attribute variable name.
        key: SmolStr,
        /// The literal.
        value: SmolStr,
    },
    /// ASCII-case-insensitive string equality against a literal.
    StrEqNoCase {
        /// Attribute variable name.
        key: SmolStr,
        /// The literal.
        value: SmolStr,
    },
    /// Membership in a glob pattern's language.
    InPattern {
        /// Attribute variable name.
        key: SmolStr,
        /// The pattern.
        pattern: Pattern,
    },
    /// Membership in a CIDR range.
    InCidr {
        /// Attribute variable name.
        key: SmolStr,
        /// The range.
        cidr: Cidr,
    },
    /// Negation.
    Not(Term),
    /// Conjunction. Never empty or singleton when built by the factory.
    And(Vec<Term>),
    /// Disjunction. Never empty or singleton when built by the factory.
    Or(Vec<Term>),
}

impl Term {
    /// Wraps a `TermX`.
    pub fn new(t: TermX) -> Self {
        Term(Arc::new(t))
    }

    /// Is this the constant `true`?
    pub fn is_true(&self) -> bool {
        matches!(**self, TermX::Bool(true))
    }

    /// Is this the constant `false`?
    pub fn is_false(&self) -> bool {
        matches!(**self, TermX::Bool(false))
    }

    /// Visits every atom (non-connective leaf) of the term.
    pub fn for_each_atom<'a>(&'a self, f: &mut impl FnMut(&'a TermX)) {
        match &**self {
            TermX::Bool(_) => {}
            TermX::Not(t) => t.for_each_atom(f),
            TermX::And(ts) | TermX::Or(ts) => {
                for t in ts {
                    t.for_each_atom(f);
                }
            }
            atom => f(atom),
        }
    }
}

impl Deref for Term {
    type Target = TermX;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<TermX> for Term {
    fn as_ref(&self) -> &TermX {
        &self.0
    }
}

impl From<TermX> for Term {
    fn from(t: TermX) -> Self {
        Term::new(t)
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Term::new(TermX::Bool(b))
    }
}
