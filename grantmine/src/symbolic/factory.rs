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

#![allow(
    missing_docs,
    reason = "The meaning of most functions is clear from their names"
)]

//! Utility functions to construct [`Term`]s. These fold constants so the
//! common degenerate shapes (`"*"` patterns, empty deny sets) never reach
//! the solver.

use std::str::FromStr;

use smol_str::SmolStr;

use crate::ast::{Cidr, Pattern};

use super::term::{Term, TermX};

pub fn tru() -> Term {
    true.into()
}

pub fn fls() -> Term {
    false.into()
}

pub fn not(t: Term) -> Term {
    match &*t {
        TermX::Bool(b) => (!*b).into(),
        TermX::Not(inner) => inner.clone(),
        _ => TermX::Not(t).into(),
    }
}

pub fn and(ts: impl IntoIterator<Item = Term>) -> Term {
    let mut out = Vec::new();
    for t in ts {
        if t.is_false() {
            return fls();
        }
        if !t.is_true() {
            out.push(t);
        }
    }
    match out.len() {
        0 => tru(),
        1 => out.swap_remove(0),
        _ => TermX::And(out).into(),
    }
}

pub fn or(ts: impl IntoIterator<Item = Term>) -> Term {
    let mut out = Vec::new();
    for t in ts {
        if t.is_true() {
            return tru();
        }
        if !t.is_false() {
            out.push(t);
        }
    }
    match out.len() {
        0 => fls(),
        1 => out.swap_remove(0),
        _ => TermX::Or(out).into(),
    }
}

pub fn string_eq(key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Term {
    TermX::StrEq {
        key: key.into(),
        value: value.into(),
    }
    .into()
}

pub fn string_eq_no_case(key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Term {
    TermX::StrEqNoCase {
        key: key.into(),
        value: value.into(),
    }
    .into()
}

/// The glob-match predicate. `"*"` is the whole domain; a pattern that is
/// just `"?"` means "the value is non-empty" rather than "exactly one
/// character" (embedded `?` keeps the single-character meaning).
pub fn re_match(key: impl Into<SmolStr>, glob: &str) -> Term {
    let key = key.into();
    if glob == "*" {
        return tru();
    }
    if glob == "?" {
        return not(string_eq(key, ""));
    }
    TermX::InPattern {
        key,
        pattern: Pattern::from_glob(glob),
    }
    .into()
}

/// The CIDR-containment predicate. A malformed CIDR literal narrows to
/// the never-matching predicate; it is not an error.
pub fn ip_match(key: impl Into<SmolStr>, cidr: &str) -> Term {
    match Cidr::from_str(cidr) {
        Ok(cidr) => TermX::InCidr {
            key: key.into(),
            cidr,
        }
        .into(),
        Err(_) => fls(),
    }
}
