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

//! Translating [`Term`]s into SMT-LIB 2 expressions.
//!
//! We use the builtin SMT `String` type for string attributes, and
//! `(_ BitVec 32)` for address attributes; a CIDR predicate is a
//! mask-and-compare over that bit-vector. Glob patterns become regular
//! expressions in the SMT string theory: `*` is `(re.* re.allchar)`, an
//! embedded `?` is `re.allchar`, and literal runs are `str.to_re`
//! applications.
//!
//! Every attribute key is mapped to one SMT variable. The name→variable
//! cache lives for the whole encoder (and therefore oracle instance)
//! lifetime, so repeated references to the same key always resolve to the
//! same symbolic variable within one run; since every query resets the
//! solver, the encoder re-emits the needed `declare-const`s per query.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use itertools::Itertools;
use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::{Cidr, Pattern, PatternElem};

use super::term::{Term, TermX};

/// The maximum Unicode code point supported in SMT-LIB 2 string literals.
pub const SMT_LIB_MAX_CODE_POINT: u32 = 196_607;

/// The SMT sort of an attribute variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    /// The builtin `String` sort.
    String,
    /// `(_ BitVec 32)`.
    BitVec32,
}

impl Sort {
    fn smtlib(self) -> &'static str {
        match self {
            Sort::String => "String",
            Sort::BitVec32 => "(_ BitVec 32)",
        }
    }
}

/// Errors during encoding, i.e. converting [`Term`] to SMT-LIB 2 format.
#[derive(Debug, Diagnostic, Error)]
pub enum EncodeError {
    /// One key used both as a string and as an address attribute.
    #[error("attribute `{key}` is used both as a string and as an address")]
    SortConflict {
        /// The conflicted key.
        key: SmolStr,
    },
    /// Unable to encode a string literal.
    #[error("unable to encode string {0:?} in SMT as it exceeds the max supported code point")]
    EncodeStringFailed(String),
}

type Result<T> = std::result::Result<T, EncodeError>;

#[derive(Debug, Clone)]
struct VarInfo {
    id: String,
    sort: Sort,
}

/// Encodes terms to SMT-LIB expressions, caching the per-key variable
/// identities for its whole lifetime.
#[derive(Debug, Default)]
pub struct Encoder {
    vars: BTreeMap<SmolStr, VarInfo>,
}

/// An encoded term: the assertion expression plus the declarations it
/// needs.
#[derive(Debug)]
pub struct EncodedTerm {
    /// `declare-const` pairs (id, sort) used by the expression, in
    /// deterministic order.
    pub decls: Vec<(String, &'static str)>,
    /// The assertion body.
    pub expr: String,
}

impl Encoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn var(&mut self, key: &SmolStr, sort: Sort) -> Result<String> {
        if let Some(info) = self.vars.get(key) {
            if info.sort != sort {
                return Err(EncodeError::SortConflict { key: key.clone() });
            }
            return Ok(info.id.clone());
        }
        let id = format!("k{}", self.vars.len());
        self.vars.insert(
            key.clone(),
            VarInfo {
                id: id.clone(),
                sort,
            },
        );
        Ok(id)
    }

    /// Encodes one term, returning the expression and the declarations of
    /// every variable it mentions.
    pub fn encode(&mut self, term: &Term) -> Result<EncodedTerm> {
        let mut used: BTreeSet<SmolStr> = BTreeSet::new();
        let expr = self.encode_term(term, &mut used)?;
        let decls = used
            .iter()
            .filter_map(|key| self.vars.get(key))
            .map(|info| (info.id.clone(), info.sort.smtlib()))
            .collect();
        Ok(EncodedTerm { decls, expr })
    }

    fn encode_term(&mut self, term: &Term, used: &mut BTreeSet<SmolStr>) -> Result<String> {
        Ok(match &**term {
            TermX::Bool(b) => b.to_string(),
            TermX::StrEq { key, value } => {
                let id = self.var(key, Sort::String)?;
                used.insert(key.clone());
                format!("(= {id} \"{}\")", encode_string(value)?)
            }
            TermX::StrEqNoCase { key, value } => {
                let id = self.var(key, Sort::String)?;
                used.insert(key.clone());
                encode_str_eq_no_case(&id, value)?
            }
            TermX::InPattern { key, pattern } => {
                let id = self.var(key, Sort::String)?;
                used.insert(key.clone());
                format!("(str.in_re {id} {})", encode_pattern(pattern)?)
            }
            TermX::InCidr { key, cidr } => {
                let id = self.var(key, Sort::BitVec32)?;
                used.insert(key.clone());
                encode_cidr(&id, *cidr)
            }
            TermX::Not(t) => format!("(not {})", self.encode_term(t, used)?),
            TermX::And(ts) => self.encode_connective("and", ts, used)?,
            TermX::Or(ts) => self.encode_connective("or", ts, used)?,
        })
    }

    fn encode_connective(
        &mut self,
        op: &str,
        ts: &[Term],
        used: &mut BTreeSet<SmolStr>,
    ) -> Result<String> {
        // The factory never builds empty or singleton connectives, but
        // encoding stays total for hand-built terms.
        match ts {
            [] => Ok(match op {
                "and" => "true".to_string(),
                _ => "false".to_string(),
            }),
            [t] => self.encode_term(t, used),
            ts => {
                let parts: Vec<String> = ts
                    .iter()
                    .map(|t| self.encode_term(t, used))
                    .collect::<Result<_>>()?;
                Ok(format!("({op} {})", parts.iter().join(" ")))
            }
        }
    }
}

/// Escapes a string for an SMT-LIB string literal: `"` doubles, `\` is
/// emitted as its code point (it is not an escape character in SMT-LIB,
/// but emitting it raw would let it pair with a following `u` into one),
/// and non-printable characters become `\u{...}` escapes.
pub(super) fn encode_string(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '"' {
            out.push_str("\"\"");
        } else if c == '\\' {
            out.push_str("\\u{5c}");
        } else if 32 as char <= c && c <= 126 as char {
            out.push(c);
        } else {
            if c as u32 > SMT_LIB_MAX_CODE_POINT {
                return Err(EncodeError::EncodeStringFailed(s.to_string()));
            }
            let _ = write!(out, "\\u{{{:x}}}", c as u32);
        }
    }
    Ok(out)
}

fn encode_pat_elems(run: &str) -> Result<String> {
    Ok(format!("(str.to_re \"{}\")", encode_string(run)?))
}

/// A glob pattern as an SMT regex: literal runs, `re.allchar` for an
/// embedded `?`, `(re.* re.allchar)` for `*`.
fn encode_pattern(pattern: &Pattern) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut run = String::new();
    for elem in pattern.iter() {
        match elem {
            PatternElem::Char(c) => run.push(*c),
            wildcard => {
                if !run.is_empty() {
                    parts.push(encode_pat_elems(&run)?);
                    run.clear();
                }
                parts.push(match wildcard {
                    PatternElem::AnyChar => "re.allchar".to_string(),
                    _ => "(re.* re.allchar)".to_string(),
                });
            }
        }
    }
    if !run.is_empty() {
        parts.push(encode_pat_elems(&run)?);
    }
    Ok(match parts.len() {
        0 => "(str.to_re \"\")".to_string(),
        1 => parts.swap_remove(0),
        _ => format!("(re.++ {})", parts.iter().join(" ")),
    })
}

/// Case-insensitive equality against a known literal, as a regex
/// concatenation of per-character upper/lower unions.
fn encode_str_eq_no_case(id: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Ok(format!("(= {id} \"\")"));
    }
    let mut parts: Vec<String> = Vec::new();
    for c in value.chars() {
        let lower = c.to_ascii_lowercase();
        let upper = c.to_ascii_uppercase();
        if lower == upper {
            parts.push(encode_pat_elems(&c.to_string())?);
        } else {
            parts.push(format!(
                "(re.union (str.to_re \"{}\") (str.to_re \"{}\"))",
                encode_string(&lower.to_string())?,
                encode_string(&upper.to_string())?
            ));
        }
    }
    Ok(match parts.len() {
        1 => format!("(str.in_re {id} {})", parts[0]),
        _ => format!("(str.in_re {id} (re.++ {}))", parts.iter().join(" ")),
    })
}

/// CIDR containment as a mask-and-compare over the 32-bit address.
fn encode_cidr(id: &str, cidr: Cidr) -> String {
    format!(
        "(= (bvand {id} (_ bv{} 32)) (_ bv{} 32))",
        cidr.mask(),
        cidr.network()
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::symbolic::factory;

    #[test]
    fn string_escaping() {
        assert_eq!(encode_string("plain").unwrap(), "plain");
        assert_eq!(encode_string("say \"hi\"").unwrap(), "say \"\"hi\"\"");
        assert_eq!(encode_string("a\\b").unwrap(), "a\\u{5c}b");
        assert_eq!(encode_string("\n").unwrap(), "\\u{a}");
    }

    #[test]
    fn variable_identity_is_cached() {
        let mut enc = Encoder::new();
        let a = enc.encode(&factory::string_eq("Action", "s3:GetObject")).unwrap();
        let b = enc.encode(&factory::re_match("Action", "s3:Get*")).unwrap();
        // Same key, same variable id across queries.
        assert_eq!(a.decls, b.decls);
        assert!(a.expr.contains("k0"));
        assert!(b.expr.contains("k0"));
    }

    #[test]
    fn sort_conflict_is_an_error() {
        let mut enc = Encoder::new();
        enc.encode(&factory::string_eq("aws:SourceIp", "x")).unwrap();
        let err = enc
            .encode(&factory::ip_match("aws:SourceIp", "10.0.0.0/8"))
            .unwrap_err();
        cool_asserts::assert_matches!(err, EncodeError::SortConflict { .. });
    }

    #[test]
    fn pattern_regexes() {
        let mut enc = Encoder::new();
        let e = enc.encode(&factory::re_match("Action", "s3:Get*")).unwrap();
        assert_eq!(
            e.expr,
            "(str.in_re k0 (re.++ (str.to_re \"s3:Get\") (re.* re.allchar)))"
        );
        let e = enc.encode(&factory::re_match("Action", "a?c")).unwrap();
        assert_eq!(
            e.expr,
            "(str.in_re k0 (re.++ (str.to_re \"a\") re.allchar (str.to_re \"c\")))"
        );
    }

    #[test]
    fn lone_question_mark_is_not_empty_check() {
        let mut enc = Encoder::new();
        let e = enc.encode(&factory::re_match("Action", "?")).unwrap();
        assert_eq!(e.expr, "(not (= k0 \"\"))");
    }

    #[test]
    fn cidr_mask_compare() {
        let mut enc = Encoder::new();
        let e = enc
            .encode(&factory::ip_match("aws:SourceIp", "10.0.0.0/8"))
            .unwrap();
        assert_eq!(e.decls, vec![("k0".to_string(), "(_ BitVec 32)")]);
        assert_eq!(e.expr, "(= (bvand k0 (_ bv4278190080 32)) (_ bv167772160 32))");
    }

    #[test]
    fn connectives() {
        let mut enc = Encoder::new();
        let t = factory::and([
            factory::string_eq("A", "x"),
            factory::not(factory::string_eq("B", "y")),
        ]);
        let e = enc.encode(&t).unwrap();
        assert_eq!(e.expr, "(and (= k0 \"x\") (not (= k1 \"y\")))");
        assert_eq!(e.decls.len(), 2);
    }

    #[test]
    fn ignore_case_literal() {
        let mut enc = Encoder::new();
        let e = enc.encode(&factory::string_eq_no_case("A", "a1")).unwrap();
        assert_eq!(
            e.expr,
            "(str.in_re k0 (re.++ (re.union (str.to_re \"a\") (str.to_re \"A\")) (str.to_re \"1\")))"
        );
    }
}
