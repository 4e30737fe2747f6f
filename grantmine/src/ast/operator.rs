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

//! Condition operators, decomposed along three axes instead of one flat
//! enumeration of every spelled name: a base semantic class, a polarity,
//! and a set quantifier. Predicate construction dispatches on base class
//! and polarity only; the quantifier is parsed and carried but does not
//! change the encoding (multi-valued attribute semantics are not modeled).

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

/// The base semantic class of a condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseOp {
    /// Exact string equality; `*` and `?` are ordinary characters.
    Equals,
    /// Case-insensitive string equality.
    EqualsIgnoreCase,
    /// Glob-pattern match (`StringLike`/`StringMatch`/`ArnLike`).
    Match,
    /// CIDR containment over a source address.
    IpMatch,
}

/// The set quantifier of a condition operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantifier {
    /// No quantifier.
    #[default]
    Plain,
    /// `...IfExists` suffix.
    IfExists,
    /// `ForAllValues:` prefix.
    ForAllValues,
    /// `ForAnyValue:` prefix.
    ForAnyValue,
}

/// A condition operator: base class × polarity × quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CondOperator {
    base: BaseOp,
    negated: bool,
    quantifier: Quantifier,
}

/// Unknown condition-operator name.
#[derive(Debug, Diagnostic, Error)]
#[error("unknown condition operator `{0}`")]
pub struct UnknownOperator(pub String);

impl CondOperator {
    /// Assembles an operator from its axes.
    pub fn new(base: BaseOp, negated: bool, quantifier: Quantifier) -> Self {
        Self {
            base,
            negated,
            quantifier,
        }
    }

    /// The base semantic class.
    pub fn base(self) -> BaseOp {
        self.base
    }

    /// Is this the negated polarity (`...Not...`)?
    pub fn negated(self) -> bool {
        self.negated
    }

    /// The set quantifier.
    pub fn quantifier(self) -> Quantifier {
        self.quantifier
    }

    fn base_name(self) -> &'static str {
        match (self.base, self.negated) {
            (BaseOp::Equals, false) => "StringEquals",
            (BaseOp::Equals, true) => "StringNotEquals",
            (BaseOp::EqualsIgnoreCase, false) => "StringEqualsIgnoreCase",
            (BaseOp::EqualsIgnoreCase, true) => "StringNotEqualsIgnoreCase",
            (BaseOp::Match, false) => "StringLike",
            (BaseOp::Match, true) => "StringNotLike",
            (BaseOp::IpMatch, false) => "IpAddress",
            (BaseOp::IpMatch, true) => "NotIpAddress",
        }
    }
}

/// Parses the base token of an operator name, without any quantifier
/// prefix or suffix. Case-insensitive; `StringLike`/`StringMatch` and
/// `ArnLike` all map to the pattern-match class.
fn parse_base(token: &str) -> Option<(BaseOp, bool)> {
    const TABLE: [(&str, BaseOp, bool); 12] = [
        ("StringEquals", BaseOp::Equals, false),
        ("StringNotEquals", BaseOp::Equals, true),
        ("StringEqualsIgnoreCase", BaseOp::EqualsIgnoreCase, false),
        ("StringNotEqualsIgnoreCase", BaseOp::EqualsIgnoreCase, true),
        ("StringLike", BaseOp::Match, false),
        ("StringNotLike", BaseOp::Match, true),
        ("StringMatch", BaseOp::Match, false),
        ("StringNotMatch", BaseOp::Match, true),
        ("ArnLike", BaseOp::Match, false),
        ("ArnNotLike", BaseOp::Match, true),
        ("IpAddress", BaseOp::IpMatch, false),
        ("NotIpAddress", BaseOp::IpMatch, true),
    ];
    TABLE
        .into_iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, base, negated)| (base, negated))
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    // Not a char boundary means `s` is not ASCII there, so it cannot match.
    if !s.is_char_boundary(cut) {
        return None;
    }
    let (head, tail) = s.split_at(cut);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() < prefix.len() || !s.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = s.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}

impl FromStr for CondOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, UnknownOperator> {
        let unknown = || UnknownOperator(s.to_string());

        let (token, quantifier) = if let Some(rest) = strip_prefix_ignore_case(s, "ForAllValues:") {
            (rest, Quantifier::ForAllValues)
        } else if let Some(rest) = strip_prefix_ignore_case(s, "ForAnyValue:") {
            (rest, Quantifier::ForAnyValue)
        } else if let Some(rest) = strip_suffix_ignore_case(s, "IfExists") {
            (rest, Quantifier::IfExists)
        } else {
            (s, Quantifier::Plain)
        };

        // A prefixed name must not also carry the suffix.
        if matches!(
            quantifier,
            Quantifier::ForAllValues | Quantifier::ForAnyValue
        ) && strip_suffix_ignore_case(token, "IfExists").is_some()
        {
            return Err(unknown());
        }

        let (base, negated) = parse_base(token).ok_or_else(unknown)?;
        Ok(CondOperator {
            base,
            negated,
            quantifier,
        })
    }
}

impl fmt::Display for CondOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantifier {
            Quantifier::Plain => write!(f, "{}", self.base_name()),
            Quantifier::IfExists => write!(f, "{}IfExists", self.base_name()),
            Quantifier::ForAllValues => write!(f, "ForAllValues:{}", self.base_name()),
            Quantifier::ForAnyValue => write!(f, "ForAnyValue:{}", self.base_name()),
        }
    }
}
