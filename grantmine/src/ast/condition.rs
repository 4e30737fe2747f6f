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

use std::collections::BTreeSet;
use std::fmt;

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use super::key::AttrKey;
use super::operator::CondOperator;

/// One condition clause of a statement: an operator, exactly one attribute
/// key, and a non-empty set of literal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Condition {
    operator: CondOperator,
    key: AttrKey,
    values: BTreeSet<SmolStr>,
}

/// A condition clause with no values.
#[derive(Debug, Diagnostic, Error)]
#[error("condition `{operator}` on `{key}` has no values")]
pub struct EmptyCondition {
    /// The offending operator.
    pub operator: CondOperator,
    /// The offending key.
    pub key: AttrKey,
}

impl Condition {
    /// Builds a condition, rejecting an empty value set.
    pub fn new(
        operator: CondOperator,
        key: AttrKey,
        values: BTreeSet<SmolStr>,
    ) -> Result<Self, EmptyCondition> {
        if values.is_empty() {
            return Err(EmptyCondition { operator, key });
        }
        Ok(Self {
            operator,
            key,
            values,
        })
    }

    /// The condition operator.
    pub fn operator(&self) -> CondOperator {
        self.operator
    }

    /// The constrained attribute key.
    pub fn key(&self) -> AttrKey {
        self.key
    }

    /// The literal values. Never empty.
    pub fn values(&self) -> &BTreeSet<SmolStr> {
        &self.values
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} in {:?}", self.operator, self.key, self.values)
    }
}
