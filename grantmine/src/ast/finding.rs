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

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

use super::key::AttrKey;
use super::policy::Policy;
use crate::relations::KvRelations;

/// One generalized, concrete grant: a total map from every key in the
/// policy's universe to exactly one literal value.
///
/// The domain of a finding is always exactly the policy's key set; the
/// miner only ever replaces values, never adds or removes keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Finding {
    entries: BTreeMap<AttrKey, SmolStr>,
}

impl Finding {
    /// The root of the search lattice: every key mapped to its top
    /// literal.
    pub fn root(policy: &Policy) -> Self {
        Self {
            entries: policy
                .key_set()
                .map(|key| (key, SmolStr::new_static(key.top_literal())))
                .collect(),
        }
    }

    /// The literal assigned to `key`, if the key is in the domain.
    pub fn get(&self, key: AttrKey) -> Option<&SmolStr> {
        self.entries.get(&key)
    }

    /// Iterates over (key, literal) entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (AttrKey, &SmolStr)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// A copy with `key` narrowed to `value`.
    pub fn with_value(&self, key: AttrKey, value: SmolStr) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key, value);
        Self { entries }
    }

    /// All one-step specializations: for every key, every immediate-
    /// dominance child of the current value yields one successor finding.
    pub fn refine(&self, relations: &KvRelations) -> Vec<Finding> {
        let mut out = Vec::new();
        for (key, value) in self.entries() {
            for child in relations.idom(key, value) {
                out.push(self.with_value(key, child.clone()));
            }
        }
        out
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}
