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

//! The policy model: statements of effect, principal, action, resource and
//! conditions, plus the derived key→literal-universe map the mining
//! pipeline is driven by.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::OnceLock;

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use super::condition::Condition;
use super::key::AttrKey;

/// The effect of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// `"Effect": "Allow"`.
    Allow,
    /// `"Effect": "Deny"`.
    Deny,
}

/// Unknown effect name.
#[derive(Debug, Diagnostic, Error)]
#[error("unknown effect `{0}`, expected `Allow` or `Deny`")]
pub struct UnknownEffect(pub String);

impl FromStr for Effect {
    type Err = UnknownEffect;

    fn from_str(s: &str) -> Result<Self, UnknownEffect> {
        if s.eq_ignore_ascii_case("allow") {
            Ok(Effect::Allow)
        } else if s.eq_ignore_ascii_case("deny") {
            Ok(Effect::Deny)
        } else {
            Err(UnknownEffect(s.to_string()))
        }
    }
}

/// One statement of a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Optional statement id, kept from the document but irrelevant to the
    /// statement's meaning.
    pub sid: Option<SmolStr>,
    /// Allow or Deny.
    pub effect: Effect,
    /// Principal domain → literal values. Empty when the statement has no
    /// `Principal` block.
    pub principals: BTreeMap<AttrKey, BTreeSet<SmolStr>>,
    /// Action literals. Never empty.
    pub actions: BTreeSet<SmolStr>,
    /// Resource literals. Never empty.
    pub resources: BTreeSet<SmolStr>,
    /// Condition clauses, possibly empty.
    pub conditions: Vec<Condition>,
}

/// A parsed policy: an immutable set of statements plus the version tag.
#[derive(Debug, Clone)]
pub struct Policy {
    version: Option<SmolStr>,
    statements: Vec<Statement>,
    universe: OnceLock<BTreeMap<AttrKey, BTreeSet<SmolStr>>>,
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.statements == other.statements
    }
}

impl Eq for Policy {}

impl Policy {
    /// Builds a policy from parsed statements.
    pub fn new(version: Option<SmolStr>, statements: Vec<Statement>) -> Self {
        Self {
            version,
            statements,
            universe: OnceLock::new(),
        }
    }

    /// The document version tag, if present.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The statements.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// For every key appearing anywhere in the policy (principal blocks,
    /// actions, resources, condition keys), the set of literal values used
    /// for it. Built once and cached.
    pub fn key_universe(&self) -> &BTreeMap<AttrKey, BTreeSet<SmolStr>> {
        self.universe.get_or_init(|| {
            let mut map: BTreeMap<AttrKey, BTreeSet<SmolStr>> = BTreeMap::new();
            for statement in &self.statements {
                for (key, values) in &statement.principals {
                    map.entry(*key).or_default().extend(values.iter().cloned());
                }
                map.entry(AttrKey::Action)
                    .or_default()
                    .extend(statement.actions.iter().cloned());
                map.entry(AttrKey::Resource)
                    .or_default()
                    .extend(statement.resources.iter().cloned());
                for condition in &statement.conditions {
                    map.entry(condition.key())
                        .or_default()
                        .extend(condition.values().iter().cloned());
                }
            }
            map
        })
    }

    /// The set of keys the policy constrains — the domain every finding
    /// must cover.
    pub fn key_set(&self) -> impl Iterator<Item = AttrKey> + '_ {
        self.key_universe().keys().copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn values(vs: &[&str]) -> BTreeSet<SmolStr> {
        vs.iter().map(|v| SmolStr::from(*v)).collect()
    }

    fn statement(effect: Effect) -> Statement {
        Statement {
            sid: None,
            effect,
            principals: BTreeMap::from([(AttrKey::Aws, values(&["*"]))]),
            actions: values(&["s3:Get*", "s3:GetObject"]),
            resources: values(&["arn:aws:s3:::bucket/*"]),
            conditions: vec![],
        }
    }

    #[test]
    fn effect_parse() {
        assert_eq!("Allow".parse::<Effect>().unwrap(), Effect::Allow);
        assert_eq!("DENY".parse::<Effect>().unwrap(), Effect::Deny);
        assert!("Audit".parse::<Effect>().is_err());
    }

    #[test]
    fn universe_collects_all_sections() {
        let op = "IpAddress".parse().unwrap();
        let mut stmt = statement(Effect::Allow);
        stmt.conditions =
            vec![Condition::new(op, AttrKey::SourceIp, values(&["10.0.0.0/8"])).unwrap()];
        let policy = Policy::new(Some("2012-10-17".into()), vec![stmt]);

        let universe = policy.key_universe();
        assert_eq!(universe[&AttrKey::Aws], values(&["*"]));
        assert_eq!(
            universe[&AttrKey::Action],
            values(&["s3:Get*", "s3:GetObject"])
        );
        assert_eq!(
            universe[&AttrKey::Resource],
            values(&["arn:aws:s3:::bucket/*"])
        );
        assert_eq!(universe[&AttrKey::SourceIp], values(&["10.0.0.0/8"]));
        assert_eq!(policy.key_set().count(), 4);
    }

    #[test]
    fn universe_merges_statements() {
        let mut deny = statement(Effect::Deny);
        deny.resources = values(&["arn:aws:s3:::bucket/secret*"]);
        let policy = Policy::new(None, vec![statement(Effect::Allow), deny]);
        assert_eq!(
            policy.key_universe()[&AttrKey::Resource],
            values(&["arn:aws:s3:::bucket/*", "arn:aws:s3:::bucket/secret*"])
        );
    }
}
