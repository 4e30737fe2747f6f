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

//! The JSON document formats: policy input and findings output.
//!
//! Policy parsing is tolerant the way the policy language is: single
//! values are accepted wherever an array is expected, and
//! `"Principal": "*"` is shorthand for `{"AWS": ["*"]}`. It is strict the
//! way the miner needs it to be: unknown operator, key or effect names and
//! missing required fields are rejected here with descriptive errors, so
//! the core never sees an invalid policy.

use std::collections::{BTreeMap, BTreeSet};

use miette::Diagnostic;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::{
    AttrKey, Condition, CondOperator, Effect, EmptyCondition, Finding, Policy, Statement,
    UnknownEffect, UnknownKey, UnknownOperator,
};

/// Errors while parsing a policy document.
#[derive(Debug, Diagnostic, Error)]
pub enum ParseError {
    /// The document is not the expected JSON shape.
    #[error("malformed policy document: {0}")]
    Json(#[from] serde_json::Error),
    /// Unknown condition operator.
    #[error(transparent)]
    UnknownOperator(#[from] UnknownOperator),
    /// Unknown attribute key.
    #[error(transparent)]
    UnknownKey(#[from] UnknownKey),
    /// Unknown effect.
    #[error(transparent)]
    UnknownEffect(#[from] UnknownEffect),
    /// A principal block keyed by something that is not a principal
    /// domain.
    #[error("statement {index}: `{key}` is not a principal domain")]
    NotAPrincipalDomain {
        /// Zero-based statement index.
        index: usize,
        /// The offending key.
        key: AttrKey,
    },
    /// A condition clause keyed by something that is not a condition key.
    #[error("statement {index}: `{key}` is not a condition key")]
    NotAConditionKey {
        /// Zero-based statement index.
        index: usize,
        /// The offending key.
        key: AttrKey,
    },
    /// A required statement field is missing or empty.
    #[error("statement {index}: missing required field `{field}`")]
    MissingField {
        /// Zero-based statement index.
        index: usize,
        /// The missing field.
        field: &'static str,
    },
    /// A condition clause without values.
    #[error(transparent)]
    EmptyCondition(#[from] EmptyCondition),
    /// A principal string other than `"*"`.
    #[error("statement {index}: principal must be `\"*\"` or a domain map")]
    BadPrincipalString {
        /// Zero-based statement index.
        index: usize,
    },
}

type Result<T> = std::result::Result<T, ParseError>;

/// A single value or an array of values; the document format allows both
/// everywhere a value set is expected.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PrincipalDoc {
    Wildcard(String),
    Map(BTreeMap<String, OneOrMany<SmolStr>>),
}

#[derive(Debug, Deserialize)]
struct StatementDoc {
    #[serde(rename = "Sid")]
    sid: Option<SmolStr>,
    #[serde(rename = "Effect")]
    effect: String,
    #[serde(rename = "Principal")]
    principal: Option<PrincipalDoc>,
    #[serde(rename = "Action")]
    action: Option<OneOrMany<SmolStr>>,
    #[serde(rename = "Resource")]
    resource: Option<OneOrMany<SmolStr>>,
    #[serde(rename = "Condition")]
    condition: Option<BTreeMap<String, BTreeMap<String, OneOrMany<SmolStr>>>>,
}

#[derive(Debug, Deserialize)]
struct PolicyDoc {
    #[serde(rename = "Version")]
    version: Option<SmolStr>,
    #[serde(rename = "Statement")]
    statement: OneOrMany<StatementDoc>,
}

/// Parses a policy document from JSON text.
pub fn parse_policy(text: &str) -> Result<Policy> {
    let doc: PolicyDoc = serde_json::from_str(text)?;
    convert_policy(doc)
}

/// Parses a policy document from an already-deserialized JSON value.
pub fn parse_policy_value(value: Value) -> Result<Policy> {
    let doc: PolicyDoc = serde_json::from_value(value)?;
    convert_policy(doc)
}

fn convert_policy(doc: PolicyDoc) -> Result<Policy> {
    let statements = doc
        .statement
        .into_vec()
        .into_iter()
        .enumerate()
        .map(|(index, stmt)| convert_statement(index, stmt))
        .collect::<Result<Vec<_>>>()?;
    Ok(Policy::new(doc.version, statements))
}

fn required(
    index: usize,
    field: &'static str,
    values: Option<OneOrMany<SmolStr>>,
) -> Result<BTreeSet<SmolStr>> {
    let values: BTreeSet<SmolStr> = values
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .collect();
    if values.is_empty() {
        return Err(ParseError::MissingField { index, field });
    }
    Ok(values)
}

fn convert_statement(index: usize, doc: StatementDoc) -> Result<Statement> {
    let effect: Effect = doc.effect.parse()?;

    let mut principals: BTreeMap<AttrKey, BTreeSet<SmolStr>> = BTreeMap::new();
    match doc.principal {
        None => {}
        Some(PrincipalDoc::Wildcard(s)) if s == "*" => {
            principals.insert(AttrKey::Aws, BTreeSet::from([SmolStr::new_static("*")]));
        }
        Some(PrincipalDoc::Wildcard(_)) => {
            return Err(ParseError::BadPrincipalString { index });
        }
        Some(PrincipalDoc::Map(map)) => {
            for (domain, values) in map {
                let key: AttrKey = domain.parse()?;
                if !key.is_principal_domain() {
                    return Err(ParseError::NotAPrincipalDomain { index, key });
                }
                principals
                    .entry(key)
                    .or_default()
                    .extend(values.into_vec());
            }
        }
    }

    let actions = required(index, "Action", doc.action)?;
    let resources = required(index, "Resource", doc.resource)?;

    let mut conditions = Vec::new();
    for (operator, clauses) in doc.condition.unwrap_or_default() {
        let operator: CondOperator = operator.parse()?;
        for (key, values) in clauses {
            let key: AttrKey = key.parse()?;
            if !key.is_condition_key() {
                return Err(ParseError::NotAConditionKey { index, key });
            }
            let values: BTreeSet<SmolStr> = values.into_vec().into_iter().collect();
            conditions.push(Condition::new(operator, key, values)?);
        }
    }

    Ok(Statement {
        sid: doc.sid,
        effect,
        principals,
        actions,
        resources,
        conditions,
    })
}

fn string_set(values: impl IntoIterator<Item = SmolStr>) -> Value {
    Value::Array(values.into_iter().map(|v| Value::String(v.into())).collect())
}

/// Renders findings as the output document:
/// `{"Findings": [{"Principal": ..., "Action": ..., ...}]}`, with empty
/// sections omitted.
pub fn findings_to_value(findings: &[Finding]) -> Value {
    let rendered: Vec<Value> = findings
        .iter()
        .map(|finding| {
            let mut principal = Map::new();
            let mut out = Map::new();
            let mut condition = Map::new();
            for (key, value) in finding.entries() {
                if key.is_principal_domain() {
                    principal.insert(key.to_string(), string_set([value.clone()]));
                } else if key.is_condition_key() {
                    condition.insert(key.to_string(), string_set([value.clone()]));
                } else {
                    out.insert(key.to_string(), string_set([value.clone()]));
                }
            }
            let mut doc = Map::new();
            if !principal.is_empty() {
                doc.insert("Principal".into(), Value::Object(principal));
            }
            for field in ["Action", "Resource"] {
                if let Some(v) = out.remove(field) {
                    doc.insert(field.into(), v);
                }
            }
            if !condition.is_empty() {
                doc.insert("Condition".into(), Value::Object(condition));
            }
            Value::Object(doc)
        })
        .collect();
    json!({ "Findings": rendered })
}

/// Renders a parsed policy back to its document shape, for logging and
/// round-trip checks.
pub fn policy_to_value(policy: &Policy) -> Value {
    let statements: Vec<Value> = policy
        .statements()
        .iter()
        .map(|stmt| {
            let mut doc = Map::new();
            if let Some(sid) = &stmt.sid {
                doc.insert("Sid".into(), Value::String(sid.to_string()));
            }
            doc.insert(
                "Effect".into(),
                Value::String(
                    match stmt.effect {
                        Effect::Allow => "Allow",
                        Effect::Deny => "Deny",
                    }
                    .into(),
                ),
            );
            if !stmt.principals.is_empty() {
                let principal: Map<String, Value> = stmt
                    .principals
                    .iter()
                    .map(|(k, vs)| (k.to_string(), string_set(vs.iter().cloned())))
                    .collect();
                doc.insert("Principal".into(), Value::Object(principal));
            }
            doc.insert("Action".into(), string_set(stmt.actions.iter().cloned()));
            doc.insert(
                "Resource".into(),
                string_set(stmt.resources.iter().cloned()),
            );
            if !stmt.conditions.is_empty() {
                let mut condition = Map::new();
                for cond in &stmt.conditions {
                    let clause = condition
                        .entry(cond.operator().to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(clause) = clause {
                        clause.insert(
                            cond.key().to_string(),
                            string_set(cond.values().iter().cloned()),
                        );
                    }
                }
                doc.insert("Condition".into(), Value::Object(condition));
            }
            Value::Object(doc)
        })
        .collect();
    let mut doc = Map::new();
    if let Some(version) = policy.version() {
        doc.insert("Version".into(), Value::String(version.into()));
    }
    doc.insert("Statement".into(), Value::Array(statements));
    Value::Object(doc)
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    const SIMPLE: &str = r#"{
        "Version": "2012-10-17",
        "Statement": {
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": ["arn:aws:s3:::bucket/*"]
        }
    }"#;

    #[test]
    fn single_values_and_star_principal() {
        let policy = parse_policy(SIMPLE).unwrap();
        assert_eq!(policy.version(), Some("2012-10-17"));
        let stmt = &policy.statements()[0];
        assert_eq!(stmt.effect, Effect::Allow);
        assert_eq!(
            stmt.principals[&AttrKey::Aws],
            BTreeSet::from([SmolStr::new_static("*")])
        );
        assert_eq!(stmt.actions.len(), 1);
        assert_eq!(stmt.resources.len(), 1);
    }

    #[test]
    fn conditions_parse_with_nesting() {
        let text = r#"{
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": ["arn:aws:iam::123456789012:root"]},
                "Action": ["sts:AssumeRole"],
                "Resource": "*",
                "Condition": {
                    "StringLike": {"aws:SourceArn": "arn:aws:s3:::*"},
                    "IpAddress": {"aws:SourceIp": ["10.0.0.0/8", "192.168.0.0/16"]}
                }
            }]
        }"#;
        let policy = parse_policy(text).unwrap();
        let stmt = &policy.statements()[0];
        assert_eq!(stmt.conditions.len(), 2);
        let ip = stmt
            .conditions
            .iter()
            .find(|c| c.key() == AttrKey::SourceIp)
            .unwrap();
        assert_eq!(ip.values().len(), 2);
    }

    #[test]
    fn unknown_names_are_descriptive_errors() {
        let bad_op = SIMPLE.replace(
            "\"Resource\": [\"arn:aws:s3:::bucket/*\"]",
            "\"Resource\": [\"r\"], \"Condition\": {\"DateGreaterThan\": {\"aws:SourceArn\": \"x\"}}",
        );
        cool_asserts::assert_matches!(
            parse_policy(&bad_op),
            Err(ParseError::UnknownOperator(_))
        );

        let bad_key = SIMPLE.replace(
            "\"Resource\": [\"arn:aws:s3:::bucket/*\"]",
            "\"Resource\": [\"r\"], \"Condition\": {\"StringEquals\": {\"aws:username\": \"x\"}}",
        );
        cool_asserts::assert_matches!(parse_policy(&bad_key), Err(ParseError::UnknownKey(_)));

        let bad_effect = SIMPLE.replace("Allow", "Audit");
        cool_asserts::assert_matches!(
            parse_policy(&bad_effect),
            Err(ParseError::UnknownEffect(_))
        );
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let no_action = r#"{"Statement": [{"Effect": "Allow", "Resource": "*"}]}"#;
        cool_asserts::assert_matches!(
            parse_policy(no_action),
            Err(ParseError::MissingField {
                field: "Action",
                ..
            })
        );
        let empty_resource =
            r#"{"Statement": [{"Effect": "Allow", "Action": "a", "Resource": []}]}"#;
        cool_asserts::assert_matches!(
            parse_policy(empty_resource),
            Err(ParseError::MissingField {
                field: "Resource",
                ..
            })
        );
    }

    #[test]
    fn principal_must_be_star_or_domain_map() {
        let bad = SIMPLE.replace("\"Principal\": \"*\"", "\"Principal\": \"everyone\"");
        cool_asserts::assert_matches!(
            parse_policy(&bad),
            Err(ParseError::BadPrincipalString { .. })
        );
        let not_domain =
            SIMPLE.replace("\"Principal\": \"*\"", "\"Principal\": {\"Action\": \"x\"}");
        cool_asserts::assert_matches!(
            parse_policy(&not_domain),
            Err(ParseError::NotAPrincipalDomain { .. })
        );
    }

    #[test]
    fn findings_document_shape() {
        let policy = parse_policy(SIMPLE).unwrap();
        let root = Finding::root(&policy);
        let value = findings_to_value(&[root]);
        let findings = value["Findings"].as_array().unwrap();
        assert_eq!(findings.len(), 1);
        let doc = &findings[0];
        assert_eq!(doc["Principal"]["AWS"][0], "*");
        assert_eq!(doc["Action"][0], "*");
        assert_eq!(doc["Resource"][0], "*");
        assert!(doc.get("Condition").is_none());
    }

    #[test]
    fn policy_round_trips_through_its_document_shape() {
        let text = r#"{
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "AllowRead",
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:Get*"],
                "Resource": ["arn:aws:s3:::bucket/*"],
                "Condition": {"StringLike": {"aws:SourceArn": ["arn:aws:s3:::*"]}}
            }]
        }"#;
        let policy = parse_policy(text).unwrap();
        let rendered = policy_to_value(&policy);
        let reparsed = parse_policy_value(rendered).unwrap();
        assert_eq!(policy, reparsed);
    }
}
