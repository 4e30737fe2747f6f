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

//! The attribute keys a policy can constrain. The set is finite and known
//! at build time: principal domains, `Action`, `Resource`, and the
//! supported condition keys.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

/// How a key's literal values denote regions: as glob patterns over
/// strings, or as CIDR ranges over 32-bit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Glob-pattern literals over string attributes.
    Pattern,
    /// CIDR literals over address attributes.
    IpCidr,
}

/// An attribute key appearing in a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKey {
    /// Principal domain `AWS`.
    Aws,
    /// Principal domain `IAM`.
    Iam,
    /// Principal domain `Service`.
    Service,
    /// Principal domain `Federated`.
    Federated,
    /// Statement `Action`.
    Action,
    /// Statement `Resource`.
    Resource,
    /// Condition key `aws:PrincipalArn`.
    PrincipalArn,
    /// Condition key `aws:SourceArn`.
    SourceArn,
    /// Condition key `aws:SourceIp`.
    SourceIp,
}

/// Unknown attribute-key name.
#[derive(Debug, Diagnostic, Error)]
#[error("unknown attribute key `{0}`")]
pub struct UnknownKey(pub String);

impl AttrKey {
    /// Every key, in canonical order.
    pub const ALL: [AttrKey; 9] = [
        AttrKey::Aws,
        AttrKey::Iam,
        AttrKey::Service,
        AttrKey::Federated,
        AttrKey::Action,
        AttrKey::Resource,
        AttrKey::PrincipalArn,
        AttrKey::SourceArn,
        AttrKey::SourceIp,
    ];

    /// The spelling used in policy documents.
    pub fn as_str(self) -> &'static str {
        match self {
            AttrKey::Aws => "AWS",
            AttrKey::Iam => "IAM",
            AttrKey::Service => "Service",
            AttrKey::Federated => "Federated",
            AttrKey::Action => "Action",
            AttrKey::Resource => "Resource",
            AttrKey::PrincipalArn => "aws:PrincipalArn",
            AttrKey::SourceArn => "aws:SourceArn",
            AttrKey::SourceIp => "aws:SourceIp",
        }
    }

    /// How this key's literals denote regions.
    pub fn value_kind(self) -> ValueKind {
        match self {
            AttrKey::SourceIp => ValueKind::IpCidr,
            _ => ValueKind::Pattern,
        }
    }

    /// The literal whose region is the whole domain of this key: the
    /// generic wildcard, or the all-addresses CIDR for address keys.
    pub fn top_literal(self) -> &'static str {
        match self.value_kind() {
            ValueKind::Pattern => "*",
            ValueKind::IpCidr => "0.0.0.0/0",
        }
    }

    /// Is this one of the principal domain keys?
    pub fn is_principal_domain(self) -> bool {
        matches!(
            self,
            AttrKey::Aws | AttrKey::Iam | AttrKey::Service | AttrKey::Federated
        )
    }

    /// Is this one of the condition keys?
    pub fn is_condition_key(self) -> bool {
        matches!(
            self,
            AttrKey::PrincipalArn | AttrKey::SourceArn | AttrKey::SourceIp
        )
    }
}

impl FromStr for AttrKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, UnknownKey> {
        AttrKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("aws".parse::<AttrKey>().unwrap(), AttrKey::Aws);
        assert_eq!("ACTION".parse::<AttrKey>().unwrap(), AttrKey::Action);
        assert_eq!(
            "aws:sourceip".parse::<AttrKey>().unwrap(),
            AttrKey::SourceIp
        );
        assert!("aws:RequestTag".parse::<AttrKey>().is_err());
    }

    #[test]
    fn tops_and_kinds() {
        assert_eq!(AttrKey::Action.top_literal(), "*");
        assert_eq!(AttrKey::SourceIp.top_literal(), "0.0.0.0/0");
        assert_eq!(AttrKey::SourceIp.value_kind(), ValueKind::IpCidr);
        assert_eq!(AttrKey::Resource.value_kind(), ValueKind::Pattern);
    }

    #[test]
    fn display_round_trip() {
        for key in AttrKey::ALL {
            assert_eq!(key.to_string().parse::<AttrKey>().unwrap(), key);
        }
    }
}
