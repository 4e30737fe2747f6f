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

//! The policy model: attribute keys, condition operators, glob patterns,
//! CIDR literals, statements, policies and findings.

mod condition;
mod finding;
mod ipaddr;
mod key;
mod operator;
mod pattern;
mod policy;

pub use condition::{Condition, EmptyCondition};
pub use finding::Finding;
pub use ipaddr::{Cidr, CidrError};
pub use key::{AttrKey, UnknownKey, ValueKind};
pub use operator::{BaseOp, CondOperator, Quantifier, UnknownOperator};
pub use pattern::{Pattern, PatternElem};
pub use policy::{Effect, Policy, Statement, UnknownEffect};
