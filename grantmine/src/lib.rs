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

//! Least-privilege intent mining over AWS-IAM-style access policies.
//!
//! Given a parsed [`ast::Policy`], the miner computes the minimal set of
//! maximally-general, mutually non-redundant grants ("findings") that
//! together describe exactly what the policy permits — the tool of choice
//! for auditing whether a policy grants more than intended.
//!
//! The pipeline:
//!
//! 1. [`relations::KvRelations`] orders each attribute key's literal
//!    values by strict region containment and reduces the order to its
//!    immediate-dominance edges.
//! 2. [`miner::mine`] runs a worklist search over the lattice of findings,
//!    accepting each maximally general finding whose uniquely-attributable
//!    region intersects the policy.
//! 3. Optionally, [`miner::reduce`] partitions the Boolean algebra
//!    generated by the findings and the policy into atoms
//!    ([`atomic::AtomicPartition`]) and solves an exact minimum set cover
//!    ([`cover::solve_min_cover`]) over the policy's atoms.
//!
//! Every satisfiability and entailment question is delegated to a
//! [`symbolic::SymOracle`]; the production backend drives a local cvc5 or
//! Z3 process over SMT-LIB 2.
//!
//! ```no_run
//! use grantmine::symbolic::{LocalSolver, SmtOracle};
//!
//! # fn main() -> grantmine::Result<()> {
//! let policy = grantmine::json::parse_policy(r#"{
//!     "Statement": [{
//!         "Effect": "Allow",
//!         "Principal": "*",
//!         "Action": ["s3:Get*", "s3:GetObject"],
//!         "Resource": "arn:aws:s3:::bucket/*"
//!     }]
//! }"#)?;
//! let solver = LocalSolver::cvc5().map_err(grantmine::err::OracleError::from)?;
//! let mut oracle = SmtOracle::new(solver);
//! let report = grantmine::miner::mine(&policy, &mut oracle)?;
//! let reduced = grantmine::miner::reduce(&policy, report.findings, &mut oracle)?;
//! println!("{}", grantmine::json::findings_to_value(&reduced));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod ast;
pub mod atomic;
pub mod cover;
pub mod encode;
pub mod err;
pub mod json;
pub mod miner;
pub mod relations;
pub mod symbolic;

pub use err::{Error, Result};
pub use miner::{mine, reduce, MineReport};
