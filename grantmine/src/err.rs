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

//! All error types of the mining pipeline. Every fatal condition aborts
//! the run; there is no partial-result recovery.

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::AttrKey;

pub use crate::json::ParseError;
pub use crate::symbolic::{EncodeError, OracleError, SolverError};

/// Top-level errors from the whole `grantmine` crate.
#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    /// Oracle query failure, including solver indecision.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),
    /// Malformed policy document.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
    /// A policy without statements cannot be mined.
    #[error("policy has no statements")]
    NoStatements,
    /// The dominance relation is not a strict partial order.
    #[error("dominance relation for `{key}` has a cycle through `{value}`")]
    DominanceCycle {
        /// The key whose relation cycles.
        key: AttrKey,
        /// A value on the cycle.
        value: SmolStr,
    },
    /// A partition source formula is unsatisfiable.
    #[error("partition source {0} is unsatisfiable")]
    UnsatSource(String),
    /// No finding subset covers the policy's atoms. Mined findings are
    /// constructed to cover the policy, so this should be unreachable.
    #[error("no selection of findings covers the policy")]
    CoverInfeasible,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
