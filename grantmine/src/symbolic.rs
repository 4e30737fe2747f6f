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

//! The symbolic oracle: a boolean term language over per-attribute
//! predicates, SMT-LIB encoding, solver processes, and the oracle trait
//! the core algorithms are written against.

pub mod encoder;
pub mod factory;
pub mod oracle;
pub mod sample;
pub mod script;
pub mod solver;
pub mod term;

pub use encoder::{EncodeError, Encoder};
pub use oracle::{OracleError, SmtOracle, SymOracle};
pub use sample::SampleOracle;
pub use script::SmtLibScript;
pub use solver::{Decision, LocalSolver, SmtSolver, SolverError, WriterSolver};
pub use term::{Term, TermX};
