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

//! A simple interface to an SMT solver process.
//!
//! Callers communicate with the solver by issuing commands with
//! s-expressions encoded as strings; the [`SmtLibScript`](super::script::SmtLibScript)
//! trait provides the command vocabulary. We support cvc5 and Z3, running
//! locally in a separate process and spoken to over stdin/stdout. The
//! whole pipeline is synchronous, so all I/O here is blocking.
//!
//! `LocalSolver::cvc5()` uses the value of the environment variable `CVC5`
//! as the path to the cvc5 executable, or looks for `cvc5` on the `PATH`;
//! `LocalSolver::z3()` does the same with `Z3`/`z3`.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use miette::Diagnostic;
use thiserror::Error;

/// Satisfiability decision from the SMT solver.
#[derive(Clone, Debug, PartialEq, Eq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum Decision {
    Sat,
    Unsat,
    Unknown,
}

/// Errors when interacting with a [`SmtSolver`] instance.
#[derive(Debug, Diagnostic, Error)]
pub enum SolverError {
    /// IO error.
    #[error("IO error during a solver operation")]
    Io(#[from] io::Error),
    /// Error reported by the solver.
    #[error("solver error: {0}")]
    Solver(String),
    /// Unrecognized solver output.
    #[error("unrecognized solver output: {0}")]
    UnrecognizedSolverOutput(String),
}

type Result<T> = std::result::Result<T, SolverError>;

/// Something capable of running SMT-LIB queries.
pub trait SmtSolver {
    /// The input stream for the solver, so that more commands can be
    /// written to it. Input is expected to be in SMT-LIB format; bringing
    /// `SmtLibScript` into scope gives the command methods for free.
    fn smtlib_input(&mut self) -> &mut dyn Write;

    /// Issues `(check-sat)` for the script written so far and returns the
    /// solver's decision.
    fn check_sat(&mut self) -> Result<Decision>;
}

/// A solver instance that communicates with a local SMT solver process
/// through stdin/stdout.
#[derive(Debug)]
pub struct LocalSolver {
    /// The spawned solver process.
    child: Child,
    solver_stdin: BufWriter<ChildStdin>,
    solver_stdout: BufReader<ChildStdout>,
}

impl LocalSolver {
    /// Creates a new [`LocalSolver`] from a custom [`Command`].
    ///
    /// The command is expected to behave as an interactive SMT solver that
    /// reads SMT-LIB 2 from stdin (e.g. `cvc5 --lang smt` or `z3 -in`).
    pub fn from_command(cmd: &mut Command) -> Result<Self> {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                return Err(SolverError::Solver(
                    "failed to fetch IO pipes for solver process".into(),
                ))
            }
        };
        Ok(Self {
            solver_stdin: BufWriter::new(stdin),
            solver_stdout: BufReader::new(stdout),
            child,
        })
    }

    /// Spawns a cvc5 process, looking up the executable via the `CVC5`
    /// environment variable or the `cvc5` binary on `PATH`.
    pub fn cvc5() -> Result<Self> {
        let path = std::env::var("CVC5").unwrap_or_else(|_| "cvc5".into());
        Self::from_command(Command::new(path).args(["--lang", "smt", "--incremental"]))
    }

    /// Similar to [`Self::cvc5`] but with custom arguments.
    pub fn cvc5_with_args(args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<Self> {
        let path = std::env::var("CVC5").unwrap_or_else(|_| "cvc5".into());
        Self::from_command(Command::new(path).args(["--lang", "smt"]).args(args))
    }

    /// Spawns a Z3 process, looking up the executable via the `Z3`
    /// environment variable or the `z3` binary on `PATH`.
    pub fn z3() -> Result<Self> {
        let path = std::env::var("Z3").unwrap_or_else(|_| "z3".into());
        Self::from_command(Command::new(path).args(["-smt2", "-in"]))
    }

    fn read_line(&mut self, buffer: &mut String) -> Result<usize> {
        let len = self.solver_stdout.read_line(buffer)?;
        if len == 0 {
            Err(SolverError::Solver(
                "encountered EOF while reading from solver output".to_string(),
            ))
        } else {
            Ok(len)
        }
    }

    fn process_error_output(s: &str) -> SolverError {
        match s
            .strip_prefix("(error \"")
            .and_then(|s| s.strip_suffix("\")\n"))
        {
            Some(e) => SolverError::Solver(e.to_string()),
            _ => SolverError::UnrecognizedSolverOutput(s.to_string()),
        }
    }

    /// Forces this solver's child process to exit and waits for it.
    pub fn clean_up(mut self) -> Result<()> {
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}

impl SmtSolver for LocalSolver {
    fn smtlib_input(&mut self) -> &mut dyn Write {
        &mut self.solver_stdin
    }

    fn check_sat(&mut self) -> Result<Decision> {
        if let Some(status) = self.child.try_wait()? {
            Err(SolverError::Solver(format!(
                "solver process terminated unexpectedly with status: {:?}",
                status.code()
            )))?
        }
        use super::script::SmtLibScript;
        self.smtlib_input().check_sat()?;
        self.solver_stdin.flush()?;
        let mut output = String::new();
        self.read_line(&mut output)?;
        match output.as_str() {
            "sat\n" => Ok(Decision::Sat),
            "unsat\n" => Ok(Decision::Unsat),
            "unknown\n" => Ok(Decision::Unknown),
            s => Err(Self::process_error_output(s)),
        }
    }
}

/// Implements [`SmtSolver`] by writing all issued commands to the given
/// `io::Write`. `check_sat()` records the command and returns
/// `Decision::Unknown`, which is sound but not very useful. The purpose is
/// testing that only cares about the contents of the script.
#[derive(Debug)]
pub struct WriterSolver<W> {
    /// Where the commands are written.
    pub w: W,
}

impl<W: Write> SmtSolver for WriterSolver<W> {
    fn smtlib_input(&mut self) -> &mut dyn Write {
        &mut self.w
    }

    fn check_sat(&mut self) -> Result<Decision> {
        use super::script::SmtLibScript;
        self.w.check_sat()?;
        self.w.flush()?;
        Ok(Decision::Unknown)
    }
}
