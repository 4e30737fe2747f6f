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

//! Writing SMT-LIB 2 command scripts.
//!
//! The extension trait is implemented for every `io::Write`, so both the
//! live solver pipe and an in-memory buffer (for tests and debugging) get
//! the same command vocabulary.

use std::io::{self, Write};

/// Extension methods for writing SMT-LIB 2 commands.
pub trait SmtLibScript: Write {
    /// `(set-logic <logic>)`
    fn set_logic(&mut self, logic: &str) -> io::Result<()> {
        writeln!(self, "(set-logic {logic})")
    }

    /// `(set-option :<option> <value>)`
    fn set_option(&mut self, option: &str, value: &str) -> io::Result<()> {
        writeln!(self, "(set-option :{option} {value})")
    }

    /// `(declare-const <id> <sort>)`
    fn declare_const(&mut self, id: &str, sort: &str) -> io::Result<()> {
        writeln!(self, "(declare-const {id} {sort})")
    }

    /// `(assert <expr>)`
    fn assert(&mut self, expr: &str) -> io::Result<()> {
        writeln!(self, "(assert {expr})")
    }

    /// `(check-sat)`
    fn check_sat(&mut self) -> io::Result<()> {
        writeln!(self, "(check-sat)")
    }

    /// `(reset)` — clears assertions, declarations and the logic.
    fn reset(&mut self) -> io::Result<()> {
        writeln!(self, "(reset)")
    }

    /// A `;` comment. Newlines in the text are escaped so the comment
    /// cannot smuggle commands into the script.
    fn comment(&mut self, text: &str) -> io::Result<()> {
        writeln!(self, "; {}", text.escape_debug())
    }
}

impl<W: Write + ?Sized> SmtLibScript for W {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn command_shapes() {
        let mut buf: Vec<u8> = Vec::new();
        buf.set_logic("ALL").unwrap();
        buf.declare_const("k0", "String").unwrap();
        buf.assert("(= k0 \"x\")").unwrap();
        buf.check_sat().unwrap();
        buf.reset().unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "(set-logic ALL)\n(declare-const k0 String)\n(assert (= k0 \"x\"))\n(check-sat)\n(reset)\n"
        );
    }

    #[test]
    fn comment_escapes_newlines() {
        let mut buf: Vec<u8> = Vec::new();
        buf.comment("a\n(assert false)").unwrap();
        let script = String::from_utf8(buf).unwrap();
        assert_eq!(script.lines().count(), 1);
        assert!(script.starts_with("; "));
    }
}
