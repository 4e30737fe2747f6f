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

//! Glob patterns as they appear in policy literals: `*` matches any
//! sequence of characters (including the empty one), `?` matches exactly
//! one character, and everything else matches itself.
//!
//! One asymmetry is deliberate and load-bearing: a pattern consisting of a
//! single `?` means "the value is non-empty", not "the value is exactly one
//! character". Embedded in a longer pattern, `?` is an ordinary
//! single-character wildcard. Both this matcher and the symbolic encoding
//! implement the same rule.

use std::fmt;
use std::sync::Arc;

/// One element of a glob pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternElem {
    /// A character literal.
    Char(char),
    /// The single-character wildcard `?`.
    AnyChar,
    /// The wildcard `*`.
    Wildcard,
}

impl PatternElem {
    fn match_char(self, text_char: char) -> bool {
        match self {
            PatternElem::Char(c) => text_char == c,
            PatternElem::AnyChar | PatternElem::Wildcard => true,
        }
    }

    fn is_wildcard(self) -> bool {
        matches!(self, PatternElem::Wildcard)
    }
}

/// A glob pattern literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pattern {
    elems: Arc<Vec<PatternElem>>,
}

impl Pattern {
    /// Parses a policy glob literal. There is no escaping in the policy
    /// language: every `*` and `?` is a wildcard.
    pub fn from_glob(glob: &str) -> Self {
        glob.chars()
            .map(|c| match c {
                '*' => PatternElem::Wildcard,
                '?' => PatternElem::AnyChar,
                c => PatternElem::Char(c),
            })
            .collect()
    }

    /// The wrapped element slice.
    pub fn elems(&self) -> &[PatternElem] {
        &self.elems
    }

    /// Iterate over pattern elements.
    pub fn iter(&self) -> impl Iterator<Item = &PatternElem> {
        self.elems.iter()
    }

    /// True iff this pattern is the single element `?`, which carries the
    /// whole-pattern "non-empty" meaning.
    pub fn is_lone_any_char(&self) -> bool {
        matches!(self.elems.as_slice(), [PatternElem::AnyChar])
    }

    /// Find if the argument text matches the pattern.
    pub fn wildcard_match(&self, text: &str) -> bool {
        if self.is_lone_any_char() {
            return !text.is_empty();
        }
        let pattern = self.elems();
        if pattern.is_empty() {
            return text.is_empty();
        }

        // Working on a char vector makes index access cheap, and gives an
        // unambiguous length: the matcher moves both forward and backward
        // through the text, so a plain iterator will not do.
        let text: Vec<char> = text.chars().collect();

        let mut i: usize = 0; // index into text
        let mut j: usize = 0; // index into pattern
        let mut star_idx: usize = 0; // index in pattern (j) of the most recent *
        let mut tmp_idx: usize = 0; // index in text (i) of the most recent *
        let mut contains_star: bool = false;

        let text_len = text.len();
        let pattern_len = pattern.len();

        while i < text_len && (!contains_star || star_idx != pattern_len - 1) {
            if j < pattern_len && pattern[j].is_wildcard() {
                contains_star = true;
                star_idx = j;
                tmp_idx = i;
                j += 1;
            } else if j < pattern_len && pattern[j].match_char(text[i]) {
                i += 1;
                j += 1;
            } else if contains_star {
                j = star_idx + 1;
                i = tmp_idx + 1;
                tmp_idx = i;
            } else {
                return false;
            }
        }

        while j < pattern_len && pattern[j].is_wildcard() {
            j += 1;
        }

        j == pattern_len
    }
}

impl FromIterator<PatternElem> for Pattern {
    fn from_iter<T: IntoIterator<Item = PatternElem>>(iter: T) -> Self {
        Self {
            elems: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl From<Vec<PatternElem>> for Pattern {
    fn from(value: Vec<PatternElem>) -> Self {
        Self {
            elems: Arc::new(value),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pc in self.elems.as_ref() {
            match pc {
                PatternElem::Char(c) => write!(f, "{c}")?,
                PatternElem::AnyChar => write!(f, "?")?,
                PatternElem::Wildcard => write!(f, "*")?,
            }
        }
        Ok(())
    }
}
