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

//! IPv4 CIDR literals for source-address conditions, represented as a
//! 32-bit address plus a prefix length.
//!
//! Parsing is strict: four octets, each at most three digits with no
//! leading zeros, and an optional `/prefix` in `0..=32` with the same
//! leading-zero rule. Anything else — including IPv6 literals, which this
//! model does not cover — fails to parse; condition encoding maps such
//! literals to the never-matching predicate instead of erroring.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

/// Errors in [`Cidr`] parsing.
#[derive(Debug, Diagnostic, Error)]
pub enum CidrError {
    /// Parse error.
    #[error("unable to parse `{0}` as an IPv4 CIDR literal")]
    ParseError(String),
}

/// A single IPv4 address, or a range of addresses defined by a CIDR
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cidr {
    /// The 32-bit address value.
    pub addr: u32,
    /// The prefix length, `0..=32`.
    pub prefix: u8,
}

impl Cidr {
    /// The network mask selected by the prefix length.
    pub fn mask(self) -> u32 {
        match self.prefix {
            0 => 0,
            p => u32::MAX << (32 - u32::from(p)),
        }
    }

    /// The network address: the address with host bits cleared.
    pub fn network(self) -> u32 {
        self.addr & self.mask()
    }

    /// Does the concrete address `value` fall inside this range?
    pub fn matches(self, value: u32) -> bool {
        value & self.mask() == self.network()
    }

    /// The lowest and highest addresses of the range.
    pub fn range(self) -> (u32, u32) {
        let lo = self.network();
        (lo, lo | !self.mask())
    }

    /// Is every address of `self` inside `other`?
    pub fn in_range(self, other: Cidr) -> bool {
        self.prefix >= other.prefix && other.matches(self.network())
    }
}

fn parse_num(s: &str) -> Option<u32> {
    if s.len() > 3 || (s.starts_with('0') && s != "0") {
        return None;
    }
    match s.parse::<u32>() {
        Ok(n) if n <= 255 => Some(n),
        _ => None,
    }
}

fn parse_segs(s: &str) -> Option<u32> {
    let parts: Vec<&str> = s.split('.').collect();
    match parts.as_slice() {
        [a0, a1, a2, a3] => {
            let a0 = parse_num(a0)?;
            let a1 = parse_num(a1)?;
            let a2 = parse_num(a2)?;
            let a3 = parse_num(a3)?;
            Some(a0 << 24 | a1 << 16 | a2 << 8 | a3)
        }
        _ => None,
    }
}

fn parse_prefix(s: &str) -> Option<u8> {
    if s.len() > 2 || (s.starts_with('0') && s != "0") {
        return None;
    }
    match s.parse::<u8>() {
        Ok(p) if p <= 32 => Some(p),
        _ => None,
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, CidrError> {
        let parts: Vec<&str> = s.split('/').collect();
        let parsed = match parts.as_slice() {
            [addr] => parse_segs(addr).map(|addr| Cidr { addr, prefix: 32 }),
            [addr, prefix] => parse_segs(addr)
                .zip(parse_prefix(prefix))
                .map(|(addr, prefix)| Cidr { addr, prefix }),
            _ => None,
        };
        parsed.ok_or_else(|| CidrError::ParseError(s.to_string()))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.addr;
        write!(
            f,
            "{}.{}.{}.{}/{}",
            v >> 24,
            (v >> 16) & 0xFF,
            (v >> 8) & 0xFF,
            v & 0xFF,
            self.prefix
        )
    }
}
