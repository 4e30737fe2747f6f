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

//! Per-round timing capture for the mining worklist, written as a CSV with
//! one row per round: the round's own time, the running total, and the
//! whole run's wall time, all in seconds.

use std::io::{self, Write};
use std::time::Duration;

/// Records the time of every worklist round plus the whole-run time.
#[derive(Debug, Default)]
pub struct TimeMeasure {
    rounds: Vec<Duration>,
    whole: Duration,
}

impl TimeMeasure {
    /// Wraps the per-round durations of a finished mining run.
    pub fn new(rounds: Vec<Duration>) -> Self {
        Self {
            rounds,
            whole: Duration::ZERO,
        }
    }

    /// Sets the whole-run wall time.
    pub fn set_whole_time(&mut self, whole: Duration) {
        self.whole = whole;
    }

    /// Number of recorded rounds.
    pub fn rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Writes the `SingleRound,AllRound,WholeTime` CSV.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "SingleRound,AllRound,WholeTime")?;
        let whole = self.whole.as_secs_f64();
        let mut total = 0.0;
        for round in &self.rounds {
            let single = round.as_secs_f64();
            total += single;
            writeln!(out, "{single:.4},{total:.4},{whole:.4}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn csv_shape() {
        let mut measure = TimeMeasure::new(vec![
            Duration::from_millis(1500),
            Duration::from_millis(250),
        ]);
        measure.set_whole_time(Duration::from_millis(2000));
        let mut buf = Vec::new();
        measure.write_csv(&mut buf).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "SingleRound,AllRound,WholeTime",
                "1.5000,1.5000,2.0000",
                "0.2500,1.7500,2.0000",
            ]
        );
    }

    #[test]
    fn empty_run_is_just_the_header() {
        let measure = TimeMeasure::default();
        let mut buf = Vec::new();
        measure.write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "SingleRound,AllRound,WholeTime\n");
    }
}
