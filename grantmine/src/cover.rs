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

//! Exact minimum set cover, as a 0/1 integer program: one binary decision
//! variable per subset, a ≥1 covering constraint per universe element,
//! minimizing the number of selected subsets. The branch-and-bound backend
//! returns a provable optimum, not an approximation.

use std::collections::{BTreeMap, BTreeSet};

use good_lp::{constraint, microlp, variable, variables, Expression, Solution, SolverModel};
use tracing::debug;

/// Selects a minimum-cardinality family of `subsets` whose union contains
/// `universe`, returning the selected subsets keyed as given. Returns the
/// empty map when no selection covers the universe; deciding whether that
/// is fatal is the caller's business.
pub fn solve_min_cover(
    subsets: &BTreeMap<usize, BTreeSet<usize>>,
    universe: &BTreeSet<usize>,
) -> BTreeMap<usize, BTreeSet<usize>> {
    if universe.is_empty() {
        return BTreeMap::new();
    }

    let mut vars = variables!();
    let decisions: BTreeMap<usize, good_lp::Variable> = subsets
        .keys()
        .map(|&id| (id, vars.add(variable().binary())))
        .collect();

    let objective: Expression = decisions.values().copied().map(Expression::from).sum();
    let mut model = vars.minimise(objective).using(microlp);
    for &element in universe {
        let covering: Expression = decisions
            .iter()
            .filter(|(id, _)| subsets[*id].contains(&element))
            .map(|(_, var)| Expression::from(*var))
            .sum();
        // An uncoverable element yields `0 >= 1`, which the backend
        // reports as infeasible.
        model = model.with(constraint!(covering >= 1));
    }

    match model.solve() {
        Ok(solution) => {
            let selected: BTreeMap<usize, BTreeSet<usize>> = decisions
                .iter()
                .filter(|(_, var)| solution.value(**var) > 0.5)
                .map(|(&id, _)| (id, subsets[&id].clone()))
                .collect();
            debug!(
                subsets = subsets.len(),
                universe = universe.len(),
                selected = selected.len(),
                "solved set cover"
            );
            selected
        }
        Err(_) => BTreeMap::new(),
    }
}
