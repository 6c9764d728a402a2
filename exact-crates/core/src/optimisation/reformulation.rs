use log::debug;
use num::BigInt;
use num::One;
use num::Signed;
use num::Zero;

use super::CoreEncoding;
use super::Objective;
use crate::basic_types::Lit;
use crate::basic_types::Origin;
use crate::constraints::ConstrSimple;
use crate::containers::HashMap;
use crate::engine::Solver;
use crate::proof::ProofId;

/// The counting variables of one core `Σ lits >= degree`: the `j`-th introduced variable is true
/// exactly when at least `degree + j` of the literals are true.
#[derive(Clone, Debug)]
struct CountingVariables {
    lits: Vec<Lit>,
    degree: usize,
    weight: BigInt,
    introduced: Vec<Lit>,
    /// The proof line of `~y -> Σ lits <= degree + j - 1` for the last introduced `y`
    last_upper_definition: ProofId,
}

impl CountingVariables {
    fn capacity(&self) -> usize {
        self.lits.len() - self.degree
    }
}

/// The objective as reformulated by cores: `lower_bound + Σ weight(l) * l` plus terms which are
/// zero whenever every literal with a weight is false.
#[derive(Clone, Debug)]
pub(crate) struct Reformulation {
    weights: HashMap<Lit, BigInt>,
    lower_bound: BigInt,
    counters: Vec<CountingVariables>,
    encoding: CoreEncoding,
}

impl Reformulation {
    pub(crate) fn new(objective: &Objective, encoding: CoreEncoding) -> Reformulation {
        Reformulation {
            weights: objective
                .terms()
                .iter()
                .map(|term| (term.lit, term.coefficient.clone()))
                .collect(),
            lower_bound: objective.constant().clone(),
            counters: vec![],
            encoding,
        }
    }

    pub(crate) fn lower_bound(&self) -> &BigInt {
        &self.lower_bound
    }

    #[cfg(test)]
    pub(crate) fn weight(&self, lit: Lit) -> Option<&BigInt> {
        self.weights.get(&lit)
    }

    #[cfg(test)]
    pub(crate) fn num_lits(&self) -> usize {
        self.weights.len()
    }

    pub(crate) fn max_weight(&self) -> Option<BigInt> {
        self.weights.values().max().cloned()
    }

    /// The largest weight below `threshold`.
    pub(crate) fn next_threshold(&self, threshold: &BigInt) -> Option<BigInt> {
        self.weights
            .values()
            .filter(|&weight| weight < threshold)
            .max()
            .cloned()
    }

    /// Whether every literal with a weight is assumed false under `threshold`.
    pub(crate) fn all_assumed(&self, threshold: Option<&BigInt>) -> bool {
        threshold.is_none_or(|threshold| self.weights.values().all(|weight| weight >= threshold))
    }

    /// The negations of the literals whose weight reaches `threshold`, heaviest first.
    pub(crate) fn assumptions(&self, threshold: Option<&BigInt>) -> Vec<Lit> {
        let mut assumed = self
            .weights
            .iter()
            .filter(|(_, weight)| threshold.is_none_or(|threshold| *weight >= threshold))
            .collect::<Vec<_>>();
        assumed.sort_by(|(lit_a, weight_a), (lit_b, weight_b)| {
            weight_b.cmp(weight_a).then(lit_a.cmp(lit_b))
        });
        assumed.into_iter().map(|(&lit, _)| !lit).collect()
    }

    /// Removes the literals which are fixed at the root, moving the weight of the true ones into
    /// the lower bound. Returns whether anything changed.
    pub(crate) fn fold_root_assignments(&mut self, solver: &mut Solver) -> bool {
        let fixed = self
            .weights
            .keys()
            .filter_map(|&lit| solver.root_value(lit).map(|value| (lit, value)))
            .collect::<Vec<_>>();
        if fixed.is_empty() {
            return false;
        }

        for (lit, value) in fixed {
            if let Some(weight) = self.weights.remove(&lit) {
                if value {
                    self.lower_bound += weight;
                }
            }
        }
        let _ = self.extend_exhausted_counters(solver);
        true
    }

    /// Reformulates the objective with a core over objective literals. Returns the number of
    /// counting variables which were introduced, or `None` if the core contributed nothing.
    pub(crate) fn process_core(
        &mut self,
        core: &ConstrSimple<BigInt>,
        solver: &mut Solver,
    ) -> Option<usize> {
        let mut terms = core
            .terms
            .iter()
            .filter(|term| term.coefficient.is_positive() && self.weights.contains_key(&term.lit))
            .collect::<Vec<_>>();
        terms.sort_by(|a, b| b.coefficient.cmp(&a.coefficient));

        // the fewest literals which can satisfy the core, which is the degree of the implied
        // cardinality constraint
        let mut sum = BigInt::zero();
        let mut degree = 0;
        for term in &terms {
            if sum >= core.rhs {
                break;
            }
            sum += &term.coefficient;
            degree += 1;
        }
        if degree == 0 {
            return None;
        }

        let mut lits = terms.iter().map(|term| term.lit).collect::<Vec<_>>();
        lits.sort();
        let weight = lits
            .iter()
            .filter_map(|lit| self.weights.get(lit))
            .min()
            .cloned()?;

        for lit in &lits {
            if let Some(current) = self.weights.get_mut(lit) {
                *current -= &weight;
                if current.is_zero() {
                    let _ = self.weights.remove(lit);
                }
            }
        }
        self.lower_bound += &weight * BigInt::from(degree);
        debug!(
            "Core of {} literals with degree {degree} and weight {weight}, lower bound {}",
            lits.len(),
            self.lower_bound
        );

        let mut num_introduced = 0;
        if lits.len() > degree {
            let mut counter = CountingVariables {
                lits,
                degree,
                weight,
                introduced: vec![],
                last_upper_definition: ProofId::UNDEF,
            };
            let count = match self.encoding {
                CoreEncoding::Sum => counter.capacity(),
                CoreEncoding::Lazy | CoreEncoding::Reified => 1,
            };
            for _ in 0..count {
                self.introduce_counting_variable(&mut counter, solver);
            }
            num_introduced += count;
            self.counters.push(counter);
        }
        num_introduced += self.extend_exhausted_counters(solver);
        Some(num_introduced)
    }

    /// Introduces the next counting variable of every lazy counter whose last variable has no
    /// weight left.
    fn extend_exhausted_counters(&mut self, solver: &mut Solver) -> usize {
        if self.encoding != CoreEncoding::Lazy {
            return 0;
        }

        let mut counters = std::mem::take(&mut self.counters);
        let mut num_introduced = 0;
        for counter in &mut counters {
            let Some(&last) = counter.introduced.last() else {
                continue;
            };
            if counter.introduced.len() < counter.capacity()
                && !self.weights.contains_key(&last)
                && solver.root_value(last) != Some(false)
            {
                self.introduce_counting_variable(counter, solver);
                num_introduced += 1;
            }
        }
        self.counters = counters;
        num_introduced
    }

    fn introduce_counting_variable(&mut self, counter: &mut CountingVariables, solver: &mut Solver) {
        let y = solver.new_variable().positive();
        solver.freeze(y.var());

        let num_lits = counter.lits.len();
        let at_least = counter.degree + counter.introduced.len() + 1;
        let slack = num_lits - at_least + 1;

        // y -> Σ lits >= at_least
        let lower_definition = ConstrSimple::new(
            counter
                .lits
                .iter()
                .map(|&lit| (BigInt::one(), lit))
                .chain([(BigInt::from(at_least), !y)]),
            BigInt::from(at_least),
        );
        let (lower_id, _) =
            solver.add_redundant_constraint(&lower_definition, &[!y], Origin::CoreGuided);

        // ~y -> Σ lits <= at_least - 1
        let upper_definition = ConstrSimple::new(
            counter
                .lits
                .iter()
                .map(|&lit| (BigInt::one(), !lit))
                .chain([(BigInt::from(slack), y)]),
            BigInt::from(slack),
        );
        let (upper_id, _) =
            solver.add_redundant_constraint(&upper_definition, &[y], Origin::CoreGuided);

        if let Some(&previous) = counter.introduced.last() {
            let divisor = at_least.max(slack + 1);
            let derivation = format!("{lower_id} {} + {divisor} d", counter.last_upper_definition);
            let _ = solver.add_derived_constraint(
                &ConstrSimple::<BigInt>::clause([!y, previous]),
                &derivation,
                Origin::CoreGuided,
            );
        }

        counter.introduced.push(y);
        counter.last_upper_definition = upper_id;
        let _ = self.weights.insert(y, counter.weight.clone());
    }
}
