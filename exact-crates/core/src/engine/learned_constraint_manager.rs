use log::debug;

use super::ConstraintDatabase;
use super::Trail;
use super::UNASSIGNED;
use crate::basic_types::CRef;
use crate::basic_types::OptionError;
use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::proof::ProofLog;

/// Options related to learned constraint management, i.e., how and when to remove learned
/// constraints from the database.
#[derive(Debug, Copy, Clone)]
pub struct LearningOptions {
    /// Determines when to rescale the activites of the learned constraints in the database.
    pub max_activity: f32,
    /// Determines the factor by which the activities are divided when a conflict is found.
    pub activity_decay_factor: f32,
    /// The maximum number of learned constraints with an LBD above
    /// [`LearningOptions::lbd_threshold`]; exceeding it triggers a reduction.
    pub limit_high_lbd_constraints: usize,
    /// Learned constraints with an LBD of at most this value are never removed.
    pub lbd_threshold: u32,
    /// The order in which high-LBD constraints are considered for removal.
    pub sorting_strategy: LearnedConstraintSortingStrategy,
}

impl Default for LearningOptions {
    fn default() -> Self {
        Self {
            max_activity: 1e20,
            activity_decay_factor: 0.99,
            limit_high_lbd_constraints: 4000,
            lbd_threshold: 5,
            sorting_strategy: LearnedConstraintSortingStrategy::Activity,
        }
    }
}

impl LearningOptions {
    pub fn validate(&self) -> Result<(), OptionError> {
        if !(self.activity_decay_factor > 0.0 && self.activity_decay_factor <= 1.0) {
            return Err(OptionError::out_of_range(
                "learning-activity-decay",
                "(0, 1]",
                self.activity_decay_factor,
            ));
        }
        if self.max_activity <= 1.0 {
            return Err(OptionError::out_of_range(
                "learning-max-activity",
                "(1, inf)",
                self.max_activity,
            ));
        }
        if self.limit_high_lbd_constraints == 0 {
            return Err(OptionError::out_of_range(
                "learning-max-high-lbd",
                "[1, inf)",
                self.limit_high_lbd_constraints,
            ));
        }
        Ok(())
    }
}

/// The sorting strategy which is used when considering removal from the constraint database.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LearnedConstraintSortingStrategy {
    /// Sorts based on the activity, the activity is bumped when a constraint is encountered
    /// during conflict analysis.
    #[default]
    Activity,
    /// Sorts based on the literal block distance (LBD), ties are broken by activity.
    Lbd,
}

/// Keeps the learned constraints in two tiers by LBD. Constraints in the low tier are kept
/// forever; the high tier is halved whenever it exceeds its limit.
#[derive(Debug)]
pub(crate) struct LearnedConstraintManager {
    low_lbd: Vec<CRef>,
    high_lbd: Vec<CRef>,
    options: LearningOptions,
    bump_increment: f32,
}

impl LearnedConstraintManager {
    pub(crate) fn new(options: LearningOptions) -> Self {
        LearnedConstraintManager {
            low_lbd: vec![],
            high_lbd: vec![],
            options,
            bump_increment: 1.0,
        }
    }

    pub(crate) fn num_learned(&self) -> usize {
        self.low_lbd.len() + self.high_lbd.len()
    }

    pub(crate) fn add(&mut self, cref: CRef, lbd: u32) {
        if lbd <= self.options.lbd_threshold {
            self.low_lbd.push(cref);
        } else {
            self.high_lbd.push(cref);
        }
    }

    /// Bumps the activity of a high-LBD constraint which took part in a conflict, and lowers its
    /// LBD if it is now smaller.
    pub(crate) fn on_conflict_participation(
        &mut self,
        cref: CRef,
        database: &mut ConstraintDatabase,
        trail: &Trail,
    ) {
        let header = database.header(cref);
        if !header.origin.is_learned() || header.lbd <= self.options.lbd_threshold {
            return;
        }
        self.bump_activity(cref, database);

        let lbd = database
            .lits(cref)
            .iter()
            .map(|&lit| trail.assignment_level(lit))
            .filter(|&level| level > 0 && level != UNASSIGNED)
            .collect::<HashSet<_>>()
            .len() as u32;
        let header = database.header_mut(cref);
        if lbd < header.lbd {
            header.lbd = lbd;
            // an improved constraint gets another chance
            header.protected = true;
        }
    }

    fn bump_activity(&mut self, cref: CRef, database: &mut ConstraintDatabase) {
        // check if bumping the activity would lead to a large activity value
        if database.header(cref).activity + self.bump_increment > self.options.max_activity {
            self.rescale_activities(database);
        }
        database.header_mut(cref).activity += self.bump_increment;
    }

    fn rescale_activities(&mut self, database: &mut ConstraintDatabase) {
        for &cref in &self.high_lbd {
            database.header_mut(cref).activity /= self.options.max_activity;
        }
        self.bump_increment /= self.options.max_activity;
    }

    pub(crate) fn decay_activities(&mut self) {
        self.bump_increment /= self.options.activity_decay_factor;
    }

    pub(crate) fn should_reduce(&self) -> bool {
        self.high_lbd.len() > self.options.limit_high_lbd_constraints
    }

    /// Removes roughly half of the high-LBD constraints, the worst first. Constraints which are
    /// the reason of a literal on the trail are kept, as are protected constraints, whose
    /// protection is cleared. Returns the number of removed constraints.
    pub(crate) fn reduce(
        &mut self,
        database: &mut ConstraintDatabase,
        trail: &Trail,
        proof_log: &mut ProofLog,
    ) -> usize {
        self.promote_high_lbd_constraints(database);
        self.sort_high_lbd_by_quality_decreasing(database);

        let mut num_to_remove = self
            .high_lbd
            .len()
            .saturating_sub(self.options.limit_high_lbd_constraints / 2);
        let mut num_removed = 0;
        // poor constraints are at the back
        for &cref in self.high_lbd.iter().rev() {
            if num_to_remove == 0 {
                break;
            }
            let header = database.header_mut(cref);
            if header.protected {
                header.protected = false;
                continue;
            }
            if header.locked || database.is_reason(cref, trail) {
                continue;
            }
            database.remove(cref, proof_log);
            num_to_remove -= 1;
            num_removed += 1;
        }

        self.high_lbd.retain(|&cref| !database.header(cref).removed);
        debug!(
            "Removed {num_removed} learned constraints, {} remain",
            self.num_learned()
        );
        num_removed
    }

    fn promote_high_lbd_constraints(&mut self, database: &ConstraintDatabase) {
        let threshold = self.options.lbd_threshold;
        let (promoted, kept): (Vec<_>, Vec<_>) = self
            .high_lbd
            .iter()
            .copied()
            .partition(|&cref| database.header(cref).lbd <= threshold);
        self.low_lbd.extend(promoted);
        self.high_lbd = kept;
    }

    fn sort_high_lbd_by_quality_decreasing(&mut self, database: &ConstraintDatabase) {
        let strategy = self.options.sorting_strategy;
        self.high_lbd.sort_unstable_by(|&first, &second| {
            let first = database.header(first);
            let second = database.header(second);
            // a higher activity is better, so the arguments are reversed
            let by_activity = second.activity.total_cmp(&first.activity);
            match strategy {
                LearnedConstraintSortingStrategy::Activity => by_activity,
                LearnedConstraintSortingStrategy::Lbd => {
                    first.lbd.cmp(&second.lbd).then(by_activity)
                }
            }
        });
    }

    /// Drops constraints which were removed by other means, e.g. root simplification.
    pub(crate) fn forget_removed(&mut self, database: &ConstraintDatabase) {
        self.low_lbd.retain(|&cref| !database.header(cref).removed);
        self.high_lbd.retain(|&cref| !database.header(cref).removed);
    }

    /// Applies the relocation of a garbage collection.
    pub(crate) fn relocate(&mut self, relocation: &KeyedVec<CRef, CRef>) {
        for tier in [&mut self.low_lbd, &mut self.high_lbd] {
            tier.retain_mut(|cref| {
                *cref = relocation[*cref];
                !cref.is_undef()
            });
        }
    }

    /// Replaces a constraint by a simplified copy.
    pub(crate) fn replace(&mut self, old: CRef, new: CRef) {
        for tier in [&mut self.low_lbd, &mut self.high_lbd] {
            if let Some(cref) = tier.iter_mut().find(|cref| **cref == old) {
                *cref = new;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Lit;
    use crate::basic_types::Origin;
    use crate::constraints::ConstrExpPools;
    use crate::constraints::ConstrSimple;
    use crate::engine::ConstraintHeader;
    use crate::proof::ProofId;

    fn learn(
        database: &mut ConstraintDatabase,
        trail: &Trail,
        pools: &ConstrExpPools,
        lits: [i32; 3],
        lbd: u32,
    ) -> CRef {
        let constraint = ConstrSimple::<i64>::clause(lits.map(Lit::from_dimacs));
        let ce = pools.take_from_simple(&constraint, Origin::Learned);
        database.store(
            &ce,
            ConstraintHeader::new(ProofId::UNDEF, Origin::Learned, lbd, false),
            trail,
            0.7,
        )
    }

    #[test]
    fn reduction_removes_the_least_active_half() {
        let mut database = ConstraintDatabase::default();
        database.grow(3);
        let mut trail = Trail::default();
        trail.grow(3);
        let pools = ConstrExpPools::default();
        pools.resize(3);
        let mut proof = ProofLog::default();

        let mut manager = LearnedConstraintManager::new(LearningOptions {
            limit_high_lbd_constraints: 2,
            lbd_threshold: 2,
            ..Default::default()
        });

        let low = learn(&mut database, &trail, &pools, [1, 2, 3], 2);
        manager.add(low, 2);
        let high = (0..3)
            .map(|_| {
                let cref = learn(&mut database, &trail, &pools, [-1, 2, 3], 6);
                manager.add(cref, 6);
                cref
            })
            .collect::<Vec<_>>();
        assert!(manager.should_reduce());

        database.header_mut(high[0]).activity = 3.0;
        database.header_mut(high[2]).activity = 2.0;

        let removed = manager.reduce(&mut database, &trail, &mut proof);
        assert_eq!(removed, 2);
        assert!(!database.header(high[0]).removed);
        assert!(database.header(high[1]).removed);
        assert!(database.header(high[2]).removed);
        assert!(!database.header(low).removed);
        assert!(!manager.should_reduce());
    }

    #[test]
    fn protected_constraints_survive_one_reduction() {
        let mut database = ConstraintDatabase::default();
        database.grow(3);
        let mut trail = Trail::default();
        trail.grow(3);
        let pools = ConstrExpPools::default();
        pools.resize(3);
        let mut proof = ProofLog::default();

        let mut manager = LearnedConstraintManager::new(LearningOptions {
            limit_high_lbd_constraints: 2,
            lbd_threshold: 2,
            ..Default::default()
        });
        let first = learn(&mut database, &trail, &pools, [1, 2, 3], 6);
        manager.add(first, 6);
        let second = learn(&mut database, &trail, &pools, [1, -2, 3], 6);
        manager.add(second, 6);
        database.header_mut(first).protected = true;
        database.header_mut(second).protected = true;

        assert_eq!(manager.reduce(&mut database, &trail, &mut proof), 0);
        assert!(!database.header(first).protected);
        assert_eq!(manager.reduce(&mut database, &trail, &mut proof), 1);
    }
}
