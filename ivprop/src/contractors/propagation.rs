use crate::collections::ref_store::RefVec;
use crate::contractors::{check_not_empty, BoxNarrow, Contractor, Contradiction, DynContractor, Narrowing};
use crate::core::{relative_contraction, Interval, IntervalBox, VarId};
use crate::params::{self, check_ratio, ConfigError};
use crate::system::System;
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use tracing::{debug, instrument, trace};

crate::create_ref_type!(CtcId);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PropagationConfig {
    /// Propagation stops when a whole round contracts the box by less than this ratio.
    pub propag_ratio: f64,
    /// The effects of a contractor call on a variable are only propagated if the variable was contracted by at
    /// least this ratio.
    pub narrow_ratio: f64,
    /// If true, a narrowing only re-triggers the contractors depending on the narrowed variable.
    /// Otherwise, all contractors are retried after each round that brought some progress.
    pub incremental: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig {
            propag_ratio: params::PROPAG_RATIO.get(),
            narrow_ratio: params::NARROW_RATIO.get(),
            incremental: params::INCREMENTAL.get(),
        }
    }
}

impl PropagationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_ratio("propag_ratio", self.propag_ratio)?;
        check_ratio("narrow_ratio", self.narrow_ratio)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PropagationStats {
    pub num_calls: u64,
    /// Number of calls that narrowed the box.
    pub num_narrowings: u64,
    pub num_fixpoints: u64,
    pub num_early_exits: u64,
    pub num_failures: u64,
    /// Number of individual contractor calls.
    pub num_contractor_calls: u64,
}

impl Display for PropagationStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# propagations: {}", self.num_calls)?;
        writeln!(f, "# narrowings: {}", self.num_narrowings)?;
        writeln!(f, "# fixpoints: {}", self.num_fixpoints)?;
        writeln!(f, "# early exits: {}", self.num_early_exits)?;
        writeln!(f, "# failures: {}", self.num_failures)?;
        write!(f, "# contractor calls: {}", self.num_contractor_calls)
    }
}

/// An obligation `(c, k)`: the `k`-th variable in the scope of contractor `c` may be narrowed by `c`.
type Obligation = (CtcId, u32);

/// Fixpoint propagation of a set of contractors.
///
/// The propagation maintains a queue of obligations, each pairing a contractor with one variable of its scope.
/// When a contractor narrows a variable significantly, the contractors depending on the variable are
/// scheduled again.
pub struct Propagation {
    contractors: RefVec<CtcId, DynContractor>,
    scopes: RefVec<CtcId, SmallVec<[VarId; 4]>>,
    projection: RefVec<CtcId, bool>,
    /// Index of the first obligation of each contractor in `pending`.
    offsets: RefVec<CtcId, usize>,
    num_obligations: usize,
    /// For each variable, the contractors having it in their scope, with its position in the scope.
    watches: Vec<SmallVec<[Obligation; 4]>>,
    /// Union of all scopes.
    scope: Vec<VarId>,
    config: PropagationConfig,
    /// Obligations present in `queue` and not yet discharged.
    pending: FixedBitSet,
    queue: VecDeque<Obligation>,
    pub stats: PropagationStats,
}

impl Propagation {
    pub fn new(config: PropagationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Propagation {
            contractors: Default::default(),
            scopes: Default::default(),
            projection: Default::default(),
            offsets: Default::default(),
            num_obligations: 0,
            watches: Vec::new(),
            scope: Vec::new(),
            config,
            pending: FixedBitSet::new(),
            queue: VecDeque::new(),
            stats: Default::default(),
        })
    }

    pub fn with_contractors(
        contractors: impl IntoIterator<Item = DynContractor>,
        config: PropagationConfig,
    ) -> Result<Self, ConfigError> {
        let mut propagation = Self::new(config)?;
        for c in contractors {
            propagation.add(c);
        }
        Ok(propagation)
    }

    pub fn add(&mut self, contractor: impl Into<DynContractor>) -> CtcId {
        let contractor = contractor.into();
        let id = self.contractors.next_key();
        let scope: SmallVec<[VarId; 4]> = contractor.scope().iter().copied().collect();
        for (pos, &v) in scope.iter().enumerate() {
            let i = usize::from(v);
            if self.watches.len() <= i {
                self.watches.resize(i + 1, SmallVec::new());
            }
            self.watches[i].push((id, pos as u32));
            if let Err(place) = self.scope.binary_search(&v) {
                self.scope.insert(place, v);
            }
        }
        self.offsets.push(self.num_obligations);
        self.num_obligations += scope.len();
        self.pending.grow(self.num_obligations);
        self.projection.push(contractor.is_projection());
        self.scopes.push(scope);
        self.contractors.push(contractor)
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    pub fn num_contractors(&self) -> usize {
        self.contractors.len()
    }

    /// Narrows `domains` until a fixpoint is reached, the propagation stops bringing significant
    /// contractions, or the box is proven empty.
    #[instrument(level = "trace", skip_all)]
    pub fn propagate(&mut self, domains: &mut IntervalBox) -> Result<Narrowing, Contradiction> {
        self.stats.num_calls += 1;
        if let Err(contradiction) = check_not_empty(domains) {
            self.stats.num_failures += 1;
            return Err(contradiction);
        }
        let initial = domains.clone();
        let mut checkpoint = domains.clone();

        self.clear_queue();
        self.enqueue_all();
        let round_length = self.queue.len();
        let mut num_pops = 0;
        let mut progress = false;

        loop {
            let Some((ctc, pos)) = self.queue.pop_front() else {
                if !self.config.incremental && progress {
                    // exhaustive mode: retry everything after a round that brought some progress
                    progress = false;
                    self.enqueue_all();
                    continue;
                }
                self.stats.num_fixpoints += 1;
                break;
            };
            let bit = self.offsets[ctc] + pos as usize;
            if !self.pending.contains(bit) {
                // already discharged
                continue;
            }
            self.pending.set(bit, false);

            if let Err(contradiction) = self.run(ctc, pos, domains, &mut progress) {
                debug!("propagation failed on {ctc}");
                self.stats.num_failures += 1;
                self.clear_queue();
                domains.set_empty();
                return Err(contradiction);
            }

            num_pops += 1;
            if num_pops >= round_length && !self.queue.is_empty() {
                num_pops = 0;
                let gain = domains.contraction_from(&checkpoint);
                if gain < self.config.propag_ratio {
                    debug!("propagation stopped early (contraction of the last round: {gain})");
                    self.stats.num_early_exits += 1;
                    break;
                }
                checkpoint.copy_from(domains);
            }
        }
        self.clear_queue();

        if *domains == initial {
            Ok(Narrowing::Unchanged)
        } else {
            self.stats.num_narrowings += 1;
            Ok(Narrowing::Narrowed)
        }
    }

    /// Runs the contractor of an obligation and schedules the consequences of its narrowings.
    fn run(
        &mut self,
        ctc: CtcId,
        pos: u32,
        domains: &mut IntervalBox,
        progress: &mut bool,
    ) -> Result<(), Contradiction> {
        let before: SmallVec<[Interval; 8]> = self.scopes[ctc].iter().map(|&v| domains[v]).collect();
        let target = self.scopes[ctc][pos as usize];
        self.stats.num_contractor_calls += 1;
        if self.projection[ctc] {
            self.contractors[ctc].contract_var(domains, target)?;
        } else {
            self.contractors[ctc].contract(domains)?;
            self.discharge(ctc);
        }
        check_not_empty(domains)?;

        let narrowed: SmallVec<[VarId; 4]> = self.scopes[ctc]
            .iter()
            .zip(&before)
            .filter(|&(&v, &old)| relative_contraction(old, domains[v]) >= self.config.narrow_ratio)
            .map(|(&v, _)| v)
            .collect();
        if !narrowed.is_empty() {
            trace!("{ctc} (target {target}) narrowed {} variable(s)", narrowed.len());
        }
        for v in narrowed {
            if self.config.incremental {
                self.notify(ctc, v);
            } else {
                *progress = true;
            }
        }
        Ok(())
    }

    /// Schedules the obligations that may benefit from the narrowing of `var` by `source`.
    fn notify(&mut self, source: CtcId, var: VarId) {
        for i in 0..self.watches[usize::from(var)].len() {
            let (ctc, pos) = self.watches[usize::from(var)][i];
            let scope_len = self.scopes[ctc].len() as u32;
            if ctc == source {
                // a contractor is never re-triggered by its own output on the same variable
                if self.projection[ctc] {
                    for k in (0..scope_len).filter(|&k| k != pos) {
                        self.enqueue(ctc, k);
                    }
                }
            } else if self.projection[ctc] {
                for k in 0..scope_len {
                    self.enqueue(ctc, k);
                }
            } else {
                self.enqueue(ctc, pos);
            }
        }
    }

    fn enqueue(&mut self, ctc: CtcId, pos: u32) {
        let bit = self.offsets[ctc] + pos as usize;
        if !self.pending.contains(bit) {
            self.pending.insert(bit);
            self.queue.push_back((ctc, pos));
        }
    }

    fn enqueue_all(&mut self) {
        for i in 0..self.contractors.len() {
            let ctc = CtcId::from(i);
            for pos in 0..self.scopes[ctc].len() as u32 {
                self.enqueue(ctc, pos);
            }
        }
    }

    /// Discharges all pending obligations of a contractor that narrows its whole scope at once.
    fn discharge(&mut self, ctc: CtcId) {
        let start = self.offsets[ctc];
        self.pending.set_range(start..start + self.scopes[ctc].len(), false);
    }

    fn clear_queue(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }
}

impl Contractor for Propagation {
    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction> {
        self.propagate(domains).map(|_| ())
    }
}

/// Box consistency on all constraints of a system: propagation of one [`BoxNarrow`] contractor per constraint.
pub fn box_consistency(system: &System, config: PropagationConfig) -> Result<Propagation, ConfigError> {
    let mut propagation = Propagation::new(config)?;
    for constraint in system.constraints() {
        propagation.add(BoxNarrow::new(constraint.clone(), config.narrow_ratio)?);
    }
    Ok(propagation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contractors::{Linear, LinearTerm};

    fn var(i: usize) -> VarId {
        VarId::from(i)
    }

    fn config(incremental: bool) -> PropagationConfig {
        PropagationConfig {
            propag_ratio: 1e-9,
            narrow_ratio: 0.1,
            incremental,
        }
    }

    /// x + y = 10, x - y = 2
    fn sum_and_difference(config: PropagationConfig) -> Propagation {
        let (x, y) = (var(0), var(1));
        Propagation::with_contractors(
            [
                Linear::eq([LinearTerm::new(1.0, x), LinearTerm::new(1.0, y)], 10.0).into(),
                Linear::eq([LinearTerm::new(1.0, x), LinearTerm::new(-1.0, y)], 2.0).into(),
            ],
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_fixpoint() {
        for incremental in [true, false] {
            let mut p = sum_and_difference(config(incremental));
            let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 10.0)]);
            assert_eq!(p.propagate(&mut d), Ok(Narrowing::Narrowed));
            assert_eq!(d, IntervalBox::from_bounds(&[(2.0, 10.0), (0.0, 8.0)]));
            // idempotent
            assert_eq!(p.propagate(&mut d), Ok(Narrowing::Unchanged));
            assert_eq!(p.stats.num_fixpoints, 2);
            assert_eq!(p.stats.num_narrowings, 1);
        }
    }

    #[test]
    fn test_failure() {
        let mut p = sum_and_difference(config(true));
        let mut d = IntervalBox::from_bounds(&[(0.0, 3.0), (0.0, 10.0)]);
        assert!(p.propagate(&mut d).is_err());
        assert!(d.is_empty());
        assert_eq!(p.stats.num_failures, 1);

        // the engine is left in a clean state
        let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 10.0)]);
        assert_eq!(p.propagate(&mut d), Ok(Narrowing::Narrowed));
    }

    /// x = y, x = y / 2 + 1: each round halves the domains around the solution (2, 2)
    fn slow(config: PropagationConfig) -> Propagation {
        let (x, y) = (var(0), var(1));
        Propagation::with_contractors(
            [
                Linear::eq([LinearTerm::new(1.0, x), LinearTerm::new(-1.0, y)], 0.0).into(),
                Linear::eq([LinearTerm::new(1.0, x), LinearTerm::new(-0.5, y)], 1.0).into(),
            ],
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_early_exit() {
        let mut p = slow(PropagationConfig {
            propag_ratio: 0.9,
            ..config(true)
        });
        let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 4.0)]);
        assert_eq!(p.propagate(&mut d), Ok(Narrowing::Narrowed));
        assert_eq!(p.stats.num_early_exits, 1);
        assert_eq!(d, IntervalBox::from_bounds(&[(1.0, 3.0), (0.0, 4.0)]));

        for incremental in [true, false] {
            let mut p = slow(config(incremental));
            let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 4.0)]);
            assert_eq!(p.propagate(&mut d), Ok(Narrowing::Narrowed));
            assert!(d.contains_point(&[2.0, 2.0]));
            assert!(d.max_diam() < 1e-9, "{d}");
        }
    }

    #[test]
    fn test_whole_scope_contractors() {
        // a propagation used as a contractor inside another one
        let inner = slow(config(true));
        let mut outer = Propagation::with_contractors([inner.into()], config(true)).unwrap();
        assert_eq!(outer.scope(), &[var(0), var(1)]);
        let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 4.0)]);
        outer.contract(&mut d).unwrap();
        assert!(d.max_diam() < 1e-9);
        // both obligations of the inner propagation are discharged by a single call
        assert_eq!(outer.stats.num_contractor_calls, 1);
    }

    #[test]
    fn test_invalid_config() {
        let bad = PropagationConfig {
            narrow_ratio: 0.0,
            ..config(true)
        };
        assert!(Propagation::new(bad).is_err());
    }
}
