use crate::contractors::DynContractor;
use crate::core::IntervalBox;
use crate::params::{check_positive, ConfigError};
use crate::search::{Bisector, Cell, CellBuffer};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Cells whose boxes are not wider than `eps_min` are not split any further and are reported as solutions.
    pub eps_min: f64,
    /// Maximal number of cells to process, unlimited if `None`.
    pub node_limit: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            eps_min: 1e-8,
            node_limit: None,
        }
    }
}

/// Reason for which a search ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SolverStatus {
    /// The whole search space was explored.
    Complete,
    /// The node limit was reached before the end of the search.
    NodeLimit,
    /// The search was interrupted through its interrupt handle.
    Interrupted,
}

#[derive(Clone, Debug, Default)]
pub struct SolverStats {
    pub num_nodes: u64,
    /// Number of cells proven to contain no solution.
    pub num_failures: u64,
    pub num_splits: u64,
    pub num_solutions: u64,
    pub max_depth: u32,
    pub solve_time: Duration,
}

impl Display for SolverStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# nodes: {}", self.num_nodes)?;
        writeln!(f, "# failures: {}", self.num_failures)?;
        writeln!(f, "# splits: {}", self.num_splits)?;
        writeln!(f, "# solutions: {}", self.num_solutions)?;
        writeln!(f, "max depth: {}", self.max_depth)?;
        write!(f, "solve time: {:.6} s", self.solve_time.as_secs_f64())
    }
}

/// Branch-and-prune search: cells are taken from a buffer, contracted, and either discarded (empty),
/// reported as solutions (small enough) or split in two.
pub struct Solver<B> {
    contractor: DynContractor,
    bisector: Box<dyn Bisector>,
    buffer: B,
    config: SolverConfig,
    interrupt: Arc<AtomicBool>,
    next_id: u64,
    solutions: Vec<IntervalBox>,
    pub stats: SolverStats,
}

impl<B: CellBuffer> Solver<B> {
    pub fn new(
        contractor: impl Into<DynContractor>,
        bisector: impl Bisector + 'static,
        buffer: B,
        config: SolverConfig,
    ) -> Result<Self, ConfigError> {
        check_positive("eps_min", config.eps_min)?;
        Ok(Solver {
            contractor: contractor.into(),
            bisector: Box::new(bisector),
            buffer,
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
            next_id: 0,
            solutions: Vec::new(),
            stats: Default::default(),
        })
    }

    /// A flag that interrupts the search when set. It is checked between two cells.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub fn solutions(&self) -> &[IntervalBox] {
        &self.solutions
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Explores `initial` from scratch.
    pub fn solve(&mut self, initial: IntervalBox) -> SolverStatus {
        self.buffer.flush();
        self.solutions.clear();
        self.stats = Default::default();
        self.next_id = 1;
        self.buffer.push(Cell::root(initial));
        self.resume()
    }

    /// Continues the exploration of the cells left in the buffer by a previous interrupted search.
    #[instrument(level = "trace", skip_all)]
    pub fn resume(&mut self) -> SolverStatus {
        let start = Instant::now();
        let status = loop {
            if self.interrupt.swap(false, Ordering::AcqRel) {
                break SolverStatus::Interrupted;
            }
            if self.config.node_limit.is_some_and(|limit| self.stats.num_nodes >= limit) {
                break SolverStatus::NodeLimit;
            }
            let Some(cell) = self.buffer.pop() else {
                break SolverStatus::Complete;
            };
            self.process(cell);
        };
        self.stats.solve_time += start.elapsed();
        info!(
            "search ended ({status:?}): {} solution(s), {} node(s), {} cell(s) left",
            self.solutions.len(),
            self.stats.num_nodes,
            self.buffer.len()
        );
        status
    }

    fn process(&mut self, mut cell: Cell) {
        self.stats.num_nodes += 1;
        self.stats.max_depth = self.stats.max_depth.max(cell.depth);
        if self.contractor.contract(&mut cell.domains).is_err() {
            trace!("cell #{} is infeasible", cell.id);
            self.stats.num_failures += 1;
            return;
        }
        if cell.domains.max_diam() <= self.config.eps_min {
            self.add_solution(cell);
            return;
        }
        match self.bisector.bisect(&cell) {
            Some((var, left, right)) => {
                self.stats.num_splits += 1;
                let left = cell.child(left, var, self.fresh_id());
                let right = cell.child(right, var, self.fresh_id());
                self.buffer.push(left);
                self.buffer.push(right);
            }
            None => {
                // no domain is both wider than the precision of the bisector and splittable
                self.add_solution(cell);
            }
        }
    }

    fn add_solution(&mut self, cell: Cell) {
        debug!("solution: {cell}");
        self.stats.num_solutions += 1;
        self.solutions.push(cell.domains);
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
