use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};
use ivprop::contractors::{box_consistency, DynContractor, Newton, PropagationConfig, Sequence};
use ivprop::core::{Interval, IntervalBox, IntervalMatrix, VarId};
use ivprop::function::{FnFunction, Function};
use ivprop::search::{
    Cell, CellBuffer, CellStack, DoubleHeap, LargestFirst, MaxDiam, MinLb, Solver, SolverConfig, SolverStatus,
};
use ivprop::system::{CmpOp, System};
use std::rc::Rc;
use std::time::Instant;
use tracing::info;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Search {
    /// Depth-first exploration.
    Dfs,
    /// Alternates between the largest cells and the cells with the lowest `x`.
    BestFirst,
}

/// Encloses the points where the circle `x^2 + y^2 = r^2` crosses the line `y = a*x + b`.
#[derive(Debug, Clone, Parser)]
#[command(name = "circle", rename_all = "kebab-case")]
struct Opt {
    /// Radius of the circle.
    #[arg(long, default_value_t = 1.0)]
    radius: f64,
    /// Slope of the line.
    #[arg(long, default_value_t = 1.0)]
    slope: f64,
    /// Intercept of the line.
    #[arg(long, default_value_t = 0.0)]
    intercept: f64,
    /// Boxes narrower than this are reported as solutions.
    #[arg(long, default_value_t = 1e-8)]
    eps_min: f64,
    /// Maximal number of cells to explore.
    #[arg(long)]
    node_limit: Option<u64>,
    #[arg(long, value_enum, default_value = "dfs")]
    search: Search,
    /// Percentage of the cells taken from the second ordering in best-first search.
    /// Defaults to the value of `IVPROP_HEAP_BALANCE`.
    #[arg(long)]
    balance: Option<f64>,
    /// Do not apply the interval Newton operator.
    #[arg(long)]
    no_newton: bool,
    /// Logging level to use: one of "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::Uptime::from(Instant::now()))
        .with_max_level(opt.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    ensure!(opt.radius > 0.0, "the radius must be positive, got {}", opt.radius);

    let (system, x, y) = build_system(&opt)?;
    let propagation = box_consistency(&system, PropagationConfig::default())?;
    let mut contractors = vec![DynContractor::from(propagation)];
    if !opt.no_newton {
        contractors.push(newton(&opt, x, y)?.into());
    }
    let contractor = Sequence::new(contractors);
    let bisector = LargestFirst::new(opt.eps_min / 10.0, 0.45)?;
    let config = SolverConfig {
        eps_min: opt.eps_min,
        node_limit: opt.node_limit,
    };
    let initial = system.initial_box();
    info!("initial box: {initial}");

    match opt.search {
        Search::Dfs => {
            let solver = Solver::new(contractor, bisector, CellStack::new(), config)?;
            run(solver, initial, &system)
        }
        Search::BestFirst => {
            let buffer = match opt.balance {
                Some(balance) => DoubleHeap::<Cell, _, _>::new(MaxDiam, MinLb(x), balance)?,
                None => DoubleHeap::with_default_balance(MaxDiam, MinLb(x))?,
            };
            let solver = Solver::new(contractor, bisector, buffer, config)?;
            run(solver, initial, &system)
        }
    }
}

fn run<B: CellBuffer>(mut solver: Solver<B>, initial: IntervalBox, system: &System) -> Result<()> {
    let status = solver.solve(initial);
    if status != SolverStatus::Complete {
        info!("search incomplete: {status:?}");
    }
    for (i, s) in solver.solutions().iter().enumerate() {
        let names = system.vars().map(|v| format!("{} = {}", system.var_name(v), s[v]));
        println!("solution {}: {}", i + 1, names.collect::<Vec<_>>().join(", "));
    }
    println!("{}", solver.stats);
    Ok(())
}

fn build_system(opt: &Opt) -> Result<(System, VarId, VarId)> {
    let (r, a, b) = (opt.radius, opt.slope, opt.intercept);
    let bound = 2.0 * r;
    let mut system = System::new();
    let x = system.add_var("x", Interval::new(-bound, bound));
    let y = system.add_var("y", Interval::new(-bound, bound));
    system.add_constraint(
        FnFunction::scalar(2, move |d| d[x].sqr() + d[y].sqr() - r * r)
            .with_gradient(move |d| vec![2.0 * d[x], 2.0 * d[y]]),
        CmpOp::Eq,
    )?;
    system.add_constraint(
        FnFunction::scalar(2, move |d| a * d[x] + b - d[y])
            .with_gradient(move |_| vec![Interval::point(a), -Interval::ONE]),
        CmpOp::Eq,
    )?;
    Ok((system, x, y))
}

fn newton(opt: &Opt, x: VarId, y: VarId) -> Result<Newton> {
    let (r, a, b) = (opt.radius, opt.slope, opt.intercept);
    let f = FnFunction::vector(2, 2, move |d| vec![d[x].sqr() + d[y].sqr() - r * r, a * d[x] + b - d[y]]).with_jacobian(
        move |d| {
            IntervalMatrix::from_rows(vec![
                vec![2.0 * d[x], 2.0 * d[y]],
                vec![Interval::point(a), -Interval::ONE],
            ])
        },
    );
    let f: Rc<dyn Function> = Rc::new(f);
    Ok(Newton::new(f)?)
}
