pub mod capability;
pub mod config;
pub mod error;
pub mod item;
pub mod pool;
pub mod problem;
pub mod resolver;
pub mod solver;

pub use capability::{Capability, CapabilitySet, Dep, Dependencies};
pub use config::{ConfigLoader, OnlyRequires, ResolverConfig};
pub use error::{ResolverError, Result};
pub use item::{Arch, Kind, ResStatus, Resolvable, Transact, TransactBy};
pub use pool::{ItemId, PoolItem, ResPool, SerialWatcher};
pub use problem::{ProblemSolution, ResolverProblem, SolutionAction};
pub use resolver::{AdapterFactory, IgnoreRules, Resolver, UpgradeStatistics};
pub use solver::{
    Operation, SatResolver, Solution, SolveJob, SolveMode, SolveOutcome, SolverAdapter, Transaction,
};
pub use tangle_edition::{Edition, Range, Rel};
