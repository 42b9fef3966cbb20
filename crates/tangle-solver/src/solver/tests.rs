//! Scenario tests for the SAT adapter
//!
//! Each test builds a pool, marks user transactions and checks either the
//! resulting transaction or the problems reported.

use super::*;
use crate::capability::Capability;
use crate::item::{Resolvable, TransactBy};
use crate::pool::PoolItem;
use crate::problem::SolutionAction;
use tangle_edition::Edition;

fn pkg(name: &str, version: &str) -> Resolvable {
    Resolvable::package(name, Edition::parse(version).unwrap())
}

fn cap(s: &str) -> Capability {
    Capability::parse(s).unwrap()
}

struct Fixture {
    pool: ResPool,
    extra_requires: CapabilitySet,
    extra_conflicts: CapabilitySet,
    ignore: IgnoreRules,
    config: ResolverConfig,
    previous: BTreeMap<ItemId, Transact>,
    force_resolve: bool,
    only_requires: bool,
}

impl Fixture {
    fn new() -> Self {
        Self {
            pool: ResPool::new(),
            extra_requires: CapabilitySet::new(),
            extra_conflicts: CapabilitySet::new(),
            ignore: IgnoreRules::default(),
            config: ResolverConfig::default().with_system_arch("x86_64"),
            previous: BTreeMap::new(),
            force_resolve: false,
            only_requires: false,
        }
    }

    fn solve(&self, mode: SolveMode) -> SolveOutcome {
        let job = SolveJob {
            pool: &self.pool,
            mode,
            extra_requires: &self.extra_requires,
            extra_conflicts: &self.extra_conflicts,
            ignore: &self.ignore,
            only_requires: self.only_requires,
            force_resolve: self.force_resolve,
            config: &self.config,
            previous: &self.previous,
        };
        SatResolver::new(&self.pool).solve(&job).unwrap()
    }

    fn problems(&self, mode: SolveMode) -> Vec<ResolverProblem> {
        match self.solve(mode) {
            SolveOutcome::Unsolvable(problems) => problems,
            SolveOutcome::Solved(solution) => panic!("expected problems, got {:?}", solution),
        }
    }
}

/// Check the operations of a successful solve as (job, name, version) triples
fn check_solver_result(fx: &Fixture, mode: SolveMode, expected: Vec<(&str, &str, &str)>) {
    let solution = match fx.solve(mode) {
        SolveOutcome::Solved(solution) => solution,
        SolveOutcome::Unsolvable(problems) => {
            panic!("expected a solution, got {}", crate::problem::describe_problems(&problems))
        }
    };
    let transaction = Transaction::from_solution(&fx.pool, &solution);

    let actual: Vec<(String, String, String)> = transaction
        .operations
        .iter()
        .map(|op| match op {
            Operation::Install(item) => ("install".to_string(), item.name().to_string(), item.edition().to_string()),
            Operation::Update { from, to } => (
                "update".to_string(),
                to.name().to_string(),
                format!("{} -> {}", from.edition(), to.edition()),
            ),
            Operation::Uninstall(item) => ("remove".to_string(), item.name().to_string(), item.edition().to_string()),
        })
        .collect();

    let expected: Vec<(String, String, String)> = expected
        .into_iter()
        .map(|(job, name, version)| (job.to_string(), name.to_string(), version.to_string()))
        .collect();

    assert_eq!(actual, expected);
}

fn install(item: &PoolItem) {
    item.set_transact(Transact::Install, TransactBy::User);
}

#[test]
fn test_solver_install_single() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0"));
    install(&a);

    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "a", "1.0")]);
}

#[test]
fn test_solver_nothing_to_do() {
    let fx = Fixture::new();
    fx.pool.add_installed(pkg("a", "1.0"));
    fx.pool.add_available(pkg("a", "2.0"));

    check_solver_result(&fx, SolveMode::Resolve, vec![]);
}

#[test]
fn test_solver_install_with_deps() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b >= 1")));
    fx.pool.add_available(pkg("b", "1.0"));
    fx.pool.add_available(pkg("unrelated", "1.0"));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "b", "1.0")],
    );
}

#[test]
fn test_solver_prefer_highest() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b")));
    fx.pool.add_available(pkg("b", "1.0"));
    fx.pool.add_available(pkg("b", "2.0"));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "b", "2.0")],
    );
}

#[test]
fn test_solver_provides_satisfy_requires() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("libx >= 2")));
    fx.pool.add_available(pkg("libx-old", "1.0").provides(cap("libx = 1")));
    fx.pool.add_available(pkg("libx-new", "1.0").provides(cap("libx = 2")));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "libx-new", "1.0")],
    );
}

#[test]
fn test_solver_update_single() {
    let fx = Fixture::new();
    fx.pool.add_installed(pkg("a", "1.0"));
    let new = fx.pool.add_available(pkg("a", "2.0"));
    install(&new);

    check_solver_result(&fx, SolveMode::Resolve, vec![("update", "a", "1.0 -> 2.0")]);
}

#[test]
fn test_solver_pick_older_if_newer_conflicts() {
    let fx = Fixture::new();
    fx.pool.add_installed(pkg("c", "1.0"));
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b")));
    fx.pool.add_available(pkg("b", "1.0"));
    fx.pool.add_available(pkg("b", "2.0").conflicts(cap("c")));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "b", "1.0")],
    );
}

#[test]
fn test_solver_avoids_provider_with_conflicting_dependency() {
    let fx = Fixture::new();
    fx.pool.add_installed(pkg("d", "1.0"));
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b")));
    fx.pool.add_available(pkg("b", "2.0").requires(cap("c")));
    fx.pool.add_available(pkg("b", "1.0"));
    fx.pool.add_available(pkg("c", "1.0").conflicts(cap("d")));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "b", "1.0")],
    );
}

#[test]
fn test_solver_remove_job() {
    let fx = Fixture::new();
    let a = fx.pool.add_installed(pkg("a", "1.0"));
    fx.pool.add_installed(pkg("b", "1.0").requires(cap("a")));
    a.set_transact(Transact::Remove, TransactBy::User);

    let problems = fx.problems(SolveMode::Resolve);
    assert_eq!(problems.len(), 1);
    assert!(problems[0].mentions("b-1.0.noarch requires a"));
    let actions: Vec<_> = problems[0].solutions.iter().flat_map(|s| s.actions.clone()).collect();
    assert!(actions.contains(&SolutionAction::KeepItem(a.id())));
}

#[test]
fn test_solver_obsoletes_replace_installed() {
    let fx = Fixture::new();
    fx.pool.add_installed(pkg("old", "1.0"));
    let new = fx.pool.add_available(pkg("new", "1.0").obsoletes(cap("old")));
    install(&new);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("remove", "old", "1.0"), ("install", "new", "1.0")],
    );
}

#[test]
fn test_install_non_existing_requirement_fails() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("libx")));
    install(&a);

    let problems = fx.problems(SolveMode::Resolve);
    assert_eq!(problems.len(), 1);

    let problem = &problems[0];
    assert_eq!(problem.description, "nothing provides libx needed by a-1.0.noarch");
    assert_eq!(problem.items, vec![a.id()]);
    let actions: Vec<_> = problem.solutions.iter().map(|s| s.actions.clone()).collect();
    assert_eq!(
        actions,
        vec![
            vec![SolutionAction::KeepItem(a.id())],
            vec![SolutionAction::IgnoreRequires(a.id(), cap("libx"))],
        ]
    );
}

#[test]
fn test_ignored_requirement_resolves() {
    let mut fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("libx")));
    install(&a);
    fx.ignore.add_requires(a.id(), cap("libx"));

    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "a", "1.0")]);
}

#[test]
fn test_independent_problems_are_reported_in_order() {
    let fx = Fixture::new();
    let d = fx.pool.add_installed(pkg("d", "1.0"));
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("libx")));
    let c = fx.pool.add_available(pkg("c", "1.0").conflicts(cap("d")));
    install(&a);
    install(&c);

    let problems = fx.problems(SolveMode::Resolve);
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].description, "nothing provides libx needed by a-1.0.noarch");
    assert_eq!(
        problems[1].description,
        "c-1.0.noarch conflicts with d provided by d-1.0.noarch"
    );

    let actions: Vec<_> = problems[1].solutions.iter().flat_map(|s| s.actions.clone()).collect();
    assert_eq!(
        actions,
        vec![
            SolutionAction::KeepItem(c.id()),
            SolutionAction::Uninstall(d.id()),
            SolutionAction::IgnoreConflict(c.id(), cap("d")),
        ]
    );

    // identical input, identical problems
    let again = fx.problems(SolveMode::Resolve);
    assert_eq!(problems, again);
}

#[test]
fn test_max_problems_caps_the_list() {
    let mut fx = Fixture::new();
    fx.config.max_problems = 1;
    fx.pool.add_installed(pkg("d", "1.0"));
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("libx")));
    let c = fx.pool.add_available(pkg("c", "1.0").conflicts(cap("d")));
    install(&a);
    install(&c);

    assert_eq!(fx.problems(SolveMode::Resolve).len(), 1);
}

#[test]
fn test_force_resolve_drops_conflicting_installed_item() {
    let mut fx = Fixture::new();
    fx.pool.add_installed(pkg("d", "1.0"));
    let c = fx.pool.add_available(pkg("c", "1.0").conflicts(cap("d")));
    install(&c);

    assert_eq!(fx.problems(SolveMode::Resolve).len(), 1);

    fx.force_resolve = true;
    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("remove", "d", "1.0"), ("install", "c", "1.0")],
    );
}

#[test]
fn test_verify_reports_broken_installed_item() {
    let fx = Fixture::new();
    fx.pool.add_available(pkg("a", "1.0"));
    let b = fx.pool.add_installed(pkg("b", "1.0").requires(cap("a")));

    let problems = fx.problems(SolveMode::Verify);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].description, "nothing provides a needed by b-1.0.noarch");

    let actions: Vec<_> = problems[0].solutions.iter().flat_map(|s| s.actions.clone()).collect();
    assert_eq!(
        actions,
        vec![
            SolutionAction::Uninstall(b.id()),
            SolutionAction::IgnoreRequires(b.id(), cap("a")),
            SolutionAction::IgnoreInstalled(b.id()),
        ]
    );
}

#[test]
fn test_verify_ignores_pending_installs() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("missing")));
    fx.pool.add_installed(pkg("b", "1.0"));
    install(&a);

    check_solver_result(&fx, SolveMode::Verify, vec![]);
}

#[test]
fn test_recommends_unless_only_requires() {
    let mut fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").recommends(cap("r")));
    fx.pool.add_available(pkg("r", "1.0"));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "r", "1.0")],
    );

    fx.only_requires = true;
    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "a", "1.0")]);
}

#[test]
fn test_recommend_skipped_when_it_conflicts() {
    let fx = Fixture::new();
    fx.pool.add_installed(pkg("d", "1.0"));
    let a = fx.pool.add_available(pkg("a", "1.0").recommends(cap("r")));
    fx.pool.add_available(pkg("r", "1.0").conflicts(cap("d")));
    install(&a);

    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "a", "1.0")]);
}

#[test]
fn test_extra_require_and_conflict() {
    let mut fx = Fixture::new();
    let d = fx.pool.add_installed(pkg("d", "1.0"));
    fx.pool.add_available(pkg("b", "1.0"));

    fx.extra_requires.insert(cap("b"));
    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "b", "1.0")]);

    fx.extra_requires.clear();
    fx.extra_conflicts.insert(cap("d"));
    let problems = fx.problems(SolveMode::Resolve);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].description, "d-1.0.noarch provides d, which is an extra conflict");
    let actions: Vec<_> = problems[0].solutions.iter().flat_map(|s| s.actions.clone()).collect();
    assert_eq!(
        actions,
        vec![
            SolutionAction::Uninstall(d.id()),
            SolutionAction::RemoveExtraConflict(cap("d")),
        ]
    );
}

#[test]
fn test_incompatible_architecture() {
    let mut fx = Fixture::new();
    let b = fx.pool.add_available(pkg("b", "1.0").with_arch("aarch64"));
    install(&b);

    let problems = fx.problems(SolveMode::Resolve);
    assert_eq!(
        problems[0].description,
        "b-1.0.aarch64 is not installable (incompatible architecture aarch64)"
    );
    assert!(problems[0]
        .solutions
        .iter()
        .any(|s| s.actions == vec![SolutionAction::IgnoreArchitecture(b.id())]));

    fx.ignore.add_architecture(b.id());
    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "b", "1.0")]);
}

#[test]
fn test_vendor_change() {
    let mut fx = Fixture::new();
    fx.pool.add_installed(pkg("a", "1.0").with_vendor("openSUSE"));
    let other = fx.pool.add_available(pkg("a", "2.0").with_vendor("Packman"));
    install(&other);

    let problems = fx.problems(SolveMode::Resolve);
    assert_eq!(problems.len(), 1);
    assert_eq!(
        problems[0].description,
        "a-2.0.noarch would change the vendor of installed a-1.0.noarch (openSUSE -> Packman)"
    );

    fx.ignore.add_vendor(other.id());
    check_solver_result(&fx, SolveMode::Resolve, vec![("update", "a", "1.0 -> 2.0")]);
}

#[test]
fn test_ignore_installed_skips_its_dependencies() {
    let mut fx = Fixture::new();
    let b = fx.pool.add_installed(pkg("b", "1.0").requires(cap("gone")));

    assert_eq!(fx.problems(SolveMode::Resolve).len(), 1);

    fx.ignore.add_installed(b.id());
    check_solver_result(&fx, SolveMode::Resolve, vec![]);
}

#[test]
fn test_previous_choice_is_preferred() {
    let mut fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("x")));
    let x1 = fx.pool.add_available(pkg("x-one", "1.0").provides(cap("x")));
    fx.pool.add_available(pkg("x-two", "1.0").provides(cap("x")));
    install(&a);

    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "x-one", "1.0")],
    );

    let x2 = fx.pool.find_by_name("x-two")[0].clone();
    fx.previous.insert(x2.id(), Transact::Install);
    fx.previous.insert(x1.id(), Transact::Remove);
    check_solver_result(
        &fx,
        SolveMode::Resolve,
        vec![("install", "a", "1.0"), ("install", "x-two", "1.0")],
    );
}

#[test]
fn test_upgrade_mode_prefers_newer_provider() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b")));
    fx.pool.add_installed(pkg("b", "1.0"));
    fx.pool.add_available(pkg("b", "2.0"));
    install(&a);

    check_solver_result(&fx, SolveMode::Resolve, vec![("install", "a", "1.0")]);
    check_solver_result(
        &fx,
        SolveMode::Upgrade,
        vec![("update", "b", "1.0 -> 2.0"), ("install", "a", "1.0")],
    );
}

#[test]
fn test_adapter_rebuilds_index_after_pool_change() {
    let fx = Fixture::new();
    let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b")));
    install(&a);

    let mut adapter = SatResolver::new(&fx.pool);
    let job = SolveJob {
        pool: &fx.pool,
        mode: SolveMode::Resolve,
        extra_requires: &fx.extra_requires,
        extra_conflicts: &fx.extra_conflicts,
        ignore: &fx.ignore,
        only_requires: false,
        force_resolve: false,
        config: &fx.config,
        previous: &fx.previous,
    };
    assert!(matches!(adapter.solve(&job).unwrap(), SolveOutcome::Unsolvable(_)));

    fx.pool.add_available(pkg("b", "1.0"));
    assert!(matches!(adapter.solve(&job).unwrap(), SolveOutcome::Solved(_)));
}
