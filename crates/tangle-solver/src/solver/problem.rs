use std::collections::BTreeSet;

use super::rule::{Rule, RuleType};
use super::rule_generator::Variables;
use super::rule_set::RuleSet;
use crate::pool::{ItemId, PoolItem};
use crate::problem::{ProblemSolution, ResolverProblem, SolutionAction};

/// Turns a minimal unsatisfiable core into a [`ResolverProblem`]
pub(crate) struct ProblemBuilder<'a> {
    rules: &'a RuleSet,
    vars: &'a Variables,
}

impl<'a> ProblemBuilder<'a> {
    pub fn new(rules: &'a RuleSet, vars: &'a Variables) -> Self {
        Self { rules, vars }
    }

    pub fn build(&self, core: &BTreeSet<u32>) -> ResolverProblem {
        let rules: Vec<&Rule> = core.iter().filter_map(|&id| self.rules.get(id)).collect();

        let main = rules
            .iter()
            .min_by_key(|rule| (rule.rule_type().explanation_rank(), rule.id()));
        let mut problem = ResolverProblem::new(
            main.map(|rule| self.describe(rule))
                .unwrap_or_else(|| "the constraints cannot be satisfied".to_string()),
        );

        problem.details = rules
            .iter()
            .map(|rule| self.describe(rule))
            .collect::<Vec<_>>()
            .join("\n");

        for rule in &rules {
            for item in [rule.source(), rule.related()].into_iter().flatten() {
                let id = self.item(item).id();
                if !problem.items.contains(&id) {
                    problem.items.push(id);
                }
            }
        }

        for rule in &rules {
            for solution in self.solutions(rule) {
                if !problem.solutions.iter().any(|s| s.actions == solution.actions) {
                    problem.solutions.push(solution);
                }
            }
        }

        problem
    }

    fn item(&self, var: i32) -> &PoolItem {
        self.vars.item(var.abs())
    }

    fn source(&self, rule: &Rule) -> Option<&PoolItem> {
        rule.source().map(|var| self.item(var))
    }

    fn related(&self, rule: &Rule) -> Option<&PoolItem> {
        rule.related().map(|var| self.item(var))
    }

    fn names(&self, rule: &Rule) -> String {
        rule.literals()
            .iter()
            .map(|&l| self.item(l).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn describe(&self, rule: &Rule) -> String {
        let source = self
            .source(rule)
            .map(|item| item.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let related = self
            .related(rule)
            .map(|item| item.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let cap = rule.capability().map(|c| c.to_string()).unwrap_or_default();

        match rule.rule_type() {
            RuleType::Job => {
                if rule.literals().first().is_some_and(|&l| l > 0) {
                    format!("{} cannot be installed", source)
                } else {
                    format!("{} cannot be removed", source)
                }
            }
            RuleType::Keep => format!("installed {} cannot be kept", source),
            RuleType::Requires => {
                if rule.literals().len() == 1 {
                    format!("nothing provides {} needed by {}", cap, source)
                } else {
                    format!("{} requires {}, but this requirement cannot be provided", source, cap)
                }
            }
            RuleType::Conflicts => format!("{} conflicts with {} provided by {}", source, cap, related),
            RuleType::Obsoletes => format!("{} obsoletes {} provided by {}", source, cap, related),
            RuleType::SameName => format!("only one of {} can be installed", self.names(rule)),
            RuleType::NotInstallable => {
                let arch = self.source(rule).map(|item| item.arch().to_string()).unwrap_or_default();
                format!("{} is not installable (incompatible architecture {})", source, arch)
            }
            RuleType::VendorChange => {
                let vendor = |item: Option<&PoolItem>| match item.map(|i| i.vendor()) {
                    Some("") | None => "(none)".to_string(),
                    Some(vendor) => vendor.to_string(),
                };
                format!(
                    "{} would change the vendor of installed {} ({} -> {})",
                    source,
                    related,
                    vendor(self.related(rule)),
                    vendor(self.source(rule)),
                )
            }
            RuleType::ExtraRequire => {
                if rule.literals().is_empty() {
                    format!("nothing provides the extra requirement {}", cap)
                } else {
                    format!("the extra requirement {} cannot be provided", cap)
                }
            }
            RuleType::ExtraConflict => format!("{} provides {}, which is an extra conflict", source, cap),
            RuleType::Learned => format!("{} cannot be chosen together", self.names(rule)),
        }
    }

    fn solutions(&self, rule: &Rule) -> Vec<ProblemSolution> {
        let Some(item) = self.source(rule) else {
            return self.extra_solutions(rule);
        };
        let id: ItemId = item.id();
        let cap = rule.capability().cloned();

        match (rule.rule_type(), cap) {
            (RuleType::Job, _) => {
                let text = if rule.literals().first().is_some_and(|&l| l > 0) {
                    format!("do not install {}", item)
                } else {
                    format!("do not remove {}", item)
                };
                vec![ProblemSolution::new(text, SolutionAction::KeepItem(id))]
            }
            (RuleType::Keep, _) => vec![ProblemSolution::new(
                format!("deinstall {}", item),
                SolutionAction::Uninstall(id),
            )],
            (RuleType::Requires, Some(cap)) => {
                let mut solutions = vec![ProblemSolution::new(
                    format!("break {} by ignoring some of its dependencies", item),
                    SolutionAction::IgnoreRequires(id, cap.clone()),
                )
                .with_details(format!("{} will be installed without {}", item, cap))];
                if item.status().is_installed() {
                    solutions.push(ProblemSolution::new(
                        format!("ignore that {} is installed", item),
                        SolutionAction::IgnoreInstalled(id),
                    ));
                }
                solutions
            }
            (RuleType::Conflicts, Some(cap)) => vec![ProblemSolution::new(
                format!("ignore the conflict of {} with {}", item, cap),
                SolutionAction::IgnoreConflict(id, cap),
            )],
            (RuleType::Obsoletes, Some(cap)) => vec![ProblemSolution::new(
                format!("ignore that {} obsoletes {}", item, cap),
                SolutionAction::IgnoreObsoletes(id, cap),
            )],
            (RuleType::NotInstallable, _) => vec![ProblemSolution::new(
                format!("install {} despite the inferior architecture", item),
                SolutionAction::IgnoreArchitecture(id),
            )],
            (RuleType::VendorChange, _) => vec![ProblemSolution::new(
                format!("install {} despite the vendor change", item),
                SolutionAction::IgnoreVendor(id),
            )],
            _ => self.extra_solutions(rule),
        }
    }

    fn extra_solutions(&self, rule: &Rule) -> Vec<ProblemSolution> {
        let Some(cap) = rule.capability().cloned() else {
            return Vec::new();
        };
        match rule.rule_type() {
            RuleType::ExtraRequire => vec![ProblemSolution::new(
                format!("remove the extra requirement {}", cap),
                SolutionAction::RemoveExtraRequire(cap),
            )],
            RuleType::ExtraConflict => vec![ProblemSolution::new(
                format!("remove the extra conflict {}", cap),
                SolutionAction::RemoveExtraConflict(cap),
            )],
            _ => Vec::new(),
        }
    }
}
