//! # Test Execution Planner Module / 测试执行计划模块
//!
//! This module turns user filters into the set of test cases to run: it
//! matches filters, pulls in upstream test cases, splits the work across CI
//! runners without separating dependent cases, and groups the result into
//! dependency levels that can run in parallel.
//!
//! 此模块将用户过滤器转换为要运行的测试用例集合：匹配过滤器、引入上游测试用例、
//! 在不拆散相互依赖用例的前提下将工作分配到多个 CI 运行器，并将结果分为可并行运行的依赖层级。

use anyhow::{Result, bail};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::registry::{CaseId, Registry};

/// Represents a complete execution plan.
/// 表示完整的执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    /// Test cases to run, every case after its upstream cases.
    /// 要运行的测试用例，每个用例都排在其上游用例之后。
    pub cases_to_run: Vec<CaseId>,
    /// How many cases the filters matched directly.
    /// 过滤器直接匹配的用例数量。
    pub requested_count: usize,
    /// How many upstream cases were added to satisfy dependencies.
    /// 为满足依赖而加入的上游用例数量。
    pub upstream_added: usize,
    /// Whether the cases are distributed across multiple runners (CI environment).
    /// 用例是否分布在多个运行器上（CI 环境）。
    pub is_distributed: bool,
}

impl ExecutionPlan {
    /// Splits the plan into levels; a case's upstream cases are all in
    /// earlier levels, so the cases of one level are independent.
    ///
    /// 将计划划分为层级；用例的上游用例都位于更早的层级，因此同一层级的用例相互独立。
    pub fn levels(&self, registry: &Registry) -> Vec<Vec<CaseId>> {
        let mut level_of: BTreeMap<CaseId, usize> = BTreeMap::new();
        let mut levels: Vec<Vec<CaseId>> = Vec::new();
        for &id in &self.cases_to_run {
            let level = registry
                .upstream_of(id)
                .iter()
                .filter_map(|up| level_of.get(up))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(id, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(id);
        }
        levels
    }
}

/// Returns true if `filter` selects the test case at `position` (1-based, as
/// printed by `list`) with identifier `id` (`<core>/<group>/<subdir>`).
///
/// A filter is a list number, a full identifier or a leading part of one
/// ending at a `/`, with or without the core.
///
/// 若 `filter` 选中了位于 `position`（从 1 开始，与 `list` 的输出一致）、标识符为 `id` 的测试用例，则返回 true。
pub fn filter_matches(filter: &str, position: usize, id: &str) -> bool {
    if let Ok(number) = filter.parse::<usize>() {
        return number == position;
    }
    let filter = filter.trim_end_matches('/');
    let prefix_of = |candidate: &str| candidate == filter || candidate.starts_with(&format!("{filter}/"));
    prefix_of(id) || id.split_once('/').is_some_and(|(_, without_core)| prefix_of(without_core))
}

/// Creates an execution plan.
///
/// # Arguments
/// * `registry` - Every known test case
/// * `filters` - Selection; empty means everything
/// * `total_runners` - Optional total number of runners for distributed execution
/// * `runner_index` - Optional index of this runner (0-based)
///
/// # Returns
/// An `ExecutionPlan` whose cases are closed under "upstream of".
pub fn plan_execution(
    registry: &Registry,
    filters: &[String],
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan> {
    let all = registry.case_ids()?;

    let mut requested: BTreeSet<CaseId> = BTreeSet::new();
    if filters.is_empty() {
        requested.extend(all.iter().copied());
    } else {
        for filter in filters {
            let matched: Vec<CaseId> = all
                .iter()
                .enumerate()
                .filter(|(i, id)| filter_matches(filter, i + 1, &registry.case(**id).id()))
                .map(|(_, id)| *id)
                .collect();
            if matched.is_empty() {
                bail!("No test case matches '{}'", filter);
            }
            requested.extend(matched);
        }
    }

    // Close the selection over upstream test cases.
    let mut selected = requested.clone();
    let mut stack: Vec<CaseId> = requested.iter().copied().collect();
    while let Some(id) = stack.pop() {
        for up in registry.upstream_of(id) {
            if selected.insert(up) {
                stack.push(up);
            }
        }
    }

    let ordered: Vec<CaseId> = all.into_iter().filter(|id| selected.contains(id)).collect();

    // Distribute dependency families if running in CI
    let (cases_to_run, is_distributed) = if let (Some(total), Some(index)) = (total_runners, runner_index) {
        if total == 0 || index >= total {
            bail!("Runner index must be less than total runners.");
        }
        let families = families(registry, &ordered);
        let distributed: Vec<CaseId> = ordered
            .into_iter()
            .filter(|id| families.get(id).is_some_and(|f| f % total == index))
            .collect();
        (distributed, true)
    } else {
        if total_runners.is_some() || runner_index.is_some() {
            bail!("Both --total-runners and --runner-index must be provided.");
        }
        (ordered, false)
    };

    Ok(ExecutionPlan {
        requested_count: requested.len(),
        upstream_added: selected.len() - requested.len(),
        cases_to_run,
        is_distributed,
    })
}

/// Numbers the weakly connected components of the selected cases, in order of
/// their first member.
///
/// 按首个成员的顺序为所选用例的弱连通分量编号。
fn families(registry: &Registry, ordered: &[CaseId]) -> BTreeMap<CaseId, usize> {
    let mut parent: BTreeMap<CaseId, CaseId> = ordered.iter().map(|&id| (id, id)).collect();

    fn root(parent: &BTreeMap<CaseId, CaseId>, mut id: CaseId) -> CaseId {
        while let Some(&p) = parent.get(&id) {
            if p == id {
                break;
            }
            id = p;
        }
        id
    }

    for &id in ordered {
        for up in registry.upstream_of(id) {
            if !parent.contains_key(&up) {
                continue;
            }
            let (a, b) = (root(&parent, id), root(&parent, up));
            if a != b {
                // attach the later root under the earlier one
                let (keep, merge) = if a < b { (a, b) } else { (b, a) };
                parent.insert(merge, keep);
            }
        }
    }

    let mut numbering: BTreeMap<CaseId, usize> = BTreeMap::new();
    let mut family_of = BTreeMap::new();
    for &id in ordered {
        let r = root(&parent, id);
        let next = numbering.len();
        let family = *numbering.entry(r).or_insert(next);
        family_of.insert(id, family);
    }
    family_of
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_prefix_on_component_boundary() {
        let id = "ocean/global_ocean/QU240/mesh";
        assert!(filter_matches("ocean/global_ocean/QU240", 3, id));
        assert!(filter_matches("global_ocean/QU240/mesh", 3, id));
        assert!(filter_matches("3", 3, id));
        assert!(!filter_matches("ocean/global_ocean/QU24", 3, id));
        assert!(!filter_matches("4", 3, id));
    }
}
