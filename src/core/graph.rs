//! # Dependency Graph Module / 依赖图模块
//!
//! Builds the step dependency graph of a test case from its file declarations
//! and checks reads across test cases. All problems are configuration errors
//! found before anything runs.
//!
//! 根据文件声明构建测试用例的步骤依赖图，并检查跨测试用例的读取。
//! 所有问题都是在运行任何内容之前发现的配置错误。

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::path::PathBuf;

use crate::core::error::{Error, Result};
use crate::core::test_case::TestCase;
use crate::core::test_group::{CaseHandle, TestGroup};

/// An input that lives in another test case's directory.
/// 位于另一个测试用例目录中的输入。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInput {
    pub step: String,
    /// Relative to the work root.
    pub path: PathBuf,
}

/// The outcome of step-level resolution.
/// 步骤级解析的结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSteps {
    /// Step names in execution order.
    pub order: Vec<String>,
    /// For every step, the sibling steps producing its inputs.
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub external_inputs: Vec<ExternalInput>,
}

/// Map from an output path (relative to the work root) to the steps declaring it.
fn producers(case: &TestCase) -> HashMap<PathBuf, Vec<usize>> {
    let mut producers: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (i, step) in case.steps().iter().enumerate() {
        let step_path = case.step_path(step);
        for output in step.outputs() {
            producers.entry(output.resolved_path(&step_path)).or_default().push(i);
        }
    }
    producers
}

/// Orders the steps of one test case.
///
/// An input whose path equals a sibling's output adds an edge from the sibling.
/// A file written by several steps is read from the closest writer declared
/// before the reader, and the writers keep their declared order around their
/// readers; a reader declared before every writer is
/// [`Error::AmbiguousProducer`]. Inputs inside the test case's directory that
/// nobody produces are [`Error::MissingDependency`]; inputs outside it are
/// returned as [`ExternalInput`]s for the caller to check. Independent steps
/// keep their declared order.
///
/// 对一个测试用例的步骤排序。
/// 若某个输入的路径等于兄弟步骤的输出，则从该兄弟步骤添加一条边。
/// 由多个步骤写入的文件从读取者之前声明的最近写入者读取，写入者围绕其读取者保持声明顺序；
/// 在所有写入者之前声明的读取者是 [`Error::AmbiguousProducer`]。
/// 测试用例目录内无人生成的输入是 [`Error::MissingDependency`]；
/// 目录外的输入作为 [`ExternalInput`] 返回，由调用者检查。相互独立的步骤保持声明顺序。
pub fn resolve_steps(case: &TestCase) -> Result<ResolvedSteps> {
    let steps = case.steps();
    let case_path = case.path();
    let producers = producers(case);

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..steps.len()).map(|i| graph.add_node(i)).collect();
    let mut resolved = ResolvedSteps::default();

    // Rewrites of one file happen in declared order.
    for writers in producers.values() {
        for pair in writers.windows(2) {
            graph.update_edge(nodes[pair[0]], nodes[pair[1]], ());
        }
    }

    for (i, step) in steps.iter().enumerate() {
        let step_path = case.step_path(step);
        let mut deps: Vec<String> = Vec::new();
        for input in step.inputs() {
            if input.is_provided() {
                continue;
            }
            let path = input.resolved_path(&step_path);
            if !path.starts_with(&case_path) {
                resolved.external_inputs.push(ExternalInput {
                    step: step.name().to_string(),
                    path,
                });
                continue;
            }
            let writers = producers.get(&path).ok_or_else(|| Error::MissingDependency {
                step: format!("{}/{}", case.id(), step.name()),
                path: path.clone(),
            })?;
            let producer = match writers.as_slice() {
                [only] => *only,
                _ => {
                    let position = writers.partition_point(|&w| w < i);
                    if position == 0 {
                        return Err(Error::AmbiguousProducer {
                            path,
                            producers: writers.iter().map(|&w| steps[w].name().to_string()).collect(),
                        });
                    }
                    // the next rewrite must wait for this read
                    if let Some(&next) = writers[position..].iter().find(|&&w| w > i) {
                        graph.update_edge(nodes[i], nodes[next], ());
                    }
                    writers[position - 1]
                }
            };
            graph.update_edge(nodes[producer], nodes[i], ());
            let name = steps[producer].name().to_string();
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
        resolved.dependencies.insert(step.name().to_string(), deps);
    }

    toposort(&graph, None).map_err(|cycle| Error::DependencyCycle {
        test_case: case.id(),
        step: steps[graph[cycle.node_id()]].name().to_string(),
    })?;

    // Kahn's algorithm, always taking the earliest declared ready step.
    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    while let Some(Reverse(i)) = ready.pop() {
        resolved.order.push(steps[i].name().to_string());
        for next in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = graph[next];
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    Ok(resolved)
}

/// Resolves one test case of `group` and checks that everything it reads from
/// other test cases is produced by one of its (transitive) upstream cases.
///
/// 解析 `group` 中的一个测试用例，并检查它从其他测试用例读取的所有内容
/// 都由其（传递的）上游用例之一生成。
pub fn resolve_case(group: &TestGroup, handle: CaseHandle) -> Result<ResolvedSteps> {
    let case = group.case(handle);
    let resolved = resolve_steps(case)?;
    let upstream = group.upstream_closure(handle);

    for input in &resolved.external_inputs {
        let missing = || Error::MissingDependency {
            step: format!("{}/{}", case.id(), input.step),
            path: input.path.clone(),
        };
        let (owner_handle, owner) = group
            .handles()
            .map(|h| (h, group.case(h)))
            .find(|(_, c)| input.path.starts_with(c.path()))
            .ok_or_else(missing)?;

        if !upstream.contains(&owner_handle) {
            return Err(Error::UndeclaredDependency {
                test_case: case.id(),
                producer: owner.id(),
                path: input.path.clone(),
            });
        }
        if !producers(owner).contains_key(&input.path) {
            return Err(missing());
        }
    }

    Ok(resolved)
}
