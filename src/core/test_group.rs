//! # Test Group Module / 测试组模块
//!
//! A named collection of test cases. Test cases that read outputs of other
//! test cases are added with explicit handles to those upstream cases, so the
//! test-case graph is acyclic by construction: a handle only exists for a case
//! that was added earlier.
//!
//! 命名的测试用例集合。读取其他测试用例输出的测试用例在添加时会带上指向这些上游用例的显式句柄，
//! 因此测试用例图在构造上即无环：句柄只存在于先前添加的用例。

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::core::graph::{self, ResolvedSteps};
use crate::core::test_case::TestCase;

/// Handle to a test case inside its group.
/// 测试组内测试用例的句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseHandle(usize);

impl CaseHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct TestGroup {
    mpas_core: String,
    name: String,
    description: String,
    cases: Vec<TestCase>,
    upstream: Vec<Vec<CaseHandle>>,
}

impl TestGroup {
    pub fn new(mpas_core: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mpas_core: mpas_core.into(),
            name: name.into(),
            description: String::new(),
            cases: Vec::new(),
            upstream: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn mpas_core(&self) -> &str {
        &self.mpas_core
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Starts a test case that belongs to this group.
    pub fn new_case(&self, name: &str, subdir: &str) -> TestCase {
        TestCase::new(&self.mpas_core, &self.name, name, subdir)
    }

    /// Registers a test case with no upstream test cases.
    pub fn add_test_case(&mut self, case: TestCase) -> Result<CaseHandle> {
        self.add_test_case_after(case, &[])
    }

    /// Registers a test case that reads outputs of `upstream`.
    ///
    /// Test cases are keyed by subdirectory (several cases may share a short
    /// name such as `mesh`); a repeated subdirectory is a duplicate, and a
    /// subdirectory nested inside another case's subdirectory is an overlap.
    ///
    /// 注册一个读取 `upstream` 输出的测试用例。
    /// 测试用例以子目录为键（多个用例可以共享诸如 `mesh` 的短名称）；
    /// 重复的子目录视为重复，嵌套在另一用例子目录中的子目录视为重叠。
    pub fn add_test_case_after(&mut self, case: TestCase, upstream: &[CaseHandle]) -> Result<CaseHandle> {
        for existing in &self.cases {
            if existing.subdir() == case.subdir() {
                return Err(Error::DuplicateTestCase {
                    test_group: self.name.clone(),
                    test_case: case.subdir().to_string(),
                });
            }
            let (a, b) = (Path::new(existing.subdir()), Path::new(case.subdir()));
            if a.starts_with(b) || b.starts_with(a) {
                return Err(Error::OverlappingSubdir {
                    test_group: self.name.clone(),
                    first: existing.subdir().to_string(),
                    second: case.subdir().to_string(),
                });
            }
        }
        if let Some(bad) = upstream.iter().find(|h| h.0 >= self.cases.len()) {
            return Err(Error::UnknownTestCase {
                test_group: self.name.clone(),
                test_case: format!("#{}", bad.0),
            });
        }

        let handle = CaseHandle(self.cases.len());
        let mut direct: Vec<CaseHandle> = upstream.to_vec();
        direct.sort();
        direct.dedup();
        self.cases.push(case);
        self.upstream.push(direct);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = CaseHandle> {
        (0..self.cases.len()).map(CaseHandle)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn case(&self, handle: CaseHandle) -> &TestCase {
        &self.cases[handle.0]
    }

    /// Looks a test case up by subdirectory.
    pub fn get(&self, subdir: &str) -> Option<(CaseHandle, &TestCase)> {
        self.cases
            .iter()
            .position(|c| c.subdir() == subdir)
            .map(|i| (CaseHandle(i), &self.cases[i]))
    }

    pub fn handle_of(&self, subdir: &str) -> Result<CaseHandle> {
        self.get(subdir)
            .map(|(handle, _)| handle)
            .ok_or_else(|| Error::UnknownTestCase {
                test_group: self.name.clone(),
                test_case: subdir.to_string(),
            })
    }

    pub fn upstream_of(&self, handle: CaseHandle) -> &[CaseHandle] {
        &self.upstream[handle.0]
    }

    /// Every test case `handle` depends on, directly or not.
    /// `handle` 直接或间接依赖的所有测试用例。
    pub fn upstream_closure(&self, handle: CaseHandle) -> BTreeSet<CaseHandle> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<CaseHandle> = self.upstream_of(handle).to_vec();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.upstream_of(next).iter().copied());
            }
        }
        seen
    }

    /// Upstream → downstream edges between test cases.
    pub fn case_graph(&self) -> DiGraph<CaseHandle, ()> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = self.handles().map(|h| graph.add_node(h)).collect();
        for (i, upstream) in self.upstream.iter().enumerate() {
            for up in upstream {
                graph.add_edge(nodes[up.0], nodes[i], ());
            }
        }
        graph
    }

    /// Test cases in an order where every case follows its upstream cases.
    ///
    /// Registration order already has this property; the graph is still
    /// sorted so a broken invariant shows up as an error.
    ///
    /// 每个用例都排在其上游用例之后的顺序。注册顺序本身已满足此性质；
    /// 仍然对图进行排序，以便不变量被破坏时以错误形式暴露。
    pub fn case_order(&self) -> Result<Vec<CaseHandle>> {
        let graph = self.case_graph();
        toposort(&graph, None).map_err(|cycle| Error::DependencyCycle {
            test_case: self.case(graph[cycle.node_id()]).id(),
            step: String::new(),
        })?;
        Ok(self.handles().collect())
    }

    /// Resolves the step order of one test case and checks its reads from
    /// other test cases against the declared upstream cases.
    pub fn resolve(&self, handle: CaseHandle) -> Result<ResolvedSteps> {
        graph::resolve_case(self, handle)
    }
}
