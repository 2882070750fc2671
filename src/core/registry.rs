//! # Registry Module / 注册表模块
//!
//! Discovery of every test group the framework knows about, and the
//! identifiers used to address test cases across groups.
//!
//! 发现框架已知的所有测试组，以及跨测试组定位测试用例所用的标识符。

use crate::core::error::{Error, Result};
use crate::core::test_case::TestCase;
use crate::core::test_group::{CaseHandle, TestGroup};

/// A test case address: group index plus handle inside the group.
/// 测试用例地址：测试组索引加上组内句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseId {
    pub group: usize,
    pub case: CaseHandle,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: Vec<TestGroup>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every test group shipped with the framework.
    /// 构建随框架发布的所有测试组。
    pub fn discover() -> Result<Self> {
        let mut registry = Registry::new();
        crate::suites::register(&mut registry)?;
        Ok(registry)
    }

    /// Adds a group; group names are unique across MPAS cores.
    pub fn add_test_group(&mut self, group: TestGroup) -> Result<()> {
        if self.groups.iter().any(|g| g.name() == group.name()) {
            return Err(Error::DuplicateTestGroup(group.name().to_string()));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn groups(&self) -> &[TestGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> &TestGroup {
        &self.groups[index]
    }

    pub fn case(&self, id: CaseId) -> &TestCase {
        self.groups[id.group].case(id.case)
    }

    /// Every test case, group by group, each group in dependency order.
    /// 所有测试用例，按测试组排列，每组内按依赖顺序。
    pub fn case_ids(&self) -> Result<Vec<CaseId>> {
        let mut ids = Vec::new();
        for (group, test_group) in self.groups.iter().enumerate() {
            for case in test_group.case_order()? {
                ids.push(CaseId { group, case });
            }
        }
        Ok(ids)
    }

    /// Direct upstream test cases of `id`.
    pub fn upstream_of(&self, id: CaseId) -> Vec<CaseId> {
        self.groups[id.group]
            .upstream_of(id.case)
            .iter()
            .map(|&case| CaseId { group: id.group, case })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(TestGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
