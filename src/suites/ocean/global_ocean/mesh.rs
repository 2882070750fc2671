//! Global mesh creation: base mesh, optional topography remapping and culling
//! of land cells.
//!
//! 全球网格创建：基础网格、可选的地形重映射以及陆地单元剔除。

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::ConfigCascade;
use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_case::{Comparison, TestCaseHooks};
use crate::core::test_group::{CaseHandle, TestGroup};

use super::{InitialCondition, MeshKind, MeshName, PACKAGE};

const BATHY_DESCRIPTION: &str = "Bathymetry is from GEBCO 2022, combined with BedMachine Antarctica v3 around Antarctica.";
const WISC_DESCRIPTION: &str = "Includes cavities under the ice shelves around Antarctica";
const TOPOGRAPHY_FILE: &str = "BedMachineAntarctica_v3_and_GEBCO_2022_0.0125_degree_20220921.nc";

/// A registered mesh test case and where its products live.
/// 已注册的网格测试用例及其产物所在位置。
#[derive(Debug, Clone)]
pub struct MeshCase {
    pub name: MeshName,
    pub handle: CaseHandle,
    /// Work path of the test case, relative to the work root.
    pub path: PathBuf,
    pub remap_topography: bool,
}

impl MeshCase {
    pub fn culled_mesh(&self) -> PathBuf {
        self.path.join("cull_mesh/culled_mesh.nc")
    }

    pub fn culled_graph(&self) -> PathBuf {
        self.path.join("cull_mesh/culled_graph.info")
    }

    pub fn remapped_topography(&self) -> Option<PathBuf> {
        self.remap_topography
            .then(|| self.path.join("remap_topography/topography_remapped.nc"))
    }
}

/// Config shared by every test case built on a mesh. The mesh options come
/// first, then whatever the initial condition adds.
///
/// 基于某个网格构建的所有测试用例共享的配置。先是网格选项，然后是初始条件添加的内容。
#[derive(Debug, Clone)]
pub struct GlobalOceanConfig {
    pub mesh: MeshName,
    pub remap_topography: bool,
    pub initial_condition: Option<InitialCondition>,
}

impl TestCaseHooks for GlobalOceanConfig {
    fn configure(&self, config: &mut ConfigCascade) -> Result<()> {
        config.add_from_package("mesh", "mesh.toml")?;
        if self.remap_topography {
            config.add_from_package("ocean/mesh", "remap_topography.toml")?;
        }
        let kind = self.mesh.kind;
        if kind.is_kuroshio() {
            config.add_from_package(PACKAGE, "mesh/kuroshio.toml")?;
        }
        config.add_from_package(PACKAGE, kind.config_file())?;
        if kind == MeshKind::Icos {
            config.add_from_package(PACKAGE, "mesh/icos.toml")?;
        }

        if kind.resolution_from_config() {
            let res = config.get_float("global_ocean", "qu_resolution")?;
            // roughly the area of the ocean divided by the area of a cell
            let approx_cell_count = (4e8 / (res * res)) as i64;
            config.set("global_ocean", "approx_cell_count", approx_cell_count)?;
        }

        config.set("spherical_mesh", "add_mesh_density", "True")?;
        config.set("spherical_mesh", "plot_cell_width", "True")?;
        if self.mesh.ice_shelf_cavities {
            let prefix = config.get_str("global_ocean", "prefix")?;
            config.set("global_ocean", "prefix", format!("{prefix}wISC"))?;
            config.set("global_ocean", "wisc_description", WISC_DESCRIPTION)?;
        }

        let description = if self.remap_topography {
            config.get_str("remap_topography", "description")?
        } else {
            BATHY_DESCRIPTION.to_string()
        };
        config.set("global_ocean", "bathy_description", description)?;

        if let Some(ic) = self.initial_condition {
            config.set("global_ocean", "init_description", ic.description())?;
        }
        Ok(())
    }
}

fn base_mesh_args(mesh: MeshName) -> Vec<String> {
    let args: Vec<&str> = match mesh.kind {
        MeshKind::QU240 => vec!["quasi_uniform", "--cell-width", "240"],
        MeshKind::Icos240 => vec!["icosahedral", "--cell-width", "240"],
        MeshKind::QU => vec!["quasi_uniform", "--from-config"],
        MeshKind::Icos => vec!["icosahedral", "--from-config"],
        _ => vec!["cell_width_function"],
    };
    let mut args: Vec<String> = args.into_iter().map(String::from).collect();
    args.extend(["--mesh".to_string(), mesh.kind_name(), "--output".to_string(), "base_mesh.nc".to_string()]);
    args
}

impl MeshName {
    /// The name without `wISC`, which selects the cell-width function.
    fn kind_name(&self) -> String {
        MeshName {
            ice_shelf_cavities: false,
            ..*self
        }
        .to_string()
    }
}

/// Adds `<mesh>/mesh` to the group.
/// 将 `<mesh>/mesh` 添加到测试组。
pub fn add_mesh(group: &mut TestGroup, mesh: MeshName, remap_topography: bool) -> Result<MeshCase> {
    let subdir = format!("{mesh}/mesh");
    let mut case = group
        .new_case("mesh", &subdir)
        .with_description(format!("Create the {mesh} global ocean mesh"))
        .with_hooks(Arc::new(GlobalOceanConfig {
            mesh,
            remap_topography,
            initial_condition: None,
        }));
    case.add_config_file(PACKAGE, "global_ocean.toml");

    let mut base_mesh = Step::new(
        "base_mesh",
        Resources::serial(),
        StepAction::tool(Tool::BaseMesh, base_mesh_args(mesh)),
    )?;
    base_mesh.add_output_file("base_mesh.nc")?;
    case.add_step(base_mesh)?;

    let mut cull_args = vec![
        "--input".to_string(),
        "../base_mesh/base_mesh.nc".to_string(),
        "--output".to_string(),
        "culled_mesh.nc".to_string(),
    ];
    if remap_topography {
        let mut remap = Step::new(
            "remap_topography",
            Resources::new(1280, 512, 1),
            StepAction::tool(
                Tool::RemapTopography,
                ["--mesh", "../base_mesh/base_mesh.nc", "--topography", "topography.nc", "--output", "topography_remapped.nc"],
            ),
        )?
        .with_resource_options("remap_topography", "remap");
        remap.add_input_file(InputFile::local("../base_mesh/base_mesh.nc"))?;
        remap.add_input_file(InputFile::from_database(
            "topography.nc",
            "bathymetry_database",
            TOPOGRAPHY_FILE,
        ))?;
        remap.add_output_file("topography_remapped.nc")?;
        case.add_step(remap)?;
        cull_args.extend([
            "--topography".to_string(),
            "../remap_topography/topography_remapped.nc".to_string(),
        ]);
    }
    if mesh.ice_shelf_cavities {
        cull_args.push("--with-ice-shelf-cavities".to_string());
    }

    let mut cull = Step::new("cull_mesh", Resources::serial(), StepAction::tool(Tool::CullMesh, cull_args))?;
    cull.add_input_file(InputFile::local("../base_mesh/base_mesh.nc"))?;
    if remap_topography {
        cull.add_input_file(InputFile::local("../remap_topography/topography_remapped.nc"))?;
    }
    cull.add_output_files(["culled_mesh.nc", "culled_graph.info"])?;
    case.add_step(cull)?;

    case.add_validation(Comparison::new(["xCell", "yCell", "zCell"], "cull_mesh/culled_mesh.nc", None));

    let path = case.path();
    let handle = group.add_test_case(case)?;
    Ok(MeshCase {
        name: mesh,
        handle,
        path,
        remap_topography,
    })
}
