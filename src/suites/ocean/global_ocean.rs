//! # Global Ocean Test Group / 全球海洋测试组
//!
//! Global MPAS-Ocean meshes, their initial conditions, regression tests,
//! dynamic adjustment and E3SM support files. Every mesh gets a family of
//! test cases wired together through the files they exchange:
//!
//! ```text
//! <mesh>/mesh
//! <mesh>/<ic>/init
//! <mesh>/<ic>/<time_integrator>/<test>
//! <mesh>/<ic>/<time_integrator>/dynamic_adjustment
//! <mesh>/<ic>/<time_integrator>/files_for_e3sm
//! ```
//!
//! 全球 MPAS-Ocean 网格、初始条件、回归测试、动力调整和 E3SM 支持文件。
//! 每个网格都有一族测试用例，通过彼此交换的文件连接在一起。

pub mod dynamic_adjustment;
pub mod files_for_e3sm;
pub mod forward;
pub mod init;
pub mod mesh;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::test_group::TestGroup;

use self::dynamic_adjustment::Schedule;
use self::forward::ForwardTest;

pub const MPAS_CORE: &str = "ocean";
pub const NAME: &str = "global_ocean";
pub const PACKAGE: &str = "ocean/global_ocean";

/// The mesh families this group knows how to build.
/// 此测试组能够构建的网格族。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshKind {
    QU240,
    Icos240,
    QU,
    Icos,
    EC30to60,
    ARRM10to60,
    SO12to60,
    WC14,
    RRS6to18,
    Kuroshio12to60,
    Kuroshio8to60,
    FRIS01to60,
    FRIS02to60,
    FRIS04to60,
    FRIS08to60,
}

impl MeshKind {
    pub const ALL: [MeshKind; 15] = [
        MeshKind::QU240,
        MeshKind::Icos240,
        MeshKind::QU,
        MeshKind::Icos,
        MeshKind::EC30to60,
        MeshKind::ARRM10to60,
        MeshKind::SO12to60,
        MeshKind::WC14,
        MeshKind::RRS6to18,
        MeshKind::Kuroshio12to60,
        MeshKind::Kuroshio8to60,
        MeshKind::FRIS01to60,
        MeshKind::FRIS02to60,
        MeshKind::FRIS04to60,
        MeshKind::FRIS08to60,
    ];

    /// The name split around the place where `wISC` goes.
    fn name_parts(&self) -> (&'static str, &'static str) {
        match self {
            MeshKind::QU240 => ("QU", "240"),
            MeshKind::Icos240 => ("Icos", "240"),
            MeshKind::QU => ("QU", ""),
            MeshKind::Icos => ("Icos", ""),
            MeshKind::EC30to60 => ("EC", "30to60"),
            MeshKind::ARRM10to60 => ("ARRM", "10to60"),
            MeshKind::SO12to60 => ("SO", "12to60"),
            MeshKind::WC14 => ("WC", "14"),
            MeshKind::RRS6to18 => ("RRS", "6to18"),
            MeshKind::Kuroshio12to60 => ("Kuroshio", "12to60"),
            MeshKind::Kuroshio8to60 => ("Kuroshio", "8to60"),
            MeshKind::FRIS01to60 => ("FRIS", "01to60"),
            MeshKind::FRIS02to60 => ("FRIS", "02to60"),
            MeshKind::FRIS04to60 => ("FRIS", "04to60"),
            MeshKind::FRIS08to60 => ("FRIS", "08to60"),
        }
    }

    /// Packaged mesh config file, shared by the QU and Icos variants.
    /// 打包的网格配置文件，QU 与 Icos 变体共用。
    pub fn config_file(&self) -> &'static str {
        match self {
            MeshKind::QU240 | MeshKind::Icos240 => "mesh/qu240.toml",
            MeshKind::QU | MeshKind::Icos => "mesh/qu.toml",
            MeshKind::EC30to60 => "mesh/ec30to60.toml",
            MeshKind::ARRM10to60 => "mesh/arrm10to60.toml",
            MeshKind::SO12to60 => "mesh/so12to60.toml",
            MeshKind::WC14 => "mesh/wc14.toml",
            MeshKind::RRS6to18 => "mesh/rrs6to18.toml",
            MeshKind::Kuroshio12to60 => "mesh/kuroshio12to60.toml",
            MeshKind::Kuroshio8to60 => "mesh/kuroshio8to60.toml",
            MeshKind::FRIS01to60 => "mesh/fris01to60.toml",
            MeshKind::FRIS02to60 => "mesh/fris02to60.toml",
            MeshKind::FRIS04to60 => "mesh/fris04to60.toml",
            MeshKind::FRIS08to60 => "mesh/fris08to60.toml",
        }
    }

    pub fn supports_cavities(&self) -> bool {
        !self.is_kuroshio()
    }

    pub fn is_kuroshio(&self) -> bool {
        matches!(self, MeshKind::Kuroshio12to60 | MeshKind::Kuroshio8to60)
    }

    /// QU and Icos meshes whose resolution comes from `[global_ocean] qu_resolution`.
    pub fn resolution_from_config(&self) -> bool {
        matches!(self, MeshKind::QU | MeshKind::Icos)
    }
}

/// A mesh kind plus whether it has ice-shelf cavities, e.g. `QUwISC240`.
/// 网格类型以及是否包含冰架空腔，例如 `QUwISC240`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshName {
    pub kind: MeshKind,
    pub ice_shelf_cavities: bool,
}

impl MeshName {
    pub fn new(kind: MeshKind, ice_shelf_cavities: bool) -> Result<Self> {
        if ice_shelf_cavities && !kind.supports_cavities() {
            let (prefix, suffix) = kind.name_parts();
            return Err(Error::UnknownMesh(format!("{prefix}wISC{suffix}")));
        }
        Ok(Self {
            kind,
            ice_shelf_cavities,
        })
    }
}

impl fmt::Display for MeshName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, suffix) = self.kind.name_parts();
        let cavities = if self.ice_shelf_cavities { "wISC" } else { "" };
        write!(f, "{prefix}{cavities}{suffix}")
    }
}

impl FromStr for MeshName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MeshKind::ALL
            .iter()
            .flat_map(|&kind| [(kind, false), (kind, true)])
            .filter_map(|(kind, cavities)| MeshName::new(kind, cavities).ok())
            .find(|mesh| mesh.to_string() == s)
            .ok_or_else(|| Error::UnknownMesh(s.to_string()))
    }
}

/// Time integrators of the forward model.
/// 前向模型的时间积分器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum TimeIntegrator {
    #[serde(rename = "split_explicit")]
    SplitExplicit,
    #[serde(rename = "RK4")]
    Rk4,
}

impl TimeIntegrator {
    /// Namelist options selecting this integrator.
    pub fn namelist_options(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            TimeIntegrator::SplitExplicit => vec![("config_time_integrator", "'split_explicit'")],
            TimeIntegrator::Rk4 => vec![("config_time_integrator", "'RK4'"), ("config_dt", "'00:10:00'")],
        }
    }
}

impl fmt::Display for TimeIntegrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeIntegrator::SplitExplicit => f.write_str("split_explicit"),
            TimeIntegrator::Rk4 => f.write_str("RK4"),
        }
    }
}

/// Climatologies an ocean state can start from.
/// 海洋状态可以起始的气候态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitialCondition {
    Woa23,
    Phc,
    En4_1900,
}

impl InitialCondition {
    /// `(temperature, salinity)` files in the initial-condition database.
    pub fn database_files(&self) -> (&'static str, &'static str) {
        match self {
            InitialCondition::Woa23 => (
                "woa23_decav_0.25_jan_extrap.20230416.nc",
                "woa23_decav_0.25_jan_extrap.20230416.nc",
            ),
            InitialCondition::Phc => (
                "PotentialTemperature.01.filled.60levels.PHC.151106.nc",
                "Salinity.01.filled.60levels.PHC.151106.nc",
            ),
            InitialCondition::En4_1900 => ("EN4_1900_jan_temperature.nc", "EN4_1900_jan_salinity.nc"),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InitialCondition::Woa23 => "World Ocean Atlas 2023 climatology",
            InitialCondition::Phc => "Polar science center Hydrographic Climatology (PHC)",
            InitialCondition::En4_1900 => "Met Office Hadley Centre EN4 analysis for January 1900",
        }
    }
}

impl fmt::Display for InitialCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialCondition::Woa23 => f.write_str("WOA23"),
            InitialCondition::Phc => f.write_str("PHC"),
            InitialCondition::En4_1900 => f.write_str("EN4_1900"),
        }
    }
}

/// Which test cases [`add_tests`] builds for each mesh.
/// [`add_tests`] 为每个网格构建哪些测试用例。
#[derive(Debug, Clone)]
pub struct AddTestsOptions {
    pub mesh_names: Vec<MeshName>,
    /// Packaged dynamic-adjustment schedule, e.g. `qu240`. Without one the
    /// family stops at its forward tests and gets no E3SM files either.
    pub schedule: Option<String>,
    /// Variant of the schedule; `None` takes the schedule's default.
    pub schedule_variant: Option<String>,
    /// Remap topography in its own step instead of in init mode.
    pub high_res_topography: bool,
    pub include_rk4: bool,
    pub include_regression: bool,
    pub include_phc: bool,
    pub include_en4_1900: bool,
    pub include_data_ice_shelf_melt: bool,
    pub include_files_for_e3sm: bool,
}

impl AddTestsOptions {
    /// Meshes with remapped topography and the basic family: mesh, init,
    /// performance test, data ice-shelf melt for cavity meshes, dynamic
    /// adjustment and E3SM files.
    pub fn new(mesh_names: Vec<MeshName>, schedule: &str) -> Self {
        Self {
            schedule: Some(schedule.to_string()),
            ..Self::without_adjustment(mesh_names)
        }
    }

    /// Mesh, init and performance test (plus data ice-shelf melt for cavity
    /// meshes) for families that have no packaged dynamic-adjustment schedule.
    pub fn without_adjustment(mesh_names: Vec<MeshName>) -> Self {
        Self {
            mesh_names,
            schedule: None,
            schedule_variant: None,
            high_res_topography: true,
            include_rk4: false,
            include_regression: false,
            include_phc: false,
            include_en4_1900: false,
            include_data_ice_shelf_melt: true,
            include_files_for_e3sm: true,
        }
    }
}

/// Builds the test cases of every mesh in `options` into `group`.
///
/// 将 `options` 中每个网格的测试用例构建到 `group` 中。
pub fn add_tests(group: &mut TestGroup, options: &AddTestsOptions) -> Result<()> {
    let schedule = options
        .schedule
        .as_deref()
        .map(|name| Schedule::load(name, options.schedule_variant.as_deref()))
        .transpose()?;
    let default_ic = InitialCondition::Woa23;
    let default_ti = TimeIntegrator::SplitExplicit;

    for &mesh_name in &options.mesh_names {
        let mesh = mesh::add_mesh(group, mesh_name, options.high_res_topography)?;
        let with_cavities = mesh_name.ice_shelf_cavities;

        let mut initial_conditions = vec![default_ic];
        if options.include_phc {
            initial_conditions.push(InitialCondition::Phc);
        }
        if options.include_en4_1900 {
            initial_conditions.push(InitialCondition::En4_1900);
        }

        for (i, &ic) in initial_conditions.iter().enumerate() {
            let init = init::add_init(group, &mesh, ic)?;
            let is_default_ic = i == 0;

            forward::add_forward_test(group, &mesh, &init, default_ti, ForwardTest::Performance)?;
            if is_default_ic && options.include_regression {
                for test in ForwardTest::REGRESSION {
                    forward::add_forward_test(group, &mesh, &init, default_ti, test)?;
                }
            }

            let data_melt = if with_cavities && options.include_data_ice_shelf_melt {
                Some(forward::add_forward_test(
                    group,
                    &mesh,
                    &init,
                    default_ti,
                    ForwardTest::DataIceShelfMelt,
                )?)
            } else {
                None
            };

            if let Some(schedule) = &schedule {
                let adjustment =
                    dynamic_adjustment::add_dynamic_adjustment(group, &mesh, &init, default_ti, schedule)?;
                if options.include_files_for_e3sm {
                    files_for_e3sm::add_files_for_e3sm(group, &mesh, &init, &adjustment, data_melt)?;
                }
            }

            if is_default_ic && options.include_rk4 {
                for test in [
                    ForwardTest::Performance,
                    ForwardTest::Restart,
                    ForwardTest::Decomp,
                    ForwardTest::Threads,
                ] {
                    forward::add_forward_test(group, &mesh, &init, TimeIntegrator::Rk4, test)?;
                }
            }
        }
        debug!(mesh = %mesh_name, cases = group.len(), "added global ocean tests");
    }
    Ok(())
}

/// The global ocean test group as shipped.
/// 随框架发布的全球海洋测试组。
pub fn build() -> Result<TestGroup> {
    let mut group = TestGroup::new(MPAS_CORE, NAME)
        .with_description("Global initial conditions, regression testing and dynamic adjustment for MPAS-Ocean");

    // we do a lot of tests for QU240/QUwISC240
    let qu240 = AddTestsOptions {
        high_res_topography: false,
        include_rk4: true,
        include_regression: true,
        include_phc: true,
        include_en4_1900: true,
        ..AddTestsOptions::new(
            vec![
                MeshName::new(MeshKind::QU240, false)?,
                MeshName::new(MeshKind::Icos240, false)?,
                MeshName::new(MeshKind::QU240, true)?,
            ],
            "qu240",
        )
    };
    add_tests(&mut group, &qu240)?;

    // for other meshes, we do fewer tests
    let with_and_without_cavities = |kinds: &[MeshKind]| -> Result<Vec<MeshName>> {
        let mut names = Vec::new();
        for &kind in kinds {
            names.push(MeshName::new(kind, false)?);
            names.push(MeshName::new(kind, true)?);
        }
        Ok(names)
    };
    let others = with_and_without_cavities(&[
        MeshKind::QU,
        MeshKind::Icos,
        MeshKind::EC30to60,
        MeshKind::ARRM10to60,
        MeshKind::SO12to60,
        MeshKind::WC14,
        MeshKind::RRS6to18,
    ])?;
    add_tests(&mut group, &AddTestsOptions::without_adjustment(others))?;

    // Kuroshio meshes have no ice-shelf cavities
    let kuroshio = vec![
        MeshName::new(MeshKind::Kuroshio12to60, false)?,
        MeshName::new(MeshKind::Kuroshio8to60, false)?,
    ];
    add_tests(&mut group, &AddTestsOptions::without_adjustment(kuroshio))?;

    // FRIS meshes only get the path up to dynamic adjustment
    let fris = AddTestsOptions {
        include_data_ice_shelf_melt: false,
        include_files_for_e3sm: false,
        ..AddTestsOptions::new(with_and_without_cavities(&[MeshKind::FRIS01to60])?, "fris01to60")
    };
    add_tests(&mut group, &fris)?;

    let fris_coarser = AddTestsOptions {
        include_data_ice_shelf_melt: false,
        ..AddTestsOptions::without_adjustment(with_and_without_cavities(&[
            MeshKind::FRIS02to60,
            MeshKind::FRIS04to60,
            MeshKind::FRIS08to60,
        ])?)
    };
    add_tests(&mut group, &fris_coarser)?;

    files_for_e3sm::add_standalone(&mut group)?;
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_names_round_trip_through_display() {
        for name in ["QU240", "QUwISC240", "IcoswISC240", "ECwISC30to60", "FRISwISC01to60", "Kuroshio8to60"] {
            let mesh: MeshName = name.parse().unwrap();
            assert_eq!(mesh.to_string(), name);
        }
        assert!(matches!("KuroshiowISC12to60".parse::<MeshName>(), Err(Error::UnknownMesh(_))));
        assert!(matches!("QU241".parse::<MeshName>(), Err(Error::UnknownMesh(_))));
    }
}
