//! # Packaged Resources Module / 打包资源模块
//!
//! Config files, namelist and streams templates and other small inputs that
//! ship with the framework. They are compiled into the binary, so a test case
//! never depends on where the source tree lives.
//!
//! 随框架一起发布的配置文件、namelist 和 streams 模板以及其他小型输入。
//! 它们被编译进二进制文件中，因此测试用例不依赖源代码树的位置。

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::core::error::{Error, Result};

macro_rules! packaged {
    ($package:literal, $name:literal) => {
        (
            $package,
            $name,
            include_str!(concat!("../../resources/", $package, "/", $name)),
        )
    };
}

static PACKAGED: &[(&str, &str, &str)] = &[
    packaged!("framework", "default.toml"),
    packaged!("mesh", "mesh.toml"),
    packaged!("ocean/mesh", "remap_topography.toml"),
    packaged!("ocean/global_ocean", "global_ocean.toml"),
    packaged!("ocean/global_ocean", "namelist.init"),
    packaged!("ocean/global_ocean", "namelist.forward"),
    packaged!("ocean/global_ocean", "streams.init"),
    packaged!("ocean/global_ocean", "streams.forward"),
    packaged!("ocean/global_ocean", "mesh/qu240.toml"),
    packaged!("ocean/global_ocean", "mesh/qu.toml"),
    packaged!("ocean/global_ocean", "mesh/icos.toml"),
    packaged!("ocean/global_ocean", "mesh/ec30to60.toml"),
    packaged!("ocean/global_ocean", "mesh/arrm10to60.toml"),
    packaged!("ocean/global_ocean", "mesh/so12to60.toml"),
    packaged!("ocean/global_ocean", "mesh/wc14.toml"),
    packaged!("ocean/global_ocean", "mesh/rrs6to18.toml"),
    packaged!("ocean/global_ocean", "mesh/kuroshio.toml"),
    packaged!("ocean/global_ocean", "mesh/kuroshio12to60.toml"),
    packaged!("ocean/global_ocean", "mesh/kuroshio8to60.toml"),
    packaged!("ocean/global_ocean", "mesh/fris01to60.toml"),
    packaged!("ocean/global_ocean", "mesh/fris02to60.toml"),
    packaged!("ocean/global_ocean", "mesh/fris04to60.toml"),
    packaged!("ocean/global_ocean", "mesh/fris08to60.toml"),
    packaged!("ocean/global_ocean", "dynamic_adjustment/qu240.toml"),
    packaged!("ocean/global_ocean", "dynamic_adjustment/fris01to60.toml"),
    packaged!("ocean/drying_slope", "drying_slope.toml"),
    packaged!("ocean/drying_slope", "namelist.init"),
    packaged!("ocean/drying_slope", "namelist.forward"),
    packaged!("ocean/drying_slope", "streams.init"),
    packaged!("ocean/drying_slope", "streams.forward"),
    packaged!("ocean/hurricane", "hurricane.toml"),
    packaged!("ocean/hurricane", "mesh/dequ120at30cr10rr2.toml"),
    packaged!("landice/humboldt", "humboldt.toml"),
    packaged!("landice/humboldt", "namelist.landice"),
    packaged!("landice/humboldt", "streams.landice.template"),
    packaged!("landice/humboldt", "albany_input.yaml"),
    packaged!("landice/humboldt", "Humboldt.geojson"),
    packaged!("landice/greenland", "greenland.toml"),
    packaged!("landice/greenland", "greenland_only_outline.geojson"),
    packaged!("landice/thwaites", "thwaites.toml"),
    packaged!("landice/thwaites", "namelist.landice"),
    packaged!("landice/thwaites", "streams.landice"),
    packaged!("landice/thwaites", "Thwaites.geojson"),
];

static INDEX: Lazy<BTreeMap<(&'static str, &'static str), &'static str>> = Lazy::new(|| {
    PACKAGED
        .iter()
        .map(|(package, name, text)| ((*package, *name), *text))
        .collect()
});

/// Returns the contents of a packaged file.
/// 返回打包文件的内容。
pub fn read(package: &str, name: &str) -> Result<&'static str> {
    INDEX
        .iter()
        .find(|((p, n), _)| *p == package && *n == name)
        .map(|(_, text)| *text)
        .ok_or_else(|| Error::MissingResource {
            package: package.to_string(),
            name: name.to_string(),
        })
}

pub fn exists(package: &str, name: &str) -> bool {
    read(package, name).is_ok()
}

/// Names of every file shipped in `package`.
pub fn list(package: &str) -> Vec<&'static str> {
    INDEX
        .keys()
        .filter(|(p, _)| *p == package)
        .map(|(_, name)| *name)
        .collect()
}
