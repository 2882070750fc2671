//! # Config Cascade Unit Tests / 配置级联单元测试
//!
//! Layer precedence, typed reads, freezing and the packaged defaults.
//! 层优先级、类型化读取、冻结以及打包的默认值。

use compass_runner::core::config::{ConfigCascade, ConfigLayer};
use compass_runner::core::error::Error;

fn cascade(layers: &[&str]) -> ConfigCascade {
    let mut config = ConfigCascade::new();
    for (i, text) in layers.iter().enumerate() {
        config
            .add_layer(ConfigLayer::from_toml_str(format!("layer{i}"), text).unwrap())
            .unwrap();
    }
    config
}

#[test]
fn test_last_layer_wins() {
    let config = cascade(&["[forward]\nntasks = 4\ndt = 10.0", "[forward]\nntasks = 16"]);
    assert_eq!(config.get_int("forward", "ntasks").unwrap(), 16);
    assert_eq!(config.get_float("forward", "dt").unwrap(), 10.0);
    assert_eq!(config.version(), 2);
}

#[test]
fn test_missing_and_invalid_options() {
    let config = cascade(&["[forward]\nntasks = \"many\""]);
    assert!(matches!(
        config.get_int("forward", "threads"),
        Err(Error::MissingOption { .. })
    ));
    assert!(matches!(
        config.get::<u32>("forward", "ntasks"),
        Err(Error::InvalidOption { .. })
    ));
    assert_eq!(config.get_or::<u32>("forward", "threads", 2).unwrap(), 2);
}

#[test]
fn test_booleans_accept_common_spellings() {
    let config = cascade(&["[flags]\na = \"Yes\"\nb = \"off\"\nc = true\nd = \"maybe\""]);
    assert!(config.get_bool("flags", "a").unwrap());
    assert!(!config.get_bool("flags", "b").unwrap());
    assert!(config.get_bool("flags", "c").unwrap());
    assert!(config.get_bool("flags", "d").is_err());
}

#[test]
fn test_arrays_read_back_as_lists() {
    let config = cascade(&["[mesh]\nnames = [\"QU240\", \"Icos240\"]"]);
    assert_eq!(config.get_list("mesh", "names").unwrap(), vec!["QU240", "Icos240"]);
}

#[test]
fn test_options_outside_sections_are_rejected() {
    let err = ConfigLayer::from_toml_str("bad", "ntasks = 4").unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));
    let err = ConfigLayer::from_toml_str("bad", "[a]\n[a.b]\nc = 1").unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));
}

#[test]
fn test_frozen_cascade_refuses_layers() {
    let mut config = cascade(&["[a]\nb = 1"]);
    config.freeze();
    assert!(config.is_frozen());
    assert!(matches!(config.set("a", "b", 2), Err(Error::FrozenConfig { .. })));
    assert_eq!(config.get_int("a", "b").unwrap(), 1);
    assert_eq!(config.version(), 1);
}

#[test]
fn test_packaged_defaults_define_framework_options() {
    let mut config = ConfigCascade::new();
    config.add_from_package("framework", "default.toml").unwrap();
    assert_eq!(config.get_int("execution", "step_timeout_secs").unwrap(), 0);
    assert_eq!(config.get_str("executables", "partition").unwrap(), "gpmetis");
    assert!(config.get_bool("download", "enabled").unwrap());
    assert!(matches!(
        config.add_from_package("framework", "missing.toml"),
        Err(Error::MissingResource { .. })
    ));
}

#[test]
fn test_merged_config_round_trips_through_toml() {
    let config = cascade(&["[a]\nx = 1\ny = \"two\"", "[a]\nx = 3\n[b]\nz = true"]);
    let text = config.to_toml_string().unwrap();
    let reread = cascade(&[text.as_str()]);
    assert_eq!(reread.get_int("a", "x").unwrap(), 3);
    assert_eq!(reread.get_str("a", "y").unwrap(), "two");
    assert!(reread.get_bool("b", "z").unwrap());
}
