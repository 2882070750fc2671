//! # Template Unit Tests / 模板单元测试

use std::collections::BTreeMap;

use compass_runner::core::error::Error;
use compass_runner::core::templates::{Namelist, render_template};

const NAMELIST: &str = "\
! comment
&time_management
    config_dt = '00:30:00'
    config_run_duration = '0000_01:00:00'
/
&decomposition
    config_num_halos = 3
/
";

#[test]
fn test_namelist_replaces_existing_options() {
    let mut namelist = Namelist::parse("test", NAMELIST).unwrap();
    namelist.set("config_dt", "'00:10:00'").unwrap();
    let text = namelist.render();
    assert!(text.contains("    config_dt = '00:10:00'\n"));
    assert!(text.contains("&decomposition\n    config_num_halos = 3\n/\n"));
    assert!(!text.contains("comment"));
}

#[test]
fn test_namelist_rejects_unknown_option() {
    let mut namelist = Namelist::parse("test", NAMELIST).unwrap();
    let err = namelist.set("config_dtt", "1").unwrap_err();
    assert!(matches!(err, Error::UnknownNamelistOption { ref option, .. } if option == "config_dtt"));
}

#[test]
fn test_namelist_reports_unclosed_group() {
    let err = Namelist::parse("broken", "&a\n  x = 1\n").unwrap_err();
    assert!(matches!(err, Error::InvalidTemplate { .. }));
    let err = Namelist::parse("broken", "x = 1\n").unwrap_err();
    assert!(matches!(err, Error::InvalidTemplate { .. }));
}

#[test]
fn test_streams_tokens_are_replaced() {
    let mut replacements = BTreeMap::new();
    replacements.insert("output_interval".to_string(), "0000_01:00:00".to_string());
    let text = render_template("streams", "interval=\"{{ output_interval }}\"", &replacements).unwrap();
    assert_eq!(text, "interval=\"0000_01:00:00\"");
}

#[test]
fn test_streams_token_without_replacement_fails() {
    let err = render_template("streams", "{{ restart_interval }}", &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedToken { ref token, .. } if token == "restart_interval"));
}
