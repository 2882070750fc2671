//! # Configuration Cascade Module / 配置级联模块
//!
//! Layered, sectioned key/value configuration. Each layer comes from a packaged
//! default file, a user file or an explicit override; reads scan the layers from
//! the most recently added one backwards, so the last layer to define an option
//! wins. Values are kept as strings and converted on read.
//!
//! 分层、分节的键值配置。每一层来自打包的默认文件、用户文件或显式覆盖；
//! 读取时从最近添加的层向前扫描，因此最后定义某个选项的层生效。
//! 值以字符串形式保存，并在读取时转换。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::error::{Error, Result};
use crate::infra::resources;

/// The options of one section, keyed by option name.
/// 单个节中的选项，以选项名为键。
pub type Section = BTreeMap<String, String>;

/// A single named layer of options.
/// 单个命名的选项层。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    name: String,
    sections: BTreeMap<String, Section>,
}

impl ConfigLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: BTreeMap::new(),
        }
    }

    /// Parses a layer from INI-style text written in TOML syntax.
    ///
    /// Every top-level key must be a `[section]` table of scalars (or arrays of
    /// scalars, which are stored comma-separated).
    ///
    /// 从以 TOML 语法编写的 INI 风格文本解析一个层。
    /// 每个顶层键都必须是由标量（或标量数组，以逗号分隔存储）组成的 `[section]` 表。
    pub fn from_toml_str(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let table: toml::Table = toml::from_str(text).map_err(|e| Error::InvalidLayer {
            layer: name.clone(),
            message: e.to_string(),
        })?;

        let mut layer = ConfigLayer::new(name);
        for (section, value) in table {
            let toml::Value::Table(options) = value else {
                return Err(Error::InvalidLayer {
                    layer: layer.name.clone(),
                    message: format!("option '{section}' is not inside a section"),
                });
            };
            for (key, value) in options {
                let Some(text) = scalar_to_string(&value) else {
                    return Err(Error::InvalidLayer {
                        layer: layer.name.clone(),
                        message: format!("[{section}] {key} is a nested table"),
                    });
                };
                layer.insert(&section, &key, text);
            }
        }
        Ok(layer)
    }

    /// Builder-style insert, handy for override layers.
    pub fn with_option(mut self, section: &str, key: &str, value: impl ToString) -> Self {
        self.insert(section, key, value);
        self
    }

    pub fn insert(&mut self, section: &str, key: &str, value: impl ToString) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|options| options.get(key))
            .map(String::as_str)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.sections.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(", ")),
        toml::Value::Table(_) => None,
    }
}

/// A type an option value can be read as.
/// 选项值可以被读取成的类型。
pub trait OptionValue: Sized {
    /// Human-readable name used in error messages.
    const EXPECTED: &'static str;

    fn parse_option(raw: &str) -> Option<Self>;
}

impl OptionValue for String {
    const EXPECTED: &'static str = "string";

    fn parse_option(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl OptionValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn parse_option(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

macro_rules! numeric_option {
    ($($ty:ty => $expected:literal),* $(,)?) => {
        $(
            impl OptionValue for $ty {
                const EXPECTED: &'static str = $expected;

                fn parse_option(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

numeric_option! {
    i64 => "integer",
    u32 => "non-negative integer",
    u64 => "non-negative integer",
    usize => "non-negative integer",
    f64 => "float",
}

/// An ordered list of option layers with last-added-wins lookup.
///
/// The cascade carries a version counter that increases with every added
/// layer, and can be frozen once a test case starts running its steps; a
/// frozen cascade refuses new layers.
///
/// 有序的选项层列表，查找时最后添加的层优先。
/// 级联带有一个版本计数器，每添加一层就递增；一旦测试用例开始运行步骤即可冻结，
/// 冻结后的级联拒绝新的层。
#[derive(Debug, Clone, Default)]
pub struct ConfigCascade {
    layers: Vec<ConfigLayer>,
    frozen: bool,
    version: u64,
}

impl ConfigCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer on top of the existing ones.
    /// 在现有层之上追加一层。
    pub fn add_layer(&mut self, layer: ConfigLayer) -> Result<()> {
        if self.frozen {
            return Err(Error::FrozenConfig {
                layer: layer.name().to_string(),
            });
        }
        debug!(layer = layer.name(), version = self.version + 1, "adding config layer");
        self.layers.push(layer);
        self.version += 1;
        Ok(())
    }

    /// Adds a layer from a config file compiled into the binary.
    pub fn add_from_package(&mut self, package: &str, name: &str) -> Result<()> {
        let text = resources::read(package, name)?;
        let layer = ConfigLayer::from_toml_str(format!("{package}/{name}"), text)?;
        self.add_layer(layer)
    }

    /// Adds a layer from a config file on disk.
    pub fn add_from_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let layer = ConfigLayer::from_toml_str(path.display().to_string(), &text)?;
        self.add_layer(layer)
    }

    /// Overrides a single option. Same as adding a one-option layer on top.
    /// 覆盖单个选项。等同于在顶部添加一个只含一个选项的层。
    pub fn set(&mut self, section: &str, key: &str, value: impl ToString) -> Result<()> {
        let layer = ConfigLayer::new(format!("set [{section}] {key}")).with_option(section, key, value);
        self.add_layer(layer)
    }

    /// Raw lookup of the effective value.
    pub fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(section, key))
    }

    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.lookup(section, key).is_some()
    }

    /// Resolves an option and converts it to `T`.
    ///
    /// Fails with [`Error::MissingOption`] when no layer defines the option and
    /// with [`Error::InvalidOption`] when the value does not convert.
    ///
    /// 解析一个选项并将其转换为 `T`。
    /// 若没有任何层定义该选项则返回 [`Error::MissingOption`]，
    /// 若值无法转换则返回 [`Error::InvalidOption`]。
    pub fn get<T: OptionValue>(&self, section: &str, key: &str) -> Result<T> {
        let raw = self.lookup(section, key).ok_or_else(|| Error::MissingOption {
            section: section.to_string(),
            key: key.to_string(),
        })?;
        T::parse_option(raw).ok_or_else(|| Error::InvalidOption {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            expected: T::EXPECTED,
        })
    }

    /// Like [`ConfigCascade::get`], but a missing option yields `default`.
    pub fn get_or<T: OptionValue>(&self, section: &str, key: &str, default: T) -> Result<T> {
        if self.has_option(section, key) {
            self.get(section, key)
        } else {
            Ok(default)
        }
    }

    pub fn get_str(&self, section: &str, key: &str) -> Result<String> {
        self.get(section, key)
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64> {
        self.get(section, key)
    }

    pub fn get_float(&self, section: &str, key: &str) -> Result<f64> {
        self.get(section, key)
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool> {
        self.get(section, key)
    }

    /// Reads a comma-separated option as a list, skipping empty items.
    pub fn get_list(&self, section: &str, key: &str) -> Result<Vec<String>> {
        let raw: String = self.get(section, key)?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// Flattens every layer into the effective set of options.
    /// 将所有层展平为最终生效的选项集。
    pub fn merged(&self) -> BTreeMap<String, Section> {
        let mut merged: BTreeMap<String, Section> = BTreeMap::new();
        for layer in &self.layers {
            for (section, options) in layer.sections() {
                let target = merged.entry(section.clone()).or_default();
                for (key, value) in options {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// Renders the merged options back to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(&self.merged()).map_err(|e| Error::InvalidLayer {
            layer: "merged".to_string(),
            message: e.to_string(),
        })
    }

    /// Writes the merged options to `path`, creating parent directories.
    /// 将合并后的选项写入 `path`，并创建父目录。
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.to_toml_string()?;
        crate::infra::fs::write_file(path, &text)
    }
}
