//! # Templates Module / 模板模块
//!
//! Fortran namelists and streams templates. A namelist template is parsed,
//! options are replaced one by one (an option the template does not define is
//! an error, which catches typos early) and the result is rendered back to
//! text. Streams templates are plain text with `{{ token }}` placeholders.
//!
//! Fortran namelist 与 streams 模板。namelist 模板被解析后逐个替换选项
//! （模板中未定义的选项会报错，从而尽早发现拼写错误），再渲染回文本。
//! streams 模板是带有 `{{ token }}` 占位符的纯文本。

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::core::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamelistGroup {
    name: String,
    options: Vec<(String, String)>,
}

/// A parsed Fortran namelist file, keeping group and option order.
/// 解析后的 Fortran namelist 文件，保留组与选项的顺序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namelist {
    template: String,
    groups: Vec<NamelistGroup>,
}

impl Namelist {
    /// Parses namelist text. `template` names the source in error messages.
    ///
    /// 解析 namelist 文本。`template` 用于在错误消息中指明来源。
    pub fn parse(template: &str, text: &str) -> Result<Self> {
        let malformed = |line_no: usize, message: &str| Error::InvalidTemplate {
            template: template.to_string(),
            message: format!("line {}: {message}", line_no + 1),
        };

        let mut groups = Vec::new();
        let mut current: Option<NamelistGroup> = None;

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('!') {
                continue;
            }
            if let Some(name) = line.strip_prefix('&') {
                if current.is_some() {
                    return Err(malformed(line_no, "group opened before the previous one was closed"));
                }
                current = Some(NamelistGroup {
                    name: name.trim().to_string(),
                    options: Vec::new(),
                });
            } else if line == "/" {
                let group = current
                    .take()
                    .ok_or_else(|| malformed(line_no, "'/' outside of a group"))?;
                groups.push(group);
            } else {
                let group = current
                    .as_mut()
                    .ok_or_else(|| malformed(line_no, "option outside of a group"))?;
                let (key, value) = line
                    .split_once('=')
                    .ok_or_else(|| malformed(line_no, "expected 'option = value'"))?;
                group
                    .options
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        if current.is_some() {
            return Err(Error::InvalidTemplate {
                template: template.to_string(),
                message: "last group is not closed".to_string(),
            });
        }

        Ok(Self {
            template: template.to_string(),
            groups,
        })
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.groups
            .iter()
            .flat_map(|group| group.options.iter())
            .find(|(key, _)| key == option)
            .map(|(_, value)| value.as_str())
    }

    /// Replaces the value of an existing option.
    /// 替换已有选项的值。
    pub fn set(&mut self, option: &str, value: &str) -> Result<()> {
        let slot = self
            .groups
            .iter_mut()
            .flat_map(|group| group.options.iter_mut())
            .find(|(key, _)| key == option)
            .ok_or_else(|| Error::UnknownNamelistOption {
                template: self.template.clone(),
                option: option.to_string(),
            })?;
        slot.1 = value.to_string();
        Ok(())
    }

    pub fn apply(&mut self, options: &BTreeMap<String, String>) -> Result<()> {
        for (option, value) in options {
            self.set(option, value)?;
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            let _ = writeln!(out, "&{}", group.name);
            for (key, value) in &group.options {
                let _ = writeln!(out, "    {key} = {value}");
            }
            out.push_str("/\n");
        }
        out
    }
}

/// Replaces every `{{ token }}` in `text`. A token without a replacement is an
/// error; an unclosed `{{` is copied through unchanged.
///
/// 替换 `text` 中的每个 `{{ token }}`。没有替换值的 token 会报错；未闭合的 `{{` 原样保留。
pub fn render_template(
    template: &str,
    text: &str,
    replacements: &BTreeMap<String, String>,
) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let token = rest[start + 2..start + 2 + len].trim();
        let value = replacements
            .get(token)
            .ok_or_else(|| Error::UnresolvedToken {
                template: template.to_string(),
                token: token.to_string(),
            })?;
        out.push_str(value);
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
