//! # Input Database Module / 输入数据库模块
//!
//! Large input datasets (topography, observations, forcing) live in a local
//! cache laid out as `<database_root>/<mpas_core>/<database>/<target>`. A file
//! missing from the cache is downloaded from the public server when downloads
//! are enabled.
//!
//! 大型输入数据集（地形、观测、强迫场）存放在本地缓存中，布局为
//! `<database_root>/<mpas_core>/<database>/<target>`。若缓存中缺少文件且允许下载，
//! 则从公共服务器下载。

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::config::ConfigCascade;
use crate::core::error::{Error, Result};

/// Where the cache lives and whether it may be filled from the network.
/// 缓存的位置以及是否允许从网络填充。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub root: PathBuf,
    pub server_base_url: String,
    pub download_enabled: bool,
}

impl DatabaseSettings {
    /// Reads `[paths] database_root` and the `[download]` section.
    pub fn from_config(config: &ConfigCascade) -> Result<Self> {
        let raw_root = config.get_str("paths", "database_root")?;
        let root = shellexpand::tilde(&raw_root).into_owned();
        Ok(Self {
            root: PathBuf::from(root),
            server_base_url: config.get_str("download", "server_base_url")?,
            download_enabled: config.get_bool("download", "enabled")?,
        })
    }

    pub fn local_path(&self, mpas_core: &str, database: &str, target: &str) -> PathBuf {
        self.root.join(mpas_core).join(database).join(target)
    }

    pub fn url(&self, mpas_core: &str, database: &str, target: &str) -> String {
        format!(
            "{}/{mpas_core}/{database}/{target}",
            self.server_base_url.trim_end_matches('/')
        )
    }

    /// Returns the cached path of a database file, downloading it first if needed.
    ///
    /// `step` is only used to report a missing file when downloads are off.
    ///
    /// 返回数据库文件的缓存路径，必要时先下载。
    /// `step` 仅用于在禁用下载时报告缺失的文件。
    pub async fn fetch(&self, step: &str, mpas_core: &str, database: &str, target: &str) -> Result<PathBuf> {
        let path = self.local_path(mpas_core, database, target);
        if path.exists() {
            return Ok(path);
        }
        if !self.download_enabled {
            return Err(Error::MissingDependency {
                step: step.to_string(),
                path,
            });
        }

        let url = self.url(mpas_core, database, target);
        info!(%url, "downloading database file");
        download(&url, &path).await?;
        Ok(path)
    }
}

/// Streams `url` into a temporary file next to `dest` and renames it into
/// place, so an interrupted download never leaves a truncated file behind.
///
/// 将 `url` 流式写入 `dest` 旁边的临时文件，再重命名到位，
/// 这样中断的下载不会留下截断的文件。
async fn download(url: &str, dest: &Path) -> Result<()> {
    let failed = |message: String| Error::Download {
        url: url.to_string(),
        message,
    };

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    crate::infra::fs::ensure_dir(parent)?;

    let mut response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| failed(e.to_string()))?;

    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        file.write_all(&chunk).map_err(|e| Error::io(dest, e))?;
    }
    file.persist(dest).map_err(|e| Error::io(dest, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(root: &Path, download_enabled: bool) -> DatabaseSettings {
        DatabaseSettings {
            root: root.to_path_buf(),
            server_base_url: "https://example.invalid/data/".to_string(),
            download_enabled,
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let s = settings(Path::new("/cache"), true);
        assert_eq!(
            s.url("ocean", "bathymetry_database", "topo.nc"),
            "https://example.invalid/data/ocean/bathymetry_database/topo.nc"
        );
    }

    #[tokio::test]
    async fn test_fetch_prefers_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), false);
        let cached = s.local_path("landice", "humboldt", "forcing.nc");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, "data").unwrap();

        let path = s.fetch("run_model", "landice", "humboldt", "forcing.nc").await.unwrap();
        assert_eq!(path, cached);
    }

    #[tokio::test]
    async fn test_fetch_without_downloads_reports_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), false);
        let err = s.fetch("run_model", "landice", "humboldt", "absent.nc").await.unwrap_err();
        assert!(matches!(err, Error::MissingDependency { .. }));
    }
}
