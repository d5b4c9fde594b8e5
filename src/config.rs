use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// CLI 运行配置（TOML）。
///
/// ```toml
/// dataset = "kitti"
/// root = "/data/kitti/kitti_data"
/// preload = ["calib"]
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct FinderConfig {
    /// 布局名（kitti / waymo）
    pub dataset: String,
    /// 数据集根目录
    pub root: PathBuf,
    /// 预载路径表的 aggregate modality；省略时用 layout 默认值
    #[serde(default)]
    pub preload: Option<Vec<String>>,
}

impl FinderConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config `{}`", path.display()))?;
        let cfg = toml::from_str(&text)
            .with_context(|| format!("parse config `{}`", path.display()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg: FinderConfig = toml::from_str(
            r#"
            dataset = "waymo"
            root = "/data/waymo_kitti/training"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dataset, "waymo");
        assert_eq!(cfg.root, PathBuf::from("/data/waymo_kitti/training"));
        assert!(cfg.preload.is_none());
    }

    #[test]
    fn parses_explicit_preload() {
        let cfg: FinderConfig = toml::from_str(
            r#"
            dataset = "kitti"
            root = "/data/kitti"
            preload = ["calib", "T_rgb"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.preload.unwrap(), vec!["calib", "T_rgb"]);
    }
}
