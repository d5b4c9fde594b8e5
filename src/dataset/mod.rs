pub mod kitti;
pub mod waymo;

pub use kitti::*;
pub use waymo::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Coordinate, Level, LevelValue};
use crate::error::{FinderError, Result};
use crate::index::LevelTree;

/// 单一路径或一组路径（calib 等 aggregate modality 每个 outer 坐标
/// 可对应多个组成文件）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v).iter(),
            OneOrMany::Many(v) => v.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> OneOrMany<U> {
        match self {
            OneOrMany::One(v) => OneOrMany::One(f(v)),
            OneOrMany::Many(v) => OneOrMany::Many(v.into_iter().map(f).collect()),
        }
    }
}

/// 一类数据文件（modality）的描述符。
///
/// - `required`：文法消费的层级（按全局 level 顺序）。render 只取这些字段，
///   更深/其余字段一律忽略；缺失则报 `MissingField`。
/// - `aggregate`：单文件覆盖多个坐标（此时 `required` 是 level 列表的真前缀，
///   其长度即该 modality 的 outer 深度）。
/// - `inner`：aggregate 文件内部寻址的层级（如每 date 一个 calib 文件、
///   内含各 side 的标定块）。
#[derive(Clone, Copy, Debug)]
pub struct Modality {
    pub name: &'static str,
    pub required: &'static [Level],
    pub aggregate: bool,
    pub inner: Option<Level>,
}

/// 文法 parse 的结果：扩展名 + 解析出的坐标
/// （文法未消费的层级保持缺席）。
#[derive(Clone, Debug)]
pub struct ParsedName {
    pub ext: String,
    pub coord: Coordinate,
}

/// 数据集布局插件：层级列表 + 文件系统扫描 + 每 modality 的文件名文法。
///
/// ## 契约
/// - `scan` 是索引构建期唯一的磁盘 I/O；必须枚举各层实际存在的目录/文件，
///   缺失预期目录以 `Scan` 失败（fail-fast，不产出部分索引）。
/// - `parse` / `render` 对任何 `parse` 可产出的坐标互为精确逆：
///   分隔符、零填充宽度、扩展名逐字节一致。
pub trait DatasetLayout {
    fn name(&self) -> &'static str;

    /// 全局唯一有效的层级顺序。
    fn levels(&self) -> &'static [Level];

    fn modalities(&self) -> &'static [Modality];

    /// 构造时默认预载路径表的 modality 集合。
    fn default_preload(&self) -> &'static [&'static str];

    fn scan(&self, root: &Path) -> Result<LevelTree>;

    /// 相对路径 -> (扩展名, 坐标)。
    fn parse(&self, modality: &Modality, rel: &str) -> Result<ParsedName>;

    /// 坐标 -> 相对路径（或 aggregate 的一组组成文件路径）。
    fn render(&self, modality: &Modality, coord: &Coordinate) -> Result<OneOrMany<String>>;

    fn modality(&self, name: &str) -> Result<&'static Modality> {
        self.modalities()
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| FinderError::UnrecognizedModality(name.to_string()))
    }
}

/// 按名字选择布局。
pub fn create_layout(name: &str) -> Option<Box<dyn DatasetLayout>> {
    match name {
        "kitti" => Some(Box::new(KittiLayout::new())),
        "waymo" => Some(Box::new(WaymoLayout::new())),
        _ => None,
    }
}

fn scan_err(path: &Path, source: std::io::Error) -> FinderError {
    FinderError::Scan {
        path: path.to_path_buf(),
        source,
    }
}

/// 列出 `dir` 下的子目录名（排序后）。
pub(crate) fn scan_subdirs(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| scan_err(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| scan_err(dir, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| scan_err(&entry.path(), e))?
            .is_dir();
        if !is_dir {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => {
                return Err(scan_err(
                    dir,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("non-UTF-8 directory name {raw:?}"),
                    ),
                ))
            }
        }
    }
    names.sort();
    Ok(names)
}

/// 列出 `dir` 下帧文件的数字 id（文件名主干解析为整数，排序后）。
/// 非数字文件名视为数据错误而非静默跳过。
pub(crate) fn scan_frame_ids(dir: &Path) -> Result<Vec<LevelValue>> {
    let entries = std::fs::read_dir(dir).map_err(|e| scan_err(dir, e))?;
    let mut fids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| scan_err(dir, e))?;
        let path = entry.path();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let fid = stem.parse::<u64>().map_err(|_| {
            scan_err(
                dir,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("non-numeric frame file `{}`", path.display()),
                ),
            )
        })?;
        fids.push(LevelValue::Num(fid));
    }
    fids.sort();
    Ok(fids)
}

/// 去掉扩展名：`a/b/c.ext` -> (`a/b/c`, `ext`)。
pub(crate) fn split_ext(rel: &str) -> Option<(&str, &str)> {
    rel.rsplit_once('.')
}
