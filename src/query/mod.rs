use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{Coordinate, Level, LevelValue};
use crate::dataset::{DatasetLayout, OneOrMany};
use crate::error::{FinderError, Result};
use crate::index::{HierarchyIndex, LevelTree};

/// aggregate modality 的预载路径表：outer 坐标 -> 组成文件路径。
pub type PathTable = BTreeMap<Coordinate, OneOrMany<PathBuf>>;

/// 坐标 <-> 路径双向翻译器。
///
/// 构造时做唯一一次磁盘扫描并冻结索引；之后所有操作是纯函数。
/// 跨 modality 对齐（用 A 的文法 parse、用 B 的文法 render）是对外的
/// 核心价值：渲染结果与各文法逐字节一致（分隔符 / 零填充 / 扩展名）。
pub struct DataFinder {
    root: PathBuf,
    layout: Box<dyn DatasetLayout>,
    index: HierarchyIndex,
    preload: BTreeMap<String, PathTable>,
}

impl std::fmt::Debug for DataFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFinder")
            .field("root", &self.root)
            .field("layout", &self.layout.name())
            .field("index", &self.index)
            .field("preload", &self.preload)
            .finish()
    }
}

impl DataFinder {
    /// 扫描 `root` 并为 `preload` 中的 aggregate modality 预建路径表。
    /// 扫描失败整体中止，不产出部分可用的 finder。
    pub fn open(
        root: impl Into<PathBuf>,
        layout: Box<dyn DatasetLayout>,
        preload: &[&str],
    ) -> Result<Self> {
        let root = root.into();
        tracing::info!("building `{}` index at `{}`", layout.name(), root.display());
        let tree = layout.scan(&root)?;
        let index = HierarchyIndex::new(layout.levels(), tree);

        let mut finder = Self {
            root,
            layout,
            index,
            preload: BTreeMap::new(),
        };
        for &name in preload {
            let table = finder.build_path_table(name)?;
            tracing::debug!("preloaded `{}`: {} outer coordinates", name, table.len());
            finder.preload.insert(name.to_string(), table);
        }
        Ok(finder)
    }

    /// `open`，预载集合取 layout 的默认值。
    pub fn open_default(root: impl Into<PathBuf>, layout: Box<dyn DatasetLayout>) -> Result<Self> {
        let preload = layout.default_preload().to_vec();
        Self::open(root, layout, &preload)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &dyn DatasetLayout {
        self.layout.as_ref()
    }

    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    /// 路径 -> 坐标。`path` 带数据集根前缀时先剥掉；
    /// 文法未消费的层级在结果中保持缺席。
    pub fn coord_from_path(&self, path: impl AsRef<Path>, modality: &str) -> Result<Coordinate> {
        let m = self.layout.modality(modality)?;
        let path = path.as_ref();
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let rel = rel.to_str().ok_or_else(|| FinderError::Parse {
            modality: modality.to_string(),
            path: path.display().to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        Ok(self.layout.parse(m, rel)?.coord)
    }

    /// 坐标 -> 路径（根在前）。目标 modality 文法只取其声明的字段，
    /// 其余一律忽略；缺必需字段报 `MissingField`。
    pub fn paths_from_coord(
        &self,
        coord: &Coordinate,
        modality: &str,
    ) -> Result<OneOrMany<PathBuf>> {
        let m = self.layout.modality(modality)?;
        let rendered = self.layout.render(m, coord)?;
        Ok(rendered.map(|rel| self.root.join(rel)))
    }

    /// 与部分坐标一致的 `target` 层全部有效取值。
    ///
    /// 已指定字段必须构成不深于 `target` 的连续前缀（深于 / 乱序报
    /// `LevelOrder`）；与 `target` 同层的字段不作为 key。中间缺席层按
    /// 填充策略任取一个存在的 key（要具体中间值的调用方自己指定）。
    pub fn values_at_level(&self, coord: &Coordinate, target: Level) -> Result<Vec<LevelValue>> {
        let levels = self.layout.levels();
        let target_depth = self.index.depth_of(target)?;

        let mut keys = Vec::new();
        for (depth, &level) in levels.iter().enumerate() {
            let Some(value) = coord.value_of(level) else {
                continue;
            };
            if depth > target_depth {
                return Err(FinderError::LevelOrder(format!(
                    "target level `{target}` is shallower than specified field `{level}`"
                )));
            }
            if depth == target_depth {
                continue;
            }
            if depth != keys.len() {
                return Err(FinderError::LevelOrder(format!(
                    "specified fields are not a contiguous prefix: `{level}` is set but `{}` is not",
                    levels[keys.len()]
                )));
            }
            keys.push(value);
        }
        self.index.children_at(&keys, target_depth)
    }

    /// 返回恰好含 `wanted` 字段的新坐标（自动整理成全局 level 顺序）。
    /// 输入里缺席的 wanted 字段从索引取一个与左侧已解析字段一致的有效值，
    /// 从左到右处理，每次填充只看得到已解析的字段。幂等。
    pub fn fill_defaults(&self, coord: &Coordinate, wanted: &[Level]) -> Result<Coordinate> {
        let mut ordered: Vec<(usize, Level)> = Vec::with_capacity(wanted.len());
        for &level in wanted {
            let depth = self.index.depth_of(level)?;
            if !ordered.iter().any(|&(d, _)| d == depth) {
                ordered.push((depth, level));
            }
        }
        ordered.sort_by_key(|&(d, _)| d);

        let mut out = Coordinate::new();
        let mut pinned: BTreeMap<usize, LevelValue> = BTreeMap::new();
        for (depth, level) in ordered {
            let value = match coord.value_of(level) {
                Some(v) => v,
                None => {
                    let v = self.index.representative_at(&pinned, depth)?;
                    tracing::debug!("fill_defaults: `{level}` <- `{v}`");
                    v
                }
            };
            out = out.with_value(level, &value)?;
            pinned.insert(depth, value);
        }
        Ok(out)
    }

    /// `detailed` 有而 `coarse` 没有的字段（按 level 顺序）。
    /// 用于从粗坐标（如每 date 的 calib 引用）找回实际请求的细化字段。
    pub fn extra_fields(
        &self,
        detailed: &Coordinate,
        coarse: &Coordinate,
    ) -> BTreeMap<Level, LevelValue> {
        let mut extra = BTreeMap::new();
        for &level in self.layout.levels() {
            if let Some(value) = detailed.value_of(level) {
                if coarse.value_of(level).is_none() {
                    extra.insert(level, value);
                }
            }
        }
        extra
    }

    /// 预载表查询：`coord` 限制到该 modality 的 outer 层级后查表，
    /// 更深字段忽略。未预载或 outer 坐标不存在返回 `None`。
    pub fn preloaded(&self, modality: &str, coord: &Coordinate) -> Option<&OneOrMany<PathBuf>> {
        let table = self.preload.get(modality)?;
        let m = self.layout.modality(modality).ok()?;
        let mut key = Coordinate::new();
        for &level in m.required {
            key = key.with_value(level, &coord.value_of(level)?).ok()?;
        }
        table.get(&key)
    }

    pub fn preloaded_table(&self, modality: &str) -> Option<&PathTable> {
        self.preload.get(modality)
    }

    /// aggregate 文件内部寻址的层级（如 calib 文件内按 side 分块）。
    pub fn inner_level(&self, modality: &str) -> Result<Option<Level>> {
        Ok(self.layout.modality(modality)?.inner)
    }

    /// 枚举树中该 modality outer 深度上的全部坐标并渲染成路径表。
    fn build_path_table(&self, name: &str) -> Result<PathTable> {
        let m = self.layout.modality(name)?;
        if !m.aggregate {
            return Err(FinderError::NotAggregate(name.to_string()));
        }

        let mut prefixes = Vec::new();
        collect_prefixes(
            self.index.tree(),
            m.required.len(),
            &mut Vec::new(),
            &mut prefixes,
        );

        let mut table = PathTable::new();
        for keys in prefixes {
            let mut coord = Coordinate::new();
            for (i, key) in keys.iter().enumerate() {
                coord = coord.with_value(m.required[i], key)?;
            }
            let paths = self.paths_from_coord(&coord, name)?;
            table.insert(coord, paths);
        }
        Ok(table)
    }
}

/// 收集树中深度恰为 `depth` 的全部 key 前缀。
fn collect_prefixes(
    tree: &LevelTree,
    depth: usize,
    cur: &mut Vec<LevelValue>,
    out: &mut Vec<Vec<LevelValue>>,
) {
    if depth == 0 {
        out.push(cur.clone());
        return;
    }
    match tree {
        LevelTree::Branch(children) => {
            for (key, sub) in children {
                cur.push(key.clone());
                collect_prefixes(sub, depth - 1, cur, out);
                cur.pop();
            }
        }
        LevelTree::Leaf(values) if depth == 1 => {
            for value in values {
                cur.push(value.clone());
                out.push(cur.clone());
                cur.pop();
            }
        }
        LevelTree::Leaf(_) => {}
    }
}
