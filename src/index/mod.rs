use std::collections::BTreeMap;

use crate::core::{Level, LevelValue};
use crate::error::{FinderError, Result};

/// 层级索引树（扫描一次磁盘得到，之后只读）。
///
/// ## 不变量
/// - 深度 = layout 的 level 数；同一前缀下的每个存在取值各占一个 key。
/// - 一串 key 前缀存在于树中，当且仅当对应目录/文件在扫描时存在于磁盘。
/// - 最内层是 `Leaf`：最细粒度标识（如 frame id）的列表。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelTree {
    Branch(BTreeMap<LevelValue, LevelTree>),
    Leaf(Vec<LevelValue>),
}

impl LevelTree {
    pub fn branch() -> Self {
        LevelTree::Branch(BTreeMap::new())
    }

    /// 直接子节点数（Branch 的 key 数 / Leaf 的取值数）。
    pub fn len(&self) -> usize {
        match self {
            LevelTree::Branch(m) => m.len(),
            LevelTree::Leaf(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &LevelValue) -> Option<&LevelTree> {
        match self {
            LevelTree::Branch(m) => m.get(key),
            LevelTree::Leaf(_) => None,
        }
    }

    /// 以连续 key 前缀逐层向下索引；任一 key 缺失返回 `None`
    /// （调用方视为 "该坐标前缀不存在"）。
    pub fn retrieve(&self, keys: &[LevelValue]) -> Option<&LevelTree> {
        let mut node = self;
        for key in keys {
            node = node.get(key)?;
        }
        Some(node)
    }

    /// 当前节点下一层的全部 key（Leaf 返回取值本身）。
    pub fn child_keys(&self) -> Vec<LevelValue> {
        match self {
            LevelTree::Branch(m) => m.keys().cloned().collect(),
            LevelTree::Leaf(v) => v.clone(),
        }
    }

    /// 任取一个有效 key 作为填充值。BTreeMap 使其稳定为最小 key，
    /// 语义上任何有效 key 都可接受。
    pub fn first_key(&self) -> Option<LevelValue> {
        match self {
            LevelTree::Branch(m) => m.keys().next().cloned(),
            LevelTree::Leaf(v) => v.first().cloned(),
        }
    }
}

/// 层级索引：持有扫描得到的 `LevelTree` 与其 level 顺序，回答结构性查询。
/// 构建后无任何可变状态；所有查询是对冻结树的纯函数。
#[derive(Clone, Debug)]
pub struct HierarchyIndex {
    levels: &'static [Level],
    tree: LevelTree,
}

impl HierarchyIndex {
    pub fn new(levels: &'static [Level], tree: LevelTree) -> Self {
        Self { levels, tree }
    }

    pub fn levels(&self) -> &'static [Level] {
        self.levels
    }

    pub fn tree(&self) -> &LevelTree {
        &self.tree
    }

    /// level 在全局顺序中的深度。
    pub fn depth_of(&self, level: Level) -> Result<usize> {
        self.levels
            .iter()
            .position(|&l| l == level)
            .ok_or(FinderError::UnknownLevel(level))
    }

    /// 见 [`LevelTree::retrieve`]。key 按深度顺序从根给出，
    /// 不存在 "跳层" 的误用空间。
    pub fn lookup(&self, keys: &[LevelValue]) -> Option<&LevelTree> {
        self.tree.retrieve(keys)
    }

    /// 给定 key 前缀下、深度 `target_depth` 上的全部有效取值。
    ///
    /// 前缀比 target 浅超过一层时，中间层用任意有效 key 填充后继续下钻
    /// （调用方只需要 "某个" 代表值的层才会留空，见 §filler）。
    pub fn children_at(&self, keys: &[LevelValue], target_depth: usize) -> Result<Vec<LevelValue>> {
        if target_depth >= self.levels.len() {
            return Err(FinderError::LevelOrder(format!(
                "target depth {target_depth} exceeds hierarchy depth {}",
                self.levels.len()
            )));
        }
        if target_depth < keys.len() {
            return Err(FinderError::LevelOrder(format!(
                "target level `{}` is shallower than the supplied key path (depth {})",
                self.levels[target_depth],
                keys.len()
            )));
        }

        let mut path = keys.to_vec();
        while path.len() < target_depth {
            let node = self
                .tree
                .retrieve(&path)
                .ok_or_else(|| FinderError::UnknownPrefix(path.clone()))?;
            let filler = node
                .first_key()
                .ok_or_else(|| FinderError::UnknownPrefix(path.clone()))?;
            tracing::debug!("children_at: fill depth {} with `{}`", path.len(), filler);
            path.push(filler);
        }

        let node = self
            .tree
            .retrieve(&path)
            .ok_or(FinderError::UnknownPrefix(path))?;
        Ok(node.child_keys())
    }

    /// 默认值填充原语：从根逐层下钻到 `target_depth`，深度上有 pin 值
    /// 则用 pin 值（必须真实存在），否则取首个 key；返回 target 层的首个取值。
    pub fn representative_at(
        &self,
        pinned: &BTreeMap<usize, LevelValue>,
        target_depth: usize,
    ) -> Result<LevelValue> {
        if target_depth >= self.levels.len() {
            return Err(FinderError::LevelOrder(format!(
                "target depth {target_depth} exceeds hierarchy depth {}",
                self.levels.len()
            )));
        }

        let mut node = &self.tree;
        let mut path: Vec<LevelValue> = Vec::with_capacity(target_depth);
        for depth in 0..target_depth {
            let key = match pinned.get(&depth) {
                Some(k) => k.clone(),
                None => node
                    .first_key()
                    .ok_or_else(|| FinderError::UnknownPrefix(path.clone()))?,
            };
            node = node.get(&key).ok_or_else(|| {
                let mut missing = path.clone();
                missing.push(key.clone());
                FinderError::UnknownPrefix(missing)
            })?;
            path.push(key);
        }
        node.first_key().ok_or(FinderError::UnknownPrefix(path))
    }
}
