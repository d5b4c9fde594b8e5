use serde::Serialize;

use crate::index::{HierarchyIndex, LevelTree};

/// 索引结构摘要（`scan` 子命令输出）。
#[derive(Clone, Debug, Default, Serialize)]
pub struct IndexStats {
    /// 各层名字（按全局顺序）
    pub levels: Vec<String>,
    /// 各层 key 总数（跨分支求和）
    pub keys_per_level: Vec<usize>,
    /// 最内层取值总数，即可寻址的帧总数
    pub frames: usize,
}

pub fn index_stats(index: &HierarchyIndex) -> IndexStats {
    let mut keys_per_level = vec![0usize; index.levels().len()];
    count(index.tree(), 0, &mut keys_per_level);
    let frames = keys_per_level.last().copied().unwrap_or(0);
    IndexStats {
        levels: index.levels().iter().map(|l| l.name().to_string()).collect(),
        keys_per_level,
        frames,
    }
}

fn count(tree: &LevelTree, depth: usize, acc: &mut [usize]) {
    if depth >= acc.len() {
        return;
    }
    match tree {
        LevelTree::Branch(children) => {
            acc[depth] += children.len();
            for sub in children.values() {
                count(sub, depth + 1, acc);
            }
        }
        LevelTree::Leaf(values) => {
            acc[depth] += values.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::core::{Level, LevelValue};

    #[test]
    fn counts_keys_per_level() {
        let mut sides = BTreeMap::new();
        sides.insert(
            LevelValue::Num(2),
            LevelTree::Leaf(vec![LevelValue::Num(0), LevelValue::Num(1)]),
        );
        sides.insert(LevelValue::Num(3), LevelTree::Leaf(vec![LevelValue::Num(0)]));
        let mut seqs = BTreeMap::new();
        seqs.insert(LevelValue::Text("s0".into()), LevelTree::Branch(sides));
        let index = HierarchyIndex::new(
            &[Level::Seq, Level::Side, Level::Fid],
            LevelTree::Branch(seqs),
        );

        let stats = index_stats(&index);
        assert_eq!(stats.levels, vec!["seq", "side", "fid"]);
        assert_eq!(stats.keys_per_level, vec![1, 2, 3]);
        assert_eq!(stats.frames, 3);
    }
}
