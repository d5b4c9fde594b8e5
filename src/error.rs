use std::path::PathBuf;

use thiserror::Error;

use crate::core::{Level, LevelValue};

/// 库内统一错误类型。所有失败在调用点同步上抛，不重试、不返回部分结果。
#[derive(Debug, Error)]
pub enum FinderError {
    /// modality 未在当前数据集 layout 中声明
    #[error("unrecognized modality `{0}`")]
    UnrecognizedModality(String),

    /// 路径不符合该 modality 的文件名文法（段数、目录字面量、数字格式、扩展名）
    #[error("path `{path}` does not match the `{modality}` grammar: {reason}")]
    Parse {
        modality: String,
        path: String,
        reason: String,
    },

    /// coordinate 缺少目标 modality 文法要求的字段
    #[error("coordinate is missing required field `{level}` for modality `{modality}`")]
    MissingField { modality: String, level: Level },

    /// 查询的层级顺序违反全局 level 顺序（乱序前缀 / target 比已指定字段浅）
    #[error("level order violation: {0}")]
    LevelOrder(String),

    /// 该 level 不属于当前数据集的层级列表
    #[error("level `{0}` is not part of this dataset hierarchy")]
    UnknownLevel(Level),

    /// 索引树中不存在该 key 前缀（即：磁盘上没有对应目录/文件）
    #[error("no index entry under key prefix {0:?}")]
    UnknownPrefix(Vec<LevelValue>),

    /// 只有 aggregate modality 才有 outer-coordinate 路径表可预载
    #[error("modality `{0}` is not aggregate, nothing to preload")]
    NotAggregate(String),

    /// 文件系统扫描失败。缺失预期目录视为配置/数据错误，构建整体中止。
    #[error("scan failed at `{path}`: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// level 与取值类型不匹配（date/seq 为文本，side/fid 为数字）
    #[error("level `{level}` expects a {expected} value, got `{got}`")]
    ValueType {
        level: Level,
        expected: &'static str,
        got: LevelValue,
    },
}

pub type Result<T> = std::result::Result<T, FinderError>;
