use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FinderError, Result};

/// 数据集目录层级。各 layout 声明自己的有序子集
/// （KITTI: date/seq/side/fid；Waymo: seq/side/fid）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Date,
    Seq,
    Side,
    Fid,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Date => "date",
            Level::Seq => "seq",
            Level::Side => "side",
            Level::Fid => "fid",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "date" => Ok(Level::Date),
            "seq" => Ok(Level::Seq),
            "side" => Ok(Level::Side),
            "fid" => Ok(Level::Fid),
            other => Err(format!("unknown level `{other}`")),
        }
    }
}

/// 某一层级上的具体取值。date/seq 为文本，side/fid 为数字。
/// Display 不带零填充；零填充只属于文件名文法。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LevelValue {
    Text(String),
    Num(u64),
}

impl LevelValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            LevelValue::Text(s) => Some(s),
            LevelValue::Num(_) => None,
        }
    }

    pub fn as_num(&self) -> Option<u64> {
        match self {
            LevelValue::Num(n) => Some(*n),
            LevelValue::Text(_) => None,
        }
    }
}

impl fmt::Display for LevelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelValue::Text(s) => f.write_str(s),
            LevelValue::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for LevelValue {
    fn from(s: &str) -> Self {
        LevelValue::Text(s.to_string())
    }
}

impl From<u64> for LevelValue {
    fn from(n: u64) -> Self {
        LevelValue::Num(n)
    }
}

/// 一帧（或一个文件）的结构化坐标：每层一个可选字段。
///
/// ## 约定
/// - 缺席字段 = "尚未指定"，由查询侧补默认值或枚举。
/// - 构造后不可变；"修改" 总是产生新坐标（`with_*` 链式构造）。
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub date: Option<String>,
    pub seq: Option<String>,
    pub side: Option<u32>,
    pub fid: Option<u64>,
}

impl Coordinate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_seq(mut self, seq: impl Into<String>) -> Self {
        self.seq = Some(seq.into());
        self
    }

    pub fn with_side(mut self, side: u32) -> Self {
        self.side = Some(side);
        self
    }

    pub fn with_fid(mut self, fid: u64) -> Self {
        self.fid = Some(fid);
        self
    }

    /// 按层级取值（泛型访问，供遍历引擎使用）。
    pub fn value_of(&self, level: Level) -> Option<LevelValue> {
        match level {
            Level::Date => self.date.clone().map(LevelValue::Text),
            Level::Seq => self.seq.clone().map(LevelValue::Text),
            Level::Side => self.side.map(|s| LevelValue::Num(u64::from(s))),
            Level::Fid => self.fid.map(LevelValue::Num),
        }
    }

    /// 按层级写值，返回新坐标。取值类型与层级不符时报 `ValueType`。
    pub fn with_value(mut self, level: Level, value: &LevelValue) -> Result<Self> {
        match level {
            Level::Date => {
                let s = value.as_text().ok_or_else(|| type_err(level, "text", value))?;
                self.date = Some(s.to_string());
            }
            Level::Seq => {
                let s = value.as_text().ok_or_else(|| type_err(level, "text", value))?;
                self.seq = Some(s.to_string());
            }
            Level::Side => {
                let n = value.as_num().ok_or_else(|| type_err(level, "numeric", value))?;
                let n = u32::try_from(n).map_err(|_| type_err(level, "numeric", value))?;
                self.side = Some(n);
            }
            Level::Fid => {
                let n = value.as_num().ok_or_else(|| type_err(level, "numeric", value))?;
                self.fid = Some(n);
            }
        }
        Ok(self)
    }
}

fn type_err(level: Level, expected: &'static str, got: &LevelValue) -> FinderError {
    FinderError::ValueType {
        level,
        expected,
        got: got.clone(),
    }
}
