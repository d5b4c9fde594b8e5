use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::core::{Coordinate, Level, LevelValue};
use crate::error::{FinderError, Result};
use crate::index::LevelTree;

use super::{
    scan_frame_ids, scan_subdirs, split_ext, DatasetLayout, Modality, OneOrMany, ParsedName,
};

/// Waymo（KITTI 化导出）布局。层级：seq / side / fid，无 date 层。
///
/// 路径形状（相对数据集根，根指向 training/ 或 validation/）：
/// - rgb：`141184560845819621_10582_560_10602_560/image_00/0000000000.jpg`
/// - depth_raw：`141184560845819621_10582_560_10602_560/depth_00/0000000000.png`
/// - lidar：`141184560845819621_10582_560_10602_560/lidar/0000000000.bin`
/// - calib：`141184560845819621_10582_560_10602_560/calib/calib_all.txt`（每 seq 一个，内含各 side）
/// - T_rgb：`141184560845819621_10582_560_10602_560/pose_cam_00.txt`（文件内按 fid 逐行）
pub struct WaymoLayout {
    side_dir: Regex,
    pose_file: Regex,
    frame: Regex,
}

pub const WAYMO_LEVELS: &[Level] = &[Level::Seq, Level::Side, Level::Fid];

/// 五路相机：FRONT / FRONT_LEFT / FRONT_RIGHT / SIDE_LEFT / SIDE_RIGHT。
const WAYMO_SIDES: &[u64] = &[0, 1, 2, 3, 4];

const CALIB_FILENAMES: &[&str] = &["calib_all"];

const MODALITIES: &[Modality] = &[
    Modality {
        name: "rgb",
        required: WAYMO_LEVELS,
        aggregate: false,
        inner: None,
    },
    Modality {
        name: "depth_raw",
        required: WAYMO_LEVELS,
        aggregate: false,
        inner: None,
    },
    Modality {
        name: "lidar",
        required: &[Level::Seq, Level::Fid],
        aggregate: false,
        inner: None,
    },
    Modality {
        name: "calib",
        required: &[Level::Seq],
        aggregate: true,
        inner: Some(Level::Side),
    },
    Modality {
        name: "T_rgb",
        required: &[Level::Seq, Level::Side],
        aggregate: true,
        inner: Some(Level::Fid),
    },
];

impl WaymoLayout {
    pub fn new() -> Self {
        Self {
            // rgb 与 depth_raw 共用一条 side 提取规则
            side_dir: Regex::new(r"^(?:image|depth)_(\d{2})$").expect("static pattern"),
            pose_file: Regex::new(r"^pose_cam_(\d{2})$").expect("static pattern"),
            frame: Regex::new(r"^\d{10}$").expect("static pattern"),
        }
    }

    fn side_of(&self, re: &Regex, seg: &str) -> Option<u32> {
        re.captures(seg)?.get(1)?.as_str().parse().ok()
    }

    fn fid_of(&self, seg: &str) -> Option<u64> {
        if !self.frame.is_match(seg) {
            return None;
        }
        seg.parse().ok()
    }
}

impl Default for WaymoLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLayout for WaymoLayout {
    fn name(&self) -> &'static str {
        "waymo"
    }

    fn levels(&self) -> &'static [Level] {
        WAYMO_LEVELS
    }

    fn modalities(&self) -> &'static [Modality] {
        MODALITIES
    }

    fn default_preload(&self) -> &'static [&'static str] {
        &["calib"]
    }

    fn scan(&self, root: &Path) -> Result<LevelTree> {
        let mut seqs = BTreeMap::new();
        for seq in scan_subdirs(root)? {
            let seq_dir = root.join(&seq);
            let mut sides = BTreeMap::new();
            for &side in WAYMO_SIDES {
                let image_dir = seq_dir.join(format!("image_{side:02}"));
                let fids = scan_frame_ids(&image_dir)?;
                sides.insert(LevelValue::Num(side), LevelTree::Leaf(fids));
            }
            tracing::debug!("waymo scan: seq `{}`", seq);
            seqs.insert(LevelValue::Text(seq), LevelTree::Branch(sides));
        }
        Ok(LevelTree::Branch(seqs))
    }

    fn parse(&self, modality: &Modality, rel: &str) -> Result<ParsedName> {
        let err = |reason: String| FinderError::Parse {
            modality: modality.name.to_string(),
            path: rel.to_string(),
            reason,
        };

        let (stem, ext) =
            split_ext(rel).ok_or_else(|| err("missing file extension".to_string()))?;
        let segs: Vec<&str> = stem.split('/').collect();

        let coord = match modality.name {
            "rgb" | "depth_raw" => {
                let &[seq, side, fid] = &segs[..] else {
                    return Err(err(format!("expected 3 path segments, got {}", segs.len())));
                };
                let side = self
                    .side_of(&self.side_dir, side)
                    .ok_or_else(|| err(format!("bad side directory `{side}`")))?;
                let fid = self
                    .fid_of(fid)
                    .ok_or_else(|| err(format!("non-numeric frame id `{fid}`")))?;
                Coordinate::new().with_seq(seq).with_side(side).with_fid(fid)
            }
            "lidar" => {
                let &[seq, _, fid] = &segs[..] else {
                    return Err(err(format!("expected 3 path segments, got {}", segs.len())));
                };
                let fid = self
                    .fid_of(fid)
                    .ok_or_else(|| err(format!("non-numeric frame id `{fid}`")))?;
                Coordinate::new().with_seq(seq).with_fid(fid)
            }
            "calib" => {
                let &[seq, _, _] = &segs[..] else {
                    return Err(err(format!("expected 3 path segments, got {}", segs.len())));
                };
                Coordinate::new().with_seq(seq)
            }
            "T_rgb" => {
                let &[seq, pose] = &segs[..] else {
                    return Err(err(format!("expected 2 path segments, got {}", segs.len())));
                };
                let side = self
                    .side_of(&self.pose_file, pose)
                    .ok_or_else(|| err(format!("bad pose file `{pose}`")))?;
                Coordinate::new().with_seq(seq).with_side(side)
            }
            other => return Err(FinderError::UnrecognizedModality(other.to_string())),
        };

        Ok(ParsedName {
            ext: ext.to_string(),
            coord,
        })
    }

    fn render(&self, modality: &Modality, coord: &Coordinate) -> Result<OneOrMany<String>> {
        let need_seq = || {
            coord.seq.clone().ok_or_else(|| FinderError::MissingField {
                modality: modality.name.to_string(),
                level: Level::Seq,
            })
        };
        let need_side = || {
            coord.side.ok_or_else(|| FinderError::MissingField {
                modality: modality.name.to_string(),
                level: Level::Side,
            })
        };
        let need_fid = || {
            coord.fid.ok_or_else(|| FinderError::MissingField {
                modality: modality.name.to_string(),
                level: Level::Fid,
            })
        };

        let rendered = match modality.name {
            "rgb" => {
                let (seq, side, fid) = (need_seq()?, need_side()?, need_fid()?);
                OneOrMany::One(format!("{seq}/image_{side:02}/{fid:010}.jpg"))
            }
            "depth_raw" => {
                let (seq, side, fid) = (need_seq()?, need_side()?, need_fid()?);
                OneOrMany::One(format!("{seq}/depth_{side:02}/{fid:010}.png"))
            }
            "lidar" => {
                let (seq, fid) = (need_seq()?, need_fid()?);
                OneOrMany::One(format!("{seq}/lidar/{fid:010}.bin"))
            }
            "calib" => {
                let seq = need_seq()?;
                OneOrMany::Many(
                    CALIB_FILENAMES
                        .iter()
                        .map(|f| format!("{seq}/calib/{f}.txt"))
                        .collect(),
                )
            }
            "T_rgb" => {
                let (seq, side) = (need_seq()?, need_side()?);
                OneOrMany::One(format!("{seq}/pose_cam_{side:02}.txt"))
            }
            other => return Err(FinderError::UnrecognizedModality(other.to_string())),
        };
        Ok(rendered)
    }
}
