use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::core::{Coordinate, Level, LevelValue};
use crate::error::{FinderError, Result};
use crate::index::LevelTree;

use super::{
    scan_frame_ids, scan_subdirs, split_ext, DatasetLayout, Modality, OneOrMany, ParsedName,
};

/// KITTI raw + depth 布局。层级：date / seq / side / fid。
///
/// 路径形状（相对数据集根）：
/// - rgb：`2011_09_26/2011_09_26_drive_0001_sync/image_02/data/0000000000.jpg`
/// - depth_dense：`2011_09_26/2011_09_26_drive_0001_sync/proj_depth/groundtruth/image_02/0000000005.png`
/// - depth_raw：`2011_09_26/2011_09_26_drive_0001_sync/proj_depth/velodyne_raw/image_02/0000000005.png`
/// - lidar：`2011_09_26/2011_09_26_drive_0001_sync/velodyne_points/data/0000000000.bin`
/// - calib：`2011_09_26/calib_cam_to_cam.txt`（每 date 一组，文件内按 side 分块）
/// - T_rgb：`2011_09_26/2011_09_26_drive_0001_sync/poses/cam_02.txt`（文件内按 fid 逐行）
/// - T_lidar：`2011_09_26/2011_09_26_drive_0001_sync/poses/velo.txt`
pub struct KittiLayout {
    side_dir: Regex,
    cam_file: Regex,
    frame: Regex,
}

pub const KITTI_LEVELS: &[Level] = &[Level::Date, Level::Seq, Level::Side, Level::Fid];

/// 左右彩色相机。灰度相机（00/01）不在 depth 标注覆盖内，扫描时跳过。
const KITTI_SIDES: &[u64] = &[2, 3];

const CALIB_FILENAMES: &[&str] = &["calib_cam_to_cam", "calib_velo_to_cam"];

const MODALITIES: &[Modality] = &[
    Modality {
        name: "rgb",
        required: KITTI_LEVELS,
        aggregate: false,
        inner: None,
    },
    Modality {
        name: "depth_dense",
        required: KITTI_LEVELS,
        aggregate: false,
        inner: None,
    },
    Modality {
        name: "depth_raw",
        required: KITTI_LEVELS,
        aggregate: false,
        inner: None,
    },
    // lidar 不区分 side：文法消费 date/seq/fid。
    Modality {
        name: "lidar",
        required: &[Level::Date, Level::Seq, Level::Fid],
        aggregate: false,
        inner: None,
    },
    Modality {
        name: "calib",
        required: &[Level::Date],
        aggregate: true,
        inner: Some(Level::Side),
    },
    Modality {
        name: "T_rgb",
        required: &[Level::Date, Level::Seq, Level::Side],
        aggregate: true,
        inner: Some(Level::Fid),
    },
    Modality {
        name: "T_lidar",
        required: &[Level::Date, Level::Seq],
        aggregate: true,
        inner: None,
    },
];

impl KittiLayout {
    pub fn new() -> Self {
        // 字面量模式，new 不可能失败。
        Self {
            side_dir: Regex::new(r"^image_(\d{2})$").expect("static pattern"),
            cam_file: Regex::new(r"^cam_(\d{2})$").expect("static pattern"),
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

impl Default for KittiLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLayout for KittiLayout {
    fn name(&self) -> &'static str {
        "kitti"
    }

    fn levels(&self) -> &'static [Level] {
        KITTI_LEVELS
    }

    fn modalities(&self) -> &'static [Modality] {
        MODALITIES
    }

    fn default_preload(&self) -> &'static [&'static str] {
        &[]
    }

    fn scan(&self, root: &Path) -> Result<LevelTree> {
        let mut dates = BTreeMap::new();
        for date in scan_subdirs(root)? {
            let date_dir = root.join(&date);
            let mut seqs = BTreeMap::new();
            for seq in scan_subdirs(&date_dir)? {
                let seq_dir = date_dir.join(&seq);
                let mut sides = BTreeMap::new();
                for &side in KITTI_SIDES {
                    let data_dir = seq_dir.join(format!("image_{side:02}")).join("data");
                    let fids = scan_frame_ids(&data_dir)?;
                    sides.insert(LevelValue::Num(side), LevelTree::Leaf(fids));
                }
                seqs.insert(LevelValue::Text(seq), LevelTree::Branch(sides));
            }
            tracing::debug!("kitti scan: date `{}`, {} seqs", date, seqs.len());
            dates.insert(LevelValue::Text(date), LevelTree::Branch(seqs));
        }
        Ok(LevelTree::Branch(dates))
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
            "rgb" => {
                let &[date, seq, side, _, fid] = &segs[..] else {
                    return Err(err(format!("expected 5 path segments, got {}", segs.len())));
                };
                let side = self
                    .side_of(&self.side_dir, side)
                    .ok_or_else(|| err(format!("bad side directory `{side}`")))?;
                let fid = self
                    .fid_of(fid)
                    .ok_or_else(|| err(format!("non-numeric frame id `{fid}`")))?;
                Coordinate::new()
                    .with_date(date)
                    .with_seq(seq)
                    .with_side(side)
                    .with_fid(fid)
            }
            "depth_dense" | "depth_raw" => {
                let &[date, seq, _, _, side, fid] = &segs[..] else {
                    return Err(err(format!("expected 6 path segments, got {}", segs.len())));
                };
                let side = self
                    .side_of(&self.side_dir, side)
                    .ok_or_else(|| err(format!("bad side directory `{side}`")))?;
                let fid = self
                    .fid_of(fid)
                    .ok_or_else(|| err(format!("non-numeric frame id `{fid}`")))?;
                Coordinate::new()
                    .with_date(date)
                    .with_seq(seq)
                    .with_side(side)
                    .with_fid(fid)
            }
            "lidar" => {
                let &[date, seq, _, _, fid] = &segs[..] else {
                    return Err(err(format!("expected 5 path segments, got {}", segs.len())));
                };
                let fid = self
                    .fid_of(fid)
                    .ok_or_else(|| err(format!("non-numeric frame id `{fid}`")))?;
                Coordinate::new().with_date(date).with_seq(seq).with_fid(fid)
            }
            "calib" => {
                let &[date, _] = &segs[..] else {
                    return Err(err(format!("expected 2 path segments, got {}", segs.len())));
                };
                Coordinate::new().with_date(date)
            }
            "T_rgb" => {
                let &[date, seq, _, cam] = &segs[..] else {
                    return Err(err(format!("expected 4 path segments, got {}", segs.len())));
                };
                let side = self
                    .side_of(&self.cam_file, cam)
                    .ok_or_else(|| err(format!("bad pose file `{cam}`")))?;
                Coordinate::new().with_date(date).with_seq(seq).with_side(side)
            }
            "T_lidar" => {
                let &[date, seq, _, _] = &segs[..] else {
                    return Err(err(format!("expected 4 path segments, got {}", segs.len())));
                };
                Coordinate::new().with_date(date).with_seq(seq)
            }
            other => return Err(FinderError::UnrecognizedModality(other.to_string())),
        };

        Ok(ParsedName {
            ext: ext.to_string(),
            coord,
        })
    }

    fn render(&self, modality: &Modality, coord: &Coordinate) -> Result<OneOrMany<String>> {
        let need_text = |v: Option<&str>, level: Level| {
            v.map(str::to_string).ok_or_else(|| FinderError::MissingField {
                modality: modality.name.to_string(),
                level,
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
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                let seq = need_text(coord.seq.as_deref(), Level::Seq)?;
                let (side, fid) = (need_side()?, need_fid()?);
                OneOrMany::One(format!("{date}/{seq}/image_{side:02}/data/{fid:010}.jpg"))
            }
            "depth_dense" => {
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                let seq = need_text(coord.seq.as_deref(), Level::Seq)?;
                let (side, fid) = (need_side()?, need_fid()?);
                OneOrMany::One(format!(
                    "{date}/{seq}/proj_depth/groundtruth/image_{side:02}/{fid:010}.png"
                ))
            }
            "depth_raw" => {
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                let seq = need_text(coord.seq.as_deref(), Level::Seq)?;
                let (side, fid) = (need_side()?, need_fid()?);
                OneOrMany::One(format!(
                    "{date}/{seq}/proj_depth/velodyne_raw/image_{side:02}/{fid:010}.png"
                ))
            }
            "lidar" => {
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                let seq = need_text(coord.seq.as_deref(), Level::Seq)?;
                let fid = need_fid()?;
                OneOrMany::One(format!("{date}/{seq}/velodyne_points/data/{fid:010}.bin"))
            }
            "calib" => {
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                OneOrMany::Many(
                    CALIB_FILENAMES
                        .iter()
                        .map(|f| format!("{date}/{f}.txt"))
                        .collect(),
                )
            }
            "T_rgb" => {
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                let seq = need_text(coord.seq.as_deref(), Level::Seq)?;
                let side = need_side()?;
                OneOrMany::One(format!("{date}/{seq}/poses/cam_{side:02}.txt"))
            }
            "T_lidar" => {
                let date = need_text(coord.date.as_deref(), Level::Date)?;
                let seq = need_text(coord.seq.as_deref(), Level::Seq)?;
                OneOrMany::One(format!("{date}/{seq}/poses/velo.txt"))
            }
            other => return Err(FinderError::UnrecognizedModality(other.to_string())),
        };
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> KittiLayout {
        KittiLayout::new()
    }

    fn modality(name: &str) -> &'static Modality {
        MODALITIES.iter().find(|m| m.name == name).unwrap()
    }

    #[test]
    fn parse_rgb_path() {
        let p = layout()
            .parse(modality("rgb"), "2011_09_26/seq_sync/image_02/data/0000000001.jpg")
            .unwrap();
        assert_eq!(p.ext, "jpg");
        assert_eq!(
            p.coord,
            Coordinate::new()
                .with_date("2011_09_26")
                .with_seq("seq_sync")
                .with_side(2)
                .with_fid(1)
        );
    }

    #[test]
    fn rgb_coord_renders_depth_raw_path() {
        // rgb 坐标直接换 modality 渲染：跨 modality 对齐的核心场景。
        let l = layout();
        let p = l
            .parse(modality("rgb"), "2011_09_26/seq_sync/image_02/data/0000000001.jpg")
            .unwrap();
        let rendered = l.render(modality("depth_raw"), &p.coord).unwrap();
        assert_eq!(
            rendered,
            OneOrMany::One(
                "2011_09_26/seq_sync/proj_depth/velodyne_raw/image_02/0000000001.png".to_string()
            )
        );
    }

    #[test]
    fn parse_depth_and_lidar_paths() {
        let l = layout();
        let p = l
            .parse(
                modality("depth_dense"),
                "2011_09_26/2011_09_26_drive_0001_sync/proj_depth/groundtruth/image_02/0000000005.png",
            )
            .unwrap();
        assert_eq!(p.coord.side, Some(2));
        assert_eq!(p.coord.fid, Some(5));

        let p = l
            .parse(
                modality("lidar"),
                "2011_09_26/2011_09_26_drive_0001_sync/velodyne_points/data/0000000000.bin",
            )
            .unwrap();
        assert_eq!(p.ext, "bin");
        assert_eq!(p.coord.side, None);
        assert_eq!(p.coord.fid, Some(0));
    }

    #[test]
    fn parse_aggregate_paths_leave_inner_levels_absent() {
        let l = layout();
        let p = l.parse(modality("calib"), "2011_09_26/calib_cam_to_cam.txt").unwrap();
        assert_eq!(p.coord, Coordinate::new().with_date("2011_09_26"));

        let p = l
            .parse(modality("T_rgb"), "2011_09_26/2011_09_26_drive_0001_sync/poses/cam_02.txt")
            .unwrap();
        assert_eq!(p.coord.side, Some(2));
        assert_eq!(p.coord.fid, None);

        let p = l
            .parse(modality("T_lidar"), "2011_09_26/2011_09_26_drive_0001_sync/poses/velo.txt")
            .unwrap();
        assert_eq!(p.coord.side, None);
        assert_eq!(p.coord.seq.as_deref(), Some("2011_09_26_drive_0001_sync"));
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        let l = layout();
        // 段数不对
        let err = l
            .parse(modality("rgb"), "2011_09_26/image_02/data/0000000001.jpg")
            .unwrap_err();
        assert!(matches!(err, FinderError::Parse { .. }));
        // side 目录不是 image_XX
        let err = l
            .parse(modality("rgb"), "2011_09_26/seq/velodyne_02/data/0000000001.jpg")
            .unwrap_err();
        assert!(matches!(err, FinderError::Parse { .. }));
        // 帧号非数字
        let err = l
            .parse(modality("rgb"), "2011_09_26/seq/image_02/data/frame_one.jpg")
            .unwrap_err();
        assert!(matches!(err, FinderError::Parse { .. }));
        // 无扩展名
        let err = l.parse(modality("calib"), "2011_09_26/calib_cam_to_cam").unwrap_err();
        assert!(matches!(err, FinderError::Parse { .. }));
    }

    #[test]
    fn render_requires_declared_fields_only() {
        let l = layout();
        let full = Coordinate::new()
            .with_date("2011_09_26")
            .with_seq("seq_sync")
            .with_side(3)
            .with_fid(42);

        // calib 只消费 date；更深字段忽略。
        let calib = l.render(modality("calib"), &full).unwrap();
        assert_eq!(
            calib,
            OneOrMany::Many(vec![
                "2011_09_26/calib_cam_to_cam.txt".to_string(),
                "2011_09_26/calib_velo_to_cam.txt".to_string(),
            ])
        );

        // 缺 fid 的 rgb 渲染失败。
        let partial = Coordinate::new().with_date("2011_09_26").with_seq("s").with_side(2);
        let err = l.render(modality("rgb"), &partial).unwrap_err();
        assert!(matches!(
            err,
            FinderError::MissingField { level: Level::Fid, .. }
        ));
    }

    #[test]
    fn grammar_round_trips() {
        let l = layout();
        let coord = Coordinate::new()
            .with_date("2011_09_30")
            .with_seq("2011_09_30_drive_0016_sync")
            .with_side(3)
            .with_fid(107);

        for name in ["rgb", "depth_dense", "depth_raw", "lidar", "T_rgb", "T_lidar", "calib"] {
            let m = modality(name);
            let rendered = l.render(m, &coord).unwrap();
            for rel in rendered.iter() {
                let parsed = l.parse(m, rel).unwrap();
                // parse 结果 = 原坐标限制到该文法消费的层级。
                for &level in m.required {
                    assert_eq!(parsed.coord.value_of(level), coord.value_of(level), "{name}");
                }
                for &level in KITTI_LEVELS {
                    if !m.required.contains(&level) {
                        assert_eq!(parsed.coord.value_of(level), None, "{name}");
                    }
                }
            }
        }
    }
}
