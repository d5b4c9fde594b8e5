use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mm_fd::config::FinderConfig;
use mm_fd::core::{Coordinate, Level};
use mm_fd::dataset::create_layout;
use mm_fd::query::DataFinder;
use mm_fd::stats::index_stats;

#[derive(Parser)]
#[command(name = "mm-fd", version, about = "Multi-modal dataset file indexer")]
struct Cli {
    /// TOML 配置文件（dataset / root / preload）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 数据集布局（kitti / waymo），覆盖配置文件
    #[arg(long)]
    dataset: Option<String>,

    /// 数据集根目录，覆盖配置文件
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// 扫描并打印索引摘要
    Scan {
        #[arg(long)]
        json: bool,
    },
    /// 跨 modality 路径翻译：用 `--from` 的文法解析，用 `--to` 的文法渲染
    Locate {
        path: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// 列出与部分坐标一致的某层全部取值
    Ls {
        /// 目标层级（date / seq / side / fid）
        #[arg(long)]
        level: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        seq: Option<String>,
        #[arg(long)]
        side: Option<u32>,
        #[arg(long)]
        fid: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => Some(FinderConfig::load(path)?),
        None => None,
    };
    let dataset = cli
        .dataset
        .or_else(|| cfg.as_ref().map(|c| c.dataset.clone()))
        .context("no dataset given (use --dataset or a config file)")?;
    let root = cli
        .root
        .or_else(|| cfg.as_ref().map(|c| c.root.clone()))
        .context("no dataset root given (use --root or a config file)")?;
    let layout =
        create_layout(&dataset).with_context(|| format!("unknown dataset layout `{dataset}`"))?;

    let finder = match cfg.as_ref().and_then(|c| c.preload.clone()) {
        Some(preload) => {
            let names: Vec<&str> = preload.iter().map(String::as_str).collect();
            DataFinder::open(root, layout, &names)?
        }
        None => DataFinder::open_default(root, layout)?,
    };

    match cli.cmd {
        Cmd::Scan { json } => {
            let stats = index_stats(finder.index());
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                for (level, count) in stats.levels.iter().zip(&stats.keys_per_level) {
                    println!("{level:>6}: {count}");
                }
                println!("frames: {}", stats.frames);
            }
        }
        Cmd::Locate { path, from, to } => {
            let coord = finder.coord_from_path(&path, &from)?;
            tracing::info!("coordinate: {:?}", coord);
            for p in finder.paths_from_coord(&coord, &to)?.iter() {
                println!("{}", p.display());
            }
        }
        Cmd::Ls {
            level,
            date,
            seq,
            side,
            fid,
        } => {
            let level: Level = level.parse().map_err(anyhow::Error::msg)?;
            let mut coord = Coordinate::new();
            if let Some(date) = date {
                coord = coord.with_date(date);
            }
            if let Some(seq) = seq {
                coord = coord.with_seq(seq);
            }
            if let Some(side) = side {
                coord = coord.with_side(side);
            }
            if let Some(fid) = fid {
                coord = coord.with_fid(fid);
            }
            for value in finder.values_at_level(&coord, level)? {
                println!("{value}");
            }
        }
    }
    Ok(())
}
