use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pocket-player",
    version,
    about = "带播放队列、随机/循环模式和离线下载的命令行播放器"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 覆盖数据目录（默认走系统 data_dir）
    #[arg(long, env = "POCKET_PLAYER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// 覆盖日志目录（默认 `{data_dir}/logs`）
    #[arg(long, env = "POCKET_PLAYER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// 覆盖日志过滤（等价于设置 RUST_LOG）
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,

    /// 不打开音频设备
    #[arg(long, env = "POCKET_PLAYER_NO_AUDIO")]
    pub no_audio: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 用给定的音频文件或歌曲列表（.json）替换队列并开始播放
    Play {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 从第几首开始（从 0 计）
        #[arg(long, default_value_t = 0)]
        start: usize,
    },

    /// 恢复上次的队列并继续播放
    Resume,

    /// 打印保存的队列和模式
    Status,

    /// 打印最近播放
    Recent,

    /// 清空保存的播放状态
    Clear,
}
