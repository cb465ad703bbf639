use crate::app::PlaybackSnapshot;
use crate::domain::model::Song;
use crate::error::MessageError;

#[derive(Debug)]
pub enum PlayerCommand {
    /// 从持久化层恢复队列和模式（不自动播放）
    Bootstrap,
    SetQueue { songs: Vec<Song>, start_index: usize },
    AddToQueue { song: Song },
    RemoveFromQueue { index: usize },
    ReorderQueue { from_index: usize, to_index: usize },
    ClearQueue,
    Next,
    Previous,
    SkipTo { index: usize },
    /// 直接播放一首歌，不改动队列
    PlaySong { song: Song },
    TogglePause,
    Play,
    Pause,
    Stop,
    SeekToMs { ms: u64 },
    SetRate { rate: f32 },
    ToggleShuffle,
    ToggleRepeat,
    DownloadSong { song: Song },
    DeleteDownload { song_id: String },
    LoadRecentlyPlayed,
    ClearRecentlyPlayed,
    Quit,
}

#[derive(Debug)]
pub enum PlayerEvent {
    State(Box<PlaybackSnapshot>),
    Error(MessageError),
    Downloaded { song_id: String },
    RecentlyPlayed(Vec<Song>),
    /// Actor 已退出，持久化已刷盘
    Stopped,
}
