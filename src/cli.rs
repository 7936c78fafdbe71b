use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Settings;
use crate::plan::Mode;
use crate::report::Verbosity;

#[derive(Parser, Debug)]
#[command(
    name = "playlistcopy",
    version,
    about = "Copy the tracks of M3U/M3U8 playlists to a destination device"
)]
pub struct Cli {
    /// What to do with the destination
    #[arg(value_enum, required_unless_present = "print_config")]
    pub task: Option<Task>,

    /// Path to the destination (e.g. a mounted USB stick)
    #[arg(required_unless_present = "print_config")]
    pub destination: Option<PathBuf>,

    /// Playlist files (M3U/M3U8), copied in the given order
    #[arg(value_name = "PLAYLIST")]
    pub playlists: Vec<PathBuf>,

    /// Plan and report only, change nothing on the destination
    #[arg(long)]
    pub dry_run: bool,

    /// Keep original file names instead of naming files from their tags
    #[arg(long)]
    pub no_rewrite_filenames: bool,

    /// Copy new tracks in random order
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for --shuffle, to reproduce a placement
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Maximum tracks per folder (0 = everything in the destination root)
    #[arg(long, value_name = "N")]
    pub tracks_per_folder: Option<usize>,

    /// Maximum number of folders on the destination
    #[arg(long, value_name = "N")]
    pub max_folders: Option<usize>,

    /// Folder name template with one %d placeholder, e.g. "Folder %d"
    #[arg(long, value_name = "FMT")]
    pub folder_names: Option<String>,

    /// Worker threads for down-converting
    #[arg(long, value_name = "N")]
    pub convert_workers: Option<usize>,

    /// Worker threads for copying and deleting
    #[arg(long, value_name = "N")]
    pub move_workers: Option<usize>,

    /// Path to the LAME binary; enables down-conversion of mp3 files
    #[arg(long, value_name = "PATH")]
    pub lame: Option<PathBuf>,

    /// Target bitrate for down-conversion in kbps
    #[arg(long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Show every per-track decision and result
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress normal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Mirror the playlists, deleting files no playlist asks for
    Sync,
    /// Only add missing tracks
    Append,
    /// Show per-artist track counts on the destination, root and numbered folders
    Stats,
}

impl Task {
    pub fn mode(self) -> Option<Mode> {
        match self {
            Task::Sync => Some(Mode::Sync),
            Task::Append => Some(Mode::Append),
            Task::Stats => None,
        }
    }
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Layer command-line flags over loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if self.no_rewrite_filenames {
            settings.naming.rewrite_filenames = false;
        }
        if self.shuffle {
            settings.placement.shuffle = true;
        }
        if self.seed.is_some() {
            settings.placement.seed = self.seed;
        }
        if let Some(n) = self.tracks_per_folder {
            settings.layout.tracks_per_folder = n;
        }
        if let Some(n) = self.max_folders {
            settings.layout.max_folders = n;
        }
        if let Some(fmt) = &self.folder_names {
            settings.layout.folder_name_format = fmt.clone();
        }
        if let Some(n) = self.convert_workers {
            settings.workers.convert = n;
        }
        if let Some(n) = self.move_workers {
            settings.workers.copy = n;
        }
        if let Some(lame) = &self.lame {
            settings.convert.lame = Some(lame.clone());
        }
        if let Some(kbps) = self.bitrate {
            settings.convert.bitrate_kbps = kbps;
        }
    }
}
