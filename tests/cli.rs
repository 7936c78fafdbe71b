use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};
use walkdir::WalkDir;

/// A command isolated from the user's config file and environment.
fn playlistcopy(config_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("playlistcopy");
    cmd.env("PLAYLISTCOPY_CONFIG_PATH", config_dir.join("none.toml"))
        .env_remove("RUST_LOG");
    cmd
}

struct Library {
    dir: TempDir,
    playlist: PathBuf,
}

/// Four small "tracks" and a playlist listing them by relative path.
fn library() -> Library {
    let dir = tempdir().unwrap();
    let music = dir.path().join("music");
    fs::create_dir_all(&music).unwrap();
    let names = ["a.mp3", "b.mp3", "c.mp3", "d.mp3"];
    for n in names {
        fs::write(music.join(n), format!("data {n}")).unwrap();
    }
    let playlist = dir.path().join("mix.m3u");
    let body: String = names.iter().map(|n| format!("music/{n}\n")).collect();
    fs::write(&playlist, format!("#EXTM3U\n{body}")).unwrap();
    Library { dir, playlist }
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    out.sort();
    out
}

#[test]
fn help_lists_tasks_and_options() {
    let cfg = tempdir().unwrap();
    let output = playlistcopy(cfg.path())
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    for needle in ["sync", "append", "stats", "--dry-run", "--tracks-per-folder", "--shuffle"] {
        assert!(text.contains(needle), "help missing {needle}");
    }
}

#[test]
fn version_is_printed() {
    let cfg = tempdir().unwrap();
    playlistcopy(cfg.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn sync_packs_tracks_into_numbered_folders() {
    let lib = library();
    let dst = tempdir().unwrap();

    playlistcopy(lib.dir.path())
        .args(["sync", "--tracks-per-folder", "2", "--no-rewrite-filenames"])
        .arg(dst.path())
        .arg(&lib.playlist)
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished track 4/4 (100.00%)"));

    assert_eq!(
        files_under(dst.path()),
        vec![
            PathBuf::from("Folder 1/a.mp3"),
            PathBuf::from("Folder 1/b.mp3"),
            PathBuf::from("Folder 2/c.mp3"),
            PathBuf::from("Folder 2/d.mp3"),
        ]
    );
    assert_eq!(
        fs::read(dst.path().join("Folder 2/c.mp3")).unwrap(),
        b"data c.mp3"
    );
}

#[test]
fn second_sync_changes_nothing() {
    let lib = library();
    let dst = tempdir().unwrap();
    let run = || {
        playlistcopy(lib.dir.path())
            .args(["sync", "--tracks-per-folder", "2", "--no-rewrite-filenames"])
            .arg(dst.path())
            .arg(&lib.playlist)
            .assert()
            .success()
    };

    run();
    let before = files_under(dst.path());
    run().stdout(predicate::str::contains("0 new items"));
    assert_eq!(files_under(dst.path()), before);
}

#[test]
fn dry_run_leaves_destination_untouched() {
    let lib = library();
    let dst = tempdir().unwrap();
    fs::write(dst.path().join("stale.mp3"), b"old").unwrap();

    playlistcopy(lib.dir.path())
        .args(["sync", "--dry-run", "--no-rewrite-filenames"])
        .arg(dst.path())
        .arg(&lib.playlist)
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"));

    assert_eq!(files_under(dst.path()), vec![PathBuf::from("stale.mp3")]);
}

#[test]
fn append_keeps_unlisted_files() {
    let lib = library();
    let dst = tempdir().unwrap();
    fs::write(dst.path().join("stale.mp3"), b"old").unwrap();

    playlistcopy(lib.dir.path())
        .args(["append", "--no-rewrite-filenames", "--quiet"])
        .arg(dst.path())
        .arg(&lib.playlist)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let files = files_under(dst.path());
    assert!(files.contains(&PathBuf::from("stale.mp3")));
    assert_eq!(files.len(), 5);
}

#[test]
fn stats_counts_artists_from_file_names() {
    let cfg = tempdir().unwrap();
    let dst = tempdir().unwrap();
    for n in ["Air - Alpha.mp3", "Air - Beta.mp3", "Björk - Joga.mp3"] {
        fs::write(dst.path().join(n), b"x").unwrap();
    }

    playlistcopy(cfg.path())
        .arg("stats")
        .arg(dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("66.67%"))
        .stdout(predicate::str::contains("3 tracks by 2 artists"));
}

#[test]
fn stats_include_numbered_folders_by_default() {
    let cfg = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::create_dir_all(dst.path().join("Folder 1")).unwrap();
    fs::write(dst.path().join("Folder 1").join("Air - Alpha.mp3"), b"x").unwrap();
    fs::write(dst.path().join("Air - Beta.mp3"), b"x").unwrap();

    playlistcopy(cfg.path())
        .arg("stats")
        .arg(dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 tracks by 1 artists"));
}

#[test]
fn full_destination_fails_without_changes() {
    let lib = library();
    let dst = tempdir().unwrap();
    fs::create_dir_all(dst.path().join("Folder 1")).unwrap();
    fs::write(dst.path().join("Folder 1").join("old.mp3"), b"old").unwrap();

    playlistcopy(lib.dir.path())
        .args(["append", "--no-rewrite-filenames"])
        .args(["--tracks-per-folder", "1", "--max-folders", "1"])
        .arg(dst.path())
        .arg(&lib.playlist)
        .assert()
        .failure()
        .stderr(predicate::str::contains("destination is full"));

    assert_eq!(files_under(dst.path()), vec![PathBuf::from("Folder 1/old.mp3")]);
    assert_eq!(fs::read(dst.path().join("Folder 1/old.mp3")).unwrap(), b"old");
}

#[test]
fn missing_destination_fails() {
    let lib = library();
    playlistcopy(lib.dir.path())
        .arg("sync")
        .arg(lib.dir.path().join("no-such-stick"))
        .arg(&lib.playlist)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn playlist_without_playable_tracks_fails() {
    let lib = library();
    let dst = tempdir().unwrap();
    let empty = lib.dir.path().join("empty.m3u8");
    fs::write(&empty, "#EXTM3U\nmissing.mp3\n").unwrap();

    playlistcopy(lib.dir.path())
        .arg("sync")
        .arg(dst.path())
        .arg(&empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no valid tracks"));
    assert!(files_under(dst.path()).is_empty());
}

#[test]
fn print_config_shows_effective_settings() {
    let cfg = tempdir().unwrap();
    playlistcopy(cfg.path())
        .args(["--print-config", "--tracks-per-folder", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tracks_per_folder = 7"));
}
