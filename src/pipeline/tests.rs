use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::result::Result;
use std::sync::Arc;

use tempfile::{TempDir, tempdir};

use super::worker::partial_path;
use super::*;
use crate::config::{ConvertSettings, LayoutSettings, LibrarySettings, NamingSettings};
use crate::destination::{FolderLayout, PARTIAL_SUFFIX, scan};
use crate::error::FailureReason;
use crate::identity::{Resolver, identity_key};
use crate::plan::{Mode, plan};
use crate::playlist::Track;

struct Fixture {
    _src: TempDir,
    dst: TempDir,
    tracks: Vec<Track>,
}

fn fixture(names: &[&str]) -> Fixture {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let tracks = names
        .iter()
        .map(|name| {
            let path = src.path().join(name);
            fs::write(&path, format!("original {name}")).unwrap();
            Track {
                identity: identity_key(name),
                file_name: name.to_string(),
                source_path: path,
                origin_playlists: BTreeSet::new(),
            }
        })
        .collect();
    Fixture {
        _src: src,
        dst,
        tracks,
    }
}

fn resolver() -> Resolver {
    Resolver::lofty(&NamingSettings {
        rewrite_filenames: false,
        ..NamingSettings::default()
    })
}

fn layout(root: &Path, per_folder: usize) -> FolderLayout {
    let settings = LayoutSettings {
        tracks_per_folder: per_folder,
        ..LayoutSettings::default()
    };
    FolderLayout::new(root, &settings).unwrap()
}

fn plan_for(fx: &Fixture, per_folder: usize, mode: Mode) -> crate::plan::AllocationPlan {
    let layout = layout(fx.dst.path(), per_folder);
    let snapshot = scan(&layout, &resolver(), &LibrarySettings::default()).unwrap();
    plan(&fx.tracks, &snapshot, &layout, mode, None)
}

fn run_to_end(plan: &crate::plan::AllocationPlan, options: PipelineOptions) -> Vec<TrackEvent> {
    let run = execute(plan, options).unwrap();
    let events: Vec<TrackEvent> = run.events().iter().collect();
    run.wait();
    events
}

fn final_stage<'a>(events: &'a [TrackEvent], name: &str) -> &'a Stage {
    &events
        .iter()
        .filter(|e| e.name == name && e.stage.is_terminal())
        .last()
        .unwrap()
        .stage
}

fn stages(events: &[TrackEvent], name: &str) -> Vec<Stage> {
    events
        .iter()
        .filter(|e| e.name == name)
        .map(|e| e.stage.clone())
        .collect()
}

fn listing(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut out: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect();
    out.sort();
    out
}

/// Writes a marker instead of encoding; fails for names containing "bad".
struct FakeEncoder;

impl Encoder for FakeEncoder {
    fn convert(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> Result<(), ConvertError> {
        let name = input.file_name().unwrap().to_string_lossy();
        if name.contains("bad") {
            return Err(ConvertError::NoOutput);
        }
        fs::write(output, format!("converted@{bitrate_kbps}")).map_err(spawn_error)
    }
}

/// Stops the run during the first conversion.
struct CancellingEncoder(CancelHandle);

impl Encoder for CancellingEncoder {
    fn convert(&self, _input: &Path, output: &Path, _bitrate_kbps: u32) -> Result<(), ConvertError> {
        self.0.cancel();
        fs::write(output, b"converted").map_err(spawn_error)
    }
}

fn spawn_error(source: std::io::Error) -> ConvertError {
    ConvertError::Spawn {
        binary: PathBuf::from("fake"),
        source,
    }
}

fn conversion(encoder: Arc<dyn Encoder>) -> Option<Conversion> {
    Some(Conversion {
        encoder,
        settings: ConvertSettings::default(),
    })
}

#[test]
fn sync_copies_new_tracks_and_deletes_stale_ones() {
    let fx = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
    fs::write(fx.dst.path().join("a.mp3"), b"already here").unwrap();
    fs::write(fx.dst.path().join("x.mp3"), b"stale").unwrap();

    let plan = plan_for(&fx, 0, Mode::Sync);
    let events = run_to_end(
        &plan,
        PipelineOptions {
            copy_workers: 2,
            ..PipelineOptions::default()
        },
    );

    assert_eq!(final_stage(&events, "b.mp3"), &Stage::Done);
    assert_eq!(final_stage(&events, "c.mp3"), &Stage::Done);
    assert_eq!(final_stage(&events, "x.mp3"), &Stage::Deleted);
    assert!(events.iter().all(|e| !e.dry_run));

    let dst = fx.dst.path();
    assert_eq!(fs::read(dst.join("a.mp3")).unwrap(), b"already here");
    assert_eq!(fs::read(dst.join("b.mp3")).unwrap(), b"original b.mp3");
    assert!(!dst.join("x.mp3").exists());
    assert!(!dst.join(format!("b.mp3{PARTIAL_SUFFIX}")).exists());
}

#[test]
fn every_item_gets_exactly_one_terminal_event() {
    let fx = fixture(&["a.mp3", "b.mp3"]);
    fs::write(fx.dst.path().join("old.mp3"), b"stale").unwrap();
    let plan = plan_for(&fx, 0, Mode::Sync);
    let events = run_to_end(&plan, PipelineOptions::default());

    let terminal = events.iter().filter(|e| e.stage.is_terminal()).count();
    assert_eq!(terminal, plan.to_add.len() + plan.to_remove.len());
}

#[test]
fn bounded_layout_creates_folders_on_demand() {
    let fx = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
    let plan = plan_for(&fx, 2, Mode::Append);
    assert_eq!(plan.new_folders, vec![0, 1]);

    run_to_end(&plan, PipelineOptions::default());

    let dst = fx.dst.path();
    assert!(dst.join("Folder 1").join("a.mp3").is_file());
    assert!(dst.join("Folder 1").join("b.mp3").is_file());
    assert!(dst.join("Folder 2").join("c.mp3").is_file());
}

#[test]
fn conversion_failure_only_fails_that_track() {
    let fx = fixture(&["good.mp3", "bad.mp3", "plain.m4a"]);
    let plan = plan_for(&fx, 0, Mode::Sync);

    let events = run_to_end(
        &plan,
        PipelineOptions {
            copy_workers: 2,
            convert_workers: 2,
            conversion: conversion(Arc::new(FakeEncoder)),
            ..PipelineOptions::default()
        },
    );

    assert!(matches!(
        final_stage(&events, "bad.mp3"),
        Stage::Failed(FailureReason::ConversionFailed(_))
    ));
    assert_eq!(final_stage(&events, "good.mp3"), &Stage::Done);
    assert_eq!(final_stage(&events, "plain.m4a"), &Stage::Done);

    let dst = fx.dst.path();
    assert_eq!(fs::read(dst.join("good.mp3")).unwrap(), b"converted@128");
    assert_eq!(fs::read(dst.join("plain.m4a")).unwrap(), b"original plain.m4a");
    assert!(!dst.join("bad.mp3").exists());
}

#[test]
fn converted_tracks_walk_through_every_stage_in_order() {
    let fx = fixture(&["one.mp3", "two.mp3", "three.mp3", "four.mp3"]);
    let plan = plan_for(&fx, 0, Mode::Sync);
    let events = run_to_end(
        &plan,
        PipelineOptions {
            copy_workers: 2,
            convert_workers: 3,
            conversion: conversion(Arc::new(FakeEncoder)),
            ..PipelineOptions::default()
        },
    );

    for name in ["one.mp3", "two.mp3", "three.mp3", "four.mp3"] {
        assert_eq!(
            stages(&events, name),
            vec![Stage::Pending, Stage::Converting, Stage::Copying, Stage::Done]
        );
    }
}

#[test]
fn unconverted_tracks_skip_the_convert_stage() {
    let fx = fixture(&["a.mp3"]);
    let plan = plan_for(&fx, 0, Mode::Sync);
    let events = run_to_end(&plan, PipelineOptions::default());
    assert_eq!(
        stages(&events, "a.mp3"),
        vec![Stage::Pending, Stage::Copying, Stage::Done]
    );
}

#[test]
fn cancelling_fails_queued_work_without_writing() {
    let fx = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
    let plan = plan_for(&fx, 0, Mode::Sync);
    let cancel = CancelHandle::default();

    let events = run_to_end(
        &plan,
        PipelineOptions {
            conversion: conversion(Arc::new(CancellingEncoder(cancel.clone()))),
            cancel,
            ..PipelineOptions::default()
        },
    );

    for name in ["a.mp3", "b.mp3", "c.mp3"] {
        assert_eq!(
            final_stage(&events, name),
            &Stage::Failed(FailureReason::Cancelled)
        );
    }
    assert!(listing(fx.dst.path()).is_empty());
}

#[test]
fn leftover_partial_copies_are_removed() {
    let fx = fixture(&["a.mp3"]);
    let leftover = fx.dst.path().join(format!("a.mp3{PARTIAL_SUFFIX}"));
    fs::write(&leftover, b"half").unwrap();

    let plan = plan_for(&fx, 0, Mode::Append);
    assert_eq!(plan.partials, vec![leftover.clone()]);
    run_to_end(&plan, PipelineOptions::default());

    assert!(!leftover.exists());
    assert!(fx.dst.path().join("a.mp3").is_file());
}

#[test]
fn partials_are_gone_before_workers_run() {
    let fx = fixture(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
    let mut leftovers = Vec::new();
    for name in ["a.mp3", "c.mp3", "z.mp3"] {
        let path = fx.dst.path().join(format!("{name}{PARTIAL_SUFFIX}"));
        fs::write(&path, b"half").unwrap();
        leftovers.push(path);
    }

    let plan = plan_for(&fx, 0, Mode::Sync);
    assert_eq!(plan.partials.len(), 3);
    let run = execute(
        &plan,
        PipelineOptions {
            copy_workers: 4,
            ..PipelineOptions::default()
        },
    )
    .unwrap();
    // z.mp3 is not planned, so only the up-front cleanup can have removed it.
    assert!(!leftovers[2].exists());

    let events: Vec<TrackEvent> = run.events().iter().collect();
    run.wait();

    for name in ["a.mp3", "b.mp3", "c.mp3", "d.mp3"] {
        assert_eq!(final_stage(&events, name), &Stage::Done);
        assert_eq!(
            fs::read(fx.dst.path().join(name)).unwrap(),
            format!("original {name}").into_bytes()
        );
    }
    assert!(leftovers.iter().all(|p| !p.exists()));
}

#[test]
fn dry_run_reports_the_plan_and_leaves_destination_alone() {
    let fx = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
    fs::write(fx.dst.path().join("a.mp3"), b"a").unwrap();
    fs::write(fx.dst.path().join("x.mp3"), b"x").unwrap();
    let before = listing(fx.dst.path());

    let plan = plan_for(&fx, 0, Mode::Sync);
    let events = dry_run(&plan);

    assert_eq!(listing(fx.dst.path()), before);
    assert!(events.iter().all(|e| e.dry_run));
    assert_eq!(final_stage(&events, "x.mp3"), &Stage::Deleted);
    assert_eq!(final_stage(&events, "b.mp3"), &Stage::Done);
    assert_eq!(final_stage(&events, "c.mp3"), &Stage::Done);
    assert_eq!(events.iter().filter(|e| e.stage.is_terminal()).count(), 3);
}

#[test]
fn rerunning_after_execution_plans_nothing() {
    let fx = fixture(&["a.mp3", "b.mp3", "c.mp3", "d.mp3", "e.mp3"]);
    fs::create_dir_all(fx.dst.path().join("Folder 1")).unwrap();
    fs::write(fx.dst.path().join("Folder 1").join("gone.mp3"), b"g").unwrap();

    let first = plan_for(&fx, 2, Mode::Sync);
    run_to_end(
        &first,
        PipelineOptions {
            copy_workers: 3,
            ..PipelineOptions::default()
        },
    );

    let second = plan_for(&fx, 2, Mode::Sync);
    assert!(second.to_add.is_empty());
    assert!(second.to_remove.is_empty());
    assert_eq!(second.unchanged.len(), 5);
}

#[test]
fn partial_path_appends_suffix_to_file_name() {
    assert_eq!(
        partial_path(Path::new("/dst/Folder 1/a.mp3")),
        PathBuf::from(format!("/dst/Folder 1/a.mp3{PARTIAL_SUFFIX}"))
    );
}
