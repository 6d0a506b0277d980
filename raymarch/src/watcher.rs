//! # Scene hot-reloading
//!
//! Watches the directory holding the scene file and reports changes to that
//! file over a channel. The frame loop drains the channel between frames, so
//! a burst of editor writes results in a single reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tracing::{debug, error, info};

/// Forwards events that touch the scene file.
struct SceneChangeHandler {
    file_name: OsString,
    reloads: Sender<PathBuf>,
}

impl SceneChangeHandler {
    fn handle_event(&self, result: notify::Result<Event>) {
        match result {
            Ok(event) => {
                if let Some(path) = changed_scene_path(&event, &self.file_name) {
                    debug!("Scene file changed: {:?}", path);
                    if self.reloads.send(path).is_err() {
                        debug!("Reload receiver gone, dropping change");
                    }
                }
            }
            Err(e) => error!("File watcher error: {:?}", e),
        }
    }
}

/// Returns the scene path when `event` creates or modifies a file named
/// `file_name`.
fn changed_scene_path(event: &Event, file_name: &OsString) -> Option<PathBuf> {
    if !event.kind.is_modify() && !event.kind.is_create() {
        return None;
    }
    event
        .paths
        .iter()
        .find(|path| path.file_name() == Some(file_name.as_os_str()))
        .cloned()
}

/// Starts watching `scene_path` through a non-recursive watch on its
/// parent directory, so saves that replace the file are still seen.
///
/// The returned watcher must be kept alive; dropping it stops the watch and
/// closes the channel.
///
/// # Errors
///
/// Fails when `scene_path` has no file name, or when the watcher cannot be
/// created or attached to the scene's directory.
pub fn start(scene_path: &Path) -> Result<(RecommendedWatcher, Receiver<PathBuf>)> {
    let file_name = scene_path
        .file_name()
        .with_context(|| format!("scene path {:?} has no file name", scene_path))?
        .to_os_string();
    let directory = match scene_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let (reloads, receiver) = mpsc::channel();
    let handler = SceneChangeHandler { file_name, reloads };
    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<Event>| handler.handle_event(result))
            .context("failed to create file watcher")?;
    watcher
        .watch(directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {:?}", directory))?;

    info!("Watching {:?} for scene changes", scene_path);
    Ok((watcher, receiver))
}
