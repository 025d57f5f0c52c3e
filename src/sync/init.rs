use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::logger::LogSink;
use crate::scm::{self, Scm};

/// Produce the working copy described by `config`: load it when it exists,
/// otherwise clone it, otherwise initialize it with a README.
///
/// Also points "origin" at the configured URL, makes sure commits have an
/// author, and fetches once so remote branches are known. Every failure here
/// is a [`SyncError::Setup`].
pub fn acquire_repository(
    config: &SyncConfig,
    sink: &mut dyn LogSink,
) -> Result<Box<dyn Scm>, SyncError> {
    let path = &config.repo_path;
    let setup_err = |e: anyhow::Error| SyncError::setup(path, e);

    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory '{}'", path.display()))
            .map_err(setup_err)?;
        note(sink, &format!("Created directory {}", path.display()));
    }

    let repo = if scm::is_repo(path) {
        note(sink, "Loaded existing repository");
        scm::open(path).map_err(setup_err)?
    } else if is_empty_dir(path).map_err(setup_err)? {
        note(sink, &format!("Cloning {} ({})", config.remote_url, config.branch));
        match scm::clone(&config.remote_url, path, Some(&config.branch)) {
            Ok(repo) => {
                note(sink, "Clone completed");
                repo
            }
            Err(e) => {
                warn(sink, &format!("Clone failed, initializing a new repository: {e:#}"));
                init_with_readme(path, sink).map_err(setup_err)?
            }
        }
    } else {
        note(sink, "Directory is not empty, skipping clone");
        init_with_readme(path, sink).map_err(setup_err)?
    };

    configure_origin(repo.as_ref(), &config.remote_url, sink).map_err(setup_err)?;
    scm::ensure_identity(repo.as_ref(), &config.author_name, &config.author_email)
        .map_err(setup_err)?;

    if let Err(e) = repo.fetch("origin") {
        warn(sink, &format!("Initial fetch failed: {e:#}"));
    }

    Ok(repo)
}

fn init_with_readme(path: &Path, sink: &mut dyn LogSink) -> Result<Box<dyn Scm>> {
    let repo = scm::init(path)?;

    let readme = path.join("README.md");
    if !readme.exists() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repository".to_string());
        fs::write(&readme, format!("# {name}\n\nAuto-generated Git repository.\n"))
            .with_context(|| format!("Failed to write {}", readme.display()))?;
        note(sink, "Created README.md");
    }

    note(sink, "Initialized new repository");
    Ok(repo)
}

fn configure_origin(repo: &dyn Scm, url: &str, sink: &mut dyn LogSink) -> Result<()> {
    if repo.has_remote("origin") {
        if repo.get_remote_url("origin")? != url {
            repo.set_remote_url("origin", url)?;
            note(sink, &format!("Updated remote 'origin' -> {url}"));
        }
    } else {
        repo.add_remote("origin", url)?;
        note(sink, &format!("Added remote 'origin' -> {url}"));
    }
    Ok(())
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path)
        .with_context(|| format!("Failed to read directory '{}'", path.display()))?;
    Ok(entries.next().is_none())
}

fn note(sink: &mut dyn LogSink, message: &str) {
    log::info!("{message}");
    if let Err(e) = sink.write_line(message) {
        log::warn!("Failed to write sync log: {e:#}");
    }
}

fn warn(sink: &mut dyn LogSink, message: &str) {
    log::warn!("{message}");
    if let Err(e) = sink.write_line(&format!("WARN {message}")) {
        log::warn!("Failed to write sync log: {e:#}");
    }
}
