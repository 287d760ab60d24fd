//! Error types for fitpath-fs.
//!
//! Errors returned as `Err` mean nothing was renamed: they are all raised by
//! read-only preflight checks. Once a batch has started committing renames,
//! problems are reported through [`crate::rename::ApplyReport`] instead, so
//! the caller always learns exactly which renames completed.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the fs crate.
pub type RenameResult<T> = Result<T, RenameError>;

#[derive(Debug, Error)]
pub enum RenameError {
    /// A hard-linked file would have to cross filesystems. Moving it would
    /// silently duplicate the data and sever the link, so the whole batch is
    /// refused before any rename is attempted.
    #[error(
        "hard-linked file {path} would cross devices (source device {file_device}, destination device {dest_device})"
    )]
    CrossDeviceHardLink {
        path: PathBuf,
        file_device: u64,
        dest_device: u64,
    },

    /// The folder rename target already exists and is not the source folder.
    #[error("rename destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// A read-only preflight filesystem call failed.
    #[error("{step} failed for {path}: {source}")]
    Preflight {
        step: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenameError {
    pub fn preflight(step: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Preflight {
            step,
            path: path.into(),
            source,
        }
    }
}
