use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{info, warn};
use tempfile::TempDir;

use crate::LiveTracksError;

const SCRATCH_PREFIX: &str = "livetracks-";
const MANIFEST_NAME: &str = "files.txt";

// Path of the live scratch directory, for the interrupt handler.
static ACTIVE_SCRATCH: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Fail with [`LiveTracksError::OutputExists`] if `output_dir` is already there.
pub fn ensure_output_available(output_dir: &Path) -> Result<(), LiveTracksError> {
    if output_dir.exists() {
        return Err(LiveTracksError::OutputExists(output_dir.to_path_buf()));
    }
    Ok(())
}

/// Directories used by one run.
#[derive(Debug)]
pub struct OutputLayout {
    output_dir: PathBuf,
    scratch: Option<ScratchDir>,
}

impl OutputLayout {
    /// Create the output directory, and a scratch directory when more than
    /// one input file has to be merged.
    pub fn prepare(output_dir: &Path, input_count: usize) -> Result<Self, LiveTracksError> {
        Self::prepare_in(output_dir, input_count, std::env::temp_dir())
    }

    /// Like [`OutputLayout::prepare`], with the scratch directory under `scratch_root`.
    ///
    /// The scratch directory is created first so a failure leaves no output
    /// directory behind.
    pub fn prepare_in<P: AsRef<Path>>(
        output_dir: &Path,
        input_count: usize,
        scratch_root: P,
    ) -> Result<Self, LiveTracksError> {
        ensure_output_available(output_dir)?;

        let scratch = if input_count > 1 {
            Some(ScratchDir::create_in(scratch_root)?)
        } else {
            None
        };

        fs::create_dir(output_dir)?;
        info!("output directory: {}", output_dir.display());

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            scratch,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(ScratchDir::path)
    }
}

/// Temporary directory holding segments and the merge manifest.
///
/// Removed recursively when dropped, including on early returns and unwinding.
/// While it exists its path is registered for [`remove_active_scratch`].
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create_in<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)?;
        info!("temporary directory: {}", dir.path().display());
        *lock_active() = Some(dir.path().to_path_buf());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        manifest_path(self.path())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let mut active = lock_active();
        if active.as_deref() == Some(self.dir.path()) {
            *active = None;
        }
    }
}

/// Location of the manifest file inside a scratch directory.
pub fn manifest_path(scratch_dir: &Path) -> PathBuf {
    scratch_dir.join(MANIFEST_NAME)
}

/// Placeholder scratch path shown by dry runs.
pub fn placeholder_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("{SCRATCH_PREFIX}XXXXXX"))
}

/// Remove the scratch directory of the current run, if any.
///
/// Meant for signal handlers that terminate the process without unwinding,
/// where [`ScratchDir`]'s destructor would not run.
pub fn remove_active_scratch() {
    let Some(path) = lock_active().take() else {
        return;
    };
    if let Err(err) = fs::remove_dir_all(&path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("failed to remove {}: {err}", path.display());
        }
    }
}

fn lock_active() -> std::sync::MutexGuard<'static, Option<PathBuf>> {
    ACTIVE_SCRATCH
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
