use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Find the WAV files directly inside `dir`, sorted by name.
///
/// The extension check is case-insensitive. Recorders number their files so
/// that a plain lexicographic sort yields recording order; nothing here checks
/// that.
pub fn discover_wav_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if has_wav_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn discovery_filters_case_insensitively_and_sorts() -> io::Result<()> {
        let dir = tempdir()?;
        for name in ["b.wav", "a.WAV", "notes.txt", "wav"] {
            File::create(dir.path().join(name))?;
        }

        let found = discover_wav_files(dir.path())?;
        assert_eq!(names(&found), ["a.WAV", "b.wav"]);
        assert!(found.iter().all(|path| path.parent() == Some(dir.path())));
        Ok(())
    }

    #[test]
    fn discovery_skips_directories_named_like_wav_files() -> io::Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("old.wav"))?;
        File::create(dir.path().join("00000002.WAV"))?;
        File::create(dir.path().join("00000001.WAV"))?;

        let found = discover_wav_files(dir.path())?;
        assert_eq!(names(&found), ["00000001.WAV", "00000002.WAV"]);
        Ok(())
    }

    #[test]
    fn discovery_of_empty_directory_is_empty() -> io::Result<()> {
        let dir = tempdir()?;
        assert!(discover_wav_files(dir.path())?.is_empty());
        Ok(())
    }
}
