// Corpus file enumeration

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::CorpusError;

/// File extensions picked up when walking a directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "db", "sfm", "tbx", "toolbox"];

/// Expand input paths into the list of corpus files to read.
///
/// Files named explicitly are always kept, whatever their extension.
/// Directories are walked recursively in file name order; hidden entries are
/// skipped and only files whose extension is in `extensions` (compared case
/// insensitively) are kept. A path that does not exist is an error.
pub fn corpus_files<P, E>(paths: &[P], extensions: &[E]) -> Result<Vec<PathBuf>, CorpusError>
where
    P: AsRef<Path>,
    E: AsRef<str>,
{
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            walk(path, extensions, &mut files)?;
        } else {
            return Err(CorpusError::NotFound(path.to_path_buf()));
        }
    }
    Ok(files)
}

fn walk<E: AsRef<str>>(
    root: &Path,
    extensions: &[E],
    files: &mut Vec<PathBuf>,
) -> Result<(), CorpusError> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|e| CorpusError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "skipping non-corpus file");
        }
    }
    Ok(())
}

fn has_extension<E: AsRef<str>>(path: &Path, extensions: &[E]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy();
    extensions
        .iter()
        .any(|e| e.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::create_dir(root.join(".hidden")).unwrap();
        fs::write(root.join("b.txt"), "\\id 1\n").unwrap();
        fs::write(root.join("a.DB"), "\\id 2\n").unwrap();
        fs::write(root.join("notes.md"), "ignored").unwrap();
        fs::write(root.join("sub").join("c.sfm"), "\\id 3\n").unwrap();
        fs::write(root.join(".hidden").join("d.txt"), "\\id 4\n").unwrap();

        let files = corpus_files(&[root], DEFAULT_EXTENSIONS).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.DB", "b.txt", "sub/c.sfm"]);
    }

    #[test]
    fn explicit_files_are_always_kept() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("corpus.xyz");
        fs::write(&file, "\\id 1\n").unwrap();
        let files = corpus_files(&[&file], DEFAULT_EXTENSIONS).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("b.ilg"), "").unwrap();
        let files = corpus_files(&[dir.path()], &[".ilg"]).unwrap();
        assert_eq!(files, vec![dir.path().join("b.ilg")]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = corpus_files(&[Path::new("/nonexistent/corpus")], DEFAULT_EXTENSIONS).unwrap_err();
        assert!(matches!(err, CorpusError::NotFound(_)));
    }
}
