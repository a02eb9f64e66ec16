use crate::error::AppError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension every JPEG is normalized to.
pub const JPEG_EXTENSION: &str = "jpg";

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

/// Files directly inside `dir` whose lowercased extension is allowed, sorted by
/// name. Subdirectories are not descended into.
pub fn list_images(dir: &Path, allowed_extensions: &HashSet<String>) -> Result<Vec<PathBuf>, AppError> {
    log::debug!("Listing images in {:?}", dir);
    log::trace!("Configured allowed extensions: {:?}", allowed_extensions);

    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        let path = entry.path();
        match lowercase_extension(path) {
            Some(ext) if allowed_extensions.contains(&ext) => images.push(path.to_path_buf()),
            Some(_) => log::trace!("Skipping file due to unsupported extension: {:?}", path),
            None => log::trace!("Skipping file with no extension: {:?}", path),
        }
    }

    log::debug!("Found {} images in {:?}", images.len(), dir);
    Ok(images)
}

/// Whether renaming `source_name` to `target_name` would clobber another file.
/// `existing` holds the exact names in the directory. On a case-insensitive
/// filesystem `target_exists` is also true for a case-only rename of the same
/// file, which is not a conflict.
fn rename_conflict(existing: &HashSet<String>, source_name: &str, target_name: &str, target_exists: bool) -> bool {
    if existing.contains(target_name) {
        return true;
    }
    target_exists && source_name.to_lowercase() != target_name.to_lowercase()
}

/// Renames `*.JPG`, `*.jpeg`, `*.Jpeg`, ... to `*.jpg`. Returns how many files
/// were renamed. An existing target is never overwritten.
pub fn normalize_extensions(dir: &Path) -> Result<usize, AppError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    let mut existing: HashSet<String> = files
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();

    let mut renamed = 0;
    for path in &files {
        let original = match path.extension().and_then(|s| s.to_str()) {
            Some(ext) => ext,
            None => continue,
        };
        let lower = original.to_lowercase();
        if original == JPEG_EXTENSION || (lower != "jpg" && lower != "jpeg") {
            continue;
        }

        let target = path.with_extension(JPEG_EXTENSION);
        let source_name = file_name(path);
        let target_name = file_name(&target);
        if rename_conflict(&existing, &source_name, &target_name, target.exists()) {
            log::warn!("Not renaming {:?}: {:?} already exists", path, target);
            continue;
        }
        std::fs::rename(path, &target)?;
        log::debug!("Renamed {:?} -> {:?}", path, target);
        existing.remove(&source_name);
        existing.insert(target_name);
        renamed += 1;
    }

    if renamed > 0 {
        log::info!("Normalized {} file extensions in {:?}", renamed, dir);
    }
    Ok(renamed)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True when `name` is a bare file name that cannot escape its directory.
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), b"x").unwrap();
    }

    fn extensions(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lists_only_allowed_extensions_sorted() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "b.JPG");
        touch(&dir, "a.png");
        touch(&dir, "notes.txt");
        touch(&dir, "README");
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        touch(&dir, "c.jpeg");

        let found = list_images(dir.path(), &extensions(&["jpg", "jpeg", "png"])).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
    }

    #[test]
    fn empty_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(list_images(dir.path(), &extensions(&["jpg"])).unwrap().is_empty());
    }

    #[test]
    fn jpeg_variants_are_renamed() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "one.JPG");
        touch(&dir, "two.jpeg");
        touch(&dir, "three.jpg");
        touch(&dir, "four.png");

        assert_eq!(normalize_extensions(dir.path()).unwrap(), 2);
        assert!(dir.path().join("one.jpg").exists());
        assert!(dir.path().join("two.jpg").exists());
        assert!(dir.path().join("three.jpg").exists());
        assert!(dir.path().join("four.png").exists());
    }

    #[test]
    fn rename_never_overwrites() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "same.JPG");
        fs::write(dir.path().join("same.jpg"), b"keep").unwrap();

        assert_eq!(normalize_extensions(dir.path()).unwrap(), 0);
        assert_eq!(fs::read(dir.path().join("same.jpg")).unwrap(), b"keep");
        assert!(dir.path().join("same.JPG").exists());
    }

    #[test]
    fn second_variant_does_not_clobber_first_rename() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pic.JPG"), b"first").unwrap();
        fs::write(dir.path().join("pic.jpeg"), b"second").unwrap();

        assert_eq!(normalize_extensions(dir.path()).unwrap(), 1);
        assert_eq!(fs::read(dir.path().join("pic.jpg")).unwrap(), b"first");
        assert!(dir.path().join("pic.jpeg").exists());
    }

    #[test]
    fn case_only_rename_is_not_a_conflict() {
        let existing = extensions(&["same.JPG", "other.jpeg", "OTHER.jpg"]);
        // Case-insensitive filesystems report the target of a case-only rename as existing.
        assert!(!rename_conflict(&existing, "same.JPG", "same.jpg", true));
        assert!(!rename_conflict(&existing, "same.JPG", "same.jpg", false));
        // A differently named file that only matches case-insensitively.
        assert!(rename_conflict(&existing, "other.jpeg", "other.jpg", true));
        assert!(rename_conflict(&extensions(&["a.JPG", "a.jpg"]), "a.JPG", "a.jpg", true));
    }

    #[test]
    fn plain_filenames() {
        assert!(is_plain_filename("photo.jpg"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("../secret.jpg"));
        assert!(!is_plain_filename("dir\\photo.jpg"));
    }
}
