//! Disk I/O and file lifecycle for one download.
//!
//! Bytes go to `<name>.part`; only a completed, verified transfer is renamed to
//! the final name, so a file under its final name is always complete.

mod part_file;

pub use part_file::PartFile;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `clip.mp4` → `clip.mp4.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("clip.mp4"));
        assert_eq!(p.to_string_lossy(), "clip.mp4.part");
        let p2 = temp_path(Path::new("/tmp/videos/a.mkv"));
        assert_eq!(p2.to_string_lossy(), "/tmp/videos/a.mkv.part");
    }

    #[test]
    fn write_then_finalize_renames() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("clip.mp4");
        let tp = temp_path(&final_path);

        let mut part = PartFile::create(&final_path).unwrap();
        part.preallocate(10).unwrap();
        part.write(b"hello").unwrap();
        part.write(b"world").unwrap();
        assert_eq!(part.written(), 10);
        let out = part.finalize().unwrap();

        assert_eq!(out, final_path);
        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"helloworld");
    }

    #[test]
    fn finalize_trims_overallocation() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("short.mp4");
        let mut part = PartFile::create(&final_path).unwrap();
        part.preallocate(100).unwrap();
        part.write(b"abc").unwrap();
        part.finalize().unwrap();
        assert_eq!(std::fs::metadata(&final_path).unwrap().len(), 3);
    }

    #[test]
    fn drop_without_finalize_removes_part() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("broken.mp4");
        let tp = temp_path(&final_path);
        {
            let mut part = PartFile::create(&final_path).unwrap();
            part.write(b"partial").unwrap();
            assert!(tp.exists());
        }
        assert!(!tp.exists());
        assert!(!final_path.exists());
    }
}
