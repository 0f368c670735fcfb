//! Archive packing and unpacking through external tools

use crate::{copy_recursive, CanonicalPath, FsError, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

#[cfg(target_os = "macos")]
pub const SEVEN_ZIP_INSTALL_HINT: &str = "Install with: brew install p7zip";
#[cfg(windows)]
pub const SEVEN_ZIP_INSTALL_HINT: &str = "Install 7-Zip from https://www.7-zip.org";
#[cfg(not(any(target_os = "macos", windows)))]
pub const SEVEN_ZIP_INSTALL_HINT: &str =
    "Install the p7zip package (for example: sudo apt install p7zip-full)";

/// Name used for multi-input archives before collision handling
const MULTI_ARCHIVE_STEM: &str = "Archive";
const STAGE_PREFIX: &str = ".zip-stage-";

/// Archive formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
}

impl ArchiveFormat {
    /// Detect by extension, case-insensitively
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "7z" | "7zip" => Ok(ArchiveFormat::SevenZip),
            "" => Err(FsError::UnsupportedFormat(path.display().to_string())),
            other => Err(FsError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// An external archiver backend
pub trait ArchiveTool: Send + Sync {
    fn name(&self) -> &str;

    /// Archive `names` (relative to `working_dir`, recursively) into `output`
    fn compress(&self, working_dir: &Path, names: &[OsString], output: &Path) -> Result<()>;

    /// Unpack `archive` into `dest_dir`, overwriting existing files
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZipFlavor {
    /// macOS `ditto`, with `zip` for multi-entry archives
    Ditto,
    /// Info-ZIP `zip` / `unzip`
    InfoZip,
    /// bsdtar in zip mode (ships with Windows 10+)
    BsdTar,
}

/// Platform zip backend
#[derive(Debug, Clone)]
pub struct ZipTool {
    flavor: ZipFlavor,
    zip_program: PathBuf,
    unzip_program: PathBuf,
}

impl ZipTool {
    /// The zip tooling that ships with (or is usual on) this platform
    pub fn platform() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                flavor: ZipFlavor::Ditto,
                zip_program: PathBuf::from("/usr/bin/zip"),
                unzip_program: PathBuf::from("/usr/bin/ditto"),
            }
        } else if cfg!(windows) {
            Self {
                flavor: ZipFlavor::BsdTar,
                zip_program: PathBuf::from("tar"),
                unzip_program: PathBuf::from("tar"),
            }
        } else {
            Self::info_zip("zip", "unzip")
        }
    }

    /// Info-ZIP style `zip` and `unzip` at the given locations
    pub fn info_zip(zip_program: impl Into<PathBuf>, unzip_program: impl Into<PathBuf>) -> Self {
        Self {
            flavor: ZipFlavor::InfoZip,
            zip_program: zip_program.into(),
            unzip_program: unzip_program.into(),
        }
    }
}

impl ArchiveTool for ZipTool {
    fn name(&self) -> &str {
        "zip"
    }

    fn compress(&self, working_dir: &Path, names: &[OsString], output: &Path) -> Result<()> {
        let mut cmd = match (self.flavor, names) {
            (ZipFlavor::Ditto, [single]) => {
                let mut cmd = Command::new("/usr/bin/ditto");
                cmd.args(["-c", "-k", "--sequesterRsrc", "--keepParent"])
                    .arg(working_dir.join(single))
                    .arg(output);
                cmd
            }
            (ZipFlavor::BsdTar, _) => {
                let mut cmd = Command::new(&self.zip_program);
                cmd.args(["-a", "-c", "-f"]).arg(output).args(names);
                cmd
            }
            _ => {
                let mut cmd = Command::new(&self.zip_program);
                cmd.args(["-r", "-q", "-y"]).arg(output).args(names);
                cmd
            }
        };
        cmd.current_dir(working_dir);
        run_tool(self.name(), &mut cmd)
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.unzip_program);
        match self.flavor {
            ZipFlavor::Ditto => {
                cmd.args(["-x", "-k"]).arg(archive).arg(dest_dir);
            }
            ZipFlavor::BsdTar => {
                cmd.arg("-x").arg("-f").arg(archive).arg("-C").arg(dest_dir);
            }
            ZipFlavor::InfoZip => {
                cmd.args(["-o", "-q"]).arg(archive).arg("-d").arg(dest_dir);
            }
        }
        cmd.current_dir(dest_dir);
        run_tool(self.name(), &mut cmd)
    }
}

/// 7-zip family backend (`7z`, `7zz`, `7za`)
#[derive(Debug, Clone)]
pub struct SevenZipTool {
    binary: PathBuf,
}

impl SevenZipTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// First existing binary among `candidates`, in order
    pub fn locate(candidates: &[PathBuf]) -> Result<Self> {
        candidates
            .iter()
            .find(|p| p.is_file())
            .map(|p| Self::new(p.clone()))
            .ok_or_else(|| FsError::ToolNotFound {
                tool: "7z".to_string(),
                hint: SEVEN_ZIP_INSTALL_HINT.to_string(),
            })
    }

    /// Known install locations, checked in this order
    pub fn default_candidates() -> Vec<PathBuf> {
        if cfg!(windows) {
            vec![
                PathBuf::from(r"C:\Program Files\7-Zip\7z.exe"),
                PathBuf::from(r"C:\Program Files (x86)\7-Zip\7z.exe"),
            ]
        } else {
            ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
                .iter()
                .flat_map(|dir| ["7z", "7zz", "7za"].map(|bin| Path::new(dir).join(bin)))
                .collect()
        }
    }
}

impl ArchiveTool for SevenZipTool {
    fn name(&self) -> &str {
        "7z"
    }

    fn compress(&self, working_dir: &Path, names: &[OsString], output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["a", "-y", "-r"]).arg(output).args(names).current_dir(working_dir);
        run_tool(self.name(), &mut cmd)
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let mut output_flag = OsString::from("-o");
        output_flag.push(dest_dir);

        let mut cmd = Command::new(&self.binary);
        cmd.args(["x", "-y"]).arg(output_flag).arg(archive).current_dir(dest_dir);
        run_tool(self.name(), &mut cmd)
    }
}

/// Run a tool to completion; non-zero exit surfaces its stderr verbatim
fn run_tool(tool: &str, cmd: &mut Command) -> Result<()> {
    tracing::debug!("Running {}: {:?}", tool, cmd);

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FsError::ToolNotFound {
                tool: tool.to_string(),
                hint: format!("Make sure {} is installed and on PATH.", tool),
            }
        } else {
            FsError::Io(e)
        }
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("{} exited with {}", tool, output.status)
    } else {
        stderr
    };
    tracing::warn!("{} failed: {}", tool, message);

    Err(FsError::ToolFailed {
        tool: tool.to_string(),
        message,
    })
}

/// First free `<stem>.zip`, `<stem> (2).zip`, `<stem> (3).zip`, ... in `dir`
pub fn unique_archive_name(dir: &Path, stem: &str) -> PathBuf {
    let first = dir.join(format!("{}.zip", stem));
    if fs::symlink_metadata(&first).is_err() {
        return first;
    }

    (2u32..)
        .map(|n| dir.join(format!("{} ({}).zip", stem, n)))
        .find(|candidate| fs::symlink_metadata(candidate).is_err())
        .unwrap_or(first)
}

/// Compression and extraction entry point
#[derive(Clone)]
pub struct ArchiveBridge {
    zip: Arc<dyn ArchiveTool>,
    seven_zip_candidates: Vec<PathBuf>,
}

impl ArchiveBridge {
    pub fn new(zip: Arc<dyn ArchiveTool>, seven_zip_candidates: Vec<PathBuf>) -> Self {
        Self {
            zip,
            seven_zip_candidates,
        }
    }

    /// Zip `paths` into `dest_dir`, never overwriting an existing archive.
    ///
    /// One input becomes `<basename>.zip`. Several inputs are copied into a
    /// staging directory first and packed as `Archive.zip`.
    pub fn compress(&self, paths: &[PathBuf], dest_dir: &Path) -> Result<PathBuf> {
        if paths.is_empty() {
            return Err(FsError::EmptyInput);
        }

        let metadata =
            fs::metadata(dest_dir).map_err(|_| FsError::NotFound(dest_dir.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(dest_dir.to_path_buf()));
        }

        for path in paths {
            if fs::symlink_metadata(path).is_err() {
                return Err(FsError::NotFound(path.clone()));
            }
        }

        let archive = match paths {
            [single] => self.compress_single(single, dest_dir)?,
            _ => self.compress_staged(paths, dest_dir)?,
        };

        tracing::info!("Compressed {} item(s) into {}", paths.len(), archive.display());
        Ok(archive)
    }

    fn compress_single(&self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| FsError::InvalidName(path.display().to_string()))?;
        let parent = path.parent().unwrap_or(Path::new("."));

        let output = unique_archive_name(dest_dir, &name.to_string_lossy());
        self.zip.compress(parent, &[name.to_os_string()], &output)?;
        Ok(output)
    }

    fn compress_staged(&self, paths: &[PathBuf], dest_dir: &Path) -> Result<PathBuf> {
        let stage = tempfile::Builder::new().prefix(STAGE_PREFIX).tempdir()?;
        tracing::debug!("Created staging directory {}", stage.path().display());

        let stage_root = CanonicalPath::new(stage.path());
        if let Some(outer) = paths.iter().find(|p| stage_root.is_within(&CanonicalPath::new(p))) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Cannot stage {} inside itself", outer.display()),
            )));
        }

        let mut names = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .ok_or_else(|| FsError::InvalidName(path.display().to_string()))?;
            let staged = stage.path().join(name);
            if fs::symlink_metadata(&staged).is_ok() {
                return Err(FsError::DestinationExists(staged));
            }
            copy_recursive(path, &staged)?;
            names.push(name.to_os_string());
        }

        let output = unique_archive_name(dest_dir, MULTI_ARCHIVE_STEM);
        self.zip.compress(stage.path(), &names, &output)?;

        let stage_path = stage.path().to_path_buf();
        if let Err(e) = stage.close() {
            tracing::warn!("Failed to remove staging directory {}: {}", stage_path.display(), e);
        }
        Ok(output)
    }

    /// Unpack `archive` into `dest_dir`, dispatching on its extension
    pub fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let format = ArchiveFormat::from_path(archive)?;

        if !archive.is_file() {
            return Err(FsError::NotFound(archive.to_path_buf()));
        }

        let metadata =
            fs::metadata(dest_dir).map_err(|_| FsError::NotFound(dest_dir.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(dest_dir.to_path_buf()));
        }

        match format {
            ArchiveFormat::Zip => self.zip.extract(archive, dest_dir)?,
            ArchiveFormat::SevenZip => {
                SevenZipTool::locate(&self.seven_zip_candidates)?.extract(archive, dest_dir)?
            }
        }

        tracing::info!("Extracted {} into {}", archive.display(), dest_dir.display());
        Ok(())
    }
}

impl Default for ArchiveBridge {
    fn default() -> Self {
        Self::new(Arc::new(ZipTool::platform()), SevenZipTool::default_candidates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records each call and writes a placeholder archive
    #[derive(Default)]
    struct FakeZip {
        calls: Mutex<Vec<(PathBuf, Vec<String>, PathBuf)>>,
        staged_files: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    impl ArchiveTool for FakeZip {
        fn name(&self) -> &str {
            "fake-zip"
        }

        fn compress(&self, working_dir: &Path, names: &[OsString], output: &Path) -> Result<()> {
            let names: Vec<String> = names.iter().map(|n| n.to_string_lossy().to_string()).collect();
            let mut staged: Vec<String> = fs::read_dir(working_dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            staged.sort();
            *self.staged_files.lock().unwrap() = staged;
            self.calls
                .lock()
                .unwrap()
                .push((working_dir.to_path_buf(), names, output.to_path_buf()));

            if let Some(message) = &self.fail_with {
                return Err(FsError::ToolFailed {
                    tool: "fake-zip".into(),
                    message: message.clone(),
                });
            }
            fs::write(output, b"PK").map_err(FsError::from)
        }

        fn extract(&self, _archive: &Path, dest_dir: &Path) -> Result<()> {
            fs::write(dest_dir.join("extracted.txt"), b"ok").map_err(FsError::from)
        }
    }

    fn bridge(zip: Arc<FakeZip>, candidates: Vec<PathBuf>) -> ArchiveBridge {
        ArchiveBridge::new(zip, candidates)
    }

    fn staging_dir_of(zip: &FakeZip) -> PathBuf {
        zip.calls.lock().unwrap()[0].0.clone()
    }

    #[test]
    fn test_unique_archive_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        assert_eq!(unique_archive_name(dir, "Notes"), dir.join("Notes.zip"));
        fs::write(dir.join("Notes.zip"), "").unwrap();
        assert_eq!(unique_archive_name(dir, "Notes"), dir.join("Notes (2).zip"));
        fs::write(dir.join("Notes (2).zip"), "").unwrap();
        assert_eq!(unique_archive_name(dir, "Notes"), dir.join("Notes (3).zip"));
    }

    #[test]
    fn test_single_folder_avoids_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let notes = tmp.path().join("Notes");
        fs::create_dir(&notes).unwrap();
        fs::write(tmp.path().join("Notes.zip"), "existing").unwrap();

        let zip = Arc::new(FakeZip::default());
        let archive = bridge(zip.clone(), vec![]).compress(&[notes.clone()], tmp.path()).unwrap();

        assert_eq!(archive, tmp.path().join("Notes (2).zip"));
        assert_eq!(fs::read_to_string(tmp.path().join("Notes.zip")).unwrap(), "existing");

        let calls = zip.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, tmp.path());
        assert_eq!(calls[0].1, vec!["Notes".to_string()]);
    }

    #[test]
    fn test_multiple_inputs_are_staged_and_cleaned_up() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("photos")).unwrap();
        fs::write(src.join("photos").join("a.jpg"), "jpg").unwrap();
        fs::write(src.join("readme.md"), "md").unwrap();
        let out = tmp.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("Archive.zip"), "").unwrap();

        let zip = Arc::new(FakeZip::default());
        let archive = bridge(zip.clone(), vec![])
            .compress(&[src.join("photos"), src.join("readme.md")], &out)
            .unwrap();

        assert_eq!(archive, out.join("Archive (2).zip"));
        assert_eq!(*zip.staged_files.lock().unwrap(), vec!["photos", "readme.md"]);
        let stage = staging_dir_of(&zip);
        assert!(stage.file_name().unwrap().to_string_lossy().starts_with(STAGE_PREFIX));
        assert!(!stage.starts_with(&out));
        assert!(!stage.exists());
        assert!(src.join("photos").join("a.jpg").exists());
    }

    #[test]
    fn test_destination_may_be_one_of_the_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        let album = tmp.path().join("album");
        fs::create_dir(&album).unwrap();
        fs::write(album.join("a.jpg"), "jpg").unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();

        let zip = Arc::new(FakeZip::default());
        let archive = bridge(zip.clone(), vec![])
            .compress(&[album.clone(), tmp.path().join("b.txt")], &album)
            .unwrap();

        assert_eq!(archive, album.join("Archive.zip"));
        assert_eq!(*zip.staged_files.lock().unwrap(), vec!["album", "b.txt"]);
        let mut left: Vec<_> = fs::read_dir(&album)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(left, vec!["Archive.zip", "a.jpg"]);
    }

    #[test]
    fn test_input_containing_staging_area_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();

        let zip = Arc::new(FakeZip::default());
        let err = bridge(zip.clone(), vec![])
            .compress(&[std::env::temp_dir(), tmp.path().join("b.txt")], tmp.path())
            .unwrap_err();

        match err {
            FsError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        assert!(zip.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stage_removed_when_tool_fails() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();

        let zip = Arc::new(FakeZip {
            fail_with: Some("zip I/O error: No space left on device".into()),
            ..Default::default()
        });
        let err = bridge(zip.clone(), vec![])
            .compress(&[tmp.path().join("a.txt"), tmp.path().join("b.txt")], tmp.path())
            .unwrap_err();

        assert_eq!(err.to_string(), "zip I/O error: No space left on device");
        assert!(!staging_dir_of(&zip).exists());
    }

    #[test]
    fn test_empty_and_missing_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        let b = bridge(Arc::new(FakeZip::default()), vec![]);

        assert!(matches!(b.compress(&[], tmp.path()), Err(FsError::EmptyInput)));
        assert!(matches!(
            b.compress(&[tmp.path().join("ghost")], tmp.path()),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ArchiveFormat::from_path(Path::new("a.ZIP")).unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_path(Path::new("a.7z")).unwrap(), ArchiveFormat::SevenZip);
        assert_eq!(ArchiveFormat::from_path(Path::new("a.7Zip")).unwrap(), ArchiveFormat::SevenZip);
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("a.rar")),
            Err(FsError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("noext")),
            Err(FsError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_extract_dispatch() {
        let tmp = tempfile::tempdir().unwrap();
        let b = bridge(Arc::new(FakeZip::default()), vec![tmp.path().join("no-7z")]);

        let rar = tmp.path().join("x.rar");
        fs::write(&rar, "").unwrap();
        assert!(matches!(b.extract(&rar, tmp.path()), Err(FsError::UnsupportedFormat(_))));

        let seven = tmp.path().join("x.7z");
        fs::write(&seven, "").unwrap();
        match b.extract(&seven, tmp.path()) {
            Err(FsError::ToolNotFound { hint, .. }) => assert_eq!(hint, SEVEN_ZIP_INSTALL_HINT),
            other => panic!("expected ToolNotFound, got {:?}", other),
        }

        let zip = tmp.path().join("x.Zip");
        fs::write(&zip, "").unwrap();
        b.extract(&zip, tmp.path()).unwrap();
        assert!(tmp.path().join("extracted.txt").exists());
    }

    #[test]
    fn test_locate_checks_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let second = tmp.path().join("7zz");
        let third = tmp.path().join("7za");
        fs::write(&second, "").unwrap();
        fs::write(&third, "").unwrap();

        let tool = SevenZipTool::locate(&[tmp.path().join("7z"), second.clone(), third]).unwrap();
        assert_eq!(tool.binary, second);
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_seven_zip_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("args.log");
        let bin = script(tmp.path(), "7z", &format!("echo \"$@\" > '{}'", log.display()));
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        let archive = tmp.path().join("pack.7z");
        fs::write(&archive, "").unwrap();

        let b = bridge(Arc::new(FakeZip::default()), vec![tmp.path().join("missing"), bin]);
        b.extract(&archive, &dest).unwrap();

        let args = fs::read_to_string(&log).unwrap();
        assert_eq!(
            args.trim(),
            format!("x -y -o{} {}", dest.display(), archive.display())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_stderr_is_surfaced_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = script(tmp.path(), "7z", "echo 'ERROR: Can not open the file as archive' >&2; exit 2");
        let archive = tmp.path().join("broken.7z");
        fs::write(&archive, "").unwrap();

        let err = SevenZipTool::new(bin).extract(&archive, tmp.path()).unwrap_err();
        match err {
            FsError::ToolFailed { message, .. } => {
                assert_eq!(message, "ERROR: Can not open the file as archive")
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_binary_is_tool_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = ZipTool::info_zip(tmp.path().join("zip"), tmp.path().join("unzip"));
        let archive = tmp.path().join("a.zip");
        fs::write(&archive, "").unwrap();

        assert!(matches!(
            tool.extract(&archive, tmp.path()),
            Err(FsError::ToolNotFound { .. })
        ));
    }
}
