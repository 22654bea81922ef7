//! Zip archiving of a package directory.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Compress the contents of `dir` into `archive_path`.
///
/// Entry names are relative to `dir`, so extraction reproduces the
/// contents at the extraction root rather than nested under the original
/// directory name.
pub fn zip_dir(dir: &Path, archive_path: &Path) -> Result<()> {
    let file = File::create(archive_path)
        .with_context(|| format!("failed to create archive {}", archive_path.display()))?;
    let mut writer = ZipWriter::new(file);
    add_dir_entries(&mut writer, dir, dir)?;
    writer.finish().context("failed to finalize archive")?;
    Ok(())
}

fn add_dir_entries(writer: &mut ZipWriter<File>, root: &Path, dir: &Path) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list {}", dir.display()))?;
    // Deterministic archive layout.
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            add_dir_entries(writer, root, &path)?;
        } else {
            let name = path
                .strip_prefix(root)
                .context("archive entry outside the package root")?
                .to_string_lossy()
                .replace('\\', "/");
            writer
                .start_file(name, SimpleFileOptions::default())
                .context("failed to add archive entry")?;
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            writer.write_all(&bytes).context("failed to write archive entry")?;
        }
    }
    Ok(())
}
