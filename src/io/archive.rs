use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ExportError;

/// Pack every file under `source_dir` into a deflated zip at `archive_path`.
///
/// Entry names are relative to `source_dir` with `/` separators, in sorted
/// order so the same bundle always produces the same listing. Returns the
/// number of files written.
pub fn write_archive(source_dir: &Path, archive_path: &Path) -> Result<usize, ExportError> {
    let mut files = Vec::new();
    collect_files(source_dir, "", &mut files)?;
    files.sort();

    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive_path)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for name in &files {
        zip.start_file(name.as_str(), options)?;
        let mut file = File::open(source_dir.join(name))?;
        std::io::copy(&mut file, &mut zip)?;
    }
    zip.finish()?;
    Ok(files.len())
}

fn collect_files(dir: &Path, prefix: &str, files: &mut Vec<String>) -> Result<(), ExportError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = format!("{}{}", prefix, entry.file_name().to_string_lossy());
        if entry.file_type()?.is_dir() {
            collect_files(&entry.path(), &format!("{}/", name), files)?;
        } else {
            files.push(name);
        }
    }
    Ok(())
}
