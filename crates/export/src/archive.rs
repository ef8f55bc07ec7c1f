use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use classify::ExtractionResult;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::ExportError;

/// Packs every receipt plus the table into a zip at `out_path`.
///
/// Receipts are stored flat under their file names. Names already used in
/// the archive get a ` (n)` suffix before the extension.
pub fn write_archive<'a, I>(results: I, table_path: &Path, out_path: &Path) -> Result<PathBuf, ExportError>
where
    I: IntoIterator<Item = &'a ExtractionResult>,
{
    let file = File::create(out_path).map_err(|e| ExportError::io(out_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut names = EntryNames::default();
    let mut entries = 0usize;

    for result in results {
        add_file(&mut zip, options, &mut names, &result.source_path)?;
        entries += 1;
    }
    add_file(&mut zip, options, &mut names, table_path)?;

    let mut writer = zip.finish()?;
    writer.flush().map_err(|e| ExportError::io(out_path, e))?;

    info!(path = %out_path.display(), receipts = entries, "archive_written");
    Ok(out_path.to_path_buf())
}

fn add_file<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    names: &mut EntryNames,
    path: &Path,
) -> Result<(), ExportError> {
    let mut source = File::open(path).map_err(|e| ExportError::io(path, e))?;
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "receipt".to_string());
    zip.start_file(names.claim(&base), options)?;
    std::io::copy(&mut source, zip).map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

#[derive(Default)]
struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    fn claim(&mut self, wanted: &str) -> String {
        if self.used.insert(wanted.to_string()) {
            return wanted.to_string();
        }
        let (stem, ext) = match wanted.rfind('.') {
            Some(idx) if idx > 0 => (&wanted[..idx], &wanted[idx..]),
            _ => (wanted, ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn receipt_at(path: PathBuf) -> ExtractionResult {
        ExtractionResult {
            source_path: path,
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let mut names = EntryNames::default();
        assert_eq!(names.claim("scan.pdf"), "scan.pdf");
        assert_eq!(names.claim("scan.pdf"), "scan (1).pdf");
        assert_eq!(names.claim("scan.pdf"), "scan (2).pdf");
        assert_eq!(names.claim("README"), "README");
        assert_eq!(names.claim("README"), "README (1)");
    }

    #[test]
    fn archive_contains_receipts_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("kvitto.jpg"), b"first").unwrap();
        std::fs::write(b.join("kvitto.jpg"), b"second").unwrap();
        let table = dir.path().join("expenses_Oct2026.csv");
        std::fs::write(&table, "Utläggsräkning\n").unwrap();

        let results = vec![receipt_at(a.join("kvitto.jpg")), receipt_at(b.join("kvitto.jpg"))];
        let out = dir.path().join("receipts.zip");
        write_archive(&results, &table, &out).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, ["expenses_Oct2026.csv", "kvitto (1).jpg", "kvitto.jpg"]);

        let mut body = String::new();
        archive
            .by_name("kvitto (1).jpg")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "second");
    }

    #[test]
    fn missing_receipt_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("t.csv");
        std::fs::write(&table, "x").unwrap();
        let results = vec![receipt_at(dir.path().join("gone.jpg"))];
        let err = write_archive(&results, &table, &dir.path().join("out.zip")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
