use std::fs;
use std::path::Path;

use ignore::{DirEntry, WalkBuilder};

use crate::template::TemplateError;
use crate::template::placeholder::{Bindings, substitute};

/// Directory names never copied out of a source tree: version control,
/// dependency cache and build output.
pub const EXCLUDED_DIRS: [&str; 3] = [".git", "node_modules", "target"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeReport {
    pub files: usize,
    pub directories: usize,
}

/// Copy `source_root` into `dest_root`, substituting placeholders in every
/// text file. Existing destination files are overwritten.
///
/// The first read or write failure aborts the copy; whatever was already
/// written stays in place.
pub fn materialize(
    source_root: &Path,
    dest_root: &Path,
    bindings: &Bindings,
) -> Result<MaterializeReport, TemplateError> {
    if !source_root.exists() {
        return Err(TemplateError::SourceMissing {
            path: source_root.to_path_buf(),
        });
    }

    let mut report = MaterializeReport::default();
    let walker = WalkBuilder::new(source_root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !is_excluded(entry))
        .build();

    for entry in walker {
        let entry = entry.map_err(|source| TemplateError::Walk {
            root: source_root.to_path_buf(),
            source,
        })?;

        let relative = entry.path().strip_prefix(source_root).unwrap_or(entry.path());
        let dest = if relative.as_os_str().is_empty() {
            dest_root.to_path_buf()
        } else {
            dest_root.join(relative)
        };

        match entry.file_type() {
            Some(kind) if kind.is_dir() => {
                fs::create_dir_all(&dest).map_err(|err| TemplateError::io(&dest, err))?;
                report.directories += 1;
            }
            Some(kind) if kind.is_file() => {
                write_file(entry.path(), &dest, bindings)?;
                report.files += 1;
            }
            _ => {
                tracing::debug!("skipping special file {}", entry.path().display());
            }
        }
    }

    tracing::debug!(
        "materialized {} -> {} ({} files, {} directories)",
        source_root.display(),
        dest_root.display(),
        report.files,
        report.directories
    );
    Ok(report)
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

fn write_file(source: &Path, dest: &Path, bindings: &Bindings) -> Result<(), TemplateError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| TemplateError::io(parent, err))?;
    }

    let bytes = fs::read(source).map_err(|err| TemplateError::io(source, err))?;
    let rendered = match String::from_utf8(bytes) {
        Ok(text) => substitute(&text, bindings).into_bytes(),
        // Binary assets are copied as-is.
        Err(err) => err.into_bytes(),
    };

    fs::write(dest, rendered).map_err(|err| TemplateError::io(dest, err))?;
    tracing::debug!("wrote {}", dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bindings() -> Bindings {
        Bindings::from([("PROJECT_NAME".to_string(), "Acme".to_string())])
    }

    #[test]
    fn copies_tree_and_substitutes() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("src/lib")).unwrap();
        fs::write(src.path().join("README.md"), "# {{PROJECT_NAME}}\n").unwrap();
        fs::write(src.path().join("src/lib/app.txt"), "{{PROJECT_NAME}} {{OTHER}}").unwrap();

        let report = materialize(src.path(), &dest.path().join("out"), &bindings()).unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("out/README.md")).unwrap(),
            "# Acme\n"
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("out/src/lib/app.txt")).unwrap(),
            "Acme {{OTHER}}"
        );
    }

    #[test]
    fn excluded_directories_are_never_created() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        for dir in EXCLUDED_DIRS {
            fs::create_dir_all(src.path().join(dir).join("nested")).unwrap();
            fs::write(src.path().join(dir).join("nested/file"), "x").unwrap();
        }
        fs::create_dir_all(src.path().join("app/node_modules")).unwrap();
        fs::write(src.path().join(".gitignore"), "target/\n").unwrap();

        materialize(src.path(), dest.path(), &bindings()).unwrap();

        for dir in EXCLUDED_DIRS {
            assert!(!dest.path().join(dir).exists(), "{dir} was copied");
        }
        assert!(!dest.path().join("app/node_modules").exists());
        assert!(dest.path().join("app").is_dir());
        assert!(dest.path().join(".gitignore").is_file());
    }

    #[test]
    fn overwrites_existing_files() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "new {{PROJECT_NAME}}").unwrap();
        fs::write(dest.path().join("a.txt"), "old contents that are longer").unwrap();

        materialize(src.path(), dest.path(), &bindings()).unwrap();

        assert_eq!(fs::read_to_string(dest.path().join("a.txt")).unwrap(), "new Acme");
    }

    #[test]
    fn binary_files_are_copied_verbatim() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let blob = [0xff_u8, 0xfe, b'{', b'{', 0x00, 0x80];
        fs::write(src.path().join("favicon.ico"), blob).unwrap();

        materialize(src.path(), dest.path(), &bindings()).unwrap();

        assert_eq!(fs::read(dest.path().join("favicon.ico")).unwrap(), blob);
    }

    #[test]
    fn missing_source_fails() {
        let dest = TempDir::new().unwrap();
        let err = materialize(&dest.path().join("nope"), dest.path(), &Bindings::new()).unwrap_err();
        assert!(matches!(err, TemplateError::SourceMissing { .. }));
    }
}
