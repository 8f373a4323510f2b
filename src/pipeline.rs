//! End-to-end build: read a text file, compile it against an image
//! directory and write the EPUB.

use std::path::{Path, PathBuf};

use crate::book::{Book, Metadata};
use crate::compiler::compile;
use crate::epub::{stable_identifier, write_epub};
use crate::error::{Error, Result};
use crate::images::ImageDir;
use crate::util::decode_text;

pub const DEFAULT_LANGUAGE: &str = "zh";
pub const DEFAULT_AUTHOR: &str = "Auto";
pub const DEFAULT_IMAGES_DIR: &str = "pics";

/// Options for [`build_epub`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Book title. Defaults to the source file stem.
    pub title: Option<String>,
    pub author: String,
    pub language: String,
    /// Package identifier. Derived from the title when unset.
    pub identifier: Option<String>,
    /// WHATWG encoding label of the source. UTF-8 when unset.
    pub encoding: Option<String>,
    pub images_dir: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            title: None,
            author: DEFAULT_AUTHOR.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            identifier: None,
            encoding: None,
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
        }
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BuildReport {
    pub output: PathBuf,
    pub title: String,
    /// Content documents, preface included.
    pub chapters: usize,
    /// Chapters opened by a heading line.
    pub headings: usize,
    /// Images placed in chapters. The cover only counts when referenced.
    pub images: usize,
    pub has_cover: bool,
    pub has_preface: bool,
}

/// Compile `source` into an EPUB at `output`.
///
/// Fails without writing anything when the source cannot be read or
/// decoded. A failed write leaves no partial file behind.
pub fn build_epub(source: &Path, output: &Path, options: &BuildOptions) -> Result<BuildReport> {
    let bytes = std::fs::read(source).map_err(|e| Error::source_read(source, e))?;
    let text = decode_text(&bytes, options.encoding.as_deref()).map_err(|e| match e {
        Error::UnknownEncoding(_) => e,
        other => Error::source_read(source, other),
    })?;

    let title = match options.title {
        Some(ref title) => title.clone(),
        None => title_from_path(source),
    };

    let images = ImageDir::new(&options.images_dir);
    let compiled = compile(text.lines(), &images);

    let identifier = match options.identifier {
        Some(ref id) => id.clone(),
        None => stable_identifier(&title),
    };
    let metadata = Metadata::new(title.clone())
        .with_author(options.author.clone())
        .with_language(options.language.clone())
        .with_identifier(identifier);

    let book = Book::assemble(&compiled, metadata)?;
    write_epub(&book, output)?;

    let report = BuildReport {
        output: output.to_path_buf(),
        title,
        chapters: compiled.chapters.len(),
        headings: compiled.heading_count(),
        images: compiled.images.len(),
        has_cover: compiled.cover.is_some(),
        has_preface: compiled.preface().is_some(),
    };
    tracing::info!(
        output = %report.output.display(),
        chapters = report.chapters,
        headings = report.headings,
        images = report.images,
        cover = report.has_cover,
        "built epub"
    );
    Ok(report)
}

/// Title derived from a file name: its stem, or the whole name if it has none.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `*.txt` files directly under `dir`, sorted by name.
pub fn find_txt_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_txt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_txt && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Remove every file in `dir`, creating it if needed. Subdirectories are kept.
pub fn clean_image_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            std::fs::remove_file(&path)?;
        }
    }
    tracing::debug!(dir = %dir.display(), "cleaned image directory");
    Ok(())
}
