//! Numbered image lookup.
//!
//! Images live in a flat directory as `1.png`, `2.jpg`, `3.jpeg`, ...
//! A number resolves to the first existing file in [`EXTENSIONS`] order.

use std::path::{Path, PathBuf};

/// Probe order for image extensions, paired with their media types.
pub const EXTENSIONS: [(&str, &str); 3] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// A located image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub number: u32,
    pub path: PathBuf,
    pub extension: &'static str,
    pub media_type: &'static str,
}

impl ImageFile {
    /// Path of this image inside the packaged book, e.g. `images/3.jpg`.
    pub fn href(&self) -> String {
        format!("images/{}.{}", self.number, self.extension)
    }
}

/// Anything that can answer "where is image `n`?".
///
/// The compiler only ever talks to images through this trait, so tests can
/// substitute an in-memory table or a closure.
pub trait ImageSource {
    fn locate(&self, number: u32) -> Option<ImageFile>;
}

impl<F> ImageSource for F
where
    F: Fn(u32) -> Option<ImageFile>,
{
    fn locate(&self, number: u32) -> Option<ImageFile> {
        self(number)
    }
}

/// Resolve image `number` under `dir` using an injected existence check.
///
/// Returns the first candidate for which `exists` is true. No retries: a
/// `None` here is final.
pub fn resolve_with<F>(dir: &Path, number: u32, exists: F) -> Option<ImageFile>
where
    F: Fn(&Path) -> bool,
{
    EXTENSIONS.iter().find_map(|&(extension, media_type)| {
        let path = dir.join(format!("{number}.{extension}"));
        exists(&path).then(|| ImageFile {
            number,
            path,
            extension,
            media_type,
        })
    })
}

/// Look up a media type for an image extension, case-insensitively.
pub fn media_type_for(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// A directory of numbered images on disk.
#[derive(Debug, Clone)]
pub struct ImageDir {
    root: PathBuf,
}

impl ImageDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageSource for ImageDir {
    fn locate(&self, number: u32) -> Option<ImageFile> {
        let found = resolve_with(&self.root, number, Path::is_file);
        if let Some(ref image) = found {
            tracing::debug!(path = %image.path.display(), "found image");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn exists_in(names: &[&str]) -> impl Fn(&Path) -> bool {
        let set: HashSet<PathBuf> = names.iter().map(|n| Path::new("pics").join(n)).collect();
        move |p: &Path| set.contains(p)
    }

    #[test]
    fn test_png_wins_over_jpg() {
        let found = resolve_with(Path::new("pics"), 4, exists_in(&["4.jpg", "4.png"])).unwrap();
        assert_eq!(found.extension, "png");
        assert_eq!(found.media_type, "image/png");
        assert_eq!(found.path, Path::new("pics/4.png"));
    }

    #[test]
    fn test_jpeg_is_last_resort() {
        let found = resolve_with(Path::new("pics"), 2, exists_in(&["2.jpeg"])).unwrap();
        assert_eq!(found.extension, "jpeg");
        assert_eq!(found.media_type, "image/jpeg");
        assert_eq!(found.href(), "images/2.jpeg");
    }

    #[test]
    fn test_missing_image() {
        assert!(resolve_with(Path::new("pics"), 9, exists_in(&["8.png", "9.gif"])).is_none());
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("JPG"), Some("image/jpeg"));
        assert_eq!(media_type_for("png"), Some("image/png"));
        assert_eq!(media_type_for("gif"), None);
    }

    #[test]
    fn test_image_dir_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.jpg"), b"jpg").unwrap();
        std::fs::create_dir(dir.path().join("2.png")).unwrap();

        let images = ImageDir::new(dir.path());
        assert_eq!(images.locate(1).unwrap().extension, "jpg");
        // A directory named like an image is not an image
        assert!(images.locate(2).is_none());
        assert!(images.locate(3).is_none());
    }
}
