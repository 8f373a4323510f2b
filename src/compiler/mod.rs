//! Text to book compiler.
//!
//! Turns the lines of a plain-text novel into an ordered list of chapters
//! with illustrations interleaved, in a single forward pass:
//!
//! - `第…卷` lines open a new chapter.
//! - `插圖N` lines insert image `N`. Unused images below `N` are backfilled
//!   into a synthetic preface chapter placed before everything else.
//! - Anything else becomes a paragraph.
//!
//! After the last line, images past the highest one used are appended to
//! the last chapter until the first gap. Image 1 doubles as the cover and
//! only enters the book when a marker asks for it.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use txtbook::compiler::{Block, compile};
//! use txtbook::images::ImageFile;
//!
//! let images = |n: u32| {
//!     (1..=3).contains(&n).then(|| ImageFile {
//!         number: n,
//!         path: PathBuf::from(format!("pics/{n}.jpg")),
//!         extension: "jpg",
//!         media_type: "image/jpeg",
//!     })
//! };
//!
//! let book = compile(["第一卷 序", "插圖3", "hello"], &images);
//! assert_eq!(book.chapters.len(), 2);
//! assert_eq!(book.chapters[0].blocks, vec![Block::Image(1), Block::Image(2)]);
//! assert_eq!(
//!     book.chapters[1].blocks,
//!     vec![Block::Image(3), Block::Paragraph("hello".into())]
//! );
//! ```

mod classify;

pub use classify::{LineKind, classify};

use std::collections::BTreeMap;

use crate::images::{ImageFile, ImageSource};

/// Title of the synthetic chapter holding backfilled images.
pub const PREFACE_TITLE: &str = "插圖";

/// A unit of chapter content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A line of text, verbatim.
    Paragraph(String),
    /// Reference to an image in the manifest.
    Image(u32),
    /// Separator placed before each trailing image.
    Rule,
}

/// A finished chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Position used for file naming. The preface is 0, real chapters count from 1.
    pub index: usize,
    /// Raw heading line; `None` for text that precedes the first heading.
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Chapter {
    pub fn is_preface(&self) -> bool {
        self.index == 0
    }

    /// Image numbers referenced by this chapter, in order.
    pub fn image_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.blocks.iter().filter_map(|block| match block {
            Block::Image(n) => Some(*n),
            _ => None,
        })
    }
}

/// Images emitted into the document, keyed by number.
///
/// Every number appears at most once; [`ImageManifest::insert`] refuses
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageManifest {
    images: BTreeMap<u32, ImageFile>,
}

impl ImageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.images.contains_key(&number)
    }

    pub fn get(&self, number: u32) -> Option<&ImageFile> {
        self.images.get(&number)
    }

    /// Record an image. Returns false if its number was already present.
    pub fn insert(&mut self, image: ImageFile) -> bool {
        if self.contains(image.number) {
            return false;
        }
        self.images.insert(image.number, image);
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Images in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageFile> {
        self.images.values()
    }
}

/// Output of one compile: everything the packager needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledBook {
    /// Image 1, if present. Not part of the manifest unless a marker used it.
    pub cover: Option<ImageFile>,
    pub chapters: Vec<Chapter>,
    pub images: ImageManifest,
}

impl CompiledBook {
    pub fn preface(&self) -> Option<&Chapter> {
        self.chapters.first().filter(|c| c.is_preface())
    }

    /// Number of chapters opened by a heading line.
    pub fn heading_count(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| !c.is_preface() && c.title.is_some())
            .count()
    }
}

/// Chapter being filled. Starts untitled so text before the first heading
/// has somewhere to go.
#[derive(Debug, Default)]
struct OpenChapter {
    title: Option<String>,
    blocks: Vec<Block>,
}

/// Single-pass chapter builder.
///
/// Feed lines with [`Compiler::feed`], then call [`Compiler::finish`].
pub struct Compiler<'a, S: ImageSource + ?Sized> {
    images: &'a S,
    manifest: ImageManifest,
    backlog: Vec<u32>,
    sealed: Vec<Chapter>,
    open: OpenChapter,
    cover: Option<ImageFile>,
}

impl<'a, S: ImageSource + ?Sized> Compiler<'a, S> {
    /// Create a compiler and look up the cover image.
    pub fn new(images: &'a S) -> Self {
        Self {
            cover: images.locate(1),
            images,
            manifest: ImageManifest::new(),
            backlog: Vec::new(),
            sealed: Vec::new(),
            open: OpenChapter::default(),
        }
    }

    /// Process one source line.
    pub fn feed(&mut self, line: &str) {
        match classify(line) {
            LineKind::Blank => {}
            LineKind::Chapter(title) => {
                self.seal();
                self.open.title = Some(title.to_string());
            }
            LineKind::Image(number) => self.insert_image(number),
            LineKind::Text(text) => self.open.blocks.push(Block::Paragraph(text.to_string())),
        }
    }

    /// Seal the last chapter, append trailing images and the preface.
    pub fn finish(mut self) -> CompiledBook {
        self.seal();

        if !self.sealed.is_empty() {
            self.append_trailing_images();
        }

        if !self.backlog.is_empty() {
            let preface = Chapter {
                index: 0,
                title: Some(PREFACE_TITLE.to_string()),
                blocks: self.backlog.iter().copied().map(Block::Image).collect(),
            };
            self.sealed.insert(0, preface);
        }

        CompiledBook {
            cover: self.cover,
            chapters: self.sealed,
            images: self.manifest,
        }
    }

    fn insert_image(&mut self, number: u32) {
        for earlier in 1..number {
            if self.emit(earlier) {
                self.backlog.push(earlier);
            }
        }
        self.emit(number);
        // Placed even when an earlier marker or backfill already added it
        if self.manifest.contains(number) {
            self.open.blocks.push(Block::Image(number));
        }
    }

    /// Add an image to the manifest if it exists and is unused.
    fn emit(&mut self, number: u32) -> bool {
        if self.manifest.contains(number) {
            return false;
        }
        let Some(image) = self.images.locate(number) else {
            return false;
        };
        tracing::debug!(number, path = %image.path.display(), "added image");
        self.manifest.insert(image)
    }

    fn seal(&mut self) {
        let open = std::mem::take(&mut self.open);
        if open.title.is_none() && open.blocks.is_empty() {
            return;
        }
        self.sealed.push(Chapter {
            index: self.sealed.len() + 1,
            title: open.title,
            blocks: open.blocks,
        });
    }

    /// Scan upward from `manifest.len() + 1` until the first missing image.
    /// Used numbers and the cover are stepped over.
    fn append_trailing_images(&mut self) {
        let Ok(start) = u32::try_from(self.manifest.len() + 1) else {
            return;
        };
        let Some(last) = self.sealed.last_mut() else {
            return;
        };

        let cover = self.cover.as_ref().map(|c| c.number);
        let mut number = start;
        while let Some(image) = self.images.locate(number) {
            if cover != Some(number) && self.manifest.insert(image) {
                tracing::debug!(number, "appended trailing image");
                last.blocks.push(Block::Rule);
                last.blocks.push(Block::Image(number));
            }
            match number.checked_add(1) {
                Some(next) => number = next,
                None => break,
            }
        }
    }
}

/// Compile a whole source in one call.
pub fn compile<I, L, S>(lines: I, images: &S) -> CompiledBook
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
    S: ImageSource + ?Sized,
{
    let mut compiler = Compiler::new(images);
    for line in lines {
        compiler.feed(line.as_ref());
    }
    compiler.finish()
}

#[cfg(test)]
mod tests;
