use std::collections::BTreeMap;

use crate::compiler::CompiledBook;
use crate::error::{Error, Result};
use crate::render::render_document;

/// Packaging-ready representation of a compiled novel.
///
/// Content documents and images are held in memory as resources keyed by
/// their path inside the package.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub spine: Vec<SpineItem>,
    pub toc: Vec<TocEntry>,
    pub resources: BTreeMap<String, Resource>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    /// Href of the cover image resource
    pub cover_image: Option<String>,
}

/// An item in the reading order (spine)
#[derive(Debug, Clone)]
pub struct SpineItem {
    pub id: String,
    pub href: String,
}

/// A table of contents entry
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
}

/// A resource (content document or image)
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the book
    pub fn add_resource(
        &mut self,
        href: impl Into<String>,
        data: Vec<u8>,
        media_type: impl Into<String>,
    ) {
        self.resources.insert(
            href.into(),
            Resource {
                data,
                media_type: media_type.into(),
            },
        );
    }

    /// Get a resource by href
    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.get(href)
    }

    /// Add a spine item
    pub fn add_spine_item(&mut self, id: impl Into<String>, href: impl Into<String>) {
        self.spine.push(SpineItem {
            id: id.into(),
            href: href.into(),
        });
    }

    /// Build a book from compiler output, reading image bytes from disk.
    ///
    /// Chapters become `chap{index}.xhtml`, images `images/{n}.{ext}` and the
    /// cover `cover.{ext}`. Untitled chapters use the book title in the
    /// table of contents.
    pub fn assemble(compiled: &CompiledBook, metadata: Metadata) -> Result<Self> {
        let mut book = Book::new();

        if let Some(ref cover) = compiled.cover {
            let href = format!("cover.{}", cover.extension);
            let data =
                std::fs::read(&cover.path).map_err(|e| Error::packaging(&cover.path, e))?;
            book.add_resource(href.clone(), data, cover.media_type);
            book.metadata.cover_image = Some(href);
        }

        for image in compiled.images.iter() {
            let data =
                std::fs::read(&image.path).map_err(|e| Error::packaging(&image.path, e))?;
            book.add_resource(image.href(), data, image.media_type);
        }

        for chapter in &compiled.chapters {
            let id = format!("chap{}", chapter.index);
            let href = format!("{id}.xhtml");
            let title = chapter.title.as_deref().unwrap_or(&metadata.title);

            let xhtml =
                render_document(chapter, &compiled.images, title, &metadata.language);
            book.add_resource(href.clone(), xhtml.into_bytes(), "application/xhtml+xml");
            book.add_spine_item(id, href.clone());
            book.toc.push(TocEntry::new(title, href));
        }

        book.metadata = Metadata {
            cover_image: book.metadata.cover_image.take(),
            ..metadata
        };
        Ok(book)
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}
