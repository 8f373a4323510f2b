//! # txtbook
//!
//! Compile illustrated plain-text novels into EPUB books.
//!
//! ## Features
//!
//! - Split a novel into chapters on `第…卷` heading lines
//! - Place numbered illustrations (`插圖N`) from an image directory, with
//!   skipped images collected into a preface and leftovers appended at the end
//! - Write EPUB 3 packages with an EPUB 2 NCX for older readers
//! - Retitle existing EPUB files in place
//! - Download numbered image sequences from an image host
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use txtbook::pipeline::{BuildOptions, build_epub};
//!
//! let report = build_epub(
//!     Path::new("novel.txt"),
//!     Path::new("novel.epub"),
//!     &BuildOptions::default(),
//! )
//! .unwrap();
//! println!("{} chapters, {} images", report.chapters, report.images);
//! ```
//!
//! ## Working with the Compiler
//!
//! The compiler only needs a way to look up image numbers, so it can run
//! against anything implementing [`ImageSource`]:
//!
//! ```
//! use txtbook::{Book, Metadata, compile};
//! use txtbook::images::ImageFile;
//!
//! let no_images = |_: u32| -> Option<ImageFile> { None };
//! let compiled = compile(["第一卷 開始", "正文"], &no_images);
//! assert_eq!(compiled.chapters.len(), 1);
//!
//! let book = Book::assemble(&compiled, Metadata::new("My Book").with_author("Auto")).unwrap();
//! assert_eq!(book.toc[0].title, "第一卷 開始");
//! ```

pub mod book;
pub mod compiler;
pub mod download;
pub mod epub;
pub mod error;
pub mod images;
pub mod pipeline;
pub mod render;
pub(crate) mod util;

pub use book::{Book, Metadata, Resource, SpineItem, TocEntry};
pub use compiler::{Block, Chapter, CompiledBook, Compiler, compile};
pub use epub::{retitle_epub, write_epub};
pub use error::{Error, Result};
pub use images::{ImageDir, ImageFile, ImageSource};
