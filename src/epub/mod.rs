mod retitle;
mod writer;

pub use retitle::{retitle_archive, retitle_epub, set_opf_title};
pub use writer::{stable_identifier, write_epub, write_epub_to_writer};
