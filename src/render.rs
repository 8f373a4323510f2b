//! Chapter to XHTML rendering.
//!
//! Paragraph text is embedded as-is. Source lines containing markup
//! characters are not escaped, so `<` or `&` in the novel text end up in
//! the document verbatim.

use std::fmt::Write;

use crate::compiler::{Block, Chapter, ImageManifest};
use crate::util::escape_xml;

/// Render the body markup of a chapter: heading, paragraphs, images, rules.
pub fn render_body(chapter: &Chapter, images: &ImageManifest) -> String {
    let mut body = String::new();

    if let Some(ref title) = chapter.title {
        writeln!(body, "<h1>{title}</h1>").unwrap();
    }

    for block in &chapter.blocks {
        match block {
            Block::Paragraph(text) => writeln!(body, "<p>{text}</p>").unwrap(),
            Block::Image(number) => {
                // Blocks only reference manifest entries
                if let Some(image) = images.get(*number) {
                    writeln!(body, "<img src=\"{}\"/><br/>", image.href()).unwrap();
                }
            }
            Block::Rule => body.push_str("<hr/>\n"),
        }
    }

    body
}

/// Render a complete XHTML content document for a chapter.
pub fn render_document(
    chapter: &Chapter,
    images: &ImageManifest,
    title: &str,
    language: &str,
) -> String {
    let mut doc = String::new();

    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
    writeln!(
        doc,
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{0}\" xml:lang=\"{0}\">",
        escape_xml(language)
    )
    .unwrap();
    writeln!(doc, "<head>\n  <title>{}</title>\n</head>", escape_xml(title)).unwrap();
    doc.push_str("<body>\n");
    doc.push_str(&render_body(chapter, images));
    doc.push_str("</body>\n</html>\n");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageFile;
    use std::path::PathBuf;

    fn manifest(entries: &[(u32, &'static str)]) -> ImageManifest {
        let mut manifest = ImageManifest::new();
        for &(number, extension) in entries {
            manifest.insert(ImageFile {
                number,
                path: PathBuf::from(format!("pics/{number}.{extension}")),
                extension,
                media_type: "image/jpeg",
            });
        }
        manifest
    }

    #[test]
    fn test_render_body() {
        let chapter = Chapter {
            index: 1,
            title: Some("第一卷 序".to_string()),
            blocks: vec![
                Block::Image(3),
                Block::Paragraph("hello".to_string()),
                Block::Rule,
                Block::Image(4),
            ],
        };
        let body = render_body(&chapter, &manifest(&[(3, "jpg"), (4, "png")]));

        assert_eq!(
            body,
            "<h1>第一卷 序</h1>\n\
             <img src=\"images/3.jpg\"/><br/>\n\
             <p>hello</p>\n\
             <hr/>\n\
             <img src=\"images/4.png\"/><br/>\n"
        );
    }

    #[test]
    fn test_untitled_chapter_has_no_heading() {
        let chapter = Chapter {
            index: 1,
            title: None,
            blocks: vec![Block::Paragraph("x".to_string())],
        };
        assert_eq!(render_body(&chapter, &ImageManifest::new()), "<p>x</p>\n");
    }

    #[test]
    fn test_paragraph_text_is_verbatim() {
        let chapter = Chapter {
            index: 1,
            title: None,
            blocks: vec![Block::Paragraph("<i>a</i> & b".to_string())],
        };
        assert_eq!(
            render_body(&chapter, &ImageManifest::new()),
            "<p><i>a</i> & b</p>\n"
        );
    }

    #[test]
    fn test_render_document_escapes_title() {
        let chapter = Chapter {
            index: 2,
            title: Some("A & B".to_string()),
            blocks: Vec::new(),
        };
        let doc = render_document(&chapter, &ImageManifest::new(), "A & B", "zh");

        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(doc.contains("<title>A &amp; B</title>"));
        assert!(doc.contains("lang=\"zh\""));
        assert!(doc.contains("<body>\n<h1>A & B</h1>\n</body>"));
    }
}
