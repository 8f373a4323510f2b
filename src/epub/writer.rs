use std::io::{Seek, Write};
use std::path::Path;

use time::OffsetDateTime;
use time::macros::format_description;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::book::{Book, TocEntry};
use crate::error::{Error, Result};
use crate::util::escape_xml;

/// Write a [`Book`] to an EPUB file on disk.
///
/// Creates an EPUB 3 file with OPF package document, navigation document,
/// an NCX table of contents for EPUB 2 readers, and all resources. If
/// writing fails the partial file is removed.
///
/// # Example
///
/// ```no_run
/// use txtbook::{Book, Metadata, write_epub};
///
/// let mut book = Book::new();
/// book.metadata = Metadata::new("My Book").with_author("Me");
/// write_epub(&book, "output.epub")?;
/// # Ok::<(), txtbook::Error>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| Error::packaging(path, e))?;

    if let Err(err) = write_epub_to_writer(book, file) {
        let _ = std::fs::remove_file(path);
        return Err(Error::packaging(path, err));
    }
    Ok(())
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);

    // 1. Write mimetype (must be first, uncompressed)
    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", options_stored)?;
    zip.write_all(b"application/epub+zip")?;

    // 2. Write META-INF/container.xml
    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    // Generate identifier once for consistency between OPF and NCX
    let identifier = if book.metadata.identifier.is_empty() {
        stable_identifier(&book.metadata.title)
    } else {
        book.metadata.identifier.clone()
    };

    // 3. Write content.opf
    let opf = generate_opf(book, &identifier, &modified_timestamp());
    zip.start_file("OEBPS/content.opf", options_deflate)?;
    zip.write_all(opf.as_bytes())?;

    // 4. Write navigation documents
    zip.start_file("OEBPS/nav.xhtml", options_deflate)?;
    zip.write_all(generate_nav(book).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", options_deflate)?;
    zip.write_all(generate_ncx(book, &identifier).as_bytes())?;

    // 5. Write all resources
    for (href, resource) in &book.resources {
        zip.start_file(format!("OEBPS/{href}"), options_deflate)?;
        zip.write_all(&resource.data)?;
    }

    zip.finish()?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn generate_opf(book: &Book, identifier: &str, modified: &str) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    // Dublin Core metadata
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&book.metadata.title)
    ));

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));

    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(language(book))
    ));

    for author in &book.metadata.authors {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }

    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{modified}</meta>\n"
    ));

    // Cover image meta for EPUB 2 readers
    if book.metadata.cover_image.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }

    opf.push_str("  </metadata>\n  <manifest>\n");

    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );

    for (href, resource) in &book.resources {
        let is_cover = book.metadata.cover_image.as_deref() == Some(href.as_str());
        let (id, properties) = if is_cover {
            ("cover-image".to_string(), " properties=\"cover-image\"")
        } else {
            (href_to_id(href), "")
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            id,
            escape_xml(href),
            escape_xml(&resource.media_type),
            properties
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    opf.push_str("    <itemref idref=\"nav\"/>\n");

    for item in &book.spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            href_to_id(&item.href)
        ));
    }

    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_nav(book: &Book) -> String {
    let mut nav = String::new();

    nav.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{0}" xml:lang="{0}">
<head>
  <title>{1}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{1}</h1>
    <ol>
"#,
        escape_xml(language(book)),
        escape_xml(&book.metadata.title)
    ));

    for entry in &book.toc {
        nav.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&entry.href),
            escape_xml(&entry.title)
        ));
    }

    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

fn generate_ncx(book: &Book, identifier: &str) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );

    ncx.push_str(&escape_xml(identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&book.metadata.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, entry) in book.toc.iter().enumerate() {
        write_nav_point(&mut ncx, entry, i + 1);
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn write_nav_point(ncx: &mut String, entry: &TocEntry, play_order: usize) {
    ncx.push_str(&format!(
        "    <navPoint id=\"navpoint-{play_order}\" playOrder=\"{play_order}\">\n"
    ));
    ncx.push_str(&format!(
        "      <navLabel>\n        <text>{}</text>\n      </navLabel>\n",
        escape_xml(&entry.title)
    ));
    ncx.push_str(&format!(
        "      <content src=\"{}\"/>\n",
        escape_xml(&entry.href)
    ));
    ncx.push_str("    </navPoint>\n");
}

fn language(book: &Book) -> &str {
    if book.metadata.language.is_empty() {
        "zh"
    } else {
        &book.metadata.language
    }
}

fn href_to_id(href: &str) -> String {
    href.replace(['/', '.', ' ', '-'], "_")
}

/// Derive a `urn:uuid:` identifier from the title so rebuilding the same
/// novel keeps the same identifier.
pub fn stable_identifier(title: &str) -> String {
    let digest = sha1_smol::Sha1::from(title.as_bytes()).digest().bytes();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    // Name-based (version 5) layout
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn modified_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
