//! In-place title patching for existing EPUB files.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// Replace every `<dc:title>` of an EPUB on disk with `title`.
///
/// All other archive entries are copied unchanged. The archive is written
/// next to the original and renamed over it once complete.
pub fn retitle_epub<P: AsRef<Path>>(path: P, title: &str) -> Result<()> {
    let path = path.as_ref();
    let source = std::fs::File::open(path)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let result = std::fs::File::create(&tmp_path)
        .map_err(Error::from)
        .and_then(|out| retitle_archive(source, out, title));

    match result {
        Ok(opf) => {
            std::fs::rename(&tmp_path, path)?;
            tracing::info!(path = %path.display(), %opf, title, "retitled");
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}

/// Copy an EPUB archive from `reader` to `writer`, rewriting the title.
///
/// Returns the name of the OPF entry that was patched.
pub fn retitle_archive<R, W>(reader: R, writer: W, title: &str) -> Result<String>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut archive = ZipArchive::new(reader)?;
    let opf_name = find_opf_name(&mut archive)?;
    let mut zip = ZipWriter::new(writer);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let options = SimpleFileOptions::default().compression_method(entry.compression());

        if entry.is_dir() {
            zip.add_directory(name, options)?;
            continue;
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;

        if name == opf_name {
            let opf = String::from_utf8(strip_bom(&data).to_vec())
                .map_err(|e| Error::InvalidEpub(format!("{name} is not UTF-8: {e}")))?;
            data = set_opf_title(&opf, title)?.into_bytes();
        }

        zip.start_file(name, options)?;
        zip.write_all(&data)?;
    }

    zip.finish()?;
    Ok(opf_name)
}

/// Rewrite the text of every `title` element in an OPF document.
pub fn set_opf_title(opf: &str, title: &str) -> Result<String> {
    let mut reader = Reader::from_str(opf);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut skipping = 0usize;

    loop {
        let event = reader.read_event()?;

        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(e) => {
                    skipping -= 1;
                    if skipping == 0 {
                        writer.write_event(Event::Text(BytesText::new(title)))?;
                        writer.write_event(Event::End(e))?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) if e.local_name().as_ref() == b"title" => {
                writer.write_event(Event::Start(e))?;
                skipping = 1;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"title" => {
                let end = BytesEnd::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                let start: BytesStart<'_> = e.into_owned();
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Text(BytesText::new(title)))?;
                writer.write_event(Event::End(end))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| Error::InvalidEpub(e.to_string()))
}

/// Locate the OPF through container.xml, falling back to the first `.opf` entry.
fn find_opf_name<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    if let Ok(mut container) = archive.by_name("META-INF/container.xml") {
        let mut content = String::new();
        if container.read_to_string(&mut content).is_ok()
            && let Some(path) = rootfile_path(&content)
        {
            return Ok(path);
        }
    }

    archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidEpub("no .opf package document found".into()))
}

fn rootfile_path(container: &str) -> Option<String> {
    let mut reader = Reader::from_str(container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"rootfile" => {
                return e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"full-path")
                    .and_then(|attr| String::from_utf8(attr.value.to_vec()).ok());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data)
}
