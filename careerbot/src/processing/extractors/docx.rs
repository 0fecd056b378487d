//! DOCX extractor using zip + quick-xml

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{CareerError, Result};

const DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxExtractor;

/// Paragraphs of one XML part plus the header/footer relationships it
/// references.
#[derive(Debug, Default)]
struct PartText {
    paragraphs: Vec<String>,
    header_footer_refs: Vec<String>,
}

impl DocxExtractor {
    /// Body paragraphs and table cells in document order, then the header
    /// and footer parts referenced by each section.
    pub fn extract(bytes: &[u8]) -> Result<String> {
        let cursor = Cursor::new(bytes);
        let mut archive = ZipArchive::new(cursor)
            .map_err(|e| CareerError::Extraction(format!("DOCX parse error: {e}")))?;

        let document_xml = Self::read_file_from_archive(&mut archive, DOCUMENT_PART)?;
        let document_rels = Self::read_relationships(&mut archive, DOCUMENT_PART);
        let body = Self::parse_part(&document_xml, &document_rels)?;

        let mut paragraphs = body.paragraphs;
        let mut seen = Vec::new();
        for r_id in &body.header_footer_refs {
            let Some(target) = document_rels.get(r_id) else {
                continue;
            };
            let part_path = format!("word/{}", target.trim_start_matches('/').trim_start_matches("word/"));
            if seen.contains(&part_path) {
                continue;
            }
            seen.push(part_path.clone());

            let xml = match Self::read_file_from_archive(&mut archive, &part_path) {
                Ok(xml) => xml,
                Err(e) => {
                    tracing::warn!(part = %part_path, error = %e, "Skipping unreadable DOCX part");
                    continue;
                }
            };
            let rels = Self::read_relationships(&mut archive, &part_path);
            paragraphs.extend(Self::parse_part(&xml, &rels)?.paragraphs);
        }

        let text = paragraphs.join("\n");
        Ok(text.trim().to_string())
    }

    fn parse_part(xml: &str, rels: &HashMap<String, String>) -> Result<PartText> {
        let mut reader = Reader::from_str(xml);
        let mut part = PartText::default();
        let mut buf = Vec::new();

        let mut paragraph: Option<String> = None;
        let mut in_text = false;
        // Set while inside a hyperlink whose display text is replaced.
        let mut link_target: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"p" => paragraph = Some(String::new()),
                    b"t" => in_text = true,
                    b"hyperlink" => {
                        link_target = Self::external_link_target(&e, rels);
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"p" => part.paragraphs.push(String::new()),
                    b"tab" if link_target.is_none() => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push('\t');
                        }
                    }
                    b"br" | b"cr" if link_target.is_none() => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push('\n');
                        }
                    }
                    b"headerReference" | b"footerReference" => {
                        if let Some(r_id) = Self::attribute(&e, b"r:id") {
                            part.header_footer_refs.push(r_id);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if in_text && link_target.is_none() {
                        if let (Some(p), Ok(text)) =
                            (paragraph.as_mut(), std::str::from_utf8(e.as_ref()))
                        {
                            p.push_str(text);
                        }
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if in_text && link_target.is_none() {
                        if let (Some(p), Ok(name)) =
                            (paragraph.as_mut(), std::str::from_utf8(&e))
                        {
                            if let Some(c) = Self::resolve_entity(name) {
                                p.push(c);
                            }
                        }
                    }
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"hyperlink" => {
                        if let (Some(target), Some(p)) = (link_target.take(), paragraph.as_mut()) {
                            p.push_str(&target);
                        }
                    }
                    b"p" => {
                        if let Some(p) = paragraph.take() {
                            part.paragraphs.push(p.trim_end().to_string());
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(CareerError::Extraction(format!(
                        "Error parsing DOCX XML at {}: {e}",
                        reader.buffer_position()
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(part)
    }

    /// Hyperlinks pointing at a mail address or web URL contribute the
    /// target instead of their display text.
    fn external_link_target(e: &BytesStart, rels: &HashMap<String, String>) -> Option<String> {
        let r_id = Self::attribute(e, b"r:id")?;
        let target = rels.get(&r_id)?;
        if let Some(address) = target.strip_prefix("mailto:") {
            Some(address.to_string())
        } else if target.starts_with("http") {
            Some(target.clone())
        } else {
            None
        }
    }

    fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
        e.attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == key)
            .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(Self::unescape_xml))
    }

    fn resolve_entity(name: &str) -> Option<char> {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                let code = name.strip_prefix('#')?;
                let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                    None => code.parse().ok()?,
                };
                char::from_u32(value)
            }
        }
    }

    fn unescape_xml(text: &str) -> String {
        text.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&")
    }

    /// Relationship id → target for `part_path` (empty when the part has no
    /// relationships).
    fn read_relationships(
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        part_path: &str,
    ) -> HashMap<String, String> {
        let (dir, file) = part_path.rsplit_once('/').unwrap_or(("", part_path));
        let rels_path = format!("{dir}/_rels/{file}.rels");

        let xml = match Self::read_file_from_archive(archive, &rels_path) {
            Ok(content) => content,
            Err(_) => return HashMap::new(),
        };

        let mut reader = Reader::from_str(&xml);
        reader.config_mut().trim_text(true);

        let mut mapping = HashMap::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        if let (Some(id), Some(target)) =
                            (Self::attribute(&e, b"Id"), Self::attribute(&e, b"Target"))
                        {
                            mapping.insert(id, target);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        mapping
    }

    fn read_file_from_archive(
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| CareerError::Extraction(format!("Failed to read {path} from DOCX: {e}")))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| CareerError::Extraction(format!("Failed to read {path} content: {e}")))?;

        Ok(content)
    }
}
