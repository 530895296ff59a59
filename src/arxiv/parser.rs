//! Atom feed parsing
//!
//! Elements are matched by local name, so both `atom:` and `arxiv:`
//! namespaced children land on the same record regardless of prefix.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::types::ArxivEntry;
use super::ArxivError;

#[derive(Default)]
struct AuthorParts {
    name: Option<String>,
    affiliation: Option<String>,
}

impl AuthorParts {
    fn display(self) -> Option<String> {
        let name = self.name?;
        Some(match self.affiliation {
            Some(aff) => format!("{} ({})", name, aff),
            None => name,
        })
    }
}

/// Parse an arXiv API response into entries, in feed order
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>, ArxivError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut entry: Option<ArxivEntry> = None;
    let mut author: Option<AuthorParts> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                text.clear();
                match e.local_name().as_ref() {
                    b"entry" => entry = Some(ArxivEntry::default()),
                    b"author" if entry.is_some() => author = Some(AuthorParts::default()),
                    _ => {
                        if let Some(entry) = entry.as_mut() {
                            apply_attributes(entry, &e)?;
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = entry.as_mut() {
                    apply_attributes(entry, &e)?;
                }
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) => {
                let value = non_empty(std::mem::take(&mut text));
                let Some(current) = entry.as_mut() else {
                    continue;
                };

                match e.local_name().as_ref() {
                    b"entry" => {
                        if let Some(done) = entry.take() {
                            entries.push(done);
                        }
                    }
                    b"author" => {
                        if let Some(name) = author.take().and_then(AuthorParts::display) {
                            current.authors.push(name);
                        }
                    }
                    b"name" if author.is_some() => {
                        if let Some(parts) = author.as_mut() {
                            parts.name = value;
                        }
                    }
                    b"affiliation" if author.is_some() => {
                        if let Some(parts) = author.as_mut() {
                            parts.affiliation = value;
                        }
                    }
                    b"id" => {
                        current.arxiv_id = value
                            .as_deref()
                            .and_then(|id| id.rsplit("/abs/").next())
                            .map(str::to_string);
                        current.id = value;
                    }
                    b"title" => current.title = value,
                    b"summary" => current.abstract_text = value,
                    b"published" => current.published = value,
                    b"updated" => current.updated = value,
                    b"comment" => current.comment = value,
                    b"journal_ref" => current.journal_ref = value,
                    b"doi" => current.doi = value,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Links, categories and the primary category carry their data in attributes
fn apply_attributes(entry: &mut ArxivEntry, element: &BytesStart<'_>) -> Result<(), ArxivError> {
    match element.local_name().as_ref() {
        b"link" => {
            let href = attribute(element, "href")?;
            if attribute(element, "title")?.as_deref() == Some("pdf") {
                entry.pdf_url = href;
            } else if attribute(element, "rel")?.as_deref() == Some("alternate") {
                entry.paper_url = href;
            }
        }
        b"category" => {
            if let Some(term) = attribute(element, "term")? {
                entry.categories.push(term);
            }
        }
        b"primary_category" => {
            entry.primary_category = attribute(element, "term")?;
        }
        _ => {}
    }
    Ok(())
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, ArxivError> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(non_empty(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
