//! Sitemap maintenance: refresh `<lastmod>` fields to the build date.
//!
//! The sitemap itself is authored by hand under `static/`; the build only
//! rewrites the modification dates so deploys advertise fresh content. The
//! rewrite is a streaming pass — everything except `<lastmod>` text passes
//! through untouched, so the function is byte-stable and unit-testable.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Replace the text of every `<lastmod>` element with `date` (`YYYY-MM-DD`).
pub fn refresh_lastmod(xml: &str, date: &str) -> Result<String, SitemapError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut in_lastmod = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                in_lastmod = e.name().as_ref() == b"lastmod";
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                if e.name().as_ref() == b"lastmod" {
                    in_lastmod = false;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Text(e) => {
                if in_lastmod {
                    writer.write_event(Event::Text(BytesText::new(date)))?;
                } else {
                    writer.write_event(Event::Text(e))?;
                }
            }
            other => writer.write_event(other)?,
        }
    }

    // The writer only ever receives valid UTF-8: the input was a &str
    Ok(String::from_utf8(writer.into_inner()).expect("rewritten sitemap is UTF-8"))
}
