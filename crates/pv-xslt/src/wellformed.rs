//! XML well-formedness check.
//!
//! Walks the document with `quick-xml` without building a tree. External DTDs
//! are not fetched and entity references are not expanded; only structure,
//! attribute syntax and tag balance are verified.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Reason a document is not well-formed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum XmlCheckError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Syntax error reported by the parser.
    #[error("XML error at byte {position}: {source}")]
    Parse {
        /// Byte offset where the error was detected.
        position: u64,
        /// Parser error.
        #[source]
        source: quick_xml::Error,
    },
    /// The document ended while an element was still open.
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    /// The document has no root element.
    #[error("document has no root element")]
    NoRoot,
    /// A second top-level element follows the root.
    #[error("element <{0}> after the root element")]
    MultipleRoots(String),
    /// Character data appears outside the root element.
    #[error("text outside the root element")]
    TextOutsideRoot,
}

/// Check that the file at `path` is well-formed XML.
pub fn check_file(path: &Path) -> Result<(), XmlCheckError> {
    let bytes = std::fs::read(path).map_err(|source| XmlCheckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    check(Reader::from_reader(bytes.as_slice()))
}

/// Check that `xml` is well-formed.
pub fn check_str(xml: &str) -> Result<(), XmlCheckError> {
    check(Reader::from_reader(xml.as_bytes()))
}

fn check<R: BufRead>(mut reader: Reader<R>) -> Result<(), XmlCheckError> {
    let mut buf = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut saw_root = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| parse_error(&reader, source))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if open.is_empty() && saw_root {
                    return Err(XmlCheckError::MultipleRoots(name));
                }
                saw_root = true;
                for attr in e.attributes() {
                    attr.map_err(|err| parse_error(&reader, err.into()))?;
                }
                open.push(name);
            }
            Event::Empty(e) => {
                if open.is_empty() && saw_root {
                    return Err(XmlCheckError::MultipleRoots(
                        String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ));
                }
                saw_root = true;
                for attr in e.attributes() {
                    attr.map_err(|err| parse_error(&reader, err.into()))?;
                }
            }
            Event::End(_) => {
                // Name matching is enforced by the reader
                open.pop();
            }
            Event::Text(e) if open.is_empty() => {
                if !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(XmlCheckError::TextOutsideRoot);
                }
            }
            Event::CData(_) if open.is_empty() => return Err(XmlCheckError::TextOutsideRoot),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(name) = open.pop() {
        return Err(XmlCheckError::Unclosed(name));
    }
    if !saw_root {
        return Err(XmlCheckError::NoRoot);
    }
    Ok(())
}

fn parse_error<R>(reader: &Reader<R>, source: quick_xml::Error) -> XmlCheckError {
    XmlCheckError::Parse {
        position: reader.error_position(),
        source,
    }
}
