#![forbid(unsafe_code)]

//! XHTML fragment loading for [`MemoryDom`](super::MemoryDom).
//!
//! Markup must be well-formed XML (void elements self-closed). Text runs are
//! attached to the enclosing element; comments and processing instructions
//! are dropped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::DomError;

/// A parsed element and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Fragment {
    pub name: String,
    pub svg: bool,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Fragment>,
}

fn markup_error(err: impl std::fmt::Display) -> DomError {
    DomError::Markup(err.to_string())
}

fn open(start: &BytesStart<'_>, parent_svg: bool) -> Result<Fragment, DomError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(markup_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(markup_error)?.into_owned();
        attributes.push((key, value));
    }
    Ok(Fragment {
        svg: parent_svg || name == "svg",
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// Parse `markup` into its top-level elements. `in_svg` marks content
/// inserted under an SVG parent.
pub(crate) fn parse(markup: &str, in_svg: bool) -> Result<Vec<Fragment>, DomError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(true);

    let mut roots = Vec::new();
    let mut stack: Vec<Fragment> = Vec::new();

    let attach = |stack: &mut Vec<Fragment>, roots: &mut Vec<Fragment>, done: Fragment| {
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    };

    loop {
        let parent_svg = stack.last().map_or(in_svg, |f| f.svg);
        match reader.read_event().map_err(markup_error)? {
            Event::Start(start) => stack.push(open(&start, parent_svg)?),
            Event::Empty(start) => {
                let done = open(&start, parent_svg)?;
                attach(&mut stack, &mut roots, done);
            }
            Event::End(_) => {
                let done = stack
                    .pop()
                    .ok_or_else(|| DomError::Markup("unbalanced end tag".to_owned()))?;
                attach(&mut stack, &mut roots, done);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().map_err(markup_error)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DomError::Markup("unclosed element".to_owned()));
    }
    Ok(roots)
}
