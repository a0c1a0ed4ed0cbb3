use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};

/// HTML elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs
            .push((key.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    Open(Tag),
    Close(String),
    Text(String),
}

/// Lenient pull tokenizer over HTML-ish markup.
///
/// End-tag names are not checked against open tags, so stray or misnested
/// closes come through as plain `Close` events and it is up to the consumer
/// to make sense of them. A `<` that does not start a tag, or any markup the
/// reader rejects, is passed on as text and tokenizing resumes right after it.
pub struct TagEvents<'a> {
    markup: &'a str,
    base: usize,
    reader: Reader<&'a [u8]>,
    done: bool,
}

fn lenient_reader(markup: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.trim_text(false);
    reader
}

impl<'a> TagEvents<'a> {
    pub fn new(markup: &'a str) -> Self {
        Self {
            markup,
            base: 0,
            reader: lenient_reader(markup),
            done: false,
        }
    }

    /// Emits the character at `at` as text and restarts the reader after it.
    fn resume_after(&mut self, at: usize) -> Option<TagEvent> {
        if at >= self.markup.len() {
            self.done = true;
            return None;
        }

        let mut next = at + 1;
        while !self.markup.is_char_boundary(next) {
            next += 1;
        }
        self.base = next;
        self.reader = lenient_reader(&self.markup[next..]);
        Some(TagEvent::Text(self.markup[at..next].to_string()))
    }
}

impl Iterator for TagEvents<'_> {
    type Item = TagEvent;

    fn next(&mut self) -> Option<TagEvent> {
        while !self.done {
            let at = self.base + self.reader.buffer_position() as usize;
            match self.reader.read_event() {
                Ok(Event::Start(e)) if is_tag_name(e.name().as_ref()) => {
                    return Some(TagEvent::Open(open_tag(&e, false)));
                }
                Ok(Event::Empty(e)) if is_tag_name(e.name().as_ref()) => {
                    return Some(TagEvent::Open(open_tag(&e, true)));
                }
                Ok(Event::Start(_) | Event::Empty(_)) => {
                    log::debug!("Stray '<' at byte {} read as text", at);
                    return self.resume_after(at);
                }
                Ok(Event::End(e)) => return Some(TagEvent::Close(tag_name(e.name().as_ref()))),
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape_with(resolve_html5_entity)
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    if !text.is_empty() {
                        return Some(TagEvent::Text(text));
                    }
                }
                Ok(Event::CData(e)) => {
                    return Some(TagEvent::Text(String::from_utf8_lossy(&e).into_owned()));
                }
                Ok(Event::Eof) => self.done = true,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Markup reader error at byte {}: {}", at, e);
                    return self.resume_after(at);
                }
            }
        }
        None
    }
}

fn is_tag_name(raw: &[u8]) -> bool {
    raw.first().is_some_and(u8::is_ascii_alphabetic)
        && raw
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn open_tag(start: &BytesStart, empty: bool) -> Tag {
    let name = tag_name(start.name().as_ref());
    let attrs = start
        .html_attributes()
        .flatten()
        .map(|attr| {
            let key = tag_name(attr.key.as_ref());
            let value = attr
                .unescape_value_with(resolve_html5_entity)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();
    let self_closing = empty || VOID_ELEMENTS.contains(&name.as_str());

    Tag {
        name,
        attrs,
        self_closing,
    }
}
