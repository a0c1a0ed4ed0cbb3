use regex::Regex;

/// Buffer names the normalizer reads fields from.
pub mod buffers {
    pub const TITLE: &str = "title";
    pub const AUTHORS: &str = "authors";
    pub const CATEGORY: &str = "category";
    pub const DATE: &str = "date";
    pub const ABSTRACT: &str = "abstract";
    pub const ABSTRACT_FULL: &str = "abstract-full";
    pub const ABSTRACT_SHORT: &str = "abstract-short";
}

/// Element selector of the form `tag.class`: matches when the tag name is
/// equal and the class attribute contains `class` as a whole token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub tag: String,
    pub class: String,
}

impl TagRule {
    pub fn new(tag: &str, class: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            class: class.to_string(),
        }
    }

    pub fn matches(&self, tag: &str, class_attr: Option<&str>) -> bool {
        self.tag == tag
            && class_attr.is_some_and(|classes| classes.split_whitespace().any(|c| c == self.class))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub selector: TagRule,
    pub buffer: String,
}

impl FieldRule {
    pub fn new(tag: &str, class: &str, buffer: &str) -> Self {
        Self {
            selector: TagRule::new(tag, class),
            buffer: buffer.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSlot {
    Abstract,
    Document,
}

#[derive(Debug, Clone)]
pub struct LinkRule {
    pub slot: LinkSlot,
    pub pattern: Regex,
}

/// How to build a document link out of an abstract-page link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDerivation {
    pub from_segment: String,
    pub to_segment: String,
    pub suffix: String,
}

impl DocumentDerivation {
    pub fn derive(&self, abs_link: &str) -> Option<String> {
        abs_link
            .contains(&self.from_segment)
            .then(|| abs_link.replacen(&self.from_segment, &self.to_segment, 1) + &self.suffix)
    }
}

/// A date sentence pattern. The regex must define the named groups `day`,
/// `month` and `year`.
#[derive(Debug, Clone)]
pub struct DatePattern {
    pub pattern: Regex,
}

/// Everything the scanner and normalizer need to know about one site's markup.
/// Built once by the caller and borrowed for every scan.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub origin: String,
    pub container: TagRule,
    pub anchor_tag: String,
    pub fields: Vec<FieldRule>,
    pub links: Vec<LinkRule>,
    pub document_derivation: Option<DocumentDerivation>,
    /// First non-empty buffer in this list becomes the abstract.
    pub abstract_buffers: Vec<String>,
    pub date_patterns: Vec<DatePattern>,
}

impl ExtractorConfig {
    /// Rules for the arxiv.org search results page.
    pub fn arxiv() -> Self {
        Self {
            origin: crate::BASE_URL.to_string(),
            container: TagRule::new("li", "arxiv-result"),
            anchor_tag: "a".to_string(),
            fields: vec![
                FieldRule::new("p", "title", buffers::TITLE),
                FieldRule::new("p", "authors", buffers::AUTHORS),
                FieldRule::new("span", "tag", buffers::CATEGORY),
                FieldRule::new("p", "is-size-7", buffers::DATE),
                FieldRule::new("span", "abstract-full", buffers::ABSTRACT_FULL),
                FieldRule::new("p", "abstract", buffers::ABSTRACT),
                FieldRule::new("span", "abstract-short", buffers::ABSTRACT_SHORT),
            ],
            links: vec![
                LinkRule {
                    slot: LinkSlot::Abstract,
                    pattern: Regex::new(r"/abs/").expect("invalid regex: abstract link"),
                },
                LinkRule {
                    slot: LinkSlot::Document,
                    pattern: Regex::new(r"/pdf/.*\.pdf$").expect("invalid regex: document link"),
                },
            ],
            document_derivation: Some(DocumentDerivation {
                from_segment: "/abs/".to_string(),
                to_segment: "/pdf/".to_string(),
                suffix: ".pdf".to_string(),
            }),
            abstract_buffers: vec![
                buffers::ABSTRACT_FULL.to_string(),
                buffers::ABSTRACT.to_string(),
                buffers::ABSTRACT_SHORT.to_string(),
            ],
            date_patterns: vec![
                DatePattern {
                    pattern: Regex::new(
                        r"(?:announced|Submitted)\s+on\s+(?P<month>[A-Za-z]{3,9})\s+(?P<day>\d{1,2}),\s+(?P<year>\d{4})",
                    )
                    .expect("invalid regex: announced on"),
                },
                DatePattern {
                    pattern: Regex::new(
                        r"Submitted\s+(?P<day>\d{1,2})\s+(?P<month>[A-Za-z]{3,9}),?\s+(?P<year>\d{4})",
                    )
                    .expect("invalid regex: submitted day-first"),
                },
            ],
        }
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.trim_end_matches('/').to_string();
        self
    }

    pub fn field_for(&self, tag: &str, class_attr: Option<&str>) -> Option<&FieldRule> {
        self.fields
            .iter()
            .find(|rule| rule.selector.matches(tag, class_attr))
    }

    pub fn link_slot_for(&self, href: &str) -> Option<LinkSlot> {
        self.links
            .iter()
            .find(|rule| rule.pattern.is_match(href))
            .map(|rule| rule.slot)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::arxiv()
    }
}
