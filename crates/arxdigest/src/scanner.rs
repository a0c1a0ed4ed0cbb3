use crate::markup::{Tag, TagEvent, TagEvents};
use crate::rules::{ExtractorConfig, LinkSlot};

/// Text captured for one field region. Repeated matches of the same field
/// inside a record get increasing ordinals instead of overwriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    pub name: String,
    pub ordinal: usize,
    pub text: String,
}

impl Buffer {
    /// `name` for the first match, `name_2`, `name_3`, ... after that.
    pub fn key(&self) -> String {
        if self.ordinal == 1 {
            self.name.clone()
        } else {
            format!("{}_{}", self.name, self.ordinal)
        }
    }
}

/// One record container's worth of captured text and links, before cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// In discovery order.
    pub buffers: Vec<Buffer>,
    pub abs_href: Option<String>,
    pub pdf_href: Option<String>,
}

impl RawRecord {
    pub fn first(&self, name: &str) -> Option<&str> {
        self.buffers
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.text.as_str())
    }

    pub fn all<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.buffers
            .iter()
            .filter(move |b| b.name == name)
            .map(|b| b.text.as_str())
    }

    fn open_buffer(&mut self, name: &str) -> usize {
        let ordinal = self.buffers.iter().filter(|b| b.name == name).count() + 1;
        self.buffers.push(Buffer {
            name: name.to_string(),
            ordinal,
            text: String::new(),
        });
        self.buffers.len() - 1
    }
}

/// A capturing element, keyed by name and the depth it was opened at.
#[derive(Debug)]
struct Frame {
    tag: String,
    depth: usize,
    buffer: usize,
}

#[derive(Debug)]
struct ScanContext {
    depth: usize,
    frames: Vec<Frame>,
    record: RawRecord,
}

impl ScanContext {
    fn new() -> Self {
        Self {
            depth: 1,
            frames: Vec::new(),
            record: RawRecord::default(),
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    InRecord(ScanContext),
}

/// Single-pass record extractor driven by [`TagEvent`]s.
///
/// A record starts at an opening container tag and is emitted only when the
/// container closes at depth zero. Anything still open when input runs out
/// is dropped.
pub struct RecordScanner<'c> {
    config: &'c ExtractorConfig,
    state: State,
    records: Vec<RawRecord>,
}

impl<'c> RecordScanner<'c> {
    pub fn new(config: &'c ExtractorConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            records: Vec::new(),
        }
    }

    pub fn feed(&mut self, event: TagEvent) {
        match event {
            TagEvent::Open(tag) => self.open(&tag),
            TagEvent::Close(name) => self.close(&name),
            TagEvent::Text(text) => self.text(&text),
        }
    }

    pub fn finish(self) -> Vec<RawRecord> {
        if let State::InRecord(ctx) = &self.state {
            log::debug!(
                "Dropping unterminated record at depth {} with {} buffer(s)",
                ctx.depth,
                ctx.record.buffers.len()
            );
        }
        self.records
    }

    fn open(&mut self, tag: &Tag) {
        let config = self.config;
        let class = tag.attr("class");

        if let State::InRecord(ctx) = &mut self.state {
            ctx.depth += 1;

            if let Some(rule) = config.field_for(&tag.name, class) {
                let buffer = ctx.record.open_buffer(&rule.buffer);
                ctx.frames.push(Frame {
                    tag: tag.name.clone(),
                    depth: ctx.depth,
                    buffer,
                });
            }

            if tag.name == config.anchor_tag
                && let Some(href) = tag.attr("href")
            {
                capture_link(config, &mut ctx.record, href);
            }
        } else if config.container.matches(&tag.name, class) {
            self.state = State::InRecord(ScanContext::new());
        } else {
            return;
        }

        if tag.self_closing {
            self.close(&tag.name);
        }
    }

    fn close(&mut self, name: &str) {
        let State::InRecord(ctx) = &mut self.state else {
            return;
        };

        // Nested non-capturing tags of the same name must not end a capture.
        let depth = ctx.depth;
        if let Some(pos) = ctx
            .frames
            .iter()
            .rposition(|frame| frame.depth == depth && frame.tag == name)
        {
            ctx.frames.remove(pos);
        }

        ctx.depth = ctx.depth.saturating_sub(1);

        if ctx.depth == 0
            && name == self.config.container.tag
            && let State::InRecord(ctx) = std::mem::replace(&mut self.state, State::Idle)
        {
            self.records.push(ctx.record);
        }
    }

    fn text(&mut self, text: &str) {
        let State::InRecord(ctx) = &mut self.state else {
            return;
        };

        for frame in &ctx.frames {
            ctx.record.buffers[frame.buffer].text.push_str(text);
        }
    }
}

fn capture_link(config: &ExtractorConfig, record: &mut RawRecord, href: &str) {
    let slot = match config.link_slot_for(href) {
        Some(LinkSlot::Abstract) => &mut record.abs_href,
        Some(LinkSlot::Document) => &mut record.pdf_href,
        None => return,
    };
    if slot.is_none() {
        *slot = Some(href.to_string());
    }
}

pub fn scan<I>(events: I, config: &ExtractorConfig) -> Vec<RawRecord>
where
    I: IntoIterator<Item = TagEvent>,
{
    let mut scanner = RecordScanner::new(config);
    for event in events {
        scanner.feed(event);
    }
    scanner.finish()
}

pub fn scan_markup(markup: &str, config: &ExtractorConfig) -> Vec<RawRecord> {
    let records = scan(TagEvents::new(markup), config);
    log::debug!("Scanned {} raw record(s) from {} bytes", records.len(), markup.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_str(markup: &str) -> Vec<RawRecord> {
        scan_markup(markup, &ExtractorConfig::arxiv())
    }

    fn by_key<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
        record
            .buffers
            .iter()
            .find(|b| b.key() == key)
            .map(|b| b.text.as_str())
    }

    #[test]
    fn test_two_records_in_document_order() {
        let html = r#"
            <ol>
              <li class="arxiv-result"><p class="title is-5">First</p></li>
              <li class="arxiv-result"><p class="title is-5">Second</p></li>
            </ol>
        "#;
        let records = scan_str(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first("title"), Some("First"));
        assert_eq!(records[1].first("title"), Some("Second"));
    }

    #[test]
    fn test_container_requires_marker_class() {
        let html = r#"<li class="result"><p class="title">Nope</p></li>"#;
        assert!(scan_str(html).is_empty());
    }

    #[test]
    fn test_truncated_container_is_dropped() {
        let html = r#"
            <li class="arxiv-result"><p class="title">Complete</p></li>
            <li class="arxiv-result"><p class="title">Cut off</p>
        "#;
        let records = scan_str(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].first("title"), Some("Complete"));
    }

    #[test]
    fn test_nested_container_does_not_end_record() {
        let html = r#"
            <li class="arxiv-result">
              <ul><li>inner</li><li class="arxiv-result">nested</li></ul>
              <p class="title">Outer</p>
            </li>
        "#;
        let records = scan_str(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].first("title"), Some("Outer"));
    }

    #[test]
    fn test_text_goes_only_to_open_buffers() {
        let html = r#"
            <li class="arxiv-result">
              <div class="is-marginless">
                <span class="tag is-small">hep-ph</span>
                <span class="tag is-small">hep-ex</span>
              </div>
              <p class="title">Dark <span class="search-hit">matter</span> hunt</p>
              stray text
            </li>
        "#;
        let records = scan_str(html);
        let record = &records[0];
        assert_eq!(record.first("title"), Some("Dark matter hunt"));
        assert_eq!(by_key(record, "category"), Some("hep-ph"));
        assert_eq!(by_key(record, "category_2"), Some("hep-ex"));
        assert!(record.buffers.iter().all(|b| !b.text.contains("stray")));
    }

    #[test]
    fn test_nested_capture_regions_share_text() {
        let html = r#"<li class="arxiv-result"><p class="abstract">Abstract: <span class="abstract-full">Full text</span> tail</p></li>"#;
        let records = scan_str(html);
        assert_eq!(records[0].first("abstract"), Some("Abstract: Full text tail"));
        assert_eq!(records[0].first("abstract-full"), Some("Full text"));
    }

    #[test]
    fn test_highlighted_words_do_not_end_capture() {
        let html = r#"<li class="arxiv-result"><span class="abstract-full">a <span class="search-hit">b</span> c</span> d</li>"#;
        let records = scan_str(html);
        assert_eq!(records[0].first("abstract-full"), Some("a b c"));
    }

    #[test]
    fn test_same_name_nesting_inside_capture() {
        let html = r#"
            <li class="arxiv-result">
              <p class="abstract">x <span class="abstract-short">short <span class="search-hit">dark</span> matter</span>
              <span class="abstract-full">full <span class="search-hit">dark</span> matter</span></p>
            </li>
        "#;
        let records = scan_str(html);
        assert_eq!(records[0].first("abstract-short"), Some("short dark matter"));
        assert_eq!(records[0].first("abstract-full"), Some("full dark matter"));
        assert_eq!(
            records[0].first("abstract").map(|t| t.split_whitespace().collect::<Vec<_>>().join(" ")),
            Some("x short dark matter full dark matter".to_string())
        );
    }

    #[test]
    fn test_self_closing_tags_keep_depth_balanced() {
        let html = r#"
            <li class="arxiv-result">
              <p class="title">A<br/>B<br>C</p>
              <img src="x.png">
              <span class="tag"/>
            </li>
            <li class="arxiv-result"><p class="title">Next</p></li>
        "#;
        let records = scan_str(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first("title"), Some("ABC"));
        assert_eq!(records[0].first("category"), Some(""));
        assert_eq!(records[1].first("title"), Some("Next"));
    }

    #[test]
    fn test_unmatched_close_is_tolerated() {
        let html = r#"<li class="arxiv-result"><p class="title">A</span>B</p></li><li class="arxiv-result"><p class="title">C</p></li>"#;
        let records = scan_str(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first("title"), Some("AB"));
        assert_eq!(records[1].first("title"), Some("C"));
    }

    #[test]
    fn test_repeated_date_fields_get_ordinals() {
        let html = r#"
            <li class="arxiv-result">
              <p class="is-size-7">Comments: 12 pages</p>
              <p class="is-size-7">Submitted on October 30, 2023</p>
            </li>
        "#;
        let records = scan_str(html);
        let keys: Vec<String> = records[0].buffers.iter().map(Buffer::key).collect();
        assert_eq!(keys, vec!["date", "date_2"]);
        assert_eq!(
            records[0].all("date").collect::<Vec<_>>(),
            vec!["Comments: 12 pages", "Submitted on October 30, 2023"]
        );
    }

    #[test]
    fn test_first_link_of_each_kind_wins() {
        let html = r#"
            <li class="arxiv-result">
              <a href="/abs/2310.11111">arXiv:2310.11111</a>
              <a href="https://arxiv.org/pdf/2310.11111v1.pdf">pdf</a>
              <a href="/abs/2310.99999">other</a>
              <a href="/pdf/2310.99999.pdf">other pdf</a>
              <a href="/format/2310.11111">other formats</a>
            </li>
        "#;
        let records = scan_str(html);
        assert_eq!(records[0].abs_href.as_deref(), Some("/abs/2310.11111"));
        assert_eq!(
            records[0].pdf_href.as_deref(),
            Some("https://arxiv.org/pdf/2310.11111v1.pdf")
        );
    }

    #[test]
    fn test_links_outside_records_are_ignored() {
        let html = r#"<a href="/abs/0000.00000">x</a><li class="arxiv-result"></li>"#;
        let records = scan_str(html);
        assert_eq!(records.len(), 1);
        assert!(records[0].abs_href.is_none());
    }

    #[test]
    fn test_scan_from_event_sequence() {
        let config = ExtractorConfig::arxiv();
        let events = vec![
            TagEvent::Open(Tag::new("li").with_attr("class", "arxiv-result")),
            TagEvent::Open(Tag::new("p").with_attr("class", "authors")),
            TagEvent::Text("Authors: ".to_string()),
            TagEvent::Open(Tag::new("a").with_attr("href", "/a?query=Researcher")),
            TagEvent::Text("A. Researcher".to_string()),
            TagEvent::Close("a".to_string()),
            TagEvent::Close("p".to_string()),
            TagEvent::Close("li".to_string()),
            TagEvent::Open(Tag::new("li").with_attr("class", "arxiv-result")),
        ];
        let records = scan(events, &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].first("authors"), Some("Authors: A. Researcher"));
        assert!(records[0].abs_href.is_none());
    }

    #[test]
    fn test_self_closing_container_emits_empty_record() {
        let config = ExtractorConfig::arxiv();
        let events = vec![TagEvent::Open(
            Tag::new("li")
                .with_attr("class", "arxiv-result")
                .self_closing(),
        )];
        let records = scan(events, &config);
        assert_eq!(records, vec![RawRecord::default()]);
    }
}
