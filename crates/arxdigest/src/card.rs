use serde_json::{Value, json};

use crate::types::Record;

pub const DEFAULT_HEADER: &str = "arXiv latest announcements";
/// Abstracts longer than this many characters are cut to keep cards compact.
pub const ABSTRACT_LIMIT: usize = 700;

const EMPTY_DIGEST: &str = "No matching results in the latest announcement.";
const NO_ABSTRACT: &str = "_(no abstract on list page)_";

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{} …", &text[..idx]),
        None => text.to_string(),
    }
}

fn render_entry(index: usize, record: &Record) -> String {
    let mut meta = format!("Authors: {}", record.authors);
    if let Some(date) = record.announced_date {
        meta.push_str(&format!("  |  Date: {date}"));
    }
    if !record.category.is_empty() {
        meta.push_str(&format!("  |  Category: `{}`", record.category));
    }

    let abstract_text = record.abstract_text.trim();
    let body = if abstract_text.is_empty() {
        NO_ABSTRACT.to_string()
    } else {
        truncate_chars(abstract_text, ABSTRACT_LIMIT)
    };

    let links = [("abs", &record.abs_link), ("pdf", &record.pdf_link)]
        .into_iter()
        .filter(|(_, url)| !url.is_empty())
        .map(|(label, url)| format!("[{label}]({url})"))
        .collect::<Vec<_>>()
        .join("  |  ");

    let mut lines = vec![format!("**{}. {}**", index, record.title), meta, body];
    if !links.is_empty() {
        lines.push(links);
    }
    lines.join("\n\n")
}

/// Markdown body of the digest.
pub fn render_digest(records: &[Record]) -> String {
    if records.is_empty() {
        return EMPTY_DIGEST.to_string();
    }

    records
        .iter()
        .enumerate()
        .map(|(i, record)| render_entry(i + 1, record))
        .collect::<Vec<_>>()
        .join("\n\n\n")
}

/// Interactive message card for the chat webhook.
pub fn build_card(records: &[Record], header: &str) -> Value {
    json!({
        "msg_type": "interactive",
        "card": {
            "config": { "wide_screen_mode": true },
            "header": {
                "title": { "tag": "plain_text", "content": header },
                "template": "blue"
            },
            "elements": [
                { "tag": "div", "text": { "tag": "lark_md", "content": render_digest(records) } }
            ]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> Record {
        Record {
            title: "Sample detection of dark matter".to_string(),
            authors: "A. Researcher, B. Scientist".to_string(),
            abstract_text: "We search for dark matter.".to_string(),
            category: "hep-ph".to_string(),
            announced_date: NaiveDate::from_ymd_opt(2023, 10, 31),
            abs_link: "https://arxiv.org/abs/2310.12345".to_string(),
            pdf_link: "https://arxiv.org/pdf/2310.12345.pdf".to_string(),
        }
    }

    #[test]
    fn test_card_shape() {
        let card = build_card(&[record()], DEFAULT_HEADER);
        assert_eq!(card["msg_type"], "interactive");
        assert_eq!(card["card"]["header"]["title"]["content"], DEFAULT_HEADER);
        let content = card["card"]["elements"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(
            content,
            "**1. Sample detection of dark matter**\n\n\
             Authors: A. Researcher, B. Scientist  |  Date: 2023-10-31  |  Category: `hep-ph`\n\n\
             We search for dark matter.\n\n\
             [abs](https://arxiv.org/abs/2310.12345)  |  [pdf](https://arxiv.org/pdf/2310.12345.pdf)"
        );
    }

    #[test]
    fn test_empty_digest() {
        let card = build_card(&[], DEFAULT_HEADER);
        assert_eq!(card["card"]["elements"][0]["text"]["content"], EMPTY_DIGEST);
    }

    #[test]
    fn test_missing_parts_are_skipped() {
        let bare = Record {
            title: "Untitled".to_string(),
            authors: "Nobody".to_string(),
            ..Default::default()
        };
        assert_eq!(
            render_digest(&[bare]),
            "**1. Untitled**\n\nAuthors: Nobody\n\n_(no abstract on list page)_"
        );
    }

    #[test]
    fn test_long_abstract_is_truncated_on_char_boundary() {
        let mut long = record();
        long.abstract_text = "é".repeat(ABSTRACT_LIMIT + 5);
        let rendered = render_digest(&[long]);
        let expected = format!("{} …", "é".repeat(ABSTRACT_LIMIT));
        assert!(rendered.contains(&expected));
        assert!(!rendered.contains(&"é".repeat(ABSTRACT_LIMIT + 1)));
    }

    #[test]
    fn test_entries_are_numbered_in_order() {
        let mut second = record();
        second.title = "Second".to_string();
        let rendered = render_digest(&[record(), second]);
        let first_at = rendered.find("**1. Sample").unwrap();
        let second_at = rendered.find("**2. Second**").unwrap();
        assert!(first_at < second_at);
    }
}
