use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Month, NaiveDate};
use regex::{Captures, Regex};

use crate::rules::{ExtractorConfig, buffers};
use crate::scanner::RawRecord;
use crate::types::Record;

static RE_TITLE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:title:\s*)+").expect("invalid regex: title label"));
static RE_AUTHORS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:authors?:\s*)+").expect("invalid regex: authors label")
});
static RE_ABSTRACT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:abstract:\s*)+").expect("invalid regex: abstract label")
});
// Toggle link captions only. A trailing "show more" is prose.
static RE_TOGGLE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\s*(?:show less|△ less|▽ more))+$").expect("invalid regex: toggle label")
});
static RE_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("invalid regex: scheme"));

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_label(text: &str, label: &Regex) -> String {
    label.replace(text, "").trim().to_string()
}

pub fn clean_title(text: &str) -> String {
    strip_label(&normalize_whitespace(text), &RE_TITLE_LABEL)
}

pub fn clean_authors(text: &str) -> String {
    strip_label(&normalize_whitespace(text), &RE_AUTHORS_LABEL)
}

pub fn clean_abstract(text: &str) -> String {
    let text = strip_label(&normalize_whitespace(text), &RE_ABSTRACT_LABEL);
    RE_TOGGLE_LABEL.replace(&text, "").trim().to_string()
}

/// Prefixes `origin` onto links that carry no scheme.
pub fn absolutize(href: &str, origin: &str) -> String {
    let href = href.trim();
    if href.is_empty() || RE_SCHEME.is_match(href) {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        let scheme = origin.split("://").next().unwrap_or("https");
        format!("{scheme}://{rest}")
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}

fn resolve_links(abs_href: &str, pdf_href: &str, config: &ExtractorConfig) -> (String, String) {
    let abs_link = absolutize(abs_href, &config.origin);
    let mut pdf_link = absolutize(pdf_href, &config.origin);

    if pdf_link.is_empty()
        && !abs_link.is_empty()
        && let Some(derived) = config
            .document_derivation
            .as_ref()
            .and_then(|d| d.derive(&abs_link))
    {
        pdf_link = derived;
    }

    (abs_link, pdf_link)
}

/// Text cleanup half of normalization. Applying it twice changes nothing.
pub fn tidy_record(record: Record, config: &ExtractorConfig) -> Record {
    let (abs_link, pdf_link) = resolve_links(&record.abs_link, &record.pdf_link, config);

    Record {
        title: clean_title(&record.title),
        authors: clean_authors(&record.authors),
        abstract_text: clean_abstract(&record.abstract_text),
        category: normalize_whitespace(&record.category),
        announced_date: record.announced_date,
        abs_link,
        pdf_link,
    }
}

pub fn normalize_record(raw: &RawRecord, config: &ExtractorConfig) -> Record {
    let abstract_text = config
        .abstract_buffers
        .iter()
        .filter_map(|name| raw.first(name))
        .map(clean_abstract)
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    let (abs_link, pdf_link) = resolve_links(
        raw.abs_href.as_deref().unwrap_or_default(),
        raw.pdf_href.as_deref().unwrap_or_default(),
        config,
    );

    Record {
        title: clean_title(raw.first(buffers::TITLE).unwrap_or_default()),
        authors: clean_authors(raw.first(buffers::AUTHORS).unwrap_or_default()),
        abstract_text,
        category: normalize_whitespace(raw.first(buffers::CATEGORY).unwrap_or_default()),
        announced_date: announced_date(raw, config),
        abs_link,
        pdf_link,
    }
}

/// First date any date pattern yields, trying the date buffers in discovery
/// order.
pub fn announced_date(raw: &RawRecord, config: &ExtractorConfig) -> Option<NaiveDate> {
    raw.all(buffers::DATE)
        .map(normalize_whitespace)
        .find_map(|text| {
            config
                .date_patterns
                .iter()
                .filter_map(|p| p.pattern.captures(&text))
                .find_map(|caps| date_from_captures(&caps))
        })
}

fn date_from_captures(caps: &Captures) -> Option<NaiveDate> {
    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();

    let month = Month::from_str(group("month")).ok();
    let day = group("day").parse::<u32>().ok();
    let year = group("year").parse::<i32>().ok();

    let date = match (month, day, year) {
        (Some(m), Some(d), Some(y)) => NaiveDate::from_ymd_opt(y, m.number_from_month(), d),
        _ => None,
    };
    if date.is_none() {
        log::warn!("Unparseable date in '{}'", &caps[0]);
    }
    date
}
