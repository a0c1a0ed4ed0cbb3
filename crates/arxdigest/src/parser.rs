use std::path::Path;

use crate::normalize::normalize_record;
use crate::rules::ExtractorConfig;
use crate::scanner::scan_markup;
use crate::types::Record;

use scraper::Html;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read sample page {path}: {source}")]
    Sample {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Extracts every fully closed record from a listing page, in document order.
pub fn parse_records(markup: &str, config: &ExtractorConfig) -> Vec<Record> {
    let records: Vec<Record> = scan_markup(markup, config)
        .iter()
        .map(|raw| normalize_record(raw, config))
        .collect();

    let undated = records.iter().filter(|r| r.announced_date.is_none()).count();
    if undated > 0 {
        log::debug!("{} of {} record(s) have no announcement date", undated, records.len());
    }

    records
}

/// Parses a listing page saved on disk, used when the live page is unavailable.
pub fn parse_sample(path: &Path, config: &ExtractorConfig) -> Result<Vec<Record>, ParseError> {
    let markup = std::fs::read_to_string(path).map_err(|source| ParseError::Sample {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_records(&markup, config))
}

/// Visible text of a whole page, whitespace-collapsed.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::AnnouncementClock;
    use crate::utils::{filter_by_window, latest_day};
    use chrono::NaiveDate;
    use std::fs;

    fn sample() -> Vec<Record> {
        let html = fs::read_to_string("fixtures/sample_search.html")
            .expect("Failed to read sample HTML file");
        parse_records(&html, &ExtractorConfig::arxiv())
    }

    #[test]
    fn test_parse_records_from_sample() {
        let records = sample();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Sample detection of dark matter");
        assert_eq!(first.authors, "A. Researcher, B. Scientist");
        assert_eq!(first.category, "hep-ph");
        assert_eq!(first.announced_date, NaiveDate::from_ymd_opt(2023, 10, 31));
        assert!(first.abs_link.ends_with("2310.12345"));
        assert_eq!(first.abs_link, "https://arxiv.org/abs/2310.12345");
        assert!(first.pdf_link.ends_with("2310.12345.pdf"));
        assert!(first.abstract_text.to_lowercase().contains("dark matter"));
        assert!(!first.abstract_text.contains("Less"));
        assert!(!first.abstract_text.starts_with("Abstract"));

        let second = &records[1];
        assert_eq!(second.title, "Detector calibration update");
        assert_eq!(second.category, "physics.ins-det");
        assert_eq!(second.announced_date, NaiveDate::from_ymd_opt(2023, 10, 30));
        assert_eq!(second.pdf_link, "https://arxiv.org/pdf/2310.54321v1.pdf");
        assert_eq!(
            second.abstract_text,
            "We report on the calibration of the liquid xenon detector."
        );
    }

    #[test]
    fn test_filter_sample_to_single_day() {
        let kept = filter_by_window(
            sample(),
            NaiveDate::from_ymd_opt(2023, 10, 30),
            NaiveDate::from_ymd_opt(2023, 10, 30),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Detector calibration update");
    }

    #[test]
    fn test_latest_day_of_sample() {
        let kept = latest_day(sample());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Sample detection of dark matter");
    }

    #[test]
    fn test_missing_optional_fields_are_empty() {
        let html = r#"
            <ol class="breathe-horizontal">
              <li class="arxiv-result">
                <p class="title is-5 mathjax">Untagged note</p>
              </li>
            </ol>
        "#;
        let records = parse_records(html, &ExtractorConfig::arxiv());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Untagged note");
        assert_eq!(records[0].category, "");
        assert_eq!(records[0].abstract_text, "");
        assert_eq!(records[0].abs_link, "");
        assert_eq!(records[0].pdf_link, "");
        assert_eq!(records[0].announced_date, None);
    }

    #[test]
    fn test_stray_angle_bracket_keeps_later_records() {
        let html = r#"
            <li class="arxiv-result"><p class="title is-5">Limits for m < 1 GeV</p></li>
            <li class="arxiv-result"><p class="title is-5">Next</p></li>
        "#;
        let records = parse_records(html, &ExtractorConfig::arxiv());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Limits for m < 1 GeV");
        assert_eq!(records[1].title, "Next");
    }

    #[test]
    fn test_highlighted_abstract_is_complete() {
        let records = sample();
        assert_eq!(
            records[0].abstract_text,
            "We present a sample search for dark matter using a two-phase xenon time projection chamber."
        );
    }

    #[test]
    fn test_parse_sample_missing_file() {
        let err = parse_sample(Path::new("fixtures/does_not_exist.html"), &ExtractorConfig::arxiv())
            .unwrap_err();
        assert!(err.to_string().contains("does_not_exist.html"));
    }

    #[test]
    fn test_page_text_feeds_clock() {
        let html = r#"
            <html><body>
              <h1>Local time</h1>
              <p>It is now <b>Sat, 01 Nov 2025</b> 09:00 EDT in Ithaca.</p>
            </body></html>
        "#;
        let text = page_text(html);
        let clock = AnnouncementClock::parse(&text).unwrap();
        assert_eq!(clock.target, NaiveDate::from_ymd_opt(2025, 10, 31).unwrap());
    }
}
