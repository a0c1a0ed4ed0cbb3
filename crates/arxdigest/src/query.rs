use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

pub const SEARCH_PATH: &str = "/search/";
pub const DEFAULT_QUERY: &str = "dark matter OR neutrino OR TPC OR xenon OR argon OR WIMP OR CEvNS";
pub const DEFAULT_CLASSES: &str = "hep-th,hep-ex,hep-ph,nucl-ex,physics.ins-det";
pub const DEFAULT_ORDER: &str = "-announced_date_first";
pub const DEFAULT_SIZE: usize = 200;

const CLASS_PREFIX: &str = "classification:";

static RE_CLASS_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("invalid regex: class separator"));

/// `"hep-ex, hep-ph"` becomes `["classification:hep-ex", "classification:hep-ph"]`.
/// Duplicates are dropped, first occurrence wins.
pub fn normalize_class_tokens(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in RE_CLASS_SEPARATOR.split(raw).filter(|t| !t.is_empty()) {
        let term = if token.starts_with(CLASS_PREFIX) {
            token.to_string()
        } else {
            format!("{CLASS_PREFIX}{token}")
        };
        if !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

/// Builds `(<query>) AND <classes>` in the search form's classification syntax.
pub fn build_web_query(query: &str, classes: &str, require_physics_group: bool) -> String {
    let keywords = format!("({})", query.trim());

    let mut terms = normalize_class_tokens(classes);
    if require_physics_group {
        let physics = format!("{CLASS_PREFIX}physics");
        terms.retain(|t| *t != physics);
        terms.insert(0, physics);
    }

    match terms.as_slice() {
        [] => keywords,
        [single] => format!("{keywords} AND {single}"),
        many => format!("{keywords} AND ({})", many.join(" OR ")),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid search URL '{url}': {reason}")]
pub struct QueryError {
    url: String,
    reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub size: usize,
    pub order: String,
    pub hide_abstracts: bool,
    pub start: usize,
}

impl SearchParams {
    pub fn new(query: String) -> Self {
        Self {
            query,
            size: DEFAULT_SIZE,
            order: DEFAULT_ORDER.to_string(),
            hide_abstracts: false,
            start: 0,
        }
    }

    /// Same search, `page` pages further in.
    pub fn page(&self, page: usize) -> Self {
        Self {
            start: self.start + page * self.size,
            ..self.clone()
        }
    }

    pub fn url(&self, base_url: &str) -> Result<Url, QueryError> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), SEARCH_PATH);
        let mut url = Url::parse(&raw).map_err(|e| QueryError {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", &self.query)
                .append_pair("searchtype", "all")
                .append_pair(
                    "abstracts",
                    if self.hide_abstracts { "hide" } else { "show" },
                )
                .append_pair("order", &self.order)
                .append_pair("size", &self.size.to_string());
            if self.start > 0 {
                pairs.append_pair("start", &self.start.to_string());
            }
        }

        Ok(url)
    }
}
