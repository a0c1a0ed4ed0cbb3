use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid mode '{0}'. Accepted values: 'window', 'latest'")]
pub struct ModeParseError(String);

/// How the records of a listing page are narrowed down before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Keep records announced inside the resolved announcement window.
    #[default]
    Window,
    /// Keep the leading run of records sharing the newest announcement date.
    Latest,
}

impl FromStr for SelectionMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "window" => Ok(SelectionMode::Window),
            "latest" | "latest_day" => Ok(SelectionMode::Latest),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}

impl Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMode::Window => write!(f, "window"),
            SelectionMode::Latest => write!(f, "latest"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub category: String,
    pub announced_date: Option<NaiveDate>,
    pub abs_link: String,
    pub pdf_link: String,
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let date = self
            .announced_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "----------".to_string());
        if self.category.is_empty() {
            write!(f, "{} {}", date, self.title)?;
        } else {
            write!(f, "{} [{}] {}", date, self.category, self.title)?;
        }
        if !self.abs_link.is_empty() {
            write!(f, "\n       {}", self.abs_link)?;
        }
        Ok(())
    }
}
