use std::collections::BTreeMap;

use crate::clock::Window;
use crate::types::Record;

use chrono::NaiveDate;

/// Keeps records whose announcement date lies in `[start, end]`.
///
/// With neither bound set the input comes back untouched, undated records
/// included. Once any bound is set, undated records are dropped.
pub fn filter_by_window(
    records: Vec<Record>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Record> {
    if start.is_none() && end.is_none() {
        return records;
    }

    records
        .into_iter()
        .filter(|r| match r.announced_date {
            Some(date) => start.is_none_or(|s| s <= date) && end.is_none_or(|e| date <= e),
            None => false,
        })
        .collect()
}

/// Leading run of records that share the first announcement date seen.
/// Undated records before the cut are kept.
pub fn latest_day(records: Vec<Record>) -> Vec<Record> {
    let Some(newest) = records.iter().find_map(|r| r.announced_date) else {
        return records;
    };

    records
        .into_iter()
        .take_while(|r| r.announced_date.is_none_or(|d| d == newest))
        .collect()
}

#[derive(Debug, Default)]
pub struct RecordFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn from_window(window: &Window, limit: Option<usize>) -> Self {
        Self {
            start_date: Some(window.start),
            end_date: Some(window.end),
            limit,
        }
    }

    pub fn apply(self, records: Vec<Record>) -> Vec<Record> {
        let mut records = filter_by_window(records, self.start_date, self.end_date);
        if let Some(lim) = self.limit {
            records.truncate(lim);
        }
        records
    }

    pub fn validate(self) -> Result<Self, String> {
        if let Some(start) = self.start_date
            && let Some(end) = self.end_date
            && start > end
        {
            return Err(format!(
                "Start date ({start}) cannot be after end date ({end})"
            ));
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct DigestStats {
    pub by_category: BTreeMap<String, usize>,
    pub undated: usize,
    pub total: usize,
}

impl DigestStats {
    pub fn from_records(records: &[Record]) -> DigestStats {
        let mut by_category = BTreeMap::new();
        for record in records {
            let key = if record.category.is_empty() {
                "(none)".to_string()
            } else {
                record.category.clone()
            };
            *by_category.entry(key).or_insert(0) += 1;
        }

        DigestStats {
            by_category,
            undated: records
                .iter()
                .filter(|r| r.announced_date.is_none())
                .count(),
            total: records.len(),
        }
    }
}

impl std::fmt::Display for DigestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        for (category, count) in &self.by_category {
            writeln!(f, "  {:<20} {}", category, count)?;
        }
        writeln!(f, "  {:<20} {}", "Undated", self.undated)?;
        writeln!(f, "  {:<20} {}", "Total", self.total)
    }
}
