pub mod card;
pub mod clock;
pub mod markup;
pub mod normalize;
pub mod parser;
pub mod query;
pub mod rules;
pub mod scanner;
pub mod scraper;
pub mod types;
pub mod utils;

pub use crate::clock::{AnnouncementClock, ClockError, Window, resolve_target_date, resolve_window};
pub use crate::parser::{parse_records, parse_sample};
pub use crate::rules::ExtractorConfig;
pub use crate::scraper::{ScraperError, WebScraper};
pub use crate::types::{Record, SelectionMode};

pub(crate) const BASE_URL: &str = "https://arxiv.org";
pub(crate) const CLOCK_URL: &str = "https://arxiv.org/localtime";
