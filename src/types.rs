use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Keyword searched for when the user has not typed a title.
pub const DEFAULT_KEYWORD: &str = "star";

/// Number of items the catalog returns per page. Fixed by the catalog.
pub const PAGE_SIZE: u64 = 10;

pub const YEAR_SLIDER_MIN: i32 = 1970;
pub const YEAR_SLIDER_MAX: i32 = 2024;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ImdbId(pub String);

impl fmt::Display for ImdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImdbId {
    fn from(value: &str) -> Self {
        ImdbId(value.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Any,
    Movie,
    Series,
    Episode,
}

impl MediaType {
    /// Value of the catalog's `type` parameter. `Any` leaves the filter empty.
    pub fn as_param(&self) -> &'static str {
        match self {
            MediaType::Any => "",
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Episode => "episode",
        }
    }
}

/// Inclusive year filter. Always ordered so that `low <= high`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct YearRange {
    low: i32,
    high: i32,
}

impl YearRange {
    pub fn new(a: i32, b: i32) -> YearRange {
        YearRange {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> i32 {
        self.low
    }

    pub fn high(&self) -> i32 {
        self.high
    }
}

impl Default for YearRange {
    fn default() -> Self {
        YearRange::new(2000, 2010)
    }
}

impl From<(i32, i32)> for YearRange {
    fn from((a, b): (i32, i32)) -> Self {
        YearRange::new(a, b)
    }
}

impl From<YearRange> for (i32, i32) {
    fn from(value: YearRange) -> Self {
        (value.low, value.high)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// A single user interaction with the search form.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum QueryEdit {
    Title(String),
    YearRange(YearRange),
    MediaType(MediaType),
    Page(u32),
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct SearchQuery {
    title: Option<String>,
    year_range: YearRange,
    media_type: MediaType,
    page: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            title: None,
            year_range: YearRange::default(),
            media_type: MediaType::Any,
            page: 1,
        }
    }
}

impl SearchQuery {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Keyword sent to the catalog, falling back to [`DEFAULT_KEYWORD`].
    pub fn keyword(&self) -> &str {
        self.title().unwrap_or(DEFAULT_KEYWORD)
    }

    pub fn year_range(&self) -> YearRange {
        self.year_range
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the query produced by applying `edit`. Any edit other than an
    /// explicit page change sends the user back to the first page.
    pub fn edited(&self, edit: QueryEdit) -> SearchQuery {
        let mut ret = self.clone();
        match edit {
            QueryEdit::Title(title) => {
                let title = title.trim();
                ret.title = (!title.is_empty()).then(|| title.to_string());
                ret.page = 1;
            }
            QueryEdit::YearRange(year_range) => {
                ret.year_range = year_range;
                ret.page = 1;
            }
            QueryEdit::MediaType(media_type) => {
                ret.media_type = media_type;
                ret.page = 1;
            }
            QueryEdit::Page(page) => {
                ret.page = page.max(1);
            }
        }
        ret
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct SearchResultItem {
    pub id: ImdbId,
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub media_type: String,
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq, Default)]
pub struct ResultPage {
    pub items: Vec<SearchResultItem>,
    pub total_count: u64,
}

impl ResultPage {
    pub fn empty() -> ResultPage {
        ResultPage::default()
    }

    pub fn max_pages(&self) -> u64 {
        self.total_count.div_ceil(PAGE_SIZE)
    }

    pub fn show_pagination(&self) -> bool {
        self.max_pages() > 1
    }

    pub fn first_id(&self) -> Option<&ImdbId> {
        self.items.first().map(|item| &item.id)
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct SourceRating {
    pub source: String,
    pub value: String,
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct DetailRecord {
    pub id: ImdbId,
    pub title: String,
    pub year: Option<String>,
    pub rated: Option<String>,
    pub released: Option<NaiveDate>,
    pub runtime: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub poster: Option<String>,
    pub ratings: Vec<SourceRating>,
    pub metascore: Option<String>,
    pub imdb_rating: Option<String>,
    pub imdb_votes: Option<String>,
    pub media_type: Option<String>,
    pub dvd: Option<String>,
    pub box_office: Option<String>,
    pub production: Option<String>,
    pub website: Option<String>,
}
