use crate::{
    catalog::Catalog,
    types::{DetailRecord, ImdbId, ResultPage, SearchQuery, SearchResultItem, SourceRating},
};

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use std::io::Read;

/// Placeholder the catalog uses for missing values.
const NOT_AVAILABLE: &str = "N/A";

fn available(value: Option<String>) -> Option<String> {
    value.filter(|v| v != NOT_AVAILABLE && !v.is_empty())
}

#[derive(Debug, Deserialize)]
struct OmdbSearchResult {
    #[serde(rename = "Search")]
    search: Option<Vec<OmdbSearchItem>>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearchItem {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Type")]
    media_type: String,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbRating {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct OmdbMovie {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Rated")]
    rated: Option<String>,
    #[serde(rename = "Released")]
    released: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Writer")]
    writer: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Language")]
    language: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Awards")]
    awards: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Ratings", default)]
    ratings: Option<Vec<OmdbRating>>,
    #[serde(rename = "Metascore")]
    metascore: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    imdb_votes: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Type")]
    media_type: Option<String>,
    #[serde(rename = "DVD")]
    dvd: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
    #[serde(rename = "Production")]
    production: Option<String>,
    #[serde(rename = "Website")]
    website: Option<String>,
}

#[derive(Error, Debug)]
pub enum ParseDetailError {
    #[error("catalog rejected request: {0}")]
    Rejected(String),
}

/// Release dates are display-only, so a format we can't read is dropped
/// rather than failing the whole record.
fn parse_released(value: Option<String>) -> Option<NaiveDate> {
    let value = available(value)?;
    match NaiveDate::parse_from_str(&value, "%d %b %Y") {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring unparseable release date \"{value}\": {e}");
            None
        }
    }
}

impl TryFrom<OmdbMovie> for DetailRecord {
    type Error = ParseDetailError;
    fn try_from(value: OmdbMovie) -> Result<Self, ParseDetailError> {
        use ParseDetailError::*;

        if value.response != "True" {
            return Err(Rejected(value.error.unwrap_or_default()));
        }

        let released = parse_released(value.released);

        let ratings = value
            .ratings
            .unwrap_or_default()
            .into_iter()
            .map(|r| SourceRating {
                source: r.source,
                value: r.value,
            })
            .collect();

        Ok(DetailRecord {
            id: ImdbId(value.imdb_id.unwrap_or_default()),
            title: value.title.unwrap_or_default(),
            year: available(value.year),
            rated: available(value.rated),
            released,
            runtime: available(value.runtime),
            genre: available(value.genre),
            director: available(value.director),
            writer: available(value.writer),
            actors: available(value.actors),
            plot: available(value.plot),
            language: available(value.language),
            country: available(value.country),
            awards: available(value.awards),
            poster: available(value.poster),
            ratings,
            metascore: available(value.metascore),
            imdb_rating: available(value.imdb_rating),
            imdb_votes: available(value.imdb_votes),
            media_type: available(value.media_type),
            dvd: available(value.dvd),
            box_office: available(value.box_office),
            production: available(value.production),
            website: available(value.website),
        })
    }
}

impl From<OmdbSearchItem> for SearchResultItem {
    fn from(value: OmdbSearchItem) -> Self {
        SearchResultItem {
            id: ImdbId(value.imdb_id),
            title: value.title,
            year: value.year,
            poster: available(value.poster),
            media_type: value.media_type,
        }
    }
}

impl From<OmdbSearchResult> for ResultPage {
    fn from(value: OmdbSearchResult) -> Self {
        if value.response != "True" {
            // Not found and too many results both land here. Nothing to show.
            warn!(
                "Search returned no results: {}",
                value.error.as_deref().unwrap_or("unknown reason")
            );
            return ResultPage::empty();
        }

        let total_count = value
            .total_results
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);

        ResultPage {
            items: value
                .search
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
            total_count,
        }
    }
}

const OMDB_BASE_URI: &str = "https://www.omdbapi.com/";

#[derive(Debug, Error)]
pub enum OmdbError {
    #[error("failed to execute get")]
    Get(#[source] isahc::Error),
    #[error("failed to read get response")]
    Read(#[source] std::io::Error),
    #[error("failed to parse json data")]
    Parse(#[source] serde_json::Error),
    #[error("failed to convert to common type")]
    ConversionFailed(#[source] ParseDetailError),
}

fn search_params(query: &SearchQuery) -> String {
    format!(
        "s={}&y={}&type={}&page={}",
        urlencoding::encode(query.keyword()),
        query.year_range(),
        query.media_type().as_param(),
        query.page()
    )
}

pub struct OmdbCatalog {
    api_key: String,
}

impl OmdbCatalog {
    pub fn new(api_key: String) -> OmdbCatalog {
        OmdbCatalog { api_key }
    }

    fn request_url(&self, params: &str) -> String {
        format!(
            "{}?{}&apikey={}",
            OMDB_BASE_URI,
            params,
            urlencoding::encode(&self.api_key)
        )
    }

    fn request<T: DeserializeOwned>(&self, params: &str) -> Result<T, OmdbError> {
        use OmdbError::*;

        debug!("Sending request to {OMDB_BASE_URI}?{params}&apikey=xxxxx");
        let url = self.request_url(params);

        let mut response = isahc::get(url).map_err(Get)?;
        let body = response.body_mut();

        let mut body_s = String::new();
        body.read_to_string(&mut body_s).map_err(Read)?;

        debug!("Returned content {}", body_s);
        serde_json::from_str(&body_s).map_err(Parse)
    }
}

impl Catalog for OmdbCatalog {
    type Err = OmdbError;

    fn search(&self, query: &SearchQuery) -> Result<ResultPage, OmdbError> {
        let api_response: OmdbSearchResult = self.request(&search_params(query))?;
        Ok(api_response.into())
    }

    fn get_by_id(&self, id: &ImdbId) -> Result<DetailRecord, OmdbError> {
        let api_response: OmdbMovie =
            self.request(&format!("i={}", urlencoding::encode(&id.0)))?;
        api_response.try_into().map_err(OmdbError::ConversionFailed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{MediaType, QueryEdit, YearRange};

    #[test]
    fn test_search_result_parsing() {
        let res = serde_json::from_slice::<OmdbSearchResult>(include_bytes!(
            "../res/omdb/star_search_result.json"
        ))
        .expect("Failed to parse search results");
        let page: ResultPage = res.into();

        assert_eq!(page.total_count, 23);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.max_pages(), 3);
        assert_eq!(page.first_id(), Some(&ImdbId::from("tt0076759")));

        let no_poster = page
            .items
            .iter()
            .find(|item| item.id == ImdbId::from("tt0120601"))
            .expect("Missing item without poster");
        assert_eq!(no_poster.poster, None);
    }

    #[test]
    fn test_not_found_is_empty_page() {
        let res = serde_json::from_slice::<OmdbSearchResult>(include_bytes!(
            "../res/omdb/not_found_search_result.json"
        ))
        .expect("Failed to parse search results");
        let page: ResultPage = res.into();
        assert_eq!(page, ResultPage::empty());
    }

    #[test]
    fn test_unparseable_total_is_zero() {
        let res = serde_json::from_str::<OmdbSearchResult>(
            r#"{"Search": [], "totalResults": "lots", "Response": "True"}"#,
        )
        .expect("Failed to parse search results");
        let page: ResultPage = res.into();
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_id_result_parsing() {
        let res = serde_json::from_slice::<OmdbMovie>(include_bytes!(
            "../res/omdb/star_wars_id_result.json"
        ))
        .expect("Failed to parse id result");
        let detail: DetailRecord = res.try_into().expect("Failed to convert to detail record");

        assert_eq!(detail.id, ImdbId::from("tt0076759"));
        assert_eq!(detail.title, "Star Wars: Episode IV - A New Hope");
        assert_eq!(detail.released, NaiveDate::from_ymd_opt(1977, 5, 25));
        assert_eq!(detail.ratings.len(), 3);
        assert_eq!(detail.ratings[0].source, "Internet Movie Database");
        assert_eq!(detail.website, None);
    }

    #[test]
    fn test_series_id_result_parsing() {
        let res = serde_json::from_slice::<OmdbMovie>(include_bytes!(
            "../res/omdb/series_id_result.json"
        ))
        .expect("Failed to parse id result");
        let detail: DetailRecord = res.try_into().expect("Failed to convert to detail record");

        assert_eq!(detail.media_type.as_deref(), Some("series"));
        assert_eq!(detail.dvd, None);
        assert_eq!(detail.box_office, None);
    }

    #[test]
    fn test_unparseable_release_date_keeps_record() {
        let res = serde_json::from_str::<OmdbMovie>(
            r#"{"Response": "True", "Title": "X", "imdbID": "tt1", "Released": "1977"}"#,
        )
        .expect("Failed to parse id result");
        let detail: DetailRecord = res.try_into().expect("Failed to convert to detail record");

        assert_eq!(detail.title, "X");
        assert_eq!(detail.id, ImdbId::from("tt1"));
        assert_eq!(detail.released, None);
    }

    #[test]
    fn test_rejected_id_result() {
        let res = serde_json::from_str::<OmdbMovie>(
            r#"{"Response": "False", "Error": "Incorrect IMDb ID."}"#,
        )
        .expect("Failed to parse id result");
        let err = DetailRecord::try_from(res).expect_err("Rejected result converted");
        assert!(matches!(err, ParseDetailError::Rejected(msg) if msg == "Incorrect IMDb ID."));
    }

    #[test]
    fn test_api_key_encoded() {
        let catalog = OmdbCatalog::new("ab&c=d".to_string());
        assert_eq!(
            catalog.request_url("i=tt1"),
            "https://www.omdbapi.com/?i=tt1&apikey=ab%26c%3Dd"
        );
    }

    #[test]
    fn test_search_params() {
        let query = SearchQuery::default();
        assert_eq!(search_params(&query), "s=star&y=2000-2010&type=&page=1");

        let query = query
            .edited(QueryEdit::Title("star wars".to_string()))
            .edited(QueryEdit::YearRange(YearRange::new(1970, 2024)))
            .edited(QueryEdit::MediaType(MediaType::Episode))
            .edited(QueryEdit::Page(2));
        assert_eq!(
            search_params(&query),
            "s=star%20wars&y=1970-2024&type=episode&page=2"
        );
    }
}
