use serde::Serialize;
use tracing::{debug, error};

use std::fmt::Display;

use crate::types::{
    ImdbId, QueryEdit, ResultPage, SearchQuery, YEAR_SLIDER_MAX, YEAR_SLIDER_MIN,
};

/// Handle for one outstanding search. Only the ticket issued by the most
/// recent query change may update the displayed results.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SearchTicket {
    generation: u64,
    query: SearchQuery,
}

impl SearchTicket {
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct SearchView {
    pub query: SearchQuery,
    pub results: ResultPage,
    pub selected_id: Option<ImdbId>,
    pub max_pages: u64,
    pub show_pagination: bool,
    pub loading: bool,
    pub year_slider: (i32, i32),
}

/// Owns the search form state and the results derived from it.
///
/// Every query change hands out a [`SearchTicket`]; the caller runs the search
/// for the ticket's query and reports back through [`SearchController::complete`].
/// Responses for superseded tickets are dropped, so a slow response can never
/// overwrite results for a newer query.
#[derive(Debug)]
pub struct SearchController {
    query: SearchQuery,
    results: ResultPage,
    selected_id: Option<ImdbId>,
    generation: u64,
    completed_generation: u64,
}

impl Default for SearchController {
    fn default() -> Self {
        SearchController::new()
    }
}

impl SearchController {
    pub fn new() -> SearchController {
        SearchController {
            query: SearchQuery::default(),
            results: ResultPage::empty(),
            selected_id: None,
            generation: 0,
            completed_generation: 0,
        }
    }

    /// Search for the current query without changing it. Used on startup so
    /// the default results show up immediately.
    pub fn mount(&mut self) -> SearchTicket {
        self.issue_ticket()
    }

    pub fn apply(&mut self, edit: QueryEdit) -> SearchTicket {
        self.query = self.query.edited(edit);
        self.issue_ticket()
    }

    /// Returns false if the ticket was superseded and the outcome discarded.
    pub fn complete<E: Display>(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<ResultPage, E>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "Discarding results for superseded search {} (latest {})",
                ticket.generation, self.generation
            );
            return false;
        }

        let results = match outcome {
            Ok(v) => v,
            Err(e) => {
                error!("Search for \"{}\" failed: {e}", ticket.query.keyword());
                ResultPage::empty()
            }
        };

        self.selected_id = results.first_id().cloned();
        self.results = results;
        self.completed_generation = ticket.generation;
        true
    }

    pub fn select(&mut self, id: ImdbId) {
        self.selected_id = Some(id);
    }

    #[cfg(test)]
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn results(&self) -> &ResultPage {
        &self.results
    }

    pub fn selected_id(&self) -> Option<&ImdbId> {
        self.selected_id.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.completed_generation != self.generation
    }

    pub fn view(&self) -> SearchView {
        SearchView {
            query: self.query.clone(),
            results: self.results.clone(),
            selected_id: self.selected_id.clone(),
            max_pages: self.results.max_pages(),
            show_pagination: self.results.show_pagination(),
            loading: self.is_loading(),
            year_slider: (YEAR_SLIDER_MIN, YEAR_SLIDER_MAX),
        }
    }

    fn issue_ticket(&mut self) -> SearchTicket {
        self.generation += 1;
        SearchTicket {
            generation: self.generation,
            query: self.query.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{MediaType, SearchResultItem, YearRange};

    fn item(id: &str) -> SearchResultItem {
        SearchResultItem {
            id: ImdbId::from(id),
            title: format!("Title {id}"),
            year: "1977".to_string(),
            poster: None,
            media_type: "movie".to_string(),
        }
    }

    fn page(ids: &[&str], total_count: u64) -> ResultPage {
        ResultPage {
            items: ids.iter().map(|id| item(id)).collect(),
            total_count,
        }
    }

    fn ok(page: ResultPage) -> Result<ResultPage, String> {
        Ok(page)
    }

    #[test]
    fn test_mount_searches_default_query() {
        let mut controller = SearchController::new();
        let ticket = controller.mount();
        assert_eq!(ticket.query(), &SearchQuery::default());
        assert!(controller.is_loading());

        assert!(controller.complete(ticket, ok(page(&["tt1", "tt2"], 2))));
        assert!(!controller.is_loading());
        assert_eq!(controller.selected_id(), Some(&ImdbId::from("tt1")));
    }

    #[test]
    fn test_star_scenario() {
        let mut controller = SearchController::new();
        controller.apply(QueryEdit::Title("star".to_string()));
        controller.apply(QueryEdit::YearRange(YearRange::new(1970, 2024)));
        let ticket = controller.apply(QueryEdit::MediaType(MediaType::Any));

        assert_eq!(ticket.query().keyword(), "star");
        assert_eq!(ticket.query().page(), 1);

        let ids = [
            "tt0", "tt1", "tt2", "tt3", "tt4", "tt5", "tt6", "tt7", "tt8", "tt9",
        ];
        assert!(controller.complete(ticket, ok(page(&ids, 23))));

        let view = controller.view();
        assert_eq!(view.max_pages, 3);
        assert!(view.show_pagination);
        assert_eq!(view.selected_id, Some(ImdbId::from("tt0")));
        assert_eq!(view.results.items.len(), 10);
    }

    #[test]
    fn test_empty_result_clears_selection() {
        let mut controller = SearchController::new();
        let ticket = controller.mount();
        controller.complete(ticket, ok(page(&["tt1"], 1)));
        assert!(controller.selected_id().is_some());

        let ticket = controller.apply(QueryEdit::Title("zzzzqqq".to_string()));
        controller.complete(ticket, ok(ResultPage::empty()));

        let view = controller.view();
        assert_eq!(view.selected_id, None);
        assert_eq!(view.max_pages, 0);
        assert!(!view.show_pagination);
    }

    #[test]
    fn test_failure_is_empty_page() {
        let mut controller = SearchController::new();
        let ticket = controller.mount();
        controller.complete(ticket, ok(page(&["tt1", "tt2"], 12)));

        let ticket = controller.apply(QueryEdit::Page(2));
        assert!(controller.complete::<&str>(ticket, Err("connection refused")));

        assert_eq!(controller.results(), &ResultPage::empty());
        assert_eq!(controller.selected_id(), None);
        assert_eq!(controller.query().page(), 2);
    }

    #[test]
    fn test_superseded_response_is_discarded() {
        let mut controller = SearchController::new();
        let slow = controller.apply(QueryEdit::Title("alien".to_string()));
        let fast = controller.apply(QueryEdit::Title("aliens".to_string()));

        assert!(controller.complete(fast, ok(page(&["tt_aliens"], 1))));
        assert!(!controller.complete(slow, ok(page(&["tt_alien"], 1))));

        assert_eq!(controller.selected_id(), Some(&ImdbId::from("tt_aliens")));
        assert_eq!(controller.query().title(), Some("aliens"));
    }

    #[test]
    fn test_select_does_not_search() {
        let mut controller = SearchController::new();
        let ticket = controller.mount();
        controller.complete(ticket.clone(), ok(page(&["tt1", "tt2"], 2)));

        let query_before = controller.query().clone();
        controller.select(ImdbId::from("tt2"));

        assert_eq!(controller.selected_id(), Some(&ImdbId::from("tt2")));
        assert_eq!(controller.query(), &query_before);
        assert!(!controller.is_loading());
        // The ticket that produced the current page is still the latest one.
        assert!(controller.complete(ticket, ok(page(&["tt1", "tt2"], 2))));
    }
}
