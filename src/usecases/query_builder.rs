//! Turns inbound message text into an archive search request.

use crate::domain::{Fuzziness, MatchOperator, SearchRequest, SortOrder};

/// Command tokens the bot recognizes. Recognized commands never reach the
/// search backend; extend this table to add commands without touching the
/// dispatcher.
pub const RESERVED_COMMANDS: &[&str] = &["/start"];

/// Builds the fuzzy provenance query for a message text.
#[derive(Debug)]
pub struct QueryBuilder {
    index_pattern: String,
}

impl QueryBuilder {
    /// Queries target every time-sharded index under `index_prefix`.
    pub fn new(index_prefix: &str) -> Self {
        Self {
            index_pattern: format!("{index_prefix}*"),
        }
    }

    /// Build the search request for `text`, or `None` when the text is a
    /// reserved command token.
    ///
    /// The request asks for the single newest archived message whose text
    /// fuzzily contains every term of `text`.
    pub fn build(&self, text: &str) -> Option<SearchRequest> {
        if RESERVED_COMMANDS.contains(&text) {
            return None;
        }
        Some(SearchRequest {
            term: text.to_string(),
            fuzziness: Fuzziness::Auto,
            operator: MatchOperator::And,
            sort: SortOrder::NewestFirst,
            limit: 1,
            index_pattern: self.index_pattern.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fixes_fuzziness_operator_sort_and_limit() {
        let builder = QueryBuilder::new("telegram");
        let request = builder.build("hello world").unwrap();
        assert_eq!(request.term, "hello world");
        assert_eq!(request.fuzziness, Fuzziness::Auto);
        assert_eq!(request.operator, MatchOperator::And);
        assert_eq!(request.sort, SortOrder::NewestFirst);
        assert_eq!(request.limit, 1);
    }

    #[test]
    fn test_index_pattern_is_prefix_wildcard() {
        let builder = QueryBuilder::new("archive");
        let request = builder.build("anything").unwrap();
        assert_eq!(request.index_pattern, "archive*");
    }

    #[test]
    fn test_start_command_builds_no_request() {
        let builder = QueryBuilder::new("telegram");
        assert!(builder.build("/start").is_none());
    }

    #[test]
    fn test_command_must_match_exactly() {
        let builder = QueryBuilder::new("telegram");
        assert!(builder.build("/start now").is_some());
        assert!(builder.build("say /start").is_some());
    }
}
