//! Shareable search URLs.
//!
//! The search page URL carries the query as `q` (text) and `loc` (location
//! text). Coordinates are device specific and never written. Pages reached
//! from a search carry the originating query as `fromQ`/`fromL` so they can
//! link back.

use url::Url;

use super::query::Query;

const TEXT_PARAM: &str = "q";
const LOCATION_PARAM: &str = "loc";
const FROM_TEXT_PARAM: &str = "fromQ";
const FROM_LOCATION_PARAM: &str = "fromL";

/// Write `query` into `page`, replacing any existing query string.
#[must_use]
pub fn write(page: &Url, query: &Query) -> Url {
    let mut url = page.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        if !query.text().trim().is_empty() {
            pairs.append_pair(TEXT_PARAM, query.text().trim());
        }
        if let Some(location) = query.location_text() {
            pairs.append_pair(LOCATION_PARAM, location.trim());
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}

/// Read the query encoded in `url`.
#[must_use]
pub fn read(url: &Url) -> Query {
    read_pair(url, TEXT_PARAM, LOCATION_PARAM)
}

/// Link back to the search page from a page that carries `fromQ`/`fromL`.
///
/// Returns `None` when the page was not reached from a search.
#[must_use]
pub fn back_to_search(page: &Url, search_page: &Url) -> Option<Url> {
    let query = read_pair(page, FROM_TEXT_PARAM, FROM_LOCATION_PARAM);
    (!query.text().is_empty()).then(|| write(search_page, &query))
}

fn read_pair(url: &Url, text_key: &str, location_key: &str) -> Query {
    let mut query = Query::default();
    for (key, value) in url.query_pairs() {
        if key == text_key {
            query.set_text(value.trim());
        } else if key == location_key {
            query.set_location_text(value.trim());
        }
    }
    query
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crowdfork_core::Coordinates;

    use super::*;

    fn page() -> Url {
        Url::parse("http://localhost:5173/search").unwrap()
    }

    #[test]
    fn test_write_encodes_text_and_location() {
        let mut query = Query::new("pad thai");
        query.set_location_text("New York, NY");
        let url = write(&page(), &query);
        assert_eq!(
            url.as_str(),
            "http://localhost:5173/search?q=pad+thai&loc=New+York%2C+NY"
        );
    }

    #[test]
    fn test_write_omits_coordinates_and_empty_text() {
        let mut query = Query::new("");
        query.set_coordinates(Coordinates::new(1.0, 2.0).unwrap());
        assert_eq!(write(&page(), &query).as_str(), "http://localhost:5173/search");
    }

    #[test]
    fn test_write_replaces_existing_params() {
        let stale = Url::parse("http://localhost:5173/search?q=old&loc=Oldtown").unwrap();
        let url = write(&stale, &Query::new("new"));
        assert_eq!(url.query(), Some("q=new"));
    }

    #[test]
    fn test_read_decodes() {
        let url = Url::parse("http://localhost:5173/search?q=pad+thai&loc=New%20York").unwrap();
        let query = read(&url);
        assert_eq!(query.text(), "pad thai");
        assert_eq!(query.location_text(), Some("New York"));
    }

    #[test]
    fn test_read_without_params_is_empty() {
        assert_eq!(read(&page()), Query::default());
    }

    #[test]
    fn test_back_to_search() {
        let saved = Url::parse("http://localhost:5173/saved?fromQ=ramen&fromL=Oakland").unwrap();
        let back = back_to_search(&saved, &page()).unwrap();
        assert_eq!(back.as_str(), "http://localhost:5173/search?q=ramen&loc=Oakland");

        let direct = Url::parse("http://localhost:5173/saved").unwrap();
        assert!(back_to_search(&direct, &page()).is_none());
    }
}
