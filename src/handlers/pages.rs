use askama::Template;
use axum::response::Html;

use crate::filters;

#[derive(Template)]
#[template(path = "property.html")]
pub struct PropertyPageTemplate {}

#[derive(Template)]
#[template(path = "search_results.html")]
pub struct SearchResultsTemplate {}

/// GET /propertyPage - Listing page; the script fetches /property by name
pub async fn property_page() -> Html<String> {
  Html(PropertyPageTemplate {}.render().unwrap_or_default())
}

/// GET /searchResults
pub async fn search_results() -> Html<String> {
  Html(SearchResultsTemplate {}.render().unwrap_or_default())
}
