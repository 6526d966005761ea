use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::base::{self, PageFetcher};
use crate::error::FetchError;
use crate::models::{Event, FREE_PRICE, NO_DESCRIPTION, PLENTY_AVAILABLE};

static PRICE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[itemprop="price"]"#).expect("detail price selector"));
static DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[itemprop="description"]"#).expect("detail description selector")
});
static REMAINING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".tickets-left").expect("detail remaining selector"));
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-time").expect("detail time selector"));

/// Fetches the candidate's booking page and fills in the detail fields.
///
/// A failed fetch is logged and leaves the candidate as it was. The error is
/// returned only so the caller can count it; it must not abort the cycle.
pub async fn enrich<F>(fetcher: &F, event: &mut Event) -> Result<(), FetchError>
where
    F: PageFetcher + ?Sized,
{
    if event.booking_link.is_empty() {
        debug!(date = %event.date, "candidate has no booking link, skipping enrichment");
        return Ok(());
    }

    match fetcher.fetch_html(&event.booking_link).await {
        Ok(html) => {
            apply_detail_page(event, &html);
            Ok(())
        }
        Err(err) => {
            warn!(url = %event.booking_link, error = %err, "unable to enrich event");
            Err(err)
        }
    }
}

/// Overwrites price, description, remaining and time from a detail page document.
pub fn apply_detail_page(event: &mut Event, html: &str) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    event.price = base::attribute(&root, &PRICE_SELECTOR, "content")
        .unwrap_or_else(|| FREE_PRICE.to_string());

    event.description = base::raw_text(&root, &DESCRIPTION_SELECTOR)
        .map(|text| base::escape_markup(&text))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    event.remaining = base::folded_text(&root, &REMAINING_SELECTOR)
        .map(|text| format!("_{text}_"))
        .unwrap_or_else(|| PLENTY_AVAILABLE.to_string());

    if let Some(time) = base::folded_text(&root, &TIME_SELECTOR) {
        event.time = base::escape_markup(&time);
    }
}
