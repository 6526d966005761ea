use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::base;
use crate::models::Event;

// The deployed markup keeps the card link within four levels of an entry.
// Verify against the live page before raising or lowering this.
const MAX_CARD_DEPTH: usize = 4;

static ENTRY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".evo_above_title").expect("listing entry selector"));
static DAY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".date").expect("listing day selector"));
static MONTH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".month").expect("listing month selector"));
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".evcal_desc2.evcal_event_title").expect("listing title selector")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("listing link selector"));

// calendar month -> display (genitive) form
const MONTHS: [(&str, &str); 25] = [
    ("январь", "января"),
    ("янв", "января"),
    ("февраль", "февраля"),
    ("фев", "февраля"),
    ("март", "марта"),
    ("мар", "марта"),
    ("апрель", "апреля"),
    ("апр", "апреля"),
    ("май", "мая"),
    ("мая", "мая"),
    ("июнь", "июня"),
    ("июн", "июня"),
    ("июль", "июля"),
    ("июл", "июля"),
    ("август", "августа"),
    ("авг", "августа"),
    ("сентябрь", "сентября"),
    ("сен", "сентября"),
    ("сент", "сентября"),
    ("октябрь", "октября"),
    ("окт", "октября"),
    ("ноябрь", "ноября"),
    ("ноя", "ноября"),
    ("декабрь", "декабря"),
    ("дек", "декабря"),
];

/// Parses the listing page and returns one candidate per leaf entry, in page order.
pub fn extract_events(html: &str, listing_url: &str) -> Vec<Event> {
    let document = Html::parse_document(html);
    extract(&document, listing_url)
}

pub fn extract(document: &Html, listing_url: &str) -> Vec<Event> {
    document
        .select(&ENTRY_SELECTOR)
        .filter(|entry| is_leaf(entry))
        .map(|entry| candidate_from(entry, listing_url))
        .collect()
}

/// Entries with nested elements are group headers, not bookable events.
pub fn is_leaf(entry: &ElementRef<'_>) -> bool {
    !entry.children().any(|child| child.value().is_element())
}

pub fn display_month(raw: &str) -> String {
    let trimmed = raw.trim();
    let key = trimmed.to_lowercase();
    MONTHS
        .iter()
        .find(|(calendar, _)| *calendar == key)
        .map(|(_, display)| display.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Detail-page URL for an entry: the first link held by (or being) its nearest linked ancestor.
pub fn booking_link(entry: ElementRef<'_>, listing_url: &str) -> Option<String> {
    let href = card_ancestors(entry).find_map(|node| {
        let own = node.value().attr("href").filter(|_| node.value().name() == "a");
        own.map(str::to_string)
            .or_else(|| base::attribute(&node, &LINK_SELECTOR, "href"))
    })?;
    base::resolve_link(listing_url, &href)
}

fn candidate_from(entry: ElementRef<'_>, listing_url: &str) -> Event {
    let core = card_core(entry);

    let day = base::folded_text(&core, &DAY_SELECTOR).unwrap_or_default();
    let month = base::folded_text(&core, &MONTH_SELECTOR)
        .map(|text| display_month(&text))
        .unwrap_or_default();
    let date = format!("{day} {month}").trim().to_string();

    let time = base::folded_text(&core, &TITLE_SELECTOR)
        .map(|text| base::escape_markup(&text))
        .unwrap_or_default();

    let link = booking_link(entry, listing_url).unwrap_or_default();

    Event::candidate(date, time, link)
}

fn card_core(entry: ElementRef<'_>) -> ElementRef<'_> {
    card_ancestors(entry)
        .find(|node| node.select(&DAY_SELECTOR).next().is_some())
        .or_else(|| card_ancestors(entry).nth(1))
        .unwrap_or(entry)
}

fn card_ancestors(entry: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    entry
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_CARD_DEPTH)
}
