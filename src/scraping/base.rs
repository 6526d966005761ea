use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Selector};

use crate::error::FetchError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "StandupWatch/0.1 (+https://standupstore.ru/)";

// Applied left to right, first match wins, matches never overlap.
const MARKUP_ESCAPES: [(&str, &str); 5] = [
    ("(", "\\("),
    (")", "\\)"),
    ("+", "\\+"),
    ("-", "\\-"),
    ("  ", " "),
];

/// Source of HTML documents. The watcher never talks to the network directly.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T> PageFetcher for Arc<T>
where
    T: PageFetcher + ?Sized,
{
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch_html(url).await
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Request {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|err| FetchError::Body {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Text of the first match with whitespace runs folded to single spaces.
/// Blank text counts as absent.
pub fn folded_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let node = scope.select(selector).next()?;
    let words: Vec<&str> = node.text().flat_map(str::split_whitespace).collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// Text of the first match, only trimmed, so inner spacing reaches `escape_markup` intact.
pub fn raw_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let node = scope.select(selector).next()?;
    let text: String = node.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub fn attribute(scope: &ElementRef<'_>, selector: &Selector, name: &str) -> Option<String> {
    scope
        .select(selector)
        .find_map(|node| node.value().attr(name))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolves an href against the page it was found on; absolute hrefs pass through.
pub fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let page = reqwest::Url::parse(page_url).ok()?;
    page.join(href).ok().map(|url| url.to_string())
}

/// Escapes text for the MarkdownV2 message template.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    'scan: while let Some(ch) = rest.chars().next() {
        for (from, to) in MARKUP_ESCAPES {
            if let Some(tail) = rest.strip_prefix(from) {
                out.push_str(to);
                rest = tail;
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}
