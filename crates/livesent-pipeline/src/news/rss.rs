//! Google News RSS search, used when no Serper key is configured.

use async_trait::async_trait;
use livesent_core::Article;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::NewsSource;
use crate::error::PipelineError;
use crate::inference::http_client;

const DEFAULT_BASE_URL: &str = "https://news.google.com";

pub struct GoogleNewsRss {
    client: reqwest::Client,
    base_url: String,
    max_items: usize,
}

impl GoogleNewsRss {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn new(max_items: usize, timeout_secs: u64) -> Result<Self, PipelineError> {
        Self::with_base_url(max_items, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn with_base_url(
        max_items: usize,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_items,
        })
    }
}

#[async_trait]
impl NewsSource for GoogleNewsRss {
    fn name(&self) -> &'static str {
        "google_news_rss"
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] on network failure,
    /// [`PipelineError::News`] on a non-2xx status or
    /// [`PipelineError::Xml`] on malformed RSS.
    async fn fetch_news(&self, query: &str) -> Result<Vec<Article>, PipelineError> {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
        let url = format!(
            "{}/rss/search?q={encoded}&hl=en-US&gl=US&ceid=US:en",
            self.base_url
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PipelineError::News(format!(
                "Google News RSS returned status {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        let articles = parse_rss_feed(&body, self.max_items)?;
        tracing::debug!(query, count = articles.len(), "fetched Google News RSS");
        Ok(articles)
    }
}

/// Parse an RSS XML feed into [`Article`]s.
///
/// Extracts `<title>`, `<link>`, `<description>`, `<pubDate>` and `<source>`
/// from each `<item>`. Descriptions are stripped of HTML. Items without a
/// title are skipped; parsing stops after `max_items` articles.
///
/// # Errors
///
/// Returns [`PipelineError::Xml`] if the XML is malformed.
pub fn parse_rss_feed(xml: &str, max_items: usize) -> Result<Vec<Article>, PipelineError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut articles = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut description = String::new();
    let mut date = String::new();
    let mut source = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .unwrap_or("")
                    .to_string();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    description.clear();
                    date.clear();
                    source.clear();
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                let raw = e.name();
                let name = std::str::from_utf8(raw.as_ref()).unwrap_or("");
                if name == "item" && in_item {
                    in_item = false;
                    let trimmed = title.trim();
                    if !trimmed.is_empty() {
                        articles.push(Article {
                            title: trimmed.to_string(),
                            snippet: strip_html(&description),
                            link: link.trim().to_string(),
                            source: non_empty(&source),
                            date: non_empty(&date),
                        });
                        if articles.len() >= max_items {
                            break;
                        }
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    append_field(
                        &current_tag,
                        &text,
                        &mut title,
                        &mut link,
                        &mut description,
                        &mut date,
                        &mut source,
                    );
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    append_field(
                        &current_tag,
                        &text,
                        &mut title,
                        &mut link,
                        &mut description,
                        &mut date,
                        &mut source,
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PipelineError::Xml(e)),
            _ => {}
        }
    }

    Ok(articles)
}

fn append_field(
    tag: &str,
    text: &str,
    title: &mut String,
    link: &mut String,
    description: &mut String,
    date: &mut String,
    source: &mut String,
) {
    let target = match tag {
        "title" => title,
        "link" => link,
        "description" => description,
        "pubDate" => date,
        "source" => source,
        _ => return,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Strip HTML tags from a string and normalize whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>"Nairobi" - Google News</title>
  <item>
    <title>Matatu strike paralyses Nairobi - Daily Nation</title>
    <link>https://news.example.com/strike</link>
    <pubDate>Wed, 11 Jun 2025 08:00:00 GMT</pubDate>
    <description>&lt;a href="https://news.example.com/strike"&gt;Matatu strike&lt;/a&gt;&amp;nbsp;&lt;font&gt;Daily Nation&lt;/font&gt;</description>
    <source url="https://nation.africa">Daily Nation</source>
  </item>
  <item>
    <title></title>
    <link>https://news.example.com/empty</link>
  </item>
  <item>
    <title><![CDATA[Nairobi marathon draws record crowd]]></title>
    <link>https://news.example.com/marathon</link>
    <description><![CDATA[<p>Runners from <b>40</b> countries</p>]]></description>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_skips_untitled_ones() {
        let articles = parse_rss_feed(FEED, 10).unwrap();
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].title, "Matatu strike paralyses Nairobi - Daily Nation");
        assert_eq!(articles[0].link, "https://news.example.com/strike");
        assert_eq!(articles[0].source.as_deref(), Some("Daily Nation"));
        assert_eq!(
            articles[0].date.as_deref(),
            Some("Wed, 11 Jun 2025 08:00:00 GMT")
        );
        assert!(articles[0].snippet.starts_with("Matatu strike"));
        assert!(!articles[0].snippet.contains('<'));

        assert_eq!(articles[1].title, "Nairobi marathon draws record crowd");
        assert_eq!(articles[1].snippet, "Runners from 40 countries");
        assert!(articles[1].source.is_none());
    }

    #[test]
    fn stops_after_max_items() {
        let articles = parse_rss_feed(FEED, 1).unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn channel_title_is_not_an_article() {
        let articles = parse_rss_feed(FEED, 10).unwrap();
        assert!(articles.iter().all(|a| !a.title.contains("Google News")));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let result = parse_rss_feed("<rss><channel><item><title>x</item></rss>", 5);
        assert!(matches!(result, Err(PipelineError::Xml(_))));
    }

    #[test]
    fn strip_html_removes_tags_and_collapses_whitespace() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>\n  again"), "Hello world again");
        assert_eq!(strip_html("plain"), "plain");
    }
}
