use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A market news article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub headline: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Publisher, e.g. "Reuters"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Tickers the article is tagged with
    #[serde(default)]
    pub symbols: Vec<String>,
    pub source: String,
}

/// Newest articles first, de-duplicated by URL, at most `limit`.
pub(crate) fn latest_unique(mut articles: Vec<NewsArticle>, limit: usize) -> Vec<NewsArticle> {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    let mut seen = std::collections::HashSet::new();
    articles.retain(|a| seen.insert(a.url.clone()));
    articles.truncate(limit);
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(url: &str, hour: u32) -> NewsArticle {
        NewsArticle {
            headline: format!("headline {}", url),
            url: url.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            summary: None,
            publisher: None,
            image_url: None,
            symbols: vec![],
            source: "TEST".to_string(),
        }
    }

    #[test]
    fn test_latest_unique() {
        let articles = vec![
            article("a", 1),
            article("b", 5),
            article("a", 3),
            article("c", 4),
        ];

        let result = latest_unique(articles, 2);
        let urls: Vec<_> = result.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "c"]);
    }
}
