use std::time::{SystemTime, UNIX_EPOCH};

use crate::collections::{Collection, CollectionId, CollectionItem};
use crate::history::HistoryEntry;

const URL_WIDTH: usize = 48;

pub fn render_history(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "No history".to_string();
    }

    history
        .iter()
        .map(|entry| {
            format!(
                "#{:<4} {:<6} {} ({})",
                entry.id,
                entry.request.method,
                truncate_url(&entry.request.url, URL_WIDTH),
                relative_time(entry.created_at)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_collections(collections: &[Collection], selected: Option<CollectionId>) -> String {
    if collections.is_empty() {
        return "No collections".to_string();
    }

    collections
        .iter()
        .map(|collection| {
            let marker = if selected == Some(collection.id) { '*' } else { ' ' };
            format!("{marker} #{:<4} {}", collection.id, collection.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_items(items: &[CollectionItem]) -> String {
    if items.is_empty() {
        return "No saved requests".to_string();
    }

    items
        .iter()
        .map(|item| {
            format!(
                "#{:<4} {:<6} {}",
                item.id,
                item.request.method,
                truncate_url(&item.request.url, URL_WIDTH)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_url(url: &str, max_chars: usize) -> String {
    if url.chars().count() <= max_chars {
        url.to_string()
    } else {
        let head: String = url.chars().take(max_chars).collect();
        format!("{head}…")
    }
}

/// `created_at` is unix milliseconds.
fn relative_time(created_at: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(created_at);
    let diff = now.saturating_sub(created_at).max(0) / 1000;

    if diff < 60 {
        format!("{diff}s ago")
    } else if diff < 3600 {
        format!("{}m ago", diff / 60)
    } else if diff < 86400 {
        format!("{}h ago", diff / 3600)
    } else {
        format!("{}d ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use crate::http::request::RequestSpec;
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn spec(url: &str) -> RequestSpec {
        RequestSpec {
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            body: Value::Null,
            raw_body: None,
        }
    }

    #[test]
    fn truncates_long_urls_on_char_boundaries() {
        assert_eq!(truncate_url("https://a.com", 20), "https://a.com");
        assert_eq!(truncate_url("https://é.example.com", 9), "https://é…");
    }

    #[test]
    fn relative_time_buckets() {
        let now = crate::history::current_unix_millis();
        assert_eq!(relative_time(now), "0s ago");
        assert_eq!(relative_time(now - 120_000), "2m ago");
        assert_eq!(relative_time(now - 7_200_000), "2h ago");
        assert_eq!(relative_time(now - 172_800_000), "2d ago");
    }

    #[test]
    fn collections_mark_the_selection() {
        let collections = vec![
            Collection { id: 1, name: "Billing".to_string() },
            Collection { id: 2, name: "Users".to_string() },
        ];
        assert_eq!(
            render_collections(&collections, Some(2)),
            "  #1    Billing\n* #2    Users"
        );
    }

    #[test]
    fn empty_lists_have_placeholders() {
        assert_eq!(render_history(&[]), "No history");
        assert_eq!(render_items(&[]), "No saved requests");
    }

    #[test]
    fn items_show_method_and_url() {
        let items = vec![CollectionItem {
            id: 3,
            collection_id: 1,
            request: spec("https://a.com/users"),
        }];
        assert_eq!(render_items(&items), "#3    GET    https://a.com/users");
    }
}
