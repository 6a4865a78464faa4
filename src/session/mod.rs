//! The client session: form state, the displayed response and the synced
//! history/collection lists, driven by [`Message`]s.

mod command;

use tracing::{debug, warn};

use crate::clipboard::{curl_command, response_json};
use crate::collections::{
    Collection, CollectionId, CollectionItem, CollectionItemId, NewCollectionItem, normalize_name,
};
use crate::history::{HistoryEntry, HistoryId, NewHistoryEntry};
use crate::http::method::HttpMethod;
use crate::http::request::{RequestInput, RequestSpec};
use crate::http::response::ResponseResult;

pub use command::{Command, SubmissionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sending,
}

#[derive(Debug, Clone)]
pub enum Message {
    SidebarTogglePressed,
    MethodSelected(HttpMethod),
    UrlChanged(String),
    HeadersEdited(String),
    BodyEdited(String),
    SendPressed,
    RequestFinished {
        seq: SubmissionId,
        request: RequestSpec,
        result: Result<ResponseResult, String>,
    },
    HistoryRecorded(Result<HistoryEntry, String>),
    HistoryLoaded(Result<Vec<HistoryEntry>, String>),
    HistoryEntrySelected(HistoryId),
    HistoryEntryDeletePressed(HistoryId),
    HistoryClearPressed,
    HistoryChanged(Result<(), String>),
    CollectionsLoaded(Result<Vec<Collection>, String>),
    CollectionNameChanged(String),
    CreateCollectionPressed,
    CollectionCreated(Result<Collection, String>),
    CollectionSelected(CollectionId),
    SaveToCollectionPressed,
    CollectionItemSaved(Result<CollectionItem, String>),
    CollectionItemsLoaded {
        collection_id: CollectionId,
        result: Result<Vec<CollectionItem>, String>,
    },
    CollectionItemSelected(CollectionItemId),
    CopyJsonPressed,
    CopyCurlPressed,
}

#[derive(Debug, Default)]
pub struct Session {
    sidebar_open: bool,
    form: RequestInput,
    response: Option<ResponseResult>,
    notice: Option<String>,
    history: Vec<HistoryEntry>,
    collections: Vec<Collection>,
    collection_items: Vec<CollectionItem>,
    selected_collection: Option<CollectionId>,
    new_collection_name: String,
    last_submitted: SubmissionId,
    in_flight: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial loads of the history and collection lists.
    pub fn boot() -> Command {
        Command::batch([Command::LoadHistory, Command::LoadCollections])
    }

    pub fn form(&self) -> &RequestInput {
        &self.form
    }

    pub fn response(&self) -> Option<&ResponseResult> {
        self.response.as_ref()
    }

    /// Last store or validation problem outside the response panel.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// True when the displayed response is a failure or a notice is pending.
    pub fn has_failed(&self) -> bool {
        self.notice.is_some() || self.response.as_ref().is_some_and(ResponseResult::is_failure)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection_items(&self) -> &[CollectionItem] {
        &self.collection_items
    }

    pub fn selected_collection(&self) -> Option<CollectionId> {
        self.selected_collection
    }

    pub fn new_collection_name(&self) -> &str {
        &self.new_collection_name
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight > 0 {
            Phase::Sending
        } else {
            Phase::Idle
        }
    }

    pub fn update(&mut self, message: Message) -> Command {
        match message {
            Message::SidebarTogglePressed => {
                self.sidebar_open = !self.sidebar_open;
                Command::None
            }
            Message::MethodSelected(method) => {
                self.form.method = method;
                Command::None
            }
            Message::UrlChanged(url) => {
                self.form.url = url;
                Command::None
            }
            Message::HeadersEdited(headers) => {
                self.form.headers = headers;
                Command::None
            }
            Message::BodyEdited(body) => {
                self.form.body = body;
                Command::None
            }
            Message::SendPressed => {
                self.notice = None;
                // Every press gets a number, so a slower earlier submission
                // can never overwrite what this one displays.
                self.last_submitted += 1;
                let seq = self.last_submitted;

                match self.form.prepare() {
                    Ok(request) => {
                        self.in_flight += 1;
                        debug!(seq, method = %request.spec.method, url = %request.spec.url, "sending");
                        Command::Send { seq, request }
                    }
                    Err(err) => {
                        self.response = Some(ResponseResult::failure(err.to_string()));
                        Command::None
                    }
                }
            }
            Message::RequestFinished {
                seq,
                request,
                result,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let is_latest = seq == self.last_submitted;
                if !is_latest {
                    debug!(seq, latest = self.last_submitted, "ignoring stale response");
                }

                match result {
                    Ok(response) => {
                        let entry = NewHistoryEntry::new(request, response.body.clone());
                        if is_latest {
                            self.response = Some(response);
                        }
                        Command::RecordHistory(entry)
                    }
                    Err(message) => {
                        if is_latest {
                            self.response = Some(ResponseResult::failure(message));
                        }
                        Command::None
                    }
                }
            }
            Message::HistoryRecorded(result) => match result {
                Ok(_) => Command::LoadHistory,
                Err(err) => {
                    self.store_failed("save history", err);
                    Command::None
                }
            },
            Message::HistoryLoaded(result) => {
                match result {
                    Ok(history) => self.history = history,
                    Err(err) => self.store_failed("load history", err),
                }
                Command::None
            }
            Message::HistoryEntrySelected(id) => {
                if let Some(entry) = self.history.iter().find(|entry| entry.id == id) {
                    self.form = RequestInput::from(&entry.request);
                    self.sidebar_open = false;
                }
                Command::None
            }
            Message::HistoryEntryDeletePressed(id) => Command::DeleteHistory(id),
            Message::HistoryClearPressed => Command::ClearHistory,
            Message::HistoryChanged(result) => {
                if let Err(err) = result {
                    self.store_failed("update history", err);
                }
                Command::LoadHistory
            }
            Message::CollectionsLoaded(result) => {
                match result {
                    Ok(collections) => self.collections = collections,
                    Err(err) => self.store_failed("load collections", err),
                }
                Command::None
            }
            Message::CollectionNameChanged(name) => {
                self.new_collection_name = name;
                Command::None
            }
            Message::CreateCollectionPressed => match normalize_name(&self.new_collection_name) {
                Some(name) => {
                    self.notice = None;
                    Command::CreateCollection(name)
                }
                None => Command::None,
            },
            Message::CollectionCreated(result) => match result {
                Ok(_) => {
                    self.new_collection_name.clear();
                    Command::LoadCollections
                }
                Err(err) => {
                    self.store_failed("create collection", err);
                    Command::None
                }
            },
            Message::CollectionSelected(id) => {
                self.selected_collection = Some(id);
                self.collection_items.clear();
                Command::LoadCollectionItems(id)
            }
            Message::SaveToCollectionPressed => {
                let Some(collection_id) = self.selected_collection else {
                    return Command::None;
                };

                match self.form.snapshot() {
                    Ok(request) => {
                        self.notice = None;
                        Command::SaveCollectionItem(NewCollectionItem {
                            collection_id,
                            request,
                        })
                    }
                    Err(err) => {
                        self.notice = Some(format!("Cannot save request: {err}"));
                        Command::None
                    }
                }
            }
            Message::CollectionItemSaved(result) => match result {
                Ok(item) if self.selected_collection == Some(item.collection_id) => {
                    Command::LoadCollectionItems(item.collection_id)
                }
                Ok(_) => Command::None,
                Err(err) => {
                    self.store_failed("save request", err);
                    Command::None
                }
            },
            Message::CollectionItemsLoaded {
                collection_id,
                result,
            } => {
                if self.selected_collection != Some(collection_id) {
                    return Command::None;
                }
                match result {
                    Ok(items) => self.collection_items = items,
                    Err(err) => self.store_failed("load collection items", err),
                }
                Command::None
            }
            Message::CollectionItemSelected(id) => {
                if let Some(item) = self.collection_items.iter().find(|item| item.id == id) {
                    self.form = RequestInput::from(&item.request);
                    self.sidebar_open = false;
                }
                Command::None
            }
            Message::CopyJsonPressed => self
                .response
                .as_ref()
                .and_then(response_json)
                .map(Command::CopyToClipboard)
                .unwrap_or(Command::None),
            Message::CopyCurlPressed => Command::CopyToClipboard(curl_command(&self.form)),
        }
    }

    fn store_failed(&mut self, action: &str, err: String) {
        warn!("failed to {action}: {err}");
        self.notice = Some(format!("Failed to {action}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    fn ok_response(body: serde_json::Value) -> ResponseResult {
        ResponseResult::completed(200, HashMap::new(), body, Duration::from_millis(5))
    }

    fn fill(session: &mut Session, method: HttpMethod, url: &str, headers: &str, body: &str) {
        session.update(Message::MethodSelected(method));
        session.update(Message::UrlChanged(url.to_string()));
        session.update(Message::HeadersEdited(headers.to_string()));
        session.update(Message::BodyEdited(body.to_string()));
    }

    fn send(session: &mut Session) -> (SubmissionId, RequestSpec) {
        match session.update(Message::SendPressed) {
            Command::Send { seq, request } => (seq, request.spec),
            other => panic!("expected a send command, got {other:?}"),
        }
    }

    fn history_entry(id: HistoryId, url: &str, body: serde_json::Value) -> HistoryEntry {
        HistoryEntry {
            id,
            request: RequestSpec {
                url: url.to_string(),
                method: HttpMethod::Put,
                headers: BTreeMap::from([("X-Id".to_string(), "1".to_string())]),
                body,
                raw_body: None,
            },
            response: json!("ok"),
            created_at: 1,
        }
    }

    #[test]
    fn boot_loads_both_lists() {
        assert_eq!(
            Session::boot(),
            Command::Batch(vec![Command::LoadHistory, Command::LoadCollections])
        );
    }

    #[test]
    fn send_moves_to_sending_and_back() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Post, "https://example.com/echo", "{}", "{\"a\":1}");

        let (seq, request) = send(&mut session);
        assert_eq!(session.phase(), Phase::Sending);

        let command = session.update(Message::RequestFinished {
            seq,
            request: request.clone(),
            result: Ok(ok_response(json!({"a": 1}))),
        });

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.response().unwrap().body, json!({"a": 1}));
        match command {
            Command::RecordHistory(entry) => {
                assert_eq!(entry.request, request);
                assert_eq!(entry.response, json!({"a": 1}));
            }
            other => panic!("expected history to be recorded, got {other:?}"),
        }
        assert_eq!(session.form().body, "{\"a\":1}");
    }

    #[test]
    fn malformed_headers_fail_without_sending() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Get, "https://example.com", "{bad json", "");

        let command = session.update(Message::SendPressed);
        assert!(command.is_none());
        assert_eq!(session.phase(), Phase::Idle);

        let response = session.response().unwrap();
        assert!(response.error.as_deref().is_some_and(|error| !error.is_empty()));
        assert_eq!(session.form().headers, "{bad json");
    }

    #[test]
    fn network_failure_shows_error_and_records_nothing() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Get, "https://example.com", "", "");
        let (seq, request) = send(&mut session);

        let command = session.update(Message::RequestFinished {
            seq,
            request,
            result: Err("Request failed: connection refused".to_string()),
        });

        assert!(command.is_none());
        assert_eq!(
            session.response().unwrap().error.as_deref(),
            Some("Request failed: connection refused")
        );
    }

    #[test]
    fn stale_results_do_not_replace_the_latest() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Get, "https://example.com/slow", "", "");
        let (first, first_request) = send(&mut session);
        session.update(Message::UrlChanged("https://example.com/fast".to_string()));
        let (second, second_request) = send(&mut session);

        session.update(Message::RequestFinished {
            seq: second,
            request: second_request,
            result: Ok(ok_response(json!("fast"))),
        });
        assert_eq!(session.phase(), Phase::Sending);

        let command = session.update(Message::RequestFinished {
            seq: first,
            request: first_request,
            result: Ok(ok_response(json!("slow"))),
        });

        assert_eq!(session.response().unwrap().body, json!("fast"));
        assert!(matches!(command, Command::RecordHistory(_)));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn parse_failure_outranks_an_earlier_submission() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Get, "https://example.com", "", "");
        let (seq, request) = send(&mut session);

        session.update(Message::HeadersEdited("{bad".to_string()));
        session.update(Message::SendPressed);
        session.update(Message::RequestFinished {
            seq,
            request,
            result: Ok(ok_response(json!("late"))),
        });

        assert!(session.response().unwrap().is_failure());
    }

    #[test]
    fn history_recorded_triggers_reload() {
        let mut session = Session::new();
        let entry = history_entry(1, "https://example.com", json!(null));
        assert_eq!(
            session.update(Message::HistoryRecorded(Ok(entry.clone()))),
            Command::LoadHistory
        );

        session.update(Message::HistoryLoaded(Ok(vec![entry])));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn store_failures_become_notices() {
        let mut session = Session::new();
        let command = session.update(Message::HistoryRecorded(Err("disk full".to_string())));
        assert!(command.is_none());
        assert_eq!(session.notice(), Some("Failed to save history: disk full"));
        assert!(session.has_failed());
    }

    #[test]
    fn successful_send_with_saved_history_has_not_failed() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Get, "https://example.com", "", "");
        let (seq, request) = send(&mut session);
        session.update(Message::RequestFinished {
            seq,
            request,
            result: Ok(ok_response(json!("pong"))),
        });
        assert!(!session.has_failed());

        session.update(Message::HistoryRecorded(Err("disk full".to_string())));
        assert!(session.has_failed());

        // A new submission starts clean.
        session.update(Message::SendPressed);
        assert!(!session.has_failed());
    }

    #[test]
    fn selecting_history_repopulates_the_form() {
        let mut session = Session::new();
        session.update(Message::SidebarTogglePressed);
        let mut raw = history_entry(2, "https://b.com", json!("raw text"));
        raw.request.raw_body = Some("raw text".to_string());
        session.update(Message::HistoryLoaded(Ok(vec![
            history_entry(1, "https://a.com", json!({"a": 1})),
            raw,
            history_entry(3, "https://c.com", json!("quoted")),
        ])));

        session.update(Message::HistoryEntrySelected(2));
        assert_eq!(session.form().url, "https://b.com");
        assert_eq!(session.form().method, HttpMethod::Put);
        assert_eq!(session.form().body, "raw text");
        assert_eq!(session.form().headers, "{\n  \"X-Id\": \"1\"\n}");
        assert!(!session.sidebar_open());

        session.update(Message::HistoryEntrySelected(1));
        assert_eq!(session.form().body, "{\n  \"a\": 1\n}");

        session.update(Message::HistoryEntrySelected(3));
        assert_eq!(session.form().body, "\"quoted\"");
    }

    #[test]
    fn delete_and_clear_relist_afterwards() {
        let mut session = Session::new();
        assert_eq!(
            session.update(Message::HistoryEntryDeletePressed(4)),
            Command::DeleteHistory(4)
        );
        assert_eq!(session.update(Message::HistoryClearPressed), Command::ClearHistory);
        assert_eq!(
            session.update(Message::HistoryChanged(Ok(()))),
            Command::LoadHistory
        );
    }

    #[test]
    fn blank_collection_names_are_ignored() {
        let mut session = Session::new();
        session.update(Message::CollectionNameChanged("   ".to_string()));
        assert!(session.update(Message::CreateCollectionPressed).is_none());

        session.update(Message::CollectionNameChanged(" Billing ".to_string()));
        assert_eq!(
            session.update(Message::CreateCollectionPressed),
            Command::CreateCollection("Billing".to_string())
        );

        let command = session.update(Message::CollectionCreated(Ok(Collection {
            id: 1,
            name: "Billing".to_string(),
        })));
        assert_eq!(command, Command::LoadCollections);
        assert_eq!(session.new_collection_name(), "");
    }

    #[test]
    fn saving_requires_a_selected_collection() {
        let mut session = Session::new();
        fill(&mut session, HttpMethod::Get, "https://example.com", "", "");
        assert!(session.update(Message::SaveToCollectionPressed).is_none());
    }

    #[test]
    fn saving_snapshots_the_form() {
        let mut session = Session::new();
        assert_eq!(
            session.update(Message::CollectionSelected(9)),
            Command::LoadCollectionItems(9)
        );
        fill(&mut session, HttpMethod::Post, "https://example.com", "{\"X-Id\": \"1\"}", "not json");

        let command = session.update(Message::SaveToCollectionPressed);
        session.update(Message::UrlChanged("https://changed.example.com".to_string()));

        match command {
            Command::SaveCollectionItem(item) => {
                assert_eq!(item.collection_id, 9);
                assert_eq!(item.request.url, "https://example.com");
                assert_eq!(item.request.body, json!("not json"));
                assert_eq!(item.request.raw_body.as_deref(), Some("not json"));
                assert_eq!(item.request.headers["X-Id"], "1");
            }
            other => panic!("expected a save command, got {other:?}"),
        }
    }

    #[test]
    fn saving_with_malformed_headers_surfaces_a_notice() {
        let mut session = Session::new();
        session.update(Message::CollectionSelected(1));
        fill(&mut session, HttpMethod::Get, "https://example.com", "{bad", "");

        assert!(session.update(Message::SaveToCollectionPressed).is_none());
        assert!(session.notice().unwrap().starts_with("Cannot save request:"));
    }

    #[test]
    fn items_for_another_collection_are_ignored() {
        let mut session = Session::new();
        session.update(Message::CollectionSelected(1));
        session.update(Message::CollectionItemsLoaded {
            collection_id: 2,
            result: Ok(vec![CollectionItem {
                id: 1,
                collection_id: 2,
                request: history_entry(1, "https://a.com", json!(null)).request,
            }]),
        });
        assert!(session.collection_items().is_empty());
    }

    #[test]
    fn selecting_an_item_loads_it() {
        let mut session = Session::new();
        session.update(Message::CollectionSelected(2));
        session.update(Message::CollectionItemsLoaded {
            collection_id: 2,
            result: Ok(vec![CollectionItem {
                id: 5,
                collection_id: 2,
                request: history_entry(1, "https://saved.example.com", json!(null)).request,
            }]),
        });

        session.update(Message::CollectionItemSelected(5));
        assert_eq!(session.form().url, "https://saved.example.com");
        assert_eq!(session.form().body, "{}");
    }

    #[test]
    fn copy_commands_derive_text() {
        let mut session = Session::new();
        assert!(session.update(Message::CopyJsonPressed).is_none());

        fill(&mut session, HttpMethod::Get, "https://example.com", "", "");
        assert_eq!(
            session.update(Message::CopyCurlPressed),
            Command::CopyToClipboard("curl -X GET \"https://example.com\"".to_string())
        );

        let (seq, request) = send(&mut session);
        session.update(Message::RequestFinished {
            seq,
            request,
            result: Ok(ok_response(json!({"a": 1}))),
        });
        assert_eq!(
            session.update(Message::CopyJsonPressed),
            Command::CopyToClipboard("{\n  \"a\": 1\n}".to_string())
        );
    }
}
