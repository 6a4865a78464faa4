use crate::collections::{CollectionId, NewCollectionItem};
use crate::history::{HistoryId, NewHistoryEntry};
use crate::http::request::PreparedRequest;

/// Monotonic per-session submission number.
pub type SubmissionId = u64;

/// An effect requested by [`super::Session::update`]. The session never does
/// I/O itself; the runtime performs the command and reports back with a
/// [`super::Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    None,
    Batch(Vec<Command>),
    Send {
        seq: SubmissionId,
        request: PreparedRequest,
    },
    RecordHistory(NewHistoryEntry),
    LoadHistory,
    DeleteHistory(HistoryId),
    ClearHistory,
    LoadCollections,
    CreateCollection(String),
    SaveCollectionItem(NewCollectionItem),
    LoadCollectionItems(CollectionId),
    CopyToClipboard(String),
}

impl Command {
    pub fn batch(commands: impl IntoIterator<Item = Command>) -> Self {
        Command::Batch(commands.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }
}
