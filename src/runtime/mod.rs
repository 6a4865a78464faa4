//! Executes session commands.
//!
//! Everything runs on one (current-thread) tokio runtime. Each command is
//! spawned as a task that reports back exactly one [`Message`]; nothing is
//! cancelled and nothing times out.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::clipboard::Clipboard;
use crate::error::Result;
use crate::http::client::Transport;
use crate::session::{Command, Message, Session};
use crate::storage::Store;

pub struct Runtime {
    session: Session,
    store: Arc<dyn Store>,
    transport: Transport,
    clipboard: Arc<dyn Clipboard>,
    sender: mpsc::UnboundedSender<Message>,
    receiver: mpsc::UnboundedReceiver<Message>,
    pending: usize,
}

impl Runtime {
    pub fn new(store: Arc<dyn Store>, transport: Transport, clipboard: Arc<dyn Clipboard>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            session: Session::new(),
            store,
            transport,
            clipboard,
            sender,
            receiver,
            pending: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Loads history and collections and waits for both.
    pub async fn boot(&mut self) {
        self.run(Session::boot());
        self.settle().await;
    }

    /// Applies `message` and starts whatever it asks for, without waiting.
    pub fn dispatch(&mut self, message: Message) {
        let command = self.session.update(message);
        self.run(command);
    }

    /// Processes completions until no task is outstanding, including the
    /// follow-up work they trigger (history reloads and the like).
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            let Some(message) = self.receiver.recv().await else {
                break;
            };
            self.pending -= 1;
            self.dispatch(message);
        }
    }

    pub async fn submit(&mut self, message: Message) {
        self.dispatch(message);
        self.settle().await;
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::None => {}
            Command::Batch(commands) => {
                for command in commands {
                    self.run(command);
                }
            }
            Command::CopyToClipboard(text) => self.clipboard.write_text(&text),
            Command::Send { seq, request } => {
                let transport = self.transport.clone();
                self.spawn(async move {
                    let result = transport
                        .execute(&request)
                        .await
                        .map_err(|err| err.to_string());
                    Message::RequestFinished {
                        seq,
                        request: request.spec,
                        result,
                    }
                });
            }
            Command::RecordHistory(entry) => self.spawn_store(
                move |store| store.insert_history(&entry),
                Message::HistoryRecorded,
            ),
            Command::LoadHistory => {
                self.spawn_store(|store| store.list_history(), Message::HistoryLoaded)
            }
            Command::DeleteHistory(id) => {
                self.spawn_store(move |store| store.delete_history(id), Message::HistoryChanged)
            }
            Command::ClearHistory => {
                self.spawn_store(|store| store.clear_history(), Message::HistoryChanged)
            }
            Command::LoadCollections => {
                self.spawn_store(|store| store.list_collections(), Message::CollectionsLoaded)
            }
            Command::CreateCollection(name) => self.spawn_store(
                move |store| store.create_collection(&name),
                Message::CollectionCreated,
            ),
            Command::SaveCollectionItem(item) => self.spawn_store(
                move |store| store.insert_collection_item(&item),
                Message::CollectionItemSaved,
            ),
            Command::LoadCollectionItems(collection_id) => self.spawn_store(
                move |store| store.list_collection_items(collection_id),
                move |result| Message::CollectionItemsLoaded {
                    collection_id,
                    result,
                },
            ),
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Message> + Send + 'static,
    {
        self.pending += 1;
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let message = task.await;
            if sender.send(message).is_err() {
                debug!("runtime dropped before task finished");
            }
        });
    }

    /// Runs a store operation on the blocking pool.
    fn spawn_store<T, Op, Wrap>(&mut self, op: Op, wrap: Wrap)
    where
        T: Send + 'static,
        Op: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
        Wrap: FnOnce(std::result::Result<T, String>) -> Message + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        self.spawn(async move {
            let result = match tokio::task::spawn_blocking(move || op(store.as_ref())).await {
                Ok(result) => result.map_err(|err| err.to_string()),
                Err(err) => Err(format!("store task failed: {err}")),
            };
            wrap(result)
        });
    }
}
