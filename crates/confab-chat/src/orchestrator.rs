//! Conversation orchestrator: owns the canonical conversation list and
//! sequences every workflow against the store and the remote backend.
//!
//! The orchestrator is the only writer to the durable store. After every
//! mutation, success or failure, it upserts the conversation and republishes
//! an immutable snapshot, so the in-memory view and the store never drift
//! apart. A user message is persisted before the remote call is issued;
//! gateway failures surface as a visible assistant message, never as an
//! error to the caller.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use confab_core::events::ChatEvent;
use confab_core::settings::Settings;
use confab_core::types::{ApiConfig, ChatTurn, Conversation, Message, ModelInfo, Role};
use confab_store::ConversationStore;

use crate::attachments::AttachmentInput;
use crate::backend::ChatBackend;
use crate::error::ChatError;

/// Broadcast buffer size for [`ChatEvent`] subscribers.
const EVENT_CAPACITY: usize = 64;

/// An embedding extracted for display. Not persisted anywhere.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingResult {
    pub file_name: String,
    pub vector: Vec<f32>,
}

/// Central coordinator for conversations, settings, store, and backend.
pub struct ChatOrchestrator {
    store: Arc<ConversationStore>,
    backend: Arc<dyn ChatBackend>,
    settings: Mutex<Settings>,
    /// Authoritative in-memory view, sorted by `updated_at` descending.
    conversations: Mutex<Vec<Conversation>>,
    selected: Mutex<Option<Uuid>>,
    /// Per-conversation single-flight locks: sends for one conversation are
    /// serialized, sends for different conversations proceed concurrently.
    flights: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatOrchestrator {
    /// Create an orchestrator. Call [`load`] to hydrate the in-memory list.
    ///
    /// [`load`]: ChatOrchestrator::load
    pub fn new(store: Arc<ConversationStore>, backend: Arc<dyn ChatBackend>, settings: Settings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            backend,
            settings: Mutex::new(settings),
            conversations: Mutex::new(Vec::new()),
            selected: Mutex::new(None),
            flights: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Hydrate the in-memory list from the store.
    ///
    /// The store returns records most-recently-updated first, which is the
    /// in-memory order as well.
    pub fn load(&self) -> Result<(), ChatError> {
        let all = self.store.list_all()?;
        info!(count = all.len(), "Loaded conversations");
        *self.lock_conversations() = all;
        Ok(())
    }

    /// Immutable snapshot of the conversation list, most recent first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock_conversations().clone()
    }

    /// Look up one conversation by id.
    pub fn conversation(&self, id: Uuid) -> Option<Conversation> {
        self.lock_conversations().iter().find(|c| c.id == id).cloned()
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// The currently saved global API configuration, if any.
    pub fn current_config(&self) -> Option<ApiConfig> {
        self.lock_settings().current().cloned()
    }

    /// The currently selected conversation id, if any.
    pub fn selected(&self) -> Option<Uuid> {
        *self.lock_selected()
    }

    // -------------------------------------------------------------------------
    // Workflows
    // -------------------------------------------------------------------------

    /// New-conversation workflow.
    ///
    /// Requires a saved API configuration; errors with
    /// [`ChatError::ConfigRequired`] otherwise so the caller can redirect to
    /// the configuration step without a record being created. The snapshot
    /// of the current configuration is pinned to the conversation for life.
    pub fn new_conversation(&self) -> Result<Conversation, ChatError> {
        let config = self.current_config().ok_or(ChatError::ConfigRequired)?;
        let conversation = Conversation::new(config);

        self.store.upsert(&conversation)?;
        // New conversations are most-recent by construction.
        self.lock_conversations().insert(0, conversation.clone());
        *self.lock_selected() = Some(conversation.id);
        self.publish(ChatEvent::ConversationUpdated {
            id: conversation.id,
        });

        info!(id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    /// Send-message workflow.
    ///
    /// Returns `Ok(None)` when the conversation does not exist (the
    /// operation is a no-op). Storage failures propagate; gateway failures
    /// are absorbed into an assistant message reading `Error: <message>`,
    /// so the caller always receives a settled conversation.
    pub async fn send_message(
        &self,
        id: Uuid,
        text: &str,
        attachments: Vec<AttachmentInput>,
    ) -> Result<Option<Conversation>, ChatError> {
        let flight = self.flight_lock(id);
        let _guard = flight.lock().await;

        let Some(mut conversation) = self.conversation(id) else {
            return Ok(None);
        };

        // All attachments are base64-encoded for storage regardless of type.
        let encoded: Vec<_> = attachments.iter().map(AttachmentInput::encode).collect();
        let user_message = Message::new(Role::User, text).with_attachments(encoded);
        conversation.push_message(user_message);

        // Optimistic persistence: the user's message is durable before the
        // remote call is attempted.
        self.store.upsert(&conversation)?;
        self.republish(conversation.clone());

        let turns = outgoing_turns(&conversation);
        let model = conversation.api_config.model.clone();
        let reply = self
            .backend
            .complete(&conversation.api_config, &model, &turns)
            .await;

        let assistant = match reply {
            Ok(text) => Message::new(Role::Assistant, text),
            Err(e) => {
                warn!(id = %id, error = %e, "Chat completion failed");
                Message::new(Role::Assistant, format!("Error: {}", e))
            }
        };
        conversation.push_message(assistant);

        self.store.upsert(&conversation)?;
        self.republish(conversation.clone());
        Ok(Some(conversation))
    }

    /// Send to the currently selected conversation. No-op without a
    /// selection.
    pub async fn send_to_selected(
        &self,
        text: &str,
        attachments: Vec<AttachmentInput>,
    ) -> Result<Option<Conversation>, ChatError> {
        match self.selected() {
            Some(id) => self.send_message(id, text, attachments).await,
            None => Ok(None),
        }
    }

    /// Extract-embeddings workflow.
    ///
    /// Reads the file's full text and submits it as embedding input using
    /// the current configuration's model. The result is handed back for
    /// display only; nothing is persisted and no conversation is touched.
    /// Failures propagate to the caller.
    pub async fn extract_embedding(&self, path: &Path) -> Result<EmbeddingResult, ChatError> {
        let config = self.current_config().ok_or(ChatError::ConfigRequired)?;
        let input = tokio::fs::read_to_string(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let vector = self.backend.embed(&config, &config.model, &input).await?;
        info!(file = %file_name, dims = vector.len(), "Extracted embedding");
        Ok(EmbeddingResult { file_name, vector })
    }

    /// Delete-conversation workflow.
    ///
    /// The store delete happens before the in-memory removal is published;
    /// the selection is cleared when it pointed at the deleted record.
    pub fn delete_conversation(&self, id: Uuid) -> Result<(), ChatError> {
        self.store.delete(id)?;

        self.lock_conversations().retain(|c| c.id != id);
        {
            let mut selected = self.lock_selected();
            if *selected == Some(id) {
                *selected = None;
            }
        }
        self.lock_flights().remove(&id);

        self.publish(ChatEvent::ConversationDeleted { id });
        info!(id = %id, "Deleted conversation");
        Ok(())
    }

    /// Select a conversation. Returns its snapshot, or `None` (leaving the
    /// selection unchanged) when the id is unknown.
    pub fn select_conversation(&self, id: Uuid) -> Option<Conversation> {
        let conversation = self.conversation(id)?;
        *self.lock_selected() = Some(id);
        Some(conversation)
    }

    /// Save-config workflow: validate, commit to the settings slot, publish.
    ///
    /// Existing conversations keep their pinned configurations.
    pub fn save_config(&self, config: ApiConfig) -> Result<(), ChatError> {
        if config.host.trim().is_empty() {
            return Err(ChatError::InvalidConfig("host must not be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig("model must not be empty".to_string()));
        }

        {
            let mut settings = self.lock_settings();
            settings.set_current(config);
            settings.save()?;
        }
        self.publish(ChatEvent::ConfigSaved);
        Ok(())
    }

    /// List models from the endpoint in the current configuration.
    ///
    /// Zero models means "proceed without validation", not failure.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        let config = self.current_config().ok_or(ChatError::ConfigRequired)?;
        Ok(self.backend.list_models(&config).await?)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Replace (or insert) the conversation in the in-memory list, restore
    /// the ordering contract, and notify subscribers.
    fn republish(&self, updated: Conversation) {
        let id = updated.id;
        {
            let mut conversations = self.lock_conversations();
            match conversations.iter_mut().find(|c| c.id == id) {
                Some(slot) => *slot = updated,
                None => conversations.push(updated),
            }
            conversations.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then(b.created_at.cmp(&a.created_at))
            });
        }
        self.publish(ChatEvent::ConversationUpdated { id });
    }

    fn publish(&self, event: ChatEvent) {
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }

    fn flight_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.lock_flights()
            .entry(id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    // Lock helpers. These mutexes are only ever held for short critical
    // sections on one logical thread, so poisoning means a prior panic;
    // recover the data rather than cascade.

    fn lock_conversations(&self) -> std::sync::MutexGuard<'_, Vec<Conversation>> {
        self.conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_selected(&self) -> std::sync::MutexGuard<'_, Option<Uuid>> {
        self.selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_settings(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_flights(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>> {
        self.flights
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator").finish()
    }
}

/// Build the upstream message window: the last 10 log entries, oldest-first,
/// role/content only, with the text attachments of the just-sent message
/// inlined into its outgoing content. Binary attachments are stored but
/// never inlined.
fn outgoing_turns(conversation: &Conversation) -> Vec<ChatTurn> {
    let mut turns = conversation.history_window();
    if let (Some(last_turn), Some(last_message)) = (turns.last_mut(), conversation.messages.last())
    {
        last_turn.content = inline_text_attachments(last_message);
    }
    turns
}

/// The message content with each text attachment appended as a labeled
/// block.
fn inline_text_attachments(message: &Message) -> String {
    let mut content = message.content.clone();
    for attachment in &message.attachments {
        if !attachment.is_text() {
            continue;
        }
        match attachment.decode_text() {
            Ok(text) => {
                content.push_str(&format!("\n\nFile: {}\n{}", attachment.name, text));
            }
            Err(e) => {
                // The payload stays stored; it just cannot be inlined.
                warn!(name = %attachment.name, error = %e, "Skipping undecodable text attachment");
            }
        }
    }
    content
}
