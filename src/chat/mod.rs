pub mod advisory;
pub mod export;
pub mod view;

use log::{ info, warn, error };
use std::sync::{ Arc, Weak };
use thiserror::Error;

use crate::config::settings::{ Settings, SettingsError, SettingsRepository };
use crate::history::{ SavedChatStore, StoreError };
use crate::llm::catalog::{
    default_model_for,
    models_or_fallback,
    providers_or_fallback,
    ModelInfo,
    ProviderDirectory,
    ProviderInfo,
    DEFAULT_PROVIDER,
};
use crate::llm::error::ServiceError;
use crate::llm::{
    is_provider_not_configured,
    CompletionReply,
    CompletionRequest,
    CompletionService,
    KeyRegistry,
};
use crate::models::chat::{ to_role_messages, Conversation, Message, Sender };
use self::advisory::Advisory;
use self::export::{ ExportArtifact, ExportFormat };

pub const PROVIDER_NOT_CONFIGURED_GUIDANCE: &str =
    "Error: Provider not configured. Please ensure an API key is set up for the selected provider in the backend.";

pub const REQUEST_ABANDONED_NOTICE: &str = "Request cancelled before a reply arrived.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Advisory(#[from] Advisory),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Provider registration failed: {0}")]
    Registration(#[from] ServiceError),
    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),
}

impl ChatError {
    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            ChatError::Advisory(a) => Some(a),
            _ => None,
        }
    }
}

/// External collaborators the controller talks to.
#[derive(Clone)]
pub struct Services {
    pub completion: Arc<dyn CompletionService>,
    pub directory: Arc<dyn ProviderDirectory>,
    pub keys: Arc<dyn KeyRegistry>,
    pub saved_chats: Arc<dyn SavedChatStore>,
    pub settings: Arc<dyn SettingsRepository>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    AwaitingResponse,
    Succeeded,
    Failed,
}

/// A submitted message whose reply has not been recorded yet. Only the
/// controller creates these; handing one back to [`ChatController::finish`]
/// or [`ChatController::abandon`] closes the request. Dropping it also
/// releases the in-flight guard.
#[derive(Debug)]
pub struct PendingRequest {
    request: CompletionRequest,
    is_retry: bool,
    ticket: Arc<()>,
}

impl PendingRequest {
    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }

    pub fn is_retry(&self) -> bool {
        self.is_retry
    }
}

/// Owns the live conversation and the current selection, and turns user
/// actions into appended messages.
///
/// Sending is split in two so that callers can observe the conversation
/// between submission and reply: [`append_user_message`] records the user
/// message and returns a [`PendingRequest`], [`finish`] records the outcome.
/// [`send`] does both around a call to the completion service.
///
/// [`append_user_message`]: ChatController::append_user_message
/// [`finish`]: ChatController::finish
/// [`send`]: ChatController::send
pub struct ChatController {
    services: Services,
    settings: Settings,
    conversation: Conversation,
    input: String,
    state: RequestState,
    providers: Vec<ProviderInfo>,
    models: Vec<ModelInfo>,
    in_flight: Weak<()>,
}

impl ChatController {
    pub fn new(services: Services) -> Self {
        Self::with_settings(services, Settings::default())
    }

    pub fn with_settings(services: Services, settings: Settings) -> Self {
        Self {
            services,
            settings,
            conversation: Vec::new(),
            input: String::new(),
            state: RequestState::Idle,
            providers: Vec::new(),
            models: Vec::new(),
            in_flight: Weak::new(),
        }
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// A request whose [`PendingRequest`] was dropped without being finished
    /// reads as `Idle`.
    pub fn state(&self) -> RequestState {
        if self.state == RequestState::AwaitingResponse && self.in_flight.strong_count() == 0 {
            return RequestState::Idle;
        }
        self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state() == RequestState::AwaitingResponse
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn providers(&self) -> &[ProviderInfo] {
        &self.providers
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    // --- Settings ---

    /// Applies stored defaults if there are any. Returns whether they were applied.
    pub async fn load_defaults(&mut self) -> Result<bool, ChatError> {
        match self.services.settings.load_defaults().await? {
            Some(settings) => {
                info!("Applying default settings: provider={}, model={}", settings.provider, settings.model);
                self.settings = settings;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn save_defaults(&self) -> Result<(), ChatError> {
        self.services.settings.save_defaults(&self.settings).await?;
        Ok(())
    }

    /// Switching provider clears the model, except that Groq gets its default.
    pub fn select_provider(&mut self, provider_id: &str) {
        let provider_id = provider_id.trim();
        if provider_id == self.settings.provider {
            return;
        }
        self.settings.provider = provider_id.to_string();
        self.settings.model = default_model_for(provider_id).unwrap_or_default().to_string();
        self.models.clear();
    }

    pub fn select_model(&mut self, model_id: &str) {
        self.settings.model = model_id.trim().to_string();
    }

    /// Clamps to `0.0..=2.0`. NaN and infinities are refused.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ChatError> {
        if !temperature.is_finite() {
            return Err(Advisory::InvalidTemperature.into());
        }
        self.settings.temperature = temperature.clamp(0.0, 2.0);
        Ok(())
    }

    pub async fn refresh_providers(&mut self) -> &[ProviderInfo] {
        self.providers = providers_or_fallback(self.services.directory.as_ref()).await;
        if self.settings.provider.is_empty() {
            self.select_provider(DEFAULT_PROVIDER);
        }
        &self.providers
    }

    pub async fn refresh_models(&mut self) -> &[ModelInfo] {
        if self.settings.provider.is_empty() {
            self.models.clear();
            return &self.models;
        }
        let provider = self.settings.provider.clone();
        self.models = models_or_fallback(self.services.directory.as_ref(), &provider).await;
        if self.settings.model.is_empty() {
            if let Some(default) = default_model_for(&provider) {
                self.settings.model = default.to_string();
            }
        }
        &self.models
    }

    pub async fn register_api_key(&self, api_key: &str) -> Result<(), ChatError> {
        if self.settings.provider.trim().is_empty() {
            return Err(Advisory::NoProvider.into());
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Advisory::EmptyApiKey.into());
        }
        self.services.keys.register_provider(&self.settings.provider, api_key).await?;
        Ok(())
    }

    // --- Sending ---

    /// Records `text` as a user message and prepares the completion request.
    ///
    /// Blank text is rejected without effect. Without a provider and model a
    /// system notice is appended instead and nothing is submitted.
    pub fn append_user_message(&mut self, text: &str) -> Result<PendingRequest, ChatError> {
        self.ensure_idle()?;
        if text.trim().is_empty() {
            return Err(Advisory::EmptyInput.into());
        }
        let pending = self.begin(Message::user(text), false)?;
        self.input.clear();
        Ok(pending)
    }

    pub fn submit_input(&mut self) -> Result<PendingRequest, ChatError> {
        let text = self.input.clone();
        self.append_user_message(&text)
    }

    /// Replays the most recent user message as a new, retry-flagged message.
    pub fn begin_retry(&mut self) -> Result<PendingRequest, ChatError> {
        self.ensure_idle()?;
        let text = self.conversation
            .iter()
            .rev()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.text.clone())
            .ok_or(Advisory::NothingToRetry)?;
        let mut message = Message::user(text);
        message.is_retry = true;
        self.begin(message, true)
    }

    fn ensure_idle(&self) -> Result<(), Advisory> {
        if self.is_sending() {
            return Err(Advisory::RequestInFlight);
        }
        Ok(())
    }

    fn begin(&mut self, message: Message, is_retry: bool) -> Result<PendingRequest, ChatError> {
        if !self.settings.has_selection() {
            warn!("Send attempted without provider/model selection");
            self.conversation.push(Message::system(Advisory::MissingSelection.to_string()));
            return Err(Advisory::MissingSelection.into());
        }
        self.conversation.push(message);
        self.state = RequestState::AwaitingResponse;
        let ticket = Arc::new(());
        self.in_flight = Arc::downgrade(&ticket);
        Ok(PendingRequest {
            request: self.build_request(),
            is_retry,
            ticket,
        })
    }

    fn build_request(&self) -> CompletionRequest {
        CompletionRequest {
            provider: self.settings.provider.clone(),
            model: self.settings.model.clone(),
            messages: to_role_messages(&self.conversation),
            options: self.settings.generation_options(),
        }
    }

    /// Records the outcome of a pending request and returns the appended message.
    pub fn finish(
        &mut self,
        pending: PendingRequest,
        outcome: Result<CompletionReply, ServiceError>
    ) -> &Message {
        let mut message = match outcome {
            Ok(CompletionReply::Text(text)) => {
                self.state = RequestState::Succeeded;
                Message::assistant(text)
            }
            Ok(CompletionReply::Error(msg)) => {
                self.state = RequestState::Failed;
                let text = if is_provider_not_configured(&msg) {
                    PROVIDER_NOT_CONFIGURED_GUIDANCE.to_string()
                } else {
                    format!("Error: {}", msg)
                };
                warn!("Completion service error for {}/{}: {}", pending.request.provider, pending.request.model, text);
                Message::assistant(text)
            }
            Err(e) => {
                self.state = RequestState::Failed;
                error!("Completion transport failure: {}", e);
                Message::system(format!("Error sending message: {}", e))
            }
        };
        message.is_retry_response = pending.is_retry;
        self.conversation.push(message);
        &self.conversation[self.conversation.len() - 1]
    }

    /// Gives up on a pending request without a reply and leaves a system
    /// notice behind. A request from another controller is ignored.
    pub fn abandon(&mut self, pending: PendingRequest) {
        if !Weak::ptr_eq(&self.in_flight, &Arc::downgrade(&pending.ticket)) {
            return;
        }
        drop(pending);
        warn!("Abandoned pending completion request");
        self.state = RequestState::Idle;
        self.conversation.push(Message::system(REQUEST_ABANDONED_NOTICE));
    }

    pub async fn request_completion(&mut self, pending: PendingRequest) -> &Message {
        let completion = Arc::clone(&self.services.completion);
        let outcome = completion.complete(&pending.request).await;
        self.finish(pending, outcome)
    }

    pub async fn send(&mut self, text: &str) -> Result<&Message, ChatError> {
        let pending = self.append_user_message(text)?;
        Ok(self.request_completion(pending).await)
    }

    pub async fn send_input(&mut self) -> Result<&Message, ChatError> {
        let pending = self.submit_input()?;
        Ok(self.request_completion(pending).await)
    }

    pub async fn retry_last(&mut self) -> Result<&Message, ChatError> {
        let pending = self.begin_retry()?;
        Ok(self.request_completion(pending).await)
    }

    // --- Conversation management ---

    pub fn new_conversation(&mut self) -> Result<(), ChatError> {
        self.ensure_idle()?;
        self.conversation = Vec::new();
        self.state = RequestState::Idle;
        info!("Started a new conversation");
        Ok(())
    }

    /// Saves a snapshot and returns the name it was saved under, which gets a
    /// ` (n)` suffix when the requested name is taken.
    pub async fn save_conversation(&self, name: &str) -> Result<String, ChatError> {
        let name = chat_name(name);
        if name.is_empty() {
            return Err(Advisory::EmptyName.into());
        }
        let saved_as = self.services.saved_chats.save(name, &self.conversation).await?;
        info!("Saved chat as \"{}\" ({} messages)", saved_as, self.conversation.len());
        Ok(saved_as)
    }

    pub async fn load_conversation(&mut self, name: &str) -> Result<(), ChatError> {
        self.ensure_idle()?;
        let name = chat_name(name);
        if self.services.saved_chats.names().await?.is_empty() {
            return Err(Advisory::NoSavedChats.into());
        }
        let saved = self.services.saved_chats
            .load(name).await?
            .ok_or_else(|| Advisory::ChatNotFound(name.to_string()))?;
        info!("Loaded chat \"{}\" ({} messages)", saved.name, saved.history.len());
        self.conversation = saved.history;
        self.state = RequestState::Idle;
        Ok(())
    }

    pub async fn delete_conversation(&self, name: &str) -> Result<(), ChatError> {
        let name = chat_name(name);
        if self.services.saved_chats.names().await?.is_empty() {
            return Err(Advisory::NoSavedChats.into());
        }
        if !self.services.saved_chats.delete(name).await? {
            return Err(Advisory::ChatNotFound(name.to_string()).into());
        }
        info!("Deleted chat \"{}\"", name);
        Ok(())
    }

    pub async fn saved_chat_names(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.services.saved_chats.names().await?)
    }

    pub fn export_conversation(&self, format: &str) -> Result<ExportArtifact, ChatError> {
        let format: ExportFormat = format.parse()?;
        if self.conversation.is_empty() {
            return Err(Advisory::NothingToExport.into());
        }
        let artifact = export::export(&self.conversation, format)?;
        info!("Exported {} messages as {}", self.conversation.len(), artifact.file_name);
        Ok(artifact)
    }
}

/// Saved chats are keyed by the trimmed name.
fn chat_name(name: &str) -> &str {
    name.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::MemorySettingsRepository;
    use crate::history::MemorySavedChatStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedCompletion {
        replies: Mutex<VecDeque<Result<CompletionReply, ServiceError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        fn reply(self: &Arc<Self>, outcome: Result<CompletionReply, ServiceError>) {
            self.replies.lock().unwrap().push_back(outcome);
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(
            &self,
            request: &CompletionRequest
        ) -> Result<CompletionReply, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CompletionReply::Text("ok".into())))
        }
    }

    struct OfflineDirectory;

    #[async_trait]
    impl ProviderDirectory for OfflineDirectory {
        async fn list_providers(&self) -> Result<Vec<ProviderInfo>, ServiceError> {
            Err(ServiceError::Transport("offline".into()))
        }

        async fn list_models(&self, _provider_id: &str) -> Result<Vec<ModelInfo>, ServiceError> {
            Err(ServiceError::Transport("offline".into()))
        }
    }

    #[derive(Default)]
    struct RecordingKeys {
        registered: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl KeyRegistry for RecordingKeys {
        async fn register_provider(&self, provider_id: &str, api_key: &str) -> Result<(), ServiceError> {
            if api_key == "bad" {
                return Err(ServiceError::Rejected("Invalid API key".into()));
            }
            self.registered.lock().unwrap().push((provider_id.into(), api_key.into()));
            Ok(())
        }
    }

    struct Harness {
        completion: Arc<ScriptedCompletion>,
        keys: Arc<RecordingKeys>,
        settings: Arc<MemorySettingsRepository>,
        controller: ChatController,
    }

    fn harness() -> Harness {
        let completion = Arc::new(ScriptedCompletion::default());
        let keys = Arc::new(RecordingKeys::default());
        let settings = Arc::new(MemorySettingsRepository::default());
        let services = Services {
            completion: completion.clone(),
            directory: Arc::new(OfflineDirectory),
            keys: keys.clone(),
            saved_chats: Arc::new(MemorySavedChatStore::default()),
            settings: settings.clone(),
        };
        Harness {
            completion,
            keys,
            settings,
            controller: ChatController::new(services),
        }
    }

    fn advisory_of<T: std::fmt::Debug>(result: Result<T, ChatError>) -> Advisory {
        match result {
            Err(ChatError::Advisory(a)) => a,
            other => panic!("expected advisory, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn user_message_lands_before_reply() {
        let mut h = harness();
        h.controller.set_input("hello");

        let pending = h.controller.submit_input().unwrap();
        assert_eq!(h.controller.conversation().len(), 1);
        assert_eq!(h.controller.state(), RequestState::AwaitingResponse);
        assert_eq!(h.controller.input(), "");

        h.completion.reply(Ok(CompletionReply::Text("**hi**".into())));
        let reply = h.controller.request_completion(pending).await;
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text, "**hi**");
        assert_eq!(h.controller.conversation().len(), 2);
        assert_eq!(h.controller.state(), RequestState::Succeeded);
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_effect() {
        let mut h = harness();
        let advisory = advisory_of(h.controller.send("   \n\t").await);
        assert_eq!(advisory, Advisory::EmptyInput);
        assert!(h.controller.conversation().is_empty());
        assert_eq!(h.completion.calls(), 0);
    }

    #[tokio::test]
    async fn missing_selection_leaves_system_notice_only() {
        let mut h = harness();
        h.controller.select_provider("openai");
        assert_eq!(h.controller.settings().model, "");
        h.controller.set_input("keep me");

        let advisory = advisory_of(h.controller.send_input().await);
        assert_eq!(advisory, Advisory::MissingSelection);
        assert_eq!(h.controller.conversation().len(), 1);
        assert_eq!(h.controller.conversation()[0].sender, Sender::System);
        assert_eq!(h.controller.input(), "keep me");
        assert_eq!(h.completion.calls(), 0);
        assert_eq!(h.controller.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn conversation_is_mapped_to_roles() {
        let mut h = harness();
        h.completion.reply(Err(ServiceError::Transport("down".into())));
        h.controller.send("first").await.unwrap();
        h.controller.send("second").await.unwrap();

        let roles: Vec<_> = h.completion
            .last_request()
            .messages.iter()
            .map(|m| m.role.clone())
            .collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(h.completion.last_request().provider, "groq");
        assert_eq!(h.completion.last_request().options.persona.as_deref(), Some("Default"));
    }

    #[tokio::test]
    async fn provider_not_configured_gets_guidance() {
        let mut h = harness();
        h.completion.reply(Ok(CompletionReply::Error("Provider not configured".into())));
        let reply = h.controller.send("hi").await.unwrap();
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text, PROVIDER_NOT_CONFIGURED_GUIDANCE);
        assert_eq!(h.controller.state(), RequestState::Failed);
    }

    #[tokio::test]
    async fn other_service_errors_are_prefixed() {
        let mut h = harness();
        h.completion.reply(Ok(CompletionReply::Error("rate limited".into())));
        let reply = h.controller.send("hi").await.unwrap();
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text, "Error: rate limited");
    }

    #[tokio::test]
    async fn transport_failure_becomes_system_message() {
        let mut h = harness();
        h.completion.reply(Err(ServiceError::MalformedResponse("expected value".into())));
        let reply = h.controller.send("hi").await.unwrap();
        assert_eq!(reply.sender, Sender::System);
        assert!(reply.text.starts_with("Error sending message: Failed to parse response"));
    }

    #[tokio::test]
    async fn second_submit_while_awaiting_is_refused() {
        let mut h = harness();
        let pending = h.controller.append_user_message("one").unwrap();

        let advisory = advisory_of(h.controller.append_user_message("two"));
        assert_eq!(advisory, Advisory::RequestInFlight);
        assert_eq!(advisory_of(h.controller.begin_retry()), Advisory::RequestInFlight);
        assert_eq!(advisory_of(h.controller.new_conversation()), Advisory::RequestInFlight);
        assert_eq!(h.controller.conversation().len(), 1);

        h.controller.finish(pending, Ok(CompletionReply::Text("done".into())));
        assert!(h.controller.append_user_message("two").is_ok());
    }

    #[tokio::test]
    async fn retry_without_user_message_is_advisory() {
        let mut h = harness();
        h.controller.select_model("");
        let _ = h.controller.send("ignored").await;
        let before = h.controller.conversation().to_vec();

        assert_eq!(advisory_of(h.controller.retry_last().await), Advisory::NothingToRetry);
        assert_eq!(h.controller.conversation(), before.as_slice());
        assert_eq!(h.completion.calls(), 0);
    }

    #[tokio::test]
    async fn retry_replays_last_user_text_with_current_selection() {
        let mut h = harness();
        h.controller.send("explain lifetimes").await.unwrap();
        h.controller.select_provider("openai");
        h.controller.select_model("gpt-4");

        h.completion.reply(Ok(CompletionReply::Text("second take".into())));
        let reply = h.controller.retry_last().await.unwrap();
        assert!(reply.is_retry_response);

        let convo = h.controller.conversation();
        assert_eq!(convo.len(), 4);
        assert!(convo[2].is_retry);
        assert_eq!(convo[2].text, "explain lifetimes");
        assert_eq!(convo[2].sender, Sender::User);

        let request = h.completion.last_request();
        assert_eq!((request.provider.as_str(), request.model.as_str()), ("openai", "gpt-4"));
        assert_eq!(request.messages.len(), 3);
    }

    #[tokio::test]
    async fn saved_chat_is_independent_of_later_edits() {
        let mut h = harness();
        h.controller.send("remember this").await.unwrap();
        let snapshot = h.controller.conversation().to_vec();

        assert_eq!(h.controller.save_conversation("A").await.unwrap(), "A");
        h.controller.send("more").await.unwrap();
        h.controller.load_conversation("A").await.unwrap();
        assert_eq!(h.controller.conversation(), snapshot.as_slice());
    }

    #[tokio::test]
    async fn duplicate_save_names_are_disambiguated() {
        let mut h = harness();
        h.controller.send("x").await.unwrap();
        assert_eq!(h.controller.save_conversation(" A ").await.unwrap(), "A");
        assert_eq!(h.controller.save_conversation("A").await.unwrap(), "A (2)");
        assert_eq!(h.controller.saved_chat_names().await.unwrap(), vec!["A", "A (2)"]);
    }

    #[tokio::test]
    async fn save_load_delete_advisories() {
        let mut h = harness();
        assert_eq!(advisory_of(h.controller.save_conversation("  ").await), Advisory::EmptyName);
        assert_eq!(advisory_of(h.controller.load_conversation("A").await), Advisory::NoSavedChats);
        assert_eq!(advisory_of(h.controller.delete_conversation("A").await), Advisory::NoSavedChats);

        h.controller.save_conversation("A").await.unwrap();
        assert_eq!(
            advisory_of(h.controller.load_conversation("B").await),
            Advisory::ChatNotFound("B".into())
        );
        assert_eq!(
            advisory_of(h.controller.delete_conversation("B").await),
            Advisory::ChatNotFound("B".into())
        );
        h.controller.delete_conversation("A").await.unwrap();
        assert!(h.controller.saved_chat_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_conversation_clears_history() {
        let mut h = harness();
        h.controller.send("hi").await.unwrap();
        h.controller.new_conversation().unwrap();
        assert!(h.controller.conversation().is_empty());
        assert_eq!(h.controller.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn json_export_round_trips() {
        let mut h = harness();
        h.controller.send("hi").await.unwrap();
        h.controller.retry_last().await.unwrap();

        let artifact = h.controller.export_conversation("json").unwrap();
        let parsed: Vec<Message> = serde_json::from_str(&artifact.contents).unwrap();
        assert_eq!(parsed.as_slice(), h.controller.conversation());
    }

    #[tokio::test]
    async fn unsupported_export_is_advisory() {
        let mut h = harness();
        h.controller.send("hi").await.unwrap();
        let before = h.controller.conversation().to_vec();

        let advisory = advisory_of(h.controller.export_conversation("pdf"));
        assert_eq!(advisory, Advisory::UnsupportedFormat("pdf".into()));
        assert_eq!(h.controller.conversation(), before.as_slice());
    }

    #[tokio::test]
    async fn empty_conversation_has_nothing_to_export() {
        let h = harness();
        assert_eq!(advisory_of(h.controller.export_conversation("txt")), Advisory::NothingToExport);
    }

    #[tokio::test]
    async fn defaults_round_trip_through_repository() {
        let mut h = harness();
        assert!(!h.controller.load_defaults().await.unwrap());

        h.controller.select_provider("anthropic");
        h.controller.select_model("claude-2.0");
        h.controller.set_temperature(5.0).unwrap();
        h.controller.save_defaults().await.unwrap();
        assert_eq!(h.settings.load_defaults().await.unwrap().unwrap().temperature, 2.0);

        let services = Services {
            completion: Arc::new(ScriptedCompletion::default()),
            directory: Arc::new(OfflineDirectory),
            keys: Arc::new(RecordingKeys::default()),
            saved_chats: Arc::new(MemorySavedChatStore::default()),
            settings: h.settings.clone(),
        };
        let mut controller = ChatController::new(services);
        assert!(controller.load_defaults().await.unwrap());
        assert_eq!(controller.settings().provider, "anthropic");
        assert_eq!(controller.settings().model, "claude-2.0");
    }

    #[tokio::test]
    async fn offline_directory_falls_back_and_defaults_groq_model() {
        let mut h = harness();
        h.controller.settings_mut().provider.clear();
        h.controller.settings_mut().model.clear();

        let providers = h.controller.refresh_providers().await.len();
        assert_eq!(providers, 5);
        assert_eq!(h.controller.settings().provider, "groq");
        assert_eq!(h.controller.settings().model, "llama-3.1-8b-instant");

        h.controller.select_provider("deepseek");
        let models: Vec<_> = h.controller
            .refresh_models().await
            .iter()
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(models, vec!["deepseek-chat", "deepseek-coder", "deepseek-llm"]);
        assert_eq!(h.controller.settings().model, "");
    }

    #[tokio::test]
    async fn api_key_registration_is_validated() {
        let mut h = harness();
        assert_eq!(advisory_of(h.controller.register_api_key("  ").await), Advisory::EmptyApiKey);

        h.controller.register_api_key(" sk-123 ").await.unwrap();
        assert_eq!(
            h.keys.registered.lock().unwrap().clone(),
            vec![("groq".to_string(), "sk-123".to_string())]
        );

        let err = h.controller.register_api_key("bad").await.unwrap_err();
        assert!(matches!(err, ChatError::Registration(ServiceError::Rejected(_))));

        h.controller.settings_mut().provider.clear();
        assert_eq!(advisory_of(h.controller.register_api_key("sk").await), Advisory::NoProvider);
    }

    #[tokio::test]
    async fn non_finite_temperature_is_refused() {
        let mut h = harness();
        h.controller.set_temperature(1.2).unwrap();
        assert_eq!(advisory_of(h.controller.set_temperature(f32::NAN)), Advisory::InvalidTemperature);
        assert_eq!(
            advisory_of(h.controller.set_temperature(f32::INFINITY)),
            Advisory::InvalidTemperature
        );
        assert_eq!(h.controller.settings().temperature, 1.2);

        h.controller.send("hi").await.unwrap();
        assert_eq!(h.completion.last_request().options.temperature, 1.2);
        h.controller.save_defaults().await.unwrap();
        assert!(h.controller.load_defaults().await.unwrap());
    }

    #[tokio::test]
    async fn dropped_pending_request_releases_the_guard() {
        let mut h = harness();
        let pending = h.controller.append_user_message("hi").unwrap();
        assert!(h.controller.is_sending());
        drop(pending);

        assert_eq!(h.controller.state(), RequestState::Idle);
        h.controller.new_conversation().unwrap();
        assert!(h.controller.send("again").await.is_ok());
    }

    #[tokio::test]
    async fn abandoned_request_leaves_a_notice() {
        let mut h = harness();
        let pending = h.controller.append_user_message("hi").unwrap();
        h.controller.abandon(pending);

        assert_eq!(h.controller.state(), RequestState::Idle);
        let convo = h.controller.conversation();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[1].sender, Sender::System);
        assert_eq!(convo[1].text, REQUEST_ABANDONED_NOTICE);
        assert_eq!(h.completion.calls(), 0);
    }

    #[tokio::test]
    async fn padded_names_resolve_to_the_saved_chat() {
        let mut h = harness();
        h.controller.send("keep").await.unwrap();
        let snapshot = h.controller.conversation().to_vec();

        assert_eq!(h.controller.save_conversation(" A ").await.unwrap(), "A");
        h.controller.new_conversation().unwrap();
        h.controller.load_conversation(" A ").await.unwrap();
        assert_eq!(h.controller.conversation(), snapshot.as_slice());

        h.controller.delete_conversation("  A").await.unwrap();
        assert!(h.controller.saved_chat_names().await.unwrap().is_empty());
    }
}
