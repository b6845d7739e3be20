// TestDependencies - in-memory implementations for testing
//
// Provides store, webhook and auth mocks that can be injected into ServerDeps
// for tests. Nothing here talks to Postgres, Supabase or n8n.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use supabase_client::{Session, SignUpResponse, SupabaseError, User};

use super::{
    BaseActivityLog, BaseAuthService, BaseChatStore, BaseChatWebhook, BaseLawStore,
    BaseUserDirectory, ServerDeps, WebhookReply, WebhookRequest,
};
use crate::common::{LawId, MessageId, SessionId, UserId};
use crate::domains::activity::{NewSuspiciousActivity, NewUserActivity};
use crate::domains::auth::{AuthUser, BannedUser, Profile, Role};
use crate::domains::chat::models::{ChatMessage, ChatSession, NewChatMessage, NewQueryLog};
use crate::domains::laws::models::{Law, LawFilter, LawPage, LawSummary, NewLaw};

/// Upload limit used unless a test overrides it
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024 * 1024;

// =============================================================================
// In-memory Store
// =============================================================================

#[derive(Default)]
struct StoreState {
    laws: Vec<Law>,
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
    query_logs: Vec<NewQueryLog>,
    profiles: Vec<Profile>,
    bans: Vec<BannedUser>,
    activities: Vec<NewUserActivity>,
    suspicious: Vec<NewSuspiciousActivity>,
    search_calls: Vec<Vec<String>>,
}

/// Every table the server touches, kept in vectors.
///
/// Timestamps advance by one millisecond per insert so ordering is
/// deterministic.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    clock: Mutex<DateTime<Utc>>,
    fail_logging: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock: Mutex::new(Utc::now()),
            fail_logging: false,
        }
    }

    /// Make query-log and activity writes fail
    pub fn failing_logs(mut self) -> Self {
        self.fail_logging = true;
        self
    }

    fn tick(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::milliseconds(1);
        *clock
    }

    pub fn insert_law(&self, law: NewLaw) -> Law {
        let created = Law {
            id: LawId::new(),
            title: law.title,
            so_hieu: law.so_hieu,
            document_type: law.document_type,
            issuing_body: law.issuing_body,
            issued_date: law.issued_date,
            effective_date: law.effective_date,
            signer: law.signer,
            content: Some(law.content),
            file_name: law.file_name,
            status: "active".to_string(),
            created_by: law.created_by,
            created_at: self.tick(),
        };
        self.state.lock().unwrap().laws.push(created.clone());
        created
    }

    /// Seed a law with just a title, number and text
    pub fn seed_law(&self, title: &str, so_hieu: Option<&str>, content: &str) -> Law {
        self.insert_law(NewLaw {
            title: title.to_string(),
            so_hieu: so_hieu.map(String::from),
            document_type: None,
            issuing_body: None,
            issued_date: None,
            effective_date: None,
            signer: None,
            content: content.to_string(),
            file_name: None,
            created_by: None,
        })
    }

    pub fn add_profile(&self, user_id: UserId, role: Role) {
        let profile = Profile {
            id: user_id,
            email: None,
            full_name: None,
            role: role.to_string(),
            created_at: self.tick(),
        };
        self.state.lock().unwrap().profiles.push(profile);
    }

    pub fn ban(&self, user_id: UserId, banned_until: Option<DateTime<Utc>>) {
        let ban = BannedUser {
            user_id,
            reason: Some("test".to_string()),
            banned_until,
            created_at: self.tick(),
        };
        self.state.lock().unwrap().bans.push(ban);
    }

    pub fn laws(&self) -> Vec<Law> {
        self.state.lock().unwrap().laws.clone()
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn query_logs(&self) -> Vec<NewQueryLog> {
        self.state.lock().unwrap().query_logs.clone()
    }

    pub fn activities(&self) -> Vec<NewUserActivity> {
        self.state.lock().unwrap().activities.clone()
    }

    pub fn suspicious(&self) -> Vec<NewSuspiciousActivity> {
        self.state.lock().unwrap().suspicious.clone()
    }

    /// Pattern lists passed to `search_candidates`
    pub fn search_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().search_calls.clone()
    }

    /// True when nothing was written to any log or chat table
    pub fn has_no_side_effects(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.query_logs.is_empty()
            && state.activities.is_empty()
            && state.suspicious.is_empty()
            && state.messages.is_empty()
            && state.search_calls.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive emulation of `ILIKE '%term%'`
fn ilike_matches(pattern: &str, haystack: &str) -> bool {
    let inner = pattern
        .strip_prefix('%')
        .and_then(|p| p.strip_suffix('%'))
        .unwrap_or(pattern);

    let mut term = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                term.push(escaped);
            }
        } else {
            term.push(c);
        }
    }
    haystack.to_lowercase().contains(&term.to_lowercase())
}

#[async_trait]
impl BaseLawStore for InMemoryStore {
    async fn search_candidates(&self, patterns: &[String], limit: i64) -> Result<Vec<Law>> {
        let mut state = self.state.lock().unwrap();
        state.search_calls.push(patterns.to_vec());

        let matches = state
            .laws
            .iter()
            .filter(|law| {
                patterns.iter().any(|p| {
                    ilike_matches(p, &law.title)
                        || law.content.as_deref().is_some_and(|c| ilike_matches(p, c))
                })
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn find_by_id(&self, id: LawId) -> Result<Option<Law>> {
        let state = self.state.lock().unwrap();
        Ok(state.laws.iter().find(|law| law.id == id).cloned())
    }

    async fn create(&self, law: NewLaw) -> Result<Law> {
        Ok(self.insert_law(law))
    }

    async fn list(&self, filter: &LawFilter) -> Result<LawPage> {
        let state = self.state.lock().unwrap();
        let term = filter.search_term().map(str::to_lowercase);

        let mut matching: Vec<&Law> = state
            .laws
            .iter()
            .filter(|law| match &term {
                None => true,
                Some(term) => {
                    law.title.to_lowercase().contains(term)
                        || law
                            .so_hieu
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(term))
                }
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let items = matching
            .iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .map(|law| LawSummary::from(*law))
            .collect();

        Ok(LawPage {
            items,
            total: matching.len() as i64,
            page: filter.page(),
            limit: filter.limit(),
        })
    }

    async fn delete(&self, id: LawId) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.laws.len();
        state.laws.retain(|law| law.id != id);
        Ok(state.laws.len() != before)
    }
}

#[async_trait]
impl BaseChatStore for InMemoryStore {
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>> {
        let state = self.state.lock().unwrap();
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn create_session(&self, user_id: UserId, title: &str) -> Result<ChatSession> {
        let now = self.tick();
        let session = ChatSession {
            id: SessionId::new(),
            user_id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn rename_session(&self, id: SessionId, title: &str) -> Result<Option<ChatSession>> {
        let now = self.tick();
        let mut state = self.state.lock().unwrap();
        let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        session.title = title.to_string();
        session.updated_at = now;
        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, id: SessionId) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != id);
        let deleted = state.sessions.len() != before;
        if deleted {
            state.messages.retain(|m| m.session_id != id);
        }
        Ok(deleted)
    }

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn append_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let now = self.tick();
        let mut state = self.state.lock().unwrap();
        let Some(session) = state
            .sessions
            .iter_mut()
            .find(|s| s.id == message.session_id)
        else {
            anyhow::bail!("chat_messages.session_id violates foreign key constraint");
        };
        session.updated_at = now;

        let created = ChatMessage {
            id: MessageId::new(),
            session_id: message.session_id,
            role: message.role.to_string(),
            content: message.content,
            metadata: message.metadata,
            created_at: now,
        };
        state.messages.push(created.clone());
        Ok(created)
    }

    async fn log_query(&self, entry: NewQueryLog) -> Result<()> {
        if self.fail_logging {
            anyhow::bail!("query_logs unavailable");
        }
        self.state.lock().unwrap().query_logs.push(entry);
        Ok(())
    }
}

#[async_trait]
impl BaseUserDirectory for InMemoryStore {
    async fn find_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        let state = self.state.lock().unwrap();
        Ok(state.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn active_ban(&self, user_id: UserId) -> Result<Option<BannedUser>> {
        let now = Utc::now();
        let state = self.state.lock().unwrap();
        Ok(state
            .bans
            .iter()
            .filter(|b| b.user_id == user_id && b.is_active_at(now))
            .max_by_key(|b| b.created_at)
            .cloned())
    }
}

#[async_trait]
impl BaseActivityLog for InMemoryStore {
    async fn record_activity(&self, activity: NewUserActivity) -> Result<()> {
        if self.fail_logging {
            anyhow::bail!("user_activities unavailable");
        }
        self.state.lock().unwrap().activities.push(activity);
        Ok(())
    }

    async fn record_suspicious(&self, activity: NewSuspiciousActivity) -> Result<()> {
        if self.fail_logging {
            anyhow::bail!("suspicious_activities unavailable");
        }
        self.state.lock().unwrap().suspicious.push(activity);
        Ok(())
    }
}

// =============================================================================
// Mock Chat Webhook
// =============================================================================

pub struct MockChatWebhook {
    replies: Mutex<VecDeque<std::result::Result<WebhookReply, String>>>,
    requests: Mutex<Vec<WebhookRequest>>,
}

impl MockChatWebhook {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue an answer
    pub fn with_answer(self, answer: &str, sources: Vec<serde_json::Value>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(WebhookReply {
            answer: answer.to_string(),
            sources,
        }));
        self
    }

    /// Queue a failure (timeout, non-2xx, unparseable body)
    pub fn with_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockChatWebhook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseChatWebhook for MockChatWebhook {
    async fn ask(&self, request: &WebhookRequest) -> Result<WebhookReply> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("MockChatWebhook: no reply queued")),
        }
    }
}

// =============================================================================
// Mock Auth Service
// =============================================================================

struct Account {
    password: String,
    user: AuthUser,
}

/// Tokens and accounts held in maps.
///
/// Issued access tokens are `access-<uuid>`, refresh tokens `refresh-<uuid>`.
pub struct MockAuthService {
    tokens: Mutex<HashMap<String, AuthUser>>,
    accounts: Mutex<HashMap<String, Account>>,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Register a token that resolves to `user_id`
    pub fn with_token(self, token: &str, user_id: UserId) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), AuthUser::new(user_id, None));
        self
    }

    pub fn with_account(self, email: &str, password: &str, user_id: UserId) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: AuthUser::new(user_id, Some(email.to_string())),
            },
        );
        self
    }

    fn issue_session(&self, user: &AuthUser) -> Session {
        let access_token = format!("access-{}", user.user_id);
        let refresh_token = format!("refresh-{}", user.user_id);
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(access_token.clone(), user.clone());
        tokens.insert(refresh_token.clone(), user.clone());

        Session {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            refresh_token,
            user: supabase_user(user),
        }
    }
}

impl Default for MockAuthService {
    fn default() -> Self {
        Self::new()
    }
}

fn supabase_user(user: &AuthUser) -> User {
    User {
        id: user.user_id.to_string(),
        email: user.email.clone(),
        role: Some("authenticated".to_string()),
        user_metadata: serde_json::json!({}),
        created_at: None,
        last_sign_in_at: None,
    }
}

fn rejected(message: &str) -> anyhow::Error {
    SupabaseError::Api {
        status: 400,
        message: message.to_string(),
    }
    .into()
}

#[async_trait]
impl BaseAuthService for MockAuthService {
    async fn verify_access_token(&self, token: &str) -> Result<AuthUser> {
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .filter(|_| !token.starts_with("refresh-"))
            .cloned()
            .ok_or_else(|| rejected("invalid JWT"))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(rejected("Invalid login credentials")),
            }
        };
        Ok(self.issue_session(&user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _full_name: Option<&str>,
    ) -> Result<SignUpResponse> {
        let user = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(rejected("User already registered"));
            }
            let user = AuthUser::new(UserId::new(), Some(email.to_string()));
            accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
            user
        };
        Ok(SignUpResponse::Session(self.issue_session(&user)))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let user = self
            .tokens
            .lock()
            .unwrap()
            .get(refresh_token)
            .filter(|_| refresh_token.starts_with("refresh-"))
            .cloned()
            .ok_or_else(|| rejected("Invalid Refresh Token"))?;
        Ok(self.issue_session(&user))
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<InMemoryStore>,
    pub webhook: Option<Arc<MockChatWebhook>>,
    pub auth: Arc<MockAuthService>,
    pub max_upload_bytes: usize,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            webhook: None,
            auth: Arc::new(MockAuthService::new()),
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        }
    }

    /// Set the in-memory store
    pub fn store(mut self, store: InMemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Configure a mock chat webhook
    pub fn mock_webhook(mut self, webhook: MockChatWebhook) -> Self {
        self.webhook = Some(Arc::new(webhook));
        self
    }

    /// Set a mock auth service
    pub fn mock_auth(mut self, auth: MockAuthService) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_deps(self) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store,
            self.auth,
            self.webhook.map(|w| w as Arc<dyn BaseChatWebhook>),
            self.max_upload_bytes,
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
