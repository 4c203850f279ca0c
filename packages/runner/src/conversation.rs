// ABOUTME: Per-test conversation state with idle expiry
// ABOUTME: Dependency-injected store; renders follow-up prompts from turn history

use crate::reports::TestReport;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// One completed attempt: the code that passed verification and the reports
/// it produced.
#[derive(Debug, Clone)]
pub struct TestAttempt {
    pub code: String,
    pub reports: Vec<TestReport>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub turns: Vec<Turn>,
    pub attempts: Vec<TestAttempt>,
    last_touched: Instant,
}

impl Conversation {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            attempts: Vec::new(),
            last_touched: Instant::now(),
        }
    }
}

/// Conversation state keyed by logical test id.
///
/// Never global: constructed by the embedder and handed to the coordinator.
/// Entries idle longer than the TTL are evicted opportunistically on every
/// mutation, and on demand via [`evict_expired`](Self::evict_expired).
#[derive(Debug)]
pub struct ConversationStore {
    ttl: Duration,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub async fn record_user_turn(&self, test_id: &str, content: &str) {
        self.record_turn(test_id, Role::User, content).await;
    }

    pub async fn record_assistant_turn(&self, test_id: &str, content: &str) {
        self.record_turn(test_id, Role::Assistant, content).await;
    }

    async fn record_turn(&self, test_id: &str, role: Role, content: &str) {
        let mut conversations = self.conversations.write().await;
        Self::evict_locked(&mut conversations, self.ttl);

        let conversation = conversations
            .entry(test_id.to_string())
            .or_insert_with(Conversation::new);
        conversation.turns.push(Turn {
            role,
            content: content.to_string(),
        });
        conversation.last_touched = Instant::now();
    }

    /// Record a verified attempt for later follow-up prompts.
    pub async fn record_attempt(&self, test_id: &str, code: &str, reports: Vec<TestReport>) {
        let mut conversations = self.conversations.write().await;
        Self::evict_locked(&mut conversations, self.ttl);

        let conversation = conversations
            .entry(test_id.to_string())
            .or_insert_with(Conversation::new);
        conversation.attempts.push(TestAttempt {
            code: code.to_string(),
            reports,
            timestamp: Utc::now(),
        });
        conversation.last_touched = Instant::now();
    }

    /// Render the full-context prompt for a test: every prior turn, the
    /// latest code and its reports, and a closing instruction. An unknown
    /// test id renders empty.
    pub async fn build_prompt(&self, test_id: &str) -> String {
        let conversations = self.conversations.read().await;
        let Some(conversation) = conversations.get(test_id) else {
            return String::new();
        };

        let mut prompt = String::from("Previous conversation and test history:\n\n");
        for turn in &conversation.turns {
            let prefix = match turn.role {
                Role::User => "User: ",
                Role::Assistant => "Assistant: ",
            };
            prompt.push_str(prefix);
            prompt.push_str(&turn.content);
            prompt.push_str("\n\n");
        }

        if let Some(latest) = conversation.attempts.last() {
            prompt.push_str("Latest test code:\n");
            prompt.push_str(&latest.code);
            prompt.push_str("\n\n");
            prompt.push_str("Latest test results:\n");
            for report in &latest.reports {
                prompt.push_str(&report.content);
                prompt.push('\n');
            }
        }

        prompt.push_str("\nPlease improve the test based on the above conversation and previous results.");
        prompt
    }

    /// Snapshot of a conversation, if present.
    pub async fn get(&self, test_id: &str) -> Option<Conversation> {
        self.conversations.read().await.get(test_id).cloned()
    }

    /// Drop every entry idle longer than the TTL.
    pub async fn evict_expired(&self) {
        let mut conversations = self.conversations.write().await;
        Self::evict_locked(&mut conversations, self.ttl);
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }

    fn evict_locked(conversations: &mut HashMap<String, Conversation>, ttl: Duration) {
        let before = conversations.len();
        conversations.retain(|_, conversation| conversation.last_touched.elapsed() < ttl);
        let evicted = before - conversations.len();
        if evicted > 0 {
            debug!("Evicted {} idle conversation(s)", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(content: &str) -> TestReport {
        TestReport {
            filename: "report.md".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn prompt_renders_turns_in_order() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.record_user_turn("t1", "Test the model accuracy").await;
        store.record_assistant_turn("t1", "Test execution completed.").await;
        store.record_user_turn("t1", "Also check the edge cases").await;

        let prompt = store.build_prompt("t1").await;

        assert!(prompt.starts_with("Previous conversation and test history:\n\n"));
        let user_one = prompt.find("User: Test the model accuracy").unwrap();
        let assistant = prompt.find("Assistant: Test execution completed.").unwrap();
        let user_two = prompt.find("User: Also check the edge cases").unwrap();
        assert!(user_one < assistant && assistant < user_two);
        assert!(prompt.ends_with(
            "\nPlease improve the test based on the above conversation and previous results."
        ));
    }

    #[tokio::test]
    async fn prompt_includes_latest_attempt_only() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.record_user_turn("t1", "run it").await;
        store
            .record_attempt("t1", "print('old')", vec![report("old result")])
            .await;
        store
            .record_attempt("t1", "print('new')", vec![report("new result")])
            .await;

        let prompt = store.build_prompt("t1").await;

        assert!(prompt.contains("Latest test code:\nprint('new')"));
        assert!(prompt.contains("Latest test results:\nnew result"));
        assert!(!prompt.contains("print('old')"));
        assert!(!prompt.contains("old result"));
    }

    #[tokio::test]
    async fn unknown_test_renders_empty() {
        let store = ConversationStore::new(Duration::from_secs(60));
        assert_eq!(store.build_prompt("nope").await, "");
    }

    #[tokio::test]
    async fn tests_do_not_share_state() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.record_user_turn("t1", "first test").await;
        store.record_user_turn("t2", "second test").await;

        let prompt = store.build_prompt("t2").await;
        assert!(prompt.contains("second test"));
        assert!(!prompt.contains("first test"));
    }

    #[tokio::test]
    async fn idle_entries_are_evicted_on_mutation() {
        let store = ConversationStore::new(Duration::from_millis(20));
        store.record_user_turn("stale", "hello").await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.record_user_turn("fresh", "hi").await;

        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn eviction_runs_on_demand() {
        let store = ConversationStore::new(Duration::from_millis(20));
        store.record_user_turn("stale", "hello").await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.evict_expired().await;

        assert!(store.is_empty().await);
    }
}
