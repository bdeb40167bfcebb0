// In-memory adapter replaying canned replies, used by unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

#[derive(Default)]
pub struct ScriptedAdapter {
    replies: Mutex<VecDeque<AppResult<String>>>,
    requests: Mutex<Vec<LLMRequest>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    started: Arc<Notify>,
}

impl ScriptedAdapter {
    pub fn with_replies(replies: Vec<AppResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    /// Every call blocks until a permit is added to the returned semaphore.
    pub fn gated(replies: Vec<AppResult<String>>) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let adapter = Arc::new(Self {
            replies: Mutex::new(replies.into()),
            gate: Some(gate.clone()),
            ..Self::default()
        });
        (adapter, gate)
    }

    /// Resolves once a call has reached the adapter
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| AppError::Internal("gate closed".to_string()))?;
            permit.forget();
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Generation("no scripted reply left".to_string())));

        reply.map(|content| LLMResponse {
            content,
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }
}
