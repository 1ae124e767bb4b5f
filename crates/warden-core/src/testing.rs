//! Test doubles shared across module tests.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicI32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::{
        port::TransportPort,
        types::{SendError, SendResult},
    },
};

/// In-memory transport that records every attempt. Chats registered via
/// `fail_send_for` / `fail_delete_for` reject with `Unauthorized`.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<(i64, i32)>>,
    failing_sends: Mutex<HashSet<i64>>,
    failing_deletes: Mutex<HashSet<i64>>,
    next_id: AtomicI32,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_send_for(&self, chat_id: i64) {
        self.failing_sends.lock().unwrap().insert(chat_id);
    }

    pub fn fail_delete_for(&self, chat_id: i64) {
        self.failing_deletes.lock().unwrap().insert(chat_id);
    }

    fn record_send(&self, chat_id: ChatId, description: String) -> SendResult<MessageRef> {
        self.sent.lock().unwrap().push((chat_id.0, description));
        if self.failing_sends.lock().unwrap().contains(&chat_id.0) {
            return Err(SendError::Unauthorized);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }
}

#[async_trait]
impl TransportPort for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef> {
        self.record_send(chat_id, text.to_string())
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_id: &str,
        _caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        self.record_send(chat_id, format!("[photo {file_id}]"))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_id: &str,
        _caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        self.record_send(chat_id, format!("[document {file_id}]"))
    }

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()> {
        if self
            .failing_deletes
            .lock()
            .unwrap()
            .contains(&msg.chat_id.0)
        {
            return Err(SendError::Other("MessageNotFound".to_string()));
        }
        self.deleted
            .lock()
            .unwrap()
            .push((msg.chat_id.0, msg.message_id.0));
        Ok(())
    }
}
