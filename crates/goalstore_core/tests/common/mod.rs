#![allow(dead_code)]

use goalstore_core::service::contact::OutboundEmail;
use goalstore_core::{
    BackendError, BackendResult, GenerationError, Item, ItemKey, KvBackend, MailError,
    MailSender, MemoryBackend, Sleeper, StoredItem, TaskGenerator, WriteCondition,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

/// Records requested sleeps instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// What one scripted `batch_delete` call does.
#[derive(Debug, Clone, Copy)]
pub enum BatchScript {
    /// Leave the last `n` keys of the call undeleted and report them.
    Unprocessed(usize),
    /// Fail the whole call.
    Fail,
}

/// In-memory backend wrapper that counts writes and can misbehave on
/// batch deletes according to a script. Unscripted calls behave normally.
#[derive(Default)]
pub struct ProbeBackend {
    pub inner: MemoryBackend,
    pub script: RefCell<VecDeque<BatchScript>>,
    pub batch_sizes: RefCell<Vec<usize>>,
    pub puts: Cell<usize>,
    pub updates: Cell<usize>,
    pub deletes: Cell<usize>,
}

impl ProbeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: impl IntoIterator<Item = BatchScript>) -> Self {
        let backend = Self::default();
        backend.script.borrow_mut().extend(script);
        backend
    }

    pub fn writes(&self) -> usize {
        self.puts.get() + self.updates.get() + self.deletes.get()
    }

    pub fn reset_counts(&self) {
        self.puts.set(0);
        self.updates.set(0);
        self.deletes.set(0);
        self.batch_sizes.borrow_mut().clear();
    }
}

impl KvBackend for ProbeBackend {
    fn put_item(&self, key: &ItemKey, item: &Item) -> BackendResult<()> {
        self.puts.set(self.puts.get() + 1);
        self.inner.put_item(key, item)
    }

    fn get_item(&self, key: &ItemKey) -> BackendResult<Option<Item>> {
        self.inner.get_item(key)
    }

    fn update_item(
        &self,
        key: &ItemKey,
        changes: &Item,
        condition: WriteCondition,
    ) -> BackendResult<()> {
        self.updates.set(self.updates.get() + 1);
        self.inner.update_item(key, changes, condition)
    }

    fn delete_item(&self, key: &ItemKey) -> BackendResult<()> {
        self.deletes.set(self.deletes.get() + 1);
        self.inner.delete_item(key)
    }

    fn query_prefix(&self, partition: &str, sort_prefix: &str) -> BackendResult<Vec<StoredItem>> {
        self.inner.query_prefix(partition, sort_prefix)
    }

    fn batch_delete(&self, keys: &[ItemKey]) -> BackendResult<Vec<ItemKey>> {
        self.batch_sizes.borrow_mut().push(keys.len());
        match self.script.borrow_mut().pop_front() {
            None => self.inner.batch_delete(keys),
            Some(BatchScript::Fail) => Err(BackendError::Unavailable(
                "scripted batch failure".to_string(),
            )),
            Some(BatchScript::Unprocessed(n)) => {
                let keep = n.min(keys.len());
                let (processed, unprocessed) = keys.split_at(keys.len() - keep);
                self.inner.batch_delete(processed)?;
                Ok(unprocessed.to_vec())
            }
        }
    }
}

/// Generator replaying scripted results; errors out when the script runs dry.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub responses: RefCell<VecDeque<Result<String, GenerationError>>>,
    pub calls: Cell<u32>,
}

impl ScriptedGenerator {
    pub fn new(responses: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            calls: Cell::new(0),
        }
    }
}

impl TaskGenerator for ScriptedGenerator {
    fn generate(&self, _goal_text: &str) -> Result<String, GenerationError> {
        self.calls.set(self.calls.get() + 1);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::parse("script exhausted")))
    }
}

/// Mail sender capturing everything it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: RefCell<Vec<OutboundEmail>>,
    pub fail: bool,
}

impl MailSender for RecordingMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::new("smtp unavailable"));
        }
        self.sent.borrow_mut().push(email.clone());
        Ok(())
    }
}
