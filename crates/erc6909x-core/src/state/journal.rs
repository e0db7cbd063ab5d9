//! Call-frame journal over the storage service.
//!
//! Writes go straight to the backend so reentrant reads observe them, while
//! the journal remembers the bytes each write replaced. A failed frame walks
//! its part of the journal backwards and puts the old bytes back. Events are
//! buffered the same way and only reach the event log once the outermost
//! frame commits.

use erc6909x_storage::{StorageError, StorageService};
use erc6909x_types::TokenEvent;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// A write recorded for rollback.
#[derive(Debug)]
struct JournalEntry {
	key: String,
	/// Raw bytes before the write, `None` if the key did not exist.
	previous: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Journal {
	entries: Vec<JournalEntry>,
	pending_events: Vec<TokenEvent>,
	depth: usize,
}

/// Position in the journal at which a call frame started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a checkpoint must be committed or reverted"]
pub struct Checkpoint {
	journal_len: usize,
	events_len: usize,
	depth: usize,
}

impl Checkpoint {
	/// Nesting depth of the frame, starting at 1 for a top-level call.
	pub fn depth(&self) -> usize {
		self.depth
	}
}

/// Storage wrapper providing nested checkpoints with commit and revert.
///
/// The journal lock is never held across an `.await`; top-level calls are
/// expected to be serialized by the embedder, like transactions in a block.
pub struct JournaledStorage {
	storage: Arc<StorageService>,
	journal: Mutex<Journal>,
	event_log: Mutex<Vec<TokenEvent>>,
}

impl JournaledStorage {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			journal: Mutex::new(Journal::default()),
			event_log: Mutex::new(Vec::new()),
		}
	}

	fn journal(&self) -> MutexGuard<'_, Journal> {
		// A panic while holding the lock cannot leave the journal half-written
		self.journal
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn event_log(&self) -> MutexGuard<'_, Vec<TokenEvent>> {
		self.event_log
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Opens a new call frame.
	pub fn checkpoint(&self) -> Checkpoint {
		let mut journal = self.journal();
		journal.depth += 1;
		Checkpoint {
			journal_len: journal.entries.len(),
			events_len: journal.pending_events.len(),
			depth: journal.depth,
		}
	}

	/// Closes a frame, keeping its writes.
	///
	/// Committing the outermost frame publishes the buffered events and
	/// forgets the journal. A checkpoint that is not the innermost open
	/// frame is refused and the journal is left untouched.
	pub fn commit(&self, checkpoint: Checkpoint) -> Result<(), StorageError> {
		let published = {
			let mut journal = self.journal();
			if journal.depth != checkpoint.depth {
				tracing::error!(
					expected = checkpoint.depth,
					actual = journal.depth,
					"Call frames closed out of order"
				);
				return Err(StorageError::Backend(format!(
					"frame at depth {} committed while depth is {}",
					checkpoint.depth, journal.depth
				)));
			}
			journal.depth = checkpoint.depth - 1;
			if journal.depth > 0 {
				return Ok(());
			}
			journal.entries.clear();
			std::mem::take(&mut journal.pending_events)
		};

		for event in &published {
			tracing::debug!(event = event.name(), "Published event");
		}
		self.event_log().extend(published);
		Ok(())
	}

	/// Closes a frame, undoing every write made since the checkpoint.
	pub async fn revert(&self, checkpoint: Checkpoint) -> Result<(), StorageError> {
		let mut restored = 0usize;
		loop {
			let entry = {
				let mut journal = self.journal();
				if journal.entries.len() > checkpoint.journal_len {
					journal.entries.pop()
				} else {
					None
				}
			};
			let Some(entry) = entry else { break };
			self.storage.restore_raw(&entry.key, entry.previous).await?;
			restored += 1;
		}

		let mut journal = self.journal();
		if journal.depth != checkpoint.depth {
			tracing::error!(
				expected = checkpoint.depth,
				actual = journal.depth,
				"Call frames closed out of order"
			);
		}
		journal.pending_events.truncate(checkpoint.events_len);
		journal.depth = checkpoint.depth - 1;
		tracing::debug!(depth = checkpoint.depth, restored, "Reverted call frame");
		Ok(())
	}

	/// Current frame depth, zero outside any entry point.
	pub fn depth(&self) -> usize {
		self.journal().depth
	}

	/// Reads a typed value, `None` if absent.
	pub async fn load<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		self.storage.retrieve_optional(namespace, id).await
	}

	/// Writes a typed value, journaling the bytes it replaces.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		value: &T,
	) -> Result<(), StorageError> {
		self.record(namespace, id).await?;
		self.storage.store(namespace, id, value).await
	}

	/// Deletes a value, journaling the bytes it removes.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.record(namespace, id).await?;
		self.storage.remove(namespace, id).await
	}

	async fn record(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		if self.depth() == 0 {
			return Ok(());
		}
		let key = StorageService::key(namespace, id);
		let previous = self.storage.retrieve_raw(&key).await?;
		self.journal().entries.push(JournalEntry { key, previous });
		Ok(())
	}

	/// Buffers an event in the current frame, or publishes it outside any frame.
	pub fn emit(&self, event: TokenEvent) {
		{
			let mut journal = self.journal();
			if journal.depth > 0 {
				journal.pending_events.push(event);
				return;
			}
		}
		self.event_log().push(event);
	}

	/// Events published so far, oldest first.
	pub fn events(&self) -> Vec<TokenEvent> {
		self.event_log().clone()
	}

	/// Drains the published events.
	pub fn take_events(&self) -> Vec<TokenEvent> {
		std::mem::take(&mut *self.event_log())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use erc6909x_storage::implementations::memory::MemoryStorage;
	use erc6909x_types::{Address, U256};

	fn journaled() -> JournaledStorage {
		JournaledStorage::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn nonce_event(nonce: u64) -> TokenEvent {
		TokenEvent::NonceInvalidation {
			owner: Address::repeat_byte(0x01),
			nonce: U256::from(nonce),
		}
	}

	#[tokio::test]
	async fn test_revert_restores_previous_values() {
		let storage = journaled();
		storage.store("balances", "a", &U256::from(1)).await.unwrap();

		let cp = storage.checkpoint();
		storage.store("balances", "a", &U256::from(2)).await.unwrap();
		storage.store("balances", "a", &U256::from(3)).await.unwrap();
		storage.store("balances", "b", &U256::from(4)).await.unwrap();
		storage.emit(nonce_event(1));
		storage.revert(cp).await.unwrap();

		assert_eq!(
			storage.load::<U256>("balances", "a").await.unwrap(),
			Some(U256::from(1))
		);
		assert_eq!(storage.load::<U256>("balances", "b").await.unwrap(), None);
		assert!(storage.events().is_empty());
		assert_eq!(storage.depth(), 0);
	}

	#[tokio::test]
	async fn test_nested_revert_keeps_outer_writes() {
		let storage = journaled();

		let outer = storage.checkpoint();
		storage.store("nonces", "x", &true).await.unwrap();
		storage.emit(nonce_event(1));

		let inner = storage.checkpoint();
		assert_eq!(inner.depth(), 2);
		storage.store("nonces", "y", &true).await.unwrap();
		storage.emit(nonce_event(2));
		storage.revert(inner).await.unwrap();

		// Nothing is published until the outermost frame commits
		assert!(storage.events().is_empty());
		storage.commit(outer).unwrap();

		assert!(storage
			.load::<bool>("nonces", "x")
			.await
			.unwrap()
			.unwrap_or(false));
		assert_eq!(storage.load::<bool>("nonces", "y").await.unwrap(), None);
		assert_eq!(storage.take_events(), vec![nonce_event(1)]);
		assert!(storage.events().is_empty());
	}

	#[tokio::test]
	async fn test_outer_revert_undoes_committed_inner_frame() {
		let storage = journaled();

		let outer = storage.checkpoint();
		let inner = storage.checkpoint();
		storage.store("operators", "o", &true).await.unwrap();
		storage.emit(nonce_event(7));
		storage.commit(inner).unwrap();
		storage.remove("operators", "o").await.unwrap();
		storage.revert(outer).await.unwrap();

		assert_eq!(storage.load::<bool>("operators", "o").await.unwrap(), None);
		assert!(storage.events().is_empty());
	}

	#[tokio::test]
	async fn test_out_of_order_commit_is_refused() {
		let storage = journaled();

		let outer = storage.checkpoint();
		storage.store("nonces", "x", &true).await.unwrap();
		storage.emit(nonce_event(1));
		let inner = storage.checkpoint();

		assert!(matches!(
			storage.commit(outer),
			Err(StorageError::Backend(_))
		));
		assert_eq!(storage.depth(), 2);
		assert!(storage.events().is_empty());

		storage.commit(inner).unwrap();
		storage.commit(outer).unwrap();
		assert_eq!(storage.depth(), 0);
		assert_eq!(storage.take_events(), vec![nonce_event(1)]);
	}

	#[tokio::test]
	async fn test_writes_outside_frames_publish_directly() {
		let storage = journaled();
		storage.store("balances", "a", &U256::from(9)).await.unwrap();
		storage.emit(nonce_event(3));

		assert_eq!(storage.events(), vec![nonce_event(3)]);
	}
}
