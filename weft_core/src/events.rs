use std::path::PathBuf;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

/// Observable events emitted while an engine instance processes input.
///
/// Event names mirror the wire contract other tooling depends on: `data`,
/// `end`, `error`, `setting`, `include:file`, `include:dir`,
/// `include:remote`, `alias:invalid`, `include:error`, `pause`, `resume`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Event {
	/// Final content buffer produced at end-of-stream.
	Data(String),
	/// Terminal success.
	End,
	/// A failure surfaced to the engine boundary. Always emitted, whether or
	/// not the abort-on-error policy lets the stream keep going.
	Error(String),
	/// A `set` directive merged a key/value pair into the settings context.
	Setting(String, Value),
	/// A local file target was located and is about to be read.
	IncludeFile { target: String, path: PathBuf },
	/// A directory target was located and is about to be listed.
	IncludeDir(PathBuf),
	/// A remote target is about to be fetched.
	IncludeRemote(String),
	/// An alias reference named an alias that is not registered.
	AliasInvalid(String),
	/// A missing target was swallowed under tolerant mode.
	IncludeError(String),
	/// A write batch began expanding; further writes are held back until the
	/// matching [`Event::Resume`].
	Pause,
	/// The in-flight batch fully resolved.
	Resume,
}

/// Fans engine events out to any number of subscribers.
#[derive(Default)]
pub(crate) struct EventBus {
	senders: Mutex<Vec<mpsc::UnboundedSender<Event>>>,
}

impl EventBus {
	pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.senders.lock().push(tx);
		rx
	}

	pub(crate) fn emit(&self, event: &Event) {
		// Dropped receivers are pruned as a side effect of the failed send.
		self.senders
			.lock()
			.retain(|sender| sender.send(event.clone()).is_ok());
	}
}
