use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use futures::future::BoxFuture;
use futures::future::try_join_all;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::WeftError;
use crate::WeftResult;
use crate::config::WeftConfig;
use crate::convert::ConverterRegistry;
use crate::convert::conversion_id;
use crate::events::Event;
use crate::events::EventBus;
use crate::fetch::Fetch;
use crate::fetch::HttpFetch;
use crate::plugin::PluginRegistry;
use crate::resolver::Resolved;
use crate::resolver::Resolver;
use crate::scanner::DirectiveMatch;
use crate::scanner::Scanner;

/// Engine lifecycle. `write` moves `Idle` to `Accepting`; a fatal batch error
/// under the abort-on-error policy moves to `Errored`; `end` moves to `Ended`.
/// Both terminal states refuse further input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EngineState {
	Idle,
	Accepting,
	Ended,
	Errored,
}

/// Shared mutable state for one engine session, reachable from concurrently
/// resolving subtrees. Guards are never held across await points.
pub(crate) struct SessionState {
	/// Settings context populated by `set` directives. Grows monotonically
	/// for the life of the instance.
	pub settings: Mutex<BTreeMap<String, Value>>,
	/// Target-identity to final-content cache; write-once per key.
	pub cache: Mutex<HashMap<String, Resolved>>,
	pub events: EventBus,
	/// Number of in-flight resolution subtrees.
	pub pending: AtomicUsize,
}

/// Final product of a fully expanded session.
#[derive(Debug, Clone)]
pub struct WeftOutput {
	/// The expanded text, after the end-of-stream conversion when the target
	/// dialect differs from the source dialect.
	pub content: String,
	/// Every setting accumulated by `set` directives during the session.
	pub settings: BTreeMap<String, Value>,
}

/// The expansion engine.
///
/// Input arrives through [`write`](Weft::write) in arbitrary chunks and is
/// split into lines; each complete line is scanned for a directive and, on a
/// match, dispatched to the named action. Fetched content is recursively
/// re-expanded before being spliced back at the directive's position, and a
/// batch's results are joined by input line index regardless of completion
/// order. `write` and [`end`](Weft::end) only return once the batch has fully
/// resolved, so two writes can never interleave their output.
///
/// ```rust,no_run
/// use weft_core::Weft;
/// use weft_core::WeftConfig;
///
/// # async fn demo() -> weft_core::WeftResult<()> {
/// let config = WeftConfig {
/// 	cwd: Some("assets/js".into()),
/// 	..WeftConfig::default()
/// };
/// let mut engine = Weft::new(config)?;
/// engine.write("//= lib/helpers\n").await?;
/// let output = engine.end().await?;
/// println!("{}", output.content);
/// # Ok(())
/// # }
/// ```
pub struct Weft {
	config: WeftConfig,
	scanner: Scanner,
	converters: ConverterRegistry,
	plugins: PluginRegistry,
	fetcher: Arc<dyn Fetch>,
	session: SessionState,
	state: EngineState,
	/// Trailing fragment of the last write that was not terminated by a line
	/// break yet.
	buffer: String,
	output: Vec<String>,
}

impl Weft {
	pub fn new(config: WeftConfig) -> WeftResult<Self> {
		if let Some(encoding) = &config.encoding {
			if !matches!(encoding.to_ascii_lowercase().as_str(), "utf8" | "utf-8") {
				return Err(WeftError::UnsupportedEncoding(encoding.clone()));
			}
		}

		let scanner = Scanner::new(&config.filetype(), config.patterns.as_deref())?;
		debug!(filetype = %config.filetype(), target_type = %config.target_type(), "engine created");

		Ok(Self {
			scanner,
			converters: ConverterRegistry::default(),
			plugins: PluginRegistry::default(),
			fetcher: Arc::new(HttpFetch::new()),
			session: SessionState {
				settings: Mutex::new(config.settings.clone()),
				cache: Mutex::new(HashMap::new()),
				events: EventBus::default(),
				pending: AtomicUsize::new(0),
			},
			state: EngineState::Idle,
			buffer: String::new(),
			output: Vec::new(),
			config,
		})
	}

	pub fn config(&self) -> &WeftConfig {
		&self.config
	}

	/// Replace the remote-fetch collaborator.
	pub fn set_fetcher(&mut self, fetcher: Arc<dyn Fetch>) {
		self.fetcher = fetcher;
	}

	pub fn converters_mut(&mut self) -> &mut ConverterRegistry {
		&mut self.converters
	}

	pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
		&mut self.plugins
	}

	/// Subscribe to the engine's observable events.
	pub fn subscribe(&self) -> UnboundedReceiver<Event> {
		self.session.events.subscribe()
	}

	/// Snapshot of the settings accumulated so far.
	pub fn settings(&self) -> BTreeMap<String, Value> {
		self.session.settings.lock().clone()
	}

	/// Number of in-flight resolution subtrees. Zero whenever `write` is not
	/// executing.
	pub fn pending(&self) -> usize {
		self.session.pending.load(Ordering::SeqCst)
	}

	/// Append a chunk of input. Complete lines are expanded as one batch; the
	/// trailing fragment is buffered until a later write (or `end`) completes
	/// the line. Returns once the batch has fully resolved.
	pub async fn write(&mut self, chunk: &str) -> WeftResult<()> {
		self.ensure_accepting()?;

		self.buffer.push_str(chunk);
		let data = std::mem::take(&mut self.buffer);
		let mut parts: Vec<&str> = data.split('\n').collect();
		// Hold back the final (possibly incomplete) fragment.
		self.buffer = parts.pop().unwrap_or("").to_string();

		let lines: Vec<String> = parts.into_iter().map(clean_line).collect();
		if lines.is_empty() {
			return Ok(());
		}

		self.expand_batch(lines).await
	}

	/// Finish the stream: flush the buffered partial line, run the
	/// end-of-stream conversion when the target dialect differs from the
	/// source dialect, and return the final output together with the
	/// accumulated settings.
	pub async fn end(mut self) -> WeftResult<WeftOutput> {
		self.ensure_accepting()?;

		if !self.buffer.is_empty() {
			let line = clean_line(&std::mem::take(&mut self.buffer));
			self.expand_batch(vec![line]).await?;
		}

		debug_assert_eq!(self.pending(), 0);

		let mut content = self.output.join("\n");
		if let Some(id) = conversion_id(&self.config.filetype(), &self.config.target_type()) {
			let options = self
				.config
				.converter_options
				.get(&id)
				.cloned()
				.unwrap_or(Value::Null);

			content = match self.converters.convert(&id, content, &options).await {
				Ok(converted) => converted,
				Err(err) => {
					self.session.events.emit(&Event::Error(err.to_string()));
					return Err(err);
				}
			};
		}

		self.state = EngineState::Ended;
		self.session.events.emit(&Event::Data(content.clone()));
		self.session.events.emit(&Event::End);

		Ok(WeftOutput {
			content,
			settings: self.session.settings.lock().clone(),
		})
	}

	/// Write a complete source text and finish the stream in one call.
	pub async fn process(mut self, input: &str) -> WeftResult<WeftOutput> {
		self.write(input).await?;
		self.end().await
	}

	fn ensure_accepting(&mut self) -> WeftResult<()> {
		match self.state {
			EngineState::Idle => {
				self.state = EngineState::Accepting;
				Ok(())
			}
			EngineState::Accepting => Ok(()),
			EngineState::Ended | EngineState::Errored => Err(WeftError::Closed),
		}
	}

	/// Expand one batch of complete lines. All lines fan out concurrently and
	/// are joined by input index, so emitted order equals input order no
	/// matter how resolution latencies interleave.
	async fn expand_batch(&mut self, lines: Vec<String>) -> WeftResult<()> {
		self.session.events.emit(&Event::Pause);

		let scope = self.config.cwd();
		let result = {
			let this: &Weft = &*self;
			try_join_all(
				lines
					.iter()
					.map(|line| this.expand_line(line.clone(), scope.clone())),
			)
			.await
		};

		match result {
			Ok(expanded) => {
				self.output.extend(expanded);
				self.session.events.emit(&Event::Resume);
				Ok(())
			}
			Err(err) => {
				// The short-circuit dropped any sibling subtrees still in
				// flight before they could reach their decrement.
				self.session.pending.store(0, Ordering::SeqCst);
				self.session.events.emit(&Event::Error(err.to_string()));
				if self.config.abort_on_error {
					self.state = EngineState::Errored;
					return Err(err);
				}

				// The failed batch contributes no output, but the stream
				// keeps accepting input.
				self.session.events.emit(&Event::Resume);
				Ok(())
			}
		}
	}

	/// Expand a single line: pass it through verbatim when no directive
	/// matches, otherwise dispatch the action and recursively re-expand every
	/// line of the fetched content (re-indented with the directive's prefix)
	/// before splicing.
	fn expand_line(&self, line: String, scope: PathBuf) -> BoxFuture<'_, WeftResult<String>> {
		Box::pin(async move {
			let Some(directive) = self.scanner.scan(&line) else {
				return Ok(line);
			};

			debug!(action = %directive.action, target = %directive.target, "expanding directive");

			self.session.pending.fetch_add(1, Ordering::SeqCst);
			let result = self.run_directive(&directive, &scope).await;
			self.session.pending.fetch_sub(1, Ordering::SeqCst);
			let (content, content_scope) = result?;

			let scope = content_scope.unwrap_or(scope);
			let nested: Vec<String> = content
				.split('\n')
				.map(|nested| format!("{}{}", directive.prefix, clean_line(nested)))
				.collect();

			let expanded = try_join_all(
				nested
					.into_iter()
					.map(|nested| self.expand_line(nested, scope.clone())),
			)
			.await?;

			Ok(expanded.join("\n"))
		})
	}

	/// Dispatch a directive to its action: the built-in `include` and `set`
	/// actions, or the plugin registry for anything else. Returns the content
	/// to splice plus the scope directory its own includes resolve against.
	async fn run_directive(
		&self,
		directive: &DirectiveMatch,
		scope: &Path,
	) -> WeftResult<(String, Option<PathBuf>)> {
		match directive.action.as_str() {
			"include" => {
				let resolver = Resolver {
					config: &self.config,
					converters: &self.converters,
					fetcher: self.fetcher.as_ref(),
					session: &self.session,
				};
				let resolved = resolver.resolve(&directive.target, scope).await?;
				Ok((resolved.content, resolved.scope))
			}
			"set" => {
				self.apply_setting(&directive.target)?;
				Ok((String::new(), None))
			}
			action => {
				let (name, args) = plugin_invocation(action, &directive.target);
				let Some(plugin) = self.plugins.lookup(&name) else {
					return Err(WeftError::PluginNotFound(name));
				};

				let output = plugin.run(self, &args).await?;
				let content = match output
					.filetype
					.as_deref()
					.and_then(|filetype| conversion_id(filetype, &self.config.target_type()))
				{
					Some(id) => {
						let options = self
							.config
							.converter_options
							.get(&id)
							.cloned()
							.unwrap_or(Value::Null);
						self.converters.convert(&id, output.content, &options).await?
					}
					None => output.content,
				};

				Ok((content, None))
			}
		}
	}

	/// Merge a `set` directive's key and JSON value into the settings
	/// context.
	fn apply_setting(&self, expression: &str) -> WeftResult<()> {
		let mut parts = expression.splitn(2, char::is_whitespace);
		let key = parts.next().unwrap_or_default().to_string();
		let raw_value = parts.next().unwrap_or_default().trim();

		let value: Value =
			serde_json::from_str(raw_value).map_err(|_| WeftError::SettingParse(key.clone()))?;

		debug!(%key, "setting updated");
		self.session
			.settings
			.lock()
			.insert(key.clone(), value.clone());
		self.session.events.emit(&Event::Setting(key, value));

		Ok(())
	}
}

/// Expand a file from disk, deriving the filetype and working directory from
/// its path when the configuration leaves them unset.
pub async fn expand_file(path: impl AsRef<Path>, mut config: WeftConfig) -> WeftResult<WeftOutput> {
	let path = path.as_ref();

	if config.filetype.is_none() {
		config.filetype = path
			.extension()
			.and_then(OsStr::to_str)
			.map(str::to_string);
	}
	if config.cwd.is_none() {
		config.cwd = path.parent().map(Path::to_path_buf);
	}

	let input = tokio::fs::read_to_string(path).await?;
	Weft::new(config)?.process(&input).await
}

/// Resolve an action name and raw target into a plugin invocation. The
/// explicit `plugin` action names its plugin in the first argument; any other
/// unrecognized action is itself the plugin name.
fn plugin_invocation(action: &str, target: &str) -> (String, Vec<String>) {
	let mut words = target.split_whitespace().map(str::to_string);

	if action == "plugin" {
		let name = words.next().unwrap_or_default();
		(name, words.collect())
	} else {
		(action.to_string(), words.collect())
	}
}

fn clean_line(line: &str) -> String {
	line.strip_suffix('\r').unwrap_or(line).to_string()
}
