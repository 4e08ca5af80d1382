use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

/// Dialect assumed when neither the configuration nor the entry point
/// supplies one.
pub const DEFAULT_FILETYPE: &str = "js";

/// Configuration for one engine instance.
///
/// Every field has a usable default; construct with struct-update syntax:
///
/// ```rust
/// use weft_core::WeftConfig;
///
/// let config = WeftConfig {
/// 	cwd: Some("assets/js".into()),
/// 	tolerant: true,
/// 	..WeftConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct WeftConfig {
	/// Source dialect of the input (`js`, `coffee`, `css`, `styl`, ...).
	/// Drives which directive patterns apply and which extension is appended
	/// to extensionless targets. Defaults to [`DEFAULT_FILETYPE`].
	pub filetype: Option<String>,
	/// Dialect of the emitted output. When it differs from [`filetype`], the
	/// fully assembled output is run through the matching conversion at
	/// end-of-stream. Defaults to the source dialect.
	///
	/// [`filetype`]: WeftConfig::filetype
	pub target_type: Option<String>,
	/// Input text encoding. Only the UTF-8 family is supported; any other
	/// value is rejected at engine construction.
	pub encoding: Option<String>,
	/// Working directory that targets resolve against independent of nesting
	/// depth. Defaults to the process working directory (`.`).
	pub cwd: Option<PathBuf>,
	/// Alias table mapping `name` (as referenced by `name!rest` targets) to a
	/// base path. Read-only for the life of the instance.
	pub aliases: HashMap<String, String>,
	/// Directive pattern override for this instance. Each entry is a regular
	/// expression with three capture groups (prefix, action, target); later
	/// entries take precedence. When unset, the per-filetype defaults apply.
	pub patterns: Option<Vec<String>>,
	/// Degrade unresolvable local targets (with no fallback alternatives) to
	/// empty content plus an `include:error` event instead of failing.
	pub tolerant: bool,
	/// When true (the default), the first fatal batch error moves the engine
	/// into its terminal error state. When false, errors are still emitted as
	/// events but the stream keeps accepting input and `end` still completes.
	pub abort_on_error: bool,
	/// Initial settings visible to variable interpolation before any `set`
	/// directive runs.
	pub settings: BTreeMap<String, Value>,
	/// Opaque per-converter option blocks, keyed by conversion id
	/// (e.g. `coffee2js`). Passed through to every step of the named
	/// converter, never interpreted by the engine.
	pub converter_options: HashMap<String, Value>,
}

impl Default for WeftConfig {
	fn default() -> Self {
		Self {
			filetype: None,
			target_type: None,
			encoding: None,
			cwd: None,
			aliases: HashMap::new(),
			patterns: None,
			tolerant: false,
			abort_on_error: true,
			settings: BTreeMap::new(),
			converter_options: HashMap::new(),
		}
	}
}

impl WeftConfig {
	/// The normalized source dialect.
	pub fn filetype(&self) -> String {
		normalize_ext(self.filetype.as_deref().unwrap_or(DEFAULT_FILETYPE))
	}

	/// The normalized target dialect, defaulting to the source dialect.
	pub fn target_type(&self) -> String {
		match &self.target_type {
			Some(target_type) => normalize_ext(target_type),
			None => self.filetype(),
		}
	}

	/// The working directory targets resolve against.
	pub fn cwd(&self) -> PathBuf {
		self.cwd.clone().unwrap_or_else(|| PathBuf::from("."))
	}
}

/// Normalize a file extension to lowercase with no leading dot.
pub fn normalize_ext(ext: &str) -> String {
	ext.trim_start_matches('.').to_lowercase()
}
