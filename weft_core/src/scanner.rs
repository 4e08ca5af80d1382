use regex::Regex;

use crate::WeftError;
use crate::WeftResult;

/// Directive embedded in a `//=` line comment (js, coffee output, roy,
/// stylus).
pub const DOUBLE_SLASH_PATTERN: &str = r"^(\s*)//=(\w*)\s*(.*)$";
/// Directive embedded in a one-line `/*= ... */` block comment (js, css).
pub const SLASH_STAR_PATTERN: &str = r"^(\s*)/\*=(\w*)\s*(.*?)\s*\*/$";
/// Directive embedded in a `#=` comment (coffeescript).
pub const HASH_PATTERN: &str = r"^(\s*)#=(\w*)\s*(.*)$";

/// The default directive patterns recognised for a filetype. Callers can
/// override the set per engine instance through the configuration.
pub fn default_patterns(filetype: &str) -> &'static [&'static str] {
	match filetype {
		"css" => &[SLASH_STAR_PATTERN],
		"coffee" => &[HASH_PATTERN],
		"roy" | "styl" => &[DOUBLE_SLASH_PATTERN],
		_ => &[DOUBLE_SLASH_PATTERN, SLASH_STAR_PATTERN],
	}
}

/// A single line recognised as a directive.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DirectiveMatch {
	/// Leading whitespace preserved for re-emission: every line spliced in
	/// place of the directive is re-indented with this prefix.
	pub prefix: String,
	/// The action name following the directive marker. Empty action text
	/// defaults to `include`.
	pub action: String,
	/// The raw target expression, exactly as written.
	pub target: String,
}

/// Matches lines against the directive patterns of one filetype.
#[derive(Debug)]
pub struct Scanner {
	patterns: Vec<Regex>,
}

impl Scanner {
	/// Compile the scanner for a filetype, honouring a per-instance pattern
	/// override when one is supplied.
	pub fn new(filetype: &str, overrides: Option<&[String]>) -> WeftResult<Self> {
		let sources: Vec<String> = match overrides {
			Some(patterns) => patterns.to_vec(),
			None => {
				default_patterns(filetype)
					.iter()
					.map(|pattern| (*pattern).to_string())
					.collect()
			}
		};

		let patterns = sources
			.into_iter()
			.map(|source| Regex::new(&source).map_err(|_| WeftError::InvalidPattern(source.clone())))
			.collect::<WeftResult<Vec<_>>>()?;

		Ok(Self { patterns })
	}

	/// Return the first matching directive for a line, or `None` when the
	/// line passes through unchanged. Patterns are scanned in reverse
	/// registration order so later-registered patterns take precedence.
	pub fn scan(&self, line: &str) -> Option<DirectiveMatch> {
		for pattern in self.patterns.iter().rev() {
			let Some(caps) = pattern.captures(line) else {
				continue;
			};

			let action = caps.get(2).map_or("", |m| m.as_str());
			return Some(DirectiveMatch {
				prefix: caps.get(1).map_or("", |m| m.as_str()).to_string(),
				action: if action.is_empty() {
					"include".to_string()
				} else {
					action.to_string()
				},
				target: caps.get(3).map_or("", |m| m.as_str()).to_string(),
			});
		}

		None
	}
}
