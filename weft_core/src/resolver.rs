use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::WeftError;
use crate::WeftResult;
use crate::config::WeftConfig;
use crate::config::normalize_ext;
use crate::convert::ConverterRegistry;
use crate::convert::conversion_id;
use crate::engine::SessionState;
use crate::events::Event;
use crate::fetch::Fetch;
use crate::fetch::is_remote;

/// Fallback alternatives are separated by a spaced colon, so plain `scheme://`
/// targets never split.
const FALLBACK_DELIMITER: &str = " : ";

/// Content produced by resolving one include target.
#[derive(Debug, Clone)]
pub struct Resolved {
	/// The resolved text, already normalized to the engine's target dialect.
	pub content: String,
	/// Directory the winning local candidate lives in. The included content's
	/// own relative targets resolve against it, so a file's includes are
	/// relative to the file rather than the original working directory.
	pub scope: Option<PathBuf>,
}

/// Runs the target-resolution pipeline for include directives: alias
/// expansion, variable interpolation, fallback decomposition, multi-target
/// expansion, remote/local classification, candidate probing, and directory
/// listing.
pub(crate) struct Resolver<'a> {
	pub config: &'a WeftConfig,
	pub converters: &'a ConverterRegistry,
	pub fetcher: &'a dyn Fetch,
	pub session: &'a SessionState,
}

impl Resolver<'_> {
	pub(crate) async fn resolve(&self, raw_target: &str, scope: &Path) -> WeftResult<Resolved> {
		let target = self.expand_aliases(raw_target);
		let target = self.interpolate(&clean_target(&target))?;

		let options = split_fallbacks(&target);
		// The permissive missing-file policy only applies when the target
		// carries no fallback alternatives.
		let tolerant = self.config.tolerant && options.len() == 1;

		let mut last_error = None;
		for option in &options {
			match self.resolve_option(option, scope, tolerant).await {
				Ok(resolved) => return Ok(resolved),
				Err(err) => {
					debug!(target = %option, error = %err, "target option failed");
					last_error = Some(err);
				}
			}
		}

		Err(last_error.unwrap_or_else(|| WeftError::TargetNotFound(target)))
	}

	/// Resolve one fallback alternative, expanding `prefix[a, b, c]` targets
	/// into parallel single resolutions joined in list order.
	async fn resolve_option(
		&self,
		option: &str,
		scope: &Path,
		tolerant: bool,
	) -> WeftResult<Resolved> {
		let targets = expand_multi_target(option);

		if let [target] = targets.as_slice() {
			return self.resolve_single(target, scope, tolerant).await;
		}

		let resolved = try_join_all(
			targets
				.iter()
				.map(|target| self.resolve_single(target, scope, tolerant)),
		)
		.await?;

		let scope_dir = resolved.iter().find_map(|single| single.scope.clone());
		let content = resolved
			.into_iter()
			.map(|single| single.content)
			.collect::<Vec<_>>()
			.join("\n");

		Ok(Resolved {
			content,
			scope: scope_dir,
		})
	}

	/// Resolve one fully expanded target string, consulting the session cache
	/// first. The first successful resolution of a key wins; later
	/// resolutions are served from cache without new I/O or conversion.
	async fn resolve_single(
		&self,
		target: &str,
		scope: &Path,
		tolerant: bool,
	) -> WeftResult<Resolved> {
		if let Some(hit) = self.session.cache.lock().get(target).cloned() {
			debug!(%target, "cache hit");
			return Ok(hit);
		}

		let resolved = if is_remote(target) {
			self.fetch_remote(target).await
		} else {
			self.resolve_local(target, scope, tolerant).await
		}?;

		self.session
			.cache
			.lock()
			.entry(target.to_string())
			.or_insert_with(|| resolved.clone());

		Ok(resolved)
	}

	async fn fetch_remote(&self, target: &str) -> WeftResult<Resolved> {
		let mut target = target.to_string();
		if file_extension(&target).is_empty() {
			target.push('.');
			target.push_str(&self.config.filetype());
		}

		self.session.events.emit(&Event::IncludeRemote(target.clone()));
		debug!(%target, "fetching remote include");

		let content = self.fetcher.fetch(&target).await?;
		let content = self.convert_for(&file_extension(&target), content).await?;

		Ok(Resolved {
			content,
			scope: None,
		})
	}

	async fn resolve_local(
		&self,
		target: &str,
		scope: &Path,
		tolerant: bool,
	) -> WeftResult<Resolved> {
		let mut winner = None;
		for candidate in self.candidate_paths(target, scope) {
			if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
				winner = Some((candidate, metadata));
				break;
			}
		}

		let Some((path, metadata)) = winner else {
			if tolerant {
				debug!(%target, "target missing, degrading to empty content");
				self.session
					.events
					.emit(&Event::IncludeError(target.to_string()));
				return Ok(Resolved {
					content: String::new(),
					scope: None,
				});
			}

			return Err(WeftError::TargetNotFound(target.to_string()));
		};

		let scope_dir = path.parent().map(Path::to_path_buf);

		if metadata.is_dir() {
			self.session.events.emit(&Event::IncludeDir(path.clone()));
			let content = self.read_directory(&path).await?;
			return Ok(Resolved {
				content,
				scope: scope_dir,
			});
		}

		self.session.events.emit(&Event::IncludeFile {
			target: target.to_string(),
			path: path.clone(),
		});
		debug!(path = %path.display(), "reading include");

		let content = tokio::fs::read_to_string(&path).await?;
		let ext = path
			.extension()
			.and_then(OsStr::to_str)
			.unwrap_or("")
			.to_string();
		let content = self.convert_for(&ext, content).await?;

		Ok(Resolved {
			content,
			scope: scope_dir,
		})
	}

	/// Build the ordered probe list for a local target: the scope-relative
	/// candidate first, then the working-directory candidate. Extensionless
	/// candidates are preceded by a default-dialect variant and a minified
	/// variant, in that preference order.
	fn candidate_paths(&self, target: &str, scope: &Path) -> Vec<PathBuf> {
		let filetype = self.config.filetype();
		let mut candidates = Vec::with_capacity(6);

		for base in [scope.join(target), self.config.cwd().join(target)] {
			if base.extension().is_none() {
				candidates.push(PathBuf::from(format!("{}.{filetype}", base.display())));
				candidates.push(PathBuf::from(format!("{}.min.{filetype}", base.display())));
			}
			candidates.push(base);
		}

		candidates
	}

	/// Concatenate a directory's includable entries in lexicographic order.
	/// An entry is includable when its extension matches the session filetype
	/// or a conversion into the session filetype is registered.
	async fn read_directory(&self, dir: &Path) -> WeftResult<String> {
		let filetype = self.config.filetype();

		let mut names = Vec::new();
		let mut entries = tokio::fs::read_dir(dir).await?;
		while let Some(entry) = entries.next_entry().await? {
			let name = entry.file_name();
			let Some(name) = name.to_str() else {
				continue;
			};

			let ext = normalize_ext(&file_extension(name));
			if ext == filetype || self.converters.contains(&format!("{ext}2{filetype}")) {
				names.push(name.to_string());
			}
		}
		names.sort();

		let contents = try_join_all(
			names
				.iter()
				.map(|name| self.read_file_and_convert(dir.join(name))),
		)
		.await?;

		Ok(contents.join("\n"))
	}

	async fn read_file_and_convert(&self, path: PathBuf) -> WeftResult<String> {
		let content = tokio::fs::read_to_string(&path).await?;
		let ext = path
			.extension()
			.and_then(OsStr::to_str)
			.unwrap_or("")
			.to_string();
		self.convert_for(&ext, content).await
	}

	/// Normalize content written in `source_ext` to the engine's target
	/// dialect, passing the host's opaque option block through to the
	/// converter.
	async fn convert_for(&self, source_ext: &str, content: String) -> WeftResult<String> {
		let Some(id) = conversion_id(source_ext, &self.config.target_type()) else {
			return Ok(content);
		};

		let options = self
			.config
			.converter_options
			.get(&id)
			.cloned()
			.unwrap_or(Value::Null);

		self.converters.convert(&id, content, &options).await
	}

	/// Substitute registered alias base paths into `name!rest` targets,
	/// re-applying expansion so aliases may reference aliases. An unknown
	/// alias name is reported as a non-fatal event and the target is kept
	/// literally.
	fn expand_aliases(&self, target: &str) -> String {
		let Some((name, rest)) = split_alias(target) else {
			return target.to_string();
		};

		let Some(base) = self.config.aliases.get(name) else {
			self.session
				.events
				.emit(&Event::AliasInvalid(name.to_string()));
			return target.to_string();
		};

		let base = base.strip_suffix('/').unwrap_or(base);
		let rest = rest.strip_prefix('/').unwrap_or(rest);
		let expanded = self.expand_aliases(&format!("{base}/{rest}"));
		debug!(alias = %name, target = %expanded, "expanded alias");

		expanded
	}

	/// Treat the cleaned target as a double-brace template against the
	/// current settings. An undefined or malformed expression is a hard error
	/// for this include.
	fn interpolate(&self, template: &str) -> WeftResult<String> {
		if !template.contains("{{") {
			return Ok(template.to_string());
		}

		let failure = |err: minijinja::Error| {
			WeftError::TemplateExpansion {
				target: template.to_string(),
				reason: err.to_string(),
			}
		};

		let settings = self.session.settings.lock().clone();

		let mut env = minijinja::Environment::new();
		env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
		env.add_template("__target__", template).map_err(failure)?;

		let template = env.get_template("__target__").map_err(failure)?;
		let ctx = minijinja::Value::from_serialize(&settings);
		template.render(ctx).map_err(failure)
	}
}

/// Strip a trailing period and lead/trail quote characters from a raw target
/// expression before interpolation.
pub(crate) fn clean_target(target: &str) -> String {
	let target = target.strip_suffix('.').unwrap_or(target);
	let target = target
		.strip_prefix('"')
		.or_else(|| target.strip_prefix('\''))
		.unwrap_or(target);
	let target = target
		.strip_suffix('"')
		.or_else(|| target.strip_suffix('\''))
		.unwrap_or(target);

	target.to_string()
}

/// Decompose a target string into its ordered fallback alternatives.
pub(crate) fn split_fallbacks(target: &str) -> Vec<String> {
	target
		.split(FALLBACK_DELIMITER)
		.map(|option| option.trim().to_string())
		.collect()
}

/// Expand a `prefix[a, b, c]` target into `[prefix+a, prefix+b, prefix+c]`.
/// Targets without the bracket shape expand to themselves.
pub(crate) fn expand_multi_target(target: &str) -> Vec<String> {
	let Some(body) = target.strip_suffix(']') else {
		return vec![target.to_string()];
	};
	let Some((prefix, list)) = body.split_once('[') else {
		return vec![target.to_string()];
	};

	list
		.split(',')
		.map(|item| format!("{prefix}{}", item.trim_start()))
		.collect()
}

/// Split a `name!rest` alias reference. Alias names are word characters and
/// dashes only, so scheme-qualified and quoted targets never match.
pub(crate) fn split_alias(target: &str) -> Option<(&str, &str)> {
	let (name, rest) = target.split_once('!')?;
	if name.is_empty() {
		return None;
	}

	name
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
		.then_some((name, rest))
}

/// The extension of a target's final path segment, without the leading dot.
pub(crate) fn file_extension(target: &str) -> String {
	Path::new(target)
		.extension()
		.and_then(OsStr::to_str)
		.unwrap_or("")
		.to_string()
}
