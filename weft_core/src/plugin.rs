use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::WeftResult;
use crate::engine::Weft;

/// Content produced by a plugin action.
#[derive(Debug, Clone, Default)]
pub struct PluginOutput {
	pub content: String,
	/// Dialect of `content`. When set and different from the engine's target
	/// dialect, the engine runs the matching conversion before splicing.
	/// `None` means the content is already in the target dialect.
	pub filetype: Option<String>,
}

/// An externally registered directive action.
///
/// Any directive whose action name is not `include` or `set` dispatches
/// here: `//=banner v1.2` invokes the plugin registered as `banner` with the
/// argument list `["v1.2"]`.
#[async_trait]
pub trait Plugin: Send + Sync {
	async fn run(&self, engine: &Weft, args: &[String]) -> WeftResult<PluginOutput>;
}

/// Plugins resolvable by directive action name.
///
/// Populated by the host application before input is written; the engine
/// only ever calls [`lookup`](PluginRegistry::lookup).
#[derive(Default)]
pub struct PluginRegistry {
	plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
	pub fn register(&mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) {
		self.plugins.insert(name.into(), plugin);
	}

	pub fn lookup(&self, name: &str) -> Option<Arc<dyn Plugin>> {
		self.plugins.get(name).cloned()
	}
}
