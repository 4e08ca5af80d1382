use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::WeftError;
use crate::WeftResult;
use crate::config::normalize_ext;

/// One asynchronous transform step in a conversion chain. A step receives the
/// prior step's output together with the opaque option block registered for
/// the conversion (or `Value::Null` when the host supplied none).
pub type ConvertStep =
	Arc<dyn Fn(String, Value) -> BoxFuture<'static, WeftResult<String>> + Send + Sync>;

/// Build the composite conversion identifier for a source/target dialect
/// pair (e.g. `coffee2js`). Returns `None` when the source extension is empty
/// or already matches the target, meaning no conversion is required.
pub fn conversion_id(source_ext: &str, target_type: &str) -> Option<String> {
	let source = normalize_ext(source_ext);
	if source.is_empty() || source == target_type {
		return None;
	}

	Some(format!("{source}2{target_type}"))
}

/// Ordered async transform chains keyed by conversion id.
///
/// The registry holds no built-in converters: the host application registers
/// whatever compilers it has available. The engine looks chains up by the
/// composite source/target key only and treats a missing chain and a failing
/// step as the same error kind.
#[derive(Default)]
pub struct ConverterRegistry {
	converters: HashMap<String, Vec<ConvertStep>>,
}

impl ConverterRegistry {
	/// Register (or replace) the step chain for a conversion id.
	pub fn register(&mut self, id: impl Into<String>, steps: Vec<ConvertStep>) {
		self.converters.insert(id.into(), steps);
	}

	/// Whether a chain is registered for the given conversion id.
	pub fn contains(&self, id: &str) -> bool {
		self.converters.contains_key(id)
	}

	/// Feed `input` through the step chain registered under `id`, each step
	/// receiving the prior step's output.
	pub async fn convert(&self, id: &str, input: String, options: &Value) -> WeftResult<String> {
		let Some(steps) = self.converters.get(id) else {
			return Err(WeftError::ConversionUnavailable {
				conversion: id.to_string(),
				reason: "no converter registered".to_string(),
			});
		};

		debug!(conversion = %id, steps = steps.len(), "running conversion");

		let mut current = input;
		for step in steps {
			current = (step.as_ref())(current, options.clone()).await.map_err(|err| {
				WeftError::ConversionUnavailable {
					conversion: id.to_string(),
					reason: err.to_string(),
				}
			})?;
		}

		Ok(current)
	}
}
