use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum WeftError {
	#[error(transparent)]
	#[diagnostic(code(weft::io_error))]
	Io(#[from] std::io::Error),

	#[error("unable to find target for: `{0}`")]
	#[diagnostic(
		code(weft::target_not_found),
		help("check the include path, or enable tolerant mode to degrade missing targets to empty content")
	)]
	TargetNotFound(String),

	#[error("unable to expand variables in include `{target}`: {reason}")]
	#[diagnostic(
		code(weft::template_expansion),
		help("variables are interpolated with `{{{{name}}}}` from values declared in `set` directives")
	)]
	TemplateExpansion { target: String, reason: String },

	#[error("could not parse setting `{0}`: value must be valid JSON")]
	#[diagnostic(
		code(weft::setting_parse),
		help("values in `set` directives are JSON encoded, e.g. `//=set debug true`")
	)]
	SettingParse(String),

	#[error("unable to run conversion `{conversion}`: {reason}")]
	#[diagnostic(code(weft::conversion_unavailable))]
	ConversionUnavailable { conversion: String, reason: String },

	#[error("unable to find plugin `{0}`")]
	#[diagnostic(
		code(weft::plugin_not_found),
		help("register the plugin on the engine before writing any input")
	)]
	PluginNotFound(String),

	#[error("failed to fetch remote target `{target}`: {reason}")]
	#[diagnostic(code(weft::remote_fetch))]
	RemoteFetch { target: String, reason: String },

	#[error("invalid directive pattern: `{0}`")]
	#[diagnostic(
		code(weft::invalid_pattern),
		help("directive patterns are regular expressions with three capture groups: prefix, action, target")
	)]
	InvalidPattern(String),

	#[error("unsupported encoding: `{0}`")]
	#[diagnostic(code(weft::unsupported_encoding), help("only utf-8 input is supported"))]
	UnsupportedEncoding(String),

	#[error("the engine is no longer accepting input")]
	#[diagnostic(code(weft::closed))]
	Closed,
}

pub type WeftResult<T> = Result<T, WeftError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
