use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the weft include expander.
#[derive(Parser)]
#[command(
	author,
	version,
	about = "Expand include directives in source files.",
	long_about = "weft is a recursive text-inclusion engine: it scans a source file line by line \
	              for directive comments (//= lib/util, /*= lib/styles */, #= lib/util), \
	              fetches the named local files, directories, or remote URLs, recursively expands \
	              their own directives, and reassembles everything in the original line \
	              order.\n\nTargets understand aliases (vendor!jquery), settings variables \
	              ({{version}}), fallback chains (local/lib : http://cdn.example.com/lib.js) and \
	              multi-targets (lib/[a, b, c])."
)]
pub struct WeftCli {
	/// Source file to expand.
	pub input: PathBuf,

	/// Write the expanded output to a file instead of stdout.
	#[arg(long, short)]
	pub output: Option<PathBuf>,

	/// Source dialect (js, coffee, css, styl, ...); derived from the input
	/// file extension when omitted.
	#[arg(long)]
	pub filetype: Option<String>,

	/// Target dialect; when it differs from the source dialect the assembled
	/// output is run through the matching registered conversion.
	#[arg(long)]
	pub target_type: Option<String>,

	/// Working directory for resolving targets; defaults to the input file's
	/// directory.
	#[arg(long)]
	pub cwd: Option<PathBuf>,

	/// Register a target alias. May be repeated.
	#[arg(long = "alias", value_name = "NAME=PATH")]
	pub aliases: Vec<String>,

	/// Degrade missing local targets to empty content instead of failing.
	#[arg(long, default_value_t = false)]
	pub tolerant: bool,

	/// Keep processing after errors; failures are reported but do not abort
	/// the build.
	#[arg(long, default_value_t = false)]
	pub keep_going: bool,

	/// Enable verbose output.
	#[arg(long, short, default_value_t = false)]
	pub verbose: bool,
}
