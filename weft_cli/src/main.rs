use std::collections::HashMap;
use std::process;

use clap::Parser;
use weft_cli::WeftCli;
use weft_core::WeftConfig;
use weft_core::expand_file;

fn main() {
	let args = WeftCli::parse();

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(miette::MietteHandlerOpts::new().build())
	}))
	.ok();

	let rt = match tokio::runtime::Runtime::new() {
		Ok(rt) => rt,
		Err(e) => {
			eprintln!("error: {e}");
			process::exit(2);
		}
	};

	if let Err(e) = rt.block_on(run(&args)) {
		// Render through miette for rich diagnostics with help text and
		// error codes.
		match e.downcast::<weft_core::WeftError>() {
			Ok(weft_err) => {
				let report: miette::Report = (*weft_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("error: {e}");
			}
		}
		process::exit(2);
	}
}

async fn run(args: &WeftCli) -> Result<(), Box<dyn std::error::Error>> {
	let mut aliases = HashMap::new();
	for pair in &args.aliases {
		let Some((name, base)) = pair.split_once('=') else {
			return Err(format!("invalid alias `{pair}`, expected NAME=PATH").into());
		};
		aliases.insert(name.to_string(), base.to_string());
	}

	let config = WeftConfig {
		filetype: args.filetype.clone(),
		target_type: args.target_type.clone(),
		cwd: args.cwd.clone(),
		aliases,
		tolerant: args.tolerant,
		abort_on_error: !args.keep_going,
		..WeftConfig::default()
	};

	let output = expand_file(&args.input, config).await?;

	match &args.output {
		Some(path) => std::fs::write(path, output.content.as_bytes())?,
		None => println!("{}", output.content),
	}

	if args.verbose {
		for (key, value) in &output.settings {
			eprintln!("setting {key} = {value}");
		}
	}

	Ok(())
}
