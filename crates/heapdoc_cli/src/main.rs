#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "heapdoc", about = "Managed heap dump inspection tools")]
struct Cli {
	/// Log resolver and reader activity to stderr.
	#[arg(long, short, global = true)]
	verbose: bool,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Dump-level summary.
	Info(cmd::info::Args),
	/// List type names matching a mask.
	Types(cmd::types::Args),
	/// Resolved layout of one type.
	Layout(cmd::layout::Args),
	/// Decode the value at an address.
	Read(cmd::read::Args),
	/// Locate and decode a static field.
	Static(cmd::statics::Args),
	/// Enumerate heap objects.
	Heap(cmd::heap::Args),
}

fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	if let Err(err) = run(cli.command) {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn init_logging(verbose: bool) {
	let fallback = if verbose { "heapdoc=debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn run(command: Commands) -> heapdoc::inspect::Result<()> {
	match command {
		Commands::Info(args) => cmd::info::run(args),
		Commands::Types(args) => cmd::types::run(args),
		Commands::Layout(args) => cmd::layout::run(args),
		Commands::Read(args) => cmd::read::run(args),
		Commands::Static(args) => cmd::statics::run(args),
		Commands::Heap(args) => cmd::heap::run(args),
	}
}
