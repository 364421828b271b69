use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, Command};
use embrace_cli::{run, CliOptions};
use embrace_core::init_tracing;

fn main() -> Result<()> {
    // Initialize logging
    init_tracing();

    let matches = Command::new("embrace")
        .version(embrace_core::VERSION)
        .about("Rewrites indentation-delimited scripts into braced, C-style form")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Source file to convert")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .value_name("PATH")
                .help("Parser-emitted tree JSON (defaults to <FILE>.tree.json)"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("PATH")
                .help("Write converted code here instead of stdout"),
        )
        .arg(
            Arg::new("map-out")
                .long("map-out")
                .value_name("PATH")
                .help("Write the rendered position map here"),
        )
        .arg(
            Arg::new("literate")
                .long("literate")
                .help("Treat the input as the documentation-interleaved notation")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let mut options = CliOptions::new(
        matches
            .get_one::<String>("input")
            .map(PathBuf::from)
            .expect("input is required"),
    );
    options.tree = matches.get_one::<String>("tree").map(PathBuf::from);
    options.out = matches.get_one::<String>("out").map(PathBuf::from);
    options.map_out = matches.get_one::<String>("map-out").map(PathBuf::from);
    options.literate = matches.get_flag("literate");

    let conversion = run(&options)?;

    for suggestion in &conversion.suggestions {
        eprintln!("{}: {}", suggestion.code, suggestion.message);
    }
    if options.out.is_none() {
        print!("{}", conversion.code);
    }
    Ok(())
}
