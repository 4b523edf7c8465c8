//! escript runtime tools entry point.

mod cli;

use std::path::{Path, PathBuf};

use clap::Parser;
use cli::{Cli, Command};
use escript::config::CompilerConfig;
use escript::inspect::{demo_value, inspect_all, write_packed};
use escript_value::Runtime;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    match cli.command {
        Command::Config { path, json } => show_config(path.as_deref(), json),
        Command::Inspect { files } => inspect_files(files),
        Command::PackDemo { file } => pack_demo(&file),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show_config(path: Option<&Path>, json: bool) {
    let config = match path {
        Some(path) => match CompilerConfig::read(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading configuration: {e}");
                std::process::exit(1);
            }
        },
        None => CompilerConfig::from_env(),
    };

    let rendered = if json {
        serde_json::to_string_pretty(&config)
    } else {
        config.to_cfg_string()
    };
    match rendered {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("Error rendering configuration: {e}");
            std::process::exit(1);
        }
    }
}

fn inspect_files(files: Vec<PathBuf>) {
    let rt = Runtime::new();
    let mut failed = false;

    for (path, result) in inspect_all(&rt, files) {
        match result {
            Ok(value) => {
                println!("{}: {} {}", path.display(), value.kind(), value.formatted_string_rep());
            }
            Err(e) => {
                eprintln!("{e}");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn pack_demo(file: &Path) {
    let rt = Runtime::new();
    let value = demo_value(&rt);
    let bytes = match write_packed(&value, file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error writing '{}': {e}", file.display());
            std::process::exit(1);
        }
    };
    tracing::info!(path = %file.display(), bytes, "Wrote packed value");
    println!("{}", value.formatted_string_rep());
}
