// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-require CLI - drive the require/load engine from the command line

mod script;

use clap::Parser;
use owo_colors::OwoColorize;
use rayon::prelude::*;
use script::ScriptRuntime;
use spacey_load::{Executor, LoadConfig, LoadError, LoadService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "spacey-require",
    about = "Require and load units with the Spacey load service",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Prepend a directory to the search path
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<String>,

    /// Require a name (repeatable)
    #[arg(short = 'r', long = "require", value_name = "NAME")]
    requires: Vec<String>,

    /// Load a file, running it even if loaded before (repeatable)
    #[arg(short = 'l', long = "load", value_name = "FILE")]
    loads: Vec<String>,

    /// Run loaded files in an isolated scope
    #[arg(long)]
    isolate: bool,

    /// Require all names in parallel on this many threads
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the search path and exit
    #[arg(long)]
    print_path: bool,

    /// Print loaded features when done
    #[arg(long)]
    print_features: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = LoadConfig::load(cli.config.as_deref())?;
    config.prepend_paths.splice(0..0, cli.include.iter().cloned());
    config.verbose |= cli.verbose;

    // Initialize logging
    let filter = if config.verbose {
        "spacey_load=debug"
    } else if config.debug_load_timings {
        "spacey_load=info"
    } else {
        "spacey_load=warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let service = LoadService::new(config, Arc::new(ScriptRuntime));

    if cli.print_path {
        for entry in service.search_path().snapshot() {
            println!("{}", entry);
        }
        return Ok(());
    }

    if let Err(e) = run(&cli, &service) {
        if let LoadError::Exit(status) = e {
            std::process::exit(status);
        }
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }

    if cli.print_features {
        for feature in service.loaded_features() {
            println!("{}", feature);
        }
    }

    Ok(())
}

fn run(cli: &Cli, service: &LoadService) -> spacey_load::Result<()> {
    match cli.jobs {
        Some(jobs) if cli.requires.len() > 1 => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| LoadError::Config(e.to_string()))?;

            // Each worker is its own executor; report the first failure in
            // command-line order.
            let outcomes: Vec<_> = pool.install(|| {
                cli.requires
                    .par_iter()
                    .map(|name| (name, service.require(&Executor::new(), name)))
                    .collect()
            });
            for (name, outcome) in outcomes {
                report(cli, name, outcome?);
            }
        }
        _ => {
            let executor = Executor::new();
            for name in &cli.requires {
                let loaded = service.require(&executor, name)?;
                report(cli, name, loaded);
            }
        }
    }

    let executor = Executor::new();
    for file in &cli.loads {
        service.load(&executor, file, cli.isolate)?;
    }
    Ok(())
}

fn report(cli: &Cli, name: &str, loaded: bool) {
    if !cli.verbose {
        return;
    }
    if loaded {
        eprintln!("{} {}", "loaded".green().bold(), name);
    } else {
        eprintln!("{} {}", "already loaded".dimmed(), name.dimmed());
    }
}
