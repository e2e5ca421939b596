// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use postsheet_app::{AppState, RowStore};
use postsheet_http::{Dispatcher, HttpTransport};
use runtime::SheetRuntime;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

const DEMO_SEED: u64 = 2026;
const DEMO_ROWS: usize = 24;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `postsheet --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let dispatch_config = config.dispatch_config()?;
    let rule = config.auto_reply_rule()?;
    let transport = HttpTransport::new(config.http_timeout()?).with_context(|| {
        format!(
            "invalid [http] config in {}; fix endpoint/token/timeout values",
            options.config_path.display()
        )
    })?;
    let log_path = config.log_path()?;
    if options.check_only {
        return Ok(());
    }

    logging::init(&log_path)
        .with_context(|| format!("start logging to {}", log_path.display()))?;
    info!(
        config = %options.config_path.display(),
        endpoint = dispatch_config.endpoint(),
        demo = options.demo,
        "starting postsheet"
    );
    if config.uses_placeholder_token() {
        warn!("http.token is still the placeholder value; posts will likely be rejected");
    }

    let mut store = if options.demo {
        postsheet_testkit::seeded_store(DEMO_SEED, DEMO_ROWS)
    } else {
        RowStore::with_blank_rows(config.initial_rows())
    };

    let dispatcher = Dispatcher::new(dispatch_config, transport).with_rule(rule);
    let mut runtime = SheetRuntime::new(dispatcher, config.export_dir());
    let mut state = AppState::default();
    let result = postsheet_tui::run_app(&mut state, &mut store, &mut runtime);
    info!(rows = store.len(), "postsheet exiting");
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("postsheet: account rows, bulk posting, exports");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Start with generated sample rows");
    println!("  --check                  Validate config and exit");
    println!("  --help                   Show this help");
    println!();
    println!("Logs go to [log].path; set RUST_LOG=debug for more detail.");
}
