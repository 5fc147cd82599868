// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use config::Config;
use fmdesk_api::Client;
use fmdesk_app::{compute_window, render_window};
use runtime::{ConsoleRuntime, ListOptions, MutationInput, parse_filter, parse_resource};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FMDESK_LOG";

#[derive(Debug, Parser)]
#[command(name = "fmdesk", version, about = "Facilities console for the FM backend")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the resolved config path and exit
    #[arg(long)]
    print_config_path: bool,

    /// Print a starter config and exit
    #[arg(long)]
    print_example_config: bool,

    /// Validate the config, then exit
    #[arg(long)]
    check: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the resources the console knows about
    Resources,
    /// Fetch one page of a resource
    List(ListArgs),
    /// Page and search a resource interactively (:next, :prev, :page N, :quit)
    Browse { resource: String },
    /// Fetch a single record
    Show { resource: String, id: i64 },
    /// Create a record from JSON fields
    Create {
        resource: String,
        #[command(flatten)]
        body: BodyArgs,
    },
    /// Replace a record's fields, or patch them with --patch
    Update {
        resource: String,
        id: i64,
        #[command(flatten)]
        body: BodyArgs,
        #[arg(long)]
        patch: bool,
    },
    /// Delete one or more records
    Delete {
        resource: String,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Print the page-button layout for a position
    Pages { current: i64, total: i64 },
}

#[derive(Debug, Args)]
struct ListArgs {
    resource: String,
    #[arg(long)]
    page: Option<i64>,
    #[arg(long)]
    per_page: Option<i64>,
    #[arg(long)]
    search: Option<String>,
    /// key=value; repeatable
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    filters: Vec<String>,
    /// Print raw JSON items
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct BodyArgs {
    /// Record fields as a JSON object
    #[arg(long, value_name = "JSON")]
    data: String,
    /// File to upload with the record (company logo or banner image)
    #[arg(long, value_name = "PATH")]
    attach: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(error) = run(cli) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .parse_lossy("")
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    if cli.print_config_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if cli.print_example_config {
        print!("{}", Config::example_config(&config_path));
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let command = match cli.command {
        Some(Command::Resources) => return runtime::print_resources(&mut out),
        Some(Command::Pages { current, total }) => return print_pages(&mut out, current, total),
        other => other,
    };

    let config = Config::load(&config_path).with_context(|| {
        format!(
            "load config {}; run `fmdesk --print-example-config` to generate a v1 template",
            config_path.display()
        )
    })?;

    if cli.check {
        let context = config.api_context()?;
        writeln!(out, "config ok: {}", config_path.display())?;
        writeln!(out, "backend: {}", context.base_url())?;
        writeln!(
            out,
            "token: {}",
            if context.has_token() { "set" } else { "missing" }
        )?;
        writeln!(out, "timeout: {:?}", config.timeout()?)?;
        writeln!(out, "page size: {}", config.page_size())?;
        writeln!(out, "search debounce: {:?}", config.search_debounce()?)?;
        return Ok(());
    }

    let Some(command) = command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let client = Client::new(config.api_context()?, config.timeout()?)?;
    debug!(base_url = client.base_url(), "backend client ready");
    let runtime = ConsoleRuntime::new(&client, config.page_size())
        .with_search_debounce(config.search_debounce()?);
    execute(&runtime, command, &mut out)
}

fn print_pages(out: &mut dyn Write, current: i64, total: i64) -> Result<()> {
    writeln!(out, "{}", render_window(&compute_window(current, total), current))?;
    Ok(())
}

fn execute(runtime: &ConsoleRuntime<'_>, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Resources => runtime::print_resources(out),
        Command::Pages { current, total } => print_pages(out, current, total),
        Command::List(args) => {
            let kind = parse_resource(&args.resource)?;
            let filters = args
                .filters
                .iter()
                .map(|raw| parse_filter(raw))
                .collect::<Result<Vec<_>>>()?;
            let options = ListOptions {
                page: args.page,
                per_page: args.per_page,
                search: args.search,
                filters,
                json: args.json,
            };
            runtime.list(kind, &options, out)
        }
        Command::Browse { resource } => {
            runtime.browse(parse_resource(&resource)?, BufReader::new(io::stdin()), out)
        }
        Command::Show { resource, id } => runtime.show(parse_resource(&resource)?, id, out),
        Command::Create { resource, body } => {
            let input = MutationInput {
                data: &body.data,
                attach: body.attach.as_deref(),
                patch: false,
            };
            runtime.create(parse_resource(&resource)?, &input, out)
        }
        Command::Update {
            resource,
            id,
            body,
            patch,
        } => {
            let input = MutationInput {
                data: &body.data,
                attach: body.attach.as_deref(),
                patch,
            };
            runtime.update(parse_resource(&resource)?, id, &input, out)
        }
        Command::Delete { resource, ids } => runtime.delete(parse_resource(&resource)?, &ids, out),
    }
}
