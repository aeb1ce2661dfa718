mod host;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser as _, Subcommand};
use tagplate::{Context, Parser, ParserConfig, Value};

use crate::host::Session;

#[derive(clap::Parser)]
#[command(name = "tagplate")]
#[command(about = "tagplate: render text templates with command tags")]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Tag configuration file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template
    Render {
        /// Input template
        path: PathBuf,

        /// JSON file whose top-level keys are bound as names
        #[arg(long)]
        context: Option<PathBuf>,

        /// Bind a name; the value is read as JSON, or as a string if it is not JSON
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a template for errors without running it
    Check {
        /// Input template
        path: PathBuf,
    },

    /// Print the script generated for a template
    Script {
        /// Input template
        path: PathBuf,
    },

    /// Print the tokens of a template
    Tokens {
        /// Input template
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<()> {
    let parser = load_parser(cli.config.as_deref())?;

    match cli.command {
        Command::Render {
            path,
            context,
            vars,
            output,
        } => cmd_render(&parser, &path, context.as_deref(), vars, output.as_deref()),
        Command::Check { path } => cmd_check(&parser, &path),
        Command::Script { path } => cmd_script(&parser, &path),
        Command::Tokens { path } => cmd_tokens(&parser, &path),
    }
}

fn load_parser(config: Option<&Path>) -> Result<Parser> {
    let Some(path) = config else {
        return Ok(Parser::new());
    };

    let text = read_source(path)?;
    let config: ParserConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?,
        _ => toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?,
    };
    log::info!("loaded tag config from {}", path.display());
    Ok(Parser::with_config(config)?)
}

fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(anyhow!("file not found: {}", path.display()));
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn parse_var(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{arg}'")),
    }
}

fn build_context(context: Option<&Path>, vars: Vec<(String, String)>) -> Result<Context> {
    let mut entries = match context {
        Some(path) => {
            let json: serde_json::Value = serde_json::from_str(&read_source(path)?)
                .with_context(|| format!("invalid context {}", path.display()))?;
            Context::from_json(json)?
        }
        None => Context::new(),
    };

    for (name, value) in vars {
        let value = serde_json::from_str::<serde_json::Value>(&value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value));
        entries.insert(name, value);
    }
    Ok(entries)
}

fn cmd_render(
    parser: &Parser,
    path: &Path,
    context: Option<&Path>,
    vars: Vec<(String, String)>,
    output: Option<&Path>,
) -> Result<()> {
    let source = read_source(path)?;
    let entries = build_context(context, vars)?;
    let session = Session::new(parser.clone(), path, entries);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let rendered = runtime.block_on(session.render(&source))?;

    match output {
        Some(out) => {
            fs::write(out, &rendered).with_context(|| format!("writing {}", out.display()))?;
            log::info!("rendered {} to {}", path.display(), out.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_check(parser: &Parser, path: &Path) -> Result<()> {
    let source = read_source(path)?;
    parser.check(&source)?;
    eprintln!("OK: {}", path.display());
    Ok(())
}

fn cmd_script(parser: &Parser, path: &Path) -> Result<()> {
    let source = read_source(path)?;
    print!("{}", parser.generate_script(&source)?);
    Ok(())
}

fn cmd_tokens(parser: &Parser, path: &Path) -> Result<()> {
    let source = read_source(path)?;
    for token in parser.tokenize(&source)? {
        println!("{token:?}");
    }
    Ok(())
}
