//! xmlcursor - inspect, filter and split XML files without loading them whole.

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xml_cursor::Config;

#[derive(Parser, Debug)]
#[command(name = "xmlcursor")]
#[command(version)]
#[command(about = "Streaming XML inspection and splitting")]
struct Cli {
    /// TOML file with [reader] and [sequence] options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every node with its kind and depth.
    Dump {
        file: PathBuf,
    },

    /// Print matching elements as markup.
    Elements {
        file: PathBuf,

        /// Element name; all elements when omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Keep elements whose attribute has one of the values (NAME=V1,V2)
        #[arg(long, value_name = "NAME=VALUES")]
        attr: Option<String>,

        /// Keep elements whose attribute matches a regular expression (NAME=REGEX)
        #[arg(long, value_name = "NAME=REGEX")]
        pattern: Option<String>,

        /// Keep elements selected by an XPath expression over their ancestors
        #[arg(long)]
        xpath: Option<String>,

        /// Print node paths instead of markup
        #[arg(long)]
        paths: bool,
    },

    /// List the child elements of every matching parent element.
    Children {
        file: PathBuf,

        /// Parent element name
        #[arg(short, long)]
        parent: String,

        /// Child element name; all children when omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Include all descendants, not only direct children
        #[arg(short, long)]
        descendants: bool,
    },

    /// Split a file of concatenated XML documents into one file per document.
    Split {
        file: PathBuf,

        /// Output directory (created if missing)
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// Re-serialize a document node by node.
    Copy {
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xml_cursor=info,xmlcursor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Dump { file } => commands::dump(&file, &config, &mut out),
        Command::Elements {
            file,
            name,
            attr,
            pattern,
            xpath,
            paths,
        } => {
            let query = commands::ElementQuery {
                name,
                attr,
                pattern,
                xpath,
                paths,
            };
            commands::elements(&file, &config, &query, &mut out)
        }
        Command::Children {
            file,
            parent,
            name,
            descendants,
        } => commands::children(&file, &config, &parent, name.as_deref(), descendants, &mut out),
        Command::Split { file, out_dir } => {
            commands::split(&file, &config, &out_dir, &mut out).map(|_| ())
        }
        Command::Copy { file, output } => commands::copy(&file, &config, output.as_deref(), &mut out),
    }
}
