use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use vitrine::{ShapeSpec, SiteBuilder, SiteConfig};

#[derive(Parser)]
#[command(name = "vitrine", version, about = "Render shape trees with themed templates")]
struct Cli {
    /// Log resolution decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a shape file to HTML on stdout
    Render {
        /// Site file
        #[arg(short, long)]
        config: PathBuf,

        /// Shape file (YAML)
        shape: PathBuf,

        /// Theme to render with, instead of the site's current theme
        #[arg(short, long)]
        theme: Option<String>,
    },
    /// List the bindings of every theme
    Tables {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match cli.command {
        Command::Render {
            config,
            shape,
            theme,
        } => render(config, shape, theme).await,
        Command::Tables { config } => tables(config).await,
    }
}

async fn render(config: PathBuf, shape: PathBuf, theme: Option<String>) -> anyhow::Result<()> {
    let site_config = SiteConfig::from_file(&config)?;
    let mut builder = SiteBuilder::new(site_config);
    if let Some(theme) = theme {
        builder = builder.theme(theme);
    }
    let site = builder.build()?;

    let yaml = fs::read_to_string(&shape)
        .with_context(|| format!("failed to read shape file {}", shape.display()))?;
    let spec = ShapeSpec::from_yaml(&yaml)
        .with_context(|| format!("invalid shape file {}", shape.display()))?;

    let html = site.render(&mut spec.into_shape()).await?;
    println!("{html}");
    Ok(())
}

async fn tables(config: PathBuf) -> anyhow::Result<()> {
    let site = SiteBuilder::new(SiteConfig::from_file(&config)?).build()?;

    let mut themes: Vec<Option<String>> = vec![None];
    themes.extend(site.config().themes.iter().map(|t| Some(t.name.clone())));

    for theme in themes {
        let bindings = site.bindings(theme.as_deref()).await?;
        println!("{}", theme.as_deref().unwrap_or("(no theme)"));
        for (name, source) in bindings {
            println!("  {name:<32} {source}");
        }
    }
    Ok(())
}
