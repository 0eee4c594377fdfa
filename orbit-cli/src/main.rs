use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orbit_cli::{
    Rendered, ast_cmd, compile_cmd, hydrate_cmd, load_config, load_data, read_source, render_cmd,
    tokens_cmd,
};

#[derive(Parser)]
#[command(name = "orbit", version, about = "Orbit template tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RuntimeArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Do not log diagnostics (they are still printed at the end)
    #[arg(long)]
    silent: bool,
    /// Directive prefix, e.g. `m-`
    #[arg(long)]
    prefix: Option<String>,
    /// Instance data as inline JSON
    #[arg(long)]
    data: Option<String>,
    /// Instance data from a JSON file
    #[arg(long, conflicts_with = "data")]
    data_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a template.
    Tokens { input: PathBuf },
    /// Print the parsed AST and any recovery diagnostics.
    Ast {
        input: PathBuf,
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Print the generated render IR.
    Compile {
        input: PathBuf,
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Render a template against data and print the markup.
    Render {
        input: PathBuf,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
    /// Mount onto a pre-rendered page and print the page after hydration.
    Hydrate {
        page: PathBuf,
        /// Mount anchor: `#id` or a tag name
        #[arg(long, default_value = "#app")]
        el: String,
        /// Template to mount; defaults to the anchor's own markup
        #[arg(long)]
        template: Option<PathBuf>,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ORBIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_rendered(rendered: Rendered) {
    println!("{}", rendered.html);
    for d in rendered.diagnostics {
        eprintln!("{:?}: {}", d.kind, d.message);
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Tokens { input } => println!("{}", tokens_cmd(&read_source(&input)?)),
        Commands::Ast { input, prefix } => println!("{}", ast_cmd(&read_source(&input)?, &prefix)),
        Commands::Compile { input, prefix } => {
            println!("{}", compile_cmd(&read_source(&input)?, &prefix))
        }
        Commands::Render { input, runtime } => {
            let template = read_source(&input)?;
            let config = load_config(runtime.config.as_deref(), runtime.silent, runtime.prefix.as_deref())?;
            let data = load_data(runtime.data.as_deref(), runtime.data_file.as_deref())?;
            print_rendered(render_cmd(&template, data, config)?);
        }
        Commands::Hydrate {
            page,
            el,
            template,
            runtime,
        } => {
            let page = read_source(&page)?;
            let template = template.as_deref().map(read_source).transpose()?;
            let config = load_config(runtime.config.as_deref(), runtime.silent, runtime.prefix.as_deref())?;
            let data = load_data(runtime.data.as_deref(), runtime.data_file.as_deref())?;
            print_rendered(hydrate_cmd(&page, &el, template.as_deref(), data, config)?);
        }
    }
    Ok(())
}
