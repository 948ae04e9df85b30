use clap::{Parser, Subcommand};
use folio::server::StaticServer;
use folio::{build, config, output};
use std::path::PathBuf;
use std::time::Duration;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Static site builder for personal portfolio sites")]
#[command(long_about = "\
Static site builder for personal portfolio sites

Markdown content and handwritten assets go in; minified HTML, CSS, and JS
come out, ready to drop on any file server.

Site structure:

  site/
  ├── folio.toml                   # Site config (optional, sparse overrides)
  ├── content/                     # One .md file per page; index.md is home
  │   ├── index.md
  │   └── about.md
  ├── static/
  │   ├── css/main.css             # Every stylesheet → css/<name>.min.css
  │   ├── js/main.js               # Primary script → js/main.min.js
  │   ├── favicon.svg              # → optimized .svg + multi-res .ico
  │   ├── sitemap.xml              # <lastmod> refreshed to the build date
  │   └── robots.txt               # Root-level files pass through as-is
  ├── images/                      # Copied verbatim
  ├── case-studies/                # Copied verbatim
  └── assets/                      # Copied verbatim

Run 'folio build' to produce dist/, 'folio serve' to preview it locally.")]
#[command(version = version_string())]
struct Cli {
    /// Site source directory
    #[arg(long, default_value = "site", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: clean → assets → pages
    Build,
    /// Remove the output directory
    Clean,
    /// Serve the output directory locally (Ctrl-C to stop)
    Serve {
        /// Requested port; probed upward when busy
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate config and source layout without building
    Check,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);

            println!("==> Building {}", cli.source.display());
            let report = build::build(&build::BuildOptions {
                source: cli.source.clone(),
                output: cli.output.clone(),
                date: None,
            })?;
            output::print_build_output(&report);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Clean => {
            if cli.output.exists() {
                std::fs::remove_dir_all(&cli.output)?;
                println!("Removed {}", cli.output.display());
            } else {
                println!("Nothing to clean: {}", cli.output.display());
            }
        }
        Command::Serve { port } => {
            let site_config = config::load_config(&cli.source)?;
            let requested = port.unwrap_or(site_config.server.port);
            let server = StaticServer::with_shutdown_timeout(
                &cli.output,
                Duration::from_millis(site_config.server.shutdown_timeout_ms),
            );
            let bound = server.start(requested)?;
            if bound != requested {
                println!("Port {requested} busy, using {bound}");
            }
            let healthy =
                server.is_healthy(Duration::from_millis(site_config.server.health_timeout_ms));
            println!("Serving {} at http://127.0.0.1:{bound}/", cli.output.display());
            if !healthy {
                eprintln!("Warning: readiness probe failed");
            }

            let (tx, rx) = std::sync::mpsc::channel();
            ctrlc::set_handler(move || {
                let _ = tx.send(());
            })?;
            rx.recv().ok();
            println!("\nShutting down");
            server.stop()?;
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let site_config = config::load_config(&cli.source)?;
            let content = cli.source.join("content");
            if !content.is_dir() {
                return Err(format!("content directory not found: {}", content.display()).into());
            }
            println!("Config OK: \"{}\" ({})", site_config.title, site_config.language);
            println!("==> Site is valid");
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
