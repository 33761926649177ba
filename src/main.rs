#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use costgate::{chat, gateway, mock, Config};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `costgate` - context-aware query gateway for cost and asset data.
#[derive(Parser, Debug)]
#[command(name = "costgate")]
#[command(version)]
#[command(about = "Context-aware query gateway for cost allocation, cloud cost and asset data.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the query gateway
    #[command(long_about = "\
Start the query gateway.

Serves /allocations, /cloudCosts and /assets. GET answers simple \
parameter lookups; POST accepts structured queries whose session id \
is used to track conversation history. Bind address defaults to the \
values in your config file (gateway.host / gateway.port).

Examples:
  costgate gateway                  # use config defaults
  costgate gateway -p 8080          # listen on port 8080
  costgate gateway --host 0.0.0.0   # bind to all interfaces
  costgate gateway -p 0             # random available port")]
    Gateway {
        /// Port to listen on (use 0 for random available port); defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Start the mock data source
    #[command(long_about = "\
Start the mock data source.

Serves a small fixed dataset on /allocations, /cloudCosts and /assets, \
applying the same filters the gateway sends. Point upstream.base_url \
at it for local development.

Examples:
  costgate mock
  costgate mock -p 9105")]
    Mock {
        /// Port to listen on; defaults to config mock.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config mock.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Start the interactive conversation client
    #[command(long_about = "\
Start the interactive conversation client.

Prompts for an endpoint, a query and that endpoint's filters, then posts \
a structured query to the gateway under a fixed session id and prints \
the conversation context and returned records.

Examples:
  costgate chat
  costgate chat --url http://10.0.0.5:9004 --session ops-review")]
    Chat {
        /// Gateway base URL; defaults to chat.gateway_url or the local gateway
        #[arg(long)]
        url: Option<String>,

        /// Session identifier; defaults to chat.session_id
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show effective configuration
    Status,

    /// Manage configuration
    #[command(long_about = "\
Manage costgate configuration.

Use 'schema' to dump the full JSON Schema for the config file, which \
documents every available key, type, and default value.

Examples:
  costgate config schema              # print JSON Schema to stdout
  costgate config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    #[command(long_about = "\
Generate shell completion scripts for `costgate`.

The script is printed to stdout so it can be sourced directly:

Examples:
  source <(costgate completions bash)
  costgate completions zsh > ~/.zfunc/_costgate
  costgate completions fish > ~/.config/fish/completions/costgate.fish")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("COSTGATE_CONFIG_DIR", config_dir);
    }

    // Completions must remain stdout-only and should not load config or initialize logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let default_level = if matches!(cli.command, Commands::Chat { .. }) {
        "warn"
    } else {
        "info"
    };
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load_or_init().await?;

    match cli.command {
        Commands::Completions { .. } => unreachable!(),

        Commands::Gateway { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting costgate gateway on {host} (random port)");
            } else {
                info!("Starting costgate gateway on {host}:{port}");
            }
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Mock { port, host } => {
            let port = port.unwrap_or(config.mock.port);
            let host = host.unwrap_or_else(|| config.mock.host.clone());
            info!("Starting mock data source on {host}:{port}");
            mock::run_mock(&host, port).await
        }

        Commands::Chat { url, session } => chat::run_chat(&config, url, session).await,

        Commands::Status => {
            println!("costgate status");
            println!();
            println!("Version:      {}", env!("CARGO_PKG_VERSION"));
            println!("Config:       {}", config.config_path.display());
            println!();
            println!(
                "Gateway:      {}:{} (body limit {} bytes)",
                config.gateway.host, config.gateway.port, config.gateway.max_body_bytes
            );
            println!(
                "Upstream:     {} (timeout {}s)",
                config.upstream.base_url, config.upstream.timeout_secs
            );
            println!(
                "History:      {}",
                if config.sessions.max_history == 0 {
                    "unbounded".to_string()
                } else {
                    format!("last {} queries per session", config.sessions.max_history)
                }
            );
            println!("Mock:         {}:{}", config.mock.host, config.mock.port);
            println!(
                "Chat:         {} (session {})",
                config.chat_gateway_url(),
                config.chat.session_id
            );
            Ok(())
        }

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Schema => {
                let schema = schemars::schema_for!(Config);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&schema).expect("failed to serialize JSON Schema")
                );
                Ok(())
            }
        },
    }
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
