//! mcp-hello: entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use mcp_hello::config::{parse_issuers, parse_list, ServerConfig};
use mcp_hello::proxy::ProxyTransport;
use mcp_hello::server::Server;
use mcp_hello::transport::HttpTransport;
use mcp_hello::types::InitializeResult;

#[derive(Parser)]
#[command(
    name = "mcp-hello",
    about = "Authenticated MCP server over HTTP with a greeting tool",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server over HTTP (default).
    Serve {
        /// Listen address (host:port). Defaults to 0.0.0.0:$PORT or 0.0.0.0:8080.
        #[arg(long)]
        addr: Option<String>,

        /// Require a verified bearer token on /mcp and /hello.
        /// Also reads REQUIRE_AUTH.
        #[arg(long)]
        require_auth: bool,

        /// Audience the token must carry. Also reads AUTH_AUDIENCE.
        #[arg(long)]
        audience: Option<String>,

        /// Accepted token issuers, comma separated. Also reads AUTH_ISSUERS.
        #[arg(long)]
        issuers: Option<String>,

        /// JWKS URL of the token issuer. Also reads AUTH_JWKS_URL.
        #[arg(long)]
        jwks_url: Option<String>,

        /// Caller emails allowed in, comma separated; others get 403.
        /// Also reads AUTH_ALLOWED_EMAILS.
        #[arg(long)]
        allowed_emails: Option<String>,

        /// Allow cross-origin requests from any origin.
        #[arg(long)]
        cors: bool,
    },

    /// Start the proxy that forwards to an upstream /hello.
    ServeProxy {
        /// Listen address (host:port).
        #[arg(long)]
        addr: Option<String>,

        /// Upstream base URL. Also reads SERVER_URL.
        #[arg(long)]
        upstream: Option<String>,

        /// Identity token sent upstream when auth is requested.
        /// Also reads UPSTREAM_ID_TOKEN.
        #[arg(long)]
        upstream_token: Option<String>,
    },

    /// Print server info, methods and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let mut config = ServerConfig::from_env()?;

    match cli.command.unwrap_or(Commands::Serve {
        addr: None,
        require_auth: false,
        audience: None,
        issuers: None,
        jwks_url: None,
        allowed_emails: None,
        cors: false,
    }) {
        Commands::Serve {
            addr,
            require_auth,
            audience,
            issuers,
            jwks_url,
            allowed_emails,
            cors,
        } => {
            // CLI flag > env var > default
            if let Some(addr) = addr {
                config.http.addr = addr;
            }
            config.auth.required |= require_auth;
            config.http.cors |= cors;
            if let Some(audience) = audience {
                config.auth.expected_audience = audience;
            }
            if let Some(issuers) = issuers {
                config.auth.issuers = parse_issuers("--issuers", &issuers)?;
            }
            if let Some(jwks_url) = jwks_url {
                config.auth.jwks_url = jwks_url;
            }
            if let Some(emails) = allowed_emails {
                config.auth.allowed_emails = parse_list(&emails);
            }

            tracing::info!("mcp-hello MCP server");
            let server = Arc::new(Server::from_config(&config.auth));
            HttpTransport::new(server, config.http).run().await?;
        }

        Commands::ServeProxy {
            addr,
            upstream,
            upstream_token,
        } => {
            if let Some(upstream) = upstream {
                config.upstream.base_url = upstream;
            }
            if upstream_token.is_some() {
                config.upstream.id_token = upstream_token;
            }
            let addr = addr.unwrap_or(config.http.addr);

            tracing::info!("mcp-hello proxy");
            ProxyTransport::new(&config.upstream).run(&addr).await?;
        }

        Commands::Info => {
            let server = Server::from_config(&config.auth);
            let init = InitializeResult::default_result();
            let tools = server.invoker().descriptors();
            let info = serde_json::json!({
                "server": init.server_info,
                "protocol_version": init.protocol_version,
                "capabilities": init.capabilities,
                "methods": server.dispatcher().registry().method_names(),
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "auth_required": config.auth.required,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mcp-hello", &mut std::io::stdout());
        }
    }

    Ok(())
}
