use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::redirect::Policy;

use gatekeeper::config::{loader, GatekeeperConfig, SessionProvider};
use gatekeeper::routing::RouteTable;
use gatekeeper::session::jwt::MIN_SECRET_LEN;
use gatekeeper::session::{Identity, JwtSessions, Role, UserStatus};

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Inspect and exercise a gatekeeper configuration", long_about = None)]
struct Cli {
    /// TOML config file. Defaults plus RATE_LIMIT_* env vars when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config and print the compiled route table
    Check,
    /// Show how paths would be classified
    Classify {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Mint a session token for the jwt provider
    Token {
        /// Signing secret; defaults to `session.jwt_secret` from the config
        #[arg(long, env = "GATEKEEPER_JWT_SECRET", hide_env_values = true)]
        secret: Option<String>,
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "USER")]
        role: Role,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
    /// Send requests to a running gatekeeper and print the gate's answers
    Probe {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
        #[arg(default_value = "/")]
        path: String,
        /// Session token sent as the session cookie
        #[arg(short, long)]
        token: Option<String>,
        #[arg(short, long, default_value = "GET")]
        method: reqwest::Method,
        /// Number of requests to send, to watch a budget run out
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => loader::from_env()?,
    };

    match cli.command {
        Commands::Check => {
            let table = compile(&config)?;
            println!("config OK");
            println!(
                "default API rule: {}/{}ms, rate limiting {}",
                config.rate_limit.max,
                config.rate_limit.window_ms,
                if config.rate_limit.enabled { "on" } else { "off" }
            );
            for (path, route) in table.entries() {
                println!(
                    "{:<24} {:<16} {:<5} {:<18} {}",
                    path,
                    route.name,
                    route.class.surface.as_str(),
                    route.class.access.to_string(),
                    route.rate_limit.map(|r| r.to_string()).unwrap_or_else(|| "-".into())
                );
            }
        }
        Commands::Classify { paths } => {
            let table = compile(&config)?;
            for path in paths {
                let route = table.classify(&path);
                println!(
                    "{path} -> {} ({}, {}, limit {})",
                    route.name,
                    route.class.surface.as_str(),
                    route.class.access,
                    route.rate_limit.map(|r| r.to_string()).unwrap_or_else(|| "none".into())
                );
            }
        }
        Commands::Token {
            secret,
            id,
            email,
            name,
            role,
            ttl_secs,
        } => {
            let secret = match secret {
                Some(secret) => secret,
                None if config.session.provider == SessionProvider::Jwt => config.session.jwt_secret.clone(),
                None => return Err("pass --secret or configure [session] provider = \"jwt\"".into()),
            };
            if secret.len() < MIN_SECRET_LEN {
                return Err(format!("secret must be at least {MIN_SECRET_LEN} bytes").into());
            }
            let sessions = JwtSessions::new(&secret, &config.session.cookie_name);
            let identity = Identity {
                id,
                email,
                display_name: name,
                role,
                status: UserStatus::Active,
            };
            println!("{}", sessions.issue(&identity, Duration::from_secs(ttl_secs))?);
        }
        Commands::Probe {
            url,
            path,
            token,
            method,
            count,
        } => {
            let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
            let mut headers = HeaderMap::new();
            if let Some(token) = token {
                headers.insert(
                    COOKIE,
                    HeaderValue::from_str(&format!("{}={token}", config.session.cookie_name))?,
                );
            }

            let target = format!("{}{}", url.trim_end_matches('/'), path);
            for i in 1..=count {
                let res = client
                    .request(method.clone(), &target)
                    .headers(headers.clone())
                    .send()
                    .await?;
                print_response(i, count, res).await?;
            }
        }
    }

    Ok(())
}

async fn print_response(i: u32, count: u32, res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if count > 1 {
        print!("[{i}/{count}] ");
    }
    println!("{}", res.status());
    for name in ["location", "retry-after", "x-request-id", "strict-transport-security", "content-security-policy"] {
        if let Some(value) = res.headers().get(name).and_then(|v| v.to_str().ok()) {
            println!("  {name}: {value}");
        }
    }
    let body = res.text().await?;
    if !body.is_empty() && count == 1 {
        println!("\n{body}");
    }
    Ok(())
}

fn compile(config: &GatekeeperConfig) -> Result<RouteTable, Box<dyn std::error::Error>> {
    Ok(RouteTable::compile(&config.effective_routes(), config.rate_limit.default_rule())?)
}
