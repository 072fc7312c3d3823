use clap::Parser as ClapParser;
use keyturn_common::{Credentials, Outcome};
use keyturn_engine::config::{ConfigLoader, FlowConfig};
use keyturn_engine::flow::LoginFlow;
use keyturn_wd::adapter::WdSession;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file. Defaults to ./keyturn.yaml, then
    /// ~/.keyturn/config.yaml, then built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Login page URL, overriding the configured one.
    #[arg(long)]
    url: Option<String>,

    /// Account to verify.
    #[arg(short, long)]
    username: String,

    /// Password. Falls back to the KEYTURN_PASSWORD environment variable.
    #[arg(short, long)]
    password: Option<String>,

    /// URL of an external WebDriver server. If not provided, chromedriver
    /// will be launched automatically.
    #[arg(short, long)]
    webdriver_url: Option<String>,

    /// Run the browser headed, overriding the configured session options.
    #[arg(long)]
    headed: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

async fn load_config(args: &Args) -> Result<FlowConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(url) = &args.url {
        config.urls.primary = url.clone();
    }
    if args.headed {
        config.session.headless = false;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&args).await?;

    let password = match args.password {
        Some(password) => password,
        None => std::env::var("KEYTURN_PASSWORD")
            .map_err(|_| "password required via --password or KEYTURN_PASSWORD")?,
    };
    let credentials = Credentials::new(&args.username, &password);

    let mut session = if let Some(url) = &args.webdriver_url {
        info!("Using external WebDriver at {}", url);
        WdSession::connect(url, &config.session).await?
    } else {
        info!("Auto-launching chromedriver...");
        WdSession::launch(&config.session).await?
    };

    let outcome = LoginFlow::new(config)
        .execute(&mut session, &credentials)
        .await?;

    match outcome {
        Outcome::Success => {
            info!("login verified");
            Ok(())
        }
        Outcome::Failure(diagnostics) => {
            error!(%diagnostics, "login failed");
            std::process::exit(1);
        }
        Outcome::TimedOut(diagnostics) => {
            error!(%diagnostics, "login verification timed out");
            std::process::exit(2);
        }
    }
}
