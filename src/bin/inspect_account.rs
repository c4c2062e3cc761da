use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reddit_outreach::config;
use reddit_outreach::reachability::Classifier;
use reddit_outreach::reddit::RedditClient;

#[derive(Parser, Debug)]
#[command(about = "Show the reachability probes for one or more Reddit accounts")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Account handles to inspect (with or without the u/ prefix)
    #[arg(required = true)]
    handles: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = RedditClient::from_config(&cfg.reddit)?;
    client.login().await?;

    let classifier = Classifier::new(&client, Duration::from_millis(cfg.reddit.probe_timeout_ms));
    for raw in &args.handles {
        let handle = raw.trim().trim_start_matches("/u/").trim_start_matches("u/");
        let trace = classifier.trace_poster(handle).await;
        println!("u/{}", handle);
        println!("  identity: {:?}", trace.identity);
        println!("  profile:  {}", describe(trace.profile));
        println!("  recheck:  {}", describe(trace.recheck));
        println!("  verdict:  {}", trace.verdict().as_str());
        println!("  status:   {}", trace.status());
    }
    Ok(())
}

fn describe<T: std::fmt::Debug>(outcome: Option<T>) -> String {
    outcome
        .map(|o| format!("{:?}", o))
        .unwrap_or_else(|| "not run".to_string())
}
