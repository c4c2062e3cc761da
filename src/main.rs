use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::info;

use reddit_outreach::analyzer::{PostAnalyzer, Templates};
use reddit_outreach::batch::BatchAggregator;
use reddit_outreach::config;
use reddit_outreach::db;
use reddit_outreach::prompt::Prompt;
use reddit_outreach::reddit::RedditClient;
use reddit_outreach::session;

#[derive(Debug, Parser)]
#[command(author, version, about = "Find reachable posters and commenters on Reddit posts and draft outreach messages")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Analyze a single post link, print the result and exit without saving
    #[arg(long)]
    link: Option<String>,

    /// Report name to append to (defaults to app.report_name)
    #[arg(long)]
    report: Option<String>,
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
    cfg.ensure_dirs()?;

    let reddit = RedditClient::from_config(&cfg.reddit)?;
    match reddit.login().await {
        Ok(name) => println!("Successfully logged in as u/{}!\n", name),
        Err(err) => {
            println!("Failed to authenticate: {:#}", err);
            return Err(err);
        }
    }

    let mut prompt = Prompt::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let templates = resolve_templates(&mut prompt, &cfg.outreach).await?;
    let analyzer = PostAnalyzer::new(
        &reddit,
        Duration::from_millis(cfg.reddit.probe_timeout_ms),
        templates,
        cfg.outreach.top_commenters,
    );

    if let Some(link) = args.link.as_deref() {
        let outcome = analyzer.analyze(link).await;
        prompt.say(&session::describe_outcome(link, &outcome)).await?;
        return Ok(());
    }

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;
    let report = args.report.unwrap_or_else(|| cfg.app.report_name.clone());
    info!(%report, "starting batch mode");

    let mut batch = BatchAggregator::new(&analyzer);
    session::run_rounds(&mut prompt, &mut batch, &pool, &report).await?;
    Ok(())
}

/// Templates from config; empty ones are asked for interactively.
async fn resolve_templates<R, W>(
    prompt: &mut Prompt<R, W>,
    outreach: &config::Outreach,
) -> Result<Templates>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut templates = Templates::from_config(outreach);
    if templates.poster.is_empty() {
        println!("Enter the message to send to the poster.");
        println!(
            "Use \"{}\" in your message to insert the post link.",
            templates.post_placeholder
        );
        templates.poster = prompt
            .ask("Poster message: ")
            .await?
            .context("input closed before poster message")?;
    }
    if templates.commenter.is_empty() {
        println!("\nEnter the message to send to the commenters.");
        println!(
            "Use \"{}\" in your message to insert the comment link.",
            templates.comment_placeholder
        );
        templates.commenter = prompt
            .ask("Commenter message: ")
            .await?
            .context("input closed before commenter message")?;
    }
    Ok(templates)
}
