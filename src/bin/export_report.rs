use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use reddit_outreach::config::{self, Config};
use reddit_outreach::db::{self, StoredRow};
use reddit_outreach::model::REPORT_COLUMNS;

#[derive(Debug, Parser)]
#[command(
    about = "Export a saved outreach report to a standalone HTML table, or list the stored reports."
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Report to export (defaults to app.report_name)
    #[arg(long)]
    report: Option<String>,

    /// Output directory (defaults to <data_dir>/html)
    #[arg(long)]
    out: Option<PathBuf>,

    /// List stored reports with their row counts and exit
    #[arg(long)]
    list: bool,
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
    run(&cfg, &args).await
}

async fn run(cfg: &Config, args: &Args) -> Result<()> {
    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    if args.list {
        let reports = db::list_reports(&pool).await?;
        if reports.is_empty() {
            println!("No reports stored yet.");
        }
        for (name, rows) in reports {
            println!("{}\t{} rows", name, rows);
        }
        return Ok(());
    }

    let report = args
        .report
        .clone()
        .unwrap_or_else(|| cfg.app.report_name.clone());
    let rows = db::load_rows(&pool, &report)
        .await
        .with_context(|| format!("failed to load report '{}'", report))?;
    if rows.is_empty() {
        return Err(anyhow!("report '{}' has no rows", report));
    }

    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(cfg.app.resolved_data_dir()).join("html"));
    let static_dir = out_dir.join("static");
    tokio::fs::create_dir_all(&static_dir)
        .await
        .with_context(|| format!("failed to create {}", static_dir.display()))?;

    let index_path = out_dir.join(format!("{}.html", file_stem(&report)));
    tokio::fs::write(&index_path, render_html(&report, &rows))
        .await
        .with_context(|| format!("failed to write {}", index_path.display()))?;

    let css_path = static_dir.join("style.css");
    tokio::fs::write(&css_path, DEFAULT_STYLE)
        .await
        .with_context(|| format!("failed to write {}", css_path.display()))?;

    println!("Wrote {} rows to {}", rows.len(), index_path.display());
    Ok(())
}

fn file_stem(report: &str) -> String {
    report
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn render_html(report: &str, rows: &[StoredRow]) -> String {
    let mut head = String::from("<tr>");
    for col in REPORT_COLUMNS {
        head.push_str(&format!("<th>{}</th>", html_escape(col)));
    }
    head.push_str("</tr>");

    let mut body = String::new();
    for row in rows {
        body.push_str("<tr>");
        for (col, cell) in REPORT_COLUMNS.iter().zip(row.record.to_row()) {
            if col.ends_with("Link") && !cell.is_empty() {
                body.push_str(&format!(
                    "<td><a href=\"{}\">{}</a></td>",
                    html_attr(&cell),
                    html_escape(&cell)
                ));
            } else {
                body.push_str(&format!("<td>{}</td>", html_escape(&cell)));
            }
        }
        body.push_str("</tr>\n");
    }

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{}</title>
    <link rel="stylesheet" href="static/style.css">
  </head>
  <body>
    <header>
      <h1>{}</h1>
      <p class="hint">{} rows</p>
    </header>
    <main>
      <table>
        <thead>{}</thead>
        <tbody>
{}        </tbody>
      </table>
    </main>
  </body>
</html>"#,
        html_escape(report),
        html_escape(report),
        rows.len(),
        head,
        body
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
fn html_attr(s: &str) -> String {
    html_escape(s).replace('"', "&quot;")
}

const DEFAULT_STYLE: &str = r#"
:root {
  color-scheme: light dark;
  --fg: #222;
  --bg: #fff;
  --muted: #666;
}

@media (prefers-color-scheme: dark) {
  :root {
    --fg: #eee;
    --bg: #121212;
    --muted: #aaa;
  }
}

html,
body {
  margin: 0;
  padding: 0;
  background: var(--bg);
  color: var(--fg);
  font: 13px/1.5 -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto,
        'Helvetica Neue', Arial, sans-serif;
}

header {
  padding: 16px;
  border-bottom: 1px solid #ddd4;
}

main {
  padding: 16px;
  overflow-x: auto;
}

.hint {
  color: var(--muted);
}

table {
  border-collapse: collapse;
}

th,
td {
  border: 1px solid #ddd6;
  padding: 4px 8px;
  vertical-align: top;
  white-space: pre-wrap;
  max-width: 360px;
}

th {
  position: sticky;
  top: 0;
  background: var(--bg);
}

a {
  color: #0b7285;
  text-decoration: none;
  word-break: break-all;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reddit_outreach::model::{AnalysisRecord, CommenterSlot};

    fn stored(message: &str) -> StoredRow {
        let mut commenters: [CommenterSlot; 3] = Default::default();
        commenters[0] = CommenterSlot {
            handle: "u/alice".into(),
            upvotes: "12".into(),
            link: "https://www.reddit.com/r/t/comments/p/x/c1/".into(),
            message: "hey".into(),
        };
        StoredRow {
            id: 1,
            round_id: "r".into(),
            created_at: Utc::now(),
            record: AnalysisRecord {
                subreddit: "r/t".into(),
                post_link: "https://www.reddit.com/r/t/comments/p/x/".into(),
                poster: "u/op".into(),
                poster_status: "active".into(),
                post_status: "active".into(),
                poster_message: message.into(),
                commenters,
            },
        }
    }

    #[test]
    fn renders_header_and_escaped_cells() {
        let html = render_html("leads", &[stored("<b>hi</b> & bye")]);
        assert!(html.contains("<th>Commenter 3 Message</th>"));
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt; &amp; bye"));
        assert!(html.contains("<a href=\"https://www.reddit.com/r/t/comments/p/x/c1/\">"));
        assert_eq!(html.matches("<td>").count(), 18);
        assert_eq!(html.matches("<td><a").count(), 2);
    }

    #[test]
    fn file_stem_replaces_unsafe_chars() {
        assert_eq!(file_stem("my report/2025"), "my_report_2025");
    }
}
