use reddit_outreach::batch::ReportStore;
use reddit_outreach::db;
use reddit_outreach::model::{AnalysisRecord, CommenterSlot, REPORT_COLUMNS};
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn record(n: usize, commenters: usize) -> AnalysisRecord {
    let mut slots: [CommenterSlot; 3] = Default::default();
    for (i, slot) in slots.iter_mut().enumerate().take(commenters) {
        *slot = CommenterSlot {
            handle: format!("u/commenter{}_{}", n, i),
            upvotes: (10 * (i + 1)).to_string(),
            link: format!("https://www.reddit.com/r/t/comments/p{}/x/c{}/", n, i),
            message: format!("hello {}", i),
        };
    }
    AnalysisRecord {
        subreddit: "r/t".into(),
        post_link: format!("https://www.reddit.com/r/t/comments/p{}/x/", n),
        poster: format!("u/poster{}", n),
        poster_status: "active".into(),
        post_status: "active".into(),
        poster_message: format!("message for post {}", n),
        commenters: slots,
    }
}

#[tokio::test]
async fn appending_to_existing_report_adds_exactly_n_rows() {
    let pool = setup_pool().await;
    let existing: Vec<_> = (0..2).map(|n| record(n, 3)).collect();
    let fresh: Vec<_> = (2..5).map(|n| record(n, n - 2)).collect();

    let first = db::append_rows(&pool, "leads", &existing).await.unwrap();
    assert_eq!(first.rows, 2);
    let second = db::append_rows(&pool, "leads", &fresh).await.unwrap();
    assert_eq!(second.rows, 3);
    assert_ne!(first.round_id, second.round_id);

    let rows = db::load_rows(&pool, "leads").await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(db::count_rows(&pool, "leads").await.unwrap(), 5);

    let loaded: Vec<AnalysisRecord> = rows.iter().map(|r| r.record.clone()).collect();
    let expected: Vec<AnalysisRecord> = existing.into_iter().chain(fresh).collect();
    assert_eq!(loaded, expected);

    for row in &rows {
        assert_eq!(row.record.to_row().len(), REPORT_COLUMNS.len());
    }
    assert_eq!(rows[0].round_id, rows[1].round_id);
    assert_eq!(rows[2].round_id, second.round_id.to_string());
}

#[tokio::test]
async fn empty_slots_come_back_as_empty_strings() {
    let pool = setup_pool().await;
    db::append_rows(&pool, "leads", &[record(7, 0)]).await.unwrap();

    let rows = db::load_rows(&pool, "leads").await.unwrap();
    let cells = rows[0].record.to_row();
    assert!(cells[6..].iter().all(|c| c.is_empty()));
}

#[tokio::test]
async fn reports_are_isolated_by_name() {
    let pool = setup_pool().await;
    db::append_rows(&pool, "a", &[record(1, 1)]).await.unwrap();
    db::append_rows(&pool, "b", &[record(2, 1), record(3, 1)])
        .await
        .unwrap();

    assert_eq!(db::load_rows(&pool, "a").await.unwrap().len(), 1);
    assert_eq!(db::load_rows(&pool, "missing").await.unwrap().len(), 0);
    assert_eq!(
        db::list_reports(&pool).await.unwrap(),
        vec![("a".to_string(), 1), ("b".to_string(), 2)]
    );
}

#[tokio::test]
async fn pool_is_a_report_store() {
    let pool = setup_pool().await;
    let store: &dyn ReportStore = &pool;
    assert_eq!(store.append("leads", &[record(1, 2)]).await.unwrap(), 1);
    assert_eq!(db::count_rows(&pool, "leads").await.unwrap(), 1);
    let loaded = store.load("leads").await.unwrap();
    assert_eq!(loaded, vec![record(1, 2)]);
    assert!(store.load("other").await.unwrap().is_empty());
}
