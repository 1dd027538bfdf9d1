use benchmark_api::constants::ADULT_PERMISSION_GROUP;
use benchmark_api::database::is_undefined_table;
use benchmark_api::models::benchmark_user::{list_tables, walkthrough, BenchmarkUser, TABLE_NAME};
use sqlx::PgPool;

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_insert_then_select_by_email(pool: PgPool) -> sqlx::Result<()> {
    BenchmarkUser::create_table(&pool).await?;
    BenchmarkUser::insert(&pool, Some("alice@example.com"), Some(25)).await?;

    let rows = BenchmarkUser::find_by_email(&pool, "alice@example.com").await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email.as_deref(), Some("alice@example.com"));
    assert_eq!(rows[0].permission_group, Some(25));
    assert!(rows[0].created_at.is_some());
    Ok(())
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_update_is_visible_to_later_selects(pool: PgPool) -> sqlx::Result<()> {
    BenchmarkUser::create_table(&pool).await?;
    BenchmarkUser::insert(&pool, Some("alice@example.com"), Some(25)).await?;

    let updated = BenchmarkUser::update_permission_group(&pool, "alice@example.com", 26).await?;
    assert_eq!(updated, 1);

    let rows = BenchmarkUser::find_by_email(&pool, "alice@example.com").await?;
    assert_eq!(rows[0].permission_group, Some(26));

    assert_eq!(
        BenchmarkUser::update_permission_group(&pool, "nobody@example.com", 1).await?,
        0
    );
    Ok(())
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_delete_below_threshold(pool: PgPool) -> sqlx::Result<()> {
    BenchmarkUser::create_table(&pool).await?;
    for (email, group) in [("a@x.io", 10), ("b@x.io", 17), ("c@x.io", 18), ("d@x.io", 40)] {
        BenchmarkUser::insert(&pool, Some(email), Some(group)).await?;
    }
    BenchmarkUser::insert(&pool, Some("null@x.io"), None).await?;

    let deleted = BenchmarkUser::delete_below_permission_group(&pool, ADULT_PERMISSION_GROUP).await?;
    assert_eq!(deleted, 2);

    let remaining = BenchmarkUser::fetch_all(&pool).await?;
    assert_eq!(remaining.len(), 3);
    assert!(remaining
        .iter()
        .filter_map(|row| row.permission_group)
        .all(|group| group >= ADULT_PERMISSION_GROUP));

    let adults = BenchmarkUser::with_min_permission_group(&pool, ADULT_PERMISSION_GROUP).await?;
    assert_eq!(adults.len(), 2);
    Ok(())
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_page_is_bounded_and_ordered(pool: PgPool) -> sqlx::Result<()> {
    BenchmarkUser::create_table(&pool).await?;
    for i in 0..13 {
        BenchmarkUser::insert(&pool, Some(&format!("user{i}@example.com")), Some(i)).await?;
    }

    let first = BenchmarkUser::page(&pool, 10, 0).await?;
    assert_eq!(first.len(), 10);
    assert!(first.windows(2).all(|pair| pair[0].id < pair[1].id));

    let second = BenchmarkUser::page(&pool, 10, 10).await?;
    assert_eq!(second.len(), 3);
    assert!(first.last().unwrap().id < second[0].id);

    let emails = BenchmarkUser::emails(&pool).await?;
    assert_eq!(emails.len(), 13);
    Ok(())
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_queries_fail_after_drop(pool: PgPool) -> sqlx::Result<()> {
    BenchmarkUser::create_table(&pool).await?;
    assert!(list_tables(&pool).await?.iter().any(|t| t == TABLE_NAME));

    BenchmarkUser::drop_table(&pool).await?;
    assert!(!list_tables(&pool).await?.iter().any(|t| t == TABLE_NAME));

    let err = BenchmarkUser::fetch_all(&pool).await.unwrap_err();
    assert!(is_undefined_table(&err), "unexpected error: {err}");
    assert!(err.to_string().contains("does not exist"));
    Ok(())
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_walkthrough_sequence(pool: PgPool) -> sqlx::Result<()> {
    let report = walkthrough(&pool, true).await?;

    assert_eq!(report.inserted.len(), 3);
    assert_eq!(report.all_rows.len(), 3);
    assert_eq!(report.emails.len(), 3);
    // alice (25) and carol (42)
    assert_eq!(report.adults.len(), 2);
    assert_eq!(report.updated, 1);
    // bob (16)
    assert_eq!(report.deleted, 1);
    assert_eq!(report.first_page.len(), 2);
    assert!(report.tables.iter().any(|t| t == TABLE_NAME));
    assert!(!report.dropped);

    let alice = BenchmarkUser::find_by_email(&pool, "alice@example.com").await?;
    assert_eq!(alice[0].permission_group, Some(26));

    let report = walkthrough(&pool, false).await?;
    assert!(report.dropped);
    assert!(BenchmarkUser::fetch_all(&pool).await.is_err());
    Ok(())
}
