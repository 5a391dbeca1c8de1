//! Dedup/persistence store invariants against a real on-disk SQLite file.

use contact_finder::database::{
    create_db_pool, fetch_results, has_processed, has_sent, mark_processed, record_best,
    record_sent, sent_record_count, DbPool,
};
use contact_finder::models::{Organization, OutreachResult, OutreachStatus};
use tempfile::TempDir;

async fn temp_pool(dir: &TempDir) -> DbPool {
    let path = dir.path().join("contacts.db");
    create_db_pool(path.to_str().unwrap()).await.unwrap()
}

#[tokio::test]
async fn record_sent_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let pool = temp_pool(&dir).await;

    record_sent(&pool, "stripe.com", "amy.salazar@stripe.com", "sent")
        .await
        .unwrap();
    record_sent(&pool, "stripe.com", "amy.salazar@stripe.com", "sent")
        .await
        .unwrap();

    let count = sent_record_count(&pool, "stripe.com", "amy.salazar@stripe.com")
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert!(has_sent(&pool, "stripe.com", "amy.salazar@stripe.com")
        .await
        .unwrap());
}

#[tokio::test]
async fn sent_gate_is_case_insensitive_on_address() {
    let dir = TempDir::new().unwrap();
    let pool = temp_pool(&dir).await;

    record_sent(&pool, "stripe.com", "Amy.Salazar@stripe.com", "sent")
        .await
        .unwrap();
    assert!(has_sent(&pool, "stripe.com", "amy.salazar@stripe.com")
        .await
        .unwrap());
    let count = sent_record_count(&pool, "stripe.com", "AMY.SALAZAR@stripe.com")
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn failed_sends_do_not_close_the_dedup_gate() {
    let dir = TempDir::new().unwrap();
    let pool = temp_pool(&dir).await;

    record_sent(&pool, "acme.io", "jo@acme.io", "failed")
        .await
        .unwrap();
    assert!(!has_sent(&pool, "acme.io", "jo@acme.io").await.unwrap());

    // A later success overwrites the same row; still one record.
    record_sent(&pool, "acme.io", "jo@acme.io", "sent").await.unwrap();
    assert!(has_sent(&pool, "acme.io", "jo@acme.io").await.unwrap());
    assert_eq!(sent_record_count(&pool, "acme.io", "jo@acme.io").await.unwrap(), 1);
}

#[tokio::test]
async fn processed_gate_supports_reruns() {
    let dir = TempDir::new().unwrap();
    let pool = temp_pool(&dir).await;

    assert!(!has_processed(&pool, "stripe.com").await.unwrap());
    mark_processed(&pool, "stripe.com", "found").await.unwrap();
    assert!(has_processed(&pool, "stripe.com").await.unwrap());
    // Marking again is a plain update, not an error.
    mark_processed(&pool, "stripe.com", "found").await.unwrap();
}

#[tokio::test]
async fn concurrent_writes_to_distinct_keys_all_land() {
    let dir = TempDir::new().unwrap();
    let pool = temp_pool(&dir).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let org_key = format!("org-{i}.com");
            let address = format!("contact@org-{i}.com");
            record_sent(&pool, &org_key, &address, "sent").await.unwrap();
            mark_processed(&pool, &org_key, "found").await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for i in 0..8 {
        let org_key = format!("org-{i}.com");
        let address = format!("contact@org-{i}.com");
        assert!(has_sent(&pool, &org_key, &address).await.unwrap());
        assert!(has_processed(&pool, &org_key).await.unwrap());
    }
}

#[tokio::test]
async fn best_contact_rows_upsert_per_organization() {
    let dir = TempDir::new().unwrap();
    let pool = temp_pool(&dir).await;

    let organization = Organization::new("Stripe", Some("stripe.com".to_string()));
    let mut result = OutreachResult::new(organization, OutreachStatus::Found, "first pass");
    result.contact_name = Some("Amy Salazar".to_string());
    result.email = Some("asalazar@stripe.com".to_string());
    result.score = 9.0;
    record_best(&pool, &result).await.unwrap();

    result.email = Some("amy.salazar@stripe.com".to_string());
    result.score = 10.0;
    record_best(&pool, &result).await.unwrap();

    let rows = fetch_results(&pool).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email.as_deref(), Some("amy.salazar@stripe.com"));
    assert_eq!(rows[0].status, "found");
    assert_eq!(rows[0].score, 10.0);
}
