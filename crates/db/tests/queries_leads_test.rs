//! Integration tests for the leads table queries.

use crysta_view_core::LeadStatus;
use crysta_view_db::query::Filter;
use crysta_view_db::{LeadFilter, Table};
use pretty_assertions::assert_eq;

mod queries_shared;
use queries_shared::{make_lead, memory_db};

fn seed_funnel() -> (std::sync::Arc<crysta_view_db::MemoryStore>, crysta_view_db::Database) {
    let (store, db) = memory_db();
    store.insert_leads(&[
        make_lead(1, "919800000001", "Raya Menon", "Kochi", "converted", "2024-05-01T10:00:00Z"),
        make_lead(2, "919800000002", "Ray Dsouza", "Goa", "qualified", "2024-05-02T10:00:00Z"),
        make_lead(3, "919800000003", "Anita Rao", "Rayagada", "converted", "2024-05-03T10:00:00Z"),
        make_lead(4, "919800000004", "Sunita Shah", "Murray", "converted", "2024-05-04T10:00:00Z"),
        make_lead(5, "919800000005", "Deepa Kumar", "Delhi", "lost", "2024-05-05T10:00:00Z"),
    ]);
    (store, db)
}

#[tokio::test]
async fn test_converted_filter_with_search_combines_both_constraints() {
    let (store, db) = seed_funnel();

    let filter = LeadFilter {
        search: Some("ray".into()),
        status: Some(LeadStatus::Converted),
        ..Default::default()
    };
    let page = db.leads_page(&filter).await.unwrap();

    let mut names: Vec<&str> = page.leads.iter().map(|l| l.name.as_str()).collect();
    names.sort();
    // "Ray Dsouza" matches the term but is qualified; "Deepa" is lost.
    assert_eq!(names, vec!["Anita Rao", "Raya Menon", "Sunita Shah"]);
    assert_eq!(page.total, 3);
    assert!(!page.has_more);

    let executed = store.executed();
    assert_eq!(executed.len(), 1);
    let filters = &executed[0].filters;
    assert!(filters.iter().any(|f| matches!(f, Filter::IlikeAny { term, .. } if term == "ray")));
    assert!(filters
        .iter()
        .any(|f| matches!(f, Filter::Eq { column, value } if column == "lead_status" && value == "converted")));
}

#[tokio::test]
async fn test_leads_page_paginates_newest_first() {
    let (_store, db) = seed_funnel();

    let first = db
        .leads_page(&LeadFilter {
            page_size: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first.total, 5);
    assert!(first.has_more);
    assert_eq!(first.leads.len(), 2);
    assert_eq!(first.leads[0].id, "5");
    assert_eq!(first.leads[1].id, "4");

    let last = db
        .leads_page(&LeadFilter {
            page: 2,
            page_size: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(last.leads.len(), 1);
    assert!(!last.has_more);
}

#[tokio::test]
async fn test_leads_page_city_filter_and_display_defaults() {
    let (store, db) = memory_db();
    store.insert_leads(&[
        make_lead(1, "919811111111", "", "Pune", "", "2024-05-01T10:00:00Z"),
        make_lead(2, "919822222222", "Asha", "Delhi", "qualified", "2024-05-01T11:00:00Z"),
    ]);

    let page = db
        .leads_page(&LeadFilter {
            city: Some("Pune".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    let lead = &page.leads[0];
    assert_eq!(lead.name, "Unknown");
    assert_eq!(lead.location, "Pune");
}

#[tokio::test]
async fn test_export_leads_returns_every_match() {
    let (store, db) = seed_funnel();

    let leads = db
        .export_leads(&LeadFilter {
            status: Some(LeadStatus::Converted),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(leads.len(), 3);
    // Exports do not ask for a count.
    assert!(store.executed().iter().all(|q| q.count.is_none()));
}

#[tokio::test]
async fn test_conversation_lead_lookup() {
    let (_store, db) = seed_funnel();

    let lead = db.conversation_lead("919800000003").await.unwrap().unwrap();
    assert_eq!(lead.full_name.as_deref(), Some("Anita Rao"));
    assert!(db.conversation_lead("000").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failing_backend_surfaces_error() {
    let (store, db) = seed_funnel();
    store.fail_table(Table::Users);

    let err = db.leads_page(&LeadFilter::default()).await.unwrap_err();
    assert!(err.to_string().contains("users"));
}
