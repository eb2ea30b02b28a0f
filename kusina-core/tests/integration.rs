//! Integration tests for kusina reports and admin workflows
//!
//! Every test seeds a `MemoryStore` (and `MemoryStorage` where files are
//! involved) and drives the public API end to end.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use kusina_core::admin::{
    accept_application, add_dish, delete_video, list_applications, list_menu, reported_videos,
    DishImage, NewDish,
};
use kusina_core::analytics::{
    generate_engagement_report, generate_sales_report, resolve_restaurant, time_series_chart,
    ReportOptions, ReportPeriod, SalesReport, ViewSlot, ViewState,
};
use kusina_core::config::LikeAttribution;
use kusina_core::store::{fields, FieldValue, Fields, Filter};
use kusina_core::{auth, Error, Fetcher, MemoryStorage, MemoryStore, Session, Video};

fn ts(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
}

fn item(name: &str, quantity: i64, price: f64) -> FieldValue {
    FieldValue::Map(fields([
        ("name", FieldValue::from(name)),
        ("quantity", FieldValue::Integer(quantity)),
        ("price", FieldValue::Double(price)),
    ]))
}

fn order(total: f64, at: Option<DateTime<Utc>>, items: Vec<FieldValue>) -> Fields {
    let mut f = fields([
        ("restaurantId", FieldValue::from("r1")),
        ("status", FieldValue::from("completed")),
        ("totalPrice", FieldValue::Double(total)),
        ("items", FieldValue::Array(items)),
    ]);
    if let Some(at) = at {
        f.insert("createdAt".to_string(), FieldValue::Timestamp(at));
    }
    f
}

fn interaction(kind: &str, user: &str, target: &str, at: DateTime<Utc>) -> Fields {
    fields([
        ("type", FieldValue::from(kind)),
        ("userId", FieldValue::from(user)),
        ("targetId", FieldValue::from(target)),
        ("timestamp", FieldValue::Timestamp(at)),
    ])
}

/// Store with a business owner linked to restaurant `r1`.
fn store_with_owner() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(
        "users",
        "owner",
        fields([
            ("name", FieldValue::from("Lola's Kitchen")),
            ("restaurantId", FieldValue::from("r1")),
            (
                "roles",
                FieldValue::Map(fields([("business", FieldValue::Bool(true))])),
            ),
        ]),
    );
    store
}

fn session() -> Session {
    Session::offline("owner")
}

// ============================================
// Record Fetcher
// ============================================

#[tokio::test]
async fn test_membership_batches_of_ten() {
    let store = MemoryStore::new();
    let ids: Vec<String> = (0..23).map(|i| format!("v{:02}", i)).collect();
    // Three of the requested videos do not exist
    for id in ids.iter().take(20) {
        store.insert("videos", id, fields([("caption", FieldValue::from(id.as_str()))]));
    }
    let mut requested = ids.clone();
    requested.push("v00".to_string());

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let videos: Vec<Video> = fetcher.fetch_by_ids(&requested).await.unwrap();

    let sizes: Vec<usize> = store.queries().iter().map(|q| q.membership_len()).collect();
    assert_eq!(sizes, vec![10, 10, 3]);
    assert_eq!(videos.len(), 20);

    let unique: HashSet<&str> = videos.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(unique.len(), 20);
}

#[tokio::test]
async fn test_configured_batch_size() {
    let store = MemoryStore::with_in_limit(30);
    let ids: Vec<String> = (0..23).map(|i| i.to_string()).collect();
    let session = session();
    let fetcher = Fetcher::new(&store, &session).with_batch_size(30);
    let _: Vec<Video> = fetcher.fetch_by_ids(&ids).await.unwrap();
    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_surfaces() {
    let store = store_with_owner();
    store.deny("orders");
    let session = session();
    let fetcher = Fetcher::new(&store, &session);

    let result = generate_sales_report(
        &fetcher,
        "r1",
        ReportPeriod::Month(2024, 5),
        &ReportOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(Error::Permission(_))));
}

#[test]
fn test_no_session_is_not_authenticated() {
    assert!(matches!(auth::require(None), Err(Error::NotAuthenticated)));
}

// ============================================
// Sales report
// ============================================

#[tokio::test]
async fn test_daily_revenue_buckets() {
    let store = store_with_owner();
    store.insert("orders", "o1", order(10.0, Some(ts(5, 1, 9)), vec![item("Adobo", 1, 10.0)]));
    store.insert("orders", "o2", order(5.0, Some(ts(5, 1, 18)), vec![item("Rice", 1, 5.0)]));
    store.insert("orders", "o3", order(20.0, Some(ts(5, 2, 12)), vec![item("Adobo", 2, 10.0)]));
    store.insert("orders", "o4", order(99.0, None, vec![item("Adobo", 1, 99.0)]));

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let restaurant = resolve_restaurant(&fetcher).await.unwrap();
    assert_eq!(restaurant, "r1");

    let report = generate_sales_report(
        &fetcher,
        &restaurant,
        ReportPeriod::Month(2024, 5),
        &ReportOptions::default(),
    )
    .await
    .unwrap();

    let rows = serde_json::to_value(time_series_chart(&report.daily)).unwrap();
    assert_eq!(
        rows,
        serde_json::json!([
            { "date": "May 1", "revenue": 15.0, "orders": 2.0 },
            { "date": "May 2", "revenue": 20.0, "orders": 1.0 },
        ])
    );
    assert_eq!(report.totals.revenue, 35.0);
    assert_eq!(report.totals.orders, 3);

    let daily_total: f64 = report.daily.iter().map(|b| b.value("revenue")).sum();
    assert_eq!(daily_total, report.totals.revenue);

    let top: Vec<(&str, f64)> = report
        .top_dishes_by_quantity
        .iter()
        .map(|e| (e.subject_id.as_str(), e.value))
        .collect();
    assert_eq!(top, vec![("Adobo", 3.0), ("Rice", 1.0)]);
}

#[tokio::test]
async fn test_pairings_count_distinct_items_once() {
    let store = store_with_owner();
    store.insert(
        "orders",
        "o1",
        order(
            30.0,
            Some(ts(5, 3, 12)),
            vec![item("X", 1, 10.0), item("X", 1, 10.0), item("Y", 1, 10.0)],
        ),
    );
    store.insert("orders", "o2", order(10.0, Some(ts(5, 3, 13)), vec![item("X", 1, 10.0)]));

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let report = generate_sales_report(
        &fetcher,
        "r1",
        ReportPeriod::Month(2024, 5),
        &ReportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.top_pairings.len(), 1);
    assert_eq!(report.top_pairings[0].subject_id, "X & Y");
    assert_eq!(report.top_pairings[0].value, 1.0);
}

#[tokio::test]
async fn test_missing_restaurant_is_terminal() {
    let store = store_with_owner();
    let mut broken = order(1.0, Some(ts(5, 1, 9)), Vec::new());
    broken.remove("restaurantId");
    store.insert("orders", "broken", broken);

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    // Orders are filtered by restaurant, so read the broken one directly
    let result: kusina_core::Result<Vec<kusina_core::Order>> =
        fetcher.fetch(vec![Filter::eq("status", "completed")]).await;
    assert!(matches!(
        result,
        Err(Error::MissingField { ref field, .. }) if field == "restaurantId"
    ));
}

#[tokio::test]
async fn test_user_without_restaurant() {
    let store = MemoryStore::new();
    store.insert("users", "owner", fields([("name", FieldValue::from("No Shop"))]));
    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    assert!(matches!(
        resolve_restaurant(&fetcher).await,
        Err(Error::MissingField { .. })
    ));
}

#[tokio::test]
async fn test_sales_trends_and_determinism() {
    let store = store_with_owner();
    store.insert("orders", "a", order(100.0, Some(ts(4, 10, 12)), vec![item("Adobo", 1, 100.0)]));
    store.insert("orders", "b", order(150.0, Some(ts(5, 10, 12)), vec![item("Adobo", 1, 150.0)]));

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let options = ReportOptions::default().with_trends(true);

    let first = generate_sales_report(&fetcher, "r1", ReportPeriod::Month(2024, 5), &options)
        .await
        .unwrap();
    let second = generate_sales_report(&fetcher, "r1", ReportPeriod::Month(2024, 5), &options)
        .await
        .unwrap();
    assert_eq!(first, second);

    let trends = first.trends.unwrap();
    assert_eq!(trends.revenue_delta_pct, 50.0);
    assert_eq!(trends.previous_totals.orders, 1);
}

// ============================================
// Engagement report
// ============================================

#[tokio::test]
async fn test_most_active_users_tie_order() {
    let store = MemoryStore::new();
    // Document ids fix the read order: u1 first, then u2, then u3
    let counts = [("u1", 5), ("u2", 9), ("u3", 9)];
    for (user, count) in counts {
        for i in 0..count {
            store.insert(
                "interactions",
                &format!("{}-{:02}", user, i),
                interaction("view", user, "v1", ts(5, 1, 10)),
            );
        }
    }

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let options = ReportOptions {
        top_n: 2,
        ..ReportOptions::default()
    };
    let report = generate_engagement_report(&fetcher, ReportPeriod::Month(2024, 5), &options)
        .await
        .unwrap();

    let top: Vec<(&str, f64)> = report
        .most_active_users
        .iter()
        .map(|e| (e.subject_id.as_str(), e.value))
        .collect();
    assert_eq!(top, vec![("u2", 9.0), ("u3", 9.0)]);
    assert_eq!(report.totals.views, 23);
}

#[tokio::test]
async fn test_like_attribution() {
    let store = MemoryStore::new();
    store.insert(
        "videos",
        "v1",
        fields([
            ("caption", FieldValue::from("Sizzling sisig")),
            ("uploaderId", FieldValue::from("chef")),
        ]),
    );
    store.insert("users", "chef", fields([("name", FieldValue::from("Chef Ana"))]));
    store.insert("interactions", "i1", interaction("like", "fan1", "v1", ts(5, 2, 8)));
    store.insert("interactions", "i2", interaction("like", "fan2", "v1", ts(5, 2, 9)));
    store.insert("interactions", "i3", interaction("comment", "fan1", "v1", ts(5, 3, 9)));

    let session = session();
    let fetcher = Fetcher::new(&store, &session);

    let owner = generate_engagement_report(
        &fetcher,
        ReportPeriod::Month(2024, 5),
        &ReportOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(owner.top_creators.len(), 1);
    assert_eq!(owner.top_creators[0].subject_id, "chef");
    assert_eq!(owner.top_creators[0].display_name, "Chef Ana");
    assert_eq!(owner.top_creators[0].value, 2.0);
    assert_eq!(owner.top_videos[0].display_name, "Sizzling sisig");

    let labels: Vec<&str> = owner.daily.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["May 2", "May 3"]);
    assert_eq!(owner.daily[0].value("likes"), 2.0);
    assert_eq!(owner.daily[1].value("comments"), 1.0);

    let actor = generate_engagement_report(
        &fetcher,
        ReportPeriod::Month(2024, 5),
        &ReportOptions {
            like_attribution: LikeAttribution::Actor,
            ..ReportOptions::default()
        },
    )
    .await
    .unwrap();
    let creators: Vec<&str> = actor
        .top_creators
        .iter()
        .map(|e| e.subject_id.as_str())
        .collect();
    assert_eq!(creators, vec!["fan1", "fan2"]);
}

#[tokio::test]
async fn test_unresolved_like_targets_credit_only_users() {
    let store = MemoryStore::new();
    store.insert("users", "cook", fields([("name", FieldValue::from("Cook Ben"))]));
    // "gone" is a deleted video; the like carries no targetType
    store.insert("interactions", "i1", interaction("like", "fan1", "gone", ts(5, 4, 8)));
    let mut profile_like = interaction("like", "fan2", "cook", ts(5, 4, 9));
    profile_like.insert("targetType".to_string(), FieldValue::from("user"));
    store.insert("interactions", "i2", profile_like);

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let report = generate_engagement_report(
        &fetcher,
        ReportPeriod::Month(2024, 5),
        &ReportOptions::default(),
    )
    .await
    .unwrap();

    let creators: Vec<(&str, &str)> = report
        .top_creators
        .iter()
        .map(|e| (e.subject_id.as_str(), e.display_name.as_str()))
        .collect();
    assert_eq!(creators, vec![("cook", "Cook Ben")]);
    assert!(report.top_videos.is_empty());
    assert_eq!(report.totals.likes, 2);
}

#[tokio::test]
async fn test_superseded_report_is_not_shown() {
    let store = store_with_owner();
    store.insert("orders", "o1", order(10.0, Some(ts(5, 1, 9)), Vec::new()));
    store.insert("orders", "o2", order(25.0, Some(ts(6, 1, 9)), Vec::new()));

    let session = session();
    let fetcher = Fetcher::new(&store, &session);
    let options = ReportOptions::default();
    let slot: ViewSlot<SalesReport> = ViewSlot::new();

    let may_ticket = slot.begin();
    let june_ticket = slot.begin();
    let (may, june) = tokio::join!(
        generate_sales_report(&fetcher, "r1", ReportPeriod::Month(2024, 5), &options),
        generate_sales_report(&fetcher, "r1", ReportPeriod::Month(2024, 6), &options),
    );

    assert!(slot.publish(june_ticket, june));
    assert!(!slot.publish(may_ticket, may));
    match slot.current() {
        ViewState::Ready(report) => {
            assert_eq!(report.period, ReportPeriod::Month(2024, 6));
            assert_eq!(report.totals.revenue, 25.0);
        }
        other => panic!("expected june report, got {:?}", other),
    }
}

// ============================================
// Admin workflows
// ============================================

#[tokio::test]
async fn test_accept_application() {
    let store = MemoryStore::new();
    let storage = MemoryStorage::new();
    storage.put("applications", "u9/cover.jpg", b"cover", "image/jpeg");
    storage.put("applications", "u9/permit.pdf", b"permit", "application/pdf");

    store.insert("users", "u9", fields([("name", FieldValue::from("Maria"))]));
    store.insert(
        "applications",
        "a1",
        fields([
            ("uploaderId", FieldValue::from("u9")),
            ("status", FieldValue::from("pending")),
            ("restaurantName", FieldValue::from("Maria's Carinderia")),
            ("submittedAt", FieldValue::Timestamp(ts(4, 1, 8))),
            (
                "photoURLs",
                FieldValue::Map(fields([
                    (
                        "coverURL",
                        FieldValue::from(
                            "https://x.supabase.co/storage/v1/object/public/applications/u9/cover.jpg",
                        ),
                    ),
                    (
                        "selfieURL",
                        FieldValue::from(
                            "https://x.supabase.co/storage/v1/object/public/applications/u9/missing.jpg",
                        ),
                    ),
                ])),
            ),
            (
                "additionalFileURLs",
                FieldValue::from(vec![
                    "https://x.supabase.co/storage/v1/object/public/applications/u9/permit.pdf",
                ]),
            ),
        ]),
    );

    let session = Session::offline("admin");
    let fetcher = Fetcher::new(&store, &session);

    let listed = list_applications(&fetcher).await.unwrap();
    assert_eq!(listed.len(), 1);

    let outcome = accept_application(&fetcher, &storage, "a1").await.unwrap();
    assert_eq!(outcome.skipped_files, vec!["selfieURL".to_string()]);
    assert!(outcome.application_updated);
    assert!(outcome.owner_updated);

    let rid = &outcome.restaurant_id;
    assert_eq!(
        storage.paths("restaurants"),
        vec![format!("{}/coverURL", rid), format!("{}/proof0", rid)]
    );

    let restaurant = fetcher
        .get::<kusina_core::Restaurant>(rid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restaurant.name, "Maria's Carinderia");
    assert_eq!(restaurant.owner_id, "u9");
    assert_eq!(restaurant.photo_urls.len(), 1);
    assert_eq!(restaurant.additional_file_urls.len(), 1);

    let app = fetcher
        .get::<kusina_core::Application>("a1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.status, kusina_core::ApplicationStatus::Accepted);

    let owner = fetcher
        .get::<kusina_core::UserProfile>("u9")
        .await
        .unwrap()
        .unwrap();
    assert!(owner.roles.business);
    assert_eq!(owner.restaurant_id.as_deref(), Some(rid.as_str()));
}

#[tokio::test]
async fn test_reported_videos_and_delete() {
    let store = MemoryStore::new();
    store.insert("videos", "v1", fields([("views", FieldValue::Integer(12))]));
    store.insert("videos", "v2", fields([("caption", FieldValue::from("Lechon"))]));
    store.insert(
        "reports",
        "r1",
        fields([("videoId", FieldValue::from("v1")), ("reason", FieldValue::from("spam"))]),
    );
    store.insert(
        "reports",
        "r2",
        fields([("videoId", FieldValue::from("v1")), ("reason", FieldValue::from("nudity"))]),
    );
    store.insert("reports", "r3", fields([("videoId", FieldValue::from("gone"))]));
    store.insert("reports", "r4", fields([("reason", FieldValue::from("no video"))]));

    let session = Session::offline("admin");
    let fetcher = Fetcher::new(&store, &session);

    let reported = reported_videos(&fetcher).await.unwrap();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].video.caption, "(No caption)");
    assert_eq!(reported[0].video.views, 12);
    assert_eq!(reported[0].reports.len(), 2);

    let removed = delete_video(&fetcher, "v1").await.unwrap();
    assert_eq!(removed, 2);
    assert!(store.documents("videos").iter().all(|d| d.id != "v1"));
    let remaining: Vec<String> = store.documents("reports").into_iter().map(|d| d.id).collect();
    assert_eq!(remaining, vec!["r3".to_string(), "r4".to_string()]);
}

#[tokio::test]
async fn test_add_dish_and_list_menu() {
    let store = store_with_owner();
    let storage = MemoryStorage::new();
    let session = session();
    let fetcher = Fetcher::new(&store, &session);

    let dish = add_dish(
        &fetcher,
        &storage,
        NewDish {
            name: "Kare-kare".to_string(),
            category: "Main".to_string(),
            price: 250.0,
            description: "Oxtail in peanut sauce".to_string(),
            image: Some(DishImage {
                file_name: "karekare.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            }),
        },
    )
    .await
    .unwrap();

    let expected_path = format!("{}.png", dish.id);
    assert_eq!(dish.image_path.as_deref(), Some(expected_path.as_str()));
    assert_eq!(storage.paths("dishes"), vec![expected_path.clone()]);

    let menu = list_menu(&fetcher, &storage).await.unwrap();
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0].restaurant_name, "Lola's Kitchen");
    assert_eq!(
        menu[0].image_url.as_deref(),
        Some(format!("memory://public/dishes/{}", expected_path).as_str())
    );
}

#[tokio::test]
async fn test_add_dish_rejects_invalid_form() {
    let store = store_with_owner();
    let storage = MemoryStorage::new();
    let session = session();
    let fetcher = Fetcher::new(&store, &session);

    let result = add_dish(
        &fetcher,
        &storage,
        NewDish {
            name: String::new(),
            category: "Main".to_string(),
            price: 1.0,
            description: "x".to_string(),
            image: None,
        },
    )
    .await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(store.documents("dishes").is_empty());
}
