//! Sitemap generation, the two-tier cache protocol, and the public sitemap
//! HTTP surface.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use time::OffsetDateTime;
use time::macros::datetime;
use tower::ServiceExt;

use rotta::application::repos::ContentInventoryWrite;
use rotta::application::resolver::RedirectResolver;
use rotta::application::sitemap::{SitemapOptions, SitemapService};
use rotta::cache::{
    CacheTrigger, CachedDocument, CachedSitemaps, DocumentCacheStore, MemoryDocumentStore,
    ServedTier, SitemapCacheConfig, SitemapKey,
};
use rotta::infra::http::{PublicState, build_public_router};

use support::{MemoryInventory, MemoryRuleStore, published_item};

const BASE: OffsetDateTime = datetime!(2025-06-01 00:00:00 UTC);

fn seed_many(inventory: &MemoryInventory, content_type: &str, count: usize) {
    for i in 0..count {
        inventory.seed(published_item(
            content_type,
            &format!("/{content_type}/item-{i}"),
            BASE + time::Duration::seconds(i as i64),
        ));
    }
}

fn generator(inventory: Arc<MemoryInventory>) -> Arc<SitemapService> {
    generator_with(inventory, Vec::new(), 0)
}

fn generator_with(
    inventory: Arc<MemoryInventory>,
    excluded_types: Vec<String>,
    freshness_window_months: u32,
) -> Arc<SitemapService> {
    Arc::new(SitemapService::new(
        inventory,
        SitemapOptions {
            public_url: "https://example.com".to_string(),
            excluded_types,
            freshness_window_months,
        },
    ))
}

struct CacheFixture {
    inventory: Arc<MemoryInventory>,
    store: Arc<MemoryDocumentStore>,
    service: CachedSitemaps,
}

fn cache_fixture() -> CacheFixture {
    cache_fixture_with(SitemapCacheConfig::default())
}

fn cache_fixture_with(config: SitemapCacheConfig) -> CacheFixture {
    let inventory = Arc::new(MemoryInventory::new());
    let store = Arc::new(MemoryDocumentStore::new());
    let service = CachedSitemaps::new(config, store.clone(), generator(inventory.clone()));
    CacheFixture {
        inventory,
        store,
        service,
    }
}

fn sitemap_router(inventory: Arc<MemoryInventory>, sitemap_enabled: bool) -> axum::Router {
    let generator = generator(inventory);
    let store: Arc<dyn DocumentCacheStore> = Arc::new(MemoryDocumentStore::new());
    let sitemaps = Arc::new(CachedSitemaps::new(
        SitemapCacheConfig::default(),
        store,
        generator.clone(),
    ));

    build_public_router(PublicState {
        resolver: Arc::new(RedirectResolver::new(Arc::new(MemoryRuleStore::new()))),
        sitemaps,
        sitemap_service: generator,
        sitemap_enabled,
        cache_ttl_seconds: 900,
        db: None,
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

// ---------------------------------------------------------------------------
// Generator: pagination and eligibility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_lists_one_entry_per_page() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 2500);

    let index = generator(inventory)
        .generate_index()
        .await
        .expect("index generated");

    assert_eq!(index.xml.matches("<sitemap>").count(), 3);
    for page in 1..=3 {
        assert!(
            index
                .xml
                .contains(&format!("https://example.com/sitemaps/posts-{page}.xml"))
        );
    }
    // Index lastmod tracks the most recently modified eligible item.
    assert_eq!(
        index.last_modified,
        Some(BASE + time::Duration::seconds(2499))
    );
}

#[tokio::test]
async fn single_page_type_gets_the_unpaginated_url() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 3);

    let index = generator(inventory)
        .generate_index()
        .await
        .expect("index generated");

    assert!(index.xml.contains("https://example.com/sitemaps/posts.xml"));
    assert!(!index.xml.contains("posts-1.xml"));
}

#[tokio::test]
async fn last_page_holds_the_remainder_and_the_next_is_empty() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 2500);
    let service = generator(inventory);

    let page3 = service
        .generate_page("posts", 3)
        .await
        .expect("generation succeeds")
        .expect("page 3 exists");
    assert_eq!(page3.xml.matches("<url>").count(), 500);

    assert!(service.generate_page("posts", 4).await.expect("ok").is_none());
    assert!(service.generate_page("posts", 0).await.expect("ok").is_none());
}

#[tokio::test]
async fn types_with_no_eligible_items_are_omitted_from_the_index() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 2);

    let mut draft = published_item("pages", "/pages/wip", BASE);
    draft.status = rotta::domain::types::ContentStatus::Draft;
    inventory.seed(draft);

    let index = generator(inventory)
        .generate_index()
        .await
        .expect("index generated");

    assert!(index.xml.contains("posts.xml"));
    assert!(!index.xml.contains("pages"));
}

#[tokio::test]
async fn excluded_and_attachment_types_never_appear() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 1);
    seed_many(&inventory, "secret", 1);
    seed_many(&inventory, "attachment", 1);

    let service = generator_with(inventory, vec!["secret".to_string()], 0);

    let index = service.generate_index().await.expect("index generated");
    assert!(index.xml.contains("posts.xml"));
    assert!(!index.xml.contains("secret"));
    assert!(!index.xml.contains("attachment"));

    assert!(service.generate_page("secret", 1).await.expect("ok").is_none());
    assert!(
        service
            .generate_page("attachment", 1)
            .await
            .expect("ok")
            .is_none()
    );
}

#[tokio::test]
async fn noindex_items_are_filtered_out() {
    let inventory = Arc::new(MemoryInventory::new());
    inventory.seed(published_item("posts", "/posts/visible", BASE));
    let mut hidden = published_item("posts", "/posts/hidden", BASE + time::Duration::seconds(1));
    hidden.noindex = true;
    inventory.seed(hidden);

    let page = generator(inventory)
        .generate_page("posts", 1)
        .await
        .expect("generation succeeds")
        .expect("page exists");

    assert_eq!(page.xml.matches("<url>").count(), 1);
    assert!(page.xml.contains("/posts/visible"));
    assert!(!page.xml.contains("/posts/hidden"));
}

#[tokio::test]
async fn freshness_window_drops_items_modified_before_the_cutoff() {
    let inventory = Arc::new(MemoryInventory::new());
    let now = OffsetDateTime::now_utc();
    inventory.seed(published_item(
        "posts",
        "/posts/recent",
        now - time::Duration::days(5),
    ));
    inventory.seed(published_item(
        "posts",
        "/posts/ancient",
        now - time::Duration::days(90),
    ));

    let page = generator_with(inventory, Vec::new(), 1)
        .generate_page("posts", 1)
        .await
        .expect("generation succeeds")
        .expect("page exists");

    assert_eq!(page.xml.matches("<url>").count(), 1);
    assert!(page.xml.contains("/posts/recent"));
}

#[tokio::test]
async fn generation_is_byte_identical_for_an_unchanged_inventory() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 40);
    let service = generator(inventory);

    let first = service.generate_index().await.expect("index");
    let second = service.generate_index().await.expect("index");
    assert_eq!(first.xml, second.xml);

    let page_a = service
        .generate_page("posts", 1)
        .await
        .expect("ok")
        .expect("page");
    let page_b = service
        .generate_page("posts", 1)
        .await
        .expect("ok")
        .expect("page");
    assert_eq!(page_a.xml, page_b.xml);
}

// ---------------------------------------------------------------------------
// Cache protocol: cold, fresh, stale-while-revalidate, invalidation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cold_read_generates_once_and_fills_both_tiers() {
    let fx = cache_fixture();
    seed_many(&fx.inventory, "posts", 3);
    let key = SitemapKey::for_type("posts", 1);

    let served = fx
        .service
        .read(&key)
        .await
        .expect("read succeeds")
        .expect("document exists");

    assert_eq!(served.tier, ServedTier::Fresh);
    assert_eq!(fx.inventory.page_fetch_count(), 1);
    assert!(fx.store.get_fresh(&key).await.expect("store").is_some());
    assert!(fx.store.get_stale(&key).await.expect("store").is_some());
}

#[tokio::test]
async fn fresh_hit_performs_zero_generations() {
    let fx = cache_fixture();
    seed_many(&fx.inventory, "posts", 3);
    let key = SitemapKey::for_type("posts", 1);

    let first = fx.service.read(&key).await.expect("read").expect("doc");
    let second = fx.service.read(&key).await.expect("read").expect("doc");

    assert_eq!(second.tier, ServedTier::Fresh);
    assert_eq!(first.document.xml, second.document.xml);
    assert_eq!(fx.inventory.page_fetch_count(), 1);
}

#[tokio::test]
async fn stale_read_serves_immediately_and_rebuilds_once_in_the_background() {
    let fx = cache_fixture();
    seed_many(&fx.inventory, "posts", 2);
    let key = SitemapKey::for_type("posts", 1);

    fx.service.read(&key).await.expect("read").expect("doc");
    assert_eq!(fx.inventory.page_fetch_count(), 1);

    // Force the fresh tier past expiry while keeping a distinguishable
    // stale copy, as a TTL lapse would.
    let marker = CachedDocument {
        xml: "<marker/>".to_string(),
        last_modified: None,
        generated_at: OffsetDateTime::now_utc(),
    };
    fx.store
        .put_both(&key, &marker, Duration::ZERO)
        .await
        .expect("store");

    let served = fx.service.read(&key).await.expect("read").expect("doc");
    assert_eq!(served.tier, ServedTier::Stale);
    assert_eq!(served.document.xml, "<marker/>");

    // A second stale read must not enqueue a second rebuild.
    fx.service.read(&key).await.expect("read").expect("doc");

    let rebuilt = wait_for_fresh(&fx.store, &key).await;
    assert!(rebuilt.xml.contains("<urlset"));
    assert_eq!(fx.inventory.page_fetch_count(), 2);

    let served = fx.service.read(&key).await.expect("read").expect("doc");
    assert_eq!(served.tier, ServedTier::Fresh);
    assert_eq!(served.document.xml, rebuilt.xml);
}

#[tokio::test]
async fn rebuild_drops_both_tiers_when_the_scope_empties() {
    let fx = cache_fixture();
    let item = published_item("posts", "/posts/only", BASE);
    let item_id = item.id;
    fx.inventory.seed(item);
    let key = SitemapKey::for_type("posts", 1);

    fx.service.read(&key).await.expect("read").expect("doc");

    fx.inventory
        .delete_item(item_id)
        .await
        .expect("delete succeeds");
    let marker = CachedDocument {
        xml: "<marker/>".to_string(),
        last_modified: None,
        generated_at: OffsetDateTime::now_utc(),
    };
    fx.store
        .put_both(&key, &marker, Duration::ZERO)
        .await
        .expect("store");

    // The stale copy is still served once; the rebuild then discovers the
    // emptied scope and drops the key instead of writing a hollow page.
    let served = fx.service.read(&key).await.expect("read").expect("doc");
    assert_eq!(served.tier, ServedTier::Stale);

    for _ in 0..100 {
        if fx.store.get_stale(&key).await.expect("store").is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("rebuild never dropped the emptied key");
}

#[tokio::test]
async fn content_mutation_invalidates_every_page_and_the_index() {
    let fx = cache_fixture();
    seed_many(&fx.inventory, "posts", 2500);
    seed_many(&fx.inventory, "pages", 1);

    for page in 1..=3 {
        fx.service
            .read(&SitemapKey::for_type("posts", page))
            .await
            .expect("read")
            .expect("doc");
    }
    fx.service
        .read(&SitemapKey::index())
        .await
        .expect("read")
        .expect("doc");
    fx.service
        .read(&SitemapKey::for_type("pages", 1))
        .await
        .expect("read")
        .expect("doc");

    let trigger = CacheTrigger::new(SitemapCacheConfig::default(), fx.store.clone());
    trigger.content_changed("posts").await;

    for page in 1..=3 {
        let key = SitemapKey::for_type("posts", page);
        assert!(fx.store.get_fresh(&key).await.expect("store").is_none());
        assert!(fx.store.get_stale(&key).await.expect("store").is_none());
    }
    let index = SitemapKey::index();
    assert!(fx.store.get_fresh(&index).await.expect("store").is_none());
    assert!(fx.store.get_stale(&index).await.expect("store").is_none());

    // Unrelated scopes keep their tiers.
    let pages = SitemapKey::for_type("pages", 1);
    assert!(fx.store.get_stale(&pages).await.expect("store").is_some());
}

#[tokio::test]
async fn disabled_cache_regenerates_on_every_read() {
    let fx = cache_fixture_with(SitemapCacheConfig {
        enabled: false,
        ..Default::default()
    });
    seed_many(&fx.inventory, "posts", 2);
    let key = SitemapKey::for_type("posts", 1);

    fx.service.read(&key).await.expect("read").expect("doc");
    fx.service.read(&key).await.expect("read").expect("doc");

    assert_eq!(fx.inventory.page_fetch_count(), 2);
    assert!(fx.store.get_fresh(&key).await.expect("store").is_none());
    assert!(fx.store.get_stale(&key).await.expect("store").is_none());
}

async fn wait_for_fresh(store: &MemoryDocumentStore, key: &SitemapKey) -> CachedDocument {
    for _ in 0..100 {
        if let Some(document) = store.get_fresh(key).await.expect("store")
            && document.xml != "<marker/>"
        {
            return document;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background rebuild never refreshed the fresh tier");
}

// ---------------------------------------------------------------------------
// Public HTTP surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sitemap_index_is_served_with_cache_headers() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 1);
    let router = sitemap_router(inventory, true);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/sitemap.xml")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/xml; charset=utf-8")
    );
    assert_eq!(
        headers
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("public, max-age=900")
    );
    assert_eq!(
        headers.get(header::AGE).and_then(|value| value.to_str().ok()),
        Some("0")
    );
    assert!(headers.get(header::LAST_MODIFIED).is_some());

    let body = body_string(response).await;
    assert!(body.contains("<sitemapindex"));
    assert!(body.contains("https://example.com/sitemaps/posts.xml"));
}

#[tokio::test]
async fn paginated_page_is_served_and_a_page_past_the_end_is_not() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 2500);
    let router = sitemap_router(inventory, true);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/sitemaps/posts-3.xml")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(body.matches("<url>").count(), 500);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/sitemaps/posts-4.xml")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_types_and_non_sitemap_names_are_404() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 1);
    let router = sitemap_router(inventory, true);

    for uri in ["/sitemaps/ghosts.xml", "/sitemaps/posts.pdf"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn disabled_sitemaps_answer_404_everywhere() {
    let inventory = Arc::new(MemoryInventory::new());
    seed_many(&inventory, "posts", 1);
    let router = sitemap_router(inventory, false);

    for uri in ["/sitemap.xml", "/sitemaps/posts.xml"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = router
        .oneshot(
            Request::builder()
                .uri("/robots.txt")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_string(response).await.contains("Sitemap:"));
}

#[tokio::test]
async fn robots_txt_advertises_the_sitemap_index() {
    let inventory = Arc::new(MemoryInventory::new());
    let router = sitemap_router(inventory, true);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/robots.txt")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Sitemap: https://example.com/sitemap.xml"));
}
