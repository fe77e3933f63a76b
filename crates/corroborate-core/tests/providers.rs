use corroborate_core::{
    EncyclopediaProvider, HttpConfig, ProviderError, ReliabilityTable, SourceProvider, WebProvider,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_for(server: &MockServer, scrape_pages: bool) -> HttpConfig {
    HttpConfig {
        duckduckgo_url: server.uri(),
        bing_url: server.uri(),
        wikipedia_url: server.uri(),
        engine_delay_ms: 0,
        scrape_pages,
        ..HttpConfig::default()
    }
}

const BING_PAGE: &str = r#"
<html><body><ol id="b_results">
  <li class="b_algo">
    <h2><a href="https://www.nature.com/articles/solar">Solar cells hit new record</a></h2>
    <div class="b_caption"><p>Perovskite tandem cells reached 33% efficiency in laboratory tests.</p></div>
  </li>
  <li class="b_algo">
    <h2><a href="/relative/result">Relative result</a></h2>
    <div class="b_caption">Caption only snippet about rooftop installations.</div>
  </li>
  <li class="b_ad"><h2>Sponsored</h2><p>Buy panels now.</p></li>
</ol></body></html>
"#;

#[tokio::test]
async fn web_provider_merges_both_engines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "solar power"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "Solar power",
            "Abstract": "Solar power is the conversion of energy from sunlight into electricity.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Solar_power",
            "RelatedTopics": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "solar power"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_PAGE))
        .mount(&server)
        .await;

    let provider =
        WebProvider::new(http_for(&server, false), ReliabilityTable::default()).expect("client");
    let items = provider.fetch("solar power", 8).await.expect("items");

    assert_eq!(items.len(), 3);

    assert_eq!(items[0].source_name(), "WebSearch:duckduckgo");
    assert_eq!(items[0].title(), "Solar power");
    assert!((items[0].reliability() - 0.7).abs() < 1e-9);

    assert_eq!(items[1].source_name(), "WebSearch:bing");
    assert_eq!(items[1].title(), "Solar cells hit new record");
    assert_eq!(items[1].url(), Some("https://www.nature.com/articles/solar"));
    assert!((items[1].reliability() - 0.9).abs() < 1e-9);

    let relative = format!("{}/relative/result", server.uri());
    assert_eq!(items[2].url(), Some(relative.as_str()));
    assert_eq!(
        items[2].content(),
        "Caption only snippet about rooftop installations."
    );
}

#[tokio::test]
async fn web_provider_tolerates_one_engine_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_PAGE))
        .mount(&server)
        .await;

    let provider =
        WebProvider::new(http_for(&server, false), ReliabilityTable::default()).expect("client");
    let items = provider.fetch("solar power", 8).await.expect("items");

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.source_name() == "WebSearch:bing"));
}

#[tokio::test]
async fn web_provider_fails_when_every_engine_fails() {
    let server = MockServer::start().await;

    let provider =
        WebProvider::new(http_for(&server, false), ReliabilityTable::default()).expect("client");
    let err = provider.fetch("solar power", 8).await.expect_err("no engine answered");

    assert!(matches!(err, ProviderError::AllEnginesFailed { .. }));
    assert_eq!(err.provider(), "web");
}

#[tokio::test]
async fn scraped_article_text_replaces_shorter_snippet() {
    let server = MockServer::start().await;
    let article_url = format!("{}/article", server.uri());
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "Solar power",
            "Abstract": "Short abstract.",
            "AbstractURL": article_url,
            "RelatedTopics": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><nav>Menu</nav><article><h1>Solar</h1>\
             <p>Rooftop solar output grew strongly across Europe last year.</p>\
             <script>track()</script></article></body></html>",
        ))
        .mount(&server)
        .await;

    let provider =
        WebProvider::new(http_for(&server, true), ReliabilityTable::default()).expect("client");
    let items = provider.fetch("solar", 8).await.expect("items");

    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].content(),
        "Solar Rooftop solar output grew strongly across Europe last year."
    );
    assert!((items[0].reliability() - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn encyclopedia_follows_disambiguation_and_skips_missing_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("list", "search"))
        .and(query_param("srsearch", "mercury"))
        .and(query_param("srlimit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"search": [
                {"title": "Mercury planet"},
                {"title": "Mercury"},
                {"title": "Lost article"}
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Mercury_planet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "title": "Mercury (planet)",
            "extract": "Mercury is the first planet from the Sun and the smallest in the Solar System.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Mercury_(planet)"}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "disambiguation",
            "title": "Mercury",
            "extract": "Mercury may refer to:"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("prop", "links"))
        .and(query_param("titles", "Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"pages": {"19694": {
                "title": "Mercury",
                "links": [{"ns": 0, "title": "Quicksilver"}]
            }}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Quicksilver"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "title": "Quicksilver",
            "extract": "Quicksilver is an old name for the element mercury, a liquid metal.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Quicksilver"}}
        })))
        .mount(&server)
        .await;

    let provider = EncyclopediaProvider::new(http_for(&server, false), ReliabilityTable::default())
        .expect("client");
    let items = provider.fetch("mercury", 3).await.expect("items");

    assert_eq!(items.len(), 2);
    let planet = &items[0];
    assert_eq!(planet.source_name(), "Encyclopedia");
    assert_eq!(planet.title(), "Mercury (planet)");
    assert_eq!(planet.url(), Some("https://en.wikipedia.org/wiki/Mercury_(planet)"));
    assert!((planet.reliability() - 0.8).abs() < 1e-9);

    let resolved = &items[1];
    assert_eq!(resolved.title(), "Quicksilver");
    assert_eq!(resolved.url(), Some("https://en.wikipedia.org/wiki/Quicksilver"));
    assert!(resolved.content().starts_with("Quicksilver is an old name"));
}

#[tokio::test]
async fn encyclopedia_search_failure_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = EncyclopediaProvider::new(http_for(&server, false), ReliabilityTable::default())
        .expect("client");
    let err = provider.fetch("mercury", 3).await.expect_err("search failed");

    assert!(matches!(err, ProviderError::Status { .. }));
}
