//! Scrapers against a local mock server

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ttscrape::scraper::fabrik::{FabrikConfig, ProbeSummary};
use ttscrape::scraper::rankings_pages::CATEGORIES;
use ttscrape::scraper::{FabrikClient, HttpClient, RankingPagesScraper, ScraperConfig, ScraperError, WttClient};

fn fast_client() -> HttpClient {
    HttpClient::new(ScraperConfig {
        delay_ms: 0,
        backoff_base_ms: 1,
        retry_after_default_secs: 0,
        ..Default::default()
    })
    .unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

#[tokio::test]
async fn test_retries_server_error_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let http = fast_client();
    let value = http
        .get_json(&format!("{}/data", server.uri()), &[])
        .await
        .unwrap();
    assert_eq!(value, Some(json!({"ok": true})));
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_not_found_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let http = fast_client();
    let value = http.get_json(&format!("{}/x", server.uri()), &[]).await.unwrap();
    assert!(value.is_none());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let http = fast_client();
    let err = http
        .get_text(&format!("{}/x", server.uri()), &[])
        .await
        .unwrap_err();
    match err {
        ScraperError::RetriesExhausted { attempts, last_error, .. } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("500"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_rate_limited_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let http = fast_client();
    let value = http.get_json(&server.uri(), &[]).await.unwrap();
    assert_eq!(value, Some(json!([])));
}

#[tokio::test]
async fn test_invalid_json_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let http = fast_client();
    assert!(http.get_json(&server.uri(), &[]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_wtt_rankings_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/RankingsCurrentWeek/CurrentWeek/GetRankingIndividuals"))
        .and(query_param("IttfId", "121558"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Result": [
                {"IttfId": "121558", "PlayerName": "WANG Chuqin", "CountryCode": "CHN", "SubEventCode": "MS"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/RankingsCurrentWeek/CurrentWeek/GetRankingIndividuals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Result": []})))
        .mount(&server)
        .await;

    let http = fast_client();
    let wtt = WttClient::with_base_url(&http, &server.uri());

    let (valid, name) = wtt.test_ittf_id("121558").await;
    assert!(valid);
    assert_eq!(name.as_deref(), Some("WANG Chuqin"));

    let found = wtt.discover_brute_force(121557, 121559).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ittf_id, "121558");
    assert_eq!(found[0].source, "API_brute_force");

    let batch = wtt
        .batch_fetch_rankings(&["121558".to_string(), "1".to_string()])
        .await;
    assert_eq!(batch["121558"].as_ref().map(Vec::len), Some(1));
    assert_eq!(batch["1"].as_ref().map(Vec::len), Some(0));

    let verified = wtt
        .verify_ids(&["121558".to_string(), "1".to_string()], "rankings_page")
        .await;
    assert!(verified[0].verified);
    assert_eq!(verified[0].name, "WANG Chuqin");
    assert!(!verified[1].verified);
    assert_eq!(verified[1].name, "Unknown");
    assert_eq!(verified[1].source, "rankings_page");
}

fn fabrik_row(id: u32) -> serde_json::Value {
    json!({
        "vw_matches___id": id,
        "vw_matches___yr_raw": 2025,
        "vw_matches___player_a_id": "1",
        "vw_matches___name_a": "WANG Chuqin",
        "vw_matches___player_x_id": "2",
        "vw_matches___name_x": "CALDERANO Hugo",
        "vw_matches___games_raw": "11:7 11:9 11:5"
    })
}

#[tokio::test]
async fn test_fabrik_stops_on_stagnant_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([fabrik_row(1), fabrik_row(2)])))
        .mount(&server)
        .await;

    let http = fast_client();
    let fabrik = FabrikClient::new(
        &http,
        FabrikConfig {
            base_url: format!("{}/index.php", server.uri()),
            page_size: 2,
            ..Default::default()
        },
    );

    let rows = fabrik.fetch_year(2025).await;
    assert_eq!(rows.len(), 2);
    // One productive page plus two stagnant ones
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_fabrik_paginates_until_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limitstart31", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[fabrik_row(1), fabrik_row(2)]])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("limitstart31", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([fabrik_row(2), fabrik_row(3)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let http = fast_client();
    let fabrik = FabrikClient::new(
        &http,
        FabrikConfig {
            base_url: server.uri(),
            page_size: 2,
            ..Default::default()
        },
    );

    let matches = fabrik.scrape_year(2025).await;
    let ids: Vec<&str> = matches.iter().map(|m| m.match_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(matches[0].final_sets.a, 3);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_fabrik_respects_match_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([fabrik_row(1), fabrik_row(2), fabrik_row(3)])))
        .mount(&server)
        .await;

    let http = fast_client();
    let fabrik = FabrikClient::new(
        &http,
        FabrikConfig {
            base_url: server.uri(),
            max_matches: Some(2),
            ..Default::default()
        },
    );

    assert_eq!(fabrik.fetch_year(2025).await.len(), 2);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_fabrik_list_access_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("listid", "55"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>Sorry, this list is not published</p>", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("listid", "31"))
        .and(query_param("vw_matches___yr[value]", "2025"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<a>Please login</a>", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("listid", "31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([fabrik_row(1)])))
        .mount(&server)
        .await;

    let http = fast_client();
    let fabrik = FabrikClient::new(
        &http,
        FabrikConfig {
            base_url: server.uri(),
            ..Default::default()
        },
    );

    let html = fabrik.probe_list("55", None).await;
    assert!(!html.success);
    assert_eq!(html.content_type.as_deref(), Some("html"));
    assert_eq!(html.error.as_deref(), Some("not_published"));

    let ok = fabrik.probe_list("31", None).await;
    assert!(ok.success);
    assert_eq!(ok.item_count, Some(1));

    let probes = fabrik
        .probe_lists(&["31".to_string(), "55".to_string()], 2025)
        .await;
    assert_eq!(probes.len(), 4);
    assert_eq!(probes[1].year, Some(2025));

    let summary = ProbeSummary::from_probes(&probes);
    assert_eq!(summary.working_endpoints, vec!["listid_31_default"]);
    assert_eq!(summary.auth_required, vec!["listid_31_year_2025"]);
    assert_eq!(summary.access_denied, vec!["listid_55_default", "listid_55_year_2025"]);
    assert!(summary.unknown_errors.is_empty());
}

#[tokio::test]
async fn test_ranking_pages_category() {
    let server = MockServer::start().await;
    let page = |ids: &[&str]| {
        let links: String = ids
            .iter()
            .map(|id| format!(r#"<a href="/player?player_id_raw={}">P</a>"#, id))
            .collect();
        format!("<html><body>{}</body></html>", links)
    };

    Mock::given(method("GET"))
        .and(path("/ittf-ranking-men-singles/list/57"))
        .and(query_param("limitstart57", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page(&["1", "2"]), "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ittf-ranking-men-singles/list/57"))
        .and(query_param("limitstart57", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page(&["3"]), "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page(&[]), "text/html"))
        .mount(&server)
        .await;

    let http = fast_client();
    let scraper = RankingPagesScraper::with_base_url(&http, &server.uri());

    let ids = scraper.scrape_category(&CATEGORIES[0]).await;
    assert_eq!(ids.len(), 3);
    assert!(ids.contains("3"));

    let db = scraper.scrape_all().await;
    assert_eq!(db.men_ids.len(), 3);
    assert!(db.women_ids.is_empty());
}
