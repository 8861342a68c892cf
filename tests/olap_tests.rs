//! Integration tests for OLAP column discovery and report building.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use iiko_api::reports::{ReportError, ReportRequest, ReportType};
use iiko_api::{BaseUrl, IikoClient, IikoConfig, Login, Password, TokenStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A client that already holds the persisted token `tok`.
fn client_for(server: &MockServer, dir: &TempDir) -> IikoClient {
    let token_path = dir.path().join(".iiko_token");
    TokenStore::new(&token_path).save("tok");

    let config = IikoConfig::builder()
        .base_url(BaseUrl::new(format!("{}/resto/api", server.uri())).unwrap())
        .login(Login::new("admin").unwrap())
        .password(Password::new("secret").unwrap())
        .token_storage_path(token_path)
        .max_retries(0)
        .retry_backoff(Duration::from_millis(10))
        .build()
        .unwrap();
    IikoClient::new(config).unwrap()
}

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn query_value(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

// ============================================================================
// Columns
// ============================================================================

#[tokio::test]
async fn test_columns_from_json_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/v2/reports/olap/columns"))
        .and(query_param("reportType", "SALES"))
        .and(query_param("key", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DishSumInt": {
                "name": "Сумма без скидки",
                "type": "MONEY",
                "aggregationAllowed": true,
                "groupingAllowed": false,
                "filteringAllowed": true,
                "tags": ["Оплата", "Блюдо"]
            },
            "Department": {
                "name": "Торговое предприятие",
                "type": "STRING",
                "aggregationAllowed": false,
                "groupingAllowed": true,
                "filteringAllowed": true,
                "tags": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    let columns = client.olap().columns(&ReportType::Sales).await.unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].id, "DishSumInt");
    assert_eq!(columns[0].column_type, "MONEY");
    assert!(columns[0].aggregation_allowed);
    assert!(!columns[0].grouping_allowed);

    let record = columns[0].to_record();
    assert_eq!(record["tags"], "Оплата, Блюдо");
    assert_eq!(record["aggregationAllowed"], "True");
    assert!(!columns[1].to_record().contains_key("tags"));
}

#[tokio::test]
async fn test_columns_from_xml_catalog() {
    let server = MockServer::start().await;
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<columns>
  <column name="OpenDate.Typed" caption="Учетный день" type="DATE" groupingAllowed="true" filteringAllowed="true" aggregationAllowed="false"/>
  <column name="GuestNum" caption="Гостей" type="INTEGER" aggregationAllowed="TRUE" legacyId="17"/>
</columns>"#;
    Mock::given(method("GET"))
        .and(path("/resto/api/v2/reports/olap/columns"))
        .and(query_param("reportType", "ORDERS"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(xml, "application/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    let columns = client.olap().columns(&ReportType::Orders).await.unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].id, "OpenDate.Typed");
    assert_eq!(columns[0].caption, "Учетный день");
    assert!(columns[0].grouping_allowed);
    assert!(columns[1].aggregation_allowed);
    assert_eq!(columns[1].extra["legacyId"], "17");
}

#[tokio::test]
async fn test_malformed_json_catalog_reports_snippet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/v2/reports/olap/columns"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{\"DishSumInt\": {\"type\": ", "application/json"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);

    match client.olap().columns(&ReportType::Sales).await {
        Err(ReportError::InvalidJson { snippet, .. }) => {
            assert_eq!(snippet, "{\"DishSumInt\": {\"type\": ");
        }
        other => panic!("expected InvalidJson, got {other:?}"),
    }
}

// ============================================================================
// Single reports
// ============================================================================

#[tokio::test]
async fn test_build_report_posts_payload_and_maps_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resto/api/v2/reports/olap"))
        .and(query_param("key", "tok"))
        .and(query_param("summary", "true"))
        .and(query_param("dateFrom", "2026-01-05T00:00:00"))
        .and(query_param("dateTo", "2026-01-12T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"Department": "Hall", "DishDiscountSumInt": 1200, "GuestNum": 30},
                {"Department": "Bar", "DishDiscountSumInt": 300, "GuestNum": 12}
            ],
            "summary": ["", 1500, 42]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    let request = ReportRequest::new(ReportType::Sales)
        .date_range(midnight(2026, 1, 5), midnight(2026, 1, 12))
        .group_by(["Department"])
        .aggregate(["DishDiscountSumInt", "GuestNum"]);

    let report = client.olap().build_report(&request).await.unwrap();

    assert_eq!(report.rows.len(), 2);
    let summary = report.summary.unwrap();
    assert_eq!(summary["DishDiscountSumInt"], 1500);
    assert_eq!(summary["GuestNum"], 42);

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        body,
        json!({
            "reportType": "SALES",
            "groupByRowFields": ["Department"],
            "aggregateFields": ["DishDiscountSumInt", "GuestNum"]
        })
    );
}

#[tokio::test]
async fn test_build_report_rejects_non_json_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resto/api/v2/reports/olap"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    let request = ReportRequest::new(ReportType::Sales).aggregate(["DishSumInt"]);

    assert!(matches!(
        client.olap().build_report(&request).await,
        Err(ReportError::InvalidJson { .. })
    ));
}

#[tokio::test]
async fn test_build_report_raw_sends_indexed_columns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/v2/reports/olap"))
        .and(query_param("reportType", "SALES"))
        .and(query_param("dateFrom", "01.01.2026"))
        .and(query_param("dateTo", "31.01.2026"))
        .and(query_param("buildSummary", "false"))
        .and(query_param("columns[0]", "Department"))
        .and(query_param("columns[1]", "DishSumInt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<report/>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);

    let body = client
        .olap()
        .build_report_raw(
            &ReportType::Sales,
            &["Department".to_string(), "DishSumInt".to_string()],
            "01.01.2026",
            "31.01.2026",
            false,
        )
        .await
        .unwrap();
    assert_eq!(body, "<report/>");
}

// ============================================================================
// Chunked reports
// ============================================================================

#[tokio::test]
async fn test_chunked_report_walks_week_windows_and_merges() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resto/api/v2/reports/olap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [["Hall", 100, 4], ["Bar", 20, 1]],
            "summary": ["", 120, 5]
        })))
        .expect(5)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    let request = ReportRequest::new(ReportType::Sales)
        .date_range(midnight(2026, 1, 1), midnight(2026, 2, 2))
        .group_by(["Department"])
        .aggregate(["DishDiscountSumInt", "GuestNum"]);

    let result = client
        .olap()
        .build_report_chunked(&request, Some("OpenDate.Typed"))
        .await
        .unwrap();

    // 2026-01-01 is a Thursday, so the first window is short
    let expected_starts = [
        midnight(2026, 1, 1),
        midnight(2026, 1, 5),
        midnight(2026, 1, 12),
        midnight(2026, 1, 19),
        midnight(2026, 1, 26),
    ];
    assert_eq!(result.chunks.len(), 5);
    for (chunk, start) in result.chunks.iter().zip(expected_starts) {
        assert_eq!(chunk.window_start, start);
        assert_eq!(chunk.row_count, 2);
    }
    for pair in result.chunks.windows(2) {
        assert_eq!(pair[0].window_end, pair[1].window_start);
    }
    assert_eq!(result.chunks[4].window_end, midnight(2026, 2, 2));

    assert_eq!(result.row_count(), 10);
    let summary = result.report.summary.as_ref().unwrap();
    assert_eq!(summary["DishDiscountSumInt"], 600);
    assert_eq!(summary["GuestNum"], 25);
    assert_eq!(result.report.records()[1]["Department"], "Bar");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 5);

    assert_eq!(
        query_value(&received[0], "dateFrom").as_deref(),
        Some("2026-01-01T00:00:00")
    );
    assert_eq!(
        query_value(&received[0], "dateTo").as_deref(),
        Some("2026-01-05T00:00:00")
    );

    let first_body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        first_body["filters"]["OpenDate.Typed"],
        json!({
            "filterType": "DateRange",
            "periodType": "CUSTOM",
            "from": "2026-01-01T00:00:00.000",
            "to": "2026-01-05T00:00:00.000",
            "includeLow": true,
            "includeHigh": false
        })
    );

    let last_body: Value = serde_json::from_slice(&received[4].body).unwrap();
    assert_eq!(
        last_body["filters"]["OpenDate.Typed"]["from"],
        "2026-01-26T00:00:00.000"
    );
    assert_eq!(
        last_body["filters"]["OpenDate.Typed"]["to"],
        "2026-02-02T00:00:00.000"
    );
}

#[tokio::test]
async fn test_chunked_report_without_filter_field_sends_no_filters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resto/api/v2/reports/olap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    // Wednesday to the following Wednesday spans two windows
    let request = ReportRequest::new(ReportType::Sales)
        .date_range(midnight(2026, 1, 7), midnight(2026, 1, 14))
        .aggregate(["DishSumInt"]);

    let result = client
        .olap()
        .build_report_chunked(&request, None)
        .await
        .unwrap();

    assert_eq!(result.row_count(), 0);
    assert!(result.report.summary.is_none());

    for received in server.received_requests().await.unwrap() {
        let body: Value = serde_json::from_slice(&received.body).unwrap();
        assert!(body.get("filters").is_none());
    }
}

#[tokio::test]
async fn test_chunked_report_requires_date_range() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);

    let request = ReportRequest::new(ReportType::Sales).aggregate(["DishSumInt"]);
    assert!(matches!(
        client.olap().build_report_chunked(&request, None).await,
        Err(ReportError::MissingDateRange)
    ));

    let inverted = request.date_range(midnight(2026, 2, 1), midnight(2026, 1, 1));
    assert!(matches!(
        client.olap().build_report_chunked(&inverted, None).await,
        Err(ReportError::InvalidDateRange { .. })
    ));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chunked_report_stops_at_first_failed_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resto/api/v2/reports/olap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [[1]]})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resto/api/v2/reports/olap"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Too many fields"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir);
    let request = ReportRequest::new(ReportType::Sales)
        .date_range(midnight(2026, 1, 1), midnight(2026, 2, 2))
        .aggregate(["DishSumInt"]);

    match client.olap().build_report_chunked(&request, None).await {
        Err(ReportError::Client(e)) => assert_eq!(e.status(), Some(400)),
        other => panic!("expected client error, got {other:?}"),
    }
}
