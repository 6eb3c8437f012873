#![allow(clippy::unwrap_used, clippy::expect_used)]

use attendance_client::{ApiTransport, AttendanceClient};
use attendance_sdk::{AttendanceApi, AttendanceRecord, ErrorCode};
use chrono::NaiveDate;
use httpmock::prelude::*;
use rollcall_http::HttpClient;
use serde_json::json;
use url::Url;

fn client(server: &MockServer) -> AttendanceClient {
    let http = HttpClient::builder().allow_insecure_http().build().unwrap();
    let base = Url::parse(&server.url("/api.php")).unwrap();
    AttendanceClient::new(ApiTransport::new(http, base))
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn records_json() -> serde_json::Value {
    json!([
        {"person_id": "1", "name": "Jean", "surname": "Dupont", "familyname": "Martin",
         "id": "100", "attendance": true, "date": "2024-03-01"},
        {"person_id": "2", "name": "Linh", "surname": "Nguyen", "familyname": "",
         "id": "101", "attendance": 0, "date": "2024-03-01"},
        {"person_id": "3", "name": "Ada", "surname": "Okafor", "familyname": "Eze",
         "id": null, "attendance": null, "date": null},
        {"person_id": 4, "name": "Awa", "surname": "Diallo", "familyname": "Ba",
         "id": 102, "attendance": 1, "date": "2024-03-01"}
    ])
}

fn mock_records(server: &MockServer, body: serde_json::Value) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/api.php")
            .query_param("param", "attendance")
            .query_param("date", "2024-03-01");
        then.status(200).json_body(body);
    })
}

fn mock_batch_reply<'a>(server: &'a MockServer, status: u16, body: &'static str) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api.php")
            .query_param("param", "post_attendance");
        then.status(status).body(body);
    })
}

fn batch() -> Vec<AttendanceRecord> {
    vec![AttendanceRecord {
        person_id: "1".into(),
        name: "Jean".into(),
        surname: "Dupont".into(),
        family_name: "Martin".into(),
        id: None,
        attendance: Some(true),
        date: Some(day()),
    }]
}

#[tokio::test]
async fn get_by_date_sends_iso_date_and_parses_records() {
    let server = MockServer::start();
    let mock = mock_records(&server, records_json());

    let records = client(&server).get_by_date(day()).await.unwrap();

    mock.assert();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].attendance, Some(true));
    assert_eq!(records[1].attendance, Some(false));
    assert_eq!(records[2].attendance, None);
    assert!(!records[2].is_recorded());
    assert_eq!(records[3].person_id, "4");
    assert_eq!(records[3].date, Some(day()));
}

#[tokio::test]
async fn get_by_date_rejects_non_array_payload() {
    let server = MockServer::start();
    mock_records(&server, json!({"records": []}));

    let err = client(&server).get_by_date(day()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidResponse);
}

#[tokio::test]
async fn get_by_date_tolerates_placeholder_dates() {
    let server = MockServer::start();
    mock_records(
        &server,
        json!([
            {"person_id": "1", "attendance": true, "id": "100", "date": "0000-00-00"},
            {"person_id": "2", "attendance": false, "id": "101", "date": ""}
        ]),
    );

    let records = client(&server).get_by_date(day()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.date.is_none()));
}

#[tokio::test]
async fn stats_partition_every_record() {
    let server = MockServer::start();
    mock_records(&server, records_json());

    let stats = client(&server).get_stats(day()).await.unwrap();

    assert_eq!(stats.attended, 2);
    // one explicit absence plus one unmarked record
    assert_eq!(stats.absent, 2);
    assert_eq!(stats.total(), 4);
}

#[tokio::test]
async fn stats_propagate_fetch_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api.php");
        then.status(503);
    });

    let err = client(&server).get_stats(day()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::HttpError);
    assert_eq!(err.status, Some(503));
}

#[tokio::test]
async fn post_batch_sends_records_as_json_array() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api.php")
            .query_param("param", "post_attendance")
            .header("content-type", "application/json")
            .json_body(json!([{
                "person_id": "1", "name": "Jean", "surname": "Dupont",
                "familyname": "Martin", "id": null, "attendance": true,
                "date": "2024-03-01"
            }]));
        then.status(200).json_body(json!({"success": true}));
    });

    assert!(client(&server).post_batch(&batch()).await.unwrap());
    mock.assert();
}

#[tokio::test]
async fn post_batch_empty_reply_is_success() {
    let server = MockServer::start();
    mock_batch_reply(&server, 200, "");

    assert!(client(&server).post_batch(&batch()).await.unwrap());
}

#[tokio::test]
async fn post_batch_non_json_reply_is_success() {
    let server = MockServer::start();
    mock_batch_reply(&server, 200, "Attendance saved");

    assert!(client(&server).post_batch(&batch()).await.unwrap());
}

#[tokio::test]
async fn post_batch_reports_explicit_failure_flag() {
    let server = MockServer::start();
    mock_batch_reply(&server, 200, r#"{"success": false, "error": "locked"}"#);

    assert!(!client(&server).post_batch(&batch()).await.unwrap());
}

#[tokio::test]
async fn post_batch_non_2xx_is_http_error() {
    let server = MockServer::start();
    mock_batch_reply(&server, 500, "");

    let err = client(&server).post_batch(&batch()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::HttpError);
    assert_eq!(err.status, Some(500));
}

#[tokio::test]
async fn mark_one_posts_command_to_base_url() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api.php").json_body(json!({
            "param": "mark_attendance",
            "person_id": "7",
            "date": "2024-03-01",
            "is_present": false
        }));
        then.status(200).json_body(json!({"success": true}));
    });

    assert!(client(&server).mark_one("7", day(), false).await.unwrap());
    mock.assert();
}

#[tokio::test]
async fn mark_one_without_success_flag_is_false() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api.php");
        then.status(200).json_body(json!({"message": "ok"}));
    });

    assert!(!client(&server).mark_one("7", day(), true).await.unwrap());
}

#[tokio::test]
async fn mark_one_rejects_non_json_reply() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api.php");
        then.status(200).body("Attendance saved");
    });

    let err = client(&server).mark_one("7", day(), true).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::UnknownError);
}

#[tokio::test]
async fn mark_one_non_2xx_is_http_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api.php");
        then.status(404);
    });

    let err = client(&server).mark_one("7", day(), true).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::HttpError);
    assert_eq!(err.status, Some(404));
}
