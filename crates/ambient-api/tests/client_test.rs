#![allow(clippy::unwrap_used)]
// Data endpoint tests for `AmbientClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ambient_api::{AmbientClient, Credentials, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

/// Start a server with a working password grant and a client pointed at it.
async fn setup() -> (MockServer, AmbientClient) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": { "id": "user-123" }
        })))
        .mount(&server)
        .await;

    let base_url = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default().with_anon_key(SecretString::from("anon-test-key"));
    let credentials = Credentials::new("owner@example.com", SecretString::from("hunter2"));
    let client = AmbientClient::new(base_url, credentials, &transport).unwrap();
    (server, client)
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/devices"))
        .and(query_param("user_id", "eq.user-123"))
        .and(query_param("order", "last_seen.desc.nullslast"))
        .and(header("apikey", "anon-test-key"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "device_id": "amb-001",
                "name": "Bedroom",
                "last_seen": "2025-03-01T12:00:00+00:00",
                "firmware_version": "1.4.2",
                "battery_percentage": 87,
                "wifi_rssi": -61,
                "locations": { "name": "Home" },
                "spaces": null
            },
            {
                "device_id": "amb-002",
                "name": "Office",
                "last_seen": null,
                "locations": null
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_id, "amb-001");
    assert_eq!(devices[0].location_name.as_deref(), Some("Home"));
    assert_eq!(devices[0].battery_percentage, Some(87));
    assert_eq!(devices[1].name, "Office");
    assert!(devices[1].last_seen.is_none());
}

#[tokio::test]
async fn test_list_devices_requests_joined_location() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/devices"))
        .and(query_param(
            "select",
            "device_id,name,last_seen,firmware_version,space_id,location_id,\
battery_percentage,wifi_rssi,organization_id,user_id,\
spaces!devices_space_id_fkey(name),locations!devices_location_id_fkey(name)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_list_devices_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/devices"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("upstream connect error"),
        )
        .mount(&server)
        .await;

    let result = client.list_devices().await;

    match result {
        Err(Error::Api { status, ref message }) => {
            assert_eq!(status, 503);
            assert!(message.contains("upstream"), "got: {message}");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_data_call_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let result = client.list_devices().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "not": "an array" })))
        .mount(&server)
        .await;

    let result = client.list_devices().await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Readings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_latest_reading() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sensor_averages"))
        .and(query_param("device_id", "eq.amb-001"))
        .and(query_param("aggregation_type", "eq.minute"))
        .and(query_param("order", "timestamp.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "device_id": "amb-001",
            "aggregation_type": "minute",
            "timestamp": "2025-03-01T12:00:00+00:00",
            "pm1_0": 1.1,
            "pm2_5": 3.4,
            "pm4_0": 4.0,
            "pm10_0": 5.2,
            "co2": 640,
            "voc_index": 98,
            "nox_index": 1,
            "temperature": 21.5,
            "humidity": 44.0,
            "iaq_score": 8.6,
            "aqi_category": "Good",
            "primary_pollutant": "pm2_5"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let reading = client.get_latest_reading("amb-001").await.unwrap().unwrap();

    assert_eq!(reading.pm2_5, Some(3.4));
    assert_eq!(reading.co2, Some(640));
    assert_eq!(reading.iaq_score, Some(8.6));
    assert_eq!(reading.aqi_category.as_deref(), Some("Good"));
    assert_eq!(reading.primary_pollutant.as_deref(), Some("pm2_5"));
}

#[tokio::test]
async fn test_get_latest_reading_empty_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sensor_averages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let reading = client.get_latest_reading("amb-404").await.unwrap();
    assert!(reading.is_none());
}

#[tokio::test]
async fn test_get_realtime_iaq() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sensor_realtime"))
        .and(query_param("select", "device_id,iaq_score,timestamp"))
        .and(query_param("device_id", "eq.amb-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "device_id": "amb-001",
            "iaq_score": 7.9,
            "timestamp": "2025-03-01T12:00:05Z"
        }])))
        .mount(&server)
        .await;

    let live = client.get_realtime_iaq("amb-001").await.unwrap().unwrap();
    assert_eq!(live.iaq_score, Some(7.9));
}

// ── Events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_recent_events_with_limit() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/device_events"))
        .and(query_param("device_id", "eq.amb-001"))
        .and(query_param("order", "timestamp.desc"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 2,
                "device_id": "amb-001",
                "timestamp": "2025-03-01T12:05:00Z",
                "event_type": "co2_high",
                "severity": "warning",
                "message": "CO2 above 1000 ppm"
            },
            {
                "id": 1,
                "device_id": "amb-001",
                "timestamp": "2025-03-01T11:00:00Z",
                "event_type": "online"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let events = client.get_recent_events("amb-001", 5).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type.as_deref(), Some("co2_high"));
    assert_eq!(events[0].severity.as_deref(), Some("warning"));
    assert_eq!(events[1].message, None);
}
