//! A scripted vendor API on top of wiremock.

use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const APP_KEY: &str = "test-key";
pub const APP_SECRET: &str = "test-secret";
pub const AUTH_PATH: &str = "/external/genToken";
pub const COMPONENTS_PATH: &str = "/external/component/getComponentInfos";

/// Matches the first listing request, which carries no cursor body.
pub struct NoBody;

impl Match for NoBody {
    fn matches(&self, request: &Request) -> bool {
        request.body.is_empty()
    }
}

#[must_use]
pub fn base_url(server: &MockServer) -> String {
    format!("{}/external/", server.uri())
}

#[must_use]
pub fn token_response(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 200,
        "message": "success",
        "data": token,
    }))
}

/// Answers every handshake with `token`.
pub async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .and(body_json(json!({ "appKey": APP_KEY, "appSecret": APP_SECRET })))
        .respond_with(token_response(token))
        .mount(server)
        .await;
}

#[must_use]
pub fn record(lcsc: &str, stock: i64, category: &str, subcategory: &str, description: &str) -> Value {
    json!({
        "lcscPart": lcsc,
        "mfrPart": format!("MPN-{lcsc}"),
        "package": "0603",
        "solderJoint": 2,
        "manufacturer": "UNI-ROYAL",
        "libraryType": "base",
        "description": description,
        "datasheet": format!("https://example.invalid/{lcsc}.pdf"),
        "stock": stock,
        "price": "1-199:0.0021,200-999:0.0012",
        "firstCategory": category,
        "secondCategory": subcategory,
    })
}

#[must_use]
pub fn page(records: Vec<Value>, last_key: Option<&str>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 200,
        "message": "success",
        "data": { "componentInfos": records, "lastKey": last_key },
    }))
}

/// Mounts the response for the page requested with `cursor` (`None` for the first page).
pub async fn mount_page(server: &MockServer, cursor: Option<&str>, response: ResponseTemplate) {
    let mock = Mock::given(method("POST")).and(path(COMPONENTS_PATH));
    let mock = match cursor {
        Some(cursor) => mock.and(body_json(json!({ "lastKey": cursor }))),
        None => mock.and(NoBody),
    };
    mock.respond_with(response).mount(server).await;
}

/// Like [`mount_page`], but only for requests carrying `token`.
pub async fn mount_page_for_token(
    server: &MockServer,
    token: &str,
    cursor: Option<&str>,
    response: ResponseTemplate,
) {
    let mock = Mock::given(method("POST"))
        .and(path(COMPONENTS_PATH))
        .and(header("externalApiToken", token));
    let mock = match cursor {
        Some(cursor) => mock.and(body_json(json!({ "lastKey": cursor }))),
        None => mock.and(NoBody),
    };
    mock.respond_with(response).mount(server).await;
}

/// Number of requests the server saw on `path`.
pub async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
