use super::*;

#[tokio::test]
async fn test_health_endpoint() {
    let temp = tempdir().unwrap();
    let app = test_router(test_config(&temp));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let temp = tempdir().unwrap();
    let app = test_router(test_config(&temp));

    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["info"]["title"], "manifest-dl HTTP API");
    assert!(json["paths"]["/"]["post"].is_object());
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let temp = tempdir().unwrap();

    let enabled = test_router(test_config(&temp));
    let response = enabled
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = test_config(&temp);
    config.api.swagger_ui = false;
    let disabled = test_router(config);
    let response = disabled
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
