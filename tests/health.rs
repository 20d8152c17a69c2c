use axum_marketplace_api::routes::health::health_check;

#[tokio::test]
async fn health_check_reports_ok() {
    let response = health_check().await.0;
    assert_eq!(response.message, "Health check");
    assert_eq!(response.data.unwrap().status, "ok");
}
