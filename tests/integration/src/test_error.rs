//! Error envelope, routing and health integration tests.

#[cfg(test)]
mod tests {
    use crate::{endpoint_url, http_client, object_url, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_no_such_key_envelope() {
        let client = http_client();
        let bucket = test_bucket_name("err");
        let resp = client
            .get(object_url(&bucket, "missing.txt"))
            .send()
            .await
            .expect("get_object");
        assert_eq!(resp.status(), 404);
        let request_id = resp
            .headers()
            .get("x-amz-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("request id header");
        let body = resp.text().await.expect("error body");
        assert!(body.contains("<Code>NoSuchKey</Code>"));
        assert!(body.contains("<Key>missing.txt</Key>"));
        assert!(body.contains(&format!("<RequestId>{request_id}</RequestId>")));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unauthenticated_put() {
        let client = http_client();
        let bucket = test_bucket_name("noauth");
        let resp = client
            .put(object_url(&bucket, "a.txt"))
            .body("x")
            .send()
            .await
            .expect("put_object");
        assert_eq!(resp.status(), 403);
        assert!(resp.text().await.expect("body").contains("<Code>InvalidToken</Code>"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_traversal() {
        let client = http_client();
        let resp = client
            .get(format!("{}/buckets/b/..%2F..%2Fetc%2Fpasswd", endpoint_url()))
            .send()
            .await
            .expect("get_object");
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let client = http_client();
        let json: serde_json::Value = client
            .get(format!("{}/health", endpoint_url()))
            .send()
            .await
            .expect("health")
            .json()
            .await
            .expect("health JSON");
        assert_eq!(json["status"], "running");
        assert_eq!(json["service"], "stowage");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_no_such_route() {
        let client = http_client();
        let resp = client
            .get(format!("{}/nowhere", endpoint_url()))
            .send()
            .await
            .expect("unknown route");
        assert_eq!(resp.status(), 404);
        assert!(resp.text().await.expect("body").contains("<Code>NoSuchRoute</Code>"));
    }
}
