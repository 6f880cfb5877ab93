//! Signed upload URL integration tests.

#[cfg(test)]
mod tests {
    use crate::{bearer_token, cleanup_keys, http_client, object_url, test_bucket_name};

    async fn issue(client: &reqwest::Client, bucket: &str, key: &str, ttl: u64) -> serde_json::Value {
        let resp = client
            .post(format!("{}/signed-url?expires={ttl}", object_url(bucket, key)))
            .bearer_auth(bearer_token())
            .send()
            .await
            .expect("create signed url");
        assert_eq!(resp.status(), 200);
        resp.json().await.expect("signed url JSON")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_through_signed_url() {
        let client = http_client();
        let bucket = test_bucket_name("signed");

        let issued = issue(&client, &bucket, "upload.txt", 60).await;
        assert_eq!(issued["method"], "PUT");
        assert_eq!(issued["expires_in"], 60);
        let url = issued["url"].as_str().expect("url");

        let resp = client
            .put(url)
            .body("signed upload")
            .send()
            .await
            .expect("signed put");
        assert_eq!(resp.status(), 200);

        let body = client
            .get(object_url(&bucket, "upload.txt"))
            .send()
            .await
            .expect("get_object")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "signed upload");

        cleanup_keys(&client, &bucket, &["upload.txt"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_signed_url_for_other_key() {
        let client = http_client();
        let bucket = test_bucket_name("forged");

        let issued = issue(&client, &bucket, "allowed.txt", 60).await;
        let url = issued["url"].as_str().expect("url").replace("allowed.txt", "other.txt");

        let resp = client.put(url).body("nope").send().await.expect("forged put");
        assert_eq!(resp.status(), 403);
        let body = resp.text().await.expect("error body");
        assert!(body.contains("<Code>InvalidToken</Code>"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_require_bearer_to_issue() {
        let client = http_client();
        let bucket = test_bucket_name("unauth");
        let resp = client
            .post(format!("{}/signed-url", object_url(&bucket, "x.txt")))
            .send()
            .await
            .expect("create signed url");
        assert_eq!(resp.status(), 403);
        let json: serde_json::Value = resp.json().await.expect("JSON error");
        assert_eq!(json["Error"]["Code"], "InvalidToken");
    }
}
