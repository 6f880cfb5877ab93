//! Object CRUD integration tests.

#[cfg(test)]
mod tests {
    use crate::{bearer_token, cleanup_keys, http_client, object_url, put_object, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_put_and_get_object() {
        let client = http_client();
        let bucket = test_bucket_name("putget");

        let body = b"hello, stowage!";
        let resp = client
            .put(object_url(&bucket, "greeting.txt"))
            .bearer_auth(bearer_token())
            .body(body.to_vec())
            .send()
            .await
            .expect("put_object");
        assert_eq!(resp.status(), 200);
        let etag = resp
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("etag header");
        assert!(etag.starts_with('"') && etag.ends_with('"'));

        let resp = client
            .get(object_url(&bucket, "greeting.txt"))
            .send()
            .await
            .expect("get_object");
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        assert_eq!(
            resp.headers().get("etag").and_then(|v| v.to_str().ok()),
            Some(etag.as_str())
        );
        assert!(resp.headers().contains_key("x-amz-request-id"));
        let data = resp.bytes().await.expect("collect body");
        assert_eq!(data.as_ref(), body);

        cleanup_keys(&client, &bucket, &["greeting.txt"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_head_object() {
        let client = http_client();
        let bucket = test_bucket_name("head");
        put_object(&client, &bucket, "nested/data.bin", &[7u8; 1024]).await;

        let resp = client
            .head(object_url(&bucket, "nested/data.bin"))
            .send()
            .await
            .expect("head_object");
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-length").and_then(|v| v.to_str().ok()),
            Some("1024")
        );
        assert!(resp.headers().contains_key("last-modified"));

        cleanup_keys(&client, &bucket, &["nested/data.bin"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stream_large_object() {
        let client = http_client();
        let bucket = test_bucket_name("large");
        let body: Vec<u8> = (0..(3 * 1024 * 1024)).map(|i| (i % 251) as u8).collect();
        put_object(&client, &bucket, "big.bin", &body).await;

        let data = client
            .get(object_url(&bucket, "big.bin"))
            .send()
            .await
            .expect("get_object")
            .bytes()
            .await
            .expect("collect body");
        assert_eq!(data.len(), body.len());
        assert_eq!(data.as_ref(), body.as_slice());

        cleanup_keys(&client, &bucket, &["big.bin"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_object_and_report_missing() {
        let client = http_client();
        let bucket = test_bucket_name("delete");
        put_object(&client, &bucket, "gone.txt", b"bye").await;

        let resp = client
            .delete(object_url(&bucket, "gone.txt"))
            .bearer_auth(bearer_token())
            .send()
            .await
            .expect("delete_object");
        assert_eq!(resp.status(), 204);

        let resp = client
            .delete(object_url(&bucket, "gone.txt"))
            .bearer_auth(bearer_token())
            .send()
            .await
            .expect("delete_object again");
        assert_eq!(resp.status(), 404);
        let body = resp.text().await.expect("error body");
        assert!(body.contains("<Code>NoSuchKey</Code>"));
    }
}
