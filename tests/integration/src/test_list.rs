//! Bucket listing integration tests.

#[cfg(test)]
mod tests {
    use crate::{cleanup_keys, endpoint_url, http_client, put_object, test_bucket_name};

    async fn list(client: &reqwest::Client, bucket: &str, query: &[(&str, &str)]) -> String {
        let query: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let resp = client
            .get(format!("{}/buckets/{bucket}?{}", endpoint_url(), query.join("&")))
            .send()
            .await
            .expect("list_objects");
        assert_eq!(resp.status(), 200);
        resp.text().await.expect("listing body")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_roll_up_common_prefixes() {
        let client = http_client();
        let bucket = test_bucket_name("rollup");
        let keys = ["a/b/c", "a/b/d", "top.txt"];
        for key in keys {
            put_object(&client, &bucket, key, b"x").await;
        }

        let xml = list(&client, &bucket, &[]).await;
        assert!(xml.contains("<CommonPrefixes><Prefix>a/</Prefix></CommonPrefixes>"));
        assert!(xml.contains("<Key>top.txt</Key>"));
        assert!(xml.contains("<KeyCount>2</KeyCount>"));
        assert!(xml.contains("<IsTruncated>false</IsTruncated>"));

        cleanup_keys(&client, &bucket, &keys).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_leaves_under_prefix() {
        let client = http_client();
        let bucket = test_bucket_name("prefix");
        let keys = ["logs/2024/feb.txt", "logs/2024/jan.txt", "logs/2023/dec.txt"];
        for key in keys {
            put_object(&client, &bucket, key, b"x").await;
        }

        let xml = list(&client, &bucket, &[("prefix", "logs/2024/"), ("delimiter", "/")]).await;
        assert!(xml.contains("<Prefix>logs/2024/</Prefix>"));
        let feb = xml.find("<Key>logs/2024/feb.txt</Key>").expect("feb listed");
        let jan = xml.find("<Key>logs/2024/jan.txt</Key>").expect("jan listed");
        assert!(feb < jan);
        assert!(!xml.contains("<CommonPrefixes>"));
        assert!(!xml.contains("dec.txt"));

        cleanup_keys(&client, &bucket, &keys).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_paginate_with_marker_and_max_keys() {
        let client = http_client();
        let bucket = test_bucket_name("paging");
        let keys = ["a.txt", "b.txt", "c.txt"];
        for key in keys {
            put_object(&client, &bucket, key, b"x").await;
        }

        let xml = list(&client, &bucket, &[("marker", "a.txt"), ("max-keys", "1")]).await;
        assert!(xml.contains("<Marker>a.txt</Marker>"));
        assert!(xml.contains("<MaxKeys>1</MaxKeys>"));
        assert!(xml.contains("<IsTruncated>true</IsTruncated>"));
        assert!(!xml.contains("<Key>a.txt</Key>"));
        assert!(xml.contains("<KeyCount>1</KeyCount>"));

        cleanup_keys(&client, &bucket, &keys).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_missing_bucket_as_empty() {
        let client = http_client();
        let bucket = test_bucket_name("missing");
        let xml = list(&client, &bucket, &[]).await;
        assert!(xml.contains("<KeyCount>0</KeyCount>"));
        assert!(xml.contains("<IsTruncated>false</IsTruncated>"));
    }
}
