//! Bucket listing.

use crate::error::GatewayResult;
use crate::listing::{ListRequest, ListingPage};
use crate::provider::Gateway;

impl Gateway {
    /// List `bucket`. A bucket that was never written to lists as empty.
    pub async fn list_bucket(
        &self,
        bucket: &str,
        request: &ListRequest,
    ) -> GatewayResult<ListingPage> {
        let bucket = self.store.codec().resolve_bucket(bucket)?;
        self.listing.list(&bucket, request).await
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::config::GatewayConfig;
    use crate::error::GatewayError;

    #[tokio::test]
    async fn test_should_list_uploaded_objects() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let config = GatewayConfig::builder()
            .storage_root(dir.path().display().to_string())
            .build();
        let gateway = Gateway::open(config)
            .await
            .unwrap_or_else(|e| panic!("open failed: {e}"));

        for key in ["reports/q1.csv", "reports/q2.csv", "readme.md"] {
            gateway
                .put_object(
                    "corp",
                    key,
                    futures::stream::iter([Ok(Bytes::from_static(b"data"))]),
                )
                .await
                .unwrap_or_else(|e| panic!("put failed: {e}"));
        }

        let page = gateway
            .list_bucket("corp", &ListRequest::default())
            .await
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        assert_eq!(page.common_prefixes, vec!["reports/"]);
        assert_eq!(page.contents.len(), 1);
        assert_eq!(page.contents[0].key, "readme.md");

        let inside = gateway
            .list_bucket("corp", &ListRequest::from_query([("prefix", "reports/")]))
            .await
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        assert_eq!(inside.contents.len(), 2);
        assert!(inside.common_prefixes.is_empty());

        assert!(matches!(
            gateway.list_bucket("..", &ListRequest::default()).await,
            Err(GatewayError::InvalidRequest { .. })
        ));
    }
}
