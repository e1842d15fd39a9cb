use super::MediaArtifact;
use crate::http::{self, HttpClientError};
use crate::prelude::*;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use url::Url;

/// Bound for a single endpoint attempt. There are no retries: a slow
/// endpoint is simply skipped in favor of the next one.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const CATBOX_API_URL: &str = "https://catbox.moe/user/api.php";
const NULL_POINTER_URL: &str = "https://0x0.st";

#[derive(Debug, thiserror::Error)]
pub(crate) enum UploadError {
    #[error("Endpoint {endpoint} rejected the upload")]
    EndpointFailed {
        endpoint: &'static str,
        source: HttpClientError,
    },

    #[error("Endpoint {endpoint} did not respond within {UPLOAD_TIMEOUT:?}")]
    EndpointTimedOut { endpoint: &'static str },

    #[error("Endpoint {endpoint} returned an unusable body: {body:?}")]
    BadResponseBody {
        endpoint: &'static str,
        body: String,
    },

    #[error("Failed to read the artifact from disk")]
    ReadArtifact { source: std::io::Error },

    #[error("All upload endpoints failed")]
    AllEndpointsExhausted { errors: Vec<UploadError> },
}

/// A single file-hosting endpoint: accepts a multipart POST and responds
/// with a plain-text public URL in the body.
#[async_trait]
pub(crate) trait UploadTarget {
    fn name(&self) -> &'static str;

    async fn send(&self, payload: Bytes) -> Result<Url, UploadError>;
}

/// Offers the artifact to the primary endpoint and, on any failure, falls
/// through to the secondary one. Endpoint health is probed fresh on every
/// job: job volume is low and endpoint state changes between jobs.
pub(crate) struct UploadDispatcher {
    targets: Vec<Box<dyn UploadTarget + Send + Sync>>,
}

impl UploadDispatcher {
    pub(crate) fn new(http: http::Client) -> Self {
        Self::with_targets(vec![
            Box::new(CatboxTarget { http: http.clone() }),
            Box::new(NullPointerTarget { http }),
        ])
    }

    pub(crate) fn with_targets(targets: Vec<Box<dyn UploadTarget + Send + Sync>>) -> Self {
        Self { targets }
    }

    #[instrument(skip_all, fields(size = artifact.size()))]
    pub(crate) async fn upload(&self, artifact: &MediaArtifact) -> Result<Url, UploadError> {
        let payload = fs_err::tokio::read(artifact.path())
            .await
            .map(Bytes::from)
            .map_err(|source| UploadError::ReadArtifact { source })?;

        let mut errors = vec![];

        for target in &self.targets {
            match target.send(payload.clone()).await {
                Ok(url) => {
                    info!(endpoint = target.name(), %url, "Upload succeeded");
                    return Ok(url);
                }
                Err(err) => {
                    warn!(
                        err = tracing_err(&err),
                        endpoint = target.name(),
                        "Endpoint failed, falling through"
                    );
                    errors.push(err);
                }
            }
        }

        Err(UploadError::AllEndpointsExhausted { errors })
    }
}

/// catbox.moe: permanent hosting, the primary choice.
struct CatboxTarget {
    http: http::Client,
}

#[async_trait]
impl UploadTarget for CatboxTarget {
    fn name(&self) -> &'static str {
        "catbox.moe"
    }

    async fn send(&self, payload: Bytes) -> Result<Url, UploadError> {
        let form = Form::new().text("reqtype", "fileupload").part(
            "fileToUpload",
            Part::stream(payload).file_name("artifact.gif"),
        );

        let request = self.http.post(CATBOX_API_URL).multipart(form);

        read_url_body(self.name(), request).await
    }
}

/// 0x0.st ("The Null Pointer"): files expire after a year, but it accepts
/// uploads when catbox is down.
struct NullPointerTarget {
    http: http::Client,
}

#[async_trait]
impl UploadTarget for NullPointerTarget {
    fn name(&self) -> &'static str {
        "0x0.st"
    }

    async fn send(&self, payload: Bytes) -> Result<Url, UploadError> {
        let form = Form::new().part("file", Part::stream(payload).file_name("artifact.gif"));

        let request = self.http.post(NULL_POINTER_URL).multipart(form);

        read_url_body(self.name(), request).await
    }
}

/// The success contract shared by both endpoints: a 2xx status with a
/// non-empty plain-text body, the trimmed body being the public URL.
async fn read_url_body(
    endpoint: &'static str,
    request: reqwest_middleware::RequestBuilder,
) -> Result<Url, UploadError> {
    let response = tokio::time::timeout(UPLOAD_TIMEOUT, request.read_text())
        .await
        .map_err(|_elapsed| UploadError::EndpointTimedOut { endpoint })?
        .map_err(|source| UploadError::EndpointFailed { endpoint, source })?;

    let body = response.trim();

    body.parse().map_err(|_| UploadError::BadResponseBody {
        endpoint,
        body: body.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaFormat;
    use crate::util::temp_file::scratch_path;
    use assert_matches::assert_matches;

    struct OkTarget {
        url: &'static str,
    }

    #[async_trait]
    impl UploadTarget for OkTarget {
        fn name(&self) -> &'static str {
            "ok"
        }

        async fn send(&self, _payload: Bytes) -> Result<Url, UploadError> {
            Ok(self.url.parse().unwrap())
        }
    }

    struct FailingTarget;

    #[async_trait]
    impl UploadTarget for FailingTarget {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn send(&self, _payload: Bytes) -> Result<Url, UploadError> {
            Err(UploadError::BadResponseBody {
                endpoint: self.name(),
                body: String::new(),
            })
        }
    }

    async fn gif_artifact() -> MediaArtifact {
        let path = scratch_path("gif");
        fs_err::tokio::write(&path, b"GIF89a").await.unwrap();
        MediaArtifact::from_scratch_path(path, MediaFormat::Gif)
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn primary_failure_falls_through_to_secondary() {
        let dispatcher = UploadDispatcher::with_targets(vec![
            Box::new(FailingTarget),
            Box::new(OkTarget {
                url: "https://0x0.st/abcd.gif",
            }),
        ]);

        let url = dispatcher.upload(&gif_artifact().await).await.unwrap();

        assert_eq!(url.as_str(), "https://0x0.st/abcd.gif");
    }

    #[test_log::test(tokio::test)]
    async fn primary_success_short_circuits() {
        let dispatcher = UploadDispatcher::with_targets(vec![
            Box::new(OkTarget {
                url: "https://files.catbox.moe/abcd.gif",
            }),
            Box::new(FailingTarget),
        ]);

        let url = dispatcher.upload(&gif_artifact().await).await.unwrap();

        assert_eq!(url.as_str(), "https://files.catbox.moe/abcd.gif");
    }

    #[test_log::test(tokio::test)]
    async fn both_endpoints_failing_is_terminal() {
        let dispatcher =
            UploadDispatcher::with_targets(vec![Box::new(FailingTarget), Box::new(FailingTarget)]);

        let result = dispatcher.upload(&gif_artifact().await).await;

        assert_matches!(
            result,
            Err(UploadError::AllEndpointsExhausted { errors }) if errors.len() == 2
        );
    }

    #[test]
    fn empty_body_is_not_a_url() {
        assert!("".parse::<Url>().is_err());
        assert!("   ".trim().parse::<Url>().is_err());
    }
}
