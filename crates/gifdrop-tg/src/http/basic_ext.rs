use super::HttpClientError;
use crate::prelude::*;
use async_trait::async_trait;
use easy_ext::ext;
use reqwest::Response;
use reqwest_middleware::RequestBuilder;

#[ext(RequestBuilderBasicExt)]
#[async_trait]
pub(crate) impl RequestBuilder {
    /// Better version of [`RequestBuilder::send`] that returns an error
    /// if the error response status code is returned.
    async fn try_send(self) -> Result<Response, HttpClientError> {
        let response = self
            .send()
            .await
            .map_err(|source| HttpClientError::Request { source })?;

        let status = response.status();

        if !status.is_client_error() && !status.is_server_error() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|err| {
            format!(
                "Could not collect the error response body text: {}",
                err.display_chain()
            )
        });

        Err(HttpClientError::BadResponseStatusCode { status, body })
    }

    /// Sends the request and reads the response body as text, requiring a
    /// successful status code.
    async fn read_text(self) -> Result<String, HttpClientError> {
        self.try_send()
            .await?
            .text()
            .await
            .map_err(|source| HttpClientError::ReadPayload { source })
    }
}
