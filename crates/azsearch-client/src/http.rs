//! Response helpers shared by the search client and the embedding client.
//! Status codes are mapped by `Error::from_status`.

use reqwest::Response;

use azsearch_core::error::Error;

/// Passes 2xx responses through; turns everything else into a typed error.
pub async fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Err(Error::from_status(status.as_u16(), &text))
}

pub fn send_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::InvalidRequest(format!("could not build request: {e}"))
    } else if e.is_timeout() {
        Error::Transient(format!("request timed out: {e}"))
    } else {
        Error::Transient(format!("HTTP request failed: {e}"))
    }
}

pub async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, Error> {
    response.json().await.map_err(|e| Error::Decode(e.to_string()))
}
