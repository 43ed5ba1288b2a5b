use std::time::Duration;

use lazy_static::lazy_static;
use reqwest::{Response, Url};
use serde::Serialize;

/// Default upper bound for a single call to the game backend. Calls are never retried.
pub const API_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::builder()
        .user_agent("Candy Bot")
        .build()
        .expect("Failed to create reqwest client");
}

pub fn get_reqwest_client() -> &'static reqwest::Client {
    &CLIENT
}

/// Any status code is returned as a response, only transport failures (including the
/// timeout) are errors.
pub async fn get_with_timeout(url: &Url, timeout: Duration) -> Result<Response, reqwest::Error> {
    get_reqwest_client()
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
}

/// POST a JSON body, same error semantics as [`get_with_timeout`].
pub async fn post_json_with_timeout<B: Serialize + ?Sized>(
    url: &Url,
    body: &B,
    timeout: Duration,
) -> Result<Response, reqwest::Error> {
    get_reqwest_client()
        .post(url.clone())
        .json(body)
        .timeout(timeout)
        .send()
        .await
}
