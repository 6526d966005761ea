use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::NotifyError;
use crate::message;
use crate::models::Event;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_secs(5);
const SEND_PACING: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Refused by the api for good, e.g. markup it cannot parse.
    Rejected,
    Cancelled,
}

pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: i64) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| NotifyError::Http(err.to_string()))?;
        Ok(Self {
            client,
            token: token.trim().to_string(),
            chat_id,
        })
    }

    /// Checks the token with `getMe` and returns the bot's account name.
    pub async fn authorize(&self) -> Result<String, NotifyError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|err| NotifyError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| NotifyError::Http(err.to_string()))?;

        let user: BotUser = decode_reply(status, &body)?;
        Ok(user.username.unwrap_or(user.first_name))
    }

    pub async fn send(&self, text: &str) -> Result<i64, NotifyError> {
        let payload = SendMessage {
            chat_id: self.chat_id,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: false,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| NotifyError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| NotifyError::Http(err.to_string()))?;

        let sent: SentMessage = decode_reply(status, &body)?;
        Ok(sent.message_id)
    }

    /// Sends one event, retrying transient failures until it is accepted, refused
    /// for good, or shutdown is requested.
    pub async fn deliver(&self, event: &Event, cancel: &CancellationToken) -> Delivery {
        loop {
            let text = message::render(event, &message::cache_buster(Utc::now()));
            match self.send(&text).await {
                Ok(message_id) => {
                    info!(message_id, text = %text, "message sent");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(SEND_PACING) => {}
                    }
                    return Delivery::Sent;
                }
                Err(err) if err.is_permanent() => {
                    error!(error = %err, link = %event.booking_link, text = %text, "message refused, not retrying");
                    return Delivery::Rejected;
                }
                Err(err) => {
                    error!(error = %err, link = %event.booking_link, "unable to send message");
                    tokio::select! {
                        _ = cancel.cancelled() => return Delivery::Cancelled,
                        _ = sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.token)
    }
}

fn decode_reply<T>(status: StatusCode, body: &str) -> Result<T, NotifyError>
where
    T: DeserializeOwned,
{
    let reply: ApiReply<T> = serde_json::from_str(body).map_err(|err| {
        if status.is_success() {
            NotifyError::Api(format!("unreadable reply: {err}"))
        } else {
            refusal(status, format!("HTTP {status}: {body}"))
        }
    })?;

    if !status.is_success() || !reply.ok {
        let reason = reply
            .description
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(refusal(status, reason));
    }

    reply
        .result
        .ok_or_else(|| NotifyError::Api("reply without result".to_string()))
}

// Client errors other than rate limiting will fail the same way on every retry.
fn refusal(status: StatusCode, reason: String) -> NotifyError {
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        NotifyError::Rejected {
            status: status.as_u16(),
            reason,
        }
    } else {
        NotifyError::Api(reason)
    }
}
