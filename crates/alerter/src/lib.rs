use crate::error::AlerterError;
use async_trait::async_trait;
use configuration::TelegramConfig;
use reqwest::Client;
use serde::Serialize;

pub mod error;
pub mod report;

pub use report::{AlertReport, SummaryRow};

/// A channel that delivers ratio alerts to stakeholders.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, report: &AlertReport) -> Result<(), AlerterError>;
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str, // To allow for formatting like bold, italics etc.
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `None` if the token or chat_id is missing from the configuration,
    /// allowing the system to gracefully disable alerting.
    pub fn new(config: &TelegramConfig) -> Option<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            tracing::warn!("Telegram alerter is not configured (missing token or chat_id).");
            return None;
        }
        Some(Self {
            client: Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Points the alerter at a different Bot API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sends a text message to the configured Telegram chat.
    pub async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "MarkdownV2", // Use Markdown for rich formatting
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError(error_text));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramAlerter {
    async fn send_alert(&self, report: &AlertReport) -> Result<(), AlerterError> {
        self.send_message(&format_alert_message(report)).await?;
        tracing::info!(chat_id = %self.chat_id, "Alert sent to Telegram.");
        Ok(())
    }
}

/// Renders an alert as a MarkdownV2 message: bold subject, escaped body, table in a code block.
pub fn format_alert_message(report: &AlertReport) -> String {
    format!(
        "⚠️ *{}*\n\n{}\n```\n{}\n```",
        escape_markdown(&report.subject),
        escape_markdown(&report.body),
        escape_code_block(&report.render_table())
    )
}

/// A helper function to escape characters that have special meaning in Telegram's MarkdownV2.
fn escape_markdown(text: &str) -> String {
    let special_chars = r"\_*[]()~`>#+-=|{}.!";
    special_chars.chars().fold(text.to_string(), |s, c| s.replace(c, &format!("\\{}", c)))
}

/// Inside ``` blocks only backslash and backtick need escaping.
fn escape_code_block(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Binds a local HTTP stub and returns it with its base URL.
    async fn bind_stub() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        (listener, base_url)
    }

    /// Answers one connection per canned `(status, extra headers, body)` response and
    /// yields the raw requests it received.
    fn serve(listener: TcpListener, responses: Vec<(u16, String, String)>) -> JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, headers, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);

                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    401 => "Unauthorized",
                    _ => "Internal Server Error",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{headers}\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
            requests
        })
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn report() -> AlertReport {
        AlertReport {
            subject: "Product Ratio Alert for 14-03-2025".to_string(),
            body: "Total Products: 40\n• Upload 6 more rings (currently 10, need total 16)".to_string(),
            table: vec![SummaryRow {
                product_type: "rings".to_string(),
                current_count: 10,
                current_percent: "25.0%".to_string(),
                target_percent: "40.0%".to_string(),
                required_count: "16.0".to_string(),
                next_upload_count: "+6".to_string(),
            }],
        }
    }

    #[test]
    fn missing_credentials_disable_the_alerter() {
        assert!(TelegramAlerter::new(&TelegramConfig::default()).is_none());
        let config = TelegramConfig {
            token: "123:abc".to_string(),
            chat_id: String::new(),
        };
        assert!(TelegramAlerter::new(&config).is_none());
    }

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown("a-b (c)."), r"a\-b \(c\)\.");
        assert_eq!(escape_markdown(r"x\y"), r"x\\y");
    }

    #[test]
    fn message_wraps_table_in_code_block() {
        let message = format_alert_message(&report());
        assert!(message.starts_with("⚠️ *Product Ratio Alert for 14\\-03\\-2025*"));
        assert!(message.contains(r"need total 16\)"));
        assert!(message.contains("```\n"));
        // the table keeps its raw pipes and signs inside the code block
        assert!(message.contains("| rings"));
        assert!(message.contains("+6"));
    }

    #[tokio::test]
    async fn posts_markdown_alert_to_the_bot_endpoint() {
        let (listener, base_url) = bind_stub().await;
        let server = serve(
            listener,
            vec![
                (200, String::new(), r#"{"ok":true}"#.to_string()),
                (
                    400,
                    String::new(),
                    r#"{"ok":false,"description":"Bad Request: chat not found"}"#.to_string(),
                ),
            ],
        );
        let config = TelegramConfig {
            token: "123:abc".to_string(),
            chat_id: "42".to_string(),
        };
        let alerter = TelegramAlerter::new(&config).unwrap().with_base_url(base_url);

        alerter.send_alert(&report()).await.unwrap();
        let err = alerter.send_message("plain").await.unwrap_err();
        assert!(matches!(err, AlerterError::ApiError(ref body) if body.contains("chat not found")));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /bot123:abc/sendMessage HTTP/1.1"));
        let body = &requests[0][requests[0].find("\r\n\r\n").unwrap() + 4..];
        let payload: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(payload["chat_id"], "42");
        assert_eq!(payload["parse_mode"], "MarkdownV2");
        assert!(payload["text"].as_str().unwrap().starts_with("⚠️ *Product Ratio Alert for 14\\-03\\-2025*"));
    }
}
