//! Line-delimited JSON over stdio.
//!
//! Each input line is one `RuntimeMessage`; each produces exactly one output
//! line: the response envelope, `null` for messages that get no reply, or
//! `{"error": ...}` for lines that do not parse. Requests are answered in
//! order.

use anyhow::Result;
use reposearch_core::auth::MessageSender;
use reposearch_core::{RuntimeMessage, RuntimePort};
use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

pub async fn serve_stdio(port: &RuntimePort) -> Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    info!("Serving runtime messages on stdio");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = answer(port, &line).await?;
        stdout.write_all(reply.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    debug!("stdin closed");
    Ok(())
}

async fn answer(port: &RuntimePort, line: &str) -> Result<Value> {
    let message: RuntimeMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => return Ok(json!({ "error": format!("Invalid message: {}", e) })),
    };
    let response = port.request(MessageSender::external(), message).await?;
    Ok(serde_json::to_value(response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposearch_core::{AuthResponse, RuntimeResponse, Session};

    /// Port whose background answers every message with a fixed session.
    fn echo_port() -> RuntimePort {
        let (port, mut inbox) = RuntimePort::channel();
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                let response = match envelope.message {
                    RuntimeMessage::AuthToken { .. } => None,
                    _ => Some(RuntimeResponse::Auth(AuthResponse::ok(
                        Session::unauthenticated(),
                    ))),
                };
                if let Some(reply) = envelope.reply {
                    let _ = reply.send(response);
                }
            }
        });
        port
    }

    #[tokio::test]
    async fn test_answer_valid_message() {
        let port = echo_port();
        let reply = answer(&port, r#"{"action":"get-auth-state"}"#).await.unwrap();
        assert_eq!(
            reply,
            json!({"success": true, "authState": {"isAuthenticated": false}})
        );
    }

    #[tokio::test]
    async fn test_answer_unreplied_message_is_null() {
        let port = echo_port();
        let reply = answer(&port, r#"{"action":"auth-token","token":"ghp_abc"}"#)
            .await
            .unwrap();
        assert!(reply.is_null());
    }

    #[tokio::test]
    async fn test_answer_garbage_is_error_line() {
        let port = echo_port();
        let reply = answer(&port, "not json").await.unwrap();
        assert!(reply["error"].as_str().unwrap().starts_with("Invalid message"));
    }
}
