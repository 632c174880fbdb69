//! Terminal prompt standing in for the authentication tab.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reposearch_core::auth::{check_token_format, MessageSender, SurfaceHost, SurfaceId};
use reposearch_core::{RuntimeMessage, RuntimePort};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Prompts for a token on the controlling terminal and posts it back
/// through the runtime port, tagged with its surface id.
pub struct TerminalSurface {
    port: RuntimePort,
    closed_by_user: mpsc::UnboundedSender<SurfaceId>,
    open: Mutex<Vec<SurfaceId>>,
    // Prompts still blocked on terminal input.
    prompting: Arc<AtomicUsize>,
}

impl TerminalSurface {
    /// The receiver yields surfaces the user cancelled without a token.
    pub fn new(port: RuntimePort) -> (Self, mpsc::UnboundedReceiver<SurfaceId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                port,
                closed_by_user: tx,
                open: Mutex::new(Vec::new()),
                prompting: Arc::new(AtomicUsize::new(0)),
            },
            rx,
        )
    }

    fn is_open(&self, id: SurfaceId) -> bool {
        lock(&self.open).contains(&id)
    }

    /// Whether a prompt is still waiting for input, as after a timed-out
    /// handshake. The process cannot exit until it returns.
    pub fn has_open_prompt(&self) -> bool {
        self.prompting.load(Ordering::SeqCst) > 0
    }
}

fn lock(open: &Mutex<Vec<SurfaceId>>) -> std::sync::MutexGuard<'_, Vec<SurfaceId>> {
    open.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl SurfaceHost for TerminalSurface {
    async fn open(&self, id: SurfaceId, url: &str) -> anyhow::Result<()> {
        lock(&self.open).push(id);

        eprintln!("Create a personal access token at:\n  {}\n", url);
        eprintln!("Paste it below (input is hidden). Leave it empty to cancel.");

        let port = self.port.clone();
        let closed_by_user = self.closed_by_user.clone();
        let prompting = self.prompting.clone();
        prompting.fetch_add(1, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || {
            let outcome = prompt_token();
            prompting.fetch_sub(1, Ordering::SeqCst);
            let cancelled = match outcome {
                Ok(Some(token)) => {
                    if let Err(e) = port.post(
                        MessageSender::surface(id),
                        RuntimeMessage::AuthToken { token },
                    ) {
                        warn!(surface = %id, error = %e, "Could not deliver token");
                    }
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    warn!(surface = %id, error = %e, "Token prompt failed");
                    true
                }
            };
            if cancelled {
                let _ = closed_by_user.send(id);
            }
        });
        Ok(())
    }

    async fn close(&self, id: SurfaceId) -> anyhow::Result<()> {
        if !self.is_open(id) {
            anyhow::bail!("{} is not open", id);
        }
        lock(&self.open).retain(|s| *s != id);
        debug!(surface = %id, "Closed token prompt");
        Ok(())
    }
}

/// Read a token until one looks valid; `None` when the user enters nothing.
fn prompt_token() -> io::Result<Option<String>> {
    loop {
        let input = rpassword::prompt_password("GitHub token: ")?;
        let token = input.trim();
        if token.is_empty() {
            return Ok(None);
        }
        match check_token_format(token) {
            Ok(()) => return Ok(Some(token.to_string())),
            Err(e) => {
                eprintln!("{}", e);
                io::stderr().flush()?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_only_known_surfaces() {
        let (port, _inbox) = RuntimePort::channel();
        let (surface, _cancelled) = TerminalSurface::new(port);

        lock(&surface.open).push(SurfaceId(1));
        surface.close(SurfaceId(1)).await.unwrap();
        assert!(surface.close(SurfaceId(1)).await.is_err());
        assert!(surface.close(SurfaceId(2)).await.is_err());
    }

    #[test]
    fn test_has_open_prompt_follows_running_prompts() {
        let (port, _inbox) = RuntimePort::channel();
        let (surface, _cancelled) = TerminalSurface::new(port);
        assert!(!surface.has_open_prompt());

        surface.prompting.fetch_add(1, Ordering::SeqCst);
        assert!(surface.has_open_prompt());
        surface.prompting.fetch_sub(1, Ordering::SeqCst);
        assert!(!surface.has_open_prompt());
    }
}
