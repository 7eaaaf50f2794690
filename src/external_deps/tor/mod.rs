//! Anonymity-network control channel.
//!
//! Speaks the line-oriented control protocol over a local TCP socket to
//! request a fresh circuit (a new apparent egress identity). Authentication
//! uses the plain password scheme; a controller without a password accepts an
//! empty one.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Default local control endpoint.
pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:9051";

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("control command rejected: {0}")]
    Rejected(String),
}

/// Client for the local circuit-control endpoint.
#[derive(Debug, Clone)]
pub struct CircuitControl {
    addr: String,
    password: Option<String>,
}

impl CircuitControl {
    pub fn new(addr: impl Into<String>, password: Option<String>) -> Self {
        Self {
            addr: addr.into(),
            password,
        }
    }

    /// Authenticate and signal for a new circuit. The caller is responsible
    /// for waiting out the settle period before reusing the egress.
    pub async fn request_new_circuit(&self) -> Result<(), ControlError> {
        let stream = TcpStream::connect(&self.addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let password = self.password.as_deref().unwrap_or("");
        let auth = format!("AUTHENTICATE \"{}\"\r\n", escape_quotes(password));
        write_half.write_all(auth.as_bytes()).await?;
        expect_ok(&mut lines).await?;

        write_half.write_all(b"SIGNAL NEWNYM\r\n").await?;
        expect_ok(&mut lines).await?;

        let _ = write_half.write_all(b"QUIT\r\n").await;
        Ok(())
    }
}

impl Default for CircuitControl {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_ADDR, None)
    }
}

async fn expect_ok<R>(lines: &mut tokio::io::Lines<R>) -> Result<(), ControlError>
where
    R: AsyncBufReadExt + Unpin,
{
    match lines.next_line().await? {
        Some(line) if line.starts_with("250") => Ok(()),
        Some(line) => Err(ControlError::Rejected(line)),
        None => Err(ControlError::Rejected(
            "connection closed before reply".into(),
        )),
    }
}

fn escape_quotes(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn scripted_controller(replies: &'static [&'static str]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 512];
            for reply in replies {
                let _ = socket.read(&mut buf).await;
                socket.write_all(reply.as_bytes()).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn new_circuit_succeeds_on_250_replies() {
        let addr = scripted_controller(&["250 OK\r\n", "250 OK\r\n"]).await;
        let control = CircuitControl::new(addr, Some("secret".into()));
        assert!(control.request_new_circuit().await.is_ok());
    }

    #[tokio::test]
    async fn new_circuit_reports_auth_rejection() {
        let addr = scripted_controller(&["515 Authentication failed\r\n"]).await;
        let control = CircuitControl::new(addr, None);
        let err = control.request_new_circuit().await.unwrap_err();
        assert!(matches!(err, ControlError::Rejected(_)));
    }

    #[tokio::test]
    async fn new_circuit_reports_connection_refusal() {
        let control = CircuitControl::new("127.0.0.1:1", None);
        let err = control.request_new_circuit().await.unwrap_err();
        assert!(matches!(err, ControlError::Io(_)));
    }
}
