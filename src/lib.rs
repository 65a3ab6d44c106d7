//! Rust client library for the Edge read-aloud speech synthesis WebSocket service.
//!
//! A single [`TtsClient`] keeps one connection open and multiplexes any number
//! of concurrent `synthesize` calls over it, correlating frames by request id.
//! The connection is opened on first use and closed after an idle window.
//!
//! # Example
//!
//! ```no_run
//! use rust_readaloud::{build_ssml, OutputFormat, TtsClient, TtsConfig, DEFAULT_LANG, DEFAULT_VOICE};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rust_readaloud::Error> {
//!     let client = TtsClient::new(TtsConfig::default());
//!
//!     let ssml = build_ssml(DEFAULT_VOICE, DEFAULT_LANG, "你好，世界");
//!     let format = OutputFormat::Audio24Khz48KBitrateMonoMp3;
//!     let audio = client.synthesize(&ssml, format.as_str()).await?;
//!     println!("Received {} bytes of {}", audio.len(), format.content_type());
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

mod error;
mod formats;
pub mod messages;
mod ssml;
mod tts;
mod ws;

pub use error::Error;
pub use formats::OutputFormat;
pub use ssml::{build_ssml, DEFAULT_LANG, DEFAULT_VOICE};
pub use tts::{ConnectionState, TtsClient, TtsConfig};
pub use ws::{Connector, FrameSink, FrameStream, WebSocketConnector};

/// Default read-aloud WebSocket endpoint.
pub const ENDPOINT: &str =
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1";

/// Client token expected by the read-aloud endpoint.
pub const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";

/// `Origin` header of the browser extension the endpoint trusts.
pub const ORIGIN: &str = "chrome-extension://jdiccldimpdaibmpdkjnbmckianbfold";

/// Browser-like `User-Agent` header.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/103.0.5060.66 Safari/537.36 Edg/103.0.1264.44";

/// Default idle window and per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default WebSocket handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
