//! Cloud voice-service session.
//!
//! * [`ConnectionState`]: states reported by the service subsystem.
//! * [`VoiceService`]: outward `connect` / `start` / `stop` requests.
//! * [`ServiceSession`]: the connection state machine with exponential
//!   reconnection backoff.
//! * [`RetryTimer`]: tokio-backed [`ReconnectTimer`] that calls `connect`
//!   when a backoff period elapses.
//!
//! # Wiring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use voice_assistant_core::provisioning::NetworkLink;
//! use voice_assistant_core::service::{
//!     ConnectionState, RetryPolicy, RetryTimer, ServiceSession, VoiceService,
//! };
//!
//! # fn make_service() -> Arc<dyn VoiceService> { unimplemented!() }
//! # fn make_link() -> Arc<dyn NetworkLink> { unimplemented!() }
//! #[tokio::main]
//! async fn main() {
//!     let service = make_service();
//!     let timer_service = Arc::clone(&service);
//!     let timer = RetryTimer::new(tokio::runtime::Handle::current(), move || {
//!         let _ = timer_service.connect();
//!     });
//!
//!     let session = Arc::new(ServiceSession::new(
//!         service,
//!         Arc::new(timer),
//!         make_link(),
//!         RetryPolicy::default(),
//!     ));
//!
//!     let (state_tx, state_rx) = mpsc::channel(16);
//!     tokio::spawn(Arc::clone(&session).run(state_rx));
//!     state_tx.send(ConnectionState::Idle).await.unwrap();
//! }
//! ```

pub mod retry;
pub mod session;
pub mod state;

pub use retry::{ReconnectTimer, RetryCounter, RetryPolicy, RetryTimer};
pub use session::{RetryDecision, ServiceError, ServiceSession, VoiceService};
pub use state::ConnectionState;
