//! Chat client crate: Discord REST v10 operations and a gateway event source.
//!
//! The REST client covers the operations the correlation engine needs
//! (reply, edit, fetch, threads, interaction callbacks, command
//! registration); the gateway module normalizes MESSAGE_CREATE and
//! INTERACTION_CREATE dispatches into [`events::ChatEvent`] values on an
//! mpsc channel. Session resume is out of scope; a dropped connection is
//! re-identified after a fixed delay.

pub mod api_client;
pub mod events;
pub mod gateway;
pub mod transport;
pub mod wire;

pub use api_client::DiscordApiClient;
pub use events::{ChatEvent, ChatInteraction, InteractionKind};
pub use gateway::{run_gateway, GatewayConfig};
