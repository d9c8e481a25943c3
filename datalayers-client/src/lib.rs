//! Arrow Flight SQL client for the Datalayers columnar database.
//!
//! Authenticate once with [`Client::connect`], then run SQL directly
//! ([`Client::execute`], [`Client::execute_update`]) or through prepared
//! statements ([`Client::prepare`], [`Client::execute_prepared`]). Results
//! arrive as Arrow record batches wrapped in [`Batch`] handles the caller
//! owns. A blocking façade lives in [`blocking`].

pub mod batch;
pub mod blocking;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod prepared;
pub mod session;
pub mod stream;
pub mod value;

mod statement;

pub use batch::{affected_rows, total_rows, Batch, BatchWatch, StreamBatch};
pub use client::Client;
pub use config::ClientConfig;
pub use connection::{connect, ChannelBuilder};
pub use error::{filter_message, Error, Result};
pub use prepared::{ParameterBatch, PreparedStatement};
pub use session::{authenticate, Credential, SessionContext};
pub use stream::{ResultHandle, ResultStream};
pub use value::Value;
