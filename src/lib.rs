pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod observability;
pub mod transport;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use feed::{FeedCoordinator, FeedSnapshot};
pub use transport::{ConnectionState, PriceTransport, build_transport};
