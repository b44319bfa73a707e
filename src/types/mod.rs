pub mod security;

pub use security::{ChangeDirection, Security};
