pub mod price;

pub use price::PriceEvent;
