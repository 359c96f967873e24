pub mod booking;
pub mod domain;
pub mod error;
pub mod shared;
pub mod store;
pub mod system;

pub use booking::BookingService;
pub use error::BookingError;
