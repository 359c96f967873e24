pub mod participation;
pub mod service;

pub use participation::ParticipationManager;
pub use service::EventService;
