//! Concrete job routines.

pub mod civic_chat;
pub mod representative_profile;

pub use civic_chat::CivicChatRoutine;
pub use representative_profile::RepresentativeProfileRoutine;
