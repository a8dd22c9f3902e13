mod admin;
pub mod dto;
mod images;
mod media;
pub mod response;
mod router;
mod social;
mod transform;
pub mod validation;

pub use router::{AppState, create_router};
