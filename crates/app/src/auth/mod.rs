//! Authentication

mod errors;
mod listeners;
mod models;
mod remote;
mod service;
mod simulated;
mod token;

pub use errors::*;
pub use listeners::{AuthCallback, Listeners, Subscription};
pub use models::*;
pub use remote::RemoteAuth;
pub use service::*;
pub use simulated::{SESSION_KEY, SimulatedAuth};
pub use token::*;
