pub mod client;
pub mod models;
pub mod network;

pub use client::AlchemyClient;
pub use models::ApiError;
pub use network::alchemy_network;
