pub mod client;
pub mod error;
pub mod memory;
pub mod session;
pub mod traits;
pub mod types;

pub use client::HttpApi;
pub use error::ApiError;
pub use memory::InMemoryApi;
pub use session::Session;
pub use traits::ListingsApi;
pub use types::{
    Credentials, ListingQuery, Paginated, RunRequest, RunResponse, RunStatus, ScraperInfo,
    ScraperStatus, TokenPair,
};
