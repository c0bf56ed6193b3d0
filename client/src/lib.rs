pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod response;

pub use client::{mask_secrets, ApiClient, AuthOverride, RequestSpec};
pub use config::{load_dotenv, Credentials, Settings, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
pub use reqwest::{Method, StatusCode};
pub use response::{
    lookup, ApiResponse, Count, LoginData, Pagination, Technique, TechniqueValue, UserData,
    WhitelistEntry,
};

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::response::*;
}
