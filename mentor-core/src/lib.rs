pub mod admin;
pub mod advice;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use advice::AdviceStore;
pub use client::ApiClient;
pub use config::MentorConfig;
pub use error::ApiError;
pub use session::{
    run_refresh_loop, CredentialStore, FileCredentialStore, MemoryCredentialStore, Session,
    StoredCredentials,
};
