//! Response envelopes the backend wraps its payloads in. Field names match
//! the wire exactly (the backend is Spanish-speaking: `usuario`, `mensaje`).

use serde::{Deserialize, Serialize};

use crate::models::advice::Advice;
use crate::models::user::{Area, User};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub usuario: User,
    #[serde(default)]
    pub mensaje: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    pub usuarios: Vec<User>,
    #[serde(default)]
    pub mensaje: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdviceResponse {
    pub advice: Advice,
    #[serde(default)]
    pub mensaje: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdviceListResponse {
    #[serde(default)]
    pub advisorys: Vec<Advice>,
    #[serde(default)]
    pub mensaje: String,
}

impl AdviceListResponse {
    /// The synthetic success substituted for a 404 on the listing lookup:
    /// "this advisor has no threads yet" is a steady state, not an error.
    pub fn empty() -> Self {
        Self {
            advisorys: Vec::new(),
            mensaje: "Sin asesorías aún".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreasResponse {
    pub areas: Vec<Area>,
}

/// Spring-style page envelope returned by the paginated listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}
