use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::advice::Advice;

/// A MyMentor account. `asesores` carries the advisor assignments the user
/// can chat with; it is present on the single-user lookup but may be empty
/// on admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub name: String,
    pub last_name: String,
    pub phone_number: i64,
    pub email: String,
    pub admin: bool,
    pub enabled: bool,
    #[serde(default)]
    pub asesores: Vec<Asesor>,
}

/// An advisor assignment: the link between a user and a professional
/// profile. Its `id` is the assignment identity, distinct from the
/// professional's own id, and is what the advice endpoints key on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asesor {
    pub id: i64,
    pub professional: Professional,
    #[serde(default)]
    pub advisorys: Option<Vec<Advice>>,
}

/// Catalog entry describing an advisor's subject-matter profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub area: Area,
}

/// Flat reference data; immutable from the client's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub last_name: String,
    pub phone_number: i64,
    pub email: String,
    pub password: String,
    pub admin: bool,
    pub enabled: bool,
}

/// Whole-record replacement payload for `PUT /users/{uuid}`. The password
/// is only sent when it is being changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: String,
    pub last_name: String,
    pub phone_number: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub admin: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfessional {
    pub name: String,
    pub description: String,
    pub area_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalUpdate {
    pub name: String,
    pub description: String,
    pub area_id: i64,
}
