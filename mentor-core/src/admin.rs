//! Paginated CRUD state for the management screens.
//!
//! After a confirmed create/update/delete the already-loaded page is patched
//! in memory instead of reloaded: append or prepend-and-truncate for create,
//! map-replace-by-key for update, filter-out for delete. Responsiveness over
//! strict consistency; a stale page after concurrent edits elsewhere is
//! accepted.
//!
//! Domain validation happens here, before dispatch: an invalid record never
//! reaches the network layer.

use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{
    Area, NewProfessional, NewUser, Professional, ProfessionalUpdate, User, UserUpdate,
};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

// ============================================================================
// Validation
// ============================================================================

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation {
            field: "password",
            message: format!("la contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"),
        });
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if !email.contains('@') {
        return Err(ApiError::Validation {
            field: "email",
            message: "correo electrónico inválido".to_string(),
        });
    }
    Ok(())
}

fn validate_required(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation {
            field,
            message: "es obligatorio".to_string(),
        });
    }
    Ok(())
}

fn validate_new_user(user: &NewUser) -> Result<(), ApiError> {
    validate_required("name", &user.name)?;
    validate_email(&user.email)?;
    validate_password(&user.password)
}

fn validate_user_update(update: &UserUpdate) -> Result<(), ApiError> {
    validate_required("name", &update.name)?;
    validate_email(&update.email)?;
    if let Some(password) = &update.password {
        validate_password(password)?;
    }
    Ok(())
}

fn validate_professional(name: &str, description: &str, area_id: i64) -> Result<(), ApiError> {
    validate_required("name", name)?;
    validate_required("description", description)?;
    if area_id <= 0 {
        return Err(ApiError::Validation {
            field: "area_id",
            message: "debe referenciar un área existente".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct UserAdmin {
    users: Vec<User>,
}

impl UserAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub async fn fetch_all(&mut self, client: &ApiClient) -> Result<usize, ApiError> {
        let resp = client.get_users().await?;
        self.users = resp.usuarios;
        Ok(self.users.len())
    }

    pub async fn create(&mut self, client: &ApiClient, user: NewUser) -> Result<User, ApiError> {
        validate_new_user(&user)?;
        let resp = client.create_user(&user).await?;
        self.users.push(resp.usuario.clone());
        Ok(resp.usuario)
    }

    pub async fn update(
        &mut self,
        client: &ApiClient,
        uuid: Uuid,
        update: UserUpdate,
    ) -> Result<User, ApiError> {
        validate_user_update(&update)?;
        let resp = client.update_user(uuid, &update).await?;
        if let Some(slot) = self.users.iter_mut().find(|u| u.uuid == uuid) {
            *slot = resp.usuario.clone();
        }
        Ok(resp.usuario)
    }

    pub async fn delete(&mut self, client: &ApiClient, uuid: Uuid) -> Result<(), ApiError> {
        client.delete_user(uuid).await?;
        self.users.retain(|u| u.uuid != uuid);
        Ok(())
    }
}

// ============================================================================
// Advisors
// ============================================================================

pub struct AdvisorAdmin {
    advisors: Vec<Professional>,
    areas: Vec<Area>,
    page: u32,
    total_pages: u32,
    page_size: u32,
}

impl Default for AdvisorAdmin {
    fn default() -> Self {
        Self {
            advisors: Vec::new(),
            areas: Vec::new(),
            page: 0,
            total_pages: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AdvisorAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advisors(&self) -> &[Professional] {
        &self.advisors
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_next_page(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 0
    }

    pub async fn fetch_page(
        &mut self,
        client: &ApiClient,
        page: u32,
        size: u32,
    ) -> Result<usize, ApiError> {
        let resp = client.get_professionals_page(page, size).await?;
        self.advisors = resp.content;
        self.page = page;
        self.page_size = size;
        self.total_pages = resp.total_pages;
        Ok(self.advisors.len())
    }

    pub async fn fetch_areas(&mut self, client: &ApiClient) -> Result<usize, ApiError> {
        let resp = client.get_areas().await?;
        self.areas = resp.areas;
        Ok(self.areas.len())
    }

    /// Create and show the new advisor at the top of the current page,
    /// truncating so the page size stays constant.
    pub async fn create(
        &mut self,
        client: &ApiClient,
        professional: NewProfessional,
    ) -> Result<Professional, ApiError> {
        validate_professional(
            &professional.name,
            &professional.description,
            professional.area_id,
        )?;
        let created = client.create_professional(&professional).await?;
        self.advisors.insert(0, created.clone());
        self.advisors.truncate(self.page_size as usize);
        Ok(created)
    }

    pub async fn update(
        &mut self,
        client: &ApiClient,
        id: i64,
        update: ProfessionalUpdate,
    ) -> Result<Professional, ApiError> {
        validate_professional(&update.name, &update.description, update.area_id)?;
        let updated = client.update_professional(id, &update).await?;
        if let Some(slot) = self.advisors.iter_mut().find(|p| p.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, client: &ApiClient, id: i64) -> Result<(), ApiError> {
        client.delete_professional(id).await?;
        self.advisors.retain(|p| p.id != id);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
