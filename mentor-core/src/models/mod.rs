pub mod advice;
pub mod envelope;
pub mod user;

pub use advice::{Advice, AdviceDetail, AdviceRequest, AdviceView, ApiKind};
pub use envelope::{
    AdviceListResponse, AdviceResponse, AreasResponse, LoginResponse, Page, RefreshResponse,
    UserResponse, UsersResponse,
};
pub use user::{
    Area, Asesor, NewProfessional, NewUser, Professional, ProfessionalUpdate, User, UserUpdate,
};
