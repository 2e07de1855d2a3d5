//! Data models
//!
//! Plain value types mirroring remote table rows and API responses:
//! - Backend rows (InitiativeModel, Administrator, InstitutionModel, CertificateModel, FileComment)
//! - Request inputs (CreateInitiativeInput, RegisterInstitutionInput, CompositeFilter)
//! - Analytics and statistics rows
//! - Auth types (AuthUser, Session)

mod administrator;
mod analytics;
mod comment;
mod filter;
mod initiative;
mod institution;
pub mod serde_helpers;
mod user;

pub use administrator::{Administrator, UserRole};
pub(crate) use administrator::AdministratorRow;
pub use analytics::{
    InitiativeCountByLocation, PerMonthInitiativeCount, PerYearCreatedClosedInitiativeCount,
    ViewsByCityAndPageResponse, ViewsByDateResponse, ViewsByPageResponse,
};
pub use comment::FileComment;
pub use filter::{CompositeFilter, FilterField};
pub use initiative::{
    CreateInitiativeInput, Directory, InitiativeContent, InitiativeModel, InitiativeStatus,
    UpdateInitiativeInput,
};
pub use institution::{CertificateModel, InstitutionModel, RegisterInstitutionInput};
pub use user::{AuthUser, OAuthProvider, Session};
