//! SDK entry point
//!
//! `EsgSdk` bundles the backend handle, the HTTP clients and every service.
//! Build one with `EsgSdk::new` and pass it where needed; `EsgSdk::initialize`
//! keeps a single process-wide instance for callers that want one.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::analytics::AnalyticsClient;
use crate::backend::{create_backend, AuthEvent, DynBackend, StoredObject};
use crate::config::Config;
use crate::content::ContentClient;
use crate::error::Result;
use crate::models::{
    Administrator, AuthUser, CertificateModel, CompositeFilter, CreateInitiativeInput, Directory,
    FileComment, InitiativeContent, InitiativeCountByLocation, InitiativeModel, InitiativeStatus,
    InstitutionModel,
    OAuthProvider, PerMonthInitiativeCount, PerYearCreatedClosedInitiativeCount,
    RegisterInstitutionInput, Session, ViewsByCityAndPageResponse, ViewsByDateResponse,
    ViewsByPageResponse,
};
use crate::services::{
    AdministratorService, AuthService, CommentService, CountQuery, InitiativeService,
    InstitutionService, OAuthSignIn, StatsService,
};

static INSTANCE: OnceCell<Arc<EsgSdk>> = OnceCell::new();

pub struct EsgSdk {
    config: Config,
    backend: DynBackend,
    analytics: Arc<AnalyticsClient>,
    initiatives: Arc<InitiativeService>,
    comments: Arc<CommentService>,
    administrators: Arc<AdministratorService>,
    auth: Arc<AuthService>,
    institutions: Arc<InstitutionService>,
    stats: Arc<StatsService>,
}

impl EsgSdk {
    /// Validate the configuration and connect to the configured backend
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = create_backend(&config.backend)?;
        Self::with_backend(config, backend)
    }

    /// Build the SDK over an existing backend handle
    pub fn with_backend(config: Config, backend: DynBackend) -> Result<Self> {
        let analytics = Arc::new(AnalyticsClient::new(&config.analytics)?);
        let content = Arc::new(ContentClient::new(&config.content)?);

        Ok(Self {
            initiatives: Arc::new(InitiativeService::new(backend.clone(), content)),
            comments: Arc::new(CommentService::new(backend.clone())),
            administrators: Arc::new(AdministratorService::new(backend.clone())),
            auth: Arc::new(AuthService::new(backend.clone())),
            institutions: Arc::new(InstitutionService::new(backend.clone())),
            stats: Arc::new(StatsService::new(backend.clone())),
            analytics,
            backend,
            config,
        })
    }

    /// The process-wide instance.
    ///
    /// The first call creates it; later calls return it unchanged, whatever
    /// configuration they pass.
    pub fn initialize(config: Config) -> Result<Arc<EsgSdk>> {
        let sdk = INSTANCE.get_or_try_init(|| {
            tracing::info!("Initializing ESG SDK for {}", config.backend.url);
            EsgSdk::new(config.clone()).map(Arc::new)
        })?;
        if sdk.config != config {
            tracing::warn!("ESG SDK is already initialized; keeping the existing configuration");
        }
        Ok(sdk.clone())
    }

    /// The process-wide instance, if `initialize` has run
    pub fn instance() -> Option<Arc<EsgSdk>> {
        INSTANCE.get().cloned()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &DynBackend {
        &self.backend
    }

    pub fn analytics(&self) -> &AnalyticsClient {
        &self.analytics
    }

    pub fn initiatives(&self) -> &InitiativeService {
        &self.initiatives
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn administrators(&self) -> &AdministratorService {
        &self.administrators
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn institutions(&self) -> &InstitutionService {
        &self.institutions
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    // ========================================================================
    // Initiatives
    // ========================================================================

    pub async fn fetch_files(&self) -> Result<Vec<InitiativeModel>> {
        self.initiatives.fetch_files().await
    }

    pub async fn search_files(&self, filter: Option<&CompositeFilter>) -> Result<Vec<InitiativeModel>> {
        self.initiatives.search_files(filter).await
    }

    pub async fn create_file(&self, input: CreateInitiativeInput) -> Result<bool> {
        self.initiatives.create_file(input).await
    }

    pub async fn update_initiative(&self, initiative: &InitiativeModel) -> Result<InitiativeModel> {
        self.initiatives.update_initiative(initiative).await
    }

    pub async fn delete_file(&self, initiative: &InitiativeModel) -> Result<bool> {
        self.initiatives.delete_file(initiative).await
    }

    pub async fn get_file_content(
        &self,
        dir: Directory,
        initiative: &InitiativeModel,
    ) -> Result<InitiativeContent> {
        self.initiatives.get_file_content(dir, initiative).await
    }

    pub async fn update_file(&self, content: &InitiativeContent) -> Result<bool> {
        self.initiatives.update_file(content).await
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub async fn create_comment(&self, comment: &FileComment) -> Result<FileComment> {
        self.comments.create_comment(comment).await
    }

    pub async fn get_comments(&self, page_id: &str) -> Result<Vec<FileComment>> {
        self.comments.get_comments(page_id).await
    }

    // ========================================================================
    // Administrators
    // ========================================================================

    pub async fn check_authorization(&self) -> Result<bool> {
        self.administrators.check_authorization().await
    }

    pub async fn get_admins(&self) -> Result<Vec<Administrator>> {
        self.administrators.get_admins().await
    }

    pub async fn invite_admin(&self, email: &str) -> Result<()> {
        self.administrators.invite_admin(email).await
    }

    pub async fn delete_admin(&self, user_id: &str) -> Result<()> {
        self.administrators.delete_admin(user_id).await
    }

    pub async fn set_admin_status(&self, user_id: &str, is_admin: bool) -> Result<()> {
        self.administrators.set_admin_status(user_id, is_admin).await
    }

    pub async fn accept_invitation(
        &self,
        access_token: &str,
        provider: OAuthProvider,
        redirect_to: Option<&str>,
    ) -> Result<OAuthSignIn> {
        self.administrators
            .accept_invitation(access_token, provider, redirect_to)
            .await
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    pub async fn get_user_info(&self) -> Result<AuthUser> {
        self.auth.get_user_info().await
    }

    pub fn sign_in(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<OAuthSignIn> {
        self.auth.sign_in(provider, redirect_to)
    }

    pub async fn complete_sign_in(&self, session: Session) -> Result<AuthUser> {
        self.auth.complete_sign_in(session).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await
    }

    pub async fn update_user_info(&self, administrator: &Administrator) -> Result<bool> {
        self.auth.update_user_info(administrator).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    // ========================================================================
    // Institutions
    // ========================================================================

    pub async fn register_institution(&self, input: &RegisterInstitutionInput) -> Result<InstitutionModel> {
        self.institutions.register_institution(input).await
    }

    pub async fn fetch_institutions(&self) -> Result<Vec<InstitutionModel>> {
        self.institutions.fetch_institutions().await
    }

    pub async fn delete_institution(&self, institution_id: &str) -> Result<bool> {
        self.institutions.delete_institution(institution_id).await
    }

    pub async fn add_certificates(&self, certificates: &[CertificateModel]) -> Result<bool> {
        self.institutions.add_certificates(certificates).await
    }

    pub async fn remove_certificate(&self, certificate_id: &str) -> Result<()> {
        self.institutions.remove_certificate(certificate_id).await
    }

    pub async fn upload_document(&self, bucket: &str, name: &str, body: Vec<u8>) -> Result<StoredObject> {
        self.institutions.upload_document(bucket, name, body).await
    }

    // ========================================================================
    // Analytics and statistics
    // ========================================================================

    pub async fn get_views_by_date(&self) -> Result<Vec<ViewsByDateResponse>> {
        self.analytics.views_by_date().await
    }

    pub async fn get_views_by_page(&self) -> Result<Vec<ViewsByPageResponse>> {
        self.analytics.views_by_page().await
    }

    pub async fn get_views_by_city_and_page(&self) -> Result<Vec<ViewsByCityAndPageResponse>> {
        self.analytics.views_by_city_and_page().await
    }

    pub async fn count_initiatives(&self, query: &CountQuery) -> Result<u64> {
        self.stats.count_initiatives(query).await
    }

    pub async fn count_by_status(
        &self,
        status: InitiativeStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        self.stats.count_by_status(status, from, to).await
    }

    pub async fn per_month_count(&self, year: i32) -> Result<Vec<PerMonthInitiativeCount>> {
        self.stats.per_month_count(year).await
    }

    pub async fn per_year_created_closed(&self, year: i32) -> Result<PerYearCreatedClosedInitiativeCount> {
        self.stats.per_year_created_closed(year).await
    }

    pub async fn count_by_location(&self) -> Result<Vec<InitiativeCountByLocation>> {
        self.stats.count_by_location().await
    }
}
