//! Shared application state.

use std::sync::Arc;

use credo_core::assessment::AssessmentBuilder;
use credo_core::case::LoanCaseRepository;
use credo_core::gateway::ModelGateway;
use credo_core::underwriter::UnderwriterRepository;

use crate::auth::AuthKeys;
use crate::ingest::DocumentStore;

/// Everything the request handlers need, wired once at startup and shared
/// by reference instead of through global singletons.
#[derive(Clone)]
pub struct AppState {
    pub underwriters: Arc<dyn UnderwriterRepository>,
    pub cases: Arc<dyn LoanCaseRepository>,
    pub gateway: Arc<dyn ModelGateway>,
    pub builder: Arc<AssessmentBuilder>,
    pub auth: Arc<AuthKeys>,
    pub documents: Arc<DocumentStore>,
}
