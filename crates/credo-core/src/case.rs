//! Loan case entity and repository port.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A loan application under review.
///
/// Ownership is a foreign key to the underwriter; the underwriter record
/// holds no duplicated list of case ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCase {
    pub id: u64,
    pub business_name: String,
    pub loan_amount: i64,
    pub loan_type: String,
    pub loan_tenure: u32,
    pub underwriter_id: u64,
}

/// Fields supplied when opening a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanCaseDraft {
    pub business_name: String,
    pub loan_amount: i64,
    pub loan_type: String,
    pub loan_tenure: u32,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanCaseUpdate {
    pub business_name: Option<String>,
    pub loan_amount: Option<i64>,
    pub loan_type: Option<String>,
    pub loan_tenure: Option<u32>,
}

/// Persistence port for loan cases.
#[async_trait::async_trait]
pub trait LoanCaseRepository: Send + Sync {
    /// Opens a new case owned by the given underwriter.
    async fn create(&self, draft: LoanCaseDraft, underwriter_id: u64) -> Result<LoanCase>;

    /// Looks a case up by id.
    async fn find_by_id(&self, id: u64) -> Result<Option<LoanCase>>;

    /// All cases owned by the given underwriter.
    async fn list_for_underwriter(&self, underwriter_id: u64) -> Result<Vec<LoanCase>>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// `NotFound` when the case does not exist.
    async fn update(&self, id: u64, update: LoanCaseUpdate) -> Result<LoanCase>;

    /// Removes a case.
    ///
    /// # Errors
    ///
    /// `NotFound` when the case does not exist.
    async fn delete(&self, id: u64) -> Result<()>;
}
