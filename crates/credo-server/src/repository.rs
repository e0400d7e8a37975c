//! In-memory implementations of the persistence ports.
//!
//! The relational store behind these seams is an external collaborator;
//! these implementations keep the process self-contained and are the
//! reference behavior for any database-backed replacement.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use credo_core::case::{LoanCase, LoanCaseDraft, LoanCaseRepository, LoanCaseUpdate};
use credo_core::error::{CredoError, Result};
use credo_core::underwriter::{CredentialDigest, NewUnderwriter, Underwriter, UnderwriterRepository};

/// Underwriter identities keyed by email.
#[derive(Default)]
pub struct InMemoryUnderwriterRepository {
    next_id: AtomicU64,
    by_email: RwLock<HashMap<String, Underwriter>>,
}

impl InMemoryUnderwriterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UnderwriterRepository for InMemoryUnderwriterRepository {
    async fn create(&self, new: NewUnderwriter) -> Result<Underwriter> {
        let mut by_email = self.by_email.write().await;
        if by_email.contains_key(&new.email) {
            return Err(CredoError::auth("email already registered"));
        }

        let underwriter = Underwriter {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            name: new.name,
            email: new.email.clone(),
            phone: new.phone,
            credential: new.credential,
            security_question: new.security_question,
            security_answer: new.security_answer,
        };
        by_email.insert(new.email, underwriter.clone());
        Ok(underwriter)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Underwriter>> {
        Ok(self.by_email.read().await.get(email).cloned())
    }

    async fn update_credential(&self, email: &str, credential: CredentialDigest) -> Result<()> {
        let mut by_email = self.by_email.write().await;
        let underwriter = by_email
            .get_mut(email)
            .ok_or_else(|| CredoError::not_found("underwriter", email))?;
        underwriter.credential = credential;
        Ok(())
    }
}

/// Loan cases keyed by id, owned through the `underwriter_id` foreign key.
#[derive(Default)]
pub struct InMemoryLoanCaseRepository {
    next_id: AtomicU64,
    cases: RwLock<HashMap<u64, LoanCase>>,
}

impl InMemoryLoanCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LoanCaseRepository for InMemoryLoanCaseRepository {
    async fn create(&self, draft: LoanCaseDraft, underwriter_id: u64) -> Result<LoanCase> {
        let case = LoanCase {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            business_name: draft.business_name,
            loan_amount: draft.loan_amount,
            loan_type: draft.loan_type,
            loan_tenure: draft.loan_tenure,
            underwriter_id,
        };
        self.cases.write().await.insert(case.id, case.clone());
        Ok(case)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<LoanCase>> {
        Ok(self.cases.read().await.get(&id).cloned())
    }

    async fn list_for_underwriter(&self, underwriter_id: u64) -> Result<Vec<LoanCase>> {
        let cases = self.cases.read().await;
        let mut owned: Vec<LoanCase> = cases
            .values()
            .filter(|case| case.underwriter_id == underwriter_id)
            .cloned()
            .collect();
        owned.sort_by_key(|case| case.id);
        Ok(owned)
    }

    async fn update(&self, id: u64, update: LoanCaseUpdate) -> Result<LoanCase> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&id)
            .ok_or_else(|| CredoError::not_found("loan case", id.to_string()))?;

        if let Some(business_name) = update.business_name {
            case.business_name = business_name;
        }
        if let Some(loan_amount) = update.loan_amount {
            case.loan_amount = loan_amount;
        }
        if let Some(loan_type) = update.loan_type {
            case.loan_type = loan_type;
        }
        if let Some(loan_tenure) = update.loan_tenure {
            case.loan_tenure = loan_tenure;
        }
        Ok(case.clone())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.cases
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CredoError::not_found("loan case", id.to_string()))
    }
}
