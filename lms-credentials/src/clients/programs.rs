//! Programs service client

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{CourseCompletion, ProgramId};
use async_trait::async_trait;

/// Completion check endpoint, relative to the programs API base
pub const COMPLETION_PATH: &str = "programs/complete/";

/// Programs service operations used by the reconciler
#[async_trait]
pub trait ProgramsApi: Send + Sync {
    /// Ids of the programs fully satisfied by `completions`
    async fn check_completion(
        &self,
        completions: &[CourseCompletion],
    ) -> Result<Vec<ProgramId>, ClientError>;
}

pub struct HttpProgramsClient {
    api: ApiClient,
}

impl HttpProgramsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProgramsApi for HttpProgramsClient {
    async fn check_completion(
        &self,
        completions: &[CourseCompletion],
    ) -> Result<Vec<ProgramId>, ClientError> {
        tracing::debug!(
            courses = completions.len(),
            base_url = %self.api.base_url(),
            "Calling programs completion check"
        );
        self.api.post_json(COMPLETION_PATH, completions).await
    }
}
