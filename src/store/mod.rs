//! Storage seam for the employee collection.
//!
//! Handlers only see [`EmployeeStore`]; the process picks the MongoDB or
//! in-memory implementation at startup and shares it through `web::Data`.

mod memory;
mod mongo;

pub use memory::MemoryEmployeeStore;
pub use mongo::MongoEmployeeStore;

use async_trait::async_trait;

use crate::model::employee::{
    AverageSalaryByDepartment, EmployeeChanges, EmployeeDocument, RecordId,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("employee_id '{0}' already exists")]
    Duplicate(String),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("unexpected stored data: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Inserts a new record and returns its generated id.
    /// Fails with [`StoreError::Duplicate`] if `employee_id` is taken.
    async fn insert(&self, doc: EmployeeDocument) -> Result<RecordId, StoreError>;

    async fn find_by_record_id(&self, id: RecordId)
    -> Result<Option<EmployeeDocument>, StoreError>;

    async fn find_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<EmployeeDocument>, StoreError>;

    /// Returns `false` when no record matched.
    async fn update_fields(
        &self,
        employee_id: &str,
        changes: &EmployeeChanges,
    ) -> Result<bool, StoreError>;

    /// Returns `false` when no record matched.
    async fn delete(&self, employee_id: &str) -> Result<bool, StoreError>;

    /// Newest `joining_date` first; equal dates put the most recently created record first.
    async fn list(&self, department: Option<&str>) -> Result<Vec<EmployeeDocument>, StoreError>;

    /// Exact element match against `skills`.
    async fn search_by_skill(&self, skill: &str) -> Result<Vec<EmployeeDocument>, StoreError>;

    /// One row per department, sorted by department ascending, averages rounded to cents.
    async fn average_salary_by_department(
        &self,
    ) -> Result<Vec<AverageSalaryByDepartment>, StoreError>;

    /// Releases the underlying connection. Called once at shutdown.
    async fn shutdown(&self) {}
}
