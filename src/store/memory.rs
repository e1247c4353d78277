use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{EmployeeStore, StoreError};
use crate::model::employee::{
    AverageSalaryByDepartment, EmployeeChanges, EmployeeDocument, RecordId, round_to_cents,
};

/// Process-local store for running without MongoDB. Records are kept in insertion order.
#[derive(Default)]
pub struct MemoryEmployeeStore {
    records: Mutex<Vec<EmployeeDocument>>,
}

impl MemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<EmployeeDocument>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EmployeeStore for MemoryEmployeeStore {
    async fn insert(&self, mut doc: EmployeeDocument) -> Result<RecordId, StoreError> {
        let mut records = self.records();
        if records.iter().any(|r| r.employee_id == doc.employee_id) {
            return Err(StoreError::Duplicate(doc.employee_id));
        }

        let id = RecordId::generate();
        doc.id = Some(id.as_object_id());
        records.push(doc);
        Ok(id)
    }

    async fn find_by_record_id(
        &self,
        id: RecordId,
    ) -> Result<Option<EmployeeDocument>, StoreError> {
        let oid = id.as_object_id();
        Ok(self.records().iter().find(|r| r.id == Some(oid)).cloned())
    }

    async fn find_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<EmployeeDocument>, StoreError> {
        Ok(self
            .records()
            .iter()
            .find(|r| r.employee_id == employee_id)
            .cloned())
    }

    async fn update_fields(
        &self,
        employee_id: &str,
        changes: &EmployeeChanges,
    ) -> Result<bool, StoreError> {
        let mut records = self.records();
        match records.iter_mut().find(|r| r.employee_id == employee_id) {
            Some(record) => {
                changes.apply_to(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, employee_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records();
        let before = records.len();
        records.retain(|r| r.employee_id != employee_id);
        Ok(records.len() < before)
    }

    async fn list(&self, department: Option<&str>) -> Result<Vec<EmployeeDocument>, StoreError> {
        let mut found: Vec<EmployeeDocument> = self
            .records()
            .iter()
            .rev()
            .filter(|r| department.is_none_or(|d| r.department == d))
            .cloned()
            .collect();
        // Stable sort, so equal dates stay newest-inserted first.
        found.sort_by_key(|r| Reverse(r.joining_date));
        Ok(found)
    }

    async fn search_by_skill(&self, skill: &str) -> Result<Vec<EmployeeDocument>, StoreError> {
        Ok(self
            .records()
            .iter()
            .filter(|r| r.skills.iter().any(|s| s == skill))
            .cloned()
            .collect())
    }

    async fn average_salary_by_department(
        &self,
    ) -> Result<Vec<AverageSalaryByDepartment>, StoreError> {
        // BTreeMap keeps departments in ascending order.
        let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for record in self.records().iter() {
            let entry = totals.entry(record.department.clone()).or_default();
            entry.0 += record.salary;
            entry.1 += 1;
        }

        Ok(totals
            .into_iter()
            .map(|(department, (sum, count))| AverageSalaryByDepartment {
                department,
                avg_salary: round_to_cents(sum / count as f64),
            })
            .collect())
    }
}
