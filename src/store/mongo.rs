use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::{EmployeeStore, StoreError};
use crate::model::employee::{
    AverageSalaryByDepartment, EmployeeChanges, EmployeeDocument, RecordId,
};

const DUPLICATE_KEY_CODE: i32 = 11000;

pub struct MongoEmployeeStore {
    client: Client,
    collection: Collection<EmployeeDocument>,
}

impl MongoEmployeeStore {
    pub fn new(client: Client, db_name: &str, collection_name: &str) -> Self {
        let collection = client
            .database(db_name)
            .collection::<EmployeeDocument>(collection_name);
        Self { client, collection }
    }

    /// Backs `employee_id` uniqueness with a unique index so a duplicate insert fails atomically.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "employee_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let created = self.collection.create_index(index).await?;
        info!(index = %created.index_name, "Ensured unique employee_id index");
        Ok(())
    }

    async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<EmployeeDocument>, StoreError> {
        debug!(filter = %filter, sort = ?sort, "Querying employees");
        let mut find = self.collection.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        let employees: Vec<EmployeeDocument> = find.await?.try_collect().await?;
        Ok(employees)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_err)) if write_err.code == DUPLICATE_KEY_CODE
    )
}

fn average_salary_pipeline() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$department", "avg_salary": { "$avg": "$salary" } } },
        doc! {
            "$project": {
                "_id": 0,
                "department": "$_id",
                "avg_salary": { "$round": ["$avg_salary", 2] },
            }
        },
        doc! { "$sort": { "department": 1 } },
    ]
}

#[async_trait]
impl EmployeeStore for MongoEmployeeStore {
    async fn insert(&self, doc: EmployeeDocument) -> Result<RecordId, StoreError> {
        let employee_id = doc.employee_id.clone();
        let result = self.collection.insert_one(doc).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(employee_id.clone())
            } else {
                StoreError::Mongo(e)
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .map(RecordId::from)
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "inserted_id for '{}' is not an ObjectId: {}",
                    employee_id, result.inserted_id
                ))
            })
    }

    async fn find_by_record_id(
        &self,
        id: RecordId,
    ) -> Result<Option<EmployeeDocument>, StoreError> {
        let found = self
            .collection
            .find_one(doc! { "_id": id.as_object_id() })
            .await?;
        Ok(found)
    }

    async fn find_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<EmployeeDocument>, StoreError> {
        let found = self
            .collection
            .find_one(doc! { "employee_id": employee_id })
            .await?;
        Ok(found)
    }

    async fn update_fields(
        &self,
        employee_id: &str,
        changes: &EmployeeChanges,
    ) -> Result<bool, StoreError> {
        let set = changes.to_set_document();
        debug!(employee_id, set = %set, "Updating employee");
        let result = self
            .collection
            .update_one(doc! { "employee_id": employee_id }, doc! { "$set": set })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, employee_id: &str) -> Result<bool, StoreError> {
        let result = self
            .collection
            .delete_one(doc! { "employee_id": employee_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn list(&self, department: Option<&str>) -> Result<Vec<EmployeeDocument>, StoreError> {
        let filter = match department {
            Some(department) => doc! { "department": department },
            None => Document::new(),
        };
        self.find_many(filter, Some(doc! { "joining_date": -1, "_id": -1 }))
            .await
    }

    async fn search_by_skill(&self, skill: &str) -> Result<Vec<EmployeeDocument>, StoreError> {
        // Matching a scalar against an array field is an element-equality test.
        self.find_many(doc! { "skills": skill }, None).await
    }

    async fn average_salary_by_department(
        &self,
    ) -> Result<Vec<AverageSalaryByDepartment>, StoreError> {
        let rows: Vec<AverageSalaryByDepartment> = self
            .collection
            .aggregate(average_salary_pipeline())
            .with_type::<AverageSalaryByDepartment>()
            .await?
            .try_collect()
            .await?;
        Ok(rows)
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB connection closed");
    }
}
