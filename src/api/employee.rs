use crate::{
    error::ApiError,
    model::employee::{Employee, EmployeeChanges, EmployeeDocument, JoiningDate},
    store::EmployeeStore,
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "E123")]
    pub employee_id: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = 75000.0)]
    pub salary: f64,
    #[schema(example = "2023-01-15", format = Date, value_type = String)]
    pub joining_date: JoiningDate,
    #[schema(example = json!(["Python", "MongoDB"]))]
    pub skills: Vec<String>,
}

/// Partial update. The outer `Option` records whether the field was sent at all.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[serde(default, deserialize_with = "present")]
    #[schema(example = "Jane Smith", value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(example = "HR", value_type = Option<String>)]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(example = 60000.0, value_type = Option<f64>)]
    pub salary: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(example = "2024-03-01", format = Date, value_type = Option<String>)]
    pub joining_date: Option<Option<JoiningDate>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(example = json!(["Communication", "Recruitment"]), value_type = Option<Vec<String>>)]
    pub skills: Option<Option<Vec<String>>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Exact department name to filter by
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SkillQuery {
    /// The skill to search for
    pub skill: String,
}

/// Wraps any value that was present in the payload, `null` included, in `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn require_text(field: &str, value: String) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value)
}

fn require_salary(value: f64) -> Result<f64, ApiError> {
    if !value.is_finite() {
        return Err(ApiError::Validation("salary must be a finite number".into()));
    }
    Ok(value)
}

fn require_present<T>(field: &str, value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("{} must not be null", field)))
}

impl CreateEmployee {
    pub fn into_document(self) -> Result<EmployeeDocument, ApiError> {
        Ok(EmployeeDocument {
            id: None,
            employee_id: require_text("employee_id", self.employee_id)?,
            name: require_text("name", self.name)?,
            department: require_text("department", self.department)?,
            salary: require_salary(self.salary)?,
            joining_date: self.joining_date.at_midnight(),
            skills: self.skills,
        })
    }
}

impl UpdateEmployee {
    pub fn into_changes(self) -> Result<EmployeeChanges, ApiError> {
        let name = self
            .name
            .map(|v| require_present("name", v).and_then(|v| require_text("name", v)))
            .transpose()?;
        let department = self
            .department
            .map(|v| require_present("department", v).and_then(|v| require_text("department", v)))
            .transpose()?;
        let salary = self
            .salary
            .map(|v| require_present("salary", v).and_then(require_salary))
            .transpose()?;
        let joining_date = self
            .joining_date
            .map(|v| require_present("joining_date", v).map(JoiningDate::at_midnight))
            .transpose()?;
        let skills = self
            .skills
            .map(|v| require_present("skills", v))
            .transpose()?;

        Ok(EmployeeChanges {
            name,
            department,
            salary,
            joining_date,
            skills,
        })
    }
}

fn to_employees(docs: Vec<EmployeeDocument>) -> Result<Vec<Employee>, ApiError> {
    docs.into_iter()
        .map(|doc| Employee::try_from(doc).map_err(ApiError::from))
        .collect()
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/employees/",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Duplicate employee_id or malformed body", body = Object, example = json!({
            "message": "Employee with employee_id 'E123' already exists."
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Something went wrong, Contact with system admin"
        }))
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    store: web::Data<dyn EmployeeStore>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, ApiError> {
    let doc = payload.into_inner().into_document()?;
    let employee_id = doc.employee_id.clone();

    let id = store.insert(doc).await.map_err(|e| {
        let err = ApiError::from(e);
        if matches!(err, ApiError::Conflict(_)) {
            warn!(employee_id = %employee_id, "Duplicate employee_id rejected");
        }
        err
    })?;

    // Re-read so the response reflects exactly what was stored.
    let created = store.find_by_record_id(id).await?.ok_or_else(|| {
        error!(employee_id = %employee_id, record_id = %id, "Inserted employee vanished before re-read");
        ApiError::Internal
    })?;

    info!(employee_id = %employee_id, record_id = %id, "Employee created");
    Ok(HttpResponse::Created().json(Employee::try_from(created)?))
}

/// Get Employee by employee_id
#[utoipa::path(
    get,
    path = "/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Client-assigned employee identifier")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();

    let employee = store
        .find_by_employee_id(&employee_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(HttpResponse::Ok().json(Employee::try_from(employee)?))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Client-assigned employee identifier")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee after the update", body = Employee),
        (status = 400, description = "Malformed body or explicit null"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
    body: web::Json<UpdateEmployee>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    let changes = body.into_inner().into_changes()?;

    let existing = store
        .find_by_employee_id(&employee_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if changes.is_empty() {
        debug!(employee_id = %employee_id, "No fields to update");
        return Ok(HttpResponse::Ok().json(Employee::try_from(existing)?));
    }

    // A concurrent delete can land between the lookup and the write.
    if !store.update_fields(&employee_id, &changes).await? {
        return Err(ApiError::NotFound);
    }

    let updated = store
        .find_by_employee_id(&employee_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(employee_id = %employee_id, "Employee updated");
    Ok(HttpResponse::Ok().json(Employee::try_from(updated)?))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Client-assigned employee identifier")
    ),
    responses(
        (status = 204, description = "Successfully deleted"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();

    if !store.delete(&employee_id).await? {
        return Err(ApiError::NotFound);
    }

    info!(employee_id = %employee_id, "Employee deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// List Employees, newest joiners first
#[utoipa::path(
    get,
    path = "/employees/",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employees sorted by joining_date descending", body = [Employee]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    // An empty department means no filter.
    let department = query.department.as_deref().filter(|d| !d.is_empty());
    debug!(department = ?department, "Listing employees");

    let employees = to_employees(store.list(department).await?)?;
    Ok(HttpResponse::Ok().json(employees))
}

/// Average salary per department
#[utoipa::path(
    get,
    path = "/employees/avg-salary",
    responses(
        (status = 200, description = "Average salary per department, sorted by department", body = [crate::model::employee::AverageSalaryByDepartment]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reporting"
)]
pub async fn average_salary_by_department(
    store: web::Data<dyn EmployeeStore>,
) -> Result<HttpResponse, ApiError> {
    let rows = store.average_salary_by_department().await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Search Employees by skill
#[utoipa::path(
    get,
    path = "/employees/search",
    params(SkillQuery),
    responses(
        (status = 200, description = "Employees listing the exact skill", body = [Employee]),
        (status = 400, description = "Missing skill parameter"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reporting"
)]
pub async fn search_employees_by_skill(
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<SkillQuery>,
) -> Result<HttpResponse, ApiError> {
    debug!(skill = %query.skill, "Searching employees by skill");

    let employees = to_employees(store.search_by_skill(&query.skill).await?)?;
    Ok(HttpResponse::Ok().json(employees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::employee::{AverageSalaryByDepartment, RecordId},
        routes,
        store::{MemoryEmployeeStore, StoreError},
    };
    use actix_web::{
        App,
        http::StatusCode,
        middleware::NormalizePath,
        test as actix_test,
        web::Data,
    };
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Memory store that counts writes issued by the handlers.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryEmployeeStore,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl EmployeeStore for CountingStore {
        async fn insert(&self, doc: EmployeeDocument) -> Result<RecordId, StoreError> {
            self.inner.insert(doc).await
        }

        async fn find_by_record_id(
            &self,
            id: RecordId,
        ) -> Result<Option<EmployeeDocument>, StoreError> {
            self.inner.find_by_record_id(id).await
        }

        async fn find_by_employee_id(
            &self,
            employee_id: &str,
        ) -> Result<Option<EmployeeDocument>, StoreError> {
            self.inner.find_by_employee_id(employee_id).await
        }

        async fn update_fields(
            &self,
            employee_id: &str,
            changes: &EmployeeChanges,
        ) -> Result<bool, StoreError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update_fields(employee_id, changes).await
        }

        async fn delete(&self, employee_id: &str) -> Result<bool, StoreError> {
            self.inner.delete(employee_id).await
        }

        async fn list(
            &self,
            department: Option<&str>,
        ) -> Result<Vec<EmployeeDocument>, StoreError> {
            self.inner.list(department).await
        }

        async fn search_by_skill(&self, skill: &str) -> Result<Vec<EmployeeDocument>, StoreError> {
            self.inner.search_by_skill(skill).await
        }

        async fn average_salary_by_department(
            &self,
        ) -> Result<Vec<AverageSalaryByDepartment>, StoreError> {
            self.inner.average_salary_by_department().await
        }
    }

    macro_rules! test_app {
        ($store:expr) => {
            actix_test::init_service(
                App::new()
                    .wrap(NormalizePath::trim())
                    .app_data(Data::<dyn EmployeeStore>::from(
                        $store.clone() as Arc<dyn EmployeeStore>
                    ))
                    .configure(routes::configure),
            )
            .await
        };
    }

    fn new_employee(employee_id: &str, department: &str, salary: f64, joining_date: &str) -> Value {
        json!({
            "employee_id": employee_id,
            "name": format!("Employee {employee_id}"),
            "department": department,
            "salary": salary,
            "joining_date": joining_date,
            "skills": ["Python", "MongoDB"]
        })
    }

    fn ids(body: &Value) -> Vec<&str> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|e| e["employee_id"].as_str().unwrap())
            .collect()
    }

    #[actix_web::test]
    async fn create_then_get_returns_the_stored_record() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees/")
            .set_json(new_employee("E123", "Engineering", 75000.0, "2023-01-15T10:30:00"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = actix_test::read_body_json(res).await;

        let record_id = created["_id"].as_str().unwrap();
        assert!(record_id.parse::<RecordId>().is_ok());
        assert_eq!(created["employee_id"], "E123");
        assert_eq!(created["name"], "Employee E123");
        assert_eq!(created["department"], "Engineering");
        assert_eq!(created["salary"], 75000.0);
        assert_eq!(created["joining_date"], "2023-01-15T00:00:00Z");
        assert_eq!(created["skills"], json!(["Python", "MongoDB"]));

        let req = actix_test::TestRequest::get().uri("/employees/E123").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let fetched: Value = actix_test::read_body_json(res).await;
        assert_eq!(fetched, created);

        let typed: Employee = serde_json::from_value(fetched).unwrap();
        assert_eq!(typed.id.to_string(), record_id);
    }

    #[actix_web::test]
    async fn duplicate_employee_id_is_rejected() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees")
            .set_json(new_employee("E1", "Eng", 100.0, "2023-01-01"))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = actix_test::TestRequest::post()
            .uri("/employees")
            .set_json(new_employee("E1", "HR", 50.0, "2024-01-01"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["message"], "Employee with employee_id 'E1' already exists.");

        let stored = store.find_by_employee_id("E1").await.unwrap().unwrap();
        assert_eq!(stored.department, "Eng");
    }

    #[actix_web::test]
    async fn malformed_create_bodies_are_client_errors() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let mut missing_salary = new_employee("E1", "Eng", 1.0, "2023-01-01");
        missing_salary.as_object_mut().unwrap().remove("salary");
        let mut wrong_type = new_employee("E1", "Eng", 1.0, "2023-01-01");
        wrong_type["salary"] = json!("lots");
        let bad_date = new_employee("E1", "Eng", 1.0, "01/15/2023");
        let blank_name = {
            let mut body = new_employee("E1", "Eng", 1.0, "2023-01-01");
            body["name"] = json!("  ");
            body
        };

        for body in [missing_salary, wrong_type, bad_date, blank_name] {
            let req = actix_test::TestRequest::post()
                .uri("/employees/")
                .set_json(&body)
                .to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let err: Value = actix_test::read_body_json(res).await;
            assert!(err["message"].is_string());
        }

        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_employee_is_not_found_everywhere() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let requests = [
            actix_test::TestRequest::get().uri("/employees/ghost").to_request(),
            actix_test::TestRequest::put()
                .uri("/employees/ghost")
                .set_json(json!({ "salary": 1.0 }))
                .to_request(),
            actix_test::TestRequest::delete().uri("/employees/ghost").to_request(),
        ];

        for req in requests {
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
            let body: Value = actix_test::read_body_json(res).await;
            assert_eq!(body["message"], "Employee not found");
        }
    }

    #[actix_web::test]
    async fn salary_only_update_leaves_other_fields_untouched() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees/")
            .set_json(new_employee("E1", "Eng", 100.0, "2023-01-01"))
            .to_request();
        let before: Value = actix_test::call_and_read_body_json(&app, req).await;

        let req = actix_test::TestRequest::put()
            .uri("/employees/E1")
            .set_json(json!({ "salary": 120.5 }))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let after: Value = actix_test::read_body_json(res).await;

        let mut expected = before.clone();
        expected["salary"] = json!(120.5);
        assert_eq!(after, expected);
    }

    #[actix_web::test]
    async fn update_normalizes_joining_date_and_replaces_skills() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees/")
            .set_json(new_employee("E1", "Eng", 100.0, "2023-01-01"))
            .to_request();
        actix_test::call_service(&app, req).await;

        let req = actix_test::TestRequest::put()
            .uri("/employees/E1")
            .set_json(json!({
                "department": "HR",
                "joining_date": "2024-03-01T17:45:00Z",
                "skills": ["Recruitment"]
            }))
            .to_request();
        let updated: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(updated["department"], "HR");
        assert_eq!(updated["joining_date"], "2024-03-01T00:00:00Z");
        assert_eq!(updated["skills"], json!(["Recruitment"]));
        assert_eq!(updated["salary"], 100.0);
        assert_eq!(updated["employee_id"], "E1");
    }

    #[actix_web::test]
    async fn empty_update_returns_record_without_writing() {
        let store = Arc::new(CountingStore::default());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees/")
            .set_json(new_employee("E1", "Eng", 100.0, "2023-01-01"))
            .to_request();
        let created: Value = actix_test::call_and_read_body_json(&app, req).await;

        let req = actix_test::TestRequest::put()
            .uri("/employees/E1")
            .set_json(json!({}))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;

        assert_eq!(body, created);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn explicit_null_in_update_is_rejected_before_any_write() {
        let store = Arc::new(CountingStore::default());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees/")
            .set_json(new_employee("E1", "Eng", 100.0, "2023-01-01"))
            .to_request();
        actix_test::call_service(&app, req).await;

        let req = actix_test::TestRequest::put()
            .uri("/employees/E1")
            .set_json(json!({ "name": null, "salary": 5.0 }))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["message"], "name must not be null");

        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
        let stored = store.find_by_employee_id("E1").await.unwrap().unwrap();
        assert_eq!(stored.salary, 100.0);
    }

    #[actix_web::test]
    async fn delete_removes_the_record() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::post()
            .uri("/employees/")
            .set_json(new_employee("E1", "Eng", 100.0, "2023-01-01"))
            .to_request();
        actix_test::call_service(&app, req).await;

        let req = actix_test::TestRequest::delete().uri("/employees/E1").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(actix_test::read_body(res).await.is_empty());

        let req = actix_test::TestRequest::get().uri("/employees/E1").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn list_is_newest_first_and_filters_by_exact_department() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        for body in [
            new_employee("E1", "Eng", 100.0, "2021-05-01"),
            new_employee("E2", "HR", 50.0, "2023-02-01"),
            new_employee("E3", "Eng", 200.0, "2022-07-15"),
            new_employee("E4", "Engineering", 300.0, "2024-01-01"),
        ] {
            let req = actix_test::TestRequest::post()
                .uri("/employees/")
                .set_json(body)
                .to_request();
            assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = actix_test::TestRequest::get().uri("/employees/").to_request();
        let all: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&all), ["E4", "E2", "E3", "E1"]);

        let req = actix_test::TestRequest::get()
            .uri("/employees?department=Eng")
            .to_request();
        let eng: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&eng), ["E3", "E1"]);

        let req = actix_test::TestRequest::get()
            .uri("/employees/?department=Sales")
            .to_request();
        let none: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(none, json!([]));
    }

    #[actix_web::test]
    async fn average_salary_is_grouped_rounded_and_sorted() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::get().uri("/employees/avg-salary").to_request();
        let empty: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(empty, json!([]));

        for body in [
            new_employee("E1", "HR", 50.0, "2021-01-01"),
            new_employee("E2", "Eng", 100.0, "2021-01-01"),
            new_employee("E3", "Eng", 200.0, "2021-01-01"),
        ] {
            let req = actix_test::TestRequest::post()
                .uri("/employees/")
                .set_json(body)
                .to_request();
            actix_test::call_service(&app, req).await;
        }

        let req = actix_test::TestRequest::get().uri("/employees/avg-salary").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let rows: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            rows,
            json!([
                { "department": "Eng", "avg_salary": 150.0 },
                { "department": "HR", "avg_salary": 50.0 }
            ])
        );
    }

    #[actix_web::test]
    async fn skill_search_matches_whole_elements_only() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let mut gopher = new_employee("E1", "Eng", 1.0, "2021-01-01");
        gopher["skills"] = json!(["Go", "SQL"]);
        let mut golang = new_employee("E2", "Eng", 1.0, "2021-01-01");
        golang["skills"] = json!(["Golang"]);
        let mut lower = new_employee("E3", "Eng", 1.0, "2021-01-01");
        lower["skills"] = json!(["go"]);

        for body in [gopher, golang, lower] {
            let req = actix_test::TestRequest::post()
                .uri("/employees/")
                .set_json(body)
                .to_request();
            actix_test::call_service(&app, req).await;
        }

        let req = actix_test::TestRequest::get()
            .uri("/employees/search?skill=Go")
            .to_request();
        let found: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&found), ["E1"]);

        let req = actix_test::TestRequest::get()
            .uri("/employees/search?skill=Rust")
            .to_request();
        let none: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(none, json!([]));
    }

    #[actix_web::test]
    async fn skill_search_requires_the_skill_parameter() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        let req = actix_test::TestRequest::get().uri("/employees/search").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert!(body["message"].as_str().unwrap().contains("Invalid query parameters"));
    }

    #[actix_web::test]
    async fn route_names_are_usable_as_employee_ids() {
        let store = Arc::new(MemoryEmployeeStore::new());
        let app = test_app!(store);

        for employee_id in ["search", "avg-salary"] {
            let req = actix_test::TestRequest::post()
                .uri("/employees/")
                .set_json(new_employee(employee_id, "Eng", 100.0, "2023-01-01"))
                .to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::CREATED, "create {employee_id}");

            let req = actix_test::TestRequest::put()
                .uri(&format!("/employees/{employee_id}"))
                .set_json(json!({ "salary": 200.0 }))
                .to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK, "update {employee_id}");
            let updated: Value = actix_test::read_body_json(res).await;
            assert_eq!(updated["employee_id"], employee_id);
            assert_eq!(updated["salary"], 200.0);

            let req = actix_test::TestRequest::delete()
                .uri(&format!("/employees/{employee_id}"))
                .to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::NO_CONTENT, "delete {employee_id}");

            let req = actix_test::TestRequest::delete()
                .uri(&format!("/employees/{employee_id}"))
                .to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "second delete {employee_id}");
        }

        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[test]
    fn update_payload_distinguishes_omitted_from_null() {
        let omitted: UpdateEmployee = serde_json::from_value(json!({})).unwrap();
        assert!(omitted.name.is_none());
        assert!(omitted.into_changes().unwrap().is_empty());

        let null: UpdateEmployee = serde_json::from_value(json!({ "skills": null })).unwrap();
        assert_eq!(null.skills, Some(None));
        assert!(null.into_changes().is_err());

        let set: UpdateEmployee =
            serde_json::from_value(json!({ "skills": [], "salary": 10 })).unwrap();
        let changes = set.into_changes().unwrap();
        assert_eq!(changes.skills, Some(vec![]));
        assert_eq!(changes.salary, Some(10.0));
        assert!(changes.name.is_none());
    }

    #[test]
    fn update_payload_ignores_employee_id() {
        let update: UpdateEmployee =
            serde_json::from_value(json!({ "employee_id": "E999" })).unwrap();
        assert!(update.into_changes().unwrap().is_empty());
    }
}
