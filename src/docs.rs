use crate::api::employee::{CreateEmployee, UpdateEmployee};
use crate::model::employee::{AverageSalaryByDepartment, Employee};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Management API",
        version = "0.1.0",
        description = r#"
## Employee Management API

CRUD and reporting over a single collection of employee records.

### 🔹 Features
- **Employee Management**
  - Create, view, partially update, delete and list employees
  - Filter by department, newest joiners first
- **Reporting**
  - Average salary per department
  - Exact-match search by skill

### 📦 Response Format
- Records carry the database id as `_id` (24 hex characters)
- `joining_date` is returned as an ISO-8601 timestamp at midnight UTC
- Errors are returned as `{"message": "..."}`

---
Built with **Rust**, **Actix Web**, **MongoDB**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::list_employees,
        crate::api::employee::average_salary_by_department,
        crate::api::employee::search_employees_by_skill
    ),
    components(
        schemas(
            CreateEmployee,
            UpdateEmployee,
            Employee,
            AverageSalaryByDepartment
        )
    ),
    tags(
        (name = "Employee", description = "Employee management APIs"),
        (name = "Reporting", description = "Search and aggregation APIs"),
    )
)]
pub struct ApiDoc;
