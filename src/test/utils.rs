use crate::auth::Role;
use crate::db::{create_user, insert_student, set_user_role};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::models::NewStudent;
use crate::uploads::PhotoStore;
use rocket::http::{ContentType, Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::Once;
use tracing::log::LevelFilter;
use uuid::Uuid;

static INIT: Once = Once::new();
pub static STANDARD_PASSWORD: &str = "password123";

pub struct TestUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

#[derive(Default)]
pub struct TestDbBuilder {
    users: Vec<TestUser>,
    students: Vec<NewStudent>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student_user(mut self, name: &str, email: &str) -> Self {
        self.users.push(TestUser {
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Student,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn admin_user(mut self, name: &str, email: &str) -> Self {
        self.users.push(TestUser {
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Admin,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn student_record(mut self, student: NewStudent) -> Self {
        self.students.push(student);
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        INIT.call_once(|| {
            let _ = env_logger::builder()
                .filter_level(LevelFilter::Debug)
                .is_test(true)
                .try_init();
        });

        // A single connection so every query sees the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let mut user_id_map: HashMap<String, i64> = HashMap::new();
        let mut student_id_map: HashMap<String, i64> = HashMap::new();

        for user in &self.users {
            // Registration always yields a student; admins go through the
            // same promotion path the launch seeding uses.
            let user_id = create_user(&pool, &user.name, &user.email, &user.password).await?;

            if user.role == Role::Admin {
                set_user_role(&pool, &user.email, Role::Admin).await?;
            }

            user_id_map.insert(user.email.clone(), user_id);
        }

        for student in &self.students {
            let student_id = insert_student(&pool, student, None).await?;
            student_id_map.insert(student.email.clone(), student_id);
        }

        Ok(TestDb {
            pool,
            user_id_map,
            student_id_map,
        })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    pub user_id_map: HashMap<String, i64>,
    pub student_id_map: HashMap<String, i64>,
}

impl TestDb {
    pub fn user_id(&self, email: &str) -> Option<i64> {
        self.user_id_map.get(email).copied()
    }

    pub fn student_id(&self, email: &str) -> Option<i64> {
        self.student_id_map.get(email).copied()
    }
}

/// Minimal student field set; tests adjust the rest as needed.
pub fn student_fields(name: &str, email: &str) -> NewStudent {
    NewStudent {
        name: name.to_string(),
        email: email.to_string(),
        ..Default::default()
    }
}

pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .admin_user("Admin User", "admin@school.edu")
        .student_user("Sam Student", "sam@school.edu")
        .student_record(NewStudent {
            name: "Sam Student".to_string(),
            email: "sam@school.edu".to_string(),
            roll_number: "R-100".to_string(),
            course: "BSc".to_string(),
            ..Default::default()
        })
        .build()
        .await
        .expect("Failed to build test database")
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let upload_root =
        std::env::temp_dir().join(format!("student-registry-test-{}", Uuid::new_v4()));
    let store = PhotoStore::new(&upload_root);

    let config = AppConfig {
        database_url: String::new(),
        upload_dir: upload_root.display().to_string(),
        bootstrap_admin_email: None,
        session_ttl_hours: 1,
    };

    let rocket = crate::init_rocket(test_db.pool.clone(), store, config).await;
    let client = Client::untracked(rocket)
        .await
        .expect("valid rocket instance");

    (client, test_db)
}

pub async fn login_test_user(client: &Client, email: &str, password: &str) -> Vec<Cookie<'static>> {
    let response = client
        .post("/api/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "email": email,
                "password": password
            })
            .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);

    response.cookies().iter().cloned().collect()
}
