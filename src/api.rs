use rocket::FromForm;
use rocket::State;
use rocket::data::{Data, ToByteUnit};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User, UserSession};
use crate::db::{
    authenticate_user, create_user, create_user_session, delete_student, find_user_by_email,
    get_admin_profile, get_student, get_student_by_email, insert_student, invalidate_session,
    search_students, set_student_photo, update_student, upsert_admin_profile,
};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::imports::{ImportReport, import_students_from_csv};
use crate::models::{AdminProfile, AdminProfileFields, NewStudent, Student};
use crate::uploads::PhotoStore;
use crate::validation::AppErrorExt;
use crate::validation::JsonValidateExt;
use crate::validation::PermissionCheckExt;
use crate::validation::ToValidationResponse;
use crate::validation::ValidationResponse;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct StudentData {
    pub id: i64,
    pub name: String,
    pub father_name: String,
    pub roll_number: String,
    pub registration_number: String,
    pub email: String,
    pub mobile: String,
    pub course: String,
    pub branch: String,
    pub semester: String,
    pub session: String,
    pub photo: Option<String>,
}

impl From<Student> for StudentData {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            father_name: student.father_name,
            roll_number: student.roll_number,
            registration_number: student.registration_number,
            email: student.email,
            mobile: student.mobile,
            course: student.course,
            branch: student.branch,
            semester: student.semester,
            session: student.session,
            photo: student.photo,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct AdminProfileData {
    pub name: String,
    pub department: String,
    pub post: String,
    pub photo: Option<String>,
    pub email: String,
}

impl From<AdminProfile> for AdminProfileData {
    fn from(admin: AdminProfile) -> Self {
        Self {
            name: admin.name,
            department: admin.department,
            post: admin.post,
            photo: admin.photo,
            email: admin.email,
        }
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    use chrono::Utc;
    use rocket::http::{Cookie, SameSite};

    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.email, &validated.password).await {
        Ok(user) => {
            let token = UserSession::generate_token();
            let ttl_hours = config.session_ttl_hours;
            let expires_at = Utc::now() + chrono::Duration::hours(ttl_hours);

            create_user_session(db, user.id, &token, expires_at.naive_utc())
                .await
                .validate_custom()?;

            let cookie = Cookie::build(("session_token", token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .max_age(rocket::time::Duration::hours(ttl_hours));
            cookies.add_private(cookie);

            let redirect_url = match user.role.as_str() {
                "admin" => "/admin".to_string(),
                _ => "/profile".to_string(),
            };

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(user)),
                error: None,
                redirect_url: Some(redirect_url),
            }))
        }
        Err(AppError::Authentication(message)) => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some(message),
            redirect_url: None,
        })),
        Err(other) => Err(other).validate_custom(),
    }
}

#[post("/logout")]
pub async fn api_logout(
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Status {
    let token = cookies
        .get_private("session_token")
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        let _ = invalidate_session(db, &token).await;
    }

    cookies.remove_private(rocket::http::Cookie::build("session_token"));

    Status::Ok
}

#[derive(Deserialize, Validate, Clone)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    name: String,
    #[validate(email(message = "A valid email is required"))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
}

/// Open registration; every new account starts as a student. Promotion
/// happens only through the launch-time bootstrap seeding.
#[post("/register", data = "<registration>")]
pub async fn api_register(
    registration: Json<RegisterRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = registration.validate_custom()?;

    let existing_user = find_user_by_email(db, &validated.email)
        .await
        .validate_custom()?;

    if existing_user.is_some() {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "email",
                "Email already registered",
            )),
        ));
    }

    create_user(db, &validated.name, &validated.email, &validated.password)
        .await
        .validate_custom()?;

    Ok(Status::Created)
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

#[get("/students/<id>")]
pub async fn api_get_student(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StudentData>, Status> {
    user.require_permission(Permission::ManageStudents)?;

    let student = get_student(db, id).await?;

    Ok(Json(StudentData::from(student)))
}

#[get("/students?<search>")]
pub async fn api_get_students(
    search: Option<String>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StudentData>>, Status> {
    user.require_permission(Permission::ManageStudents)?;

    let students = search_students(db, search.as_deref()).await?;

    Ok(Json(students.into_iter().map(StudentData::from).collect()))
}

#[derive(FromForm)]
pub struct StudentForm<'r> {
    name: String,
    father_name: Option<String>,
    roll_number: Option<String>,
    registration_number: Option<String>,
    email: String,
    mobile: Option<String>,
    course: Option<String>,
    branch: Option<String>,
    semester: Option<String>,
    session: Option<String>,
    photo: Option<TempFile<'r>>,
}

impl From<&StudentForm<'_>> for NewStudent {
    fn from(form: &StudentForm<'_>) -> Self {
        Self {
            name: form.name.clone(),
            father_name: form.father_name.clone().unwrap_or_default(),
            roll_number: form.roll_number.clone().unwrap_or_default(),
            registration_number: form.registration_number.clone().unwrap_or_default(),
            email: form.email.clone(),
            mobile: form.mobile.clone().unwrap_or_default(),
            course: form.course.clone().unwrap_or_default(),
            branch: form.branch.clone().unwrap_or_default(),
            semester: form.semester.clone().unwrap_or_default(),
            session: form.session.clone().unwrap_or_default(),
        }
    }
}

/// Persists an uploaded photo, if one accompanied the form. The file lands
/// on disk before any record mentions it.
async fn stored_photo(
    upload: &mut Option<TempFile<'_>>,
    store: &PhotoStore,
) -> Result<Option<String>, AppError> {
    match upload {
        Some(file) if file.len() > 0 => Ok(Some(store.store_upload(file).await?)),
        _ => Ok(None),
    }
}

#[derive(Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[post("/students", data = "<form>")]
pub async fn api_add_student(
    mut form: Form<StudentForm<'_>>,
    user: User,
    db: &State<Pool<Sqlite>>,
    store: &State<PhotoStore>,
) -> Result<Custom<Json<CreatedResponse>>, Status> {
    user.require_permission(Permission::ManageStudents)?;

    let photo = stored_photo(&mut form.photo, store).await?;
    let student = NewStudent::from(&*form);

    let id = insert_student(db, &student, photo.as_deref()).await?;

    Ok(Custom(Status::Created, Json(CreatedResponse { id })))
}

#[put("/students/<id>", data = "<form>")]
pub async fn api_update_student(
    id: i64,
    mut form: Form<StudentForm<'_>>,
    user: User,
    db: &State<Pool<Sqlite>>,
    store: &State<PhotoStore>,
) -> Result<Status, Status> {
    user.require_permission(Permission::ManageStudents)?;

    let photo = stored_photo(&mut form.photo, store).await?;
    let student = NewStudent::from(&*form);

    update_student(db, id, &student).await?;

    if let Some(photo) = photo {
        set_student_photo(db, id, &photo).await?;
    }

    Ok(Status::Ok)
}

#[delete("/students/<id>")]
pub async fn api_delete_student(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    user.require_permission(Permission::ManageStudents)?;

    delete_student(db, id).await?;

    Ok(Status::Ok)
}

#[post("/students/import", data = "<data>")]
pub async fn api_import_students(
    data: Data<'_>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ImportReport>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ImportStudents)
        .validate_custom()?;

    let bytes = data
        .open(2.mebibytes())
        .into_bytes()
        .await
        .map_err(|_| Status::BadRequest.to_validation_response())?;

    if !bytes.is_complete() {
        return Err(Status::PayloadTooLarge.to_validation_response());
    }

    let report = import_students_from_csv(db, &bytes.value)
        .await
        .validate_custom()?;

    Ok(Json(report))
}

/// A student's view of their own record, joined by the session email. A
/// missing row means the admin has not entered them yet.
#[get("/profile")]
pub async fn api_get_own_profile(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StudentData>, Status> {
    user.require_permission(Permission::ViewOwnRecord)?;

    match get_student_by_email(db, &user.email).await? {
        Some(student) => Ok(Json(StudentData::from(student))),
        None => Err(AppError::NotFound(
            "Student record not found. Contact admin.".to_string(),
        )
        .into()),
    }
}

#[get("/admin/profile")]
pub async fn api_get_admin_profile(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Option<AdminProfileData>>, Status> {
    user.require_permission(Permission::ManageAdminProfile)?;

    let profile = get_admin_profile(db, &user.email).await?;

    Ok(Json(profile.map(AdminProfileData::from)))
}

#[derive(FromForm)]
pub struct AdminProfileForm<'r> {
    name: String,
    department: Option<String>,
    post: Option<String>,
    photo: Option<TempFile<'r>>,
}

#[put("/admin/profile", data = "<form>")]
pub async fn api_upsert_admin_profile(
    mut form: Form<AdminProfileForm<'_>>,
    user: User,
    db: &State<Pool<Sqlite>>,
    store: &State<PhotoStore>,
) -> Result<Status, Status> {
    user.require_permission(Permission::ManageAdminProfile)?;

    let photo = stored_photo(&mut form.photo, store).await?;

    let fields = AdminProfileFields {
        name: form.name.clone(),
        department: form.department.clone().unwrap_or_default(),
        post: form.post.clone().unwrap_or_default(),
    };

    upsert_admin_profile(db, &user.email, &fields, photo.as_deref()).await?;

    Ok(Status::Ok)
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
