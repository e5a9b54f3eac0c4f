use crate::{
    auth::{DbUser, DbUserSession, Role, User, UserSession, password},
    error::AppError,
    models::{AdminProfile, AdminProfileFields, DbAdminProfile, DbStudent, NewStudent, Student},
};
use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

// ===== credential store =====

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    name: String,
    email: String,
    password: String,
    role: String,
}

#[instrument(skip_all, fields(email))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    name: &str,
    email: &str,
    plaintext_password: &str,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::DuplicateEmail(format!(
            "Email '{}' is already registered",
            email
        )));
    }

    let hashed_password = password::hash(plaintext_password)?;

    let res = sqlx::query("INSERT INTO users (name, email, password, role) VALUES (?, ?, ?, 'student')")
        .bind(name)
        .bind(email)
        .bind(&hashed_password)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

/// Unknown email and wrong password fail identically so a caller cannot
/// probe which emails are registered.
#[instrument(skip_all, fields(email))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    plaintext_password: &str,
) -> Result<User, AppError> {
    info!("Authenticating user");

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, name, email, password, role FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) if password::verify(plaintext_password, &user.password) => Ok(User {
            id: user.id,
            name: user.name,
            email: user.email,
            role: Role::from_str(&user.role)
                .map_err(|e| AppError::Internal(e.to_string()))?,
        }),
        _ => Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        )),
    }
}

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>("SELECT id, name, email, role FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn find_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<User>, AppError> {
    info!("Getting user by email");
    let row = sqlx::query_as::<_, DbUser>("SELECT id, name, email, role FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(User::from))
}

/// Idempotent: setting a role the user already holds is a no-op success.
#[instrument]
pub async fn set_user_role(
    pool: &Pool<Sqlite>,
    email: &str,
    role: Role,
) -> Result<(), AppError> {
    info!(role = %role, "Setting user role");

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_none() {
        return Err(AppError::NotFound(format!(
            "No registered user with email '{}'",
            email
        )));
    }

    sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role.as_str())
        .bind(email)
        .execute(pool)
        .await?;

    Ok(())
}

// ===== student record store =====

#[instrument(skip(pool, student))]
pub async fn insert_student(
    pool: &Pool<Sqlite>,
    student: &NewStudent,
    photo: Option<&str>,
) -> Result<i64, AppError> {
    info!(email = %student.email, "Creating student record");

    if student.email.trim().is_empty() {
        return Err(AppError::Validation("Student email is required".to_string()));
    }

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE email = ?")
        .bind(&student.email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::DuplicateEmail(format!(
            "Student with email '{}' already exists",
            student.email
        )));
    }

    let res = sqlx::query(
        "INSERT INTO students
         (name, father_name, roll_number, registration_number,
          email, mobile, course, branch, semester, session, photo)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&student.name)
    .bind(&student.father_name)
    .bind(&student.roll_number)
    .bind(&student.registration_number)
    .bind(&student.email)
    .bind(&student.mobile)
    .bind(&student.course)
    .bind(&student.branch)
    .bind(&student.semester)
    .bind(&student.session)
    .bind(photo)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Full replace of the editable fields. The photo column is only touched
/// through [`set_student_photo`].
#[instrument(skip(pool, student))]
pub async fn update_student(
    pool: &Pool<Sqlite>,
    id: i64,
    student: &NewStudent,
) -> Result<(), AppError> {
    info!("Updating student record");

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    if existing.is_none() {
        return Err(AppError::NotFound(format!(
            "Student with id {} not found",
            id
        )));
    }

    if student.email.trim().is_empty() {
        return Err(AppError::Validation("Student email is required".to_string()));
    }

    let conflict: Option<i64> =
        sqlx::query_scalar("SELECT id FROM students WHERE email = ? AND id != ?")
            .bind(&student.email)
            .bind(id)
            .fetch_optional(pool)
            .await?;

    if conflict.is_some() {
        return Err(AppError::DuplicateEmail(format!(
            "Student with email '{}' already exists",
            student.email
        )));
    }

    sqlx::query(
        "UPDATE students SET
         name = ?, father_name = ?, roll_number = ?, registration_number = ?,
         email = ?, mobile = ?, course = ?, branch = ?, semester = ?, session = ?
         WHERE id = ?",
    )
    .bind(&student.name)
    .bind(&student.father_name)
    .bind(&student.roll_number)
    .bind(&student.registration_number)
    .bind(&student.email)
    .bind(&student.mobile)
    .bind(&student.course)
    .bind(&student.branch)
    .bind(&student.semester)
    .bind(&student.session)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument]
pub async fn set_student_photo(
    pool: &Pool<Sqlite>,
    id: i64,
    photo: &str,
) -> Result<(), AppError> {
    info!("Updating student photo reference");

    sqlx::query("UPDATE students SET photo = ? WHERE id = ?")
        .bind(photo)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Idempotent: deleting an id that is already absent succeeds.
#[instrument]
pub async fn delete_student(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting student record");

    sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn get_student(pool: &Pool<Sqlite>, id: i64) -> Result<Student, AppError> {
    info!("Fetching student by ID");

    let row = sqlx::query_as::<_, DbStudent>("SELECT * FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(student) => Ok(Student::from(student)),
        _ => Err(AppError::NotFound(format!(
            "Student with id {} not found",
            id
        ))),
    }
}

#[instrument]
pub async fn get_student_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<Student>, AppError> {
    info!("Fetching student by email");

    let row = sqlx::query_as::<_, DbStudent>("SELECT * FROM students WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Student::from))
}

/// Without a term, every student ordered by name. With one, case-insensitive
/// substring match across name, roll number, registration number, email,
/// branch and course, any-field-matches semantics.
#[instrument]
pub async fn search_students(
    pool: &Pool<Sqlite>,
    term: Option<&str>,
) -> Result<Vec<Student>, AppError> {
    info!("Searching students");

    let rows = match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(term) => {
            let needle = term.to_lowercase();
            sqlx::query_as::<_, DbStudent>(
                "SELECT * FROM students
                 WHERE instr(lower(name), ?1) > 0
                    OR instr(lower(roll_number), ?1) > 0
                    OR instr(lower(registration_number), ?1) > 0
                    OR instr(lower(email), ?1) > 0
                    OR instr(lower(branch), ?1) > 0
                    OR instr(lower(course), ?1) > 0
                 ORDER BY name",
            )
            .bind(needle)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbStudent>("SELECT * FROM students ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows.into_iter().map(Student::from).collect())
}

// ===== admin profile store =====

#[instrument]
pub async fn get_admin_profile(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<AdminProfile>, AppError> {
    info!("Fetching admin profile");

    let row = sqlx::query_as::<_, DbAdminProfile>("SELECT * FROM admins WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(AdminProfile::from))
}

/// Insert-if-absent-else-update, keyed by the owning user's email. An
/// existing photo reference survives an upsert that carries no new file.
#[instrument(skip(pool, fields))]
pub async fn upsert_admin_profile(
    pool: &Pool<Sqlite>,
    email: &str,
    fields: &AdminProfileFields,
    photo: Option<&str>,
) -> Result<(), AppError> {
    info!("Upserting admin profile");

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM admins WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(_) => {
            match photo {
                Some(photo) => {
                    sqlx::query(
                        "UPDATE admins SET name = ?, department = ?, post = ?, photo = ?
                         WHERE email = ?",
                    )
                    .bind(&fields.name)
                    .bind(&fields.department)
                    .bind(&fields.post)
                    .bind(photo)
                    .bind(email)
                    .execute(pool)
                    .await?
                }
                None => {
                    sqlx::query(
                        "UPDATE admins SET name = ?, department = ?, post = ? WHERE email = ?",
                    )
                    .bind(&fields.name)
                    .bind(&fields.department)
                    .bind(&fields.post)
                    .bind(email)
                    .execute(pool)
                    .await?
                }
            };
        }
        None => {
            sqlx::query(
                "INSERT INTO admins (name, department, post, photo, email)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&fields.name)
            .bind(&fields.department)
            .bind(&fields.post)
            .bind(photo)
            .bind(email)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

// ===== session store =====

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

/// Tears the session down unconditionally; a token that no longer exists is
/// not an error.
#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
