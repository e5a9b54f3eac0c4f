use serde::Serialize;

#[derive(Serialize, Clone)]
pub struct Student {
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

#[derive(sqlx::FromRow, Clone)]
pub struct DbStudent {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub roll_number: Option<String>,
    pub registration_number: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub course: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<String>,
    pub session: Option<String>,
    pub photo: Option<String>,
}

impl From<DbStudent> for Student {
    fn from(student: DbStudent) -> Self {
        Self {
            id: student.id.unwrap_or_default(),
            name: student.name.unwrap_or_default(),
            father_name: student.father_name.unwrap_or_default(),
            roll_number: student.roll_number.unwrap_or_default(),
            registration_number: student.registration_number.unwrap_or_default(),
            email: student.email.unwrap_or_default(),
            mobile: student.mobile.unwrap_or_default(),
            course: student.course.unwrap_or_default(),
            branch: student.branch.unwrap_or_default(),
            semester: student.semester.unwrap_or_default(),
            session: student.session.unwrap_or_default(),
            photo: student.photo.filter(|p| !p.is_empty()),
        }
    }
}

/// Editable student fields, as delivered by the HTTP layer or the bulk
/// importer. The photo travels separately since it is a file reference.
#[derive(Default, Clone)]
pub struct NewStudent {
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
}

#[derive(Serialize, Clone)]
pub struct AdminProfile {
    pub id: i64,
    pub name: String,
    pub department: String,
    pub post: String,
    pub photo: Option<String>,
    pub email: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAdminProfile {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub post: Option<String>,
    pub photo: Option<String>,
    pub email: Option<String>,
}

impl From<DbAdminProfile> for AdminProfile {
    fn from(admin: DbAdminProfile) -> Self {
        Self {
            id: admin.id.unwrap_or_default(),
            name: admin.name.unwrap_or_default(),
            department: admin.department.unwrap_or_default(),
            post: admin.post.unwrap_or_default(),
            photo: admin.photo.filter(|p| !p.is_empty()),
            email: admin.email.unwrap_or_default(),
        }
    }
}

/// Editable admin profile fields; the owning email comes from the session.
#[derive(Default, Clone)]
pub struct AdminProfileFields {
    pub name: String,
    pub department: String,
    pub post: String,
}
