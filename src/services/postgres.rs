use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    EntityKind, EntityRef, EntityState, Language, Match, NewStudent, NewTeacher, Status, StatusUpdate, Student,
    StudentChanges, Teacher, TeacherChanges,
};
use crate::services::store::{NewStatusUpdate, Store};

/// Entity kinds as stored in the `entity_type` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_type", rename_all = "lowercase")]
pub enum EntityType {
    Teacher,
    Student,
}

impl From<EntityKind> for EntityType {
    fn from(value: EntityKind) -> Self {
        match value {
            EntityKind::Teacher => EntityType::Teacher,
            EntityKind::Student => EntityType::Student,
        }
    }
}

impl From<EntityType> for EntityKind {
    fn from(value: EntityType) -> Self {
        match value {
            EntityType::Teacher => EntityKind::Teacher,
            EntityType::Student => EntityKind::Student,
        }
    }
}

const STUDENT_COLUMNS: &str = r#"
    st.student_id, st.native_language_id, st.english_proficiency, st.phone_number,
    st.created_at, s.status_id, s.description
    FROM students st
    JOIN statuses s ON s.status_id = st.status_id
"#;

const TEACHER_COLUMNS: &str = r#"
    t.teacher_id, t.native_language_id, t.second_language_id,
    t.created_at, s.status_id, s.description
    FROM teachers t
    JOIN statuses s ON s.status_id = t.status_id
"#;

const STATUS_UPDATE_COLUMNS: &str = r#"
    status_update_id, entity_type, entity_id, previous_status_id, next_status_id,
    updated_by, reason, created_at
"#;

fn status_from_row(row: &PgRow) -> Result<Status, sqlx::Error> {
    Ok(Status {
        status_id: row.try_get("status_id")?,
        description: row.try_get("description")?,
    })
}

fn student_from_row(row: &PgRow) -> Result<Student, sqlx::Error> {
    Ok(Student {
        student_id: row.try_get("student_id")?,
        native_language_id: row.try_get("native_language_id")?,
        english_proficiency: row.try_get("english_proficiency")?,
        phone_number: row.try_get("phone_number")?,
        status: status_from_row(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn teacher_from_row(row: &PgRow) -> Result<Teacher, sqlx::Error> {
    Ok(Teacher {
        teacher_id: row.try_get("teacher_id")?,
        native_language_id: row.try_get("native_language_id")?,
        second_language_id: row.try_get("second_language_id")?,
        status: status_from_row(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn status_update_from_row(row: &PgRow) -> Result<StatusUpdate, sqlx::Error> {
    let entity_type: EntityType = row.try_get("entity_type")?;
    Ok(StatusUpdate {
        status_update_id: row.try_get("status_update_id")?,
        entity_kind: entity_type.into(),
        entity_id: row.try_get("entity_id")?,
        previous_status_id: row.try_get("previous_status_id")?,
        next_status_id: row.try_get("next_status_id")?,
        updated_by: row.try_get("updated_by")?,
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, sqlx::Error> {
    Ok(Match {
        match_id: row.try_get("match_id")?,
        student_id: row.try_get("student_id")?,
        teacher_id: row.try_get("teacher_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn not_found(entity: EntityRef) -> AppError {
    AppError::NotFound(entity.to_string())
}

/// PostgreSQL store for the program's records
///
/// Migrations in `./migrations` are applied on connect.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, AppError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    async fn fetch_entity(conn: &mut PgConnection, entity: EntityRef) -> Result<EntityState, AppError> {
        match entity {
            EntityRef::Teacher(id) => {
                let query = format!("SELECT {} WHERE t.teacher_id = $1", TEACHER_COLUMNS);
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| not_found(entity))?;
                Ok(EntityState::Teacher(teacher_from_row(&row)?))
            }
            EntityRef::Student(id) => {
                let query = format!("SELECT {} WHERE st.student_id = $1", STUDENT_COLUMNS);
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| not_found(entity))?;
                Ok(EntityState::Student(student_from_row(&row)?))
            }
        }
    }
}

fn stale_previous(entity: EntityRef, current: &Status) -> AppError {
    AppError::Validation(format!(
        "{} is currently {}, the transition was based on an older status",
        entity, current.description
    ))
}

impl Store for PostgresStore {
    async fn list_students(&self, status: Option<&str>) -> Result<Vec<Student>, AppError> {
        let query = format!(
            "SELECT {} WHERE ($1::text IS NULL OR upper(s.description) = upper($1)) ORDER BY st.student_id",
            STUDENT_COLUMNS
        );

        let rows = sqlx::query(&query).bind(status).fetch_all(&self.pool).await?;

        let students = rows
            .iter()
            .map(student_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} students", students.len());
        Ok(students)
    }

    async fn get_student(&self, student_id: i32) -> Result<Student, AppError> {
        let mut conn = self.pool.acquire().await?;
        match Self::fetch_entity(&mut conn, EntityRef::Student(student_id)).await? {
            EntityState::Student(student) => Ok(student),
            EntityState::Teacher(_) => Err(not_found(EntityRef::Student(student_id))),
        }
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, AppError> {
        let query = r#"
            INSERT INTO students (native_language_id, english_proficiency, phone_number, status_id)
            VALUES ($1, $2, $3, $4)
            RETURNING student_id
        "#;

        let student_id: i32 = sqlx::query_scalar(query)
            .bind(student.native_language_id)
            .bind(&student.english_proficiency)
            .bind(&student.phone_number)
            .bind(student.status_id)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("Created student {}", student_id);
        self.get_student(student_id).await
    }

    async fn update_student(&self, student_id: i32, changes: StudentChanges) -> Result<Student, AppError> {
        let query = r#"
            UPDATE students
            SET native_language_id = COALESCE($2, native_language_id),
                english_proficiency = COALESCE($3, english_proficiency),
                phone_number = COALESCE($4, phone_number)
            WHERE student_id = $1
        "#;

        let result = sqlx::query(query)
            .bind(student_id)
            .bind(changes.native_language_id)
            .bind(&changes.english_proficiency)
            .bind(&changes.phone_number)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(EntityRef::Student(student_id)));
        }

        tracing::debug!("Updated student {}", student_id);
        self.get_student(student_id).await
    }

    async fn create_teacher(&self, teacher: NewTeacher) -> Result<Teacher, AppError> {
        let query = r#"
            INSERT INTO teachers (native_language_id, second_language_id, status_id)
            VALUES ($1, $2, $3)
            RETURNING teacher_id
        "#;

        let teacher_id: i32 = sqlx::query_scalar(query)
            .bind(teacher.native_language_id)
            .bind(teacher.second_language_id)
            .bind(teacher.status_id)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("Created teacher {}", teacher_id);
        self.get_teacher(teacher_id).await
    }

    async fn update_teacher(&self, teacher_id: i32, changes: TeacherChanges) -> Result<Teacher, AppError> {
        let query = r#"
            UPDATE teachers
            SET native_language_id = COALESCE($2, native_language_id),
                second_language_id = COALESCE($3, second_language_id)
            WHERE teacher_id = $1
        "#;

        let result = sqlx::query(query)
            .bind(teacher_id)
            .bind(changes.native_language_id)
            .bind(changes.second_language_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(EntityRef::Teacher(teacher_id)));
        }

        tracing::debug!("Updated teacher {}", teacher_id);
        self.get_teacher(teacher_id).await
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError> {
        let query = format!("SELECT {} ORDER BY t.teacher_id", TEACHER_COLUMNS);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let teachers = rows
            .iter()
            .map(teacher_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} teachers", teachers.len());
        Ok(teachers)
    }

    async fn get_teacher(&self, teacher_id: i32) -> Result<Teacher, AppError> {
        let mut conn = self.pool.acquire().await?;
        match Self::fetch_entity(&mut conn, EntityRef::Teacher(teacher_id)).await? {
            EntityState::Teacher(teacher) => Ok(teacher),
            EntityState::Student(_) => Err(not_found(EntityRef::Teacher(teacher_id))),
        }
    }

    async fn list_statuses(&self) -> Result<Vec<Status>, AppError> {
        let rows = sqlx::query("SELECT status_id, description FROM statuses ORDER BY status_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(status_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn status_by_id(&self, status_id: i32) -> Result<Option<Status>, AppError> {
        let row = sqlx::query("SELECT status_id, description FROM statuses WHERE status_id = $1")
            .bind(status_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(status_from_row).transpose()?)
    }

    async fn status_by_name(&self, name: &str) -> Result<Option<Status>, AppError> {
        let row = sqlx::query(
            "SELECT status_id, description FROM statuses WHERE upper(description) = upper($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(status_from_row).transpose()?)
    }

    async fn language_by_name(&self, name: &str) -> Result<Option<Language>, AppError> {
        let row = sqlx::query("SELECT language_id, name FROM languages WHERE upper(name) = upper($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Language {
                language_id: row.try_get("language_id")?,
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn entity_status(&self, entity: EntityRef) -> Result<Status, AppError> {
        let query = match entity {
            EntityRef::Teacher(_) => {
                "SELECT s.status_id, s.description FROM teachers t JOIN statuses s ON s.status_id = t.status_id WHERE t.teacher_id = $1"
            }
            EntityRef::Student(_) => {
                "SELECT s.status_id, s.description FROM students st JOIN statuses s ON s.status_id = st.status_id WHERE st.student_id = $1"
            }
        };

        let row = sqlx::query(query)
            .bind(entity.id())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(entity))?;

        Ok(status_from_row(&row)?)
    }

    async fn apply_transition(
        &self,
        next: &Status,
        update: NewStatusUpdate,
    ) -> Result<(EntityState, StatusUpdate), AppError> {
        let mut tx = self.pool.begin().await?;

        let query = match update.entity {
            EntityRef::Teacher(_) => {
                "UPDATE teachers SET status_id = $1 WHERE teacher_id = $2 AND status_id = $3"
            }
            EntityRef::Student(_) => {
                "UPDATE students SET status_id = $1 WHERE student_id = $2 AND status_id = $3"
            }
        };

        let result = sqlx::query(query)
            .bind(next.status_id)
            .bind(update.entity.id())
            .bind(update.previous_status_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Either the row is gone or another transition got there first
            let current = Self::fetch_entity(&mut *tx, update.entity).await?;
            return Err(stale_previous(update.entity, current.status()));
        }

        let insert = format!(
            r#"
            INSERT INTO status_updates
                (status_update_id, entity_type, entity_id, previous_status_id, next_status_id, updated_by, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            STATUS_UPDATE_COLUMNS
        );

        let row = sqlx::query(&insert)
            .bind(Uuid::new_v4())
            .bind(EntityType::from(update.entity.kind()))
            .bind(update.entity.id())
            .bind(update.previous_status_id)
            .bind(update.next_status_id)
            .bind(&update.updated_by)
            .bind(&update.reason)
            .fetch_one(&mut *tx)
            .await?;
        let record = status_update_from_row(&row)?;

        let entity = Self::fetch_entity(&mut *tx, update.entity).await?;

        tx.commit().await?;

        tracing::debug!(
            "Recorded status update {} for {}",
            record.status_update_id,
            update.entity
        );

        Ok((entity, record))
    }

    async fn status_updates_for(&self, entity: EntityRef) -> Result<Vec<StatusUpdate>, AppError> {
        let query = format!(
            "SELECT {} FROM status_updates WHERE entity_type = $1 AND entity_id = $2 ORDER BY created_at, status_update_id",
            STATUS_UPDATE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(EntityType::from(entity.kind()))
            .bind(entity.id())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(status_update_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn create_match(&self, student_id: i32, teacher_id: i32) -> Result<Match, AppError> {
        let query = r#"
            INSERT INTO matches (student_id, teacher_id)
            VALUES ($1, $2)
            RETURNING match_id, student_id, teacher_id, created_at
        "#;

        let row = sqlx::query(query)
            .bind(student_id)
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(match_from_row(&row)?)
    }

    async fn list_matches(&self) -> Result<Vec<Match>, AppError> {
        let rows = sqlx::query(
            "SELECT match_id, student_id, teacher_id, created_at FROM matches ORDER BY match_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(match_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn remove_matches(&self, entity: EntityRef) -> Result<u64, AppError> {
        let query = match entity {
            EntityRef::Teacher(_) => "DELETE FROM matches WHERE teacher_id = $1",
            EntityRef::Student(_) => "DELETE FROM matches WHERE student_id = $1",
        };

        let result = sqlx::query(query).bind(entity.id()).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
