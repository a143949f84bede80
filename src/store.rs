use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

use crate::db;
use crate::model::{Kind, Student, StudentDraft, Teacher, TeacherDraft};

/// Authoritative in-memory collections, write-through to the workspace
/// database. Every mutation re-serializes the full owning collection as its
/// last step; there is no dirty tracking or batching.
///
/// Persistence write failures do not roll back the in-memory change (the
/// session state stays authoritative). The failure is parked in
/// `persist_warning` for the IPC layer to attach to the response.
pub struct RecordStore {
    conn: Connection,
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    persist_warning: Option<String>,
}

impl RecordStore {
    /// Opens the workspace database and loads both collections. A collection
    /// that is absent or unreadable starts empty; opening never fails for
    /// data reasons, only for filesystem/database ones.
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        let students =
            db::kv_load::<Vec<Student>>(&conn, Kind::Student.storage_key()).unwrap_or_default();
        let teachers =
            db::kv_load::<Vec<Teacher>>(&conn, Kind::Teacher.storage_key()).unwrap_or_default();
        Ok(RecordStore {
            conn,
            students,
            teachers,
            persist_warning: None,
        })
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.students.len(), self.teachers.len())
    }

    /// Takes the warning left by the most recent failed persistence write,
    /// if any. Reading clears it.
    pub fn take_persist_warning(&mut self) -> Option<String> {
        self.persist_warning.take()
    }

    pub fn add_student(&mut self, draft: StudentDraft) -> Student {
        let record = Student {
            id: fresh_id(),
            fields: draft,
        };
        self.students.push(record.clone());
        self.persist(Kind::Student);
        record
    }

    /// Appends all drafts in input order under distinct fresh ids, then
    /// persists once for the whole batch.
    pub fn add_students(&mut self, drafts: Vec<StudentDraft>) -> Vec<Student> {
        let records: Vec<Student> = drafts
            .into_iter()
            .map(|draft| Student {
                id: fresh_id(),
                fields: draft,
            })
            .collect();
        self.students.extend(records.iter().cloned());
        self.persist(Kind::Student);
        records
    }

    /// Replaces every field except `id`, keeping the record's position.
    /// An unknown id is a no-op; returns whether a record was found.
    pub fn update_student(&mut self, id: &str, draft: StudentDraft) -> bool {
        let Some(record) = self.students.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        record.fields = draft;
        self.persist(Kind::Student);
        true
    }

    /// Removes the record if present; an unknown id is a no-op.
    pub fn delete_student(&mut self, id: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        if self.students.len() == before {
            return false;
        }
        self.persist(Kind::Student);
        true
    }

    pub fn add_teacher(&mut self, draft: TeacherDraft) -> Teacher {
        let record = Teacher {
            id: fresh_id(),
            fields: draft,
        };
        self.teachers.push(record.clone());
        self.persist(Kind::Teacher);
        record
    }

    pub fn add_teachers(&mut self, drafts: Vec<TeacherDraft>) -> Vec<Teacher> {
        let records: Vec<Teacher> = drafts
            .into_iter()
            .map(|draft| Teacher {
                id: fresh_id(),
                fields: draft,
            })
            .collect();
        self.teachers.extend(records.iter().cloned());
        self.persist(Kind::Teacher);
        records
    }

    pub fn update_teacher(&mut self, id: &str, draft: TeacherDraft) -> bool {
        let Some(record) = self.teachers.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        record.fields = draft;
        self.persist(Kind::Teacher);
        true
    }

    pub fn delete_teacher(&mut self, id: &str) -> bool {
        let before = self.teachers.len();
        self.teachers.retain(|t| t.id != id);
        if self.teachers.len() == before {
            return false;
        }
        self.persist(Kind::Teacher);
        true
    }

    fn persist(&mut self, kind: Kind) {
        let res = match kind {
            Kind::Student => db::kv_save(&self.conn, kind.storage_key(), &self.students),
            Kind::Teacher => db::kv_save(&self.conn, kind.storage_key(), &self.teachers),
        };
        if let Err(e) = res {
            self.persist_warning = Some(format!(
                "failed to persist {} collection: {}",
                kind.storage_key(),
                e
            ));
        }
    }
}

/// Record ids come from a random UUID rather than wall-clock time so that
/// bulk inserts of any size cannot collide within a batch or with records
/// created in the same millisecond.
fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}
