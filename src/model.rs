use serde::{Deserialize, Serialize};

/// Discriminator selecting which collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Student,
    Teacher,
}

impl Kind {
    /// Fixed persistence key for the collection blob.
    pub fn storage_key(self) -> &'static str {
        match self {
            Kind::Student => "school-students",
            Kind::Teacher => "school-teachers",
        }
    }

    pub fn sheet_name(self) -> &'static str {
        match self {
            Kind::Student => "Students",
            Kind::Teacher => "Teachers",
        }
    }
}

/// Field values of a student prior to id assignment. Optional columns default
/// to the empty string so a partially-filled sheet row still maps cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentDraft {
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub roll_no: String,
    pub admission_no: String,
    pub father_name: String,
    pub dob: String,
    pub aadhar: String,
    pub phone: String,
    pub blood_group: String,
    pub address: String,
    pub apaar_id: String,
    /// Remote URL or an inlined data-URI image.
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeacherDraft {
    pub name: String,
    pub designation: String,
    pub subject: String,
    pub doj: String,
    pub dob: String,
    pub aadhar: String,
    pub phone: String,
    pub blood_group: String,
    pub address: String,
    pub teacher_id: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    #[serde(rename = "principalSignURL")]
    pub principal_sign_url: String,
}

/// A stored student record. `id` is opaque, unique within the collection and
/// never reassigned; the remaining fields serialize flat alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    #[serde(flatten)]
    pub fields: StudentDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    #[serde(flatten)]
    pub fields: TeacherDraft,
}
