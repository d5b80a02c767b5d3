use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::{
    atomic_notes, books, chapters, milestones, rituals, sessions, user_settings, users,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    NotStarted,
    Writing,
    Reviewing,
    Completed,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::NotStarted => "not_started",
            ChapterStatus::Writing => "writing",
            ChapterStatus::Reviewing => "reviewing",
            ChapterStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(ChapterStatus::NotStarted),
            "writing" => Some(ChapterStatus::Writing),
            "reviewing" => Some(ChapterStatus::Reviewing),
            "completed" => Some(ChapterStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Maintenance,
    Construction,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Maintenance => "maintenance",
            SessionMode::Construction => "construction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "maintenance" => Some(SessionMode::Maintenance),
            "construction" => Some(SessionMode::Construction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RitualType {
    EntryMaintenance,
    ExitMaintenance,
    EntryConstruction,
    ExitConstruction,
}

impl RitualType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RitualType::EntryMaintenance => "entry_maintenance",
            RitualType::ExitMaintenance => "exit_maintenance",
            RitualType::EntryConstruction => "entry_construction",
            RitualType::ExitConstruction => "exit_construction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "entry_maintenance" => Some(RitualType::EntryMaintenance),
            "exit_maintenance" => Some(RitualType::ExitMaintenance),
            "entry_construction" => Some(RitualType::EntryConstruction),
            "exit_construction" => Some(RitualType::ExitConstruction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneType {
    ChapterCompleted,
    MilestoneWords,
    ConsistencyStreak,
    Custom,
}

impl MilestoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneType::ChapterCompleted => "chapter_completed",
            MilestoneType::MilestoneWords => "milestone_words",
            MilestoneType::ConsistencyStreak => "consistency_streak",
            MilestoneType::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chapter_completed" => Some(MilestoneType::ChapterCompleted),
            "milestone_words" => Some(MilestoneType::MilestoneWords),
            "consistency_streak" => Some(MilestoneType::ConsistencyStreak),
            "custom" => Some(MilestoneType::Custom),
            _ => None,
        }
    }
}

// Domain types returned to callers. Wire names stay camelCase to match the
// client the service fronts.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Role,
    pub last_signed_in: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub target_chapters: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: i32,
    pub book_id: i32,
    pub chapter_number: i32,
    pub title: String,
    pub status: ChapterStatus,
    pub progress: i32,
    pub notes: Option<String>,
    pub next_steps: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub mode: SessionMode,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub duration: Option<i64>,
    pub notes_count: i32,
    pub session_notes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicNote {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub session_id: Option<i32>,
    pub chapter_id: Option<i32>,
    pub content: String,
    pub tags: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ritual {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub ritual_type: RitualType,
    pub date: i64,
    pub completed: i32,
    pub checklist_items: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub description: String,
    #[serde(rename = "type")]
    pub milestone_type: MilestoneType,
    pub date: i64,
    pub celebration_notes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub id: i32,
    pub user_id: i32,
    pub notifications_enabled: i32,
    pub maintenance_reminder_time: String,
    pub construction_reminder_time: String,
    pub email_notifications: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

// Queryable rows, field order matching the table definitions.

#[derive(Queryable)]
pub(super) struct UserRow {
    pub id: i32,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: String,
    pub last_signed_in: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            open_id: row.open_id,
            name: row.name,
            email: row.email,
            login_method: row.login_method,
            role: Role::parse(&row.role),
            last_signed_in: row.last_signed_in,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct BookRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub target_chapters: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            target_chapters: row.target_chapters,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct ChapterRow {
    pub id: i32,
    pub book_id: i32,
    pub chapter_number: i32,
    pub title: String,
    pub status: String,
    pub progress: i32,
    pub notes: Option<String>,
    pub next_steps: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ChapterRow> for Chapter {
    fn from(row: ChapterRow) -> Self {
        Chapter {
            id: row.id,
            book_id: row.book_id,
            chapter_number: row.chapter_number,
            title: row.title,
            status: ChapterStatus::parse(&row.status).unwrap_or(ChapterStatus::NotStarted),
            progress: row.progress,
            notes: row.notes,
            next_steps: row.next_steps,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct SessionRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub mode: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub duration: Option<i64>,
    pub notes_count: i32,
    pub session_notes: Option<String>,
    pub created_at: i64,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            chapter_id: row.chapter_id,
            mode: SessionMode::parse(&row.mode).unwrap_or(SessionMode::Maintenance),
            start_time: row.start_time,
            end_time: row.end_time,
            duration: row.duration,
            notes_count: row.notes_count,
            session_notes: row.session_notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct AtomicNoteRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub session_id: Option<i32>,
    pub chapter_id: Option<i32>,
    pub content: String,
    pub tags: Option<String>,
    pub created_at: i64,
}

impl From<AtomicNoteRow> for AtomicNote {
    fn from(row: AtomicNoteRow) -> Self {
        AtomicNote {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            session_id: row.session_id,
            chapter_id: row.chapter_id,
            content: row.content,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct RitualRow {
    pub id: i32,
    pub user_id: i32,
    pub ritual_type: String,
    pub date: i64,
    pub completed: i32,
    pub checklist_items: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<RitualRow> for Ritual {
    fn from(row: RitualRow) -> Self {
        Ritual {
            id: row.id,
            user_id: row.user_id,
            ritual_type: RitualType::parse(&row.ritual_type)
                .unwrap_or(RitualType::EntryMaintenance),
            date: row.date,
            completed: row.completed,
            checklist_items: row.checklist_items,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct MilestoneRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub description: String,
    pub milestone_type: String,
    pub date: i64,
    pub celebration_notes: Option<String>,
    pub created_at: i64,
}

impl From<MilestoneRow> for Milestone {
    fn from(row: MilestoneRow) -> Self {
        Milestone {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            description: row.description,
            milestone_type: MilestoneType::parse(&row.milestone_type)
                .unwrap_or(MilestoneType::Custom),
            date: row.date,
            celebration_notes: row.celebration_notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Queryable)]
pub(super) struct UserSettingsRow {
    pub id: i32,
    pub user_id: i32,
    pub notifications_enabled: i32,
    pub maintenance_reminder_time: String,
    pub construction_reminder_time: String,
    pub email_notifications: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<UserSettingsRow> for UserSettings {
    fn from(row: UserSettingsRow) -> Self {
        UserSettings {
            id: row.id,
            user_id: row.user_id,
            notifications_enabled: row.notifications_enabled,
            maintenance_reminder_time: row.maintenance_reminder_time,
            construction_reminder_time: row.construction_reminder_time,
            email_notifications: row.email_notifications,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Insertable rows.

#[derive(Insertable)]
#[diesel(table_name = users)]
pub(super) struct NewUser<'a> {
    pub open_id: &'a str,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub login_method: Option<&'a str>,
    pub role: &'a str,
    pub last_signed_in: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = books)]
pub(super) struct NewBook<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub target_chapters: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = chapters)]
pub(super) struct NewChapter<'a> {
    pub book_id: i32,
    pub chapter_number: i32,
    pub title: &'a str,
    pub status: &'a str,
    pub progress: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub(super) struct NewSession<'a> {
    pub user_id: i32,
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub mode: &'a str,
    pub start_time: i64,
    pub notes_count: i32,
    pub created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = atomic_notes)]
pub(super) struct NewAtomicNote<'a> {
    pub user_id: i32,
    pub book_id: i32,
    pub session_id: Option<i32>,
    pub chapter_id: Option<i32>,
    pub content: &'a str,
    pub tags: Option<&'a str>,
    pub created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = rituals)]
pub(super) struct NewRitual<'a> {
    pub user_id: i32,
    pub ritual_type: &'a str,
    pub date: i64,
    pub completed: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = milestones)]
pub(super) struct NewMilestone<'a> {
    pub user_id: i32,
    pub book_id: i32,
    pub description: &'a str,
    pub milestone_type: &'a str,
    pub date: i64,
    pub celebration_notes: Option<&'a str>,
    pub created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = user_settings)]
pub(super) struct NewUserSettings<'a> {
    pub user_id: i32,
    pub notifications_enabled: i32,
    pub maintenance_reminder_time: &'a str,
    pub construction_reminder_time: &'a str,
    pub email_notifications: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

// Partial updates. A `None` field leaves the column untouched; `updated_at`
// is always refreshed where the table carries it.

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpsert {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_chapters: Option<i32>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.target_chapters.is_none()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterUpdate {
    pub status: Option<ChapterStatus>,
    pub progress: Option<i32>,
    pub notes: Option<String>,
    pub next_steps: Option<String>,
}

impl ChapterUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.notes.is_none()
            && self.next_steps.is_none()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionUpdate {
    pub end_time: Option<i64>,
    pub duration: Option<i64>,
    pub notes_count: Option<i32>,
    pub session_notes: Option<String>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.end_time.is_none()
            && self.duration.is_none()
            && self.notes_count.is_none()
            && self.session_notes.is_none()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RitualUpdate {
    pub completed: Option<i32>,
    pub checklist_items: Option<String>,
    pub notes: Option<String>,
}

impl RitualUpdate {
    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.checklist_items.is_none() && self.notes.is_none()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub notifications_enabled: Option<i32>,
    pub maintenance_reminder_time: Option<String>,
    pub construction_reminder_time: Option<String>,
    pub email_notifications: Option<i32>,
}

#[derive(AsChangeset)]
#[diesel(table_name = books)]
pub(super) struct BookChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub target_chapters: Option<i32>,
    pub updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = chapters)]
pub(super) struct ChapterChanges<'a> {
    pub status: Option<&'a str>,
    pub progress: Option<i32>,
    pub notes: Option<&'a str>,
    pub next_steps: Option<&'a str>,
    pub updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = sessions)]
pub(super) struct SessionChanges<'a> {
    pub end_time: Option<i64>,
    pub duration: Option<i64>,
    pub notes_count: Option<i32>,
    pub session_notes: Option<&'a str>,
}

#[derive(AsChangeset)]
#[diesel(table_name = rituals)]
pub(super) struct RitualChanges<'a> {
    pub completed: Option<i32>,
    pub checklist_items: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = user_settings)]
pub(super) struct SettingsChanges<'a> {
    pub notifications_enabled: Option<i32>,
    pub maintenance_reminder_time: Option<&'a str>,
    pub construction_reminder_time: Option<&'a str>,
    pub email_notifications: Option<i32>,
    pub updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
pub(super) struct UserChanges<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub login_method: Option<&'a str>,
    pub role: Option<&'a str>,
    pub last_signed_in: i64,
    pub updated_at: i64,
}
