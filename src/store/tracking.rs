use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::error::{LivroError, Result};

use super::models::{
    AtomicNote, AtomicNoteRow, Milestone, MilestoneRow, MilestoneType, NewAtomicNote, NewMilestone,
    NewRitual, NewSession, NewUserSettings, Ritual, RitualChanges, RitualRow, RitualType,
    RitualUpdate, Session, SessionChanges, SessionMode, SessionRow, SessionUpdate, SettingsChanges,
    SettingsUpdate, UserSettings, UserSettingsRow,
};
use super::schema::{atomic_notes, milestones, rituals, sessions, user_settings};
use super::{now_ts, Store};

pub const DEFAULT_SESSION_LIMIT: usize = 20;

const DEFAULT_MAINTENANCE_REMINDER: &str = "19:00";
const DEFAULT_CONSTRUCTION_REMINDER: &str = "06:45";

impl Store {
    pub async fn create_session(
        &self,
        user_id: i32,
        book_id: i32,
        mode: SessionMode,
        chapter_id: Option<i32>,
    ) -> Result<Session> {
        let now = now_ts();
        let new = NewSession {
            user_id,
            book_id,
            chapter_id,
            mode: mode.as_str(),
            start_time: now,
            notes_count: 0,
            created_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(sessions::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = Self::last_insert_id(&mut conn).await?;
        let row: SessionRow = sessions::table
            .filter(sessions::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(Session::from(row))
    }

    pub async fn update_session(&self, session_id: i32, update: &SessionUpdate) -> Result<Session> {
        let mut conn = self.conn().await?;
        if !update.is_empty() {
            let changes = SessionChanges {
                end_time: update.end_time,
                duration: update.duration,
                notes_count: update.notes_count,
                session_notes: update.session_notes.as_deref(),
            };
            diesel::update(sessions::table.filter(sessions::id.eq(session_id)))
                .set(changes)
                .execute(&mut conn)
                .await
                .map_err(|e| LivroError::Database(e.to_string()))?;
        }

        let row: Option<SessionRow> = sessions::table
            .filter(sessions::id.eq(session_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        row.map(Session::from).ok_or(LivroError::NotFound("session"))
    }

    pub async fn session_by_id(&self, session_id: i32) -> Result<Option<Session>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<SessionRow> = sessions::table
            .filter(sessions::id.eq(session_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(Session::from))
    }

    /// Most recent sessions first.
    pub async fn sessions_by_user(&self, user_id: i32, limit: usize) -> Result<Vec<Session>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<SessionRow> = sessions::table
            .filter(sessions::user_id.eq(user_id))
            .order((sessions::created_at.desc(), sessions::id.desc()))
            .limit(limit.max(1) as i64)
            .load(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    pub async fn create_note(
        &self,
        user_id: i32,
        book_id: i32,
        content: &str,
        chapter_id: Option<i32>,
        session_id: Option<i32>,
        tags: Option<&str>,
    ) -> Result<AtomicNote> {
        let now = now_ts();
        let new = NewAtomicNote {
            user_id,
            book_id,
            session_id,
            chapter_id,
            content,
            tags,
            created_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(atomic_notes::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = Self::last_insert_id(&mut conn).await?;
        let row: AtomicNoteRow = atomic_notes::table
            .filter(atomic_notes::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(AtomicNote::from(row))
    }

    pub async fn notes_by_chapter(&self, chapter_id: i32) -> Result<Vec<AtomicNote>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<AtomicNoteRow> = atomic_notes::table
            .filter(atomic_notes::chapter_id.eq(chapter_id))
            .order((atomic_notes::created_at.desc(), atomic_notes::id.desc()))
            .load(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(AtomicNote::from).collect())
    }

    pub async fn create_ritual(
        &self,
        user_id: i32,
        ritual_type: RitualType,
        date: i64,
    ) -> Result<Ritual> {
        let now = now_ts();
        let new = NewRitual {
            user_id,
            ritual_type: ritual_type.as_str(),
            date,
            completed: 0,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(rituals::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = Self::last_insert_id(&mut conn).await?;
        let row: RitualRow = rituals::table
            .filter(rituals::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(Ritual::from(row))
    }

    pub async fn update_ritual(&self, ritual_id: i32, update: &RitualUpdate) -> Result<Ritual> {
        let mut conn = self.conn().await?;
        if !update.is_empty() {
            let changes = RitualChanges {
                completed: update.completed,
                checklist_items: update.checklist_items.as_deref(),
                notes: update.notes.as_deref(),
                updated_at: now_ts(),
            };
            diesel::update(rituals::table.filter(rituals::id.eq(ritual_id)))
                .set(changes)
                .execute(&mut conn)
                .await
                .map_err(|e| LivroError::Database(e.to_string()))?;
        }

        let row: Option<RitualRow> = rituals::table
            .filter(rituals::id.eq(ritual_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        row.map(Ritual::from).ok_or(LivroError::NotFound("ritual"))
    }

    pub async fn ritual_by_id(&self, ritual_id: i32) -> Result<Option<Ritual>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<RitualRow> = rituals::table
            .filter(rituals::id.eq(ritual_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(Ritual::from))
    }

    pub async fn rituals_by_user(&self, user_id: i32) -> Result<Vec<Ritual>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<RitualRow> = rituals::table
            .filter(rituals::user_id.eq(user_id))
            .order((rituals::date.desc(), rituals::id.desc()))
            .load(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Ritual::from).collect())
    }

    /// Milestones are immutable once written; there is no update path.
    pub async fn create_milestone(
        &self,
        user_id: i32,
        book_id: i32,
        description: &str,
        milestone_type: MilestoneType,
        celebration_notes: Option<&str>,
    ) -> Result<Milestone> {
        let now = now_ts();
        let new = NewMilestone {
            user_id,
            book_id,
            description,
            milestone_type: milestone_type.as_str(),
            date: now,
            celebration_notes,
            created_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(milestones::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = Self::last_insert_id(&mut conn).await?;
        let row: MilestoneRow = milestones::table
            .filter(milestones::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(Milestone::from(row))
    }

    pub async fn milestones_by_book(&self, book_id: i32) -> Result<Vec<Milestone>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<MilestoneRow> = milestones::table
            .filter(milestones::book_id.eq(book_id))
            .order((milestones::date.desc(), milestones::id.desc()))
            .load(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Milestone::from).collect())
    }

    pub async fn settings_by_user(&self, user_id: i32) -> Result<Option<UserSettings>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<UserSettingsRow> = user_settings::table
            .filter(user_settings::user_id.eq(user_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(UserSettings::from))
    }

    /// First write creates the row with the documented defaults merged with
    /// the supplied fields; later writes are partial updates.
    pub async fn upsert_settings(
        &self,
        user_id: i32,
        update: &SettingsUpdate,
    ) -> Result<UserSettings> {
        let now = now_ts();
        let mut conn = self.conn().await?;
        let existing: Option<UserSettingsRow> = user_settings::table
            .filter(user_settings::user_id.eq(user_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = match existing {
            Some(row) => {
                let changes = SettingsChanges {
                    notifications_enabled: update.notifications_enabled,
                    maintenance_reminder_time: update.maintenance_reminder_time.as_deref(),
                    construction_reminder_time: update.construction_reminder_time.as_deref(),
                    email_notifications: update.email_notifications,
                    updated_at: now,
                };
                diesel::update(user_settings::table.filter(user_settings::id.eq(row.id)))
                    .set(changes)
                    .execute(&mut conn)
                    .await
                    .map_err(|e| LivroError::Database(e.to_string()))?;
                row.id
            }
            None => {
                let new = NewUserSettings {
                    user_id,
                    notifications_enabled: update.notifications_enabled.unwrap_or(1),
                    maintenance_reminder_time: update
                        .maintenance_reminder_time
                        .as_deref()
                        .unwrap_or(DEFAULT_MAINTENANCE_REMINDER),
                    construction_reminder_time: update
                        .construction_reminder_time
                        .as_deref()
                        .unwrap_or(DEFAULT_CONSTRUCTION_REMINDER),
                    email_notifications: update.email_notifications.unwrap_or(1),
                    created_at: now,
                    updated_at: now,
                };
                diesel::insert_into(user_settings::table)
                    .values(&new)
                    .execute(&mut conn)
                    .await
                    .map_err(|e| LivroError::Database(e.to_string()))?;
                Self::last_insert_id(&mut conn).await?
            }
        };

        let row: UserSettingsRow = user_settings::table
            .filter(user_settings::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(UserSettings::from(row))
    }
}
