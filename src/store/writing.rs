use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::error::{LivroError, Result};

use super::models::{
    Book, BookChanges, BookRow, BookUpdate, Chapter, ChapterChanges, ChapterRow, ChapterStatus,
    ChapterUpdate, NewBook, NewChapter,
};
use super::schema::{books, chapters};
use super::{now_ts, Store};

impl Store {
    /// First book owned by the user; the application keeps at most one.
    pub async fn book_by_user(&self, user_id: i32) -> Result<Option<Book>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<BookRow> = books::table
            .filter(books::user_id.eq(user_id))
            .order(books::id.asc())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(Book::from))
    }

    pub async fn book_by_id(&self, book_id: i32) -> Result<Option<Book>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<BookRow> = books::table
            .filter(books::id.eq(book_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(Book::from))
    }

    pub async fn create_book(
        &self,
        user_id: i32,
        title: &str,
        description: Option<&str>,
        target_chapters: Option<i32>,
    ) -> Result<Book> {
        let now = now_ts();
        let new = NewBook {
            user_id,
            title,
            description,
            target_chapters: target_chapters.unwrap_or(20),
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(books::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = Self::last_insert_id(&mut conn).await?;
        let row: BookRow = books::table
            .filter(books::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(Book::from(row))
    }

    pub async fn update_book(&self, book_id: i32, update: &BookUpdate) -> Result<Book> {
        let mut conn = self.conn().await?;
        if !update.is_empty() {
            let changes = BookChanges {
                title: update.title.as_deref(),
                description: update.description.as_deref(),
                target_chapters: update.target_chapters,
                updated_at: now_ts(),
            };
            diesel::update(books::table.filter(books::id.eq(book_id)))
                .set(changes)
                .execute(&mut conn)
                .await
                .map_err(|e| LivroError::Database(e.to_string()))?;
        }

        let row: Option<BookRow> = books::table
            .filter(books::id.eq(book_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        row.map(Book::from).ok_or(LivroError::NotFound("book"))
    }

    /// Chapters ordered by their caller-assigned number.
    pub async fn chapters_by_book(&self, book_id: i32) -> Result<Vec<Chapter>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<ChapterRow> = chapters::table
            .filter(chapters::book_id.eq(book_id))
            .order((chapters::chapter_number.asc(), chapters::id.asc()))
            .load(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Chapter::from).collect())
    }

    pub async fn chapter_by_id(&self, chapter_id: i32) -> Result<Option<Chapter>> {
        let Some(mut conn) = self.read_conn().await else {
            return Ok(None);
        };
        let row: Option<ChapterRow> = chapters::table
            .filter(chapters::id.eq(chapter_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(row.map(Chapter::from))
    }

    pub async fn create_chapter(
        &self,
        book_id: i32,
        chapter_number: i32,
        title: &str,
    ) -> Result<Chapter> {
        let now = now_ts();
        let new = NewChapter {
            book_id,
            chapter_number,
            title,
            status: ChapterStatus::NotStarted.as_str(),
            progress: 0,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(chapters::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;

        let id = Self::last_insert_id(&mut conn).await?;
        let row: ChapterRow = chapters::table
            .filter(chapters::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| LivroError::Database(e.to_string()))?;
        Ok(Chapter::from(row))
    }

    pub async fn update_chapter(&self, chapter_id: i32, update: &ChapterUpdate) -> Result<Chapter> {
        let mut conn = self.conn().await?;
        if !update.is_empty() {
            let changes = ChapterChanges {
                status: update.status.map(|s| s.as_str()),
                progress: update.progress,
                notes: update.notes.as_deref(),
                next_steps: update.next_steps.as_deref(),
                updated_at: now_ts(),
            };
            diesel::update(chapters::table.filter(chapters::id.eq(chapter_id)))
                .set(changes)
                .execute(&mut conn)
                .await
                .map_err(|e| LivroError::Database(e.to_string()))?;
        }

        let row: Option<ChapterRow> = chapters::table
            .filter(chapters::id.eq(chapter_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| LivroError::Database(e.to_string()))?;
        row.map(Chapter::from).ok_or(LivroError::NotFound("chapter"))
    }
}
