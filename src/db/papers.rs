//! Paper database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// Saved paper record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Paper {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    #[serde(rename = "abstract")]
    #[sqlx(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub arxiv_id: String,
    pub pdf_url: String,
    pub paper_url: Option<String>,
    pub github_url: Option<String>,
    pub topics: Option<String>,
    pub published_date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub institution: Option<String>,
    pub date_published: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Create paper request
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaper {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub arxiv_id: String,
    pub pdf_url: String,
    pub paper_url: Option<String>,
    pub github_url: Option<String>,
    pub topics: Option<String>,
    pub published_date: Option<String>,
    pub institution: Option<String>,
    pub date_published: Option<String>,
}

const PAPER_COLUMNS: &str = "id, user_id, title, abstract, authors, arxiv_id, pdf_url, paper_url, \
     github_url, topics, published_date, thumbnail_url, institution, date_published, \
     created_at, updated_at";

/// Paper repository
pub struct PaperRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PaperRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get one of a user's papers
    pub async fn get(&self, id: i64, user_id: i64) -> Result<Option<Paper>> {
        let paper = sqlx::query_as::<_, Paper>(&format!(
            "SELECT {} FROM papers WHERE id = ? AND user_id = ?",
            PAPER_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(paper)
    }

    /// List a user's papers, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Paper>> {
        let papers = sqlx::query_as::<_, Paper>(&format!(
            "SELECT {} FROM papers WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            PAPER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(papers)
    }

    /// Insert a paper. A duplicate `arxiv_id` is a bad request.
    pub async fn create(&self, user_id: i64, data: &CreatePaper) -> Result<Paper> {
        if data.arxiv_id.trim().is_empty() {
            return Err(AppError::BadRequest("arxiv_id must not be empty".to_string()));
        }

        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO papers (user_id, title, abstract, authors, arxiv_id, pdf_url, paper_url,
                                github_url, topics, published_date, institution, date_published,
                                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&data.title)
        .bind(&data.abstract_text)
        .bind(&data.authors)
        .bind(&data.arxiv_id)
        .bind(&data.pdf_url)
        .bind(&data.paper_url)
        .bind(&data.github_url)
        .bind(&data.topics)
        .bind(&data.published_date)
        .bind(&data.institution)
        .bind(&data.date_published)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::BadRequest("Paper already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        self.get(id, user_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Paper {} vanished after insert", id)))
    }

    /// Record the thumbnail produced for a paper
    pub async fn set_thumbnail_url(&self, id: i64, thumbnail_url: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE papers SET thumbnail_url = ?, updated_at = ? WHERE id = ?")
            .bind(thumbnail_url)
            .bind(&now)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
