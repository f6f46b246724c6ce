use crate::store::QuestionStore;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use prepcast_core::{PrepcastError, PrepcastResult, Question};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    subject TEXT NOT NULL,
    year INTEGER NOT NULL,
    question_text TEXT NOT NULL,
    options TEXT NOT NULL,
    correct_answer TEXT NOT NULL,
    topic TEXT,
    difficulty TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions(subject);
CREATE INDEX IF NOT EXISTS idx_questions_year ON questions(year);
";

const COLUMNS: &str =
    "id, subject, year, question_text, options, correct_answer, topic, difficulty";

const UPSERT: &str = "INSERT OR REPLACE INTO questions
    (id, subject, year, question_text, options, correct_answer, topic, difficulty, created_at)
    VALUES (:id, :subject, :year, :question_text, :options, :correct_answer, :topic,
            :difficulty, :created_at)";

/// Question bank persisted in a SQLite file. Options are stored as a JSON
/// array in a text column.
///
/// Every query runs on the blocking thread pool, so the async runtime's
/// workers never wait on SQLite I/O or the connection lock.
pub struct SqliteQuestionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQuestionStore {
    /// Open (creating if needed) the database at `path`, including parent
    /// directories.
    pub fn open(path: impl AsRef<Path>) -> PrepcastResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "SQLite question store opened");
        Ok(store)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> PrepcastResult<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> PrepcastResult<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `query` against the connection on a blocking thread.
    async fn with_conn<T, F>(&self, query: F) -> PrepcastResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || query(&*conn.lock()))
            .await
            .map_err(|e| PrepcastError::Store(format!("database task failed: {e}")))?
            .map_err(db_err)
    }
}

fn db_err(e: rusqlite::Error) -> PrepcastError {
    PrepcastError::Store(e.to_string())
}

fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    let options: String = row.get(4)?;
    let options: Vec<String> = serde_json::from_str(&options).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Question {
        id: row.get(0)?,
        subject: row.get(1)?,
        year: row.get(2)?,
        question_text: row.get(3)?,
        options,
        correct_answer: row.get(5)?,
        topic: row.get(6)?,
        difficulty: row.get(7)?,
    })
}

#[async_trait]
impl QuestionStore for SqliteQuestionStore {
    async fn store(&self, question: Question) -> PrepcastResult<()> {
        let options = serde_json::to_string(&question.options)?;
        let id = question.id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                UPSERT,
                rusqlite::named_params! {
                    ":id": question.id,
                    ":subject": question.subject,
                    ":year": question.year,
                    ":question_text": question.question_text,
                    ":options": options,
                    ":correct_answer": question.correct_answer,
                    ":topic": question.topic,
                    ":difficulty": question.difficulty,
                    ":created_at": Utc::now().to_rfc3339(),
                },
            )
        })
        .await?;
        debug!(id = %id, "Stored question");
        Ok(())
    }

    async fn get(&self, id: &str) -> PrepcastResult<Option<Question>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM questions WHERE id = :id"),
                rusqlite::named_params! { ":id": id },
                row_to_question,
            )
            .optional()
        })
        .await
    }

    async fn random(&self, subject: Option<&str>) -> PrepcastResult<Option<Question>> {
        let subject = subject.map(str::to_string);
        self.with_conn(move |conn| {
            let row = match subject {
                Some(subject) => conn.query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM questions WHERE subject = :subject \
                         ORDER BY RANDOM() LIMIT 1"
                    ),
                    rusqlite::named_params! { ":subject": subject },
                    row_to_question,
                ),
                None => conn.query_row(
                    &format!("SELECT {COLUMNS} FROM questions ORDER BY RANDOM() LIMIT 1"),
                    [],
                    row_to_question,
                ),
            };
            row.optional()
        })
        .await
    }

    async fn count(&self) -> PrepcastResult<usize> {
        let count: i64 = self
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
            })
            .await?;
        usize::try_from(count).map_err(|e| PrepcastError::Store(e.to_string()))
    }

    async fn subjects(&self) -> PrepcastResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT subject FROM questions ORDER BY subject")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
    }
}
