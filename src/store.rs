// src/store.rs
use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{not_found_as, AppError};
use crate::models::{Answer, Choice, NewQuestion, NewSpace, Question, Space};
use crate::tokens;

/// Most choices and answers shown per question on the feedback page.
pub const RELATED_LIMIT: i64 = 100;

pub struct Feedback {
    pub space: Space,
    pub questions: Vec<Question>,
    pub choices_by_question: HashMap<String, Vec<Choice>>,
    pub answers_by_question: HashMap<String, Vec<Answer>>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn create_space(pool: &SqlitePool, new_space: &NewSpace) -> Result<Space, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let space = sqlx::query_as::<_, Space>(
        r#"
        INSERT INTO spaces (id, title, slug, valid_until, pin, password, created)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, title, slug, valid_until, pin, password, created
        "#,
    )
    .bind(new_id())
    .bind(&new_space.title)
    .bind(tokens::space_slug(&new_space.title))
    .bind(new_space.valid_until)
    .bind(tokens::random_pin())
    .bind(tokens::random_password())
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(space)
}

pub async fn find_space_by_slug(pool: &SqlitePool, slug: &str) -> Result<Space, AppError> {
    sqlx::query_as::<_, Space>("SELECT * FROM spaces WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .map_err(not_found_as("space"))
}

pub async fn find_question(
    pool: &SqlitePool,
    space_id: &str,
    question_id: &str,
) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ? AND space_id = ?")
        .bind(question_id)
        .bind(space_id)
        .fetch_one(pool)
        .await
        .map_err(not_found_as("question"))
}

pub async fn list_questions(pool: &SqlitePool, space_id: &str) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE space_id = ? ORDER BY sort_order")
        .bind(space_id)
        .fetch_all(pool)
        .await
}

/// Up to `limit` choices per question, the highest sort orders, returned in
/// ascending order.
pub async fn choices_by_question(
    pool: &SqlitePool,
    question_ids: &[String],
    limit: i64,
) -> Result<HashMap<String, Vec<Choice>>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, text, sort_order, created FROM (\
         SELECT *, ROW_NUMBER() OVER (PARTITION BY question_id ORDER BY sort_order DESC, rowid DESC) AS row_rank \
         FROM choices WHERE question_id IN (",
    );
    let mut ids = query.separated(", ");
    for id in question_ids {
        ids.push_bind(id.as_str());
    }
    ids.push_unseparated(")) WHERE row_rank <= ");
    query.push_bind(limit);
    query.push(" ORDER BY question_id, sort_order, row_rank DESC");

    let choices = query.build_query_as::<Choice>().fetch_all(pool).await?;
    Ok(group_by_question(choices, |c| &c.question_id))
}

/// Up to `limit` answers per question, newest first.
pub async fn answers_by_question(
    pool: &SqlitePool,
    question_ids: &[String],
    limit: i64,
) -> Result<HashMap<String, Vec<Answer>>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, text, created FROM (\
         SELECT *, ROW_NUMBER() OVER (PARTITION BY question_id ORDER BY created DESC, rowid DESC) AS row_rank \
         FROM answers WHERE question_id IN (",
    );
    let mut ids = query.separated(", ");
    for id in question_ids {
        ids.push_bind(id.as_str());
    }
    ids.push_unseparated(")) WHERE row_rank <= ");
    query.push_bind(limit);
    query.push(" ORDER BY question_id, row_rank");

    let answers = query.build_query_as::<Answer>().fetch_all(pool).await?;
    Ok(group_by_question(answers, |a| &a.question_id))
}

fn group_by_question<T>(rows: Vec<T>, key: impl Fn(&T) -> &String) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row).clone()).or_default().push(row);
    }
    grouped
}

pub async fn load_feedback(pool: &SqlitePool, slug: &str) -> Result<Feedback, AppError> {
    let space = find_space_by_slug(pool, slug).await?;
    let questions = list_questions(pool, &space.id).await?;

    let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
    let choices_by_question = choices_by_question(pool, &question_ids, RELATED_LIMIT).await?;
    let answers_by_question = answers_by_question(pool, &question_ids, RELATED_LIMIT).await?;

    Ok(Feedback {
        space,
        questions,
        choices_by_question,
        answers_by_question,
    })
}

/// Inserts the question and its choices in one transaction. The next sort
/// order is computed by the insert itself, and `(space_id, sort_order)` is
/// unique, so concurrent submissions cannot share a position.
pub async fn add_question(
    pool: &SqlitePool,
    space: &Space,
    new_question: &NewQuestion,
) -> Result<(Question, Vec<Choice>), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (id, space_id, text, type, sort_order, created)
        SELECT ?, ?, ?, ?, COALESCE(MAX(sort_order), 0) + 1, ?
        FROM questions WHERE space_id = ?
        RETURNING id, space_id, text, type, sort_order, created
        "#,
    )
    .bind(new_id())
    .bind(&space.id)
    .bind(&new_question.text)
    .bind(new_question.kind.as_str())
    .bind(Utc::now())
    .bind(&space.id)
    .fetch_one(&mut *tx)
    .await?;

    let mut choices = Vec::with_capacity(new_question.choices.len());
    for (sort_order, text) in &new_question.choices {
        let choice = sqlx::query_as::<_, Choice>(
            r#"
            INSERT INTO choices (id, question_id, text, sort_order, created)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, question_id, text, sort_order, created
            "#,
        )
        .bind(new_id())
        .bind(&question.id)
        .bind(text)
        .bind(sort_order)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        choices.push(choice);
    }

    tx.commit().await?;
    Ok((question, choices))
}

pub async fn add_answers(
    pool: &SqlitePool,
    question: &Question,
    texts: &[String],
) -> Result<Vec<Answer>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut answers = Vec::with_capacity(texts.len());
    for text in texts {
        let answer = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (id, question_id, text, created)
            VALUES (?, ?, ?, ?)
            RETURNING id, question_id, text, created
            "#,
        )
        .bind(new_id())
        .bind(&question.id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        answers.push(answer);
    }

    tx.commit().await?;
    Ok(answers)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::test_pool;
    use crate::models::QuestionType;

    fn new_space(title: &str) -> NewSpace {
        NewSpace {
            title: title.to_string(),
            valid_until: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
        }
    }

    fn choice_question(text: &str, choices: &[&str]) -> NewQuestion {
        NewQuestion {
            text: text.to_string(),
            kind: QuestionType::Choice,
            choices: choices
                .iter()
                .enumerate()
                .map(|(i, c)| (i as i64 + 1, c.to_string()))
                .collect(),
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_and_find_space() {
        let pool = test_pool().await;

        let space = create_space(&pool, &new_space("My Event")).await.unwrap();
        assert!(space.slug.starts_with("my-event-"));
        assert_eq!(space.password.len(), 8);
        assert!((100_000..=999_999).contains(&space.pin));

        let found = find_space_by_slug(&pool, &space.slug).await.unwrap();
        assert_eq!(found.id, space.id);
        assert_eq!(found.valid_until, space.valid_until);
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let pool = test_pool().await;

        let err = find_space_by_slug(&pool, "nope-0000").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("space")));

        let err = load_feedback(&pool, "nope-0000").await.err().unwrap();
        assert!(matches!(err, AppError::NotFound("space")));
    }

    #[tokio::test]
    async fn question_sort_order_increases_per_space() {
        let pool = test_pool().await;
        let first = create_space(&pool, &new_space("First")).await.unwrap();
        let second = create_space(&pool, &new_space("Second")).await.unwrap();

        for expected in 1..=3 {
            let (question, _) = add_question(&pool, &first, &choice_question("Q", &["A"]))
                .await
                .unwrap();
            assert_eq!(question.sort_order, expected);
        }

        let (other, _) = add_question(&pool, &second, &choice_question("Q", &["A"]))
            .await
            .unwrap();
        assert_eq!(other.sort_order, 1);
    }

    #[tokio::test]
    async fn feedback_groups_related_records() {
        let pool = test_pool().await;
        let space = create_space(&pool, &new_space("Retro")).await.unwrap();

        let (choice_q, _) = add_question(&pool, &space, &choice_question("Pick", &["A", "B"]))
            .await
            .unwrap();
        let text_q = NewQuestion {
            text: "Say something".to_string(),
            kind: QuestionType::Textarea,
            choices: Vec::new(),
        };
        let (text_q, text_choices) = add_question(&pool, &space, &text_q).await.unwrap();
        assert!(text_choices.is_empty());

        add_answers(&pool, &text_q, &["first".to_string()]).await.unwrap();
        add_answers(&pool, &text_q, &["second".to_string()]).await.unwrap();

        let feedback = load_feedback(&pool, &space.slug).await.unwrap();
        let ids: Vec<_> = feedback.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec![choice_q.id.as_str(), text_q.id.as_str()]);

        let choices: Vec<_> = feedback.choices_by_question[&choice_q.id]
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(choices, vec!["A", "B"]);
        assert!(!feedback.choices_by_question.contains_key(&text_q.id));

        let answers: Vec<_> = feedback.answers_by_question[&text_q.id]
            .iter()
            .map(|a| a.text.as_str())
            .collect();
        assert_eq!(answers, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn related_records_are_capped_per_question() {
        let pool = test_pool().await;
        let space = create_space(&pool, &new_space("Big")).await.unwrap();

        let many: Vec<String> = (1..=5).map(|i| format!("c{i}")).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        let (big, _) = add_question(&pool, &space, &choice_question("Big", &many))
            .await
            .unwrap();
        let (small, _) = add_question(&pool, &space, &choice_question("Small", &["x"]))
            .await
            .unwrap();

        let ids = vec![big.id.clone(), small.id.clone()];
        let grouped = choices_by_question(&pool, &ids, 3).await.unwrap();

        let orders: Vec<_> = grouped[&big.id].iter().map(|c| c.sort_order).collect();
        assert_eq!(orders, vec![3, 4, 5]);
        assert_eq!(grouped[&small.id].len(), 1);

        assert!(choices_by_question(&pool, &[], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn answers_are_capped_newest_first_per_question() {
        let pool = test_pool().await;
        let space = create_space(&pool, &new_space("Busy")).await.unwrap();

        let textarea = NewQuestion {
            text: "Thoughts".to_string(),
            kind: QuestionType::Textarea,
            choices: Vec::new(),
        };
        let (busy, _) = add_question(&pool, &space, &textarea).await.unwrap();
        let (quiet, _) = add_question(&pool, &space, &textarea).await.unwrap();

        for i in 1..=5 {
            add_answers(&pool, &busy, &[format!("a{i}")]).await.unwrap();
        }
        add_answers(&pool, &quiet, &["only".to_string()]).await.unwrap();

        let ids = vec![busy.id.clone(), quiet.id.clone()];
        let grouped = answers_by_question(&pool, &ids, 3).await.unwrap();

        let texts: Vec<_> = grouped[&busy.id].iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["a5", "a4", "a3"]);

        let quiet_texts: Vec<_> = grouped[&quiet.id].iter().map(|a| a.text.as_str()).collect();
        assert_eq!(quiet_texts, vec!["only"]);

        assert!(answers_by_question(&pool, &[], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_space_cascades() {
        let pool = test_pool().await;
        let space = create_space(&pool, &new_space("Gone")).await.unwrap();
        let (question, _) = add_question(&pool, &space, &choice_question("Q", &["A"]))
            .await
            .unwrap();
        add_answers(&pool, &question, &["A".to_string()]).await.unwrap();

        sqlx::query("DELETE FROM spaces WHERE id = ?")
            .bind(&space.id)
            .execute(&pool)
            .await
            .unwrap();

        for table in ["questions", "choices", "answers"] {
            assert_eq!(count(&pool, table).await, 0, "{table}");
        }
    }
}
