//! Quiz content access. Content is fixed seed data held in memory; it does
//! not persist beyond the process lifetime.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::QuizError;
use crate::domain::{Question, Quiz, QuizStatus};

/// Read access to quiz content.
#[async_trait]
pub trait QuizReader: Send + Sync {
    async fn get_quiz(&self, quiz_id: &str) -> Result<(Quiz, Vec<Question>), QuizError>;
}

/// In-memory repository seeded with sample quizzes.
pub struct InMemoryQuizRepository {
    quizzes: RwLock<HashMap<String, Quiz>>,
    questions: RwLock<HashMap<String, Vec<Question>>>,
}

impl Default for InMemoryQuizRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        let (quizzes, questions) = Self::sample_data();
        Self {
            quizzes: RwLock::new(quizzes),
            questions: RwLock::new(questions),
        }
    }

    fn sample_data() -> (HashMap<String, Quiz>, HashMap<String, Vec<Question>>) {
        let question = |id: &str, quiz_id: &str, word: &str, meaning: &str, options: &[&str], correct: &str| {
            Question {
                id: id.to_owned(),
                quiz_id: quiz_id.to_owned(),
                word: word.to_owned(),
                meaning: meaning.to_owned(),
                options: options.iter().map(|&o| o.to_owned()).collect(),
                correct: correct.to_owned(),
            }
        };

        let samples = [
            (
                Quiz {
                    id: "quiz1".to_owned(),
                    title: "Basic Animals".to_owned(),
                    status: QuizStatus::Active,
                    created_at: Utc::now(),
                },
                vec![
                    question(
                        "q1_1",
                        "quiz1",
                        "Platypus",
                        "A duck-billed, beaver-tailed, otter-footed, egg-laying mammal",
                        &["A marsupial", "A monotreme", "A rodent", "A reptile"],
                        "A monotreme",
                    ),
                    question(
                        "q1_2",
                        "quiz1",
                        "Pangolin",
                        "A scaly anteater that rolls into a ball when threatened",
                        &["A reptile", "A mammal", "An amphibian", "An insect"],
                        "A mammal",
                    ),
                    question(
                        "q1_3",
                        "quiz1",
                        "Axolotl",
                        "A salamander that keeps its larval features for life",
                        &["A fish", "A lizard", "An amphibian", "A crustacean"],
                        "An amphibian",
                    ),
                ],
            ),
            (
                Quiz {
                    id: "quiz2".to_owned(),
                    title: "Curious Words".to_owned(),
                    status: QuizStatus::Active,
                    created_at: Utc::now(),
                },
                vec![
                    question(
                        "q2_1",
                        "quiz2",
                        "Petrichor",
                        "The earthy smell after rain falls on dry ground",
                        &["A mineral", "A scent", "A cloud type", "A storm"],
                        "A scent",
                    ),
                    question(
                        "q2_2",
                        "quiz2",
                        "Susurrus",
                        "A soft whispering or rustling sound",
                        &["A sound", "A snake", "A wind", "A prayer"],
                        "A sound",
                    ),
                ],
            ),
        ];

        let mut quizzes = HashMap::new();
        let mut questions = HashMap::new();
        for (quiz, quiz_questions) in samples {
            questions.insert(quiz.id.clone(), quiz_questions);
            quizzes.insert(quiz.id.clone(), quiz);
        }
        (quizzes, questions)
    }
}

#[async_trait]
impl QuizReader for InMemoryQuizRepository {
    async fn get_quiz(&self, quiz_id: &str) -> Result<(Quiz, Vec<Question>), QuizError> {
        let quizzes = self.quizzes.read().await;
        let quiz = quizzes.get(quiz_id).ok_or(QuizError::QuizNotFound)?.clone();
        let questions = self
            .questions
            .read()
            .await
            .get(quiz_id)
            .cloned()
            .unwrap_or_default();
        Ok((quiz, questions))
    }
}
