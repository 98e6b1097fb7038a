use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Category, Options, Question, SavedQuiz, Session};
use crate::retention;
use crate::store::{
    self, Store, ALL_KEYS, KEY_CATEGORIES, KEY_CURRENT_SESSION, KEY_QUESTIONS, KEY_SAVED_QUIZZES,
    KEY_SESSIONS,
};

/// Typed CRUD surface over the five persisted collections. Every mutating
/// write goes through the capacity-recovering store path; persistence outcomes
/// are booleans the caller surfaces as non-fatal warnings.
pub struct Repository {
    store: Box<dyn Store>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSummary {
    pub categories_added: usize,
    pub questions_added: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    pub key: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub items: Vec<RecordInfo>,
    pub total_bytes: usize,
}

impl Repository {
    pub fn new(store: Box<dyn Store>) -> Repository {
        Repository { store }
    }

    /// Open-time contract: prune session history, then seed defaults on a
    /// first-ever run. Existing user data is never overwritten.
    pub fn initialize(&mut self) {
        retention::cleanup(self.store.as_mut());

        if self.store.get(KEY_CATEGORIES).is_none() {
            self.write_list(KEY_CATEGORIES, &default_categories());
        }
        if self.store.get(KEY_QUESTIONS).is_none() {
            self.write_list(KEY_QUESTIONS, &default_questions());
            self.recount_categories();
        }
        if self.store.get(KEY_SAVED_QUIZZES).is_none() {
            self.write_list::<SavedQuiz>(KEY_SAVED_QUIZZES, &[]);
        }
    }

    /// Recovery routine: re-add any missing default category/question ids
    /// without altering or removing user-authored records.
    pub fn repair(&mut self) -> RepairSummary {
        let mut summary = RepairSummary::default();

        let mut categories = self.categories();
        for def in default_categories() {
            if !categories.iter().any(|c| c.id == def.id) {
                categories.push(def);
                summary.categories_added += 1;
            }
        }
        if summary.categories_added > 0 {
            self.write_list(KEY_CATEGORIES, &categories);
        }

        let mut questions = self.questions();
        for def in default_questions() {
            if !questions.iter().any(|q| q.id == def.id) {
                questions.push(def);
                summary.questions_added += 1;
            }
        }
        if summary.questions_added > 0 {
            self.write_list(KEY_QUESTIONS, &questions);
        }

        if self.store.get(KEY_SAVED_QUIZZES).is_none() {
            self.write_list::<SavedQuiz>(KEY_SAVED_QUIZZES, &[]);
        }

        self.recount_categories();
        summary
    }

    // Questions

    pub fn questions(&self) -> Vec<Question> {
        self.read_list(KEY_QUESTIONS)
    }

    pub fn questions_by_category(&self, category_id: &str) -> Vec<Question> {
        self.questions()
            .into_iter()
            .filter(|q| q.category_id == category_id)
            .collect()
    }

    pub fn add_question(&mut self, question: Question) -> bool {
        let mut questions = self.questions();
        questions.push(question);
        let persisted = self.write_list(KEY_QUESTIONS, &questions);
        self.recount_categories();
        persisted
    }

    /// `None` when no question with that id exists; no partial write happens.
    pub fn update_question(&mut self, question: Question) -> Option<bool> {
        let mut questions = self.questions();
        let slot = questions.iter_mut().find(|q| q.id == question.id)?;
        *slot = question;
        let persisted = self.write_list(KEY_QUESTIONS, &questions);
        self.recount_categories();
        Some(persisted)
    }

    pub fn delete_question(&mut self, question_id: &str) -> Option<bool> {
        let mut questions = self.questions();
        let before = questions.len();
        questions.retain(|q| q.id != question_id);
        if questions.len() == before {
            return None;
        }
        let persisted = self.write_list(KEY_QUESTIONS, &questions);
        self.recount_categories();
        Some(persisted)
    }

    // Categories

    pub fn categories(&self) -> Vec<Category> {
        self.read_list(KEY_CATEGORIES)
    }

    pub fn category_by_id(&self, id: &str) -> Option<Category> {
        self.categories().into_iter().find(|c| c.id == id)
    }

    /// Rejects a duplicate derived id; uniqueness is enforced at creation.
    pub fn add_category(&mut self, category: Category) -> Result<bool, String> {
        let mut categories = self.categories();
        if categories.iter().any(|c| c.id == category.id) {
            return Err(format!("category '{}' already exists", category.id));
        }
        categories.push(category);
        let persisted = self.write_list(KEY_CATEGORIES, &categories);
        self.recount_categories();
        Ok(persisted)
    }

    pub fn update_category(&mut self, category: Category) -> Option<bool> {
        let mut categories = self.categories();
        let slot = categories.iter_mut().find(|c| c.id == category.id)?;
        *slot = category;
        let persisted = self.write_list(KEY_CATEGORIES, &categories);
        self.recount_categories();
        Some(persisted)
    }

    /// Deletes the category and cascades to every loose question assigned to
    /// it. Other categories' questions are untouched.
    pub fn delete_category(&mut self, category_id: &str) -> Option<bool> {
        let mut categories = self.categories();
        let before = categories.len();
        categories.retain(|c| c.id != category_id);
        if categories.len() == before {
            return None;
        }
        let mut persisted = self.write_list(KEY_CATEGORIES, &categories);

        let mut questions = self.questions();
        questions.retain(|q| q.category_id != category_id);
        persisted &= self.write_list(KEY_QUESTIONS, &questions);

        self.recount_categories();
        Some(persisted)
    }

    /// `questionCount` is derived, never authoritative: recompute every
    /// category's count by scanning the questions. O(categories x questions)
    /// is fine at this data scale.
    fn recount_categories(&mut self) {
        let questions = self.questions();
        let mut categories = self.categories();
        let mut changed = false;
        for category in categories.iter_mut() {
            let count = questions
                .iter()
                .filter(|q| q.category_id == category.id)
                .count();
            if category.question_count != count {
                category.question_count = count;
                changed = true;
            }
        }
        if changed {
            self.write_list(KEY_CATEGORIES, &categories);
        }
    }

    // Saved quizzes

    pub fn saved_quizzes(&self) -> Vec<SavedQuiz> {
        self.read_list(KEY_SAVED_QUIZZES)
    }

    pub fn saved_quiz_by_id(&self, id: &str) -> Option<SavedQuiz> {
        self.saved_quizzes().into_iter().find(|q| q.id == id)
    }

    pub fn add_saved_quiz(&mut self, quiz: SavedQuiz) -> bool {
        let mut quizzes = self.saved_quizzes();
        quizzes.push(quiz);
        self.write_list(KEY_SAVED_QUIZZES, &quizzes)
    }

    pub fn update_saved_quiz(&mut self, quiz: SavedQuiz) -> Option<bool> {
        let mut quizzes = self.saved_quizzes();
        let slot = quizzes.iter_mut().find(|q| q.id == quiz.id)?;
        *slot = quiz;
        Some(self.write_list(KEY_SAVED_QUIZZES, &quizzes))
    }

    pub fn delete_saved_quiz(&mut self, quiz_id: &str) -> Option<bool> {
        let mut quizzes = self.saved_quizzes();
        let before = quizzes.len();
        quizzes.retain(|q| q.id != quiz_id);
        if quizzes.len() == before {
            return None;
        }
        Some(self.write_list(KEY_SAVED_QUIZZES, &quizzes))
    }

    // Sessions

    pub fn sessions(&self) -> Vec<Session> {
        self.read_list(KEY_SESSIONS)
    }

    pub fn session_by_id(&self, id: &str) -> Option<Session> {
        self.sessions().into_iter().find(|s| s.id == id)
    }

    /// Upsert into the archived sessions list.
    pub fn save_session(&mut self, session: &Session) -> bool {
        let mut sessions = self.sessions();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => *slot = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.write_list(KEY_SESSIONS, &sessions)
    }

    pub fn current_session(&self) -> Option<Session> {
        let raw = self.store.get(KEY_CURRENT_SESSION)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                eprintln!("quizd: current session unreadable, treating as absent: {}", e);
                None
            }
        }
    }

    pub fn set_current_session(&mut self, session: &Session) -> bool {
        match serde_json::to_string(session) {
            Ok(json) => store::write_with_fallback(self.store.as_mut(), KEY_CURRENT_SESSION, &json),
            Err(e) => {
                eprintln!("quizd: current session serialize failed: {}", e);
                false
            }
        }
    }

    pub fn clear_current_session(&mut self) {
        self.store.remove(KEY_CURRENT_SESSION);
    }

    /// Move a completed session out of the current slot into the archive,
    /// clear the slot, and apply retention.
    pub fn archive_session(&mut self, session: &Session) -> bool {
        let persisted = self.save_session(session);
        self.clear_current_session();
        retention::cleanup(self.store.as_mut());
        persisted
    }

    // Storage management

    pub fn clear_all(&mut self) {
        for key in ALL_KEYS {
            self.store.remove(key);
        }
    }

    pub fn storage_info(&self) -> StorageInfo {
        let items: Vec<RecordInfo> = ALL_KEYS
            .iter()
            .filter_map(|key| {
                self.store.get(key).map(|value| RecordInfo {
                    key: key.to_string(),
                    bytes: key.len() + value.len(),
                })
            })
            .collect();
        StorageInfo {
            total_bytes: self.store.used_bytes(),
            items,
        }
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.store.get(key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                eprintln!("quizd: record '{}' unreadable, treating as empty: {}", key, e);
                Vec::new()
            }
        }
    }

    fn write_list<T: Serialize>(&mut self, key: &str, list: &[T]) -> bool {
        match serde_json::to_string(list) {
            Ok(json) => store::write_with_fallback(self.store.as_mut(), key, &json),
            Err(e) => {
                eprintln!("quizd: record '{}' serialize failed: {}", key, e);
                false
            }
        }
    }
}

fn category(id: &str, name: &str, description: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        question_count: 0,
    }
}

fn question(id: &str, prompt: &str, opts: [&str; 4], correct: crate::model::OptionKey, category_id: &str) -> Question {
    Question {
        id: id.to_string(),
        prompt: prompt.to_string(),
        options: Options {
            a: opts[0].to_string(),
            b: opts[1].to_string(),
            c: opts[2].to_string(),
            d: opts[3].to_string(),
        },
        correct_answer: correct,
        category_id: category_id.to_string(),
        ..Default::default()
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![
        category(
            "general-knowledge",
            "General Knowledge",
            "Test your general knowledge with these questions",
        ),
        category("science", "Science", "Science and technology questions"),
        category("history", "History", "Historical events and figures"),
        category("sports", "Sports", "Sports and games trivia"),
    ]
}

pub fn default_questions() -> Vec<Question> {
    use crate::model::OptionKey::{B, C};
    vec![
        question(
            "1",
            "What is the capital of France?",
            ["London", "Berlin", "Paris", "Madrid"],
            C,
            "general-knowledge",
        ),
        question(
            "2",
            "Which planet is known as the Red Planet?",
            ["Venus", "Mars", "Jupiter", "Saturn"],
            B,
            "science",
        ),
        question(
            "3",
            "Who painted the Mona Lisa?",
            ["Vincent van Gogh", "Pablo Picasso", "Leonardo da Vinci", "Michelangelo"],
            C,
            "general-knowledge",
        ),
        question(
            "4",
            "In which year did World War II end?",
            ["1944", "1945", "1946", "1947"],
            B,
            "history",
        ),
        question(
            "5",
            "How many players are there in a basketball team on the court?",
            ["4", "5", "6", "7"],
            B,
            "sports",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{now_ms, OptionKey};
    use crate::store::MemoryStore;

    fn repo() -> Repository {
        Repository::new(Box::new(MemoryStore::new()))
    }

    fn user_question(id: &str, category_id: &str) -> Question {
        question(
            id,
            "User question?",
            ["w", "x", "y", "z"],
            OptionKey::A,
            category_id,
        )
    }

    #[test]
    fn first_run_seeds_defaults_with_counts() {
        let mut repo = repo();
        repo.initialize();

        let categories = repo.categories();
        assert_eq!(categories.len(), 4);
        let general = repo.category_by_id("general-knowledge").expect("seeded");
        assert_eq!(general.question_count, 2);

        assert_eq!(repo.questions().len(), 5);
        assert!(repo.saved_quizzes().is_empty());
    }

    #[test]
    fn initialize_preserves_existing_data() {
        let mut repo = repo();
        repo.initialize();
        repo.add_question(user_question("u1", "science"));

        repo.initialize();
        assert_eq!(repo.questions().len(), 6);
        assert_eq!(repo.category_by_id("science").expect("cat").question_count, 2);
    }

    #[test]
    fn repair_adds_missing_defaults_without_touching_user_records() {
        let mut repo = repo();
        // A store holding only user-authored content, as after partial loss.
        let user_cat = category("my-topic", "My Topic", "Mine");
        repo.add_category(user_cat.clone()).expect("unique");
        repo.add_question(user_question("u1", "my-topic"));

        let summary = repo.repair();
        assert_eq!(summary.categories_added, 4);
        assert_eq!(summary.questions_added, 5);

        let mine = repo.category_by_id("my-topic").expect("user category kept");
        assert_eq!(mine.name, "My Topic");
        assert_eq!(mine.question_count, 1);
        assert!(repo.questions().iter().any(|q| q.id == "u1"));
        assert_eq!(repo.categories().len(), 5);
        assert_eq!(repo.questions().len(), 6);

        // Second repair finds nothing missing.
        let again = repo.repair();
        assert_eq!(again.categories_added, 0);
        assert_eq!(again.questions_added, 0);
    }

    #[test]
    fn duplicate_category_id_is_rejected() {
        let mut repo = repo();
        repo.add_category(category("science", "Science", "s")).expect("first");
        let err = repo
            .add_category(category("science", "Science", "dup"))
            .expect_err("duplicate");
        assert!(err.contains("science"));
        assert_eq!(repo.categories().len(), 1);
    }

    #[test]
    fn category_delete_cascades_to_its_questions_only() {
        let mut repo = repo();
        repo.initialize();
        for id in ["s1", "s2", "s3"] {
            repo.add_question(user_question(id, "science"));
        }
        let history_before = repo.questions_by_category("history").len();

        repo.delete_category("science").expect("deleted");

        assert!(repo.category_by_id("science").is_none());
        assert!(repo.questions_by_category("science").is_empty());
        assert!(!repo.questions().iter().any(|q| q.category_id == "science"));
        assert_eq!(repo.questions_by_category("history").len(), history_before);
    }

    #[test]
    fn question_update_recounts_categories() {
        let mut repo = repo();
        repo.initialize();
        let mut q = repo.questions_by_category("science").remove(0);
        q.category_id = "history".to_string();
        repo.update_question(q).expect("found");

        assert_eq!(repo.category_by_id("science").expect("cat").question_count, 0);
        assert_eq!(repo.category_by_id("history").expect("cat").question_count, 2);
    }

    #[test]
    fn missing_entities_update_as_none() {
        let mut repo = repo();
        repo.initialize();
        assert!(repo.update_question(user_question("ghost", "science")).is_none());
        assert!(repo.delete_question("ghost").is_none());
        assert!(repo.delete_saved_quiz("ghost").is_none());
        assert!(repo.delete_category("ghost").is_none());
    }

    #[test]
    fn saved_quiz_round_trip() {
        let mut repo = repo();
        repo.initialize();
        let quiz = SavedQuiz {
            id: "z1".to_string(),
            title: "My Quiz".to_string(),
            description: Some("desc".to_string()),
            questions: vec![user_question("u1", "science")],
            created_at: now_ms(),
        };
        assert!(repo.add_saved_quiz(quiz.clone()));
        assert_eq!(repo.saved_quiz_by_id("z1"), Some(quiz));
    }

    #[test]
    fn corrupted_record_reads_as_empty_not_fatal() {
        let mut store = MemoryStore::new();
        store.set(KEY_QUESTIONS, "{definitely not a list").expect("seed");
        let repo = Repository::new(Box::new(store));
        assert!(repo.questions().is_empty());
    }

    #[test]
    fn archive_clears_slot_and_applies_retention() {
        let mut repo = repo();
        repo.initialize();
        for i in 0..12 {
            let s = Session {
                id: format!("old{}", i),
                source_quiz_id: "quiz1".to_string(),
                start_time: now_ms() - 1000 - i as i64,
                is_completed: true,
                ..Default::default()
            };
            repo.save_session(&s);
        }

        let mut current = Session {
            id: "cur".to_string(),
            source_quiz_id: "quiz1".to_string(),
            start_time: now_ms(),
            is_completed: true,
            end_time: Some(now_ms()),
            ..Default::default()
        };
        current.answers.insert("q1".to_string(), OptionKey::A);
        repo.set_current_session(&current);
        assert!(repo.archive_session(&current));

        assert!(repo.current_session().is_none());
        let sessions = repo.sessions();
        assert_eq!(sessions.len(), retention::MAX_SESSIONS);
        assert!(sessions.iter().any(|s| s.id == "cur"));
    }

    #[test]
    fn clear_all_removes_every_record() {
        let mut repo = repo();
        repo.initialize();
        repo.clear_all();
        assert!(repo.categories().is_empty());
        assert!(repo.questions().is_empty());
        assert!(repo.saved_quizzes().is_empty());
        assert!(repo.sessions().is_empty());
        assert!(repo.current_session().is_none());
        assert_eq!(repo.storage_info().total_bytes, 0);
    }
}
