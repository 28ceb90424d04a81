//! Static content catalog: subjects, chapters, content items, the seed
//! roster, and the badge table. Read-only collaborator of the progress
//! tracker; owns no mutable state.

use crate::models::{Level, QuestionKind, QuizQuestion, StudentRecord};

/// Content items are tagged per type; each variant carries only the fields
/// that apply to it.
#[derive(Debug, Clone)]
pub enum ContentKind {
    Lecture { url: String },
    Pdf { url: String },
    Quiz { questions: Vec<QuizQuestion> },
    Game { description: String },
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Lecture { .. } => "lecture",
            ContentKind::Pdf { .. } => "pdf",
            ContentKind::Quiz { .. } => "quiz",
            ContentKind::Game { .. } => "game",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub kind: ContentKind,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub content: Vec<ContentItem>,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone)]
pub struct BadgeInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub const BADGES: &[BadgeInfo] = &[
    BadgeInfo {
        key: "math-whiz",
        name: "Math Whiz",
        icon: "🧠",
        description: "Mastered 3 Math quizzes.",
    },
    BadgeInfo {
        key: "science-starter",
        name: "Science Starter",
        icon: "🔬",
        description: "Completed first Science chapter.",
    },
    BadgeInfo {
        key: "top-learner",
        name: "Top Learner",
        icon: "🏆",
        description: "Reached the top of the leaderboard.",
    },
    BadgeInfo {
        key: "ai-explorer",
        name: "AI Explorer",
        icon: "🤖",
        description: "Used the AI Tutor 5 times.",
    },
];

/// Flat view of one uncompleted content item, fed to the tutor
/// recommendation prompt.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub subject_id: String,
    pub chapter_id: String,
    pub content_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub subjects: Vec<Subject>,
}

impl Catalog {
    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == subject_id)
    }

    /// Content items across all chapters of a subject. Returns 0 for an
    /// unknown subject; callers floor at 1 before dividing.
    pub fn total_content_count(&self, subject_id: &str) -> usize {
        self.subject(subject_id)
            .map(|s| s.chapters.iter().map(|c| c.content.len()).sum())
            .unwrap_or(0)
    }

    pub fn find_content(&self, subject_id: &str, content_id: &str) -> Option<&ContentItem> {
        self.subject(subject_id)?
            .chapters
            .iter()
            .flat_map(|c| c.content.iter())
            .find(|item| item.id == content_id)
    }

    /// Everything the student has not yet completed, flattened.
    pub fn uncompleted_entries(&self, record: &StudentRecord) -> Vec<CatalogEntry> {
        let completed: Vec<&String> = record
            .progress
            .values()
            .flat_map(|p| p.completed_content.iter())
            .collect();
        let completed = &completed;

        self.subjects
            .iter()
            .flat_map(|subject| {
                subject.chapters.iter().flat_map(move |chapter| {
                    chapter
                        .content
                        .iter()
                        .filter(move |item| !completed.contains(&&item.id))
                        .map(move |item| CatalogEntry {
                            subject_id: subject.id.clone(),
                            chapter_id: chapter.id.clone(),
                            content_id: item.id.clone(),
                            title: item.title.clone(),
                            kind: item.kind.label(),
                        })
                })
            })
            .collect()
    }
}

fn lecture(id: &str, title: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        kind: ContentKind::Lecture { url: "#".to_string() },
    }
}

fn pdf(id: &str, title: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        kind: ContentKind::Pdf { url: "#".to_string() },
    }
}

fn quiz(id: &str, title: &str, questions: Vec<QuizQuestion>) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        kind: ContentKind::Quiz { questions },
    }
}

fn game(id: &str, title: &str, description: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        kind: ContentKind::Game {
            description: description.to_string(),
        },
    }
}

fn chapter(id: &str, title: &str, content: Vec<ContentItem>) -> Chapter {
    Chapter {
        id: id.to_string(),
        title: title.to_string(),
        content,
    }
}

fn mcq(id: &str, question: &str, options: &[&str], answer: &str, explanation: &str) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        answer: answer.to_string(),
        kind: QuestionKind::Mcq,
        explanation: explanation.to_string(),
    }
}

fn fill_in(id: &str, question: &str, answer: &str, explanation: &str) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        question: question.to_string(),
        options: Vec::new(),
        answer: answer.to_string(),
        kind: QuestionKind::FillInTheBlanks,
        explanation: explanation.to_string(),
    }
}

/// The standard VidyaHub catalog.
pub fn standard_catalog() -> Catalog {
    Catalog {
        subjects: vec![
            Subject {
                id: "math".to_string(),
                name: "Mathematics".to_string(),
                chapters: vec![
                    chapter(
                        "m1",
                        "Number Systems",
                        vec![
                            lecture("m1l1", "Introduction to Real Numbers"),
                            pdf("m1p1", "Chapter 1 Study Pack"),
                            quiz(
                                "m1q1",
                                "Number Systems Quiz",
                                vec![
                                    mcq(
                                        "mq1",
                                        "What is the value of Pi (approx)?",
                                        &["3.14", "2.14", "4.14", "3.00"],
                                        "3.14",
                                        "Pi is the ratio of a circle's circumference to its diameter, approximately 3.14159.",
                                    ),
                                    fill_in(
                                        "mq2",
                                        "2 + 2 = ?",
                                        "4",
                                        "Adding two to two results in four.",
                                    ),
                                ],
                            ),
                            game("m1g1", "Number Collector", "Collect the falling multiples of 3!"),
                        ],
                    ),
                    chapter(
                        "m2",
                        "Polynomials",
                        vec![
                            lecture("m2l1", "Understanding Polynomials"),
                            pdf("m2p1", "Polynomials Study Guide"),
                            game("m2g1", "Polynomial Puzzle", "Match polynomial expressions to their simplified forms."),
                        ],
                    ),
                    chapter(
                        "m3",
                        "Coordinate Geometry",
                        vec![
                            lecture("m3l1", "Introduction to the Cartesian Plane"),
                            quiz(
                                "m3q1",
                                "Geometry Quiz",
                                vec![mcq(
                                    "mq3",
                                    "What are the coordinates of the origin?",
                                    &["(1,1)", "(0,0)", "(1,0)", "(0,1)"],
                                    "(0,0)",
                                    "The origin is where the x-axis and y-axis intersect, at (0,0).",
                                )],
                            ),
                        ],
                    ),
                    chapter("m4", "Introduction to Trigonometry", vec![]),
                    chapter("m5", "Statistics", vec![]),
                ],
            },
            Subject {
                id: "science".to_string(),
                name: "Science".to_string(),
                chapters: vec![
                    chapter(
                        "s1",
                        "Laws of Motion",
                        vec![
                            lecture("s1l1", "Newton's First Law"),
                            pdf("s1p1", "Motion Study Guide"),
                            quiz(
                                "s1q1",
                                "Motion Quiz",
                                vec![mcq(
                                    "sq1",
                                    "Force = Mass x ?",
                                    &["Acceleration", "Velocity", "Speed", "Time"],
                                    "Acceleration",
                                    "Newton's Second Law states that Force equals Mass times Acceleration (F=ma).",
                                )],
                            ),
                        ],
                    ),
                    chapter(
                        "s2",
                        "Chemical Reactions",
                        vec![
                            lecture("s2l1", "Types of Chemical Reactions"),
                            pdf("s2p1", "Reactions Study Pack"),
                        ],
                    ),
                    chapter(
                        "s3",
                        "Life Processes",
                        vec![
                            lecture("s3l1", "Nutrition in Living Organisms"),
                            game("s3g1", "Cellular Voyage", "Explore the human cell."),
                        ],
                    ),
                    chapter("s4", "Light - Reflection and Refraction", vec![]),
                    chapter("s5", "Electricity", vec![]),
                ],
            },
            Subject {
                id: "social".to_string(),
                name: "Social Studies".to_string(),
                chapters: vec![
                    chapter(
                        "ss1",
                        "The Rise of Nationalism in Europe",
                        vec![
                            lecture("ss1l1", "The French Revolution and the Idea of the Nation"),
                            pdf("ss1p1", "Nationalism Study Pack"),
                        ],
                    ),
                    chapter(
                        "ss2",
                        "Resources and Development",
                        vec![
                            lecture("ss2l1", "Types of Resources"),
                            quiz(
                                "ss2q1",
                                "Geography Quiz",
                                vec![mcq(
                                    "ssq1",
                                    "Which of these is a renewable resource?",
                                    &["Coal", "Petroleum", "Solar Energy", "Natural Gas"],
                                    "Solar Energy",
                                    "Solar energy is renewable; coal, petroleum, and natural gas are fossil fuels.",
                                )],
                            ),
                        ],
                    ),
                    chapter("ss3", "Power Sharing", vec![]),
                    chapter("ss4", "Agriculture", vec![]),
                ],
            },
            Subject {
                id: "english".to_string(),
                name: "English".to_string(),
                chapters: vec![
                    chapter(
                        "e1",
                        "Prose - A Letter to God",
                        vec![
                            lecture("e1l1", "Story Summary & Analysis"),
                            pdf("e1p1", "Full Text and Questions"),
                            game("e1g1", "Word Scramble", "Unscramble the vocabulary word!"),
                        ],
                    ),
                    chapter(
                        "e2",
                        "Grammar - Tenses",
                        vec![
                            lecture("e2l1", "Understanding Past, Present, and Future"),
                            quiz(
                                "e2q1",
                                "Tense Identification Quiz",
                                vec![mcq(
                                    "eq1",
                                    "Identify the tense: \"He is playing football.\"",
                                    &["Present Perfect", "Past Continuous", "Present Continuous", "Future Simple"],
                                    "Present Continuous",
                                    "\"Is playing\" is the structure for the Present Continuous tense.",
                                )],
                            ),
                            game("e2g1", "Tense Troubles", "Fix the broken sentences."),
                        ],
                    ),
                    chapter("e3", "Poetry - Dust of Snow", vec![]),
                ],
            },
            Subject {
                id: "physics".to_string(),
                name: "Physics".to_string(),
                chapters: vec![
                    chapter("p1", "Units and Measurement", vec![]),
                    chapter(
                        "p2",
                        "Work, Energy and Power",
                        vec![
                            lecture("p2l1", "Work-Energy Theorem"),
                            pdf("p2p1", "Chapter Notes"),
                        ],
                    ),
                    chapter("p3", "Gravitation", vec![]),
                ],
            },
            Subject {
                id: "chemistry".to_string(),
                name: "Chemistry".to_string(),
                chapters: vec![
                    chapter(
                        "c1",
                        "Structure of Atom",
                        vec![
                            lecture("c1l1", "Bohr's Model of an Atom"),
                            pdf("c1p1", "Atomic Models Guide"),
                            quiz(
                                "c1q1",
                                "Atomic Structure Quiz",
                                vec![mcq(
                                    "cq1",
                                    "Which particle has a negative charge?",
                                    &["Proton", "Neutron", "Electron", "Photon"],
                                    "Electron",
                                    "An electron carries a negative charge, a proton a positive one, a neutron none.",
                                )],
                            ),
                            game("c1g1", "Atom Builder", "Drag and drop protons, neutrons, and electrons to build different elements."),
                        ],
                    ),
                    chapter("c2", "States of Matter", vec![]),
                    chapter("c3", "Chemical Bonding", vec![]),
                ],
            },
        ],
    }
}

/// Seed roster used when neither store has data for a student and for the
/// teacher view before any snapshot exists.
pub fn seed_roster() -> Vec<StudentRecord> {
    let now = crate::models::now_millis();
    let seed = |id: &str, name: &str, coins: i64, badges: &[&str], level: Level| StudentRecord {
        id: id.to_string(),
        name: name.to_string(),
        grade: 8,
        progress: Default::default(),
        coins,
        badges: badges.iter().map(|b| b.to_string()).collect(),
        level,
        last_updated: now,
    };

    vec![
        seed("s1", "Alice", 1250, &["Math Whiz", "Science Starter"], Level::Silver),
        seed("s2", "Bob", 800, &["Science Starter"], Level::Bronze),
        seed(
            "s3",
            "Charlie",
            2100,
            &["Math Whiz", "Science Expert", "Top Learner"],
            Level::Gold,
        ),
        seed("s4", "Diana", 500, &[], Level::Bronze),
    ]
}

/// Case-insensitive name match against the seed roster.
pub fn seed_record_by_name(name: &str) -> Option<StudentRecord> {
    seed_roster()
        .into_iter()
        .find(|r| r.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_subject_counts_content_across_chapters() {
        let catalog = standard_catalog();
        // 4 items in m1, 3 in m2, 2 in m3, empty trailing chapters.
        assert_eq!(catalog.total_content_count("math"), 9);
    }

    #[test]
    fn unknown_subject_counts_zero() {
        let catalog = standard_catalog();
        assert_eq!(catalog.total_content_count("history"), 0);
    }

    #[test]
    fn finds_content_by_id() {
        let catalog = standard_catalog();
        let item = catalog.find_content("english", "e1g1").unwrap();
        assert_eq!(item.title, "Word Scramble");
        assert!(matches!(item.kind, ContentKind::Game { .. }));
    }

    #[test]
    fn seed_lookup_is_case_insensitive() {
        assert_eq!(seed_record_by_name("alice").unwrap().id, "s1");
        assert_eq!(seed_record_by_name("CHARLIE").unwrap().coins, 2100);
        assert!(seed_record_by_name("Priya").is_none());
    }

    #[test]
    fn uncompleted_entries_exclude_completed_content() {
        let catalog = standard_catalog();
        let mut record = StudentRecord::fresh("u1", "Priya", None);
        let all = catalog.uncompleted_entries(&record).len();

        record.progress.insert(
            "math".to_string(),
            crate::models::SubjectProgress {
                completed_content: vec!["m1l1".to_string(), "m1q1".to_string()],
                ..Default::default()
            },
        );
        let remaining = catalog.uncompleted_entries(&record);
        assert_eq!(remaining.len(), all - 2);
        assert!(remaining.iter().all(|e| e.content_id != "m1l1"));
    }
}
