//! Mini-game state machines. Each game runs `Init -> Playing -> (Won | Lost)`
//! and reports its final score exactly once through a one-shot channel; the
//! host awaits the outcome and hands the score to the progress tracker.
//! Inputs after the terminal state are ignored.

use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub won: bool,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Playing,
    Finished,
}

/// Catch falling numbers; only multiples of the target count. Five hits
/// wins, one wrong pickup ends the game.
pub struct NumberCollector {
    target: i64,
    goal: u32,
    collected: u32,
    phase: Phase,
    outcome_tx: Option<oneshot::Sender<GameOutcome>>,
}

impl NumberCollector {
    pub fn new() -> (Self, oneshot::Receiver<GameOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            NumberCollector {
                target: 3,
                goal: 5,
                collected: 0,
                phase: Phase::Init,
                outcome_tx: Some(tx),
            },
            rx,
        )
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Init {
            self.phase = Phase::Playing;
        }
    }

    pub fn collect(&mut self, value: i64) {
        if self.phase != Phase::Playing {
            return;
        }
        if value % self.target == 0 {
            self.collected += 1;
            if self.collected >= self.goal {
                self.finish(true);
            }
        } else {
            self.finish(false);
        }
    }

    fn finish(&mut self, won: bool) {
        self.phase = Phase::Finished;
        let score = if won {
            100 + i64::from(self.collected) * 10
        } else {
            0
        };
        if let Some(tx) = self.outcome_tx.take() {
            let _ = tx.send(GameOutcome { won, score });
        }
    }
}

const WORDS: &[(&str, &str)] = &[
    (
        "INTEGRITY",
        "The quality of being honest and having strong moral principles.",
    ),
    (
        "AMBIGUOUS",
        "Open to more than one interpretation; having a double meaning.",
    ),
    ("NOSTALGIA", "A sentimental longing for the past."),
];

/// Unscramble a vocabulary word. A correct guess wins; wrong guesses burn
/// one of a bounded number of attempts.
pub struct WordScramble {
    word: String,
    hint: String,
    attempts_left: u32,
    phase: Phase,
    outcome_tx: Option<oneshot::Sender<GameOutcome>>,
}

impl WordScramble {
    pub fn new(word: &str, hint: &str, attempts: u32) -> (Self, oneshot::Receiver<GameOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            WordScramble {
                word: word.to_string(),
                hint: hint.to_string(),
                attempts_left: attempts.max(1),
                phase: Phase::Init,
                outcome_tx: Some(tx),
            },
            rx,
        )
    }

    /// Word choice varies per run without pulling in a randomness crate.
    pub fn pick() -> (Self, oneshot::Receiver<GameOutcome>) {
        let index = crate::models::now_millis().unsigned_abs() as usize % WORDS.len();
        let (word, hint) = WORDS[index];
        Self::new(word, hint, 3)
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// The letters of the answer, deterministically reordered.
    pub fn scrambled(&self) -> String {
        let mut letters: Vec<char> = self.word.chars().collect();
        letters.reverse();
        let mid = letters.len() / 2;
        letters.swap(0, mid);
        letters.into_iter().collect()
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Init {
            self.phase = Phase::Playing;
        }
    }

    pub fn guess(&mut self, guess: &str) {
        if self.phase != Phase::Playing {
            return;
        }
        if guess.eq_ignore_ascii_case(&self.word) {
            self.finish(true);
            return;
        }
        self.attempts_left -= 1;
        if self.attempts_left == 0 {
            self.finish(false);
        }
    }

    fn finish(&mut self, won: bool) {
        self.phase = Phase::Finished;
        let score = if won { 150 } else { 0 };
        if let Some(tx) = self.outcome_tx.take() {
            let _ = tx.send(GameOutcome { won, score });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collector_wins_after_five_multiples() {
        let (mut game, rx) = NumberCollector::new();
        game.start();
        for value in [3, 9, 12, 21, 30] {
            game.collect(value);
        }
        let outcome = rx.await.unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.score, 150);
    }

    #[tokio::test]
    async fn collector_loses_on_wrong_pickup() {
        let (mut game, rx) = NumberCollector::new();
        game.start();
        game.collect(3);
        game.collect(7);
        let outcome = rx.await.unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.score, 0);
    }

    #[tokio::test]
    async fn outcome_is_reported_exactly_once() {
        let (mut game, rx) = NumberCollector::new();
        game.start();
        game.collect(7);
        // Inputs after the terminal state must not panic or re-send.
        game.collect(3);
        game.collect(5);
        let outcome = rx.await.unwrap();
        assert_eq!(outcome.score, 0);
    }

    #[tokio::test]
    async fn collector_ignores_input_before_start() {
        let (mut game, mut rx) = NumberCollector::new();
        game.collect(7);
        assert!(rx.try_recv().is_err());
        game.start();
        game.collect(7);
        assert!(rx.await.unwrap().score == 0);
    }

    #[tokio::test]
    async fn scramble_win_scores_150() {
        let (mut game, rx) = WordScramble::new("INTEGRITY", "honesty", 3);
        game.start();
        game.guess("integrity");
        let outcome = rx.await.unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.score, 150);
    }

    #[tokio::test]
    async fn scramble_loses_when_attempts_run_out() {
        let (mut game, rx) = WordScramble::new("NOSTALGIA", "longing", 2);
        game.start();
        game.guess("wrong");
        game.guess("also wrong");
        let outcome = rx.await.unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn scrambled_letters_are_a_permutation() {
        let (game, _rx) = WordScramble::new("AMBIGUOUS", "unclear", 3);
        let mut scrambled: Vec<char> = game.scrambled().chars().collect();
        let mut original: Vec<char> = "AMBIGUOUS".chars().collect();
        scrambled.sort_unstable();
        original.sort_unstable();
        assert_eq!(scrambled, original);
        assert_ne!(game.scrambled(), "AMBIGUOUS");
    }
}
