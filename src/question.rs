//! Multiple-choice review questions
//!
//! A study partner writes a question for a subject with exactly four
//! choices, marks the correct one and explains it. Anyone can then answer
//! it by label (`A`..`D`) and gets the verdict plus the explanation.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

pub const CHOICE_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,
    #[error("expected exactly 4 choices, got {0}")]
    ChoiceCount(usize),
    #[error("choice {0} is empty")]
    EmptyChoice(char),
    #[error("not a choice: {0:?} (expected A-D)")]
    InvalidChoice(String),
    #[error("explanation is empty")]
    EmptyExplanation,
    #[error("no question with id {0}")]
    NotFound(u64),
}

/// Display label of the choice at `index` (`0` is `A`).
pub fn choice_label(index: usize) -> char {
    char::from(b'A' + (index % CHOICE_COUNT) as u8)
}

/// Parse a choice label (`A`..`D`, any case) into its index.
pub fn parse_choice(label: &str) -> Result<usize, QuestionError> {
    let invalid = || QuestionError::InvalidChoice(label.to_string());
    let mut chars = label.trim().chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(invalid());
    };
    match c.to_ascii_uppercase() {
        c @ 'A'..='D' => Ok(usize::from(c as u8 - b'A')),
        _ => Err(invalid()),
    }
}

/// Split free text into choices, one per line.
///
/// Only the first four lines count. Fewer than four, or a blank one among
/// them, is rejected.
pub fn parse_choices(input: &str) -> Result<[String; CHOICE_COUNT], QuestionError> {
    let lines: Vec<&str> = input.trim().lines().take(CHOICE_COUNT).collect();
    let choices: [&str; CHOICE_COUNT] = lines
        .as_slice()
        .try_into()
        .map_err(|_| QuestionError::ChoiceCount(lines.len()))?;

    let mut parsed: [String; CHOICE_COUNT] = Default::default();
    for (i, choice) in choices.iter().enumerate() {
        let choice = choice.trim();
        if choice.is_empty() {
            return Err(QuestionError::EmptyChoice(choice_label(i)));
        }
        parsed[i] = choice.to_string();
    }
    Ok(parsed)
}

/// A validated review question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub author_id: String,
    pub author_name: String,
    pub subject: String,
    pub text: String,
    pub choices: [String; CHOICE_COUNT],
    /// Index into `choices`
    pub correct: usize,
    pub explanation: String,
}

impl Question {
    pub fn new(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        subject: impl Into<String>,
        text: &str,
        choices: &str,
        correct: &str,
        explanation: &str,
    ) -> Result<Self, QuestionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let choices = parse_choices(choices)?;
        let correct = parse_choice(correct)?;
        let explanation = explanation.trim();
        if explanation.is_empty() {
            return Err(QuestionError::EmptyExplanation);
        }
        Ok(Self {
            author_id: author_id.into(),
            author_name: author_name.into(),
            subject: subject.into(),
            text: text.to_string(),
            choices,
            correct,
            explanation: explanation.to_string(),
        })
    }

    /// Check an answer given by label.
    pub fn check(&self, label: &str) -> Result<AnswerCheck, QuestionError> {
        let chosen = parse_choice(label)?;
        Ok(AnswerCheck {
            correct: chosen == self.correct,
            answer: choice_label(self.correct),
            explanation: self.explanation.clone(),
        })
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Question by {}:\n\n{}\n", self.author_name, self.text)?;
        for (i, choice) in self.choices.iter().enumerate() {
            write!(f, "\n{}. {}", choice_label(i), choice)?;
        }
        Ok(())
    }
}

/// Verdict on one answer attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCheck {
    pub correct: bool,
    /// Label of the right choice
    pub answer: char,
    pub explanation: String,
}

impl fmt::Display for AnswerCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.correct { "Correct!" } else { "Incorrect!" };
        write!(f, "{verdict}\n\nExplanation:\n{}", self.explanation)
    }
}

/// Published questions, numbered from 1 in publication order
#[derive(Debug)]
pub struct QuestionBank {
    questions: DashMap<u64, Question>,
    next_id: AtomicU64,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self {
            questions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a question and return its id.
    pub fn publish(&self, question: Question) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, subject = %question.subject, "question published");
        self.questions.insert(id, question);
        id
    }

    pub fn get(&self, id: u64) -> Option<Question> {
        self.questions.get(&id).map(|q| q.value().clone())
    }

    pub fn answer(&self, id: u64, label: &str) -> Result<AnswerCheck, QuestionError> {
        self.questions
            .get(&id)
            .ok_or(QuestionError::NotFound(id))?
            .check(label)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
