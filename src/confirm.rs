//! Confirmation of destructive actions.

use std::collections::VecDeque;

use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::error::{Result, TrackerError};

pub const CLAIM_PROMPT: &str = "Are you sure you want to take this task?";
pub const ABANDON_PROMPT: &str = "Are you sure you want to abandon this task?";
pub const UNASSIGN_PROMPT: &str = "Are you sure you want to unassign this task?";
pub const DELETE_PROMPT: &str = "Delete this task?";
pub const REMOVE_PARENT_PROMPT: &str = "Remove this parent relationship?";

pub fn delete_user_prompt(username: &str) -> String {
    format!(
        "Are you sure you want to delete user \"{}\"? This action cannot be undone.",
        username
    )
}

/// Asks the user to approve an action. `false` means nothing is sent.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

impl<T: Confirmer + ?Sized> Confirmer for Box<T> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        (**self).confirm(prompt)
    }
}

/// Terminal prompt, defaulting to "no"
#[derive(Debug, Default)]
pub struct DialoguerConfirmer;

impl Confirmer for DialoguerConfirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| TrackerError::InvalidInput(format!("Confirmation cancelled: {}", e)))
    }
}

/// Approves everything (`--yes`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirmer for AlwaysConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Replays queued answers and records every prompt. Declines once exhausted.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConfirmer {
    answers: VecDeque<bool>,
    prompts: Vec<String>,
}

impl ScriptedConfirmer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    pub fn push(&mut self, answer: bool) {
        self.answers.push_back(answer);
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}
