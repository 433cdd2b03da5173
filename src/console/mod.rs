//! Interactive console for the client
//!
//! Every question put to the operator goes through [`Operator`], so the
//! flows in [`session`] can run against a terminal or a script.

pub mod session;

pub use session::{MessageReducer, SamplingResponder, Session};

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::error::Result;

/// The human at the console
pub trait Operator: Send + Sync {
    /// Pick one of `items`; returns its index
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize>;

    fn input(&self, prompt: &str) -> Result<String>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Show a line of output
    fn say(&self, line: &str);

    /// Show an error line; the session keeps going
    fn warn(&self, line: &str);
}

/// Terminal operator backed by dialoguer.
///
/// Prompts block, so they run under `block_in_place` and need the
/// multi-threaded runtime.
#[derive(Debug, Default)]
pub struct DialoguerOperator;

impl Operator for DialoguerOperator {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize> {
        let choice = tokio::task::block_in_place(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(items)
                .default(0)
                .interact()
        })?;
        Ok(choice)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        let value = tokio::task::block_in_place(|| {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })?;
        Ok(value)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let answer = tokio::task::block_in_place(|| {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(default)
                .interact()
        })?;
        Ok(answer)
    }

    fn say(&self, line: &str) {
        println!("{}", line);
    }

    fn warn(&self, line: &str) {
        eprintln!("{}", line);
    }
}
