//! Interactive prompting for flags no earlier source specified.
//!
//! Each unspecified visible flag gets one [`Question`]. Flags with options are
//! asked as a selection, boolean flags as a yes/no confirmation, and the rest
//! as a line of text prefilled with the current value.
//!
//! The terminal sits behind the [`Ask`] trait. [`Terminal`] implements it with
//! `dialoguer` when the `prompt` feature is enabled; tests script the answers.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::builder;
use crate::error::FlagError;
use crate::view::{FlagInfo, FlagSetView};

/// How to ask for one flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
    /// Overrides the generated message.
    pub message: Option<String>,
    /// Ask to choose among these values.
    pub options: Option<Vec<String>>,
    /// Allow choosing several options; each one is set in turn.
    pub multiple: bool,
    /// Ask yes/no even if the flag is not a boolean flag.
    pub boolean: bool,
}

impl Question {
    pub fn options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: Some(options.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// `Specify <name> value[(s)] (<usage>)`.
pub fn default_message(flag: &FlagInfo, question: &Question) -> String {
    let plural = if question.multiple { "(s)" } else { "" };
    format!("Specify {} value{plural} ({})", flag.name, flag.usage)
}

/// The terminal side of a prompt.
pub trait Ask {
    /// Index of the chosen option.
    fn select(&mut self, message: &str, options: &[String]) -> Result<usize, FlagError>;

    fn multi_select(&mut self, message: &str, options: &[String])
    -> Result<Vec<usize>, FlagError>;

    fn confirm(&mut self, message: &str) -> Result<bool, FlagError>;

    /// A line of text. An empty answer keeps `default`.
    fn read_line(&mut self, message: &str, default: &str) -> Result<String, FlagError>;

    /// Show an error before asking again.
    fn report(&mut self, err: &FlagError);
}

type QuestionFn = Box<dyn Fn(&FlagInfo) -> Result<Question, FlagError>>;
type MessageFn = Box<dyn Fn(&FlagInfo, &Question) -> String>;

pub struct Parser<A> {
    ask: A,
    retry: bool,
    questions: Option<QuestionFn>,
    message: Option<MessageFn>,
}

impl<A: Ask> Parser<A> {
    pub fn new(ask: A) -> Self {
        Self {
            ask,
            retry: false,
            questions: None,
            message: None,
        }
    }

    /// Ask again when the first answer for a flag is rejected.
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_questions(mut self, questions: HashMap<String, Question>) -> Self {
        self.questions = Some(Box::new(move |flag| {
            Ok(questions.get(&flag.name).cloned().unwrap_or_default())
        }));
        self
    }

    pub fn with_question_fn(
        mut self,
        f: impl Fn(&FlagInfo) -> Result<Question, FlagError> + 'static,
    ) -> Self {
        self.questions = Some(Box::new(f));
        self
    }

    pub fn with_message_fn(mut self, f: impl Fn(&FlagInfo, &Question) -> String + 'static) -> Self {
        self.message = Some(Box::new(f));
        self
    }

    pub fn into_inner(self) -> A {
        self.ask
    }

    fn question(&self, flag: &FlagInfo) -> Result<Question, FlagError> {
        match &self.questions {
            Some(f) => f(flag),
            None => Ok(Question::default()),
        }
    }

    fn message(&self, flag: &FlagInfo, question: &Question) -> String {
        if let Some(message) = &question.message {
            return message.clone();
        }
        match &self.message {
            Some(f) => f(flag, question),
            None => default_message(flag, question),
        }
    }

    fn answers(&mut self, flag: &FlagInfo) -> Result<Vec<String>, FlagError> {
        let question = self.question(flag)?;
        let message = self.message(flag, &question);
        if let Some(options) = &question.options {
            let picked = if question.multiple {
                self.ask.multi_select(&message, options)?
            } else {
                vec![self.ask.select(&message, options)?]
            };
            return picked
                .into_iter()
                .map(|i| {
                    options.get(i).cloned().ok_or_else(|| {
                        FlagError::Prompt(format!("option {i} out of range for {}", flag.name))
                    })
                })
                .collect();
        }
        if question.boolean || flag.is_bool {
            return Ok(vec![self.ask.confirm(&message)?.to_string()]);
        }
        Ok(vec![self.ask.read_line(&format!("{message} "), &flag.value)?])
    }
}

impl<A: Ask> builder::Parser for Parser<A> {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        for flag in view.unspecified() {
            'ask: loop {
                let answers = self.answers(&flag)?;
                for (i, answer) in answers.iter().enumerate() {
                    match view.set(&flag.name, answer) {
                        Ok(()) => {}
                        // Only the first answer retries, so a flag is never
                        // left half set.
                        Err(err) if self.retry && i == 0 => {
                            debug!(flag = %flag.name, error = %err, "answer rejected, asking again");
                            self.ask.report(&err);
                            continue 'ask;
                        }
                        Err(err) => return Err(err),
                    }
                }
                break;
            }
        }
        Ok(())
    }
}

impl<A: fmt::Debug> fmt::Debug for Parser<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("ask", &self.ask)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "prompt")]
pub use terminal::Terminal;

#[cfg(feature = "prompt")]
mod terminal {
    use dialoguer::theme::ColorfulTheme;
    use dialoguer::{Confirm, Input, MultiSelect, Select};

    use super::Ask;
    use crate::error::FlagError;

    fn prompt_error(err: dialoguer::Error) -> FlagError {
        FlagError::Prompt(err.to_string())
    }

    /// Prompts on the controlling terminal.
    #[derive(Default)]
    pub struct Terminal {
        theme: ColorfulTheme,
    }

    impl Terminal {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl std::fmt::Debug for Terminal {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("Terminal")
        }
    }

    impl Ask for Terminal {
        fn select(&mut self, message: &str, options: &[String]) -> Result<usize, FlagError> {
            Select::with_theme(&self.theme)
                .with_prompt(message)
                .items(options)
                .default(0)
                .interact()
                .map_err(prompt_error)
        }

        fn multi_select(
            &mut self,
            message: &str,
            options: &[String],
        ) -> Result<Vec<usize>, FlagError> {
            MultiSelect::with_theme(&self.theme)
                .with_prompt(message)
                .items(options)
                .interact()
                .map_err(prompt_error)
        }

        fn confirm(&mut self, message: &str) -> Result<bool, FlagError> {
            Confirm::with_theme(&self.theme)
                .with_prompt(message)
                .interact()
                .map_err(prompt_error)
        }

        fn read_line(&mut self, message: &str, default: &str) -> Result<String, FlagError> {
            Input::<String>::with_theme(&self.theme)
                .with_prompt(message.trim_end())
                .default(default.to_string())
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_error)
        }

        fn report(&mut self, err: &FlagError) {
            eprintln!("{err}");
        }
    }
}
