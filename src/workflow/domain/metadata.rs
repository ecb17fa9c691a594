//! Task declarations carried in pull request titles and bodies.
//!
//! Parsing is pure: raw title and body text in, [`PrMetadata`] out. Bodies
//! arrive with different line-break encodings depending on whether they came
//! from the API, a CI environment variable, or a shell, so every body is
//! normalized before the line-anchored matcher runs.

use super::{DeclarationError, TaskId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static PRIMARY_TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^primary-task:\s*(task-[0-9]{3})$")
        .expect("primary task pattern should compile")
});

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static TASK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bTASK-([0-9]{3})\b").expect("task token pattern should compile")
});

/// How a pull request declares the task it implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationMode {
    /// Exactly one trimmed line reading `Primary-Task: TASK-NNN`.
    #[default]
    Strict,
    /// Any `TASK-NNN` token in title or body; all tokens must agree.
    Loose,
}

impl DeclarationMode {
    /// Returns the configuration name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Loose => "loose",
        }
    }

    const fn expected_form(self) -> &'static str {
        match self {
            Self::Strict => "exactly one line 'Primary-Task: TASK-NNN'",
            Self::Loose => "a TASK-NNN token",
        }
    }
}

impl TryFrom<&str> for DeclarationMode {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "loose" => Ok(Self::Loose),
            _ => Err(format!("unknown declaration mode '{value}', expected strict or loose")),
        }
    }
}

/// Collapses escaped CRLF, escaped LF, and bare CR (including real CRLF)
/// into `\n`, in that order. Applying it twice yields the same text.
#[must_use]
pub fn normalize_body(raw: &str) -> String {
    raw.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// One task declaration found in PR text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDeclaration {
    task_id: TaskId,
    matched: String,
}

impl TaskDeclaration {
    /// Returns the declared task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the matched text verbatim, for operator diagnosis.
    #[must_use]
    pub fn matched(&self) -> &str {
        &self.matched
    }
}

/// Pull request title and body with the task declarations extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrMetadata {
    title: String,
    body: String,
    normalized_body: String,
    mode: DeclarationMode,
    declarations: Vec<TaskDeclaration>,
}

impl PrMetadata {
    /// Normalizes the body and extracts declarations according to `mode`.
    #[must_use]
    pub fn parse(title: &str, body: &str, mode: DeclarationMode) -> Self {
        let normalized_title = normalize_body(title);
        let normalized_body = normalize_body(body);
        let text = format!("{normalized_title}\n{normalized_body}");
        let declarations = match mode {
            DeclarationMode::Strict => strict_declarations(&text),
            DeclarationMode::Loose => loose_declarations(&text),
        };

        Self {
            title: title.to_owned(),
            body: body.to_owned(),
            normalized_body,
            mode,
            declarations,
        }
    }

    /// Resolves the single declared task.
    ///
    /// Strict mode requires exactly one `Primary-Task:` line; a repeated line
    /// is rejected even when both lines name the same task. Loose mode
    /// accepts repeats of one value and rejects differing values.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::Missing`] when nothing is declared and
    /// [`DeclarationError::Multiple`] when the declarations are ambiguous.
    pub fn resolve_task_id(&self) -> Result<TaskId, DeclarationError> {
        let distinct: BTreeSet<TaskId> = self
            .declarations
            .iter()
            .map(TaskDeclaration::task_id)
            .collect();

        let ambiguous = match self.mode {
            DeclarationMode::Strict => self.declarations.len() > 1,
            DeclarationMode::Loose => distinct.len() > 1,
        };
        if ambiguous {
            return Err(DeclarationError::Multiple {
                matches: self
                    .declarations
                    .iter()
                    .map(|declaration| declaration.matched.clone())
                    .collect(),
            });
        }

        distinct
            .into_iter()
            .next()
            .ok_or(DeclarationError::Missing {
                expected: self.mode.expected_form(),
            })
    }

    /// Returns the raw title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the body with line breaks normalized.
    #[must_use]
    pub fn normalized_body(&self) -> &str {
        &self.normalized_body
    }

    /// Returns the mode used to extract declarations.
    #[must_use]
    pub const fn mode(&self) -> DeclarationMode {
        self.mode
    }

    /// Returns every declaration found, in order of appearance.
    #[must_use]
    pub fn declarations(&self) -> &[TaskDeclaration] {
        &self.declarations
    }
}

fn strict_declarations(text: &str) -> Vec<TaskDeclaration> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            let captures = PRIMARY_TASK_LINE.captures(line)?;
            let task_id = TaskId::parse(captures.get(1)?.as_str()).ok()?;
            Some(TaskDeclaration {
                task_id,
                matched: line.to_owned(),
            })
        })
        .collect()
}

fn loose_declarations(text: &str) -> Vec<TaskDeclaration> {
    TASK_TOKEN
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let task_id = TaskId::from_digits(captures.get(1)?.as_str()).ok()?;
            Some(TaskDeclaration {
                task_id,
                matched: whole.as_str().to_owned(),
            })
        })
        .collect()
}
