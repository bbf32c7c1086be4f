//! `{placeholder}` substitution for worker command templates.
//!
//! # Syntax
//!
//! - `{name}` substitutes the value of variable `name`
//! - `{{` renders as a literal `{`, `}}` as a literal `}`
//!
//! Undefined variables are an error rather than an empty substitution.
//!
//! Command templates are split into arguments *before* substitution, so a
//! multi-line prompt containing quotes still lands in a single argv entry.

use std::collections::HashMap;
use thiserror::Error;

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined variable '{name}' at position {position} in template")]
    UndefinedVariable { name: String, position: usize },

    #[error("unmatched '{{' at position {position} in template")]
    UnmatchedBrace { position: usize },

    #[error("empty variable name '{{}}' at position {position} in template")]
    EmptyVariableName { position: usize },

    #[error("failed to split command template: {0}")]
    Split(String),
}

/// Render one template string.
pub fn render_template(
    template: &str,
    variables: &HashMap<&str, String>,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                result.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => name.push(c),
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                }

                let name = name.trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyVariableName { position: pos });
                }

                let value = variables
                    .get(name)
                    .ok_or_else(|| TemplateError::UndefinedVariable {
                        name: name.to_string(),
                        position: pos,
                    })?;
                result.push_str(value);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                }
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    Ok(result)
}

/// Split a command template into arguments, then render each one.
pub fn render_command(
    template: &str,
    variables: &HashMap<&str, String>,
) -> Result<Vec<String>, TemplateError> {
    let words = shell_words::split(template).map_err(|e| TemplateError::Split(e.to_string()))?;
    words
        .iter()
        .map(|word| render_template(word, variables))
        .collect()
}
