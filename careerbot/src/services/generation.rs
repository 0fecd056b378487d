use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::{CareerError, Result};
use crate::llm::{CompletionOptions, LlmProvider, PromptTemplate};
use crate::models::{AnswerRecommendation, Turn};

/// Values substituted into a prompt template.
#[derive(Debug, Clone, Default)]
pub struct PromptInput<'a> {
    pub context: &'a str,
    pub input: &'a str,
    pub history: &'a [Turn],
    pub vars: Vec<(&'a str, &'a str)>,
}

impl<'a> PromptInput<'a> {
    pub fn new(context: &'a str, input: &'a str) -> Self {
        Self {
            context,
            input,
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: &'a [Turn]) -> Self {
        self.history = history;
        self
    }

    pub fn var(mut self, name: &'a str, value: &'a str) -> Self {
        self.vars.push((name, value));
        self
    }
}

/// Structured model output that must be checked after deserializing.
pub trait StructuredOutput: DeserializeOwned {
    fn validate(&self) -> Result<()>;
}

impl StructuredOutput for AnswerRecommendation {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("answer", &self.answer),
            ("recommendation", &self.recommendation),
        ] {
            if value.trim().is_empty() {
                return Err(CareerError::MalformedModelOutput(format!(
                    "field '{field}' is empty"
                )));
            }
        }
        Ok(())
    }
}

/// Renders prompts and calls the model at temperature 0, bounded by the
/// configured timeout.
pub struct GenerationOrchestrator {
    llm: LlmProvider,
    timeout: Duration,
    history_turns: usize,
}

impl GenerationOrchestrator {
    pub fn new(llm: LlmProvider, timeout: Duration, history_turns: usize) -> Self {
        Self {
            llm,
            timeout,
            history_turns,
        }
    }

    pub fn from_config(llm: LlmProvider, config: &Config) -> Self {
        let timeout_secs = config.llm.as_ref().map(|l| l.timeout_secs).unwrap_or(60);
        Self::new(
            llm,
            Duration::from_secs(timeout_secs),
            config.sessions.history_turns,
        )
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_available()
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    pub fn render(&self, template: &PromptTemplate, input: &PromptInput<'_>) -> Result<String> {
        let history = render_history(input.history, self.history_turns);
        let mut vars = vec![
            ("context", input.context),
            ("input", input.input),
            ("history", history.as_str()),
        ];
        vars.extend(input.vars.iter().copied());
        template.render(&vars)
    }

    pub async fn generate_text(
        &self,
        template: &PromptTemplate,
        input: &PromptInput<'_>,
    ) -> Result<String> {
        let prompt = self.render(template, input)?;
        let text = self.call(template, &prompt).await?;
        Ok(text.trim().to_string())
    }

    pub async fn generate_json(
        &self,
        template: &PromptTemplate,
        input: &PromptInput<'_>,
    ) -> Result<Value> {
        let raw = self.generate_text(template, input).await?;
        parse_json(&raw)
    }

    pub async fn generate_structured<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        input: &PromptInput<'_>,
    ) -> Result<T> {
        let value = self.generate_json(template, input).await?;
        let output: T = serde_json::from_value(value).map_err(|e| {
            CareerError::MalformedModelOutput(format!(
                "{} response has the wrong shape: {e}",
                template.name()
            ))
        })?;
        output.validate()?;
        Ok(output)
    }

    async fn call(&self, template: &PromptTemplate, prompt: &str) -> Result<String> {
        tracing::debug!(template = template.name(), prompt_len = prompt.len(), "Calling LLM");

        let options = CompletionOptions::deterministic();
        match tokio::time::timeout(self.timeout, self.llm.complete(prompt, Some(&options))).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(template = template.name(), timeout = ?self.timeout, "LLM call timed out");
                Err(CareerError::ProviderUnavailable(format!(
                    "LLM call timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// The last `limit` turns as `User: ...` / `Assistant: ...` lines.
pub fn render_history(turns: &[Turn], limit: usize) -> String {
    let start = turns.len().saturating_sub(limit);
    turns[start..]
        .iter()
        .map(|turn| format!("User: {}\nAssistant: {}", turn.user, turn.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

pub fn parse_json(raw: &str) -> Result<Value> {
    let body = strip_code_fences(raw);
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(
            response_preview = %body.chars().take(100).collect::<String>(),
            error = %e,
            "Model response is not valid JSON"
        );
        CareerError::MalformedModelOutput(format!("response is not valid JSON: {e}"))
    })
}

/// Parse a list of strings. JSON arrays are preferred; lists written with
/// single-quoted items (`['a', 'b']`) are accepted too.
pub fn parse_string_list(raw: &str) -> Result<Vec<String>> {
    let body = strip_code_fences(raw);

    let items = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(values)) => values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                other => Err(CareerError::MalformedModelOutput(format!(
                    "expected a list of strings, found {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        Ok(other) => {
            return Err(CareerError::MalformedModelOutput(format!(
                "expected a list of strings, found {}",
                json_kind(&other)
            )))
        }
        Err(_) => parse_quoted_list(body)?,
    };

    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn parse_quoted_list(body: &str) -> Result<Vec<String>> {
    let malformed = || CareerError::MalformedModelOutput("response is not a list".to_string());

    let start = body.find('[').ok_or_else(malformed)?;
    let end = body.rfind(']').ok_or_else(malformed)?;
    if end < start {
        return Err(malformed());
    }

    let mut items = Vec::new();
    let mut chars = body[start + 1..end].chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(malformed());
        }

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => item.extend(chars.next()),
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return Err(malformed());
        }
        items.push(item);
    }
    Ok(items)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
