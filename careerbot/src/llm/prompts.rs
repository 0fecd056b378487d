//! Prompt templates for the career flows.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces
//! so JSON examples can be embedded.

use crate::error::{CareerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    name: &'static str,
    text: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for segment in parse(self.text) {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder. Unused variables are ignored; a
    /// placeholder without a value is a validation error.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(self.text.len());
        for segment in parse(self.text) {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Brace(c) => out.push(c),
                Segment::Placeholder(name) => {
                    let value = vars
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            CareerError::Validation(format!(
                                "prompt '{}' is missing variable '{name}'",
                                self.name
                            ))
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

fn parse(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                segments.push(Segment::Literal(&text[literal_start..i]));
                segments.push(Segment::Brace(bytes[i] as char));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let end = text[i + 1..].find('}').map(|offset| i + 1 + offset);
                match end {
                    Some(end) if is_identifier(&text[i + 1..end]) => {
                        segments.push(Segment::Literal(&text[literal_start..i]));
                        segments.push(Segment::Placeholder(&text[i + 1..end]));
                        i = end + 1;
                        literal_start = i;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    segments.push(Segment::Literal(&text[literal_start..]));
    segments
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub const CHAT: PromptTemplate = PromptTemplate::new(
    "chat",
    r#"You are an intelligent career personal assistant and your job is to help {first_name} with all things career related. You may be asked to help improve their resume, answer interview questions, prepare for an interview, answer recruiter questions and more.

Below is relevant information you can use to answer any questions {first_name} may have. Do not make anything up.

Relevant information:
{context}

Conversation so far:
{history}

{first_name}: {input}
Assistant:"#,
);

pub const ANSWER_DRAFT: PromptTemplate = PromptTemplate::new(
    "answer_draft",
    r#"You are an intelligent career bot helping a user prepare answers to interview questions specific to their role.

Answer the interview question below from the user's perspective, in one paragraph, using only the relevant information provided. Then recommend how the user can improve the answer. Do not make anything up.

Relevant information:
{context}

Interview question: {input}

Respond with valid JSON only, in this format:
{{"answer": "...", "recommendation": "..."}}"#,
);

pub const ANSWER_REFINE: PromptTemplate = PromptTemplate::new(
    "answer_refine",
    r#"You are an intelligent career bot helping a user prepare answers to interview questions specific to their role.

The user has drafted an answer to the interview question below. Revise it in one paragraph, keeping it in the user's voice and grounded in the relevant information provided. Then recommend how the user can improve the answer further. Do not make anything up.

Relevant information:
{context}

Interview question: {input}

User's answer: {answer}

Respond with valid JSON only, in this format:
{{"answer": "...", "recommendation": "..."}}"#,
);

pub const QUESTIONS_WORK_EXPERIENCE: PromptTemplate = PromptTemplate::new(
    "questions_work_experience",
    r#"Below is a user's resume. Return {count} interview questions specific to their work experience that they might be asked during an interview.{exclusions}

Resume:
{context}

Respond with a JSON array of strings only, for example:
["question 1", "question 2", "question 3"]"#,
);

pub const QUESTIONS_ROLE: PromptTemplate = PromptTemplate::new(
    "questions_role",
    r#"A user is applying for the {job_title} role at {company}. Return {count} interview questions specific to this industry and role that would be asked of every candidate.{exclusions}

Relevant information:
{context}

Respond with a JSON array of strings only, for example:
["question 1", "question 2", "question 3"]"#,
);

pub const JOB_SECTIONS: PromptTemplate = PromptTemplate::new(
    "job_sections",
    r#"Below is a job description. Break its content into the sections listed here. Do not remove any information and do not paraphrase; leave a section empty when the description has nothing for it.

Respond with a JSON object only, using exactly these keys:
{{"company_description": "", "job_description": "", "responsibilities": "", "qualifications": "", "compensation": ""}}

Job description:
{input}"#,
);

pub const RESUME_RECOMMENDATIONS: PromptTemplate = PromptTemplate::new(
    "resume_recommendations",
    r#"You are an intelligent career bot helping a user tailor their resume for the {job_title} role at {company}.

Using the resume and job posting information below, recommend specific changes to the resume that would make it a stronger match for this role. Refer to the resume's sections by name. Do not make anything up.

{context}"#,
);

pub const COVER_LETTER: PromptTemplate = PromptTemplate::new(
    "cover_letter",
    r#"You are an intelligent career bot writing a cover letter on behalf of a user applying for the {job_title} role at {company}.

Write a concise, professional cover letter of no more than four paragraphs that connects the user's experience to the job posting. Use only the information below. Do not make anything up.

{context}"#,
);

/// Sentence appended to question prompts listing questions to avoid.
pub fn exclusion_clause(existing: &[String]) -> String {
    if existing.is_empty() {
        return String::new();
    }
    let listed = existing
        .iter()
        .map(|q| format!("\n- {q}"))
        .collect::<String>();
    format!(" Do not include questions similar to these:{listed}")
}
