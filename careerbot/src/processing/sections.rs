use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::models::Section;

/// Résumé headers recognized by [`SectionSplitter`], lowercase.
pub const SECTION_KEYWORDS: &[&str] = &[
    "overview",
    "summary",
    "profile",
    "objective",
    "education",
    "academic background",
    "work experience",
    "professional experience",
    "experience",
    "employment history",
    "job history",
    "career history",
    "skills",
    "technical skills",
    "core competencies",
    "capabilities",
    "areas of expertise",
    "expertise",
    "projects",
    "portfolio",
    "awards",
    "achievements",
    "accolades",
    "honors",
    "publications",
    "research",
    "certifications",
    "credentials",
    "licenses",
    "training",
    "languages",
    "fluency",
    "multilingual",
    "references",
    "referees",
    "testimonials",
    "professional affiliations",
    "memberships",
    "associations",
    "activities",
    "extracurricular activities",
    "volunteer work",
    "community involvement",
    "leadership",
    "hobbies",
    "interests",
    "personal interests",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Newline,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct HeaderMatch {
    start: usize,
    end: usize,
}

/// A section and the byte offset of its header line in the split text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSection {
    pub offset: usize,
    pub section: Section,
}

/// Segments résumé text into sections keyed by known header lines.
#[derive(Debug, Clone)]
pub struct SectionSplitter {
    vocabulary: HashSet<String>,
}

impl Default for SectionSplitter {
    fn default() -> Self {
        Self::with_vocabulary(SECTION_KEYWORDS.iter().copied())
    }
}

impl SectionSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocabulary<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            vocabulary: keywords
                .into_iter()
                .map(|k| normalize_words(k.split_whitespace()))
                .collect(),
        }
    }

    /// Split `text` into ordered sections.
    ///
    /// A header is a line whose only content is a vocabulary entry
    /// (case-insensitive). Each section's body runs from the end of its
    /// header line to the start of the next header, trimmed. Text before the
    /// first header is not part of any section; no headers yields an empty
    /// list.
    pub fn split(&self, text: &str) -> Vec<Section> {
        self.split_located(text)
            .into_iter()
            .map(|located| located.section)
            .collect()
    }

    /// Like [`split`](Self::split), keeping the byte offset of each header.
    pub fn split_located(&self, text: &str) -> Vec<LocatedSection> {
        let headers = self.find_headers(text);

        headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let body_end = headers.get(i + 1).map_or(text.len(), |next| next.start);
                LocatedSection {
                    offset: header.start,
                    section: Section::new(
                        &text[header.start..header.end],
                        text[header.end..body_end].trim(),
                    ),
                }
            })
            .collect()
    }

    fn find_headers(&self, text: &str) -> Vec<HeaderMatch> {
        let tokens = tokenize(text);
        let mut headers = Vec::new();

        for line in tokens.split(|t| t.kind == TokenKind::Newline) {
            let (Some(first), Some(last)) = (line.first(), line.last()) else {
                continue;
            };
            let words = normalize_words(line.iter().map(|t| &text[t.start..t.end]));
            if self.vocabulary.contains(&words) {
                headers.push(HeaderMatch {
                    start: first.start,
                    end: last.end,
                });
            }
        }

        headers
    }
}

/// Word tokens with byte spans; each `\n` is its own token and other
/// whitespace is dropped.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for (start, segment) in text.split_word_bound_indices() {
        if segment.trim().is_empty() {
            for (offset, _) in segment.match_indices('\n') {
                tokens.push(Token {
                    kind: TokenKind::Newline,
                    start: start + offset,
                    end: start + offset + 1,
                });
            }
            continue;
        }

        tokens.push(Token {
            kind: TokenKind::Word,
            start,
            end: start + segment.len(),
        });
    }

    tokens
}

fn normalize_words<'a>(words: impl Iterator<Item = &'a str>) -> String {
    words
        .map(|w| w.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
