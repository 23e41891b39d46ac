//! Prompt templates for the follow-up requests made after an answer,
//! and parsing of their results.

/// Most follow-up questions shown under an answer.
pub const MAX_RELATED_QUESTIONS: usize = 4;

/// Characters of an answer carried into a diagram prompt.
pub const DIAGRAM_CONTEXT_CHARS: usize = 250;

pub fn related_questions_prompt(question: &str, answer: &str) -> String {
    format!(
        "Based on this biology question and answer for a Class 11 student, generate exactly 4 related follow-up questions that would help deepen their understanding.\n\n\
         Question: {question}\n\
         Answer: {answer}\n\n\
         Generate 4 questions that are:\n\
         1. More specific or detailed aspects of the topic\n\
         2. Related concepts that build on this knowledge\n\
         3. Practical applications or examples\n\
         4. Connections to other biology topics\n\n\
         Return ONLY the 4 questions, one per line, without numbering or bullets."
    )
}

/// Pull questions out of the model's reply: one per non-empty line,
/// skipping lines that start with a list number like `1.` or `2)`.
pub fn parse_related_questions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_numbered(line))
        .take(MAX_RELATED_QUESTIONS)
        .map(String::from)
        .collect()
}

fn is_numbered(line: &str) -> bool {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.len() < line.len() && (rest.starts_with('.') || rest.starts_with(')'))
}

/// Illustration prompt for the image service, seeded with the start of
/// the answer.
pub fn diagram_prompt(context: &str) -> String {
    let short: String = context.chars().take(DIAGRAM_CONTEXT_CHARS).collect();
    format!(
        "High resolution scientific diagram of {}. Professional medical/biology textbook illustration, \
         clearly labeled parts with arrows and text, anatomically accurate, detailed cross-section view, \
         clean white background, educational poster style, sharp lines, vivid colors for different structures, \
         professional scientific illustration quality",
        short.trim()
    )
}
