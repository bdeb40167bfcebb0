//! Prompt Builder
//!
//! Pure functions rendering the message sequences for each stage. Output
//! depends only on the arguments, so identical inputs give identical prompts.

use crate::dataset::Dataset;
use crate::models::Hypothesis;
use crate::types::LLMMessage;

pub const HYPOTHESIS_SYSTEM_PROMPT: &str =
    "You are a helpful research assistant that analyzes data and generates research hypotheses.";

pub const PAPER_SYSTEM_PROMPT: &str = "You are a professional academic researcher with expertise in writing research papers according to academic standards. Format your response in proper markdown following professional academic conventions.";

/// The markdown subset the renderer understands
const MARKDOWN_RULES: &str = r####"MARKDOWN RULES (use only these constructs):
- Headers: "# " for the paper title, "## " for sections, "### " for subsections
- Paragraphs separated by a single blank line
- Bullet lists with lines starting "* "
- Numbered lists with lines starting "1. ", "2. ", ...
- **bold** and *italic* emphasis
- Citations as bracketed spans, e.g. [Smith et al., 2021]
Do not use tables, code blocks, HTML or images."####;

/// Build the hypothesis-generation prompt
pub fn build_hypothesis_prompt(dataset: &Dataset, extra_context: Option<&str>) -> Vec<LLMMessage> {
    let prompt = format!(
        r#"You are a research scientist analyzing the following dataset:

{summary}{context}
TASK:
Generate exactly 3 different hypotheses based on this data that could be explored in a research paper.
For each hypothesis:
1. Provide a clear title (1 sentence)
2. Write a brief description explaining the hypothesis and why it's interesting (2-3 sentences)
3. Make sure each hypothesis explores a different aspect of the data

OUTPUT FORMAT (respond with ONLY a JSON array of exactly 3 objects, no surrounding prose):
[
  {{
    "id": 1,
    "title": "Hypothesis 1 title",
    "description": "Description of hypothesis 1"
  }},
  {{
    "id": 2,
    "title": "Hypothesis 2 title",
    "description": "Description of hypothesis 2"
  }},
  {{
    "id": 3,
    "title": "Hypothesis 3 title",
    "description": "Description of hypothesis 3"
  }}
]"#,
        summary = dataset_summary(dataset),
        context = context_section(extra_context),
    );

    vec![
        LLMMessage::system(HYPOTHESIS_SYSTEM_PROMPT),
        LLMMessage::user(prompt),
    ]
}

/// Build the full-paper prompt for the selected hypothesis
pub fn build_document_prompt(
    dataset: &Dataset,
    hypothesis: &Hypothesis,
    extra_context: Option<&str>,
) -> Vec<LLMMessage> {
    let prompt = format!(
        r#"You are a research scientist analyzing the following dataset:

{summary}{context}
HYPOTHESIS:
{title}
{description}

TASK:
Write a complete academic research paper exploring the hypothesis above, with these sections in order:
1. Title - a descriptive title, author information and date
2. Abstract - a concise summary of the research (150-250 words)
3. Introduction - background, problem statement and significance
4. Literature Review - synthesize relevant prior research
5. Methodology - detailed explanation of the data analysis methods
6. Results - findings with appropriate statistical analysis
7. Discussion - interpret the results against the hypothesis and existing literature
8. Conclusion - findings, implications and suggestions for future research
9. References - properly formatted citations

Describe data visualizations and statistical tables in prose, since images cannot be included.

{rules}"#,
        summary = dataset_summary(dataset),
        context = context_section(extra_context),
        title = hypothesis.title,
        description = hypothesis.description,
        rules = MARKDOWN_RULES,
    );

    vec![
        LLMMessage::system(PAPER_SYSTEM_PROMPT),
        LLMMessage::user(prompt),
    ]
}

/// Build the revision prompt: the whole current paper plus one instruction
pub fn build_revision_prompt(current_document: &str, instruction: &str) -> Vec<LLMMessage> {
    let prompt = format!(
        r#"Here is my current research paper:

{document}

Please update it based on this request: {instruction}

Maintain professional academic formatting and standards in your response.
The entire response must be the complete updated paper, not a summary of changes or a diff.

{rules}"#,
        document = current_document,
        instruction = instruction.trim(),
        rules = MARKDOWN_RULES,
    );

    vec![
        LLMMessage::system(PAPER_SYSTEM_PROMPT),
        LLMMessage::user(prompt),
    ]
}

fn dataset_summary(dataset: &Dataset) -> String {
    format!(
        "Data columns: {columns}\nTotal records: {rows}\nData preview: {preview}\n",
        columns = dataset.column_list(),
        rows = dataset.row_count,
        preview = dataset.preview_json(),
    )
}

fn context_section(extra_context: Option<&str>) -> String {
    match extra_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("\nADDITIONAL CONTEXT:\n{}\n", context),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;
    use serde_json::json;

    fn dataset() -> Dataset {
        let rows = vec![
            json!({"year": 2020, "sales": 10}),
            json!({"year": 2021, "sales": 12}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        Dataset::from_records(rows, 5)
    }

    fn hypothesis() -> Hypothesis {
        Hypothesis {
            id: 2,
            title: "Sales grow over time".to_string(),
            description: "Later years show higher sales.".to_string(),
        }
    }

    #[test]
    fn test_hypothesis_prompt_embeds_summary() {
        let messages = build_hypothesis_prompt(&dataset(), None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        let user = &messages[1].content;
        assert!(user.contains("Data columns: year, sales"));
        assert!(user.contains("Total records: 2"));
        assert!(user.contains("\"year\": 2021"));
        assert!(user.contains("exactly 3"));
        assert!(!user.contains("ADDITIONAL CONTEXT"));
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let ds = dataset();
        assert_eq!(build_hypothesis_prompt(&ds, Some("ctx")), build_hypothesis_prompt(&ds, Some("ctx")));
        assert_eq!(
            build_document_prompt(&ds, &hypothesis(), None),
            build_document_prompt(&ds, &hypothesis(), None)
        );
        assert_eq!(build_revision_prompt("doc", "fix"), build_revision_prompt("doc", "fix"));
    }

    #[test]
    fn test_blank_context_is_ignored() {
        let ds = dataset();
        assert_eq!(build_hypothesis_prompt(&ds, Some("   ")), build_hypothesis_prompt(&ds, None));
        let with_context = build_hypothesis_prompt(&ds, Some("Collected in 2022"));
        assert!(with_context[1].content.contains("ADDITIONAL CONTEXT:\nCollected in 2022"));
    }

    #[test]
    fn test_document_prompt_lists_sections_and_subset() {
        let messages = build_document_prompt(&dataset(), &hypothesis(), None);
        let user = &messages[1].content;
        assert!(user.contains("Sales grow over time"));
        assert!(user.contains("Later years show higher sales."));
        for section in ["Abstract", "Introduction", "Literature Review", "Methodology", "Results", "Discussion", "Conclusion", "References"] {
            assert!(user.contains(section), "missing section {section}");
        }
        assert!(user.contains("\"* \""));
    }

    #[test]
    fn test_markdown_rules_list_every_heading_level() {
        let document = build_document_prompt(&dataset(), &hypothesis(), None);
        let revision = build_revision_prompt("doc", "fix");
        for user in [&document[1].content, &revision[1].content] {
            assert!(user.contains("\"# \" for the paper title"));
            assert!(user.contains("\"## \" for sections"));
            assert!(user.contains("\"### \" for subsections"));
            assert!(user.ends_with("Do not use tables, code blocks, HTML or images."));
        }
    }

    #[test]
    fn test_revision_prompt_embeds_whole_document() {
        let document = "# Title\n\nBody paragraph.";
        let messages = build_revision_prompt(document, "  shorten the abstract ");
        let user = &messages[1].content;
        assert!(user.contains(document));
        assert!(user.contains("request: shorten the abstract\n"));
        assert!(user.contains("complete updated paper"));
    }
}
