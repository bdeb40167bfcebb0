// Fixed content used when a stage cannot get a usable answer from the model,
// plus the canned conversation messages of the revision loop.

use crate::models::Hypothesis;

/// (id, title, description) of the fallback hypothesis batch
pub const FALLBACK_HYPOTHESES: [(u32, &str, &str); 3] = [
    (
        1,
        "Correlation between variables in the dataset",
        "This hypothesis explores potential correlations between key variables in the dataset. Understanding these relationships could provide insights into underlying patterns.",
    ),
    (
        2,
        "Time-based trends in the dataset",
        "This hypothesis examines how values change over time. Identifying temporal patterns could reveal seasonal effects or long-term trends.",
    ),
    (
        3,
        "Comparison of different groups within the dataset",
        "This hypothesis compares different categories or groups within the data. Analyzing group differences may highlight important distinctions or similarities.",
    ),
];

/// Document shown in place of a paper when generation fails
pub const DOCUMENT_ERROR_TEXT: &str = "# Error Generating Research Paper

We encountered an issue generating the research paper based on your selected hypothesis. Please try again or select a different hypothesis.

## Possible reasons:
* API rate limit exceeded (please try again in a minute)
* Network connectivity issues
* Data format issues

If you continue to experience problems, please try using a smaller dataset or a different hypothesis.";

pub const PROCESSING_MESSAGE: &str = "Processing your request...";

pub const REVISION_APPLIED_MESSAGE: &str =
    "I've updated the research paper based on your request. You can see the changes in the editor.";

pub const REVISION_FAILED_MESSAGE: &str =
    "I had trouble updating the paper. Please try a different request or rephrase your instructions.";

pub fn fallback_hypotheses() -> Vec<Hypothesis> {
    FALLBACK_HYPOTHESES
        .iter()
        .map(|(id, title, description)| Hypothesis {
            id: *id,
            title: title.to_string(),
            description: description.to_string(),
        })
        .collect()
}

pub fn welcome_message(hypothesis_title: &str) -> String {
    format!(
        "I've generated a research paper based on the hypothesis: \"{}\". You can ask me to modify or improve specific parts of the paper.",
        hypothesis_title
    )
}
