use crate::store::RetrievedPassage;
use std::fmt::Write;

/// Stands in for `{activity_title}` when the chat is not activity-scoped.
pub const NO_ACTIVITY_TITLE: &str = "general study (no specific activity)";

const REFERENCE_HEADER: &str = "--- REFERENCE MATERIAL ---";
const REFERENCE_FOOTER: &str = "--- END REFERENCE MATERIAL ---";

pub fn render_template(
    template: &str,
    student_name: &str,
    activity_title: Option<&str>,
    question: &str,
) -> String {
    template
        .replace("{student_name}", student_name)
        .replace("{activity_title}", activity_title.unwrap_or(NO_ACTIVITY_TITLE))
        .replace("{question}", question)
}

/// Append a delimited reference section. No passages leaves the prompt as is.
pub fn append_reference_material(system_prompt: &str, passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return system_prompt.to_string();
    }

    let mut out = String::with_capacity(
        system_prompt.len() + passages.iter().map(|p| p.text.len() + 32).sum::<usize>() + 128,
    );
    out.push_str(system_prompt.trim_end());
    out.push_str("\n\n");
    out.push_str(REFERENCE_HEADER);
    out.push_str("\nUse the following course material when it is relevant to the question.\n");
    for (i, passage) in passages.iter().enumerate() {
        let _ = write!(
            out,
            "\n[{}] (relevance {:.2})\n{}\n",
            i + 1,
            passage.relevance_score,
            passage.text.trim()
        );
    }
    out.push('\n');
    out.push_str(REFERENCE_FOOTER);
    out
}
