//! Query and prompt construction
//!
//! Builds the retrieval query for the diagnosis run, renders retrieved
//! passages into a context block and wraps that block in the model prompt.

use super::profile::CompanyProfile;

/// Fixed retrieval query for the diagnosis step
pub const DIAGNOSIS_QUERY: &str = "Extract company mission, vision, strategy, and identify training needs. \
Return skill gaps and required competencies aligned with corporate university outcomes.";

/// Retrieval query, with the company profile appended when one was supplied
pub fn diagnosis_query(profile: Option<&CompanyProfile>) -> String {
    let mut query = DIAGNOSIS_QUERY.to_string();
    if let Some(profile) = profile.filter(|p| !p.is_empty()) {
        query.push_str("\nCompany profile JSON:\n");
        query.push_str(&profile.to_json());
    }
    query
}

/// Render passages as a bulleted context block, separated by blank lines
pub fn format_context<S: AsRef<str>>(passages: &[S]) -> String {
    passages
        .iter()
        .map(|p| format!("- {}", p.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap the context block in the structured-diagnosis instruction
pub fn diagnosis_prompt(context: &str) -> String {
    format!(
        r#"You are a Corporate University expert and talent strategist.

Using ONLY the provided context, produce a JSON object with:
- company_summary: short text
- mission: string (if unknown, infer carefully)
- vision: string (if unknown, infer carefully)
- strategy: list of strategy pillars
- skill_gaps: list of objects: {{skill, current_level_0_100, target_level_0_100, priority('Critical'|'High'|'Medium'|'Low'), role_impact}}
- training_needs: list of key needs
- assumptions: list of assumptions you made

CONTEXT:
{context}

Return ONLY valid JSON. No extra text.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_profile() {
        assert_eq!(diagnosis_query(None), DIAGNOSIS_QUERY);
    }

    #[test]
    fn test_query_with_profile() {
        let profile = CompanyProfile::parse(r#"{"company_name": "Acme", "size": 250}"#).unwrap();
        let query = diagnosis_query(Some(&profile));
        assert!(query.starts_with(DIAGNOSIS_QUERY));
        assert!(query.contains("\nCompany profile JSON:\n"));
        assert!(query.contains("\"company_name\":\"Acme\""));
        assert!(query.contains("\"size\":250"));
    }

    #[test]
    fn test_empty_profile_ignored() {
        let profile = CompanyProfile::parse("{}").unwrap();
        assert_eq!(diagnosis_query(Some(&profile)), DIAGNOSIS_QUERY);
    }

    #[test]
    fn test_format_context() {
        let context = format_context(&["first passage", "second passage"]);
        assert_eq!(context, "- first passage\n\n- second passage");
        let none: [&str; 0] = [];
        assert_eq!(format_context(&none), "");
    }

    #[test]
    fn test_prompt_embeds_context() {
        let prompt = diagnosis_prompt("- Mission: grow AI literacy.");
        assert!(prompt.contains("CONTEXT:\n- Mission: grow AI literacy.\n"));
        assert!(prompt.contains("{skill, current_level_0_100"));
        assert!(prompt.trim_end().ends_with("Return ONLY valid JSON. No extra text."));
    }
}
