//! Prompt construction for the matching oracle.

/// Build the coordinator prompt for one volunteer.
pub fn build_match_prompt(profile: &str, tasks: &[String]) -> String {
    let task_list = tasks.join("\n");
    format!(
        "Act as a volunteer coordinator. Match this volunteer to the BEST available task.\n\
         VOLUNTEER: {profile}\n\
         OPEN TASKS: {task_list}\n\
         RULES:\n\
         1. Match based on SKILLS first.\n\
         2. If \"Full Day\", they fit Morning or Afternoon.\n\
         3. Return \"NO_MATCH\" if nothing fits.\n\
         RETURN JSON ONLY: {{ \"taskId\": \"T-XXX\", \"taskName\": \"Name\", \"reasoning\": \"Why\" }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_profile_and_tasks() {
        let tasks = vec![
            "ID: T-1 | Task: Setup | Needs: Lifting | Time: Morning".to_string(),
            "ID: T-2 | Task: Desk | Needs: Communication | Time: Afternoon".to_string(),
        ];
        let prompt = build_match_prompt("Name: Asha, Skills: Lifting", &tasks);
        assert!(prompt.contains("VOLUNTEER: Name: Asha, Skills: Lifting"));
        assert!(prompt.contains("ID: T-1 | Task: Setup | Needs: Lifting | Time: Morning\nID: T-2"));
    }

    #[test]
    fn prompt_states_rules_and_format() {
        let prompt = build_match_prompt("Name: A", &[]);
        assert!(prompt.contains("SKILLS first"));
        assert!(prompt.contains("\"Full Day\", they fit Morning or Afternoon"));
        assert!(prompt.contains("NO_MATCH"));
        assert!(prompt.contains("\"taskId\""));
        assert!(prompt.contains("\"reasoning\""));
    }
}
