//! Prompt text for question-pool generation.

use std::fmt::Write;

use certexam_core::traits::GenerationRequest;

const INSTRUCTIONS: &str = "\
RULES:
1. Cover every course topic listed above, evenly.
2. Test understanding, not memorisation.
3. Mix every question type:
   - \"multiple_choice\": 4 options, exactly 1 correct
   - \"true_false\": a statement to judge, options [\"True\", \"False\"]
   - \"fill_blank\": the question contains \"___\"; correctAnswer is the missing word or phrase
   - \"code_output\": what does this code print? include codeContext
   - \"multiple_select\": 2-3 correct options listed in correctAnswers
4. Every question carries a detailed explanation and the course topic it covers.
5. correctAnswer must match one of the options exactly, except for fill_blank.

RESPONSE FORMAT (JSON only):
{
  \"questions\": [
    {
      \"question\": \"question text\",
      \"type\": \"multiple_choice\",
      \"difficulty\": \"easy\",
      \"options\": [\"option 1\", \"option 2\", \"option 3\", \"option 4\"],
      \"correctAnswer\": \"option 2\",
      \"correctAnswers\": null,
      \"explanation\": \"why option 2 is right\",
      \"codeContext\": null,
      \"topic\": \"topic covered\"
    }
  ]
}
";

/// Build the prompt asking for `count` questions for `request`.
pub fn build_prompt(request: &GenerationRequest, count: u32) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + 512);
    let d = request.difficulty_distribution;
    let _ = writeln!(
        prompt,
        "You are a rigorous educational assessor. Write {count} questions for a comprehensive \
         FINAL EXAM on \"{}\".\n",
        request.skill_name
    );
    let _ = writeln!(prompt, "STUDENT PROFILE:");
    let _ = writeln!(prompt, "- Skill: {}", request.skill_name);
    let _ = writeln!(prompt, "- Level: {}", request.level);
    let _ = writeln!(prompt, "- Category: {}\n", request.skill_category);

    let _ = writeln!(prompt, "COURSE TOPICS TO COVER:");
    for topic in &request.topics {
        let _ = write!(
            prompt,
            "- Week {}, Lesson {}: {}",
            topic.week_number, topic.lesson_number, topic.title
        );
        if !topic.description.is_empty() {
            let _ = write!(prompt, " ({})", topic.description);
        }
        prompt.push('\n');
    }
    let _ = writeln!(
        prompt,
        "\nDIFFICULTY MIX: {}% easy, {}% medium, {}% hard\n",
        d.easy, d.medium, d.hard
    );
    prompt.push_str(INSTRUCTIONS);
    prompt
}

#[cfg(test)]
mod tests {
    use certexam_core::model::{CertificateLevel, DifficultyDistribution};
    use certexam_core::plan::LessonTopic;

    use super::*;

    #[test]
    fn prompt_lists_topics_and_mix() {
        let request = GenerationRequest {
            skill_name: "Rust".into(),
            skill_category: "programming".into(),
            level: CertificateLevel::Intermediario,
            topics: vec![
                LessonTopic {
                    week_number: 1,
                    lesson_number: 2,
                    title: "Borrowing".into(),
                    description: "shared and mutable references".into(),
                },
                LessonTopic {
                    week_number: 2,
                    lesson_number: 1,
                    title: "Traits".into(),
                    description: String::new(),
                },
            ],
            question_count: 35,
            min_questions: 20,
            difficulty_distribution: DifficultyDistribution {
                easy: 25,
                medium: 45,
                hard: 30,
            },
        };
        let prompt = build_prompt(&request, 15);
        assert!(prompt.contains("Write 15 questions"));
        assert!(prompt.contains("- Week 1, Lesson 2: Borrowing (shared and mutable references)\n"));
        assert!(prompt.contains("- Week 2, Lesson 1: Traits\n"));
        assert!(prompt.contains("25% easy, 45% medium, 30% hard"));
        assert!(prompt.contains("\"questions\""));
    }
}
