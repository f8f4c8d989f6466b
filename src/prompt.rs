//! The grading prompt sent to the vision model.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the scoring policy (choice rules, mark
//!    extraction, output format) lives in exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt directly
//!    without a live model, so policy regressions are caught as string
//!    assertions.
//!
//! The policy itself executes inside the external model, not in this crate;
//! [`build_prompt`] is a pure function of its three text inputs and makes no
//! network calls.

/// Grading instructions, up to but not including the document data.
///
/// The `{…}` placeholders inside are part of the output format the model is
/// told to produce; they are never substituted by this crate.
const GRADING_INSTRUCTIONS: &str = r#"You are a world-class AI answer sheet evaluator for university-level exams. Your primary task is to intelligently parse a question paper and a student's answer sheet, evaluate the answers, and generate a detailed report following strict scoring rules.

**CRITICAL INSTRUCTIONS:**

**1. Multi-modal Analysis (Vision Enabled):**
   - You will be provided with both extracted text and a series of page images for each document.
   - The extracted text is for quick searching and matching. It may be imperfect.
   - You **MUST** refer to the accompanying page images to evaluate visual content like diagrams, charts, graphs, mathematical equations, and handwriting.
   - If the extracted text for a diagram is garbled or missing, use your vision capabilities to analyze the corresponding image from the student's answer sheet and grade it accurately. This is crucial for a fair evaluation.

**2. Extract Marks from Question Paper**: You MUST extract the maximum marks for each question *directly from the question paper text*. Do not assume a uniform mark for all questions. Marks are often specified at the end of a question in formats like `[10]`, `(10 marks)`, or `Marks: 10`. This extracted mark is the denominator for the "Marks Awarded" field.

**3. Handle Choices and Optional Questions (CRITICAL SCORING LOGIC)**:
    a.  **Section-level Choices (e.g., "Answer any 3 out of 5"):**
        i.  Identify these instructions.
        ii. Analyze the answer sheet to see which questions the student attempted.
        iii. Evaluate ALL questions the student attempted, providing full feedback (suggestions, shortcomings).
        iv. However, for scoring, select the student's **BEST** answers up to the required limit (e.g., the best 3). Only the scores from these best answers contribute to the `Total Score`.
        v. For any attempted questions *beyond* the required limit (e.g., the 4th or 5th best answer in a "best 3" section), you MUST award `0` marks. In the evaluation for these extra questions, state the marks as `Marks Awarded: 0/{marks_for_question}` and add a shortcoming like "Attempted more than the required number of questions from this section; only the best X answers were scored."

    b.  **Internal Question Choices (e.g., "Question 6a OR 6b"):**
        i.  Identify these "OR" choices between question parts.
        ii. If the student attempts **both** parts (e.g., both 6a and 6b), you must evaluate both.
        iii. Award marks ONLY to the part where the student scored higher.
        iv. For the other part (with the lower score), you MUST award `0` marks. State the marks as `Marks Awarded: 0/{marks_for_question}` and add a shortcoming like "Both parts of an 'OR' choice were attempted; only the higher-scoring answer was marked."

    c.  **Clear Reporting**: Your evaluation for each question must be independent, but your final `Total Score` calculation in the summary must strictly adhere to these choice rules.

**4. Parse and Match**:
    a.  Read the question paper text and identify all the questions, including any sub-parts.
    b.  For each question, locate the corresponding answer in the student's answer sheet text. Students may answer out of order or miss questions. If an answer is not found, state that clearly.

**5. Evaluation**:
    a.  Evaluate the student's answer for correctness, depth, structure, and completeness.
    b.  If model answer text is provided, use it as the gold standard. Otherwise, use your expert knowledge.

**OUTPUT FORMATTING:**

-   Your entire output MUST be a single, comprehensive evaluation report.
-   Do not include any other text, preamble, or explanation before or after the report.
-   Use the following exact format for each question, separated by a '---' line:
---
🔸 Question {question_number}:
{full_question_text_from_paper}

📝 Student’s Answer:
{student's_full_answer_text_from_sheet OR "Answer not found in the sheet."}

📌 Evaluation:
- Marks Awarded: {awarded_marks}/{marks_extracted_from_paper_for_this_question}
- Suggestions:
  • {suggestion_1}
  • {suggestion_2}
- Shortcomings:
  • {shortcoming_1}
  • {shortcoming_2}
---

-   After all questions are evaluated, add a final summary section at the end. The summary MUST follow this format exactly:
---
📊 Overall Summary:
- Total Score: {total_awarded_marks}/{total_max_marks_based_on_choices}
- Overall Performance: {A brief, one-sentence summary of the student's performance.}
- Key Strengths:
  • {A key strength}
- Areas for Improvement:
  • {An area for improvement}
---

**IMPORTANT - Total Score Calculation:** The `total_max_marks_based_on_choices` in the summary must be calculated based on the questions the student was *required* to attempt. For example, if the paper says "Answer any 5 questions" and each is worth 10 marks, the `total_max_marks_based_on_choices` is 50, NOT the total for all questions listed in the paper. The `total_awarded_marks` MUST only sum the scores of the questions that are counted according to the choice rules.

Now, here is the data. Begin the evaluation.
"#;

/// Trailing note telling the model that page images follow the text.
const IMAGES_FOLLOW_NOTE: &str =
    "You will also receive the images for each page of the documents after this prompt. Refer to them for visual content.";

/// Assemble the full grading prompt from the three documents' extracted text.
///
/// Deterministic and side-effect free. When `model_answer_text` is `None`
/// the model-answer block is omitted entirely — no empty placeholder
/// markers are emitted.
pub fn build_prompt(
    question_paper_text: &str,
    answer_sheet_text: &str,
    model_answer_text: Option<&str>,
) -> String {
    let mut prompt = String::with_capacity(
        GRADING_INSTRUCTIONS.len()
            + question_paper_text.len()
            + answer_sheet_text.len()
            + model_answer_text.map_or(0, str::len)
            + 512,
    );

    prompt.push_str(GRADING_INSTRUCTIONS);

    prompt.push_str("\n[START QUESTION PAPER TEXT]\n");
    prompt.push_str(question_paper_text);
    prompt.push_str("\n[END QUESTION PAPER TEXT]\n");

    prompt.push_str("\n[START STUDENT ANSWER SHEET TEXT]\n");
    prompt.push_str(answer_sheet_text);
    prompt.push_str("\n[END STUDENT ANSWER SHEET TEXT]\n");

    if let Some(model_text) = model_answer_text {
        prompt.push_str("\n[START MODEL ANSWER KEY TEXT]\n");
        prompt.push_str(model_text);
        prompt.push_str("\n[END MODEL ANSWER KEY TEXT]\n");
    }

    prompt.push('\n');
    prompt.push_str(IMAGES_FOLLOW_NOTE);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_both_required_texts_between_markers() {
        let p = build_prompt("What is Rust? [10]", "A systems language.", None);
        assert!(p.contains("[START QUESTION PAPER TEXT]\nWhat is Rust? [10]\n[END QUESTION PAPER TEXT]"));
        assert!(p.contains(
            "[START STUDENT ANSWER SHEET TEXT]\nA systems language.\n[END STUDENT ANSWER SHEET TEXT]"
        ));
    }

    #[test]
    fn omits_model_answer_block_when_absent() {
        let p = build_prompt("q", "a", None);
        assert!(!p.contains("MODEL ANSWER KEY"));
    }

    #[test]
    fn includes_model_answer_block_when_present() {
        let p = build_prompt("q", "a", Some("gold standard answer"));
        assert!(p.contains(
            "[START MODEL ANSWER KEY TEXT]\ngold standard answer\n[END MODEL ANSWER KEY TEXT]"
        ));
    }

    #[test]
    fn encodes_choice_scoring_rules() {
        let p = build_prompt("q", "a", None);
        assert!(p.contains("Section-level Choices"));
        assert!(p.contains("Internal Question Choices"));
        assert!(p.contains("only the higher-scoring answer was marked"));
        assert!(p.contains("total_max_marks_based_on_choices"));
    }

    #[test]
    fn encodes_mark_extraction_patterns() {
        let p = build_prompt("q", "a", None);
        assert!(p.contains("`[10]`"));
        assert!(p.contains("`(10 marks)`"));
        assert!(p.contains("`Marks: 10`"));
    }

    #[test]
    fn answer_heading_keeps_typographic_apostrophe() {
        // The per-question template spells the heading with U+2019, and the
        // model reproduces the template literally.
        let p = build_prompt("q", "a", None);
        assert!(p.contains("📝 Student\u{2019}s Answer:"));
        assert!(!p.contains("Student's Answer:"));
    }

    #[test]
    fn output_format_uses_separator_lines() {
        let p = build_prompt("q", "a", None);
        assert!(p.contains("separated by a '---' line"));
        assert!(p.contains("\n---\n"));
    }

    #[test]
    fn deterministic_for_same_inputs() {
        assert_eq!(
            build_prompt("q", "a", Some("m")),
            build_prompt("q", "a", Some("m"))
        );
    }
}
