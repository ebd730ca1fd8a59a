//! Prompt text for each directive.

use std::fmt::Write;

use crate::config::{OPTIONS_PER_QUESTION, TEST_QUESTION_COUNT};

use super::Directive;

pub(super) fn render(source: &str, directive: Directive<'_>) -> String {
    match directive {
        Directive::Question {
            topic,
            previous_question,
        } => {
            let mut prompt = format!(
                "You are a tutor helping a student study the document below.\n\n\
                 Document:\n'{source}'\n\n\
                 Topic of interest: '{topic}'.\n\n\
                 Write ONE short flashcard question that tests a key concept of the document.\n\
                 Do not include the answer. Output plain text only, no HTML.\n"
            );
            if !previous_question.is_empty() {
                let _ = writeln!(
                    prompt,
                    "The previous question was '{previous_question}'; ask something different."
                );
            }
            prompt
        }
        Directive::Answer { question } => format!(
            "You are a tutor helping a student study the document below.\n\n\
             Document:\n'{source}'\n\n\
             Flashcard question: '{question}'\n\n\
             Give an accurate answer in plain text. No labels such as 'Answer:' and no HTML.\n"
        ),
        Directive::Simplify { answer } => format!(
            "You are a tutor. The student did not understand this answer:\n\n'{answer}'\n\n\
             Using the document below, explain it again in simpler words, step by step, \
             without jargon. Plain text only, no HTML.\n\n\
             Document:\n'{source}'\n"
        ),
        Directive::Insights {
            score,
            total,
            wrong_items,
        } => {
            let mut prompt = format!(
                "You are a tutor. A student scored {score}/{total} on a multiple-choice test.\n\
                 Give learning insights in plain text, no HTML.\n"
            );
            if wrong_items.is_empty() {
                prompt.push_str("No specific wrong questions were recorded.\n");
            } else {
                prompt.push_str("They answered these questions incorrectly:\n");
                for item in wrong_items {
                    let given = item.given_answer.as_deref().unwrap_or("(no answer)");
                    let _ = writeln!(prompt, "Question: {}\nTheir answer: {}", item.question, given);
                }
                prompt.push_str("Analyze the mistakes and suggest what to review.\n");
            }
            prompt
        }
    }
}

pub(super) fn render_test_set(source: &str) -> String {
    format!(
        "Write {TEST_QUESTION_COUNT} multiple-choice questions about this document:\n\n\
         '{source}'\n\n\
         Respond with a JSON array of objects with the keys:\n\
         \x20 'question': the question in plain text,\n\
         \x20 'options': a list of {OPTIONS_PER_QUESTION} possible answers in plain text,\n\
         \x20 'correct': the correct option, copied exactly from 'options'.\n\
         Respond with the JSON array only."
    )
}
