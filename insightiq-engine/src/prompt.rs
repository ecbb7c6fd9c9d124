//! Prompt construction and response cleanup
//!
//! Pure functions: the next prompt is always computed from the question and
//! the last attempt record, never from mutable loop state.

use insightiq_core::{schema::schema_lines, Attempt, AttemptFailure, SchemaMap};

/// Substring the model is instructed to emit when a question cannot be
/// answered from the schema.
pub const UNANSWERABLE_SENTINEL: &str = "ERROR";

const BASE_INSTRUCTIONS: &str = "\
You are an expert Data Scientist and SQL developer.
Your task is to convert the user's natural language question into a valid SQL query for a PostgreSQL database.";

const BASE_RULES: &str = "\
Rules:
1. Return ONLY the raw SQL code. Do not wrap it in markdown.
2. If the question cannot be answered, return \"ERROR: Cannot answer\".
3. Use READ-ONLY queries (SELECT).";

/// Build the first prompt: instructions, the selected slice of the schema,
/// and the question.
pub fn initial_prompt(schema: &SchemaMap, selected: &[String], question: &str) -> String {
    format!(
        "{}\n\nHere is the Database Schema:\n{}\n\n{}\n\nUser Question: {}",
        BASE_INSTRUCTIONS,
        schema_lines(schema, selected),
        BASE_RULES,
        question
    )
}

/// Build the correction prompt from a failed attempt: the original question,
/// the SQL that failed, and the exact database error.
pub fn correction_prompt(question: &str, sql: &str, error: &str) -> String {
    format!(
        "The SQL query you generated caused an error.\n\
         Original Question: {}\n\
         Your SQL: {}\n\
         Error Message: {}\n\n\
         Task: Correct the SQL query to fix the error. Return ONLY the fixed SQL.",
        question, sql, error
    )
}

/// The prompt for the next iteration, as a pure function of the attempt
/// history.
///
/// An execution failure yields a correction prompt; a model-call failure
/// produced no SQL to correct, so the prompt that call was given is retried
/// as-is, keeping any correction context from earlier attempts.
pub fn next_prompt(initial: &str, question: &str, last_attempt: Option<&Attempt>) -> String {
    match last_attempt {
        Some(attempt) => match &attempt.failure {
            AttemptFailure::Execution { sql, error } => correction_prompt(question, sql, error),
            AttemptFailure::ModelCall { .. } => attempt.prompt.clone(),
        },
        None => initial.to_string(),
    }
}

/// Strip markdown code-fence markers from a model response.
///
/// Models wrap SQL in ```sql fences despite instructions; the fences are
/// removed wherever they appear and the result is trimmed.
pub fn clean_sql(text: &str) -> String {
    text.replace("```sql", "").replace("```", "").trim().to_string()
}

/// Whether a cleaned response is the unanswerable sentinel.
pub fn is_unanswerable(sql: &str) -> bool {
    sql.contains(UNANSWERABLE_SENTINEL)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> SchemaMap {
        let mut schema = SchemaMap::new();
        schema.insert(
            "Customer".to_string(),
            vec!["CustomerId".to_string(), "FirstName".to_string()],
        );
        schema.insert("Invoice".to_string(), vec!["InvoiceId".to_string()]);
        schema
    }

    #[test]
    fn test_initial_prompt_includes_selected_schema_and_question() {
        let schema = sample_schema();
        let prompt = initial_prompt(&schema, &["Customer".to_string()], "Top 3 customers");
        assert!(prompt.contains("Table Customer: CustomerId, FirstName"));
        assert!(!prompt.contains("Table Invoice"));
        assert!(prompt.contains("User Question: Top 3 customers"));
        assert!(prompt.contains("READ-ONLY"));
    }

    #[test]
    fn test_correction_prompt_carries_exact_error() {
        let prompt = correction_prompt(
            "full names of employees",
            "SELECT First_Name FROM Employee",
            "column \"First_Name\" does not exist",
        );
        assert!(prompt.contains("Your SQL: SELECT First_Name FROM Employee"));
        assert!(prompt.contains("column \"First_Name\" does not exist"));
        assert!(prompt.contains("Original Question: full names of employees"));
    }

    #[test]
    fn test_next_prompt_after_execution_failure_is_correction() {
        let attempt = Attempt {
            prompt: "initial".to_string(),
            failure: AttemptFailure::Execution {
                sql: "SELECT x".to_string(),
                error: "boom".to_string(),
            },
        };
        let next = next_prompt("initial", "q", Some(&attempt));
        assert!(next.contains("caused an error"));
        assert!(next.contains("boom"));
    }

    #[test]
    fn test_next_prompt_after_model_failure_retries_same_prompt() {
        // The failed call's own prompt is re-sent, not the initial one, so a
        // correction prompt survives an interleaved model failure.
        let attempt = Attempt {
            prompt: "correction".to_string(),
            failure: AttemptFailure::ModelCall {
                reason: "timeout".to_string(),
            },
        };
        assert_eq!(next_prompt("initial", "q", Some(&attempt)), "correction");
        assert_eq!(next_prompt("initial", "q", None), "initial");
    }

    #[test]
    fn test_clean_sql_strips_fences() {
        assert_eq!(clean_sql("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(is_unanswerable("ERROR: Cannot answer"));
        assert!(!is_unanswerable("SELECT * FROM Customer"));
    }
}
