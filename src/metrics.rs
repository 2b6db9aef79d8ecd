//! Human-readable descriptions of feedback keys.

/// Descriptions for the evaluators shipped with the agent evaluation jobs.
const METRIC_DESCRIPTIONS: [(&str, &str); 6] = [
    (
        "trajectory_unordered_match",
        "Measures if the agent called the correct tools regardless of order",
    ),
    (
        "trajectory_exact_match",
        "Measures if the agent called the exact sequence of tools",
    ),
    (
        "response_correctness",
        "LLM judge evaluation of response accuracy compared to reference",
    ),
    (
        "response_relevance",
        "LLM judge evaluation of response relevance to the question",
    ),
    (
        "tool_args_match_score",
        "Measures accuracy of tool names and arguments used",
    ),
    (
        "argument_correctness",
        "Evaluates if tool arguments match expected values",
    ),
];

const DEFAULT_DESCRIPTION: &str = "Custom evaluation metric";

/// Describe a feedback key. Never fails.
pub fn describe(key: &str) -> &'static str {
    if let Some(&(_, description)) = METRIC_DESCRIPTIONS.iter().find(|(k, _)| *k == key) {
        return description;
    }

    let key = key.to_lowercase();
    if key.contains("trajectory") {
        "Evaluates the sequence of tools called by the agent"
    } else if key.contains("correctness") || key.contains("accuracy") {
        "Evaluates response accuracy"
    } else if key.contains("relevance") {
        "Evaluates response relevance"
    } else if key.contains("tool") && key.contains("arg") {
        "Evaluates tool usage and arguments"
    } else {
        DEFAULT_DESCRIPTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_keys_use_table() {
        for (key, description) in METRIC_DESCRIPTIONS {
            assert_eq!(describe(key), description);
        }
    }

    #[test]
    fn test_exact_match_beats_heuristics() {
        // "argument_correctness" would otherwise hit the correctness heuristic.
        assert_eq!(
            describe("argument_correctness"),
            "Evaluates if tool arguments match expected values"
        );
    }

    #[test]
    fn test_heuristics_priority() {
        assert_eq!(
            describe("Trajectory_Accuracy"),
            "Evaluates the sequence of tools called by the agent"
        );
        assert_eq!(describe("accuracy"), "Evaluates response accuracy");
        assert_eq!(describe("answer_relevance"), "Evaluates response relevance");
        assert_eq!(
            describe("TOOL_ARG_overlap"),
            "Evaluates tool usage and arguments"
        );
        assert_eq!(describe("tool_selection"), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_describe_is_total() {
        for key in ["", " ", "latency_ms", "ü", "response_correctness_v2"] {
            assert!(!describe(key).is_empty(), "empty description for {:?}", key);
        }
    }
}
