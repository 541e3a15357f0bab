//! The built-in progress handler (`general_handler`).
mod common;
use common::*;
use keiro::handlers::ProgressHandler;
use keiro::prelude::*;
use serde_json::json;

fn call(state: &mut SessionState, stage: &str, value: serde_json::Value) -> HandlerResult {
    let mut ctx = HandlerContext { state, stage };
    ProgressHandler
        .call(&args(value), &mut ctx)
        .expect("Progress handler should not fail")
}

#[cfg(test)]
mod progress_tests {
    use super::*;

    #[test]
    fn test_completing_intro_follows_the_default_target() {
        let mut state = SessionState::from_config(&tutoring_config());

        let result = call(&mut state, "intro", json!({"greeted": true}));

        assert_eq!(result.status, Status::Success);
        assert_eq!(result.message.as_deref(), Some("Welcome aboard!"));
        assert_eq!(result.next_node.as_deref(), Some("reading"));
        assert_eq!(result.checklist.unwrap()["greeted"], true);
    }

    #[test]
    fn test_incomplete_checklist_lists_missing_items_in_order() {
        let mut state = SessionState::from_config(&tutoring_config());

        let result = call(&mut state, "reading", json!({"score": 3}));

        assert_eq!(result.status, Status::Error);
        assert_eq!(
            result.message.as_deref(),
            Some("Still to do: chapter_chosen, summary_given")
        );
        assert!(result.next_node.is_none());

        let result = call(&mut state, "reading", json!({"summary_given": true}));
        assert_eq!(result.message.as_deref(), Some("Still to do: chapter_chosen"));
        let checklist = result.checklist.unwrap();
        assert_eq!(checklist["summary_given"], true);
        assert_eq!(checklist["chapter_chosen"], false);
    }

    #[test]
    fn test_info_values_are_overwritten_and_unknown_keys_ignored() {
        let mut state = SessionState::from_config(&tutoring_config());

        call(
            &mut state,
            "reading",
            json!({"score": 7, "favorite_color": "green"}),
        );

        assert_eq!(state.info["score"], json!(7));
        assert!(!state.info.contains_key("favorite_color"));
    }

    #[test]
    fn test_empty_arguments_change_nothing() {
        let mut state = SessionState::from_config(&tutoring_config());
        call(&mut state, "reading", json!({"summary_given": true}));
        let before = state.clone();

        for _ in 0..3 {
            let result = call(&mut state, "reading", json!({}));
            assert_eq!(result.status, Status::Error);
            assert_eq!(state, before);
        }
    }

    #[test]
    fn test_empty_checklist_completes_immediately() {
        let mut state = SessionState::from_config(&tutoring_config());
        state.stage_mut("review").unwrap().checklist.clear();

        let result = call(&mut state, "review", json!({}));
        assert!(result.is_success());
        assert_eq!(result.next_node.as_deref(), Some("end"));
    }

    #[test]
    fn test_ticked_items_are_never_unticked() {
        let mut state = SessionState::from_config(&tutoring_config());
        call(&mut state, "reading", json!({"chapter_chosen": true}));

        for falsy in [json!(false), json!(0), json!(""), json!(null), json!([])] {
            call(&mut state, "reading", json!({"chapter_chosen": falsy}));
            assert!(state.stage("reading").unwrap().checklist["chapter_chosen"]);
        }
    }

    #[test]
    fn test_truthy_non_boolean_values_tick_items() {
        let mut state = SessionState::from_config(&tutoring_config());
        call(&mut state, "reading", json!({"chapter_chosen": "Beppo", "summary_given": 1}));
        assert!(state.stage("reading").unwrap().is_complete());
    }

    #[test]
    fn test_complete_stage_uses_first_matching_condition() {
        let mut state = SessionState::from_config(&tutoring_config());

        let result = call(
            &mut state,
            "reading",
            json!({"chapter_chosen": true, "summary_given": true, "score": 9}),
        );

        assert_eq!(result.message.as_deref(), Some("Great reading!"));
        assert_eq!(result.next_node.as_deref(), Some("end"));
    }

    #[test]
    fn test_unknown_stage_is_a_handler_error() {
        let mut state = SessionState::from_config(&tutoring_config());
        let before = state.clone();
        let mut ctx = HandlerContext {
            state: &mut state,
            stage: "quiz",
        };
        let err = ProgressHandler
            .call(&args(json!({"x": 1, "score": 9})), &mut ctx)
            .unwrap_err();
        assert_eq!(err, HandlerError::UnknownStage("quiz".to_string()));
        assert_eq!(state, before);
    }

    #[test]
    fn test_evaluation_failure_names_the_stage() {
        let mut state = SessionState::from_config(&tutoring_config());
        state.info.shift_remove("score");
        let mut ctx = HandlerContext {
            state: &mut state,
            stage: "reading",
        };

        let err = ProgressHandler
            .call(
                &args(json!({"chapter_chosen": true, "summary_given": true})),
                &mut ctx,
            )
            .unwrap_err();
        assert_eq!(
            err,
            HandlerError::Evaluation {
                stage: "reading".to_string(),
                source: EvaluationError::MissingVariable("score".to_string()),
            }
        );
    }

    #[test]
    fn test_result_serializes_without_next_node() {
        let mut state = SessionState::from_config(&tutoring_config());
        let result = call(&mut state, "intro", json!({"greeted": true}));
        assert_eq!(
            result.to_json(),
            json!({
                "status": "success",
                "message": "Welcome aboard!",
                "checklist": {"greeted": true}
            })
        );
    }
}
