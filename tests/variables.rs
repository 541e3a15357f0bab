//! Variable accessors: info reads, indexable session variables and the
//! pre-action variant.
mod common;
use common::*;
use keiro::handlers::{InfoVariableHandler, SessionVariableHandler, VariableActionHandler};
use keiro::prelude::*;
use serde_json::{Value, json};

fn call(handler: &dyn Handler, state: &mut SessionState, value: Value) -> HandlerResult {
    let mut ctx = HandlerContext {
        state,
        stage: "reading",
    };
    handler
        .call(&args(value), &mut ctx)
        .expect("Variable handlers should not fail")
}

#[cfg(test)]
mod variable_tests {
    use super::*;

    #[test]
    fn test_book_chapter_needs_clarification_until_index_is_valid() {
        let mut state = SessionState::from_config(&tutoring_config());

        let first = call(&SessionVariableHandler, &mut state, json!({"variable_name": "book"}));
        assert_eq!(first.status, Status::Clarification);
        assert!(first.message.as_deref().unwrap().contains("0-2"));
        assert_eq!(first.data.as_ref().unwrap()["valid_range"], json!([0, 2]));

        let out_of_range = call(
            &SessionVariableHandler,
            &mut state,
            json!({"variable_name": "book", "current_index": 5}),
        );
        assert_eq!(out_of_range, first);

        let chosen = call(
            &SessionVariableHandler,
            &mut state,
            json!({"variable_name": "book", "current_index": 1}),
        );
        assert!(chosen.is_success());
        let data = chosen.data.unwrap();
        assert_eq!(data["current_chapters"], json!("Beppo"));
        assert_eq!(data["title"], json!("Momo"));
        assert!(data.get("chapters").is_none());
        assert!(data.get("indexable_by").is_none());

        assert_eq!(state.session_variables["book"]["current_index"], json!(1));
    }

    #[test]
    fn test_stored_index_is_used_when_none_is_given() {
        let mut state = SessionState::from_config(&tutoring_config());
        call(
            &SessionVariableHandler,
            &mut state,
            json!({"variable_name": "book", "current_index": 2}),
        );

        let again = call(&SessionVariableHandler, &mut state, json!({"variable_name": "book"}));
        assert!(again.is_success());
        assert_eq!(again.data.unwrap()["current_chapters"], json!("Gigi"));
    }

    #[test]
    fn test_camel_case_cursor_keys_are_read() {
        let mut state = SessionState::default();
        state.session_variables.insert(
            "course".to_string(),
            json!({"indexableBy": "units", "units": ["a", "b"], "currentIndex": 1}),
        );

        let result = call(&SessionVariableHandler, &mut state, json!({"variableName": "course"}));
        assert_eq!(result.data.unwrap()["current_units"], json!("b"));

        call(
            &SessionVariableHandler,
            &mut state,
            json!({"variableName": "course", "currentIndex": 0}),
        );
        let stored = &state.session_variables["course"];
        assert_eq!(stored["current_index"], json!(0));
        assert!(stored.get("currentIndex").is_none());
    }

    #[test]
    fn test_negative_or_fractional_index_needs_clarification() {
        let mut state = SessionState::from_config(&tutoring_config());
        for bad in [json!(-1), json!(1.5), json!("1")] {
            let result = call(
                &SessionVariableHandler,
                &mut state,
                json!({"variable_name": "book", "current_index": bad}),
            );
            assert!(result.is_clarification());
        }
        assert!(state.session_variables["book"].get("current_index").is_none());
    }

    #[test]
    fn test_whole_float_index_is_accepted() {
        let mut state = SessionState::from_config(&tutoring_config());
        let result = call(
            &SessionVariableHandler,
            &mut state,
            json!({"variable_name": "book", "current_index": 1.0}),
        );
        assert!(result.is_success());
        assert_eq!(result.data.unwrap()["current_chapters"], json!("Beppo"));
        assert_eq!(state.session_variables["book"]["current_index"], json!(1));

        let too_far = call(
            &SessionVariableHandler,
            &mut state,
            json!({"variable_name": "book", "current_index": 3.0}),
        );
        assert!(too_far.is_clarification());
    }

    #[test]
    fn test_empty_collection_is_an_error() {
        let mut state = SessionState::default();
        state.session_variables.insert(
            "book".to_string(),
            json!({"indexable_by": "chapters", "chapters": []}),
        );

        let result = call(&SessionVariableHandler, &mut state, json!({"variable_name": "book"}));
        assert_eq!(result.status, Status::Error);
    }

    #[test]
    fn test_plain_session_variable_is_returned_whole() {
        let mut state = SessionState::default();
        state
            .session_variables
            .insert("level".to_string(), json!({"name": "B1"}));

        let result = call(&SessionVariableHandler, &mut state, json!({"variable_name": "level"}));
        assert_eq!(result.data, Some(json!({"name": "B1"})));
    }

    #[test]
    fn test_missing_variables_and_arguments_are_errors() {
        let mut state = SessionState::from_config(&tutoring_config());

        for handler in [
            &InfoVariableHandler as &dyn Handler,
            &SessionVariableHandler,
            &VariableActionHandler,
        ] {
            let unknown = call(handler, &mut state, json!({"variable_name": "nope"}));
            assert_eq!(unknown.status, Status::Error);

            let no_name = call(handler, &mut state, json!({}));
            assert_eq!(no_name.status, Status::Error);
        }
    }

    #[test]
    fn test_info_reads_do_not_change_state() {
        let mut state = SessionState::from_config(&tutoring_config());
        let before = state.clone();

        let result = call(&InfoVariableHandler, &mut state, json!({"variable_name": "learner_name"}));
        assert_eq!(result.data, Some(json!("Ada")));
        assert_eq!(state, before);
    }

    #[test]
    fn test_action_variant_prefers_session_variables_and_renders_a_line() {
        let mut state = SessionState::from_config(&tutoring_config());

        let info = call(&VariableActionHandler, &mut state, json!({"variable_name": "learner_name"}));
        assert_eq!(info.message.as_deref(), Some("learner_name: \"Ada\""));

        let book = call(
            &VariableActionHandler,
            &mut state,
            json!({"variable_name": "book", "current_index": 0}),
        );
        assert!(book.is_success());
        assert!(book.message.unwrap().starts_with("book: "));

        let mut fresh = SessionState::from_config(&tutoring_config());
        let pending = call(&VariableActionHandler, &mut fresh, json!({"variable_name": "book"}));
        assert!(pending.is_clarification());
        assert!(pending.message.unwrap().contains("current_index"));
    }
}
