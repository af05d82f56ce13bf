use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use form_spec::{
    Answer, Field, FieldGroup, Form, FormError, Operator, PromptError, ResultTree, ResultValue,
    ScriptedPrompter,
};

fn version_field() -> Field {
    Field::select("version", "Project Version").with_callback(|field, results| {
        if results.get("name").and_then(ResultValue::as_text) == Some("My Project") {
            field.set_keyed_options([("7", "7x"), ("8", "8x")]);
        } else {
            field.set_keyed_options([("11", "11x"), ("12", "12x")]);
        }
    })
}

fn ask_questions_field() -> Field {
    Field::boolean("questions", "Ask questions?").with_subform(|form, answer| {
        if answer.as_bool() == Some(true) {
            form.add_fields([
                Field::text("how_old", "How old are you?"),
                Field::text("location", "Where do you live?"),
            ]);
        }
    })
}

#[test]
fn text_field_collects_answer() {
    let mut form = Form::new().with_field(Field::text("name", "Name"));
    let mut prompter = ScriptedPrompter::new(["Steve Jobs"]);
    let results = form.process(&mut prompter).unwrap().results(true);
    assert_eq!(results.get("name"), Some(&ResultValue::from("Steve Jobs")));
}

#[test]
fn boolean_fields_store_booleans() {
    let mut form = Form::new()
        .with_field(Field::boolean("like_your_job", "Do you like your job?"))
        .with_field(Field::boolean("like_your_location", "Do you like your current location?"));
    let mut prompter = ScriptedPrompter::new(["yes", "no"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert_eq!(results.get("like_your_job"), Some(&ResultValue::Bool(true)));
    assert_eq!(results.get("like_your_location"), Some(&ResultValue::Bool(false)));
}

#[test]
fn select_field_stores_chosen_option() {
    let mut form = Form::new().with_field(
        Field::select("favorite_color", "Favorite color?").with_options(["red", "blue", "green"]),
    );
    let mut prompter = ScriptedPrompter::new(["blue"]);
    let results = form.process(&mut prompter).unwrap().results(true);
    assert_eq!(results.get("favorite_color"), Some(&ResultValue::from("blue")));
}

#[test]
fn select_without_options_fails_the_session() {
    let mut form = Form::new().with_field(Field::select("favorite_color", "Favorite color?"));
    let mut prompter = ScriptedPrompter::new(["blue"]);
    let err = form.process(&mut prompter).unwrap_err();
    assert!(matches!(err, FormError::Configuration { ref field, .. } if field == "favorite_color"));
    assert!(prompter.asked().is_empty());
}

#[test]
fn exhausted_required_field_aborts_with_validator_message() {
    let mut form = Form::new()
        .with_field(Field::text("project_name", "Project Name").with_required(true))
        .with_field(Field::text("other", "Other"));
    let mut prompter = ScriptedPrompter::new(["", "", "", "never asked"]);
    let err = form.process(&mut prompter).unwrap_err();
    assert_eq!(err.to_string(), "Field is required.");
    assert_eq!(err.field(), "project_name");
    assert!(matches!(
        err,
        FormError::Prompt {
            source: PromptError::AttemptsExhausted { attempts: 3, .. },
            ..
        }
    ));
    assert!(form.results(false).is_empty());
}

#[test]
fn empty_answers_take_declared_defaults() {
    let mut form = Form::new()
        .with_field(Field::text("project_name", "Project Name").with_default("Demo Project"))
        .with_field(Field::boolean("happiness", "Are you happy?").with_default(false))
        .with_field(
            Field::select("favorite_color", "Favorite color?")
                .with_options(["red", "blue", "green"])
                .with_default("green"),
        );
    let mut prompter = ScriptedPrompter::new(["", "", ""]);
    form.process(&mut prompter).unwrap();

    let results = form.results(false);
    assert_eq!(results.get("project_name"), Some(&ResultValue::from("Demo Project")));
    assert_eq!(results.get("happiness"), Some(&ResultValue::Bool(false)));
    assert_eq!(results.get("favorite_color"), Some(&ResultValue::from("green")));
    assert!(!form.results(true).contains_key("happiness"));
}

#[test]
fn normalizer_output_is_stored() {
    let mut form = Form::new()
        .with_field(
            Field::text("project_name", "Project Name")
                .with_normalizer(|value| value.to_lowercase().replace(' ', "-")),
        )
        .with_field(
            Field::boolean("confirm", "Confirm?").with_normalizer(|value| value.to_string()),
        );
    let mut prompter = ScriptedPrompter::new(["Hacker Box", "yes"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert_eq!(results.get("project_name"), Some(&ResultValue::from("hacker-box")));
    assert_eq!(results.get("confirm"), Some(&ResultValue::from("yes")));
}

#[test]
fn subform_result_replaces_parent_answer() {
    let mut form = Form::new().with_field(ask_questions_field());
    let mut prompter = ScriptedPrompter::new(["yes", "1000", "cave"]);
    let results = form.process(&mut prompter).unwrap().results(true);

    let nested = results.get("questions").and_then(ResultValue::as_tree).expect("nested tree");
    assert_eq!(nested.len(), 2);
    assert_eq!(nested.get("how_old"), Some(&ResultValue::from("1000")));
    assert_eq!(nested.get("location"), Some(&ResultValue::from("cave")));
    assert_eq!(results.get_path("questions.how_old"), Some(&ResultValue::from("1000")));
}

#[test]
fn declined_subform_stores_empty_tree() {
    let mut form = Form::new().with_field(ask_questions_field());
    let mut prompter = ScriptedPrompter::new(["no"]);
    form.process(&mut prompter).unwrap();
    assert_eq!(
        form.results(false).get("questions"),
        Some(&ResultValue::Tree(ResultTree::new()))
    );
    assert!(form.results(true).is_empty());
}

#[test]
fn subform_does_not_see_parent_results() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Name"))
        .with_field(Field::boolean("more", "More?").with_subform(|form, _| {
            form.add_field(Field::text("nickname", "Nickname").with_condition("name", "Steve"));
        }));
    let mut prompter = ScriptedPrompter::new(["Steve", "yes"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert_eq!(results.get("more"), Some(&ResultValue::Tree(ResultTree::new())));
    assert_eq!(prompter.asked(), ["name", "more"]);
}

#[test]
fn conditions_on_subform_answers_use_dotted_paths() {
    let mut form = Form::new()
        .with_field(ask_questions_field())
        .with_field(
            Field::text("cave_name", "Name of your cave?")
                .with_condition("questions.location", "cave"),
        )
        .with_field(
            Field::text("city", "Which city?").with_condition_op(
                "questions.location",
                "cave",
                Operator::NotEquals,
            ),
        );
    let mut prompter = ScriptedPrompter::new(["yes", "1000", "cave", "Batcave"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert_eq!(results.get("cave_name"), Some(&ResultValue::from("Batcave")));
    assert!(!results.contains_key("city"));
}

#[test]
fn condition_skips_field_when_unmet() {
    let mut form = Form::new()
        .with_field(Field::text("project_name", "Project Name"))
        .with_field(
            Field::text("project_version", "Project Version")
                .with_condition("project_name", "Demo"),
        );
    let mut prompter = ScriptedPrompter::new(["Demoooo", "8.x"]);
    let results = form.process(&mut prompter).unwrap().results(true);
    assert_eq!(results.get("project_name"), Some(&ResultValue::from("Demoooo")));
    assert!(!results.contains_key("project_version"));
    assert_eq!(prompter.remaining(), 1);
}

#[test]
fn every_condition_must_hold() {
    let mut form = Form::new()
        .with_field(Field::text("a", "A"))
        .with_field(Field::text("b", "B"))
        .with_field(
            Field::text("c", "C")
                .with_condition("a", "1")
                .with_condition("b", "2"),
        );
    let mut prompter = ScriptedPrompter::new(["1", "3", "unused"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert!(!results.contains_key("c"));

    let mut form = Form::new()
        .with_field(Field::text("a", "A"))
        .with_field(Field::text("b", "B"))
        .with_field(Field::text("c", "C").with_condition("a", "1").with_condition("b", "2"));
    let mut prompter = ScriptedPrompter::new(["1", "2", "asked"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert_eq!(results.get("c"), Some(&ResultValue::from("asked")));
}

#[test]
fn condition_on_later_field_sees_absent_value() {
    let mut form = Form::new()
        .with_field(Field::text("early", "Early").with_condition("late", "x"))
        .with_field(Field::text("late", "Late"));
    let mut prompter = ScriptedPrompter::new(["x", "x"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    assert!(!results.contains_key("early"));
    assert_eq!(results.get("late"), Some(&ResultValue::from("x")));
}

#[test]
fn callback_options_follow_earlier_answer() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Project Name"))
        .with_field(version_field());
    let mut prompter = ScriptedPrompter::new(["My Project", "8"]);
    let results = form.process(&mut prompter).unwrap().results(true);
    assert_eq!(results.get("version"), Some(&ResultValue::from("8")));
    assert_eq!(results.get("name"), Some(&ResultValue::from("My Project")));
}

#[test]
fn callback_options_reject_inactive_choices() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Project Name"))
        .with_field(version_field());
    let mut prompter = ScriptedPrompter::new(["Other Project", "8", "12"]);
    let results = form.process(&mut prompter).unwrap().results(true);
    assert_eq!(results.get("version"), Some(&ResultValue::from("12")));

    let mut form = Form::new()
        .with_field(Field::text("name", "Project Name"))
        .with_field(version_field().with_max_attempts(1));
    let mut prompter = ScriptedPrompter::new(["Other Project", "7"]);
    let err = form.process(&mut prompter).unwrap_err();
    assert!(err.to_string().contains("\"7\" is invalid"));
}

#[test]
fn process_is_memoized() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Project Name"))
        .with_field(Field::text("version", "Project Version"));
    let mut prompter = ScriptedPrompter::new(["Demoooo", "8.x"]);
    let first = form.process(&mut prompter).unwrap().results(false);
    let second = form.process(&mut prompter).unwrap().results(false);
    assert_eq!(first, second);
    assert_eq!(prompter.asked().len(), 2);
}

#[test]
fn filtered_results_hide_empty_answers() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Project Name"))
        .with_field(Field::text("version", "Project Version").with_required(false));
    let mut prompter = ScriptedPrompter::new(["Demoooo", ""]);
    form.process(&mut prompter).unwrap();
    assert_eq!(form.results(true).len(), 1);
    assert_eq!(form.results(false).len(), 2);
}

#[test]
fn non_interactive_prompter_skips_fields() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Project Name"))
        .with_field(ask_questions_field());
    let mut prompter = ScriptedPrompter::non_interactive();
    form.process(&mut prompter).unwrap();
    assert!(form.is_processed());
    assert!(form.results(false).is_empty());
    assert!(prompter.asked().is_empty());
}

#[test]
fn group_without_predicate_runs_once() {
    let mut form = Form::new().with_field(
        FieldGroup::new("servers")
            .with_fields([Field::text("host", "Host"), Field::text("port", "Port")]),
    );
    let mut prompter = ScriptedPrompter::new(["localhost", "8080", "extra"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    let iterations = results.get("servers").and_then(ResultValue::as_sequence).unwrap();
    assert_eq!(iterations.len(), 1);
    assert_eq!(iterations[0].get("port"), Some(&ResultValue::from("8080")));
    assert_eq!(prompter.remaining(), 1);
}

#[test]
fn group_keeps_iterations_while_predicate_holds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut form = Form::new().with_field(
        FieldGroup::new("items")
            .with_field(Field::text("item", "Item"))
            .with_loop_until(move |_| counter.fetch_add(1, Ordering::SeqCst) < 2),
    );
    let mut prompter = ScriptedPrompter::new(["a", "b", "c"]);
    let results = form.process(&mut prompter).unwrap().results(false);

    let iterations = results.get("items").and_then(ResultValue::as_sequence).unwrap();
    let items = iterations
        .iter()
        .map(|iteration| iteration.get("item").and_then(ResultValue::as_text).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(items, vec!["a", "b"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn group_discards_the_stopping_iteration() {
    let mut form = Form::new().with_field(
        FieldGroup::new("people")
            .with_field(Field::text("name", "Name"))
            .with_field(Field::boolean("add_another", "Add another?").with_default(false))
            .with_loop_until(|iteration| {
                iteration.get("add_another") == Some(&ResultValue::Bool(true))
            }),
    );
    let mut prompter = ScriptedPrompter::new(["one", "y", "two", ""]);
    let results = form.process(&mut prompter).unwrap().results(false);
    let people = results.get("people").and_then(ResultValue::as_sequence).unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].get("name"), Some(&ResultValue::from("one")));
}

#[test]
fn group_stopping_on_first_iteration_is_empty() {
    let mut form = Form::new().with_field(
        FieldGroup::new("items")
            .with_field(Field::text("item", "Item"))
            .with_loop_until(|_| false),
    );
    let mut prompter = ScriptedPrompter::new(["a"]);
    let results = form.process(&mut prompter).unwrap();
    assert_eq!(
        results.results(false).get("items"),
        Some(&ResultValue::Sequence(Vec::new()))
    );
    assert!(results.results(true).is_empty());
}

#[test]
fn group_iterations_do_not_share_context() {
    let mut form = Form::new().with_field(
        FieldGroup::new("entries")
            .with_field(Field::text("kind", "Kind"))
            .with_field(Field::text("detail", "Detail").with_condition("kind", "book"))
            .with_loop_until(|iteration| iteration.get("kind") == Some(&ResultValue::from("book"))),
    );
    let mut prompter = ScriptedPrompter::new(["book", "Dune", "film"]);
    let results = form.process(&mut prompter).unwrap().results(false);
    let entries = results.get("entries").and_then(ResultValue::as_sequence).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].get("detail"), Some(&ResultValue::from("Dune")));
    assert_eq!(prompter.asked(), ["kind", "detail", "kind"]);
}

#[test]
fn hidden_flag_reaches_the_question() {
    let field = Field::text("password", "Password").with_hidden(true);
    let question = field.question().unwrap();
    assert!(question.is_hidden());
    assert_eq!(question.resolve("s3cret"), Ok(Answer::from("s3cret")));
}

#[test]
fn non_interactive_group_runs_once_even_when_predicate_holds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut form = Form::new().with_field(
        FieldGroup::new("items")
            .with_field(Field::text("item", "Item"))
            .with_loop_until(move |iteration| {
                counter.fetch_add(1, Ordering::SeqCst);
                !iteration.contains_key("stop")
            }),
    );
    let mut prompter = ScriptedPrompter::non_interactive();
    let results = form.process(&mut prompter).unwrap().results(false);

    let iterations = results.get("items").and_then(ResultValue::as_sequence).unwrap();
    assert_eq!(iterations.len(), 1);
    assert!(iterations[0].is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn float_words_match_conditions_as_text() {
    let mut form = Form::new()
        .with_field(Field::text("name", "Name"))
        .with_field(Field::text("greeting", "Greeting").with_condition("name", "Nan"));
    let mut prompter = ScriptedPrompter::new(["Nan", "Hello"]);
    let results = form.process(&mut prompter).unwrap().results(true);
    assert_eq!(results.get("greeting"), Some(&ResultValue::from("Hello")));
    assert_eq!(prompter.asked(), ["name", "greeting"]);
}

#[test]
fn subform_keeps_empty_entries_under_filtered_view() {
    let mut form = Form::new().with_field(Field::boolean("extras", "Extras?").with_subform(
        |form, answer| {
            if answer.as_bool() == Some(true) {
                form.add_fields([
                    Field::text("note", "Note").with_required(false),
                    Field::boolean("newsletter", "Newsletter?").with_default(false),
                ]);
            }
        },
    ));
    let mut prompter = ScriptedPrompter::new(["yes", "", ""]);
    let results = form.process(&mut prompter).unwrap().results(true);

    let nested = results.get("extras").and_then(ResultValue::as_tree).expect("nested tree");
    assert_eq!(nested.get("note"), Some(&ResultValue::from("")));
    assert_eq!(nested.get("newsletter"), Some(&ResultValue::Bool(false)));
}
