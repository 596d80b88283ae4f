use goalstore_core::extract_tasks;

#[test]
fn short_lines_are_dropped_even_when_duplicated() {
    let tasks = extract_tasks("1. Buy milk\n2. buy MILK\n3. Schedule dentist appointment");
    assert_eq!(tasks, vec!["Schedule dentist appointment".to_string()]);
}

#[test]
fn duplicates_collapse_case_insensitively_in_first_seen_order() {
    let tasks = extract_tasks(
        "1. Buy running shoes\n2. Register for the race\n3. buy RUNNING shoes\n4. Stretch every morning",
    );
    assert_eq!(
        tasks,
        vec![
            "Buy running shoes".to_string(),
            "Register for the race".to_string(),
            "Stretch every morning".to_string(),
        ]
    );
}

#[test]
fn mixed_markers_and_markdown_are_cleaned() {
    let text = "Here is your plan:\n\
                - **Week 1:** Set up a study schedule\n\
                * Read chapter one of the textbook\n\
                • Summarise notes in `notes.md`\n\
                → Review flashcards before bed\n\
                10. ### Take the practice exam";
    assert_eq!(
        extract_tasks(text),
        vec![
            "Here is your plan:".to_string(),
            "Week 1: Set up a study schedule".to_string(),
            "Read chapter one of the textbook".to_string(),
            "Summarise notes in notes.md".to_string(),
            "Review flashcards before bed".to_string(),
            "Take the practice exam".to_string(),
        ]
    );
}

#[test]
fn multi_line_items_keep_continuation_text() {
    let tasks = extract_tasks("1. Draft the introduction\n   with three key claims\n2. Ask a friend to proofread");
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].starts_with("Draft the introduction"));
    assert!(tasks[0].ends_with("with three key claims"));
}

#[test]
fn empty_and_marker_free_input_never_fails() {
    assert!(extract_tasks("").is_empty());
    assert!(extract_tasks("   \n\n").is_empty());
    assert_eq!(
        extract_tasks("Just one long sentence without bullets"),
        vec!["Just one long sentence without bullets".to_string()]
    );
}

#[test]
fn numbers_without_trailing_space_are_not_markers() {
    let tasks = extract_tasks("- Save 2.5k for the trip\n- Book flights by March");
    assert_eq!(
        tasks,
        vec![
            "Save 2.5k for the trip".to_string(),
            "Book flights by March".to_string(),
        ]
    );
}
