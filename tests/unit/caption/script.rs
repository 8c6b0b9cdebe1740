use super::*;

#[test]
fn built_in_script_has_27_lines() {
    let s = NarrationScript::room_213();
    assert_eq!(s.len(), 27);
    assert!(!s.is_empty());
    assert_eq!(s.line(0), "I shouldn't have taken room two-thirteen.");
    assert_eq!(s.line(26), "And the lights finally go out.");
    assert_eq!(s.line(999), "And the lights finally go out.");
}

#[test]
fn combined_joins_with_spaces_and_counts_words() {
    let s = NarrationScript::new(["one two", "three"]).unwrap();
    assert_eq!(s.combined(), "one two three");
    assert_eq!(s.word_count(), 3);
    assert_eq!(NarrationScript::room_213().word_count(), 270);
}

#[test]
fn empty_and_blank_scripts_are_rejected() {
    assert!(NarrationScript::new(Vec::<String>::new()).is_err());
    let err = NarrationScript::new(["ok", "   "]).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn lines_are_trimmed() {
    let s = NarrationScript::new(["  padded  "]).unwrap();
    assert_eq!(s.lines(), &["padded".to_string()]);
}

#[test]
fn parse_accepts_json_and_plain_text() {
    let json = NarrationScript::parse(r#"["a b", "c"]"#).unwrap();
    assert_eq!(json.len(), 2);

    let plain = NarrationScript::parse("first\n\nsecond\n").unwrap();
    assert_eq!(plain.lines(), &["first".to_string(), "second".to_string()]);

    assert!(NarrationScript::parse(r#"["a", ""]"#).is_err());
    assert!(NarrationScript::parse("\n \n").is_err());
    assert!(NarrationScript::parse("[not json").is_err());
}
