use super::*;

#[test]
fn start_narration_picks_voice_and_plan() {
    let mut narrator = NullNarrator::with_voices(vec![
        VoiceInfo::new("Anna", "de"),
        VoiceInfo::new("Google US English", "en-US"),
    ]);
    let plan = start_narration(&mut narrator, &NarrationScript::room_213(), 60.0).unwrap();
    assert_eq!(plan.rate, 1.4);

    let (spoken, voice) = &narrator.spoken()[0];
    assert_eq!(spoken, &plan);
    assert_eq!(voice.as_ref().unwrap().name, "Google US English");
}

#[test]
fn speaking_again_cancels_previous_utterance() {
    let mut narrator = NullNarrator::new();
    let script = NarrationScript::room_213();
    start_narration(&mut narrator, &script, 60.0).unwrap();
    start_narration(&mut narrator, &script, 30.0).unwrap();
    assert_eq!(narrator.spoken().len(), 2);
    assert_eq!(narrator.stops(), 2);
    assert!(narrator.spoken()[1].1.is_none());
}

#[test]
fn espeak_command_carries_plan_arguments() {
    let plan = NarrationPlan::new(&NarrationScript::room_213(), 60.0).unwrap();
    let narrator = EspeakNarrator::with_binary("espeak-ng").writing_wav("out/n.wav");
    let voice = VoiceInfo::new("English (Great Britain)", "en-gb");
    let cmd = narrator.command(&plan, Some(&voice));
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        args,
        [
            "-v", "en-gb", "-s", "245", "-p", "45", "-a", "100", "-w", "out/n.wav", "--stdin"
        ]
    );
}

#[test]
fn missing_espeak_has_no_voices_and_cannot_speak() {
    let bin = std::env::temp_dir().join(format!("room213-no-espeak-{}", std::process::id()));
    let mut narrator = EspeakNarrator::with_binary(&bin);
    assert!(narrator.voices().is_empty());
    let plan = NarrationPlan::new(&NarrationScript::room_213(), 60.0).unwrap();
    assert!(narrator.speak(&plan, None).is_err());
    assert!(narrator.wait().is_ok());
}
