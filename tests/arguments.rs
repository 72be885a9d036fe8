//! Command argument parsing and resolution tests.

use playblast::{CommandArguments, PlayblastError, SYNTAX, Time, WriterBackend};

fn resolve(tokens: &[&str]) -> Result<playblast::CaptureConfig, PlayblastError> {
    CommandArguments::parse(tokens)?.resolve()
}

// ── Defaults ───────────────────────────────────────────────────────

#[test]
fn filename_alone_takes_every_default() {
    let config = resolve(&["-f", "out"]).unwrap();

    assert_eq!(config.output_path_stem(), "out");
    assert_eq!(config.start_frame(), Time::new(0.0));
    assert_eq!(config.end_frame(), Time::new(1.0));
    assert_eq!(config.image_size(), (0, 0));
    assert_eq!(config.size_override(), None);
    assert_eq!(config.writer(), WriterBackend::Native);
}

#[test]
fn missing_filename_is_the_only_hard_failure() {
    let result = resolve(&["-sf", "1", "-ef", "10", "-is", "640", "480"]);
    match result {
        Err(PlayblastError::MissingRequiredArgument(flag)) => assert_eq!(flag, "-filename"),
        other => panic!("Expected MissingRequiredArgument, got: {other:?}"),
    }

    let empty = resolve(&[]);
    assert!(matches!(empty, Err(PlayblastError::MissingRequiredArgument(_))));
}

// ── Flag forms ─────────────────────────────────────────────────────

#[test]
fn short_and_long_forms_are_equivalent() {
    let short = resolve(&["-f", "a", "-sf", "5", "-ef", "9", "-is", "320", "240", "-uo"]).unwrap();
    let long = resolve(&[
        "-filename",
        "a",
        "-startFrame",
        "5",
        "-endFrame",
        "9",
        "-imageSize",
        "320",
        "240",
        "-useOIIO",
    ])
    .unwrap();

    assert_eq!(format!("{short:?}"), format!("{long:?}"));
    assert_eq!(short.frame_count(), 5);
    assert_eq!(short.size_override(), Some((320, 240)));
    assert_eq!(short.writer(), WriterBackend::External);
}

#[test]
fn time_values_accept_fractions_and_negatives() {
    let config = resolve(&["-f", "a", "-sf", "-2.5", "-ef", "1001.0"]).unwrap();
    assert_eq!(config.start_frame(), Time::new(-2.5));
    assert_eq!(config.end_frame(), Time::new(1001.0));
}

#[test]
fn external_writer_flag_takes_an_optional_value() {
    let explicit_off = resolve(&["-f", "a", "-uo", "false"]).unwrap();
    assert_eq!(explicit_off.writer(), WriterBackend::Native);

    let explicit_on = resolve(&["-f", "a", "-useOIIO", "on"]).unwrap();
    assert_eq!(explicit_on.writer(), WriterBackend::External);

    let trailing = resolve(&["-f", "a", "-uo"]).unwrap();
    assert_eq!(trailing.writer(), WriterBackend::External);
}

#[test]
fn zero_image_size_means_no_override() {
    let config = resolve(&["-f", "a", "-is", "0", "1080"]).unwrap();
    assert_eq!(config.image_size(), (0, 1080));
    assert_eq!(config.size_override(), None);
}

#[test]
fn parse_keeps_unset_flags_empty() {
    let arguments = CommandArguments::parse(["-ef", "12"]).unwrap();
    assert_eq!(
        arguments,
        CommandArguments {
            end_frame: Some(Time::new(12.0)),
            ..CommandArguments::default()
        }
    );
}

// ── Malformed input ────────────────────────────────────────────────

#[test]
fn unknown_flag_is_rejected() {
    let result = CommandArguments::parse(["-f", "out", "-quality", "100"]);
    assert!(matches!(result, Err(PlayblastError::UnknownFlag(flag)) if flag == "-quality"));
}

#[test]
fn flag_without_value_is_rejected() {
    let result = CommandArguments::parse(["-f"]);
    assert!(matches!(result, Err(PlayblastError::MissingFlagValue { flag }) if flag == "-f"));

    let result = CommandArguments::parse(["-f", "out", "-is", "640"]);
    assert!(matches!(result, Err(PlayblastError::MissingFlagValue { flag }) if flag == "-is"));
}

#[test]
fn unparsable_values_are_rejected() {
    let time = CommandArguments::parse(["-sf", "first"]);
    match time {
        Err(PlayblastError::InvalidArgument { flag, value, .. }) => {
            assert_eq!(flag, "-sf");
            assert_eq!(value, "first");
        }
        other => panic!("Expected InvalidArgument, got: {other:?}"),
    }

    let infinite = CommandArguments::parse(["-ef", "inf"]);
    assert!(matches!(infinite, Err(PlayblastError::InvalidArgument { .. })));

    let negative_size = CommandArguments::parse(["-is", "-640", "480"]);
    assert!(matches!(negative_size, Err(PlayblastError::InvalidArgument { flag, .. }) if flag == "-is"));
}

#[test]
fn ranges_too_wide_to_step_are_rejected() {
    match resolve(&["-f", "o", "-sf", "-1e20", "-ef", "1e20"]) {
        Err(PlayblastError::InvalidArgument { flag, value, .. }) => {
            assert_eq!(flag, "-endFrame");
            assert_eq!(value, Time::new(1e20).to_string());
        }
        other => panic!("Expected InvalidArgument, got: {other:?}"),
    }

    let widest = resolve(&["-f", "o", "-sf", "0", "-ef", "9007199254740992"]).unwrap();
    assert_eq!(widest.frame_count(), 9_007_199_254_740_993);
}

#[test]
fn syntax_lists_every_flag_once() {
    let mut shorts: Vec<&str> = SYNTAX.iter().map(|flag| flag.short).collect();
    shorts.sort_unstable();
    shorts.dedup();
    assert_eq!(shorts.len(), SYNTAX.len());
    assert!(SYNTAX.iter().any(|flag| flag.long == "-useOIIO"));
}
