//! Configuration loading and validation.

use std::io::Write;

use noctra_landing::config::Configuration;

#[test]
fn kebab_case_yaml_round_trips_through_a_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "point-field:\n  points: 500\n  tunnel-length: 120.0\npalette:\n  near: \"#112233\"\nchallenge:\n  passphrase: SESAME\n"
    )
    .unwrap();

    let cfg = Configuration::from_yaml_file(file.path())
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.point_field.points, 500);
    assert_eq!(cfg.point_field.tunnel_length, 120.0);
    assert_eq!(cfg.palette.near, "#112233");
    assert_eq!(cfg.challenge.passphrase, "SESAME");
    // Untouched sections keep their defaults.
    assert_eq!(cfg.post.bloom_threshold, 0.2);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Configuration::from_yaml_str("point-field:\n  pionts: 10\n");
    assert!(err.is_err());
}

#[test]
fn empty_passphrase_fails_validation() {
    let cfg = Configuration::from_yaml_str("challenge:\n  passphrase: \"  \"\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn excessive_point_count_fails_validation() {
    let cfg = Configuration::from_yaml_str("point-field:\n  points: 1000000\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn palette_weights_must_stay_fractional() {
    let cfg =
        Configuration::from_yaml_str("palette:\n  hostile-weight: 0.8\n  highlight-weight: 0.5\n")
            .unwrap();
    assert!(cfg.validated().is_err());
}
