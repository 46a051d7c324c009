use std::io::Write;

#[test]
fn config_command_renders_redacted_effective_values() {
    let mut file = tempfile::NamedTempFile::new().expect("temp config");
    write!(
        file,
        "[source]\nbase_url = \"https://aggregator.internal\"\nbearer_token = \"bearer-aaaa-bbbb-cccc\"\n\n[verticals.home]\npoll_interval_secs = 7\n"
    )
    .expect("write config");

    let output = premia_cli::commands::config::run(Some(file.path().to_path_buf()));

    assert!(output.contains("source.base_url = https://aggregator.internal"));
    assert!(output.contains("verticals.home = interval 7s"));
    assert!(!output.contains("aaaa-bbbb"), "bearer token must be redacted");
}

#[test]
fn config_command_reports_validation_failures_readably() {
    let mut file = tempfile::NamedTempFile::new().expect("temp config");
    write!(file, "[verticals.health]\npoll_interval_secs = 0\n").expect("write config");

    let output = premia_cli::commands::config::run(Some(file.path().to_path_buf()));

    assert!(output.contains("config validation failed"));
    assert!(output.contains("health"));
}

#[test]
fn verticals_command_emits_machine_readable_presets() {
    let output = premia_cli::commands::verticals::run();
    let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid JSON");
    let presets = parsed.as_array().expect("array of presets");

    let motor_liability = presets
        .iter()
        .find(|preset| preset["vertical"] == "motor_liability")
        .expect("motor_liability preset");
    assert_eq!(motor_liability["poll_interval_secs"], 3);
    assert_eq!(motor_liability["session_timeout_secs"], 180);

    let health = presets
        .iter()
        .find(|preset| preset["vertical"] == "health")
        .expect("health preset");
    assert_eq!(health["fast_path_background_secs"], 30);
    assert_eq!(health["display_policy"], "active_with_placeholders");
}
