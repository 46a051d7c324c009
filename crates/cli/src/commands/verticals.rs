use serde::Serialize;

use premia_core::{ProductVertical, VerticalConfig};

#[derive(Debug, Serialize)]
struct VerticalPreset {
    vertical: ProductVertical,
    #[serde(flatten)]
    config: VerticalConfig,
}

/// List the built-in per-vertical polling presets as pretty JSON.
pub fn run() -> String {
    let presets: Vec<VerticalPreset> = ProductVertical::ALL
        .into_iter()
        .map(|vertical| VerticalPreset {
            vertical,
            config: VerticalConfig::defaults_for(vertical),
        })
        .collect();

    serde_json::to_string_pretty(&presets)
        .unwrap_or_else(|error| format!("could not serialize presets: {error}"))
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn lists_all_six_verticals() {
        let output = run();
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid JSON");
        let presets = parsed.as_array().expect("array of presets");

        assert_eq!(presets.len(), 6);
        assert!(output.contains("motor_comprehensive"));
        assert!(output.contains("supplementary_liability"));
    }
}
