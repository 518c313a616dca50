//! Text for the live readout panels

use emote_common::Emotion;

/// Heading of the ranked readout panel
pub const READOUT_HEADING: &str = "All Emotions";

/// One readout line: `Happy\t55.30%`
pub fn format_line(emotion: Emotion, confidence: f64) -> String {
    format!("{}\t{:.2}%", emotion.capitalized(), confidence)
}

/// Lines for already-ranked confidences
pub fn format_ranked(ranked: &[(Emotion, f64)]) -> Vec<String> {
    ranked.iter().map(|(e, c)| format_line(*e, *c)).collect()
}

/// Whole panel text, heading first
pub fn panel_text(lines: &[String]) -> String {
    let mut text = String::from(READOUT_HEADING);
    text.push('\n');
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(Emotion::Happy, 55.3), "Happy\t55.30%");
        assert_eq!(format_line(Emotion::Surprise, 0.004), "Surprise\t0.00%");
    }

    #[test]
    fn test_panel_text() {
        let lines = format_ranked(&[(Emotion::Sad, 70.0), (Emotion::Angry, 30.0)]);
        assert_eq!(panel_text(&lines), "All Emotions\nSad\t70.00%\nAngry\t30.00%\n");
        assert_eq!(panel_text(&[]), "All Emotions\n");
    }
}
