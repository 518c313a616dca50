//! Classifier backed by an external command
//!
//! Each frame is PNG-encoded and written to the command's stdin; the command
//! prints DeepFace-shaped JSON (an array of faces, or a single face object)
//! on stdout. One process per frame keeps a crashed model from taking the
//! pipeline down with it.

use image::{ImageFormat, RgbImage};
use std::io::{self, Cursor, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::trace;

use super::{EmotionClassifier, FaceAnalysis, InferenceError};

/// Runs `program args...` once per frame
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    program: String,
    args: Vec<String>,
}

impl ProcessClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argument vector, program first
    ///
    /// Arguments are passed through untouched (no shell splitting). Returns
    /// `None` when `argv` is empty or the program is blank.
    pub fn from_argv<I>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut argv = argv.into_iter();
        let program = argv.next().filter(|p| !p.trim().is_empty())?;
        Some(Self::new(program, argv.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Parse classifier stdout: either `[face, ...]` or a bare `face`
pub fn parse_output(stdout: &[u8]) -> Result<Vec<FaceAnalysis>, InferenceError> {
    let value: serde_json::Value = serde_json::from_slice(stdout)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

impl EmotionClassifier for ProcessClassifier {
    fn classify(&mut self, frame: &RgbImage) -> Result<Vec<FaceAnalysis>, InferenceError> {
        let mut png = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| InferenceError::Encode(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stdin is fed from its own thread while stdout and stderr drain here;
        // a child that writes before reading would otherwise stall both sides
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || -> io::Result<()> {
                match stdin.write_all(&png) {
                    // Child exited early; its exit status tells us why
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            })
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| InferenceError::Model("stdin writer panicked".to_string()))??;
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InferenceError::Model(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        trace!("Classifier returned {} bytes", output.stdout.len());
        parse_output(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_argv_kept_verbatim() {
        let classifier =
            ProcessClassifier::from_argv(argv(&["python3", "my models/analyze.py", "--fast"])).unwrap();
        assert_eq!(classifier.program(), "python3");
        assert_eq!(classifier.args, vec!["my models/analyze.py", "--fast"]);

        assert!(ProcessClassifier::from_argv(Vec::new()).is_none());
        assert!(ProcessClassifier::from_argv(argv(&["  "])).is_none());
    }

    #[test]
    fn test_parse_array_and_object() {
        let faces = parse_output(br#"[{"emotion": {"sad": 12.5}}, {"emotion": {}}]"#).unwrap();
        assert_eq!(faces.len(), 2);

        let faces = parse_output(br#"{"emotion": {"happy": 99.0}, "dominant_emotion": "happy"}"#).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].dominant_emotion.as_deref(), Some("happy"));

        assert!(parse_output(b"Traceback (most recent call last)").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_is_model_error() {
        let mut classifier = ProcessClassifier::from_argv(argv(&["false"])).unwrap();
        let result = classifier.classify(&RgbImage::new(4, 4));
        assert!(matches!(result, Err(InferenceError::Model(_))));
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let mut classifier = ProcessClassifier::new("emote-classifier-that-does-not-exist", Vec::new());
        let result = classifier.classify(&RgbImage::new(4, 4));
        assert!(matches!(result, Err(InferenceError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_quoted_shell_script_runs_intact() {
        let mut classifier = ProcessClassifier::from_argv(argv(&[
            "sh",
            "-c",
            r#"cat >/dev/null; echo '{"emotion": {"happy": 42.5}}'"#,
        ]))
        .unwrap();
        let faces = classifier.classify(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(faces[0].emotion.get("happy"), Some(&42.5));
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_chatter_before_reading_frame() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        use std::sync::mpsc;
        use std::time::Duration;

        // Noise does not compress, so the PNG is larger than a pipe buffer
        let mut rng = StdRng::seed_from_u64(7);
        let frame = RgbImage::from_fn(320, 240, |_, _| image::Rgb([rng.gen(), rng.gen(), rng.gen()]));

        let mut classifier = ProcessClassifier::from_argv(argv(&[
            "sh",
            "-c",
            "head -c 200000 /dev/zero >&2; cat >/dev/null; echo '[]'",
        ]))
        .unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(classifier.classify(&frame));
        });

        let faces = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("classifier stalled")
            .unwrap();
        assert!(faces.is_empty());
    }
}
