use std::path::Path;

use crate::job::{Operation, TransformJob};

/// One fully-assembled transcoder invocation: binary, ordered arguments,
/// and a human-readable description for logging. Construction is
/// deterministic; the same job always yields the same vector.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file; must stay the last argument
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite of an existing output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Append the flags for one operation. Conflicting flags from repeated
    /// operations are kept as-is; the transcoder resolves them last-wins.
    pub fn operation(self, operation: &Operation) -> Self {
        match operation {
            Operation::Compress { quality, preset } => self
                .video_codec("libx264")
                .arg("-crf")
                .arg(quality.to_string())
                .arg("-preset")
                .arg(preset.as_str()),
            Operation::Convert { codec } => self.video_codec(codec.encoder()),
            Operation::Resize { width, height } => {
                self.video_filter(format!("scale={}:{}", width, height))
            }
            Operation::Trim {
                start_seconds,
                duration_seconds,
            } => self
                .arg("-ss")
                .arg(start_seconds.to_string())
                .arg("-t")
                .arg(duration_seconds.to_string()),
            Operation::AudioEncode {
                codec,
                bitrate_kbps,
            } => self
                .audio_codec(codec.encoder())
                .arg("-b:a")
                .arg(format!("{}k", bitrate_kbps)),
        }
    }
}

/// Builder bound to a transcoder binary path
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Assemble the full invocation for a transform job: input marker,
    /// overwrite flag, per-operation flags in list order, output path last.
    pub fn transform(&self, job: &TransformJob) -> MediaCommand {
        let mut command = MediaCommand::new(
            &self.binary_path,
            format!("Transform ({} operations)", job.operations.len()),
        )
        .input(&job.input_path)
        .overwrite();

        for operation in &job.operations {
            command = command.operation(operation);
        }

        command.output(&job.output_path)
    }
}
