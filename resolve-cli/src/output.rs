#[cfg(feature = "colored-output")]
use colored::*;
use stream_resolver::{Stream, StreamMap};

use crate::cli::OutputFormat;

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_streams(&self, streams: &StreamMap, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_pretty(streams)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json_value(streams))?),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(&json_value(streams))?),
        }
    }

    fn format_pretty(&self, streams: &StreamMap) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize("Available streams:", &Color::Green, true));
        output.push('\n');

        for (name, stream) in streams {
            output.push_str(&format!(
                "  {} ({})\n",
                self.colorize(name, &Color::Yellow, true),
                self.colorize(stream.format.as_str(), &Color::Cyan, false)
            ));
            output.push_str(&self.format_stream_details(stream));
        }
        output
    }

    fn format_stream_details(&self, stream: &Stream) -> String {
        let mut output = format!(
            "    {}: {}\n",
            self.colorize("URL", &Color::Yellow, false),
            self.colorize(&stream.url, &Color::Blue, false)
        );
        if stream.bitrate > 0 {
            output.push_str(&format!(
                "    {}: {} kbps\n",
                self.colorize("Bitrate", &Color::Yellow, false),
                self.colorize(&stream.bitrate.to_string(), &Color::Cyan, false)
            ));
        }
        if let Some(resolution) = &stream.resolution {
            output.push_str(&format!(
                "    {}: {}\n",
                self.colorize("Resolution", &Color::Yellow, false),
                self.colorize(resolution, &Color::Cyan, false)
            ));
        }
        if !stream.codec.is_empty() {
            output.push_str(&format!(
                "    {}: {}\n",
                self.colorize("Codec", &Color::Yellow, false),
                self.colorize(&stream.codec, &Color::Cyan, false)
            ));
        }
        for (key, value) in stream.extras.iter().flatten() {
            output.push_str(&format!(
                "    {}: {}\n",
                self.colorize(key, &Color::Green, false),
                self.colorize(value, &Color::Cyan, false)
            ));
        }
        output
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

fn json_value(streams: &StreamMap) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "streams": streams,
    })
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}
