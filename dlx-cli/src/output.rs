#[cfg(feature = "colored-output")]
use colored::*;
use dlx_engine::{ExtractionFailure, Media, sorted_streams};
use indicatif::HumanBytes;

use crate::error::Result;

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Title, site and the streams in download preference order.
    pub fn format_media(&self, media: &Media) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} {}\n",
            self.colorize("Site:", &Color::Green, true),
            media.site
        ));
        output.push_str(&format!(
            "{} {}\n",
            self.colorize("Title:", &Color::Green, true),
            self.colorize(&media.title, &Color::Cyan, false)
        ));
        output.push_str(&format!(
            "{} {}\n",
            self.colorize("Type:", &Color::Green, true),
            media.media_type
        ));
        output.push_str(&format!("{}\n", self.colorize("Streams:", &Color::Green, true)));

        for (rank, stream) in sorted_streams(&media.streams).into_iter().enumerate() {
            let marker = if rank == 0 { " (default)" } else { "" };
            output.push_str(&format!(
                "  [{}]{}\n",
                self.colorize(&stream.id, &Color::Yellow, true),
                marker
            ));
            output.push_str(&format!("    Quality: {}\n", stream.quality));
            output.push_str(&format!(
                "    Size:    {} ({} bytes)\n",
                HumanBytes(stream.size),
                stream.size
            ));
            output.push_str(&format!("    Parts:   {}\n", stream.parts.len()));
            output.push_str(&format!("    Ext:     {}\n", stream.ext));
            if stream.need_mux {
                output.push_str("    Remux:   yes\n");
            }
        }
        output
    }

    pub fn format_failure(&self, failure: &ExtractionFailure) -> String {
        format!(
            "{} {}: {}",
            self.colorize("Failed:", &Color::Red, true),
            self.colorize(&failure.url, &Color::Blue, false),
            failure.reason
        )
    }

    pub fn format_json(&self, media: &[&Media]) -> Result<String> {
        Ok(serde_json::to_string_pretty(media)?)
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
                    Color::Red => text.red(),
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
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}
