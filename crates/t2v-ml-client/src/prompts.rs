//! Prompt templates and extraction of image prompts from model replies.

use std::sync::OnceLock;

use regex::Regex;
use t2v_models::{format_timecode, Cue, ScenePrompt};

const PROMPT_MARKER: &str = "**Prompt:**";

fn subtitle_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\*\*Subtitle\s+(\d+)\s*:?\s*\*\*").expect("valid subtitle header regex")
    })
}

/// Prompt asking the text model for a short narration script about `topic`.
pub fn script_prompt(topic: &str) -> String {
    format!(
        r#"Write a short, simple, and visually descriptive script (story) based on the topic: "{topic}".

The script should:
- Be suitable for a short 30-second voiceover using text-to-speech (TTS)
- Use clear, short sentences (8 words per sentence or fewer, never more than 8 words)
- Be easy to visualize, with each sentence describing a specific scene or moment
- Show progression over time, like a simple story or timeline
- Avoid abstract imagery (no metaphors or symbols, only real-world visuals)
- Avoid complex vocabulary, long dialogue, or technical jargon
- Be written in a calm, neutral narrator voice
- Use simple language and short sentences

Output just the script as plain text, without numbering, timestamps, or any extra formatting."#
    )
}

/// Prompt asking the text model for one image prompt per subtitle cue.
pub fn image_prompts_prompt(topic: &str, cues: &[Cue]) -> String {
    let script_blocks = cues
        .iter()
        .map(|cue| {
            format!(
                "{}\n{} --> {}\n{}\n",
                cue.index,
                format_timecode(cue.start),
                format_timecode(cue.end),
                cue.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"I have a short script with subtitles and timestamps from a video. The topic of the video is "{topic}".
I want detailed and creative image prompts (sometimes 3D rendered, or whatever style best fits the scene)
for each subtitle line, to use in AI-based image generation.
If a subtitle line is not ideal for an image on its own, or it continues the previous scene,
do not skip it: write a prompt that fits its continuation of the previous scene.
Only skip the prompt for a subtitle line if its duration is less than 1.0 seconds.

The goal is to create a visual scene that matches the mood, setting, and action described.
For each subtitle section, give me a vivid, visually rich image prompt.
Focus on cinematic details like lighting, time of day, setting, atmosphere, emotions, and characters.

Give me prompts in the given format, where N is the index line of the subtitle block
(the number above its timestamps), not a running count. Keep each block's own index
even when you skip a line before it:
**Subtitle N:**
**Text:**
**Prompt:**

Script with timestamps:
{script_blocks}"#
    )
}

/// Extract prompt texts from reply lines, in order.
///
/// Only lines starting with `**Prompt:**` (after trimming) count.
pub fn extract_prompts<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| prompt_text(line.as_ref()))
        .collect()
}

/// Like [`extract_prompts`], attaching the number of the nearest preceding
/// `**Subtitle N:**` header to each prompt.
pub fn extract_scene_prompts<S: AsRef<str>>(lines: &[S]) -> Vec<ScenePrompt> {
    let mut current: Option<u32> = None;
    let mut prompts = Vec::new();

    for line in lines {
        let line = line.as_ref().trim();
        if let Some(caps) = subtitle_header().captures(line) {
            current = caps.get(1).and_then(|m| m.as_str().parse().ok());
        } else if let Some(prompt) = prompt_text(line) {
            prompts.push(ScenePrompt {
                cue_index: current,
                prompt,
            });
        }
    }

    prompts
}

fn prompt_text(line: &str) -> Option<String> {
    line.trim()
        .strip_prefix(PROMPT_MARKER)
        .map(|rest| rest.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prompts() {
        let lines = ["**Subtitle 1:**", "**Text:** hi", "**Prompt:**  a cat in rain  "];
        assert_eq!(extract_prompts(&lines), vec!["a cat in rain".to_string()]);
    }

    #[test]
    fn test_extract_prompts_empty() {
        let lines: [&str; 0] = [];
        assert!(extract_prompts(&lines).is_empty());
        assert!(extract_scene_prompts(&lines).is_empty());
    }

    #[test]
    fn test_extract_prompts_requires_leading_marker() {
        let lines = ["Some **Prompt:** inline", "   **Prompt:** indented"];
        assert_eq!(extract_prompts(&lines), vec!["indented".to_string()]);
    }

    #[test]
    fn test_extract_scene_prompts_tracks_subtitle() {
        let reply = "**Subtitle 1:**\n**Text:** A cat.\n**Prompt:** a cat\n\n**Subtitle 3:**\n**Text:** Rain.\n**Prompt:** rain";
        let lines: Vec<&str> = reply.lines().collect();
        let prompts = extract_scene_prompts(&lines);
        assert_eq!(
            prompts,
            vec![
                ScenePrompt { cue_index: Some(1), prompt: "a cat".to_string() },
                ScenePrompt { cue_index: Some(3), prompt: "rain".to_string() },
            ]
        );
    }

    #[test]
    fn test_extract_scene_prompts_without_header() {
        let prompts = extract_scene_prompts(&["**Prompt:** alone"]);
        assert_eq!(prompts[0].cue_index, None);
    }

    #[test]
    fn test_image_prompts_prompt_lists_cues() {
        let cues = vec![Cue::new(1, 0.0, 2.5, "A cat walks.")];
        let prompt = image_prompts_prompt("cats", &cues);
        assert!(prompt.contains("\"cats\""));
        assert!(prompt.contains("1\n00:00:00,000 --> 00:00:02,500\nA cat walks."));
    }

    #[test]
    fn test_image_prompts_prompt_asks_for_cue_index() {
        let cues = vec![Cue::new(4, 0.0, 2.5, "A cat walks.")];
        let prompt = image_prompts_prompt("cats", &cues);
        assert!(prompt.contains("**Subtitle N:**"));
        assert!(prompt.contains("not a running count"));
        assert!(!prompt.contains("**Subtitle 1:**"));
    }

    #[test]
    fn test_script_prompt_mentions_topic() {
        assert!(script_prompt("volcanoes").contains("\"volcanoes\""));
    }
}
