//! Prompt construction and response cleanup for scene generation.

use animate_core::VideoLength;

/// System instructions sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You write Manim Community Edition scenes for short educational \
videos. Answer with Python source only.";

/// User message template. `{prompt}` and `{length}` are substituted.
const SCENE_TEMPLATE: &str = r"Animate the following topic as an educational Manim video.

Topic: {prompt}
Duration: {length}

Visual style:
- Prefer the named Manim colors (BLUE, TEAL, YELLOW, RED, GREEN) over plain white.
- Use Text or MarkupText at a readable scale.
- Clear each section with FadeOut before the next one starts.
- Lay out related objects in a VGroup, e.g. group.arrange(DOWN, buff=0.5), and keep the main content centered.
- Write text, Create shapes, and use Transform or ReplacementTransform to show change.
- Follow every block of text with self.wait(...) so it can be read.

Hard rules:
- The first line is `from manim import *`.
- Define exactly one scene: `class GenScene(Scene):` with a `construct(self)` method.
- Do not load images, sounds or any other external file.
- Stay within the requested duration: {length}
  More steps and longer waits make a longer video.
- Define every name before it is used and never loop forever. The `math` module may be imported.

Open the code with a comment block that plans the timeline:
# PLAN:
# 1. Intro (0-5s): ...
# 2. ...
# Total expected time: ~N seconds

Reply with the Python code only, without markdown fences or any prose.";

/// Duration guidance for each length option.
#[must_use]
pub fn length_instruction(length: VideoLength) -> &'static str {
    match length {
        VideoLength::Short => {
            "Target duration: 5-10 seconds. One quick visual idea, no extended narration."
        }
        VideoLength::Medium => {
            "Target duration: 15-20 seconds. Present the core idea in 2-3 clear steps at a moderate pace."
        }
        VideoLength::Long => {
            "Target duration: about 60 seconds. A thorough explanation in 4-5 sections, \
             pausing with self.wait(2) between steps."
        }
        VideoLength::DeepDive => {
            "Target duration: at least 120 seconds; the video MUST be long. Treat it as a tutorial:\n\
             - Split the content into 6-8 phases.\n\
             - Cover why it works, how it works, and worked examples.\n\
             - Wait 3 seconds or more after every text block.\n\
             - For a simple topic, add further examples or edge cases to fill the time."
        }
        VideoLength::Extended => {
            "Target duration: 4-5 minutes. A full lesson:\n\
             - Split the content into 10-12 phases with a short recap at the end.\n\
             - Build each idea from first principles, then show several worked examples.\n\
             - Wait 3 seconds or more after every text block."
        }
    }
}

/// Build the user message for `prompt` at `length`.
#[must_use]
pub fn build_scene_prompt(prompt: &str, length: VideoLength) -> String {
    SCENE_TEMPLATE
        .replace("{length}", length_instruction(length))
        .replace("{prompt}", prompt)
}

/// Strip surrounding markdown code fences and whitespace from a model reply.
#[must_use]
pub fn clean_code(raw: &str) -> String {
    let mut code = raw.trim();
    if let Some(rest) = code.strip_prefix("```python") {
        code = rest;
    } else if let Some(rest) = code.strip_prefix("```") {
        code = rest;
    }
    if let Some(rest) = code.strip_suffix("```") {
        code = rest;
    }
    code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_code_strips_fences() {
        assert_eq!(
            clean_code("```python\nfrom manim import *\n```"),
            "from manim import *"
        );
        assert_eq!(clean_code("```\nx = 1\n```  "), "x = 1");
        assert_eq!(clean_code("  plain = True \n"), "plain = True");
    }

    #[test]
    fn clean_code_keeps_inner_fences() {
        let raw = "```python\na = '```'\n```";
        assert_eq!(clean_code(raw), "a = '```'");
    }

    #[test]
    fn prompt_embeds_topic_and_length() {
        let text = build_scene_prompt("Explain the Pythagorean theorem", VideoLength::Short);
        assert!(text.contains("Topic: Explain the Pythagorean theorem"));
        assert!(text.contains("5-10 seconds"));
        assert!(text.contains("class GenScene(Scene):"));
        assert!(!text.contains("{length}"));
    }

    #[test]
    fn every_length_has_guidance() {
        for length in VideoLength::ALL {
            assert!(length_instruction(length).starts_with("Target duration"));
        }
    }
}
