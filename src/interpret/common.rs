use tracing::debug;

use crate::error::{KiruError, Result};
use crate::instruction::{Instruction, RawInstruction};

/// System prompt describing the instruction format to the model
pub fn system_prompt() -> String {
    "You are a helpful assistant that extracts video editing instructions from user prompts.\n\
     Handle various time formats and convert them to seconds:\n\
     - '18s' should be converted to 18 seconds\n\
     - '18:40' should be converted to 1120 seconds\n\
     - '18 minutes' should be converted to 1080 seconds\n\
     - '18 minutes 32 seconds' should be converted to 1112 seconds\n\
     \n\
     Respond in JSON format with an object containing the following properties as needed:\n\
     - 'action': The type of edit (cut, split, merge, text_overlay, adjust_speed, mute, unmute)\n\
     - 'start': For cut action, the start time in seconds\n\
     - 'end': For cut action, the end time in seconds (omit it to cut to the end)\n\
     - 'points': For split action, an array of split points in seconds, ascending\n\
     - 'speed': For adjust_speed action, the speed multiplier (e.g., 1.5 for speedup, 0.2 for slowdown)\n\
     - 'text': For text_overlay action, the text to display\n\
     - 'fontSize': For text_overlay action, the font size\n\
     - 'fontColor': For text_overlay action, the font color\n\
     - 'position': For text_overlay action, the position of the text (top, center, bottom)\n\
     - 'fontFile': For text_overlay action, the font file to use\n\
     \n\
     For 'start', 'end', and 'points', always use seconds in the output JSON.\n\
     Return ONLY the JSON object, without explanations."
        .to_string()
}

/// User message wrapping the prompt
pub fn user_prompt(prompt: &str) -> String {
    format!(
        "Analyze this prompt and provide the appropriate video editing instructions: \"{}\"",
        prompt
    )
}

/// Cut the outermost JSON object out of a model reply (code fences, chatter).
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Turn a raw model reply into an instruction.
pub fn parse_reply(reply: &str) -> Result<Instruction> {
    debug!("Raw interpreter reply: {}", reply);

    let json = extract_json(reply).ok_or_else(|| {
        KiruError::Interpretation("model reply did not contain a JSON object".to_string())
    })?;

    RawInstruction::from_json(json)?.into_instruction()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Sure!\n```json\n{\"action\": \"mute\"}\n```";
        assert_eq!(extract_json(reply), Some("{\"action\": \"mute\"}"));
        assert_eq!(extract_json("no braces"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_reply() {
        let instruction = parse_reply("{\"action\":\"cut\",\"start\":10,\"end\":20}").unwrap();
        assert_eq!(instruction, Instruction::Cut { start: Some(10.0), end: Some(20.0) });

        assert!(matches!(parse_reply("I cannot help"), Err(KiruError::Interpretation(_))));
    }

    #[test]
    fn test_prompts_mention_vocabulary() {
        let system = system_prompt();
        for action in crate::instruction::Action::ALL {
            assert!(system.contains(action.as_str()), "missing {}", action);
        }
        assert!(user_prompt("mute it").contains("\"mute it\""));
    }
}
