//! Chat payload assembly.

use qwenvl_engine::{ChatMessage, ContentBlock};

use crate::error::{NodeError, Result};
use crate::image::ImageBatch;

/// Build the message list for one call: optional system turn, then a single
/// user turn holding the image (if any) followed by the prompt text.
///
/// # Errors
/// `NodeError::InvalidInput` when both the trimmed prompt and the image are
/// absent; nothing is sent to the backend in that case.
pub fn build_messages(
    prompt: &str,
    system_prompt: &str,
    image: Option<&ImageBatch>,
) -> Result<Vec<ChatMessage>> {
    let mut messages = Vec::new();

    let system_prompt = system_prompt.trim();
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::system(system_prompt));
    }

    let mut user_content = Vec::new();
    if let Some(image) = image {
        user_content.push(ContentBlock::image_url(image.to_data_url()?));
    }
    let prompt = prompt.trim();
    if !prompt.is_empty() {
        user_content.push(ContentBlock::text(prompt));
    }

    if user_content.is_empty() {
        return Err(NodeError::InvalidInput(
            "Prompt or image must be provided".to_string(),
        ));
    }

    messages.push(ChatMessage::user(user_content));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwenvl_engine::Role;

    #[test]
    fn test_empty_input_is_rejected() {
        let err = build_messages("", "", None).unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput(_)));

        // Whitespace-only input counts as empty.
        let err = build_messages("   \n", "  ", None).unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput(_)));
    }

    #[test]
    fn test_blank_system_prompt_is_skipped() {
        let messages = build_messages("hello", "  ", None).expect("prompt alone is enough");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn test_image_block_precedes_text() {
        let image = ImageBatch::new(vec![0.0; 12], 1, 2, 2, 3).expect("valid shape");
        let messages =
            build_messages("what is this?", "be terse", Some(&image)).expect("both inputs");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content.len(), 2);
        assert!(matches!(
            messages[1].content[0],
            ContentBlock::ImageUrl { .. }
        ));
        assert!(matches!(messages[1].content[1], ContentBlock::Text { .. }));
    }

    #[test]
    fn test_image_alone_is_enough() {
        let image = ImageBatch::new(vec![0.0; 12], 1, 2, 2, 3).expect("valid shape");
        let messages = build_messages("", "", Some(&image)).expect("image alone is enough");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.len(), 1);
    }
}
