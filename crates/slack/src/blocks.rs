use selector_core::domain::selection::Selection;
use serde::Serialize;

/// Placeholder shown to the requester while the worker runs.
pub const THINKING_TEXT: &str = "Thinking...";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: TextObject,
    },
    Context {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<TextObject>,
    },
}

impl Block {
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Section { block_id, .. } | Self::Context { block_id, .. } => block_id.as_deref(),
        }
    }
}

/// Fallback text plus blocks, as accepted by `chat.postMessage`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(rename = "text")]
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Ephemeral,
}

/// Body for the webhook acknowledgment and for `response_url` posts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponsePayload {
    pub response_type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub blocks: Vec<Block>,
}

impl ResponsePayload {
    pub fn ephemeral(message: MessageTemplate) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: Some(message.fallback_text),
            blocks: message.blocks,
        }
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: Some(block_id.into()), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks
            .push(Block::Context { block_id: Some(block_id.into()), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::mrkdwn(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Public announcement posted to the group after a successful pick.
pub fn selection_announcement(selection: &Selection) -> MessageTemplate {
    MessageBuilder::new(selection.fallback_text())
        .section("select.attribution.v1", |section| {
            section.mrkdwn(selection.attribution_line());
        })
        .section("select.result.v1", |section| {
            section.mrkdwn(selection.selection_line());
        })
        .build()
}

/// One-section message sent privately to the requester.
pub fn private_notice(text: &str) -> MessageTemplate {
    MessageBuilder::new(text)
        .section("select.notice.v1", |section| {
            section.mrkdwn(text);
        })
        .build()
}

pub fn thinking_placeholder() -> ResponsePayload {
    ResponsePayload {
        response_type: ResponseType::Ephemeral,
        text: None,
        blocks: vec![Block::Section { block_id: None, text: TextObject::mrkdwn(THINKING_TEXT) }],
    }
}

pub fn ack_failure(text: &str) -> ResponsePayload {
    ResponsePayload {
        response_type: ResponseType::Ephemeral,
        text: None,
        blocks: vec![Block::Section { block_id: None, text: TextObject::mrkdwn(text) }],
    }
}

pub fn unsupported_command_notice(command: &str, supported: &str) -> ResponsePayload {
    ResponsePayload::ephemeral(
        MessageBuilder::new(format!("Unsupported command `{command}`."))
            .section("select.unsupported.v1", |section| {
                section.mrkdwn(format!("Unsupported command `{command}`."));
            })
            .context("select.unsupported.hint.v1", |context| {
                context.mrkdwn(format!("Try `{supported} <task>`."));
            })
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use selector_core::domain::command::{GroupId, UserId};
    use selector_core::domain::selection::Selection;
    use serde_json::json;

    use super::{
        ack_failure, private_notice, selection_announcement, thinking_placeholder,
        unsupported_command_notice, Block, MessageBuilder, ResponsePayload, TextObject,
    };

    fn selection(task: Option<&str>) -> Selection {
        Selection {
            group_id: GroupId("C1".to_owned()),
            requester_id: UserId("U-REQ".to_owned()),
            participant_id: UserId("U2".to_owned()),
            task: task.map(str::to_owned),
        }
    }

    #[test]
    fn message_builder_creates_typed_block_structure() {
        let message = MessageBuilder::new("fallback")
            .section("section.v1", |section| {
                section.mrkdwn("*hello*");
            })
            .context("context.v1", |context| {
                context.mrkdwn("hint");
            })
            .build();

        assert_eq!(message.fallback_text, "fallback");
        assert_eq!(message.blocks.len(), 2);
        assert_eq!(message.blocks[0].block_id(), Some("section.v1"));
        assert!(matches!(
            &message.blocks[1],
            Block::Context { elements, .. } if elements == &vec![TextObject::mrkdwn("hint")]
        ));
    }

    #[test]
    fn announcement_has_fallback_and_two_sections() {
        let message = selection_announcement(&selection(Some("write the retro notes")));

        assert_eq!(message.fallback_text, "Selected user is <@U2>");
        let texts: Vec<&str> = message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text, .. } => Some(text.text()),
                Block::Context { .. } => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "<@U-REQ> asked me to select someone to do \"write the retro notes\"",
                "I have selected <@U2>",
            ]
        );
    }

    #[test]
    fn announcement_serializes_as_post_message_body() {
        let value = serde_json::to_value(selection_announcement(&selection(None))).expect("json");
        assert_eq!(value["text"], "Selected user is <@U2>");
        assert_eq!(value["blocks"][0]["type"], "section");
        assert_eq!(value["blocks"][0]["text"]["type"], "mrkdwn");
        assert_eq!(value["blocks"][0]["text"]["text"], "<@U-REQ> asked me to select someone");
    }

    #[test]
    fn thinking_placeholder_matches_wire_shape() {
        let value = serde_json::to_value(thinking_placeholder()).expect("json");
        assert_eq!(
            value,
            json!({
                "response_type": "ephemeral",
                "blocks": [{ "type": "section", "text": { "type": "mrkdwn", "text": "Thinking..." } }]
            })
        );
    }

    #[test]
    fn ack_failure_carries_only_the_short_message() {
        let payload = ack_failure("There was an error.  Please contact support.");
        let value = serde_json::to_value(&payload).expect("json");
        assert_eq!(value["blocks"][0]["text"]["text"], "There was an error.  Please contact support.");
        assert!(value.get("text").is_none());
    }

    #[test]
    fn private_notice_becomes_ephemeral_response() {
        let payload = ResponsePayload::ephemeral(private_notice("Failed to select user."));
        let value = serde_json::to_value(&payload).expect("json");
        assert_eq!(value["response_type"], "ephemeral");
        assert_eq!(value["text"], "Failed to select user.");
        assert_eq!(value["blocks"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn unsupported_notice_names_the_command() {
        let payload = unsupported_command_notice("/pick", "/select");
        assert_eq!(payload.text.as_deref(), Some("Unsupported command `/pick`."));
        assert!(payload.blocks.iter().any(|block| matches!(
            block,
            Block::Context { elements, .. }
                if elements.iter().any(|element| element.text().contains("/select"))
        )));
    }
}
