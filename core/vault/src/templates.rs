use gpt_gulp_schemas::{Conversation, DEFAULT_PROJECT, UNKNOWN_DURATION};

const MAX_FILENAME_TOPIC_CHARS: usize = 50;
const FALLBACK_TOPIC: &str = "conversation";

/// Markdown note renderer for archived conversations
#[derive(Debug, Default, Clone, Copy)]
pub struct NoteRenderer;

impl NoteRenderer {
    pub fn new() -> Self {
        Self
    }

    /// `{date}_{platform}_{topic}.md`; the topic is cut to 50 characters but
    /// otherwise used as is
    pub fn file_name(&self, conversation: &Conversation) -> String {
        let topic = if conversation.topic.is_empty() {
            FALLBACK_TOPIC
        } else {
            conversation.topic.as_str()
        };
        let topic: String = topic.chars().take(MAX_FILENAME_TOPIC_CHARS).collect();

        format!(
            "{}_{}_{}.md",
            conversation.timestamp.date_label(),
            conversation.platform,
            topic
        )
    }

    /// Render the note body
    pub fn render(&self, conversation: &Conversation, include_full_conversation: bool) -> String {
        let duration = non_empty_or(&conversation.duration, UNKNOWN_DURATION);
        let project = non_empty_or(&conversation.project, DEFAULT_PROJECT);

        let tags = conversation
            .tags
            .iter()
            .map(|tag| format!("#{}", tag))
            .collect::<Vec<_>>()
            .join(" ");

        let mut content = format!(
            "# {}\n\n## Metadata\n- **Platform**: {}\n- **Date**: {}\n- **Duration**: {}\n- **Project**: {}\n\n## Tags\n{}\n\n## Summary\n{}\n\n## Key Points\n",
            conversation.title,
            conversation.platform,
            conversation.timestamp.datetime_label(),
            duration,
            project,
            tags,
            conversation.summary,
        );

        for point in &conversation.key_points {
            content.push_str(&format!("- {}\n", point));
        }

        content.push_str("\n## Files/Resources Referenced\n");
        for resource in &conversation.resources {
            content.push_str(&format!("- [[{}]]\n", resource));
        }

        if include_full_conversation {
            content.push_str(&format!(
                "\n## Full Conversation\n{}\n",
                conversation.raw_content
            ));
        }

        content
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
