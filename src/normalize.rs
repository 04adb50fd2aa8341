//! Flatten assistants API messages for the browser

use crate::types::{MessageContent, NormalizedMessage, ThreadMessage};

/// Convert a message page into an oldest-first list.
///
/// Pages normally arrive newest-first, but ordering is taken from
/// `created_at`; messages sharing a timestamp keep their reversed page order.
/// `file_url_template` resolves `image_file` handles and relative
/// `image_url`s; `{file_id}` is replaced by the handle.
pub fn normalize(mut raw: Vec<ThreadMessage>, file_url_template: &str) -> Vec<NormalizedMessage> {
    raw.reverse();
    // Stable, so same-second messages stay in provider order
    raw.sort_by_key(|m| m.created_at);

    raw.into_iter()
        .map(|message| {
            let mut texts = Vec::new();
            let mut image_refs = Vec::new();

            for part in message.content {
                match part {
                    MessageContent::Text { text } => {
                        if !text.value.trim().is_empty() {
                            texts.push(text.value);
                        }
                    }
                    MessageContent::ImageUrl { image_url } => {
                        if is_absolute(&image_url.url) {
                            image_refs.push(image_url.url);
                        } else if !image_url.url.is_empty() {
                            image_refs.push(resolve_file(file_url_template, &image_url.url));
                        }
                    }
                    MessageContent::ImageFile { image_file } => {
                        image_refs.push(resolve_file(file_url_template, &image_file.file_id));
                    }
                    MessageContent::Unknown => {}
                }
            }

            NormalizedMessage {
                id: message.id,
                role: message.role,
                texts,
                image_refs,
            }
        })
        .collect()
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("data:")
}

fn resolve_file(template: &str, file_id: &str) -> String {
    template.replace("{file_id}", file_id)
}
