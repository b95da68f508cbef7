#![forbid(unsafe_code)]

//! Telegram-flavoured HTML for alert texts.

use std::fmt::Display;

pub const NEW_IPS_CAP: usize = 10;
pub const PORT_CHANGES_CAP: usize = 15;
pub const SUDO_USERS_CAP: usize = 20;
pub const UPDATE_PACKAGES_CAP: usize = 10;
pub const FIREWALL_CHANGES_CAP: usize = 20;

/// Escape the characters Telegram's HTML parse mode treats as markup.
///
/// ```
/// # use orchestrator::notify::escape;
/// assert_eq!(escape("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
/// ```
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn code(value: impl Display) -> String {
    format!("<code>{}</code>", escape(&value.to_string()))
}

pub fn bold(value: impl Display) -> String {
    format!("<b>{}</b>", escape(&value.to_string()))
}

/// Line-oriented message builder.
#[derive(Debug, Clone)]
pub struct Message {
    lines: Vec<String>,
}

impl Message {
    pub fn titled(title: &str) -> Self {
        Self {
            lines: vec![bold(title)],
        }
    }

    /// Append a pre-rendered line.
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn blank(self) -> Self {
        self.line(String::new())
    }

    /// One `<code>` line per item, at most `cap` of them.
    pub fn items<T: Display>(mut self, items: &[T], cap: usize) -> Self {
        self.lines.extend(items.iter().take(cap).map(code));
        if items.len() > cap {
            self.lines
                .push(format!("<i>+{} more</i>", items.len() - cap));
        }
        self
    }

    /// A headed block of items; nothing is added for an empty list.
    pub fn section<T: Display>(self, heading: &str, items: &[T], cap: usize) -> Self {
        if items.is_empty() {
            return self;
        }
        self.blank().line(bold(heading)).items(items, cap)
    }

    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_lists() {
        let items: Vec<u32> = (1..=4).collect();
        let text = Message::titled("Numbers").items(&items, 2).build();
        assert_eq!(
            text,
            "<b>Numbers</b>\n<code>1</code>\n<code>2</code>\n<i>+2 more</i>"
        );
    }

    #[test]
    fn empty_sections_are_skipped() {
        let none: [&str; 0] = [];
        let text = Message::titled("T")
            .section("Added", &["a<b"], 5)
            .section("Removed", &none, 5)
            .build();
        assert_eq!(text, "<b>T</b>\n\n<b>Added</b>\n<code>a&lt;b</code>");
    }
}
