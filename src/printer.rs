//! Box framing for console output.
//!
//! ```text
//! +--------------------------+
//! | header                   |
//! +--------------------------+
//! | body line                |
//! +--------------------------+
//! ```

use regex::Regex;

/// Default frame width, borders included.
pub const DEFAULT_WIDTH: usize = 80;

/// Widths at or below this limit disable wrapping.
const LEFT_LIMIT: usize = 20;

/// Builder for a framed block of text.
#[derive(Debug, Clone, Default)]
pub struct BoxedText {
    body: String,
    header: String,
    footer: String,
}

impl BoxedText {
    /// Frames `data`; multi-line text is split into lines.
    pub fn new(data: &str) -> Self {
        Self {
            body: data.to_string(),
            ..Self::default()
        }
    }

    /// Section framed above the body.
    pub fn header(mut self, header: &str) -> Self {
        self.header = header.to_string();
        self
    }

    /// Section framed below the body.
    pub fn footer(mut self, footer: &str) -> Self {
        self.footer = footer.to_string();
        self
    }

    pub fn render(&self) -> String {
        self.render_at(DEFAULT_WIDTH)
    }

    fn render_at(&self, width: usize) -> String {
        let right_bound = width.saturating_sub(4);
        let wrapper = (width > LEFT_LIMIT)
            .then(|| Regex::new(&format!(r"(.{{{},{}}}\S) +", LEFT_LIMIT - 4, right_bound)).ok())
            .flatten();

        let mut body = Vec::new();
        for line in self.body.lines() {
            let line = line.trim_end();
            match &wrapper {
                Some(re) if line.chars().count() > right_bound => {
                    let wrapped = re.replace_all(line, "${1}\n");
                    body.extend(wrapped.lines().map(str::to_string));
                }
                _ => body.push(line.to_string()),
            }
        }
        let headers: Vec<&str> = self.header.lines().collect();
        let footers: Vec<&str> = self.footer.lines().collect();

        let mut length = body
            .iter()
            .map(String::as_str)
            .chain(headers.iter().copied())
            .chain(footers.iter().copied())
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        if width > LEFT_LIMIT {
            length = length.max(right_bound);
        }

        let border = format!("+-{}-+", "-".repeat(length));
        let framed = |line: &str| format!("| {line:<length$} |");

        let mut result = vec![border.clone()];
        if !headers.is_empty() {
            result.extend(headers.iter().map(|line| framed(line)));
            result.push(border.clone());
        }
        result.extend(body.iter().map(|line| framed(line)));
        result.push(border.clone());
        if !footers.is_empty() {
            result.extend(footers.iter().map(|line| framed(line)));
            result.push(border);
        }
        result.join("\n")
    }
}

/// Frames `data` with the default width.
pub fn boxed(data: &str) -> String {
    BoxedText::new(data).render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_width_frames_without_padding_to_bound() {
        let text = BoxedText::new("abc\nde").render_at(10);
        assert_eq!(text, "+-----+\n| abc |\n| de  |\n+-----+");
    }

    #[test]
    fn default_width_pads_to_right_bound() {
        let text = boxed("hello");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.chars().count() == DEFAULT_WIDTH));
        assert!(lines[1].starts_with("| hello "));
    }

    #[test]
    fn header_and_footer_get_their_own_sections() {
        let text = BoxedText::new("body")
            .header("head")
            .footer("foot")
            .render_at(12);
        assert_eq!(
            text,
            "+------+\n| head |\n+------+\n| body |\n+------+\n| foot |\n+------+"
        );
    }

    #[test]
    fn long_lines_wrap_at_whitespace() {
        let long = "word ".repeat(30);
        let text = BoxedText::new(long.trim()).render_at(40);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() > 3);
        assert!(lines.iter().all(|line| line.chars().count() == 40));
    }
}
