/// Split comma-separated tag text, trimming and dropping empty segments.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// Text field backing a record's tag list.
///
/// `input` keeps what was typed and re-derives the tags; `blur` rewrites the
/// text into its canonical `a, b, c` form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagInput {
    text: String,
    tags: Vec<String>,
}

impl TagInput {
    pub fn from_tags(tags: &[String]) -> Self {
        Self {
            text: format_tags(tags),
            tags: tags.to_vec(),
        }
    }

    pub fn input(&mut self, raw: &str) -> &[String] {
        self.text = raw.to_string();
        self.tags = parse_tags(raw);
        &self.tags
    }

    pub fn blur(&mut self) {
        self.text = format_tags(&self.tags);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}
