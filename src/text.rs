use anyhow::Result;
use regex::Regex;

/// Cleans team names as the portal prints them, e.g. "Falcons FC (D2)" -> "Falcons FC".
pub struct TeamNameCleaner {
    division_tag: Regex,
}

impl TeamNameCleaner {
    pub fn new() -> Result<Self> {
        let division_tag = Regex::new(r"\(D\d+\)")?;
        Ok(Self { division_tag })
    }

    pub fn clean(&self, raw: &str) -> String {
        let stripped = self.division_tag.replace_all(raw, "");
        collapse_whitespace(&stripped)
    }

    /// True when the text carries a "(Dn)" division tag. The portal only tags
    /// team names, so this is how fixture cards are told apart from other text.
    pub fn has_division_tag(&self, text: &str) -> bool {
        self.division_tag.is_match(text)
    }
}

/// Pulls the week number out of labels like "Week 7" or "Week 7 - 12 Oct 2025".
pub struct WeekLabelParser {
    week_number: Regex,
}

impl WeekLabelParser {
    pub fn new() -> Result<Self> {
        let week_number = Regex::new(r"Week\s+(\d+)")?;
        Ok(Self { week_number })
    }

    pub fn week_number(&self, label: &str) -> Option<u32> {
        let caps = self.week_number.captures(label)?;
        caps.get(1)?.as_str().parse().ok()
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaping for attribute values (tooltips carry team names and quotes).
/// Newlines are kept; browsers render them inside `title` attributes.
pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
