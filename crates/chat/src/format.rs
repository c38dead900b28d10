use std::sync::LazyLock;

use regex::Regex;

/// Numbered section headers whose remainder is rendered as an indented body.
const SECTION_HEADERS: [&str; 4] = [
    "1. 공지사항 제목",
    "2. 주요 내용 요약",
    "3. 중요 정보",
    "4. 신청 방법",
];

/// Label-only header; a bare URL on the following line becomes its link.
pub const LINK_SECTION_HEADER: &str = "5. 공식 링크";

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid markdown link regex"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("valid url regex"));
static WHOLE_LINE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s]+$").expect("valid whole-line url regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedBlock {
    Heading { title: String },
    LabeledSection { label: String, body: String },
    Link { text: String, url: String },
    PlainLine { text: String },
    Break,
}

impl FormattedBlock {
    pub fn heading(title: impl Into<String>) -> Self {
        Self::Heading {
            title: title.into(),
        }
    }

    pub fn section(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self::LabeledSection {
            label: label.into(),
            body: body.into(),
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Link {
            text: text.into(),
            url: url.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainLine { text: text.into() }
    }
}

/// Blocks produced by one source line.
///
/// Lines with inline links hold alternating plain/link fragments that render
/// as a single paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    pub blocks: Vec<FormattedBlock>,
}

impl FormattedLine {
    fn single(block: FormattedBlock) -> Self {
        Self {
            blocks: vec![block],
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self.blocks.as_slice(), [FormattedBlock::Break])
    }
}

/// Flattened block sequence for `text`.
pub fn format(text: &str) -> Vec<FormattedBlock> {
    format_lines(text)
        .into_iter()
        .flat_map(|line| line.blocks)
        .collect()
}

/// Formats `text` line by line.
///
/// Each line depends only on itself and the line before it, so formatting a
/// growing prefix never changes the result for lines that are already complete.
pub fn format_lines(text: &str) -> Vec<FormattedLine> {
    let lines = text.split('\n').collect::<Vec<_>>();

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let previous = index.checked_sub(1).map(|prev| lines[prev]);
            format_line(line, previous)
        })
        .collect()
}

fn format_line(line: &str, previous: Option<&str>) -> FormattedLine {
    if let Some(block) = section_block(line) {
        return FormattedLine::single(block);
    }

    if line == LINK_SECTION_HEADER {
        return FormattedLine::single(FormattedBlock::heading(LINK_SECTION_HEADER));
    }

    if WHOLE_LINE_URL.is_match(line)
        && previous.is_some_and(|previous| previous.trim() == LINK_SECTION_HEADER)
    {
        let url = line.trim();
        return FormattedLine::single(FormattedBlock::link(url, url));
    }

    if line.trim().is_empty() {
        return FormattedLine::single(FormattedBlock::Break);
    }

    if MARKDOWN_LINK.is_match(line) {
        return FormattedLine {
            blocks: split_markdown_links(line),
        };
    }

    if BARE_URL.is_match(line) {
        return FormattedLine {
            blocks: split_bare_urls(line),
        };
    }

    FormattedLine::single(FormattedBlock::plain(line))
}

fn section_block(line: &str) -> Option<FormattedBlock> {
    SECTION_HEADERS.iter().find_map(|label| {
        line.strip_prefix(label)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|body| FormattedBlock::section(*label, body.trim()))
    })
}

// Plain fragments are kept even when empty so the output always alternates
// plain, link, plain, ..., plain.
fn split_markdown_links(line: &str) -> Vec<FormattedBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for captures in MARKDOWN_LINK.captures_iter(line) {
        let (Some(whole), Some(text), Some(url)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };

        blocks.push(FormattedBlock::plain(&line[cursor..whole.start()]));
        blocks.push(FormattedBlock::link(text.as_str(), url.as_str()));
        cursor = whole.end();
    }

    blocks.push(FormattedBlock::plain(&line[cursor..]));
    blocks
}

fn split_bare_urls(line: &str) -> Vec<FormattedBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for found in BARE_URL.find_iter(line) {
        blocks.push(FormattedBlock::plain(&line[cursor..found.start()]));
        blocks.push(FormattedBlock::link(found.as_str(), found.as_str()));
        cursor = found.end();
    }

    blocks.push(FormattedBlock::plain(&line[cursor..]));
    blocks
}
