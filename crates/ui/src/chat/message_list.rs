use std::time::Duration;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, v_flex};
use schoolcatch_chat::{FormattedBlock, FormattedLine, MessageId, Sender};

use crate::chat::scroll_manager::ScrollManager;

pub const THINKING_LABEL: &str = "생각 중";
pub const USER_AVATAR: &str = "나";
pub const BOT_AVATAR: &str = "G";
pub const REVEAL_CURSOR: &str = "|";
const THINKING_DOTS_INTERVAL: Duration = Duration::from_millis(500);
const MAX_THINKING_DOTS: usize = 3;
const CONTENT_MAX_WIDTH: Pixels = px(768.);
const USER_BUBBLE_MAX_WIDTH: Pixels = px(540.);
const AVATAR_SIZE: Pixels = px(28.);
const SECTION_BODY_INDENT: Pixels = px(16.);
const BREAK_HEIGHT: Pixels = px(12.);

pub fn initial_greeting(display_name: &str) -> String {
    format!("{display_name}님, 안녕하세요")
}

pub fn conversation_header(display_name: &str) -> (String, &'static str) {
    (format!("안녕하세요, {display_name}님."), "무엇을 도와드릴까요?")
}

/// `"" -> "." -> ".." -> "..." -> ""`
pub fn next_thinking_dots(dots: usize) -> usize {
    if dots < MAX_THINKING_DOTS { dots + 1 } else { 0 }
}

pub fn thinking_text(dots: usize) -> String {
    format!("{THINKING_LABEL}{}", ".".repeat(dots.min(MAX_THINKING_DOTS)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowContent {
    /// User text, shown exactly as typed.
    Plain(SharedString),
    Formatted(Vec<FormattedLine>),
}

/// Render-ready view of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: MessageId,
    pub sender: Sender,
    pub content: RowContent,
    pub revealing: bool,
}

impl MessageRow {
    pub fn user(id: MessageId, text: &str) -> Self {
        Self {
            id,
            sender: Sender::User,
            content: RowContent::Plain(SharedString::from(text.to_string())),
            revealing: false,
        }
    }

    pub fn bot(id: MessageId, lines: Vec<FormattedLine>, revealing: bool) -> Self {
        Self {
            id,
            sender: Sender::Bot,
            content: RowContent::Formatted(lines),
            revealing,
        }
    }
}

pub struct MessageList {
    rows: Vec<MessageRow>,
    display_name: SharedString,
    show_greeting: bool,
    loading: bool,
    thinking_dots: usize,
    thinking_task: Option<Task<()>>,
    scroll_manager: ScrollManager,
}

impl MessageList {
    pub fn new(display_name: impl Into<SharedString>, _cx: &mut Context<Self>) -> Self {
        Self {
            rows: Vec::new(),
            display_name: display_name.into(),
            show_greeting: true,
            loading: false,
            thinking_dots: 0,
            thinking_task: None,
            scroll_manager: ScrollManager::new(),
        }
    }

    pub fn set_rows(&mut self, rows: Vec<MessageRow>, cx: &mut Context<Self>) {
        if self.rows == rows {
            return;
        }

        self.rows = rows;
        self.scroll_manager.follow_content();
        cx.notify();
    }

    /// Replaces one row in place; used on every reveal tick.
    pub fn update_row(&mut self, row: MessageRow, cx: &mut Context<Self>) {
        let Some(existing) = self.rows.iter_mut().find(|existing| existing.id == row.id) else {
            return;
        };

        if *existing != row {
            *existing = row;
            cx.notify();
        }
    }

    pub fn set_greeting(&mut self, show_greeting: bool, cx: &mut Context<Self>) {
        if self.show_greeting != show_greeting {
            self.show_greeting = show_greeting;
            cx.notify();
        }
    }

    pub fn set_loading(&mut self, loading: bool, cx: &mut Context<Self>) {
        if self.loading == loading {
            return;
        }

        self.loading = loading;
        if loading {
            self.start_thinking_animation(cx);
            self.scroll_manager.follow_content();
        } else {
            self.thinking_task = None;
        }
        cx.notify();
    }

    pub fn follow_content(&mut self, cx: &mut Context<Self>) {
        self.scroll_manager.follow_content();
        cx.notify();
    }

    pub fn reset_scroll(&mut self, cx: &mut Context<Self>) {
        self.scroll_manager.reset();
        cx.notify();
    }

    fn start_thinking_animation(&mut self, cx: &mut Context<Self>) {
        self.thinking_dots = 0;
        self.thinking_task = Some(cx.spawn(async move |this, cx| {
            loop {
                cx.background_executor().timer(THINKING_DOTS_INTERVAL).await;

                let updated = this.update(cx, |this, cx| {
                    this.thinking_dots = next_thinking_dots(this.thinking_dots);
                    cx.notify();
                });
                if updated.is_err() {
                    break;
                }
            }
        }));
    }

    fn render_greeting(&self, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-greeting")
            .size_full()
            .items_center()
            .justify_center()
            .child(
                div()
                    .text_3xl()
                    .font_weight(FontWeight::BOLD)
                    .text_color(theme.primary)
                    .child(initial_greeting(&self.display_name)),
            )
            .into_any_element()
    }

    fn render_header(&self, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let (greeting, prompt) = conversation_header(&self.display_name);

        v_flex()
            .w_full()
            .mb_8()
            .text_3xl()
            .font_weight(FontWeight::BOLD)
            .child(div().text_color(theme.primary).child(greeting))
            .child(div().text_color(theme.foreground).child(prompt))
    }

    fn render_row(&self, row: &MessageRow, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        match &row.content {
            RowContent::Plain(text) => h_flex()
                .w_full()
                .justify_end()
                .items_start()
                .gap_2()
                .child(
                    div()
                        .max_w(USER_BUBBLE_MAX_WIDTH)
                        .px_4()
                        .py_2()
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .text_sm()
                        .child(text.clone()),
                )
                .child(render_avatar(USER_AVATAR, cx))
                .into_any_element(),
            RowContent::Formatted(lines) => h_flex()
                .w_full()
                .items_start()
                .gap_2()
                .child(render_avatar(BOT_AVATAR, cx))
                .child(
                    v_flex()
                        .flex_1()
                        .min_w_0()
                        .text_sm()
                        .text_color(theme.foreground)
                        .children(render_lines(row.id, lines, row.revealing, cx)),
                )
                .into_any_element(),
        }
    }

    fn render_thinking(&self, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        h_flex()
            .w_full()
            .items_center()
            .gap_2()
            .child(render_avatar(BOT_AVATAR, cx))
            .child(
                Label::new(thinking_text(self.thinking_dots))
                    .text_sm()
                    .text_color(theme.muted_foreground),
            )
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if self.show_greeting {
            return self.render_greeting(cx);
        }

        self.scroll_manager.update_follow_state();
        self.scroll_manager.apply_pending_scroll();

        div()
            .id("message-list-scroll")
            .size_full()
            .overflow_y_scroll()
            .track_scroll(self.scroll_manager.handle())
            .child(
                v_flex()
                    .w_full()
                    .max_w(CONTENT_MAX_WIDTH)
                    .mx_auto()
                    .px_4()
                    .py_6()
                    .gap_6()
                    .child(self.render_header(cx))
                    .children(self.rows.iter().map(|row| self.render_row(row, cx)))
                    .when(self.loading, |list| list.child(self.render_thinking(cx))),
            )
            .into_any_element()
    }
}

fn render_avatar(initial: &'static str, cx: &App) -> impl IntoElement {
    let theme = cx.theme();

    div()
        .size(AVATAR_SIZE)
        .flex_shrink_0()
        .rounded_full()
        .border_1()
        .border_color(theme.border)
        .bg(theme.muted)
        .flex()
        .items_center()
        .justify_center()
        .child(Label::new(initial).text_xs())
}

fn render_lines(
    message_id: MessageId,
    lines: &[FormattedLine],
    revealing: bool,
    cx: &App,
) -> Vec<AnyElement> {
    let last = lines.len().saturating_sub(1);

    lines
        .iter()
        .enumerate()
        .map(|(line_index, line)| {
            let with_cursor = revealing && line_index == last;
            render_line(message_id, line_index, line, with_cursor, cx)
        })
        .collect()
}

fn render_line(
    message_id: MessageId,
    line_index: usize,
    line: &FormattedLine,
    with_cursor: bool,
    cx: &App,
) -> AnyElement {
    let theme = cx.theme();

    if line.is_break() {
        return div()
            .h(BREAK_HEIGHT)
            .when(with_cursor, |el| el.child(REVEAL_CURSOR))
            .into_any_element();
    }

    h_flex()
        .w_full()
        .flex_wrap()
        .items_start()
        .children(
            line.blocks
                .iter()
                .enumerate()
                .map(|(block_index, block)| {
                    let id = ElementId::Name(SharedString::from(format!(
                        "message-{}-line-{line_index}-block-{block_index}",
                        message_id.0
                    )));
                    render_block(id, block, cx)
                }),
        )
        .when(with_cursor, |el| {
            el.child(div().text_color(theme.muted_foreground).child(REVEAL_CURSOR))
        })
        .into_any_element()
}

/// Bold label and indented body, shown as the header was written without its colon.
fn section_texts(label: &str, body: &str) -> (SharedString, SharedString) {
    (
        SharedString::from(label.to_string()),
        SharedString::from(body.to_string()),
    )
}

fn render_block(id: ElementId, block: &FormattedBlock, cx: &App) -> AnyElement {
    let theme = cx.theme();

    match block {
        FormattedBlock::Heading { title } => div()
            .font_weight(FontWeight::BOLD)
            .child(title.clone())
            .into_any_element(),
        FormattedBlock::LabeledSection { label, body } => {
            let (label, body) = section_texts(label, body);
            v_flex()
                .w_full()
                .child(div().font_weight(FontWeight::BOLD).child(label))
                .child(div().pl(SECTION_BODY_INDENT).child(body))
                .into_any_element()
        }
        FormattedBlock::Link { text, url } => {
            let url = url.clone();
            div()
                .id(id)
                .text_color(theme.primary)
                .cursor_pointer()
                .hover(|el| el.opacity(0.8))
                .child(text.clone())
                .on_click(move |_, _, cx| {
                    cx.open_url(&url);
                })
                .into_any_element()
        }
        FormattedBlock::PlainLine { text } => div().child(text.clone()).into_any_element(),
        FormattedBlock::Break => div().h(BREAK_HEIGHT).into_any_element(),
    }
}
