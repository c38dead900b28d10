use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    v_flex,
};

use crate::settings::Settings;

pub const NEW_CHAT_LABEL: &str = "새 채팅";
pub const NOTICE_LABEL: &str = "공지사항";
pub const HOMEPAGE_LABEL: &str = "공식 홈페이지";
pub const UNIVERSITY_LABEL: &str = "한성대학교";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarNewChatClicked;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarToggleClicked;

impl EventEmitter<SidebarNewChatClicked> for ChatSidebar {}
impl EventEmitter<SidebarToggleClicked> for ChatSidebar {}

/// Expanded sidebar: session actions on top, university links at the bottom.
pub struct ChatSidebar {
    notice_url: SharedString,
    homepage_url: SharedString,
}

impl ChatSidebar {
    pub fn new(settings: &Settings, _cx: &mut Context<Self>) -> Self {
        Self {
            notice_url: settings.notice_url.clone().into(),
            homepage_url: settings.homepage_url.clone().into(),
        }
    }

    fn open_link(url: &SharedString, cx: &mut App) {
        tracing::debug!(url = %url, "opening external link");
        cx.open_url(url);
    }

    fn render_toolbar(&self, cx: &Context<Self>) -> impl IntoElement {
        h_flex()
            .w_full()
            .items_center()
            .justify_between()
            .px_3()
            .pt(px(8.))
            .pb_2()
            .child(
                Button::new("sidebar-toggle")
                    .ghost()
                    .small()
                    .icon(IconName::PanelLeftClose)
                    .on_click(cx.listener(|_, _, _, cx| {
                        cx.emit(SidebarToggleClicked);
                    })),
            )
    }

    fn render_actions(&self, cx: &Context<Self>) -> impl IntoElement {
        v_flex()
            .w_full()
            .gap_3()
            .px_3()
            .child(
                Button::new("sidebar-new-chat")
                    .ghost()
                    .small()
                    .icon(IconName::Plus)
                    .child(NEW_CHAT_LABEL)
                    .on_click(cx.listener(|_, _, _, cx| {
                        cx.emit(SidebarNewChatClicked);
                    })),
            )
            .child(
                Button::new("sidebar-notice")
                    .ghost()
                    .small()
                    .child(NOTICE_LABEL)
                    .on_click(cx.listener(|this, _, _, cx| {
                        Self::open_link(&this.notice_url, cx);
                    })),
            )
    }

    fn render_footer(&self, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .w_full()
            .items_center()
            .gap_2()
            .px_3()
            .py_4()
            .border_t_1()
            .border_color(theme.border)
            .child(
                Label::new(UNIVERSITY_LABEL)
                    .text_xs()
                    .text_color(theme.muted_foreground),
            )
            .child(
                Button::new("sidebar-homepage")
                    .small()
                    .primary()
                    .child(HOMEPAGE_LABEL)
                    .on_click(cx.listener(|this, _, _, cx| {
                        Self::open_link(&this.homepage_url, cx);
                    })),
            )
    }
}

impl Render for ChatSidebar {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .size_full()
            .min_w_0()
            .overflow_hidden()
            .justify_between()
            .bg(theme.background)
            .child(
                v_flex()
                    .w_full()
                    .gap_4()
                    .child(self.render_toolbar(cx))
                    .child(self.render_actions(cx)),
            )
            .child(self.render_footer(cx))
    }
}
