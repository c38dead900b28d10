use std::sync::Arc;

use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};
use schoolcatch_chat::ChatStore;

use crate::chat::{ChatView, SidebarToggleClicked};
use crate::settings::Settings;

/// Sidebar width when expanded.
pub const SIDEBAR_EXPANDED_WIDTH: f32 = 256.0;
/// Icon rail width when collapsed.
pub const SIDEBAR_COLLAPSED_WIDTH: f32 = 56.0;
#[cfg(target_os = "macos")]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 78.0;
#[cfg(not(target_os = "macos"))]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 16.0;

const _: () = {
    assert!(SIDEBAR_COLLAPSED_WIDTH > 0.0);
    assert!(SIDEBAR_COLLAPSED_WIDTH < SIDEBAR_EXPANDED_WIDTH);
};

gpui::actions!(shell, [NewChat, ToggleSidebar, Quit,]);

pub fn sidebar_width(collapsed: bool) -> f32 {
    if collapsed {
        SIDEBAR_COLLAPSED_WIDTH
    } else {
        SIDEBAR_EXPANDED_WIDTH
    }
}

fn window_toolbar_height(window: &Window) -> Pixels {
    (1.75 * window.rem_size()).max(px(34.0))
}

/// Root layout: sidebar on the left, the conversation on the right.
///
/// Collapsing the sidebar is purely presentational and never touches the
/// chat session. Shell actions dispatch from whatever is focused inside it,
/// usually the message input.
pub struct ChatAppShell {
    chat_view: Entity<ChatView>,
    sidebar_collapsed: bool,
}

impl ChatAppShell {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<ChatStore>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let chat_view = cx.new(|cx| ChatView::new(&settings, store, window, cx));

        cx.subscribe(&chat_view, |this, _, _event: &SidebarToggleClicked, cx| {
            this.toggle_sidebar(cx);
        })
        .detach();

        Self {
            chat_view,
            sidebar_collapsed: false,
        }
    }

    fn toggle_sidebar(&mut self, cx: &mut Context<Self>) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        cx.notify();
    }

    fn new_chat(&mut self, cx: &mut Context<Self>) {
        tracing::info!("new chat requested");
        self.chat_view
            .update(cx, |chat_view, cx| chat_view.new_chat(cx));
    }
}

impl Render for ChatAppShell {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let toolbar_height = window_toolbar_height(window);

        div()
            .size_full()
            .relative()
            .bg(theme.background)
            .on_action(cx.listener(|this, _: &NewChat, _window, cx| {
                this.new_chat(cx);
            }))
            .on_action(cx.listener(|this, _: &ToggleSidebar, _window, cx| {
                this.toggle_sidebar(cx);
            }))
            .child(
                h_flex()
                    .id("app-shell-body")
                    .size_full()
                    .min_w_0()
                    .min_h_0()
                    .pt(toolbar_height)
                    .overflow_hidden()
                    .child(self.render_sidebar(cx))
                    .child(
                        v_flex()
                            .id("main-content")
                            .flex_1()
                            .h_full()
                            .min_w_0()
                            .min_h_0()
                            .overflow_hidden()
                            .child(self.chat_view.clone()),
                    ),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .left_0()
                    .right_0()
                    .child(self.render_top_bar(window, toolbar_height, cx)),
            )
    }
}

impl ChatAppShell {
    fn render_collapsed_sidebar(&self, cx: &Context<Self>) -> AnyElement {
        v_flex()
            .id("collapsed-sidebar")
            .size_full()
            .items_center()
            .justify_start()
            .gap_2()
            .py_3()
            .px_2()
            .child(
                Button::new("sidebar-expand")
                    .ghost()
                    .small()
                    .icon(IconName::PanelLeftOpen)
                    .on_click(cx.listener(|this, _, _window, cx| {
                        this.toggle_sidebar(cx);
                    })),
            )
            .child(
                Button::new("new-chat-collapsed")
                    .ghost()
                    .small()
                    .icon(IconName::Plus)
                    .on_click(cx.listener(|this, _, _window, cx| {
                        this.new_chat(cx);
                    })),
            )
            .into_any_element()
    }

    fn render_sidebar(&self, cx: &Context<Self>) -> impl IntoElement {
        let collapsed = self.sidebar_collapsed;
        let content = if collapsed {
            self.render_collapsed_sidebar(cx)
        } else {
            self.chat_view.read(cx).sidebar().clone().into_any_element()
        };
        let theme = cx.theme();

        div()
            .id("sidebar-container")
            .h_full()
            .min_w_0()
            .flex_shrink_0()
            .w(px(sidebar_width(collapsed)))
            .overflow_hidden()
            .bg(theme.background)
            .border_r_1()
            .border_color(theme.border)
            .child(content)
    }

    /// Drag strip above the content; on Linux it also hosts the window buttons.
    fn render_top_bar(&self, window: &Window, toolbar_height: Pixels, cx: &Context<Self>) -> Div {
        let theme = cx.theme();

        h_flex()
            .window_control_area(WindowControlArea::Drag)
            .on_mouse_down(MouseButton::Left, |event, window, _| {
                if event.click_count == 1 {
                    window.start_window_move();
                }
            })
            .w_full()
            .h(toolbar_height)
            .pl(px(WINDOW_TOOLBAR_LEFT_SAFE_PADDING))
            .pr_4()
            .items_center()
            .justify_end()
            .bg(theme.background)
            .border_b_1()
            .border_color(theme.border)
            .when(cfg!(target_os = "linux"), |bar| {
                bar.child(linux_window_controls(window))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowButton {
    Minimize,
    Zoom,
    Close,
}

impl WindowButton {
    const ALL: [WindowButton; 3] = [Self::Minimize, Self::Zoom, Self::Close];

    fn id(self) -> &'static str {
        match self {
            Self::Minimize => "window-minimize",
            Self::Zoom => "window-zoom",
            Self::Close => "window-close",
        }
    }

    fn icon(self, maximized: bool) -> IconName {
        match self {
            Self::Minimize => IconName::WindowMinimize,
            Self::Zoom if maximized => IconName::WindowRestore,
            Self::Zoom => IconName::WindowMaximize,
            Self::Close => IconName::WindowClose,
        }
    }

    fn apply(self, window: &mut Window) {
        match self {
            Self::Minimize => window.minimize_window(),
            Self::Zoom => window.zoom_window(),
            Self::Close => window.remove_window(),
        }
    }
}

fn linux_window_controls(window: &Window) -> Div {
    let maximized = window.is_maximized();

    h_flex()
        .gap_2()
        // Button presses must not start a window drag.
        .on_mouse_down(MouseButton::Left, |_, _, cx| cx.stop_propagation())
        .children(WindowButton::ALL.into_iter().map(|button| {
            Button::new(button.id())
                .ghost()
                .small()
                .icon(button.icon(maximized))
                .on_click(move |_, window, _| button.apply(window))
        }))
}
