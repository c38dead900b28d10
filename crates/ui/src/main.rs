use std::sync::Arc;

use gpui::*;
use gpui_component::Root;
use schoolcatch::app::{ChatAppShell, NewChat, Quit, ToggleSidebar};
use schoolcatch::settings::Settings;
use schoolcatch_chat::ChatStore;
use schoolcatch_transport::HttpChatClient;

/// Application entry point.
///
/// Loads settings, builds the HTTP client and the chat store, then opens the
/// main window wrapped in gpui-component's `Root`.
fn main() {
    tracing_subscriber::fmt::init();

    let settings = Arc::new(Settings::load());
    let client = match HttpChatClient::new(settings.client_config()) {
        Ok(client) => client,
        Err(error) => {
            tracing::error!(%error, "failed to build the chat client");
            std::process::exit(1);
        }
    };
    let store = Arc::new(ChatStore::new(Arc::new(client)).with_language(settings.language.clone()));
    tracing::info!(
        endpoint = %settings.endpoint,
        language = %settings.language,
        session_id = %store.session_id(),
        "starting schoolcatch"
    );

    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);

        // Must run before any Root is created.
        gpui_component::init(cx);

        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([
            KeyBinding::new("cmd-q", Quit, None),
            KeyBinding::new("cmd-n", NewChat, None),
            KeyBinding::new("cmd-b", ToggleSidebar, None),
        ]);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(1200.), px(800.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        appears_transparent: true,
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    // Client decorations so the shell draws its own title area.
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                cx.open_window(options, |window, cx| {
                    let shell = cx.new(|cx| ChatAppShell::new(settings, store, window, cx));
                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                cx.activate(true);
            })
        })
        .detach();
    });
}
