mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{frame, page};
use dom_adapter::{Dom, VirtualDom};
use iframe_resizer::{AgentConfig, AgentHandle, PageAgent, PageContext};
use resizer_core_types::{Locator, SelectionRecord};
use resizer_event_bus::{link, Inbox, Outbox};
use resizer_selection_store::SelectionStore;
use sync_bridge::{PageToUi, UiToPage, PAGE_PEER, UI_PEER};
use tokio::time::{sleep, timeout};

fn saved_player() -> SelectionStore {
    let store = SelectionStore::in_memory();
    store
        .save(&SelectionRecord {
            name: "player".into(),
            locator: Locator::new("iframe[id=\"player\"]", 0),
            width: 50.0,
            height: 40.0,
            z_index: 7,
            full_view_on: false,
        })
        .unwrap();
    store
}

struct Running {
    dom: Arc<VirtualDom>,
    store: SelectionStore,
    handle: AgentHandle,
    to_page: Outbox<UiToPage>,
    ui_inbox: Inbox<PageToUi>,
}

/// A reloaded page without the recorded frame, with its agent running.
fn reloaded() -> Running {
    let dom = page();
    let store = saved_player();
    let (page_end, ui_end) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
    let (outbox, page_inbox) = page_end.split();
    let (to_page, ui_inbox) = ui_end.split();
    let events = dom.subscribe();
    let agent = PageAgent::new(
        PageContext::new(dom.clone(), store.clone(), outbox),
        AgentConfig::default(),
    );
    let handle = agent.spawn(page_inbox, events);
    dom.fire_load();
    Running {
        dom,
        store,
        handle,
        to_page,
        ui_inbox,
    }
}

#[tokio::test(start_paused = true)]
async fn frame_arriving_before_last_retry_is_styled() {
    let run = reloaded();

    sleep(Duration::from_millis(9_500)).await;
    let player = run.dom.append(frame("/live").attr("id", "player"));
    assert_eq!(run.dom.attribute(player, "style"), None);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(run.dom.attribute(player, "style"), None);

    sleep(Duration::from_millis(200)).await;
    let style = run.dom.inline_style(player);
    assert_eq!(style.get("width"), Some("50vw"));
    assert_eq!(style.get("height"), Some("40vh"));
    assert!(run.dom.scrolled().contains(&player));

    run.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retries_stop_after_the_cap_and_keep_the_record() {
    let run = reloaded();
    let before = run.store.load();

    sleep(Duration::from_millis(10_500)).await;
    let player = run.dom.append(frame("/live").attr("id", "player"));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(run.dom.attribute(player, "style"), None);
    assert_eq!(run.store.load(), before);

    run.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn present_frame_is_styled_on_load_and_reported_on_fetch() {
    let dom = page();
    let player = dom.append(frame("/live").attr("id", "player"));
    let store = saved_player();
    let (page_end, ui_end) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
    let (outbox, page_inbox) = page_end.split();
    let (to_page, mut ui_inbox) = ui_end.split();
    let events = dom.subscribe();
    let handle = PageAgent::new(
        PageContext::new(dom.clone(), store.clone(), outbox),
        AgentConfig::default(),
    )
    .spawn(page_inbox, events);

    dom.fire_load();
    sleep(Duration::from_millis(10)).await;
    to_page.post(&UiToPage::Fetch);
    let reply = timeout(Duration::from_secs(1), ui_inbox.recv())
        .await
        .expect("agent answered")
        .expect("link open");

    let record = store.load().unwrap();
    assert_eq!(reply, PageToUi::update(&record));
    assert_eq!(dom.inline_style(player).get("width"), Some("50vw"));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn clear_during_retries_stops_them() {
    let mut run = reloaded();

    sleep(Duration::from_millis(2_500)).await;
    run.to_page.post(&UiToPage::Clear);
    let reply = timeout(Duration::from_secs(1), run.ui_inbox.recv())
        .await
        .expect("agent answered")
        .expect("link open");
    assert_eq!(reply, PageToUi::Clear);
    assert!(run.store.load().is_none());

    let player = run.dom.append(frame("/live").attr("id", "player"));
    sleep(Duration::from_secs(3)).await;
    assert_eq!(run.dom.attribute(player, "style"), None);

    run.handle.shutdown().await.unwrap();
}
