use resizer_event_bus::link;
use sync_bridge::{
    PageToUi, PopupAgent, SelectionSnapshot, UiToPage, UpdatePatch, PAGE_PEER, UI_PEER,
};

fn snapshot(full_view_on: bool) -> SelectionSnapshot {
    SelectionSnapshot {
        name: "player".into(),
        width: 60.0,
        height: 45.5,
        full_view_on,
    }
}

#[tokio::test]
async fn popup_commands_reach_the_page() {
    let (page, ui) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
    let (_page_out, mut page_in) = page.split();
    let (ui_out, _ui_in) = ui.split();
    let mut popup = PopupAgent::new(ui_out);

    popup.open();
    popup.select(true);
    assert!(!popup.view().select_enabled);
    assert!(popup.view().end_selection_visible);
    popup.end_selection();
    popup.set_width("33.3");
    popup.set_height("not a number");
    popup.discard();

    assert_eq!(page_in.recv().await, Some(UiToPage::Fetch));
    assert_eq!(
        page_in.drain(),
        vec![
            UiToPage::Select { full_view_on: true },
            UiToPage::EndSelection,
            UiToPage::Update(UpdatePatch::width(33.3)),
            UiToPage::Clear,
        ]
    );
}

#[tokio::test]
async fn popup_renders_page_state() {
    let (page, ui) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
    let (page_out, _page_in) = page.split();
    let (ui_out, mut ui_in) = ui.split();
    let mut popup = PopupAgent::new(ui_out);

    page_out.post(&PageToUi::AwaitSelection);
    assert_eq!(popup.pump(&mut ui_in), 1);
    assert!(popup.view().end_selection_visible);
    assert!(!popup.view().select_enabled);
    assert!(!popup.view().has_selection());

    page_out.post(&PageToUi::Update(snapshot(false)));
    popup.pump(&mut ui_in);
    let view = popup.view().clone();
    assert_eq!(view.legend, "player");
    assert_eq!(view.width, Some(60.0));
    assert_eq!(view.height, Some(45.5));
    assert!(view.fieldset_enabled);
    assert!(!view.end_selection_visible);
    assert!(!view.select_enabled);

    page_out.post(&PageToUi::Clear);
    popup.pump(&mut ui_in);
    assert_eq!(popup.view().legend, "selected iframe");
    assert!(popup.view().select_enabled);
    assert!(!popup.view().has_selection());
}

#[tokio::test]
async fn toggle_view_flips_and_requests_full_view() {
    let (page, ui) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
    let (page_out, mut page_in) = page.split();
    let (ui_out, mut ui_in) = ui.split();
    let mut popup = PopupAgent::new(ui_out);

    page_out.post(&PageToUi::Update(snapshot(false)));
    popup.pump(&mut ui_in);
    popup.toggle_view();
    assert!(popup.view().full_view_on);
    assert_eq!(
        page_in.recv().await,
        Some(UiToPage::Update(UpdatePatch::full_view(true)))
    );
}

#[tokio::test]
async fn malformed_update_frame_is_dropped() {
    let (_page, ui) = link::<PageToUi, UiToPage>(PAGE_PEER, UI_PEER);
    assert!(ui.inject_raw(r#"{"action":"update","iframeName":"x","width":"wide"}"#));
    assert!(ui.inject_raw(r#"{"action":"awaitSelection"}"#));
    let (ui_out, mut ui_in) = ui.split();
    let mut popup = PopupAgent::new(ui_out);

    assert_eq!(popup.pump(&mut ui_in), 1);
    assert!(popup.view().end_selection_visible);
    assert!(!popup.view().has_selection());
}
