use std::sync::Once;

use pager_core::{
    DropInfo, LoadState, LoadType, Page, PageEvent, PagingConfig, PagingError, TransformablePage,
    ViewportHint, WindowState,
};
use pretty_assertions::assert_eq;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(pager_logging::initialize_for_tests);
}

/// Two-item page starting at `start`, keyed by the first item it would hold.
fn page(start: i32, prev: Option<i32>, next: Option<i32>) -> Page<i32, i32> {
    Page::new(vec![start, start + 1], prev, next)
}

fn window(config: PagingConfig) -> WindowState<i32, i32> {
    init_logging();
    WindowState::new(config, false)
}

#[test]
fn stale_generation_insert_is_rejected_after_drop() {
    let mut state = window(PagingConfig::new(2));
    assert!(state
        .insert(0, LoadType::Refresh, page(0, Some(-2), Some(2)).with_counts(2, 0))
        .unwrap());
    assert!(state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap());

    let stale = state.generation(LoadType::Prepend);
    let event = state.drop_pages(LoadType::Prepend, 1, 4).unwrap();
    assert_eq!(
        event,
        PageEvent::Drop {
            load_type: LoadType::Prepend,
            min_page_offset: 0,
            max_page_offset: 0,
            placeholders_remaining: 4,
        }
    );
    assert_eq!(state.generation(LoadType::Prepend), stale + 1);

    let applied = state
        .insert(stale, LoadType::Prepend, page(-2, None, Some(0)))
        .unwrap();
    assert!(!applied);
    assert_eq!(state.page_count(), 1);
    assert_eq!(state.storage_count(), 2);
    assert_eq!(state.placeholders_before(), 4);
}

#[test]
fn edge_loads_before_refresh_are_invariant_violations() {
    let mut state = window(PagingConfig::new(2));
    let err = state
        .insert(0, LoadType::Append, page(0, None, None))
        .unwrap_err();
    assert!(matches!(err, PagingError::InvariantViolation(_)));
    assert!(err.is_fatal());
}

#[test]
fn placeholders_follow_counts_or_shrink_by_page_len() {
    let mut state = window(PagingConfig::new(2));
    state
        .insert(0, LoadType::Refresh, page(0, Some(-2), Some(2)).with_counts(5, 5))
        .unwrap();

    state
        .insert(0, LoadType::Prepend, page(-2, Some(-4), Some(0)))
        .unwrap();
    assert_eq!(state.placeholders_before(), 3);

    state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap();
    assert_eq!(state.placeholders_after(), 3);

    state
        .insert(
            0,
            LoadType::Prepend,
            page(-4, None, Some(-2)).with_counts(0, 7),
        )
        .unwrap();
    assert_eq!(state.placeholders_before(), 0);
    // Prepend pages never touch the trailing count.
    assert_eq!(state.placeholders_after(), 3);
}

#[test]
fn disabled_placeholders_report_zero() {
    let config = PagingConfig::new(2)
        .with_placeholders(false)
        .with_prefetch_distance(2);
    let mut state = window(config);
    state
        .insert(0, LoadType::Refresh, page(0, None, None).with_counts(5, 5))
        .unwrap();

    assert_eq!(state.placeholders_before(), 0);
    assert_eq!(state.placeholders_after(), 0);
    match state.page_event(LoadType::Refresh).unwrap() {
        PageEvent::Insert {
            placeholders_before,
            placeholders_after,
            ..
        } => assert_eq!((placeholders_before, placeholders_after), (0, 0)),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn page_events_carry_offsets_relative_to_refresh_page() {
    let mut state = window(PagingConfig::new(2));
    state
        .insert(0, LoadType::Refresh, page(0, Some(-2), Some(2)))
        .unwrap();
    state
        .insert(0, LoadType::Prepend, page(-2, None, Some(0)))
        .unwrap();
    state
        .insert(0, LoadType::Append, page(2, Some(0), None))
        .unwrap();

    let prepend = state.page_event(LoadType::Prepend).unwrap();
    let append = state.page_event(LoadType::Append).unwrap();
    match (prepend, append) {
        (PageEvent::Insert { pages: before, .. }, PageEvent::Insert { pages: after, .. }) => {
            assert_eq!(before, vec![TransformablePage::new(-1, vec![-2, -1])]);
            assert_eq!(after, vec![TransformablePage::new(1, vec![2, 3])]);
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[test]
fn drop_info_keeps_viewport_and_prefetch_window() {
    let config = PagingConfig::new(2)
        .with_prefetch_distance(1)
        .with_max_size(4);
    let mut state = window(config);
    state
        .insert(0, LoadType::Refresh, page(0, None, Some(2)).with_counts(0, 10))
        .unwrap();
    state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap();
    state
        .insert(0, LoadType::Append, page(4, Some(2), Some(6)))
        .unwrap();
    assert_eq!(state.storage_count(), 6);

    let at_end = ViewportHint::new(2, 1);
    assert_eq!(
        state.drop_info(LoadType::Prepend, &at_end),
        Some(DropInfo {
            page_count: 1,
            placeholders_remaining: 2,
        })
    );

    let at_start = ViewportHint::new(0, 0);
    assert_eq!(state.drop_info(LoadType::Prepend, &at_start), None);
    assert_eq!(
        state.drop_info(LoadType::Append, &at_start),
        Some(DropInfo {
            page_count: 1,
            placeholders_remaining: 8,
        })
    );
}

#[test]
fn drop_info_is_disabled_without_max_size() {
    let mut state = window(PagingConfig::new(2).with_prefetch_distance(1));
    state
        .insert(0, LoadType::Refresh, page(0, None, Some(2)))
        .unwrap();
    for start in [2, 4, 6] {
        state
            .insert(0, LoadType::Append, page(start, Some(start - 2), Some(start + 2)))
            .unwrap();
    }
    assert_eq!(state.drop_info(LoadType::Prepend, &ViewportHint::new(3, 1)), None);
}

#[test]
fn drop_reopens_errored_edge() {
    let mut state = window(PagingConfig::new(2));
    state
        .insert(0, LoadType::Refresh, page(0, Some(-2), Some(2)))
        .unwrap();
    state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap();
    state.load_states_mut().set(
        LoadType::Append,
        false,
        LoadState::Error(PagingError::source_load("boom")),
    );
    state.stash_failed_hint(LoadType::Append, ViewportHint::new(1, 1));

    state.drop_pages(LoadType::Append, 1, 0).unwrap();

    assert_eq!(
        state.load_states().get(LoadType::Append, false),
        &LoadState::INCOMPLETE
    );
    assert_eq!(state.failed_hint(LoadType::Append), None);
    assert_eq!(state.generation(LoadType::Append), 1);
    assert_eq!(state.generation(LoadType::Prepend), 0);
}

#[test]
fn drop_rejects_impossible_counts() {
    let mut state = window(PagingConfig::new(2));
    state
        .insert(0, LoadType::Refresh, page(0, None, None))
        .unwrap();

    assert!(state.drop_pages(LoadType::Append, 0, 0).is_err());
    assert!(state.drop_pages(LoadType::Append, 2, 0).is_err());
    assert!(state.drop_pages(LoadType::Refresh, 1, 0).is_err());
}

#[test]
fn next_load_key_honours_prefetch_generation_and_error() {
    let mut state = window(PagingConfig::new(2).with_prefetch_distance(2));
    state
        .insert(0, LoadType::Refresh, page(0, Some(-2), Some(2)))
        .unwrap();
    let hint = ViewportHint::new(0, 0);

    assert_eq!(state.next_load_key(LoadType::Append, 0, &hint), Some(2));
    assert_eq!(state.next_load_key(LoadType::Prepend, 0, &hint), Some(-2));
    assert_eq!(state.next_load_key(LoadType::Append, 1, &hint), None);
    assert_eq!(state.next_load_key(LoadType::Refresh, 0, &hint), None);

    state.load_states_mut().set(
        LoadType::Append,
        false,
        LoadState::Error(PagingError::source_load("boom")),
    );
    assert_eq!(state.next_load_key(LoadType::Append, 0, &hint), None);
    assert_eq!(
        state.next_load_key(LoadType::Append, 0, &hint.for_retry()),
        Some(2)
    );

    state.load_states_mut().set(LoadType::Append, false, LoadState::INCOMPLETE);
    state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap();
    state
        .insert(0, LoadType::Append, page(4, Some(2), Some(6)))
        .unwrap();
    // Four items already loaded past the viewport.
    assert_eq!(state.next_load_key(LoadType::Append, 0, &hint), None);
}

#[test]
fn hints_outside_window_extend_prefetch() {
    let mut state = window(PagingConfig::new(2).with_prefetch_distance(1));
    state
        .insert(0, LoadType::Refresh, page(0, None, Some(2)))
        .unwrap();
    state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap();

    assert_eq!(state.hint_offset(&ViewportHint::new(0, 1)), Some(0));
    assert_eq!(state.hint_offset(&ViewportHint::new(3, 0)), Some(3));
    assert_eq!(state.hint_offset(&ViewportHint::new(-1, 1)), Some(-1));
    assert_eq!(
        state.next_load_key(LoadType::Append, 0, &ViewportHint::new(3, 0)),
        Some(4)
    );
}

#[test]
fn paging_state_anchors_on_hint() {
    let mut state = window(PagingConfig::new(2));
    state
        .insert(0, LoadType::Refresh, page(0, Some(-2), None).with_counts(3, 0))
        .unwrap();
    state
        .insert(0, LoadType::Prepend, page(-2, Some(-4), Some(0)))
        .unwrap();

    let paging_state = state.current_paging_state(Some(&ViewportHint::new(0, 1)));
    assert_eq!(paging_state.placeholders_before, 1);
    assert_eq!(paging_state.anchor_position, Some(4));
    assert_eq!(paging_state.pages.len(), 2);
    assert_eq!(paging_state.closest_item_to_position(4), Some(&1));
    assert_eq!(paging_state.closest_item_to_position(0), Some(&-2));
    assert_eq!(paging_state.first_item(), Some(&-2));
    assert_eq!(paging_state.last_item(), Some(&1));
    let page_at = |position| {
        paging_state
            .closest_page_to_position(position)
            .map(|page| page.data.clone())
    };
    assert_eq!(page_at(4), Some(vec![0, 1]));
    assert_eq!(page_at(0), Some(vec![-2, -1]));
    assert_eq!(page_at(99), Some(vec![0, 1]));

    assert_eq!(state.current_paging_state(None).anchor_position, None);
}

#[test]
fn refresh_over_existing_window_bumps_generations() {
    let mut state = window(PagingConfig::new(2));
    state
        .insert(0, LoadType::Refresh, page(0, Some(-2), Some(2)))
        .unwrap();
    state
        .insert(0, LoadType::Refresh, page(10, Some(8), Some(12)))
        .unwrap();

    assert_eq!(state.generation(LoadType::Prepend), 1);
    assert_eq!(state.generation(LoadType::Append), 1);
    assert_eq!(state.page_count(), 1);
    assert!(!state
        .insert(0, LoadType::Append, page(2, Some(0), Some(4)))
        .unwrap());
}
