use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::Local;
use reqwest::{Client, Url};
use rusqlite::Connection;
use serde_json::json;

use crate::config::AppConfig;
use crate::domain::entities::item::{ListItem, TableRow};
use crate::domain::entities::query::{FetchFailure, FetchResult, RemoteQueryDescriptor};
use crate::domain::entities::table::{
    FilterState, PaginationState, RowId, SortDescriptor, SortOrder, TableState,
};
use crate::infra::http::envelope::ListEnvelope;
use crate::infra::http::rest_source::{endpoint_url, RestListSource};
use crate::infra::import::csv::{import_csv_collection, read_csv_table};
use crate::infra::import::sample::{water_level_sample, WATER_LEVEL_COLLECTION};
use crate::infra::sqlite::queries::{create_collection_from_rows, find_collection};
use crate::infra::sqlite::repo::SqliteListSource;
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::source::{
    ListPage, ListRequest, ListSource, Notice, NotificationSink, SourceError, StaticCredentials,
};
use crate::usecase::services::fetch_binding::DataFetchBinding;
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::presentation::{page_window, render, summarize, ColumnDef, TableBody};
use crate::usecase::services::query_codec::{from_query_pairs, to_query_pairs, CodecError, QueryCodec};
use crate::usecase::services::table_controller::{
    submit_if_current, RemoteTableController, TableOptions,
};
use crate::usecase::services::table_store::TableStateStore;

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("sihka-{prefix}-{nanos}"))
}

fn size(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).expect("page size should be non-zero")
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn descriptor(page: usize, size: usize) -> RemoteQueryDescriptor {
    RemoteQueryDescriptor {
        page,
        size,
        keyword: None,
        sort_by: None,
        sort_order: None,
    }
}

struct ScriptedSource {
    total: u64,
    delays: HashMap<usize, Duration>,
    failure: Option<SourceError>,
    requests: Mutex<Vec<ListRequest>>,
}

impl ScriptedSource {
    fn new(total: u64) -> Self {
        Self {
            total,
            delays: HashMap::new(),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn delay_page(mut self, page: usize, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    fn failing(mut self, failure: SourceError) -> Self {
        self.failure = Some(failure);
        self
    }

    fn requests(&self) -> Vec<ListRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ListSource<ListItem> for ScriptedSource {
    async fn fetch(&self, request: ListRequest) -> Result<ListPage<ListItem>, SourceError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(delay) = self.delays.get(&request.descriptor.page) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let start = request.descriptor.offset() as u64;
        let end = (start + request.descriptor.size as u64).min(self.total);
        let rows = (start..end)
            .map(|n| {
                ListItem::new(format!("row-{n}"), format!("Row {n}"))
                    .with("page", request.descriptor.page as u64)
            })
            .collect();
        Ok(ListPage {
            rows,
            total_count: self.total,
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notices lock").clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices lock").push(notice);
    }
}

fn binding_over(source: &Arc<ScriptedSource>) -> Arc<DataFetchBinding<ListItem>> {
    Arc::new(DataFetchBinding::new(
        source.clone(),
        Arc::new(StaticCredentials(None)),
    ))
}

fn controller_over(source: &Arc<ScriptedSource>) -> RemoteTableController<ListItem> {
    RemoteTableController::new(binding_over(source), TableOptions::new("label"))
}

fn label_columns() -> Vec<ColumnDef<ListItem>> {
    vec![
        ColumnDef::new("id", "ID"),
        ColumnDef::new("label", "Nama"),
        ColumnDef::new("page", "Halaman").unsortable(),
    ]
}

#[test]
fn encode_maps_zero_based_state_to_one_based_descriptor() {
    let codec = QueryCodec::new(Some("label".to_string()), None);
    let filter = FilterState {
        column_id: "label".to_string(),
        value: "  jurug ".to_string(),
    };
    let sort = SortDescriptor::desc("recorded_at");

    let encoded = codec.encode(&PaginationState::new(2, size(20)), Some(&sort), Some(&filter));

    assert_eq!(encoded.page, 3);
    assert_eq!(encoded.size, 20);
    assert_eq!(encoded.offset(), 40);
    assert_eq!(encoded.keyword.as_deref(), Some("jurug"));
    assert_eq!(encoded.sort_by.as_deref(), Some("recorded_at"));
    assert_eq!(encoded.sort_order, Some(SortOrder::Desc));
}

#[test]
fn encode_omits_blank_keyword_and_falls_back_to_default_sort() {
    let codec = QueryCodec::new(Some("label".to_string()), Some(SortDescriptor::asc("label")));
    let blank = FilterState {
        column_id: "label".to_string(),
        value: "   ".to_string(),
    };

    let encoded = codec.encode(&PaginationState::default(), None, Some(&blank));

    assert_eq!(encoded.page, 1);
    assert_eq!(encoded.keyword, None);
    assert_eq!(encoded.sort_by.as_deref(), Some("label"));
    assert_eq!(encoded.sort_order, Some(SortOrder::Asc));
}

#[test]
fn decode_restores_state_and_rejects_zero_page() {
    let codec = QueryCodec::new(Some("station".to_string()), None);
    let wire = RemoteQueryDescriptor {
        page: 4,
        size: 30,
        keyword: Some("colo".to_string()),
        sort_by: Some("level_cm".to_string()),
        sort_order: Some(SortOrder::Desc),
    };

    let (pagination, sort, filter) = codec.decode(&wire).expect("descriptor should decode");

    assert_eq!(pagination, PaginationState::new(3, size(30)));
    assert_eq!(sort, Some(SortDescriptor::desc("level_cm")));
    assert_eq!(
        filter,
        Some(FilterState {
            column_id: "station".to_string(),
            value: "colo".to_string(),
        })
    );
    assert_eq!(codec.decode(&descriptor(0, 10)), Err(CodecError::ZeroPage));
    assert_eq!(codec.decode(&descriptor(1, 0)), Err(CodecError::ZeroSize));
}

#[test]
fn query_pairs_follow_documented_order_and_skip_absent_values() {
    let mut full = descriptor(2, 10);
    full.keyword = Some("napel".to_string());
    full.sort_by = Some("station".to_string());
    full.sort_order = Some(SortOrder::Asc);

    let keys: Vec<&str> = to_query_pairs(&full).into_iter().map(|(key, _)| key).collect();
    assert_eq!(keys, ["page", "size", "keyword", "sort_by", "sort_order"]);

    let bare = to_query_pairs(&descriptor(1, 10));
    assert_eq!(
        bare,
        vec![("page", "1".to_string()), ("size", "10".to_string())]
    );
}

#[test]
fn from_query_pairs_ignores_unknown_keys_and_orphan_sort_order() {
    let parsed = from_query_pairs([
        ("tab", "stations"),
        ("page", "2"),
        ("size", "20"),
        ("keyword", ""),
        ("sort_order", "desc"),
    ])
    .expect("pairs should parse");

    assert_eq!(parsed, descriptor(2, 20));

    assert_eq!(
        from_query_pairs([("size", "10")]),
        Err(CodecError::Missing("page"))
    );
    assert_eq!(
        from_query_pairs([("page", "0"), ("size", "10")]),
        Err(CodecError::ZeroPage)
    );
    assert!(matches!(
        from_query_pairs([("page", "1"), ("size", "10"), ("sort_by", "id"), ("sort_order", "up")]),
        Err(CodecError::InvalidValue { key: "sort_order", .. })
    ));
}

#[test]
fn toggle_sort_cycles_ascending_descending_none() {
    let mut store = TableStateStore::new("label", size(10));

    store.toggle_sort("station");
    assert_eq!(store.sort(), Some(&SortDescriptor::asc("station")));
    store.toggle_sort("station");
    assert_eq!(store.sort(), Some(&SortDescriptor::desc("station")));
    store.toggle_sort("station");
    assert_eq!(store.sort(), None);

    store.toggle_sort("station");
    store.toggle_sort("river");
    assert_eq!(store.sort(), Some(&SortDescriptor::asc("river")));
}

#[test]
fn set_filter_returns_to_first_page_and_clears_on_empty_text() {
    let mut store = TableStateStore::new("station", size(10));
    store.set_page_index(4);
    let before = store.revision();

    store.set_filter("jurug");

    assert_eq!(store.pagination().page_index, 0);
    assert_eq!(store.filter().map(|filter| filter.column_id.as_str()), Some("station"));
    assert!(store.revision() > before);

    store.set_filter("");
    assert_eq!(store.filter(), None);
    assert_eq!(store.state().filter_text(), "");
}

#[test]
fn set_page_size_keeps_first_visible_row_on_screen() {
    let mut store = TableStateStore::new("label", size(10));
    store.set_page_index(5);

    store.set_page_size(size(20));
    assert_eq!(store.pagination(), PaginationState::new(2, size(20)));

    store.set_page_size(size(50));
    assert_eq!(store.pagination(), PaginationState::new(0, size(50)));
}

#[test]
fn observe_row_count_clamps_page_into_range() {
    let mut store = TableStateStore::new("label", size(10));
    store.set_page_index(7);
    assert_eq!(store.page_count(), 0);

    assert!(store.observe_row_count(25));
    assert_eq!(store.pagination().page_index, 2);
    assert_eq!(store.page_count(), 3);
    assert!(!store.can_next_page());

    store.set_page_index(9);
    assert_eq!(store.pagination().page_index, 2);

    assert!(store.observe_row_count(0));
    assert_eq!(store.pagination().page_index, 0);
    assert!(!store.can_previous_page());
}

#[test]
fn observe_row_count_only_bumps_revision_on_change() {
    let mut store = TableStateStore::new("label", size(10));
    store.observe_row_count(25);
    let revision = store.revision();

    assert!(!store.observe_row_count(25));
    assert_eq!(store.revision(), revision);

    assert!(!store.observe_row_count(40));
    assert_ne!(store.revision(), revision);
}

#[test]
fn prune_selection_keeps_only_rendered_rows() {
    let mut store = TableStateStore::new("label", size(10));
    store.toggle_row(RowId::from("a"));
    store.toggle_row(RowId::from("b"));
    store.toggle_row(RowId::from("c"));
    store.toggle_row(RowId::from("c"));

    let visible = [RowId::from("b"), RowId::from("z")];
    store.prune_selection(visible.iter());

    assert_eq!(store.selection(), &BTreeSet::from([RowId::from("b")]));
}

#[tokio::test(start_paused = true)]
async fn stale_response_never_overwrites_newer_result() {
    let source = Arc::new(
        ScriptedSource::new(100)
            .delay_page(1, ms(300))
            .delay_page(2, ms(20)),
    );
    let binding = binding_over(&source);

    let slow = binding.submit(descriptor(1, 10));
    let fast = binding.submit(descriptor(2, 10));

    fast.await.expect("fast fetch should finish");
    let settled = binding.snapshot();
    assert!(!settled.is_loading);
    assert_eq!(settled.rows.first().map(|row| row.id.as_str()), Some("row-10"));

    slow.await.expect("slow fetch should finish");
    assert_eq!(binding.snapshot(), settled);
    assert_eq!(binding.current_descriptor(), Some(descriptor(2, 10)));
    assert_eq!(binding.generation(), 2);
}

#[tokio::test(start_paused = true)]
async fn early_stale_response_keeps_loading_until_latest_arrives() {
    let source = Arc::new(
        ScriptedSource::new(100)
            .delay_page(1, ms(20))
            .delay_page(2, ms(300)),
    );
    let binding = binding_over(&source);

    let early = binding.submit(descriptor(1, 10));
    let latest = binding.submit(descriptor(2, 10));

    early.await.expect("early fetch should finish");
    let pending = binding.snapshot();
    assert!(pending.is_loading);
    assert!(pending.rows.is_empty());
    assert_eq!(pending.total_count, 0);

    latest.await.expect("latest fetch should finish");
    let settled = binding.snapshot();
    assert!(!settled.is_loading);
    assert_eq!(settled.rows[0].id, "row-10");
    assert_eq!(settled.total_count, 100);
}

#[tokio::test(start_paused = true)]
async fn refresh_resubmits_current_descriptor() {
    let source = Arc::new(ScriptedSource::new(30));
    let binding = binding_over(&source);
    assert!(binding.refresh().is_none());

    let mut wire = descriptor(2, 10);
    wire.keyword = Some("row".to_string());
    binding
        .submit(wire.clone())
        .await
        .expect("fetch should finish");

    binding
        .refresh()
        .expect("a descriptor was submitted")
        .await
        .expect("refresh should finish");

    let requests = source.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].descriptor, wire);
    assert_eq!(binding.current_descriptor(), Some(wire));
    assert_eq!(binding.generation(), 2);
    assert!(!binding.snapshot().is_loading);
}

#[tokio::test(start_paused = true)]
async fn loading_keeps_previous_rows_until_next_page_arrives() {
    let source = Arc::new(ScriptedSource::new(30).delay_page(2, ms(200)));
    let binding = binding_over(&source);

    binding
        .submit(descriptor(1, 10))
        .await
        .expect("first fetch should finish");

    let next = binding.submit(descriptor(2, 10));
    let loading = binding.snapshot();
    assert!(loading.is_loading);
    assert_eq!(loading.rows.len(), 10);
    assert_eq!(loading.rows[0].id, "row-0");

    next.await.expect("second fetch should finish");
    let done = binding.snapshot();
    assert!(!done.is_loading);
    assert_eq!(done.rows[0].id, "row-10");
    assert_eq!(done.total_count, 30);
}

#[tokio::test(start_paused = true)]
async fn bearer_token_is_attached_to_requests() {
    let source = Arc::new(ScriptedSource::new(5));
    let binding = DataFetchBinding::new(
        source.clone(),
        Arc::new(StaticCredentials(Some("token-123".to_string()))),
    );

    binding
        .submit(descriptor(1, 10))
        .await
        .expect("fetch should finish");

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bearer.as_deref(), Some("token-123"));
}

#[tokio::test(start_paused = true)]
async fn forbidden_renders_access_denied_without_notification() {
    let source = Arc::new(ScriptedSource::new(10).failing(SourceError::Http {
        status: 403,
        message: "forbidden".to_string(),
    }));
    let notifier = Arc::new(RecordingNotifier::default());
    let binding = DataFetchBinding::new(source.clone(), Arc::new(StaticCredentials(None)))
        .with_notifier(notifier.clone());

    binding
        .submit(descriptor(1, 10))
        .await
        .expect("fetch should finish");

    let result = binding.snapshot();
    assert!(result.is_forbidden());
    assert_eq!(result.error_code(), Some(403));
    assert!(notifier.notices().is_empty());

    let view = render(&label_columns(), &result, &TableState::default());
    assert_eq!(view.body, TableBody::AccessDenied);
    assert!(!view.search_enabled);
}

#[tokio::test(start_paused = true)]
async fn server_error_clears_rows_and_notifies_once() {
    let source = Arc::new(ScriptedSource::new(10).failing(SourceError::Http {
        status: 500,
        message: "boom".to_string(),
    }));
    let notifier = Arc::new(RecordingNotifier::default());
    let binding = DataFetchBinding::new(source.clone(), Arc::new(StaticCredentials(None)))
        .with_notifier(notifier.clone());

    binding
        .submit(descriptor(1, 10))
        .await
        .expect("fetch should finish");

    let result = binding.snapshot();
    assert!(result.rows.is_empty());
    assert_eq!(result.total_count, 0);
    assert_eq!(result.error, Some(FetchFailure::Http(500)));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Gagal memuat data");
}

#[tokio::test(start_paused = true)]
async fn unauthorized_surfaces_as_unauthenticated_body() {
    let source = Arc::new(ScriptedSource::new(10).failing(SourceError::Http {
        status: 401,
        message: String::new(),
    }));
    let binding = binding_over(&source);

    binding
        .submit(descriptor(1, 10))
        .await
        .expect("fetch should finish");

    let result = binding.snapshot();
    assert_eq!(result.error, Some(FetchFailure::Unauthenticated));
    let view = render(&label_columns(), &result, &TableState::default());
    assert_eq!(view.body, TableBody::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn filter_keystrokes_are_debounced_into_one_request() {
    let source = Arc::new(ScriptedSource::new(30));
    let mut controller = controller_over(&source);

    controller.set_filter("j");
    tokio::time::sleep(ms(100)).await;
    controller.set_filter("ju");
    tokio::time::sleep(ms(100)).await;
    controller.set_filter(" jur ");

    assert!(controller.has_pending_filter());
    assert_eq!(controller.store().state().filter_text(), " jur ");
    assert!(source.requests().is_empty());

    tokio::time::sleep(ms(600)).await;

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].descriptor.keyword.as_deref(), Some("jur"));
    assert_eq!(requests[0].descriptor.page, 1);
    assert!(!controller.has_pending_filter());
}

#[tokio::test(start_paused = true)]
async fn pagination_fetches_immediately_and_cancels_pending_filter() {
    let source = Arc::new(ScriptedSource::new(30));
    let mut controller = controller_over(&source);

    controller.set_filter("row");
    controller
        .set_page_index(1)
        .await
        .expect("page fetch should finish");

    tokio::time::sleep(ms(600)).await;

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].descriptor.page, 2);
    assert_eq!(requests[0].descriptor.keyword.as_deref(), Some("row"));
    assert!(!controller.has_pending_filter());
}

#[tokio::test(start_paused = true)]
async fn superseded_debounce_ticket_does_not_submit() {
    let source = Arc::new(ScriptedSource::new(30));
    let binding = binding_over(&source);
    let epoch = Mutex::new(2);

    assert!(submit_if_current(&binding, &epoch, 1, descriptor(1, 10)).is_none());
    assert_eq!(binding.generation(), 0);

    submit_if_current(&binding, &epoch, 2, descriptor(1, 10))
        .expect("current ticket should submit")
        .await
        .expect("fetch should finish");
    assert_eq!(source.requests().len(), 1);
    assert_eq!(binding.generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconcile_clamps_page_past_the_end_and_refetches() {
    let source = Arc::new(ScriptedSource::new(25));
    let mut controller = controller_over(&source);

    controller
        .set_page_index(5)
        .await
        .expect("fetch should finish");
    assert!(controller.result().rows.is_empty());

    let refetch = controller.reconcile().expect("page should be clamped");
    assert_eq!(controller.store().pagination().page_index, 2);
    refetch.await.expect("refetch should finish");

    let last = source.requests().pop().expect("a request should be recorded");
    assert_eq!(last.descriptor.page, 3);
    assert_eq!(controller.result().rows.len(), 5);
    assert!(controller.reconcile().is_none());
}

#[tokio::test(start_paused = true)]
async fn selection_is_pruned_when_page_changes() {
    let source = Arc::new(ScriptedSource::new(30));
    let mut controller = controller_over(&source);

    controller.start().await.expect("first load should finish");
    assert!(controller.reconcile().is_none());

    controller.toggle_row(RowId::from("row-1"));
    controller.toggle_row(RowId::from("row-99"));
    controller.reconcile();
    assert_eq!(
        controller.store().selection(),
        &BTreeSet::from([RowId::from("row-1")])
    );

    controller
        .next_page()
        .expect("second page should exist")
        .await
        .expect("next page should finish");
    controller.reconcile();
    assert!(controller.store().selection().is_empty());
    assert_eq!(controller.result().rows[0].id, "row-10");
}

#[tokio::test(start_paused = true)]
async fn sort_change_keeps_page_and_sends_sort_parameters() {
    let source = Arc::new(ScriptedSource::new(30));
    let mut controller = controller_over(&source);
    controller.start().await.expect("first load should finish");
    controller.reconcile();
    controller
        .set_page_index(1)
        .await
        .expect("page fetch should finish");

    controller
        .toggle_sort("label")
        .await
        .expect("sort fetch should finish");

    let last = source.requests().pop().expect("a request should be recorded");
    assert_eq!(last.descriptor.page, 2);
    assert_eq!(last.descriptor.sort_by.as_deref(), Some("label"));
    assert_eq!(last.descriptor.sort_order, Some(SortOrder::Asc));
}

#[test]
fn presentation_prefers_access_denied_over_loading() {
    let result = FetchResult::<ListItem> {
        is_loading: true,
        error: Some(FetchFailure::Forbidden),
        ..FetchResult::default()
    };
    let view = render(&label_columns(), &result, &TableState::default());
    assert_eq!(view.body, TableBody::AccessDenied);

    let loading = FetchResult::<ListItem> {
        is_loading: true,
        ..FetchResult::default()
    };
    assert_eq!(
        render(&label_columns(), &loading, &TableState::default()).body,
        TableBody::Loading
    );

    let empty = FetchResult::<ListItem>::default();
    let view = render(&label_columns(), &empty, &TableState::default());
    assert_eq!(view.body, TableBody::Empty);
    assert!(view.search_enabled);
}

#[test]
fn presentation_renders_cells_and_hides_columns() {
    let rows = vec![
        ListItem::new("a", "Bendung Colo").with("page", 1),
        ListItem::new("b", "Jurug").with("page", 1),
    ];
    let result = FetchResult {
        rows,
        total_count: 2,
        ..FetchResult::default()
    };
    let mut state = TableState::default();
    state.column_visibility.insert("page".to_string(), false);
    state.selection.insert(RowId::from("b"));
    state.sort = Some(SortDescriptor::desc("label"));

    let columns = vec![
        ColumnDef::new("id", "ID"),
        ColumnDef::new("label", "Nama").cell(|item: &ListItem| item.label.to_uppercase()),
        ColumnDef::new("page", "Halaman"),
    ];
    let view = render(&columns, &result, &state);

    assert_eq!(view.headers.len(), 2);
    assert_eq!(view.headers[1].sorted, Some(SortOrder::Desc));
    assert_eq!(view.headers[0].sorted, None);

    let TableBody::Rows(rendered) = view.body else {
        panic!("rows body expected");
    };
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].cells[1].value, "BENDUNG COLO");
    assert!(!rendered[0].selected);
    assert!(rendered[1].selected);
    assert_eq!(rendered[1].cells.len(), 2);
}

#[test]
fn pagination_summary_reports_range_and_total() {
    let rows: Vec<ListItem> = (10..20)
        .map(|n| ListItem::new(format!("row-{n}"), format!("Row {n}")))
        .collect();
    let result = FetchResult {
        rows,
        total_count: 25,
        ..FetchResult::default()
    };
    let state = TableState {
        pagination: PaginationState::new(1, size(10)),
        ..TableState::default()
    };

    let summary = summarize(&result, &state);

    assert_eq!(summary.showing_from, 11);
    assert_eq!(summary.showing_to, 20);
    assert_eq!(summary.total, 25);
    assert_eq!(summary.page_count, 3);
    assert_eq!(summary.page_window, 0..3);
    assert_eq!(summary.page_size_options, vec![10, 20, 30, 40, 50]);
    assert!(summary.can_previous);
    assert!(summary.can_next);

    let empty = summarize(&FetchResult::<ListItem>::default(), &TableState::default());
    assert_eq!(empty.showing_from, 0);
    assert_eq!(empty.showing_to, 0);
    assert!(!empty.can_next);

    let failed = FetchResult::<ListItem> {
        error: Some(FetchFailure::Http(500)),
        ..FetchResult::default()
    };
    let deep = TableState {
        pagination: PaginationState::new(2, size(10)),
        ..TableState::default()
    };
    let failed = summarize(&failed, &deep);
    assert_eq!(failed.showing_from, 0);
    assert_eq!(failed.showing_to, 0);
    assert_eq!(failed.total, 0);
}

#[test]
fn pagination_summary_falls_back_to_row_count_without_total() {
    let rows: Vec<ListItem> = (0..4)
        .map(|n| ListItem::new(format!("row-{n}"), "x"))
        .collect();
    let result = FetchResult {
        rows,
        total_count: 0,
        ..FetchResult::default()
    };

    let summary = summarize(&result, &TableState::default());

    assert_eq!(summary.total, 4);
    assert_eq!(summary.page_count, 1);
}

#[test]
fn page_window_shows_one_before_and_three_after() {
    assert_eq!(page_window(0, 10), 0..4);
    assert_eq!(page_window(5, 10), 4..9);
    assert_eq!(page_window(9, 10), 8..10);
    assert_eq!(page_window(0, 0), 0..0);
}

#[test]
fn envelope_reads_array_rows_and_nested_pagination() {
    let envelope: ListEnvelope = serde_json::from_value(json!({
        "status": "success",
        "data": {
            "stations": [
                { "id": "st-1", "label": "PDA Jurug", "river": "Bengawan Solo" },
                { "id": "st-2", "label": "PDA Napel", "river": "Bengawan Solo" }
            ],
            "metadata": { "pagination": { "page": 1, "limit": 2, "total_pages": 4, "total_items": 8 } }
        }
    }))
    .expect("envelope should parse");

    let page: ListPage<ListItem> = envelope.into_page("stations").expect("page should decode");

    assert_eq!(page.total_count, 8);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[1].field("river").as_deref(), Some("Bengawan Solo"));
}

#[test]
fn envelope_reads_record_rows_and_top_level_total() {
    let envelope: ListEnvelope = serde_json::from_value(json!({
        "status": "success",
        "metadata": { "pagination": { "total_items": 42 } },
        "data": {
            "rivers": {
                "bengawan-solo": { "name": "Bengawan Solo" },
                "brantas": 12
            }
        }
    }))
    .expect("envelope should parse");

    let page: ListPage<ListItem> = envelope.into_page("rivers").expect("page should decode");

    assert_eq!(page.total_count, 42);
    assert_eq!(page.rows[0].id, "bengawan-solo");
    assert_eq!(page.rows[0].label, "Bengawan Solo");
    assert_eq!(page.rows[1].label, "brantas");
    assert_eq!(page.rows[1].field("value").as_deref(), Some("12"));
}

#[test]
fn envelope_uses_count_then_row_count_as_total() {
    let counted: ListEnvelope = serde_json::from_value(json!({
        "status": "success",
        "data": { "items": [{ "id": "1", "label": "a" }], "count": 17 }
    }))
    .expect("envelope should parse");
    let page: ListPage<ListItem> = counted.into_page("items").expect("page should decode");
    assert_eq!(page.total_count, 17);

    let bare: ListEnvelope = serde_json::from_value(json!({
        "status": "success",
        "data": { "items": [{ "id": "1", "label": "a" }, { "id": "2", "label": "b" }] }
    }))
    .expect("envelope should parse");
    let page: ListPage<ListItem> = bare.into_page("items").expect("page should decode");
    assert_eq!(page.total_count, 2);
}

#[test]
fn envelope_error_status_becomes_api_error() {
    let envelope: ListEnvelope = serde_json::from_value(json!({
        "status": "error",
        "error": "database unavailable",
        "data": null
    }))
    .expect("envelope should parse");

    let err = envelope
        .into_page::<ListItem>("items")
        .expect_err("error status should fail");

    assert_eq!(err, SourceError::Api("database unavailable".to_string()));
    assert_eq!(
        FetchFailure::from(err),
        FetchFailure::Api("database unavailable".to_string())
    );
}

#[test]
fn status_codes_map_to_typed_failures() {
    assert_eq!(FetchFailure::from_status(401), FetchFailure::Unauthenticated);
    assert_eq!(FetchFailure::from_status(403), FetchFailure::Forbidden);
    assert_eq!(FetchFailure::from_status(502), FetchFailure::Http(502));
    assert_eq!(FetchFailure::Transport("reset".to_string()).code(), None);
}

#[test]
fn endpoint_url_keeps_base_path() {
    let base = Url::parse("http://localhost:8080/api/v1").expect("base url should parse");

    let endpoint = endpoint_url(&base, "/stations").expect("endpoint should join");

    assert_eq!(endpoint.as_str(), "http://localhost:8080/api/v1/stations");
}

#[test]
fn list_item_keeps_unknown_fields_in_extra() {
    let item: ListItem = serde_json::from_value(json!({
        "id": "st-9",
        "label": "PDA Kajangan",
        "level_cm": 215,
        "active": true
    }))
    .expect("item should parse");

    assert_eq!(item.row_id(), RowId::from("st-9"));
    assert_eq!(item.field("level_cm").as_deref(), Some("215"));
    assert_eq!(item.field("active").as_deref(), Some("true"));
    assert_eq!(item.field("missing"), None);
}

#[test]
fn init_db_creates_required_tables() {
    let temp_dir = unique_test_dir("init-db");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('collection','column_name','cell')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 3, "required tables should exist");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[tokio::test]
async fn sqlite_source_pages_filters_and_sorts() {
    let temp_dir = unique_test_dir("sqlite-source");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let (columns, rows) = water_level_sample(Local::now(), 24);
    create_collection_from_rows(&db_path, WATER_LEVEL_COLLECTION, "station", &columns, &rows)
        .expect("collection should be created");

    let source = SqliteListSource::new(
        db_path.clone(),
        WATER_LEVEL_COLLECTION,
        Some("station".to_string()),
    );
    let request = ListRequest {
        descriptor: RemoteQueryDescriptor {
            page: 2,
            size: 10,
            keyword: Some("Jurug".to_string()),
            sort_by: Some("recorded_at".to_string()),
            sort_order: Some(SortOrder::Desc),
        },
        bearer: None,
    };

    let page = source.fetch(request).await.expect("page should load");

    assert_eq!(page.total_count, 24);
    assert_eq!(page.rows.len(), 10);
    assert_eq!(page.rows[0].id, "WL-002-010");
    assert!(page
        .rows
        .iter()
        .all(|row| row.label == "PDA Jurug" && row.field("station").as_deref() == Some("PDA Jurug")));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[tokio::test]
async fn sqlite_search_treats_wildcards_literally() {
    let temp_dir = unique_test_dir("sqlite-like");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let columns = vec!["id".to_string(), "station".to_string()];
    let rows = vec![
        vec!["1".to_string(), "Pos_A 50%".to_string()],
        vec!["2".to_string(), "PosXA 500".to_string()],
        vec!["3".to_string(), "Pos\\B".to_string()],
    ];
    create_collection_from_rows(&db_path, "pos", "station", &columns, &rows)
        .expect("collection should be created");
    let source = SqliteListSource::new(db_path.clone(), "pos", Some("station".to_string()));

    for (keyword, expected) in [("_A", "1"), ("50%", "1"), ("\\", "3"), ("%", "1")] {
        let mut wire = descriptor(1, 10);
        wire.keyword = Some(keyword.to_string());
        let page = source
            .fetch(ListRequest {
                descriptor: wire,
                bearer: None,
            })
            .await
            .expect("page should load");
        assert_eq!(page.total_count, 1, "keyword {keyword}");
        assert_eq!(page.rows[0].id, expected, "keyword {keyword}");
    }

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[tokio::test]
async fn sqlite_source_reports_missing_collection() {
    let temp_dir = unique_test_dir("sqlite-missing");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let source = SqliteListSource::new(db_path.clone(), "unknown", None);
    let err = source
        .fetch(ListRequest {
            descriptor: descriptor(1, 10),
            bearer: None,
        })
        .await
        .expect_err("missing collection should fail");

    assert!(matches!(err, SourceError::Api(message) if message.contains("unknown")));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn read_csv_table_pads_short_records() {
    let data = "name,level\nPDA Colo,210\nPDA Jurug\n";

    let (headers, rows) = read_csv_table(data.as_bytes()).expect("csv should parse");

    assert_eq!(headers, vec!["name".to_string(), "level".to_string()]);
    assert_eq!(
        rows,
        vec![
            vec!["PDA Colo".to_string(), "210".to_string()],
            vec!["PDA Jurug".to_string(), String::new()],
        ]
    );
}

#[test]
fn import_csv_names_collection_after_file() {
    let temp_dir = unique_test_dir("csv-import");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let csv_path = temp_dir.join("pos_hujan.csv");
    fs::write(&csv_path, "id,name,rain_mm\n1,Wonogiri,12\n2,Sukoharjo,4\n")
        .expect("should write csv");

    let imported = ImportService::new(db_path.clone())
        .import_csv(&csv_path, "name")
        .expect("csv import should succeed");
    assert_eq!(imported.row_count, 2);

    let meta = find_collection(&db_path, "pos_hujan")
        .expect("lookup should succeed")
        .expect("collection should exist");
    assert_eq!(meta.label_column, "name");
    assert_eq!(meta.row_count, 2);

    let err = import_csv_collection(&db_path, &csv_path, "station")
        .expect_err("unknown label column should fail");
    assert!(err.to_string().contains("station"));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn ensure_sample_seeds_once() {
    let temp_dir = unique_test_dir("ensure-sample");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let service = ImportService::new(db_path.clone());

    let first = service.ensure_sample().expect("sample should be seeded");
    let second = service.ensure_sample().expect("sample should be found");

    assert_eq!(first, second);
    assert_eq!(first.row_count, 8 * 24);
    let conn = Connection::open(&db_path).expect("db should open");
    let collections: i64 = conn
        .query_row("SELECT COUNT(*) FROM collection", [], |row| row.get(0))
        .expect("collection count should succeed");
    assert_eq!(collections, 1);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn water_level_sample_status_follows_thresholds() {
    let (columns, rows) = water_level_sample(Local::now(), 3);

    assert_eq!(columns.len(), 6);
    assert_eq!(rows.len(), 24);
    for row in &rows {
        let level: i64 = row[3].parse().expect("level should be numeric");
        let expected = if level >= 270 {
            "Awas"
        } else if level >= 230 {
            "Siaga"
        } else if level >= 190 {
            "Waspada"
        } else {
            "Normal"
        };
        assert_eq!(row[4], expected, "status for level {level}");
    }
}

#[test]
fn config_defaults_and_debounce_clamp() {
    let db_path = PathBuf::from("/tmp/sihka.sqlite");

    let defaults = AppConfig::from_toml_str("", db_path.clone()).expect("empty config is valid");
    assert_eq!(defaults.debounce, ms(500));
    assert_eq!(defaults.default_page_size, size(10));
    assert_eq!(defaults.db_path, db_path);
    assert_eq!(defaults.api_base_url, crate::config::DEFAULT_API_URL);

    let fast = AppConfig::from_toml_str("debounce_ms = 100", db_path.clone())
        .expect("config should parse");
    assert_eq!(fast.debounce, ms(300));

    let slow = AppConfig::from_toml_str("debounce_ms = 900\ndefault_page_size = 30", db_path.clone())
        .expect("config should parse");
    assert_eq!(slow.debounce, ms(500));
    assert_eq!(slow.default_page_size, size(30));
}

#[test]
fn config_rejects_page_size_outside_options() {
    let result = AppConfig::from_toml_str("default_page_size = 25", PathBuf::from("db.sqlite"));

    assert!(matches!(
        result,
        Err(crate::config::ConfigError::Invalid { key: "default_page_size", .. })
    ));
    assert!(AppConfig::from_toml_str("debounce_ms = \"fast\"", PathBuf::from("db.sqlite")).is_err());
}

#[test]
fn selection_and_repeated_sort_do_not_leak_into_descriptor() {
    let codec = QueryCodec::default();
    let mut store = TableStateStore::new("label", size(10));

    store.set_sort(Some(SortDescriptor::asc("station")));
    store.set_sort(Some(SortDescriptor::desc("river")));
    assert_eq!(store.sort(), Some(&SortDescriptor::desc("river")));

    let before = codec.encode(&store.pagination(), store.sort(), store.filter());
    store.set_selection(BTreeSet::from([RowId::from("WL-001-000")]));
    let after = codec.encode(&store.pagination(), store.sort(), store.filter());

    assert_eq!(before, after);
    assert_eq!(
        after,
        codec.encode(&store.pagination(), store.sort(), store.filter())
    );
    assert_eq!(after.sort_by.as_deref(), Some("river"));
}

fn serve_once(status: &'static str, body: String) -> (Url, std::thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("should bind loopback");
    let addr = listener.local_addr().expect("should have local addr");
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("should accept");
        let mut head = Vec::new();
        let mut buf = [0_u8; 1024];
        while !head.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buf).expect("should read request");
            if read == 0 {
                break;
            }
            head.extend_from_slice(&buf[..read]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .expect("should write response");
        String::from_utf8_lossy(&head).into_owned()
    });
    let base = Url::parse(&format!("http://{addr}/api/v1")).expect("base url should parse");
    (base, handle)
}

fn loopback_source(base: &Url) -> RestListSource<ListItem> {
    let http = Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    let endpoint = endpoint_url(base, "water-levels").expect("endpoint should join");
    RestListSource::with_client(http, endpoint, "water_levels")
}

#[tokio::test]
async fn rest_source_sends_query_and_bearer_then_decodes_envelope() {
    let body = json!({
        "status": "success",
        "metadata": { "pagination": { "page": 2, "limit": 10, "total_pages": 3, "total_items": 21 } },
        "data": {
            "water_levels": [
                { "id": "WL-003-001", "label": "PDA Napel", "level_cm": 241 }
            ]
        }
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body);
    let source = loopback_source(&base);

    let page = source
        .fetch(ListRequest {
            descriptor: RemoteQueryDescriptor {
                page: 2,
                size: 10,
                keyword: Some("napel".to_string()),
                sort_by: Some("level_cm".to_string()),
                sort_order: Some(SortOrder::Desc),
            },
            bearer: Some("token-abc".to_string()),
        })
        .await
        .expect("page should load");

    let head = server.join().expect("server thread should finish");
    assert!(
        head.starts_with(
            "GET /api/v1/water-levels?page=2&size=10&keyword=napel&sort_by=level_cm&sort_order=desc HTTP/1.1"
        ),
        "unexpected request line: {head}"
    );
    assert!(head.to_ascii_lowercase().contains("authorization: bearer token-abc"));

    assert_eq!(page.total_count, 21);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].field("level_cm").as_deref(), Some("241"));
}

#[tokio::test]
async fn rest_source_maps_forbidden_status() {
    let (base, server) = serve_once("403 Forbidden", json!({ "status": "error" }).to_string());
    let source = loopback_source(&base);

    let err = source
        .fetch(ListRequest {
            descriptor: descriptor(1, 10),
            bearer: None,
        })
        .await
        .expect_err("403 should fail");
    server.join().expect("server thread should finish");

    assert!(matches!(err, SourceError::Http { status: 403, .. }));
    assert_eq!(FetchFailure::from(err), FetchFailure::Forbidden);
}
