use std::cell::{Cell, RefCell};
use std::rc::Rc;
use storyteller_core::db::open_db_in_memory;
use storyteller_core::{
    AutosaveController, AutosaveError, AutosaveEvent, AutosaveState, DbError, Document,
    DocumentId, DocumentStore, EditableSurface, ManualClock, SqliteDocumentStore, StoreError,
    StoreResult, TreeSurface,
};

const DELAY_MS: u64 = 1200;

/// Counts saves reaching the inner store.
struct CountingStore<D> {
    inner: D,
    saves: Cell<usize>,
}

impl<D: DocumentStore> CountingStore<D> {
    fn new(inner: D) -> Self {
        Self {
            inner,
            saves: Cell::new(0),
        }
    }
}

impl<D: DocumentStore> DocumentStore for CountingStore<D> {
    fn create(&self, title: &str) -> StoreResult<Document> {
        self.inner.create(title)
    }

    fn get(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        self.inner.get(id)
    }

    fn list(&self) -> StoreResult<Vec<Document>> {
        self.inner.list()
    }

    fn save(&self, doc: &mut Document) -> StoreResult<()> {
        self.saves.set(self.saves.get() + 1);
        self.inner.save(doc)
    }
}

/// Store whose engine is gone.
struct FailingStore;

impl DocumentStore for FailingStore {
    fn create(&self, _title: &str) -> StoreResult<Document> {
        Err(unavailable())
    }

    fn get(&self, _id: DocumentId) -> StoreResult<Option<Document>> {
        Err(unavailable())
    }

    fn list(&self) -> StoreResult<Vec<Document>> {
        Err(unavailable())
    }

    fn save(&self, _doc: &mut Document) -> StoreResult<()> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable(DbError::Sqlite(rusqlite::Error::InvalidQuery))
}

fn type_char(surface: &mut TreeSurface, text: &str) {
    let end = surface.text_len();
    surface.place_caret_at(end);
    surface.insert_at_caret(text);
}

fn record_events(controller: &mut AutosaveController) -> Rc<RefCell<Vec<AutosaveEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    controller.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn burst_of_edits_produces_exactly_one_save() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(0);
    let store = CountingStore::new(SqliteDocumentStore::with_clock(&conn, clock.clone()).unwrap());
    let doc = store.create("Draft").unwrap();

    let mut surface = TreeSurface::new();
    let mut controller = AutosaveController::new(doc.clone(), DELAY_MS);
    for step in 0..10 {
        let now = step * 100;
        type_char(&mut surface, "x");
        controller.record_mutation(now);
        assert!(controller.poll(now, &surface, &store).unwrap().is_none());
    }

    let last_edit = 900;
    assert!(controller
        .poll(last_edit + 1199, &surface, &store)
        .unwrap()
        .is_none());
    clock.set(5_000);
    let saved = controller
        .poll(last_edit + 1200, &surface, &store)
        .unwrap()
        .expect("debounce elapsed");

    assert_eq!(store.saves.get(), 1);
    assert_eq!(saved.body, "xxxxxxxxxx");
    assert_eq!(saved.last_modified, 5_000);
    assert_eq!(controller.state(), AutosaveState::Idle);
    assert!(!controller.has_pending_changes());

    let persisted = store.get(doc.id).unwrap().unwrap();
    assert_eq!(persisted.body, surface.project_to_text());
    assert!(controller.poll(10_000, &surface, &store).unwrap().is_none());
    assert_eq!(store.saves.get(), 1);
}

#[test]
fn successful_save_emits_saving_saved_and_listing_changed() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::with_clock(&conn, ManualClock::new(77)).unwrap();
    let doc = store.create("Draft").unwrap();

    let mut surface = TreeSurface::new();
    let mut controller = AutosaveController::new(doc.clone(), DELAY_MS);
    let events = record_events(&mut controller);

    type_char(&mut surface, "## Lighthouse\nThe lamp failed at dusk.");
    controller.record_mutation(0);
    controller.poll(1200, &surface, &store).unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            AutosaveEvent::Saving { id: doc.id },
            AutosaveEvent::Saved {
                id: doc.id,
                last_modified: 77
            },
            AutosaveEvent::ListingChanged,
        ]
    );
    assert_eq!(controller.document().title, "Lighthouse");
    assert_eq!(store.get(doc.id).unwrap().unwrap().title, "Lighthouse");
}

#[test]
fn intent_edits_are_saved_with_the_body() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::with_clock(&conn, ManualClock::new(1)).unwrap();
    let doc = store.create("Draft").unwrap();

    let surface = TreeSurface::from_text("Body.");
    let mut controller = AutosaveController::new(doc.clone(), DELAY_MS);
    controller.set_story_intent("a ghost story", 0);
    controller.set_chapter_intent("the first haunting", 500);

    assert!(controller.poll(1200, &surface, &store).unwrap().is_none());
    controller.poll(1700, &surface, &store).unwrap().unwrap();

    let persisted = store.get(doc.id).unwrap().unwrap();
    assert_eq!(persisted.story_intent, "a ghost story");
    assert_eq!(persisted.chapter_intent, "the first haunting");
    assert_eq!(persisted.body, "Body.");
}

#[test]
fn failed_save_is_reported_once_and_not_retried() {
    let mut surface = TreeSurface::new();
    let doc = Document::new("Draft", 0);
    let mut controller = AutosaveController::new(doc.clone(), DELAY_MS);
    let events = record_events(&mut controller);

    type_char(&mut surface, "lost words");
    controller.record_mutation(0);
    let err = controller.poll(1200, &surface, &FailingStore).unwrap_err();

    match err {
        AutosaveError::Store(StoreError::Unavailable(DbError::Sqlite(_))) => {}
        other => panic!("unexpected error: {other}"),
    }
    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], AutosaveEvent::Saving { id: doc.id });
    assert!(matches!(
        &events[1],
        AutosaveEvent::SaveFailed { id, .. } if *id == doc.id
    ));
    assert_eq!(controller.state(), AutosaveState::Idle);
    assert!(controller.poll(5_000, &surface, &FailingStore).unwrap().is_none());
}

#[test]
fn flush_saves_pending_edits_before_deadline() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(1);
    let store = CountingStore::new(SqliteDocumentStore::with_clock(&conn, clock).unwrap());
    let doc = store.create("Draft").unwrap();

    let mut surface = TreeSurface::new();
    let mut controller = AutosaveController::new(doc.clone(), DELAY_MS);
    assert!(controller.flush(&surface, &store).unwrap().is_none());

    type_char(&mut surface, "quick exit");
    controller.record_mutation(0);
    let saved = controller.flush(&surface, &store).unwrap().unwrap();

    assert_eq!(saved.body, "quick exit");
    assert_eq!(store.saves.get(), 1);
    assert!(controller.poll(10_000, &surface, &store).unwrap().is_none());
}

#[test]
fn edit_during_in_flight_save_gets_its_own_save() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::with_clock(&conn, ManualClock::new(1)).unwrap();
    let doc = store.create("Draft").unwrap();

    let mut surface = TreeSurface::new();
    let mut controller = AutosaveController::new(doc.clone(), DELAY_MS);
    type_char(&mut surface, "first");
    controller.record_mutation(0);

    let mut ticket = controller.begin_save(1200, &surface).unwrap();
    type_char(&mut surface, " second");
    controller.record_mutation(1300);

    let result = store.save(ticket.document_mut());
    let saved = controller.complete_save(ticket, result).unwrap();
    assert_eq!(saved.body, "first");
    assert!(controller.has_pending_changes());

    controller.poll(2500, &surface, &store).unwrap().unwrap();
    assert_eq!(store.get(doc.id).unwrap().unwrap().body, "first second");
}
