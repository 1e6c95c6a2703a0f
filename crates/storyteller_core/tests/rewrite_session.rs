use storyteller_core::{
    Anchor, AutosaveController, AutosaveState, CannedProvider, Document, EditableSurface,
    NodeId, ProviderError, ProviderResult, RewriteError, RewriteOutcome, RewriteProvider,
    RewriteSession, RewriteState, TreeSurface,
};

struct Nodes {
    brave: NodeId,
    world: NodeId,
    second: NodeId,
}

/// Builds `<p>"Hello " "brave"</p><br><p>" new world"</p>`.
fn story_surface() -> (TreeSurface, Nodes) {
    let mut surface = TreeSurface::new();
    let root = surface.root();
    let first = surface.append_element(root).unwrap();
    surface.append_text(first, "Hello ").unwrap();
    let brave = surface.append_text(first, "brave").unwrap();
    surface.append_line_break(root).unwrap();
    let second = surface.append_element(root).unwrap();
    let world = surface.append_text(second, " new world").unwrap();
    (
        surface,
        Nodes {
            brave,
            world,
            second,
        },
    )
}

struct UnavailableRewriter;

impl RewriteProvider for UnavailableRewriter {
    fn rewrite(&self, _selected: &str, _instruction: &str) -> ProviderResult<String> {
        Err(ProviderError::new("remote", "timeout", "no answer"))
    }
}

fn controller() -> AutosaveController {
    AutosaveController::new(Document::new("Draft", 0), 1200)
}

#[test]
fn accepted_rewrite_replaces_range_across_nodes() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.brave, 0), Anchor::new(nodes.world, 4))
        .unwrap();

    let mut session = RewriteSession::new();
    assert_eq!(session.on_selection_change(&surface), RewriteState::Captured);
    assert_eq!(session.captured_text(), Some("brave\n new"));

    let proposal = session.propose("make it clearer", &CannedProvider::new()).unwrap();
    assert_eq!(proposal.original, "brave\n new");
    assert_eq!(proposal.replacement, "brave new");
    assert_eq!(session.state(), RewriteState::Proposed);

    let mut autosave = controller();
    let outcome = session.accept(&mut surface, &mut autosave, 500).unwrap();

    assert_eq!(
        outcome,
        RewriteOutcome::Applied {
            replacement: "brave new".to_string()
        }
    );
    assert_eq!(surface.project_to_text(), "Hello brave new world");
    assert_eq!(session.state(), RewriteState::Closed);
    assert_eq!(
        autosave.state(),
        AutosaveState::PendingSave { deadline_ms: 1700 }
    );
}

#[test]
fn stale_range_is_discarded_without_touching_surface() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.brave, 0), Anchor::new(nodes.brave, 5))
        .unwrap();

    let mut session = RewriteSession::new();
    session.on_selection_change(&surface);
    session.propose("past tense", &CannedProvider::new()).unwrap();

    surface.append_text(nodes.second, "!").unwrap();
    let after_edit = surface.project_to_text();

    let mut autosave = controller();
    let outcome = session.accept(&mut surface, &mut autosave, 0).unwrap();

    assert_eq!(outcome, RewriteOutcome::Discarded);
    assert_eq!(surface.project_to_text(), after_edit);
    assert_eq!(session.state(), RewriteState::Closed);
    assert_eq!(autosave.state(), AutosaveState::Idle);
}

#[test]
fn removed_anchor_node_makes_range_stale() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.world, 1), Anchor::new(nodes.world, 4))
        .unwrap();

    let mut session = RewriteSession::new();
    session.on_selection_change(&surface);
    session.propose("anything", &CannedProvider::new()).unwrap();

    surface.remove(nodes.second).unwrap();
    let outcome = session
        .accept(&mut surface, &mut controller(), 0)
        .unwrap();

    assert_eq!(outcome, RewriteOutcome::Discarded);
    assert_eq!(surface.project_to_text(), "Hello brave\n");
}

#[test]
fn retyping_a_text_run_makes_range_stale() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.brave, 0), Anchor::new(nodes.brave, 5))
        .unwrap();

    let mut session = RewriteSession::new();
    session.on_selection_change(&surface);
    session.propose("past tense", &CannedProvider::new()).unwrap();

    surface.set_node_text(nodes.world, " old world").unwrap();
    let mut autosave = controller();
    let outcome = session.accept(&mut surface, &mut autosave, 0).unwrap();

    assert_eq!(outcome, RewriteOutcome::Discarded);
    assert_eq!(surface.project_to_text(), "Hello brave\n old world");
    assert_eq!(autosave.state(), AutosaveState::Idle);
}

#[test]
fn reject_and_cancel_close_without_mutation() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.brave, 0), Anchor::new(nodes.brave, 5))
        .unwrap();
    let before = surface.project_to_text();
    let revision = surface.revision();

    let mut session = RewriteSession::new();
    session.on_selection_change(&surface);
    assert!(!session.reject());
    assert_eq!(session.state(), RewriteState::Captured);

    session.propose("more poetic", &CannedProvider::new()).unwrap();
    assert!(session.reject());
    assert_eq!(session.state(), RewriteState::Closed);
    assert!(session.proposal().is_none());

    session.on_selection_change(&surface);
    session.cancel();
    assert_eq!(session.state(), RewriteState::Closed);
    assert!(session.captured_text().is_none());

    assert_eq!(surface.project_to_text(), before);
    assert_eq!(surface.revision(), revision);
}

#[test]
fn provider_failure_keeps_capture_for_retry() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.brave, 0), Anchor::new(nodes.brave, 5))
        .unwrap();

    let mut session = RewriteSession::new();
    session.on_selection_change(&surface);
    match session.propose("shorter", &UnavailableRewriter) {
        Err(RewriteError::Provider(err)) => assert_eq!(err.code, "timeout"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.state(), RewriteState::Captured);

    let proposal = session.propose("shorter", &CannedProvider::new()).unwrap();
    assert_eq!(proposal.replacement, "brave.");
}

#[test]
fn collapsed_or_missing_selection_closes_session() {
    let (mut surface, nodes) = story_surface();
    surface
        .select(Anchor::new(nodes.brave, 0), Anchor::new(nodes.brave, 3))
        .unwrap();

    let mut session = RewriteSession::new();
    assert_eq!(session.on_selection_change(&surface), RewriteState::Captured);

    surface.place_caret_at(3);
    assert_eq!(session.on_selection_change(&surface), RewriteState::Closed);

    surface
        .select(Anchor::new(nodes.brave, 1), Anchor::new(nodes.brave, 4))
        .unwrap();
    session.on_selection_change(&surface);
    surface.clear_selection();
    assert_eq!(session.on_selection_change(&surface), RewriteState::Closed);
}

#[test]
fn actions_without_capture_are_errors() {
    let (mut surface, _) = story_surface();
    let mut session = RewriteSession::new();

    assert!(matches!(
        session.propose("shorter", &CannedProvider::new()),
        Err(RewriteError::NothingCaptured)
    ));
    assert!(matches!(
        session.accept(&mut surface, &mut controller(), 0),
        Err(RewriteError::NothingProposed)
    ));
}
