use std::sync::Arc;

use mingle::client::{Comment, Error};
use mingle::data::{mock_post, MockCommentService, MockFeedService, MockReactionService};
use mingle::feed::{Controller, MemorySurface, PRIMARY_REACTION};

fn new_controller(feed: Arc<MockFeedService>, viewer: &str) -> Controller<MemorySurface> {
    Controller::new(
        feed,
        MemorySurface::default(),
        Some(viewer.to_string()),
        2,
        None,
    )
}

/// A full session over the feed: paginate, filter, search, mutate.
#[test]
fn feed_session_end_to_end() {
    let feed = Arc::new(MockFeedService::default());
    feed.push_page(vec![mock_post(1, "A", "ida"), mock_post(2, "B", "bo")]);
    feed.push_page(vec![mock_post(3, "C", "bo"), mock_post(4, "D", "bo")]);
    feed.push_page(vec![]);

    let reactions = MockReactionService::new("ida");
    let comments = MockCommentService::default();

    let mut controller = new_controller(feed.clone(), "ida");
    controller.start();
    controller.load_more();

    let titles: Vec<&str> = controller
        .surface()
        .cards
        .iter()
        .map(|card| card.title.as_str())
        .collect();
    assert_eq!(titles, ["A", "B", "C", "D"]);

    // Page 3 is empty; the next load-more is a silent no-op.
    controller.load_more();
    controller.load_more();
    assert_eq!(controller.surface().cards.len(), 4);
    assert!(controller.surface().messages.is_empty());
    assert_eq!(feed.list_calls.lock().len(), 3);

    // React to a post and reconcile against the returned set.
    controller
        .toggle_reaction(&reactions, 2, PRIMARY_REACTION)
        .unwrap();
    let card = controller
        .surface()
        .cards
        .iter()
        .find(|card| card.id == 2)
        .unwrap();
    assert_eq!(card.reaction_total, 1);
    assert!(card.viewer_has_reacted);

    // Comment on it; the rendered count follows without a refetch.
    controller.add_comment(&comments, 2, "lovely").unwrap();
    let card = controller
        .surface()
        .cards
        .iter()
        .find(|card| card.id == 2)
        .unwrap();
    assert_eq!(card.comment_count, 1);

    // Switching to a tag filter restarts the feed from a clean surface.
    feed.push_page(vec![mock_post(9, "Tagged", "bo")]);
    controller.set_tag(Some("travel".into()));
    let titles: Vec<&str> = controller
        .surface()
        .cards
        .iter()
        .map(|card| card.title.as_str())
        .collect();
    assert_eq!(titles, ["Tagged"]);
    assert_eq!(controller.surface().clear_count, 1);
}

#[test]
fn search_is_exclusive_with_tag_filter() {
    let feed = Arc::new(MockFeedService::default());
    feed.push_page(vec![mock_post(1, "A", "bo")]);
    feed.push_page(vec![mock_post(2, "Tagged", "bo")]);
    feed.push_search_result(vec![mock_post(3, "Hit", "bo")]);

    let mut controller = new_controller(feed.clone(), "ida");
    controller.start();
    controller.set_tag(Some("travel".into()));
    assert_eq!(controller.cursor().tag.as_deref(), Some("travel"));

    controller.set_search("hello");
    assert_eq!(controller.cursor().tag, None);
    assert_eq!(controller.cursor().query.as_deref(), Some("hello"));
    assert_eq!(controller.surface().cards[0].title, "Hit");

    // The search request carried no tag, and no extra list call was made.
    assert_eq!(feed.search_calls.lock().as_slice(), ["hello"]);
    assert_eq!(feed.list_calls.lock().len(), 2);
}

#[test]
fn action_failures_leave_rendered_state_untouched() {
    let feed = Arc::new(MockFeedService::default());
    feed.push_page(vec![mock_post(1, "A", "bo")]);

    let comments = MockCommentService::default();
    let mut controller = new_controller(feed, "ida");
    controller.start();

    let theirs = Comment {
        id: 5,
        post_id: 1,
        owner: "bo".into(),
        ..Comment::default()
    };
    let result = controller.remove_comment(&comments, 1, &theirs);
    assert!(matches!(result, Err(Error::Forbidden(_))));
    assert!(comments.delete_calls.lock().is_empty());

    assert_eq!(controller.surface().cards.len(), 1);
    assert_eq!(controller.surface().cards[0].comment_count, 0);
}
