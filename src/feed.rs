use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{Comment, Error, Listing, Media, Post, Result};
use crate::data::{CommentService, FeedService, PostService, ReactionService};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const PRIMARY_REACTION: &str = "❤️";
pub const DEFAULT_AVATAR: &str = "/images/default-avatar.png";

const EMPTY_FEED_MESSAGE: &str = "No posts available yet.";
const EMPTY_SEARCH_MESSAGE: &str = "No posts found matching your search.";

/// Client-local paging state driving the next fetch. Page only moves
/// forward through [`Cursor::advance`]; any filter, search, or scope
/// change resets it to 1. Tag filter and search query are mutually
/// exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub page: u32,
    pub page_size: u32,
    pub tag: Option<String>,
    pub query: Option<String>,
    pub scope: Option<String>,
}

impl Cursor {
    pub fn new(page_size: u32, scope: Option<String>) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            tag: None,
            query: None,
            scope,
        }
    }

    pub fn advance(&mut self) {
        self.page += 1;
    }

    /// Selecting a tag clears any active search and restarts paging.
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag.filter(|tag| !tag.trim().is_empty());
        self.query = None;
        self.page = 1;
    }

    /// A non-empty query clears the tag filter and restarts paging; an
    /// empty query drops back to the regular feed.
    pub fn set_query(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.query = None;
        } else {
            self.query = Some(query.to_string());
            self.tag = None;
        }
        self.page = 1;
    }

    pub fn is_search(&self) -> bool {
        self.query.is_some()
    }
}

/// What a rendered post exposes for interaction, as structured
/// descriptors rather than markup class markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub post_id: i64,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Open,
    React { symbol: String },
    ToggleComments,
    Edit,
    Delete,
}

/// Presentational projection of one post. Everything display-ready is
/// derived here so surfaces stay dumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub media: Option<Media>,
    pub author_name: String,
    pub avatar_url: String,
    pub date_label: String,
    pub tags_label: Option<String>,
    pub reaction_total: i64,
    pub viewer_has_reacted: bool,
    pub viewer_is_author: bool,
    pub comment_count: i64,
    pub actions: Vec<Action>,
}

/// Pure projection from posts to cards; no network, no surface access.
pub fn render(viewer: Option<&str>, posts: &[Post]) -> Vec<PostCard> {
    posts.iter().map(|post| render_one(viewer, post)).collect()
}

fn render_one(viewer: Option<&str>, post: &Post) -> PostCard {
    let author_name = post
        .author
        .as_ref()
        .map(|author| author.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());
    let avatar_url = post
        .author
        .as_ref()
        .and_then(|author| author.avatar.as_ref())
        .map(|avatar| avatar.url.clone())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR.to_string());
    let date_label = post
        .created
        .map(|created| created.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown date".to_string());
    let tags_label = if post.tags.is_empty() {
        None
    } else {
        Some(post.tags.join(", "))
    };
    let viewer_is_author = match (viewer, post.author.as_ref()) {
        (Some(viewer), Some(author)) => viewer == author.name,
        _ => false,
    };
    let viewer_has_reacted = viewer
        .map(|viewer| post.viewer_has_reacted(PRIMARY_REACTION, viewer))
        .unwrap_or(false);

    let mut actions = vec![
        Action {
            post_id: post.id,
            kind: ActionKind::Open,
        },
        Action {
            post_id: post.id,
            kind: ActionKind::React {
                symbol: PRIMARY_REACTION.to_string(),
            },
        },
        Action {
            post_id: post.id,
            kind: ActionKind::ToggleComments,
        },
    ];
    if viewer_is_author {
        actions.push(Action {
            post_id: post.id,
            kind: ActionKind::Edit,
        });
        actions.push(Action {
            post_id: post.id,
            kind: ActionKind::Delete,
        });
    }

    PostCard {
        id: post.id,
        title: post.title.clone(),
        body: post.body.clone().unwrap_or_default(),
        media: post.media.clone(),
        author_name,
        avatar_url,
        date_label,
        tags_label,
        reaction_total: post.reaction_total(),
        viewer_has_reacted,
        viewer_is_author,
        comment_count: post.comment_count(),
        actions,
    }
}

/// Rendering collaborator: accepts cards in order and supports the
/// targeted patches the controller applies after mutations.
pub trait Surface {
    fn append(&mut self, cards: Vec<PostCard>);
    fn clear(&mut self);
    fn show_message(&mut self, text: &str);
    fn remove_post(&mut self, post_id: i64);
    fn patch_reactions(&mut self, post_id: i64, total: i64, viewer_reacted: bool);
    fn set_comment_count(&mut self, post_id: i64, count: i64);
}

/// Records every surface call. Used by tests and by hosts that diff the
/// card list themselves.
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub cards: Vec<PostCard>,
    pub messages: Vec<String>,
    pub removed: Vec<i64>,
    pub clear_count: usize,
}

impl Surface for MemorySurface {
    fn append(&mut self, cards: Vec<PostCard>) {
        self.cards.extend(cards);
    }

    fn clear(&mut self) {
        self.cards.clear();
        self.messages.clear();
        self.clear_count += 1;
    }

    fn show_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn remove_post(&mut self, post_id: i64) {
        self.removed.push(post_id);
        self.cards.retain(|card| card.id != post_id);
    }

    fn patch_reactions(&mut self, post_id: i64, total: i64, viewer_reacted: bool) {
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == post_id) {
            card.reaction_total = total;
            card.viewer_has_reacted = viewer_reacted;
        }
    }

    fn set_comment_count(&mut self, post_id: i64, count: i64) {
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == post_id) {
            card.comment_count = count;
        }
    }
}

/// Serializes repeated toggles of the same post+symbol: `begin` refuses
/// while one is in flight, `finish` re-enables. Call sites pair the two
/// unconditionally, success or failure.
#[derive(Debug, Default)]
pub struct ReactionGuard {
    busy: HashSet<(i64, String)>,
}

impl ReactionGuard {
    pub fn begin(&mut self, post_id: i64, symbol: &str) -> bool {
        self.busy.insert((post_id, symbol.to_string()))
    }

    pub fn finish(&mut self, post_id: i64, symbol: &str) {
        self.busy.remove(&(post_id, symbol.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Feed,
    Search,
}

/// Handle for one fetch cycle. Completing a ticket whose generation has
/// been superseded (filter change, refresh) discards the result instead
/// of applying stale posts over newer state.
#[derive(Debug)]
pub struct FetchTicket {
    generation: u64,
    page: u32,
    kind: FetchKind,
}

/// Drives the feed: owns the cursor, fetches pages through the feed
/// service, projects posts into cards, and keeps the surface consistent
/// across pagination, filtering, search, and per-post mutations.
pub struct Controller<S: Surface> {
    feed: Arc<dyn FeedService>,
    surface: S,
    viewer: Option<String>,
    cursor: Cursor,
    phase: Phase,
    generation: u64,
    in_flight: bool,
    exhausted: bool,
    rendered: HashSet<i64>,
    comment_counts: HashMap<i64, i64>,
    reaction_guard: ReactionGuard,
}

impl<S: Surface> Controller<S> {
    pub fn new(
        feed: Arc<dyn FeedService>,
        surface: S,
        viewer: Option<String>,
        page_size: u32,
        scope: Option<String>,
    ) -> Self {
        Self {
            feed,
            surface,
            viewer,
            cursor: Cursor::new(page_size, scope),
            phase: Phase::Idle,
            generation: 0,
            in_flight: false,
            exhausted: false,
            rendered: HashSet::new(),
            comment_counts: HashMap::new(),
            reaction_guard: ReactionGuard::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// First fetch after construction.
    pub fn start(&mut self) {
        self.run_cycle();
    }

    /// "Load more": fetches the next page with the current filter and
    /// scope and appends. A no-op while a fetch is in flight or after a
    /// page came back empty.
    pub fn load_more(&mut self) {
        self.run_cycle();
    }

    /// Tag filter change: restart paging, drop rendered content, refetch.
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.cursor.set_tag(tag);
        self.reset_view();
        self.run_cycle();
    }

    /// Search input change: a non-empty query switches the feed to search
    /// results; an empty one falls back to the regular feed.
    pub fn set_search(&mut self, query: &str) {
        self.cursor.set_query(query);
        self.reset_view();
        self.run_cycle();
    }

    /// Begins a fetch cycle, refusing while one is already in flight and
    /// after the feed is exhausted. Callers that fetch out-of-band pair
    /// this with [`Controller::complete_fetch`].
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.in_flight {
            warn!("fetch already in flight, ignoring");
            return None;
        }
        if self.exhausted {
            debug!("feed exhausted, ignoring load request");
            return None;
        }
        self.in_flight = true;
        self.phase = Phase::Loading;
        Some(FetchTicket {
            generation: self.generation,
            page: self.cursor.page,
            kind: if self.cursor.is_search() {
                FetchKind::Search
            } else {
                FetchKind::Feed
            },
        })
    }

    /// Performs the fetch a ticket describes against the feed service.
    pub fn execute_fetch(&self, ticket: &FetchTicket) -> Result<Listing<Post>> {
        match ticket.kind {
            FetchKind::Search => {
                let query = self.cursor.query.as_deref().unwrap_or_default();
                self.feed.search(query)
            }
            FetchKind::Feed => match self.cursor.scope.as_deref() {
                Some(username) => self.feed.list_by_user(
                    username,
                    self.cursor.page_size,
                    ticket.page,
                    self.cursor.tag.as_deref(),
                ),
                None => self.feed.list(
                    self.cursor.page_size,
                    ticket.page,
                    self.cursor.tag.as_deref(),
                ),
            },
        }
    }

    /// Applies a fetch result. Results from a superseded generation are
    /// discarded: the cursor changed while the fetch was in flight.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Listing<Post>>) {
        if ticket.generation != self.generation {
            // A fetch for the current generation may still be outstanding;
            // a stale completion must not re-open the gate for it.
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale fetch result"
            );
            return;
        }
        self.in_flight = false;
        match result {
            Ok(listing) => self.apply_page(&ticket, listing),
            Err(err) => {
                self.phase = Phase::Failed;
                warn!(page = ticket.page, error = %err, "feed fetch failed");
                if ticket.page == 1 {
                    // First page: the feed area becomes the error message.
                    self.surface.clear();
                }
                self.surface
                    .show_message(&format!("Error loading posts: {err}"));
            }
        }
    }

    fn apply_page(&mut self, ticket: &FetchTicket, listing: Listing<Post>) {
        self.phase = Phase::Loaded;
        if listing.data.is_empty() {
            if ticket.page == 1 {
                let message = match ticket.kind {
                    FetchKind::Search => EMPTY_SEARCH_MESSAGE,
                    FetchKind::Feed => EMPTY_FEED_MESSAGE,
                };
                self.surface.show_message(message);
            }
            self.exhausted = true;
            return;
        }

        let fresh: Vec<Post> = listing
            .data
            .into_iter()
            .filter(|post| !self.rendered.contains(&post.id))
            .collect();
        for post in &fresh {
            self.rendered.insert(post.id);
            self.comment_counts.insert(post.id, post.comment_count());
        }
        let cards = render(self.viewer.as_deref(), &fresh);
        debug!(page = ticket.page, count = cards.len(), "appending posts");
        self.surface.append(cards);
        match ticket.kind {
            // Search results arrive as one unpaginated set; load-more has
            // nothing further to fetch until the query or filter changes.
            FetchKind::Search => self.exhausted = true,
            FetchKind::Feed => self.cursor.advance(),
        }
    }

    fn run_cycle(&mut self) {
        if let Some(ticket) = self.begin_fetch() {
            let result = self.execute_fetch(&ticket);
            self.complete_fetch(ticket, result);
        }
    }

    fn reset_view(&mut self) {
        // Invalidate any fetch still in flight before clearing.
        self.generation += 1;
        self.in_flight = false;
        self.exhausted = false;
        self.phase = Phase::Idle;
        self.rendered.clear();
        self.comment_counts.clear();
        self.surface.clear();
    }

    // -- per-post mutations, patching the rendered region directly -------

    /// Toggles the viewer's reaction and reconciles the card against the
    /// server's returned reaction set. Repeated invocations for the same
    /// post+symbol while one is in flight are ignored.
    pub fn toggle_reaction(
        &mut self,
        reactions: &dyn ReactionService,
        post_id: i64,
        symbol: &str,
    ) -> Result<()> {
        if !self.reaction_guard.begin(post_id, symbol) {
            return Ok(());
        }
        let result = reactions.toggle(post_id, symbol);
        self.reaction_guard.finish(post_id, symbol);

        let updated = result?;
        let total: i64 = updated.iter().map(|reaction| reaction.count).sum();
        let viewer_reacted = match self.viewer.as_deref() {
            Some(viewer) => updated
                .iter()
                .find(|reaction| reaction.symbol == symbol)
                .map(|reaction| reaction.reactors.iter().any(|name| name == viewer))
                .unwrap_or(false),
            None => false,
        };
        self.surface.patch_reactions(post_id, total, viewer_reacted);
        Ok(())
    }

    /// Deletes a post and removes its card exactly once.
    pub fn remove_post(&mut self, posts: &dyn PostService, post_id: i64) -> Result<()> {
        posts.delete(post_id)?;
        if self.rendered.remove(&post_id) {
            self.comment_counts.remove(&post_id);
            self.surface.remove_post(post_id);
        }
        Ok(())
    }

    pub fn add_comment(
        &mut self,
        comments: &dyn CommentService,
        post_id: i64,
        body: &str,
    ) -> Result<Comment> {
        if body.trim().is_empty() {
            return Err(Error::Validation("comment body must not be empty".into()));
        }
        let comment = comments.add(post_id, body)?;
        let count = self
            .comment_counts
            .entry(post_id)
            .and_modify(|count| *count += 1)
            .or_insert(1);
        let count = *count;
        self.surface.set_comment_count(post_id, count);
        Ok(comment)
    }

    /// Owner pre-check before the delete request goes out. A UX guard
    /// only: the server independently enforces ownership.
    pub fn remove_comment(
        &mut self,
        comments: &dyn CommentService,
        post_id: i64,
        comment: &Comment,
    ) -> Result<()> {
        if self.viewer.as_deref() != Some(comment.owner.as_str()) {
            return Err(Error::Forbidden(
                "you can only delete your own comments".into(),
            ));
        }
        comments.remove(post_id, comment.id)?;
        let count = self
            .comment_counts
            .entry(post_id)
            .and_modify(|count| *count = (*count - 1).max(0))
            .or_insert(0);
        let count = *count;
        self.surface.set_comment_count(post_id, count);
        Ok(())
    }
}
